use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use poe_appraiser::appraise::{Appraisal, Appraiser, Verdict};
use poe_appraiser::config::ConfigTables;
use poe_appraiser::errors::{AppraiserError, Result};
use poe_appraiser::fetcher::TradeApiClient;
use poe_appraiser::models::{Item, PriceStatistics};
use poe_appraiser::pricing::compute_display_price;
use poe_appraiser::storage::Database;

#[derive(Parser)]
#[command(name = "poe-appraiser", about = "Appraise Path of Exile items from copied item text")]
struct Cli {
    /// League used for trade lookups and quote storage.
    #[arg(long, default_value = "Standard")]
    league: String,

    /// Directory holding the JSON data tables.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Chaos value of one divine orb, used to normalize quotes.
    #[arg(long, default_value_t = 150.0)]
    divine_rate: f64,

    /// Skip the local quote/appraisal database entirely.
    #[arg(long)]
    no_db: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Appraise a single item (reads a file, or stdin when omitted).
    Appraise {
        file: Option<PathBuf>,

        /// Query the trade API for a live market price.
        #[arg(long)]
        fetch_price: bool,
    },
    /// Appraise every item in a stash dump, best first.
    Bulk { file: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let tables = ConfigTables::load_from_dir(&cli.data_dir);
    let appraiser = Appraiser::new(tables);

    let database = if cli.no_db {
        None
    } else {
        match Database::initialize().await {
            Ok(db) => Some(db),
            Err(err) => {
                warn!(%err, "database unavailable, continuing without history");
                None
            }
        }
    };

    match cli.command {
        Commands::Appraise { file, fetch_price } => {
            let text = read_input(file)?;
            let item = appraiser
                .parser()
                .parse(&text)
                .ok_or_else(|| AppraiserError::ParseError("unrecognized item text".to_string()))?;

            let market_price = if fetch_price {
                fetch_market_price(&item, &cli.league, cli.divine_rate, database.as_ref()).await
            } else {
                None
            };

            let appraisal = appraiser.appraise(&item, market_price);
            print_appraisal(&item, &appraisal, market_price);

            if let Some(db) = &database {
                db.record_appraisal(
                    &item,
                    appraisal.verdict.tier(),
                    appraisal.verdict.total_score(),
                    appraisal.verdict.estimated_value(),
                )
                .await?;
            }
        }
        Commands::Bulk { file } => {
            let text = read_input(file)?;
            let items = appraiser.parser().parse_multiple(&text);
            info!(count = items.len(), "parsed stash dump");

            let mut results: Vec<(Item, Appraisal)> = items
                .into_iter()
                .map(|item| {
                    let appraisal = appraiser.appraise(&item, None);
                    (item, appraisal)
                })
                .collect();
            results.sort_by(|a, b| {
                b.1.verdict
                    .total_score()
                    .partial_cmp(&a.1.verdict.total_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            for (item, appraisal) in &results {
                println!(
                    "{:>5.1}  {:<12} {:<14} {:<32} {}",
                    appraisal.verdict.total_score(),
                    appraisal.verdict.tier(),
                    appraisal.assessment.flag.as_str(),
                    item.display_name(),
                    appraisal.verdict.estimated_value(),
                );
            }
            if let Some(db) = &database {
                for (item, appraisal) in &results {
                    db.record_appraisal(
                        item,
                        appraisal.verdict.tier(),
                        appraisal.verdict.total_score(),
                        appraisal.verdict.estimated_value(),
                    )
                    .await?;
                }
            }
        }
    }

    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Live price lookup, with quotes persisted for later statistics. Any
/// trade API failure degrades to an offline appraisal.
async fn fetch_market_price(
    item: &Item,
    league: &str,
    divine_rate: f64,
    database: Option<&Database>,
) -> Option<f64> {
    let mut client = TradeApiClient::new(league.to_string(), divine_rate);
    let quotes = match client.fetch_quotes(item).await {
        Ok(quotes) => quotes,
        Err(err) => {
            warn!(%err, "trade lookup failed, appraising offline");
            return None;
        }
    };
    if quotes.is_empty() {
        info!("no trade listings found");
        return None;
    }

    if let Some(db) = database {
        if let Err(err) = db.store_quotes(item.display_name(), league, &quotes).await {
            warn!(%err, "failed to persist quotes");
        }
    }

    let stats = PriceStatistics::from_quotes(&quotes);
    let result = compute_display_price(&stats);
    if let Some(price) = result.display_price {
        info!(
            price,
            confidence = %result.confidence,
            quotes = stats.count,
            "aggregated market price"
        );
    }
    result.display_price
}

fn print_appraisal(item: &Item, appraisal: &Appraisal, market_price: Option<f64>) {
    println!("=== {} ===", item.display_name());
    if item.name.is_some() {
        println!("Base: {}", item.base_type);
    }
    println!("Rarity: {:?}", item.rarity);
    if let Some(ilvl) = item.item_level {
        println!("Item Level: {}", ilvl);
    }
    if let Some(price) = market_price {
        println!("Market price: {:.1}c", price);
    }
    println!();

    println!(
        "Tier: {}  (score {:.1})",
        appraisal.verdict.tier(),
        appraisal.verdict.total_score()
    );
    println!("Estimated value: {}", appraisal.verdict.estimated_value());
    for factor in appraisal.verdict.factors() {
        println!("  - {}", factor);
    }

    if let Verdict::Rare(eval) = &appraisal.verdict {
        if !eval.matches.is_empty() {
            println!();
            println!("Notable affixes:");
            for m in &eval.matches {
                println!("  [{}] {}", m.tier.as_str(), m.mod_text);
            }
        }
    }

    if let Some(crafting) = &appraisal.crafting {
        println!();
        println!(
            "Crafting potential: {} ({} open prefixes, {} open suffixes)",
            crafting.value_label, crafting.open_prefixes, crafting.open_suffixes
        );
        if crafting.divine_recommended {
            println!(
                "  Divine recommended: up to +{:.1} on best mod",
                crafting.best_divine_potential
            );
        }
        for option in &crafting.craft_options {
            println!(
                "  craft: {} ({}, ~{:.0}c upside)",
                option.name, option.description, option.expected_value
            );
        }
    }

    println!();
    println!("Flag: {}  (weight {:.0})", appraisal.assessment.flag.as_str(), appraisal.assessment.weight);
    for reason in &appraisal.assessment.reasons {
        println!("  - {}", reason);
    }
}
