use sqlx::sqlite::SqlitePool;
use sqlx::{migrate::MigrateDatabase, Row};

use crate::errors::Result;
use crate::models::{Item, PriceStatistics};

const DEFAULT_DATABASE_URL: &str = "sqlite:poe_appraiser.db";

/// Narrow persistence interface: raw price quotes, appraisal history,
/// and recorded sales. The scoring core never touches this directly.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn initialize() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        Self::initialize_at(&database_url).await
    }

    pub async fn initialize_at(database_url: &str) -> Result<Self> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Stores one batch of raw quotes from a price check.
    pub async fn store_quotes(&self, item_name: &str, league: &str, quotes: &[f64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for quote in quotes {
            sqlx::query(
                "INSERT INTO price_quotes (item_name, league, chaos_value) VALUES (?, ?, ?)",
            )
            .bind(item_name)
            .bind(league)
            .bind(quote)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Most recent quotes for an item in a league, newest first.
    pub async fn recent_quotes(
        &self,
        item_name: &str,
        league: &str,
        limit: u32,
    ) -> Result<Vec<f64>> {
        let rows = sqlx::query(
            "SELECT chaos_value FROM price_quotes
             WHERE item_name = ? AND league = ?
             ORDER BY quoted_at DESC LIMIT ?",
        )
        .bind(item_name)
        .bind(league)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get::<f64, _>("chaos_value")).collect())
    }

    /// Convenience wrapper: statistics over the stored recent quotes.
    pub async fn recent_statistics(
        &self,
        item_name: &str,
        league: &str,
        limit: u32,
    ) -> Result<PriceStatistics> {
        let quotes = self.recent_quotes(item_name, league, limit).await?;
        Ok(PriceStatistics::from_quotes(&quotes))
    }

    /// One history row per evaluated item.
    pub async fn record_appraisal(
        &self,
        item: &Item,
        tier: &str,
        total_score: f64,
        estimated_value: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO appraisals (item_name, base_type, rarity, tier, total_score, estimated_value)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.display_name())
        .bind(&item.base_type)
        .bind(format!("{:?}", item.rarity))
        .bind(tier)
        .bind(total_score)
        .bind(estimated_value)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn record_sale(
        &self,
        item_name: &str,
        league: &str,
        chaos_value: f64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO sales (item_name, league, chaos_value) VALUES (?, ?, ?)",
        )
        .bind(item_name)
        .bind(league)
        .bind(chaos_value)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}
