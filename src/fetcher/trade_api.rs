use rand;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::models::{Item, MarketPrice, Rarity};

const SEARCH_URL: &str = "https://www.pathofexile.com/api/trade/search";
const FETCH_URL: &str = "https://www.pathofexile.com/api/trade/fetch";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0";

// Listings fetched per price check; the API caps fetch batches at 10
const MAX_LISTINGS: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<String>,
    total: u32,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    result: Vec<FetchedListing>,
}

#[derive(Debug, Deserialize)]
struct FetchedListing {
    listing: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    price: Option<ListingPrice>,
}

#[derive(Debug, Deserialize)]
struct ListingPrice {
    amount: f64,
    currency: String,
}

/// Thin client for the official trade-search API: given an item,
/// return a market price and listing count, or nothing when the search
/// comes up empty.
pub struct TradeApiClient {
    client: Client,
    league: String,
    divine_rate: f64,
    last_request: Instant,
}

impl TradeApiClient {
    pub fn new(league: String, divine_rate: f64) -> Self {
        Self {
            client: Client::new(),
            league,
            divine_rate,
            last_request: Instant::now(),
        }
    }

    /// Looks up current listings for the item and aggregates them into
    /// a single price. `Ok(None)` means no listings, not a failure.
    pub async fn lookup_price(&mut self, item: &Item) -> Result<Option<MarketPrice>> {
        let quotes = self.fetch_quotes(item).await?;
        if quotes.is_empty() {
            return Ok(None);
        }
        let count = quotes.len();
        // Lowest-quartile representative keeps one undercut listing
        // from setting the price alone
        let mut sorted = quotes.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let chaos_value = sorted[(count / 4).min(count - 1)];
        Ok(Some(MarketPrice {
            chaos_value,
            listing_count: count as u32,
        }))
    }

    /// Raw chaos-equivalent quotes for the item's cheapest listings,
    /// for storage and statistics.
    pub async fn fetch_quotes(&mut self, item: &Item) -> Result<Vec<f64>> {
        let search = self.search(item).await?;
        debug!(total = search.total, "trade search complete");
        if search.result.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = search
            .result
            .iter()
            .take(MAX_LISTINGS)
            .map(|s| s.as_str())
            .collect();
        let url = format!("{}/{}?query=", FETCH_URL, ids.join(","));

        self.respect_rate_limit().await;
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        self.last_request = Instant::now();

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("trade API rate limit hit, backing off");
            tokio::time::sleep(Duration::from_secs(5)).await;
            return Ok(Vec::new());
        }

        let fetched: FetchResponse = response.json().await?;
        let quotes = fetched
            .result
            .iter()
            .filter_map(|listing| listing.listing.price.as_ref())
            .filter_map(|price| self.to_chaos(price))
            .collect();
        Ok(quotes)
    }

    async fn search(&mut self, item: &Item) -> Result<SearchResponse> {
        let url = format!("{}/{}", SEARCH_URL, self.league);
        let query = build_query(item);

        self.respect_rate_limit().await;
        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&query)
            .send()
            .await?;
        self.last_request = Instant::now();

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(crate::errors::AppraiserError::ApiError(format!(
                "trade search returned {}: {}",
                status, body
            )));
        }
        Ok(serde_json::from_str(&body)?)
    }

    // Only the two denominations that actually trade at scale
    fn to_chaos(&self, price: &ListingPrice) -> Option<f64> {
        match price.currency.as_str() {
            "chaos" => Some(price.amount),
            "divine" => Some(price.amount * self.divine_rate),
            _ => None,
        }
    }

    async fn respect_rate_limit(&self) {
        // Jitter avoids synchronizing with other clients
        let delay = Duration::from_millis(500 + (rand::random::<u64>() % 100));
        let elapsed = self.last_request.elapsed();
        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }
    }
}

fn build_query(item: &Item) -> serde_json::Value {
    let mut query = serde_json::json!({
        "query": {
            "status": { "option": "online" },
            "stats": [{ "type": "and", "filters": [] }],
        },
        "sort": { "price": "asc" }
    });

    // Uniques search by name + base; everything else by base type only
    if item.rarity == Rarity::Unique {
        if let Some(name) = &item.name {
            query["query"]["name"] = serde_json::json!(name);
        }
        query["query"]["type"] = serde_json::json!(item.base_type);
    } else {
        query["query"]["type"] = serde_json::json!(item.base_type);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_query_includes_name() {
        let item = Item::new("Heavy Belt".to_string())
            .with_rarity(Rarity::Unique)
            .with_name("Headhunter".to_string());
        let query = build_query(&item);
        assert_eq!(query["query"]["name"], "Headhunter");
        assert_eq!(query["query"]["type"], "Heavy Belt");
    }

    #[test]
    fn test_currency_conversion() {
        let client = TradeApiClient::new("Standard".to_string(), 150.0);
        let chaos = ListingPrice { amount: 12.0, currency: "chaos".to_string() };
        let divine = ListingPrice { amount: 2.0, currency: "divine".to_string() };
        let exalt = ListingPrice { amount: 3.0, currency: "exalted".to_string() };
        assert_eq!(client.to_chaos(&chaos), Some(12.0));
        assert_eq!(client.to_chaos(&divine), Some(300.0));
        assert_eq!(client.to_chaos(&exalt), None);
    }
}
