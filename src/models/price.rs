use serde::{Deserialize, Serialize};

/// A market price for a named item, as reported by an external source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPrice {
    pub chaos_value: f64,
    pub listing_count: u32,
}

/// Summary statistics over the raw quotes collected for one item-check.
/// Purely derived data; always rebuilt from the quotes, never persisted
/// on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    /// Mean of the middle 50% of quotes; only meaningful from 4 quotes up.
    pub trimmed_mean: Option<f64>,
    /// Population standard deviation; 0 when fewer than 2 quotes.
    pub stddev: f64,
}

impl PriceStatistics {
    pub fn empty() -> Self {
        Self {
            count: 0,
            min: None,
            max: None,
            mean: None,
            median: None,
            p25: None,
            p75: None,
            trimmed_mean: None,
            stddev: 0.0,
        }
    }

    pub fn from_quotes(quotes: &[f64]) -> Self {
        if quotes.is_empty() {
            return Self::empty();
        }

        let mut sorted: Vec<f64> = quotes.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        let stddev = if count < 2 {
            0.0
        } else {
            let variance = sorted
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / count as f64;
            variance.sqrt()
        };

        // Middle 50% average, only once there are enough quotes for the
        // trim to leave anything meaningful behind
        let trimmed_mean = if count >= 4 {
            let lo = count / 4;
            let hi = count - lo;
            let middle = &sorted[lo..hi];
            Some(middle.iter().sum::<f64>() / middle.len() as f64)
        } else {
            None
        };

        Self {
            count,
            min: Some(sorted[0]),
            max: Some(sorted[count - 1]),
            mean: Some(mean),
            median: Some(percentile(&sorted, 0.50)),
            p25: Some(percentile(&sorted, 0.25)),
            p75: Some(percentile(&sorted, 0.75)),
            trimmed_mean,
            stddev,
        }
    }

    /// Inter-quartile range; 0 when the quartiles are unavailable.
    pub fn iqr(&self) -> f64 {
        match (self.p25, self.p75) {
            (Some(p25), Some(p75)) => p75 - p25,
            _ => 0.0,
        }
    }
}

// Linear interpolation between the two nearest ranks.
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = fraction * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_quotes() {
        let stats = PriceStatistics::from_quotes(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_none());
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    fn test_basic_statistics() {
        let stats = PriceStatistics::from_quotes(&[10.0, 20.0, 30.0]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(30.0));
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(stats.median, Some(20.0));
        // Too few quotes for a trimmed mean
        assert!(stats.trimmed_mean.is_none());
    }

    #[test]
    fn test_single_quote_has_zero_stddev() {
        let stats = PriceStatistics::from_quotes(&[42.0]);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.median, Some(42.0));
    }

    #[test]
    fn test_trimmed_mean_drops_outliers() {
        // One wild outlier among eight sane quotes
        let quotes = [10.0, 10.0, 11.0, 11.0, 12.0, 12.0, 13.0, 500.0];
        let stats = PriceStatistics::from_quotes(&quotes);
        let trimmed = stats.trimmed_mean.unwrap();
        assert!(trimmed < 15.0, "trimmed mean {} should ignore the outlier", trimmed);
        assert!(stats.mean.unwrap() > 50.0);
    }

    #[test]
    fn test_quartiles_ordered() {
        let quotes: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let stats = PriceStatistics::from_quotes(&quotes);
        let p25 = stats.p25.unwrap();
        let median = stats.median.unwrap();
        let p75 = stats.p75.unwrap();
        assert!(p25 <= median && median <= p75);
        assert!(stats.iqr() > 0.0);
    }
}
