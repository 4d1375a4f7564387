use serde::{Deserialize, Serialize};

use crate::models::PriceStatistics;

/// What the UI shows for one item-check: a robust center price, a
/// display-rounded version of it, and a confidence label with the
/// reason spelled out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayPriceResult {
    pub display_price: Option<f64>,
    pub rounded_price: Option<f64>,
    /// "none" / "low" / "medium" / "high".
    pub confidence: String,
    pub reason: String,
}

impl DisplayPriceResult {
    fn none(reason: &str) -> Self {
        Self {
            display_price: None,
            rounded_price: None,
            confidence: "none".to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Collapses quote statistics into a single display price. Pure
/// function, no side effects.
pub fn compute_display_price(stats: &PriceStatistics) -> DisplayPriceResult {
    if stats.count == 0 {
        return DisplayPriceResult::none("no quotes available");
    }

    // Robust center: trimmed mean once there is enough data to trim,
    // median with a handful of quotes, raw mean below that
    let center = if stats.count >= 12 {
        stats.trimmed_mean.or(stats.median).or(stats.mean)
    } else if stats.count >= 4 {
        stats.median.or(stats.mean)
    } else {
        stats.mean
    };
    let Some(center) = center else {
        return DisplayPriceResult {
            display_price: None,
            rounded_price: None,
            confidence: "low".to_string(),
            reason: "no usable center price".to_string(),
        };
    };

    // Two spread indicators: quartile spread against the median, and
    // the coefficient of variation against the mean
    let iqr_ratio = match stats.median {
        Some(median) if median > 0.0 => stats.iqr() / median,
        _ => 0.0,
    };
    let cv = match stats.mean {
        Some(mean) if mean > 0.0 => stats.stddev / mean,
        _ => 0.0,
    };

    let (confidence, reason) = if stats.count >= 20 && iqr_ratio <= 0.35 && cv <= 0.35 {
        ("high", "many consistent quotes".to_string())
    } else if stats.count >= 8 && iqr_ratio <= 0.6 && cv <= 0.6 {
        ("medium", "consistent quotes".to_string())
    } else if iqr_ratio > 0.8 || cv > 0.8 {
        ("low", "volatile quotes".to_string())
    } else {
        ("low", format!("limited data ({} quotes)", stats.count))
    };

    DisplayPriceResult {
        display_price: Some(center),
        rounded_price: Some(round_for_display(center)),
        confidence: confidence.to_string(),
        reason,
    }
}

// Precision shown tracks the trade-relevant digits at each magnitude
fn round_for_display(price: f64) -> f64 {
    if price >= 100.0 {
        (price / 5.0).round() * 5.0
    } else if price >= 10.0 {
        price.round()
    } else if price >= 1.0 {
        (price * 10.0).round() / 10.0
    } else {
        (price * 100.0).round() / 100.0
    }
}
