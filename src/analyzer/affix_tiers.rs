use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::config::{StatTierEntry, TierRange};

/// Turns a `#`-placeholder pattern ("+# to maximum Life") into a regex
/// with a single numeric capture group. Everything else is matched
/// literally, case-insensitively.
pub fn compile_value_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern);
    let with_capture = escaped.replace("\\#", r"(\d+(?:\.\d+)?)");
    Regex::new(&format!("(?i){}", with_capture))
}

/// Extracts the first numeric capture of `regex` from `text`.
pub fn extract_value(regex: &Regex, text: &str) -> Option<f64> {
    let caps = regex.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

#[derive(Debug, Clone)]
pub struct ModClassification {
    pub stat_type: Option<String>,
    pub value: Option<f64>,
    pub tier: Option<u32>,
    pub is_crafted: bool,
}

impl ModClassification {
    fn unmatched(is_crafted: bool) -> Self {
        Self {
            stat_type: None,
            value: None,
            tier: None,
            is_crafted,
        }
    }
}

struct CompiledStat {
    key: String,
    regex: Regex,
    tiers: Vec<TierRange>,
}

/// Classifies a mod line against the stat tier tables: which canonical
/// stat it is, its rolled value, and which tier that roll lands in.
/// An unrecognized mod is a normal outcome, not an error; most mods
/// are intentionally not tracked.
pub struct AffixTierClassifier {
    // Sorted by stat key so classification order is deterministic
    stats: Vec<CompiledStat>,
}

impl AffixTierClassifier {
    pub fn new(stat_tiers: &HashMap<String, StatTierEntry>) -> Self {
        let mut stats: Vec<CompiledStat> = stat_tiers
            .iter()
            .filter_map(|(key, entry)| match compile_value_pattern(&entry.pattern) {
                Ok(regex) => Some(CompiledStat {
                    key: key.clone(),
                    regex,
                    tiers: entry.tiers.clone(),
                }),
                Err(err) => {
                    warn!(stat = %key, %err, "skipping stat with malformed pattern");
                    None
                }
            })
            .collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        Self { stats }
    }

    pub fn classify(&self, mod_text: &str) -> ModClassification {
        let is_crafted = mod_text.to_lowercase().contains("(crafted)");

        for stat in &self.stats {
            let Some(value) = extract_value(&stat.regex, mod_text) else {
                continue;
            };
            // First containing range wins, in table order
            let tier = stat
                .tiers
                .iter()
                .find(|range| value >= range.min_roll && value <= range.max_roll)
                .map(|range| range.tier);
            return ModClassification {
                stat_type: Some(stat.key.clone()),
                value: Some(value),
                tier,
                is_crafted,
            };
        }

        ModClassification::unmatched(is_crafted)
    }

    /// Roll range defining `tier` for `stat_type`, if tracked.
    pub fn tier_range(&self, stat_type: &str, tier: u32) -> Option<(f64, f64)> {
        let stat = self.stats.iter().find(|s| s.key == stat_type)?;
        stat.tiers
            .iter()
            .find(|range| range.tier == tier)
            .map(|range| (range.min_roll, range.max_roll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn life_table() -> HashMap<String, StatTierEntry> {
        let mut table = HashMap::new();
        table.insert(
            "maximum_life".to_string(),
            StatTierEntry {
                pattern: "+# to maximum Life".to_string(),
                tiers: vec![
                    TierRange { tier: 1, min_item_level: 86, min_roll: 120.0, max_roll: 129.0 },
                    TierRange { tier: 2, min_item_level: 73, min_roll: 100.0, max_roll: 119.0 },
                    TierRange { tier: 3, min_item_level: 64, min_roll: 80.0, max_roll: 99.0 },
                ],
            },
        );
        table
    }

    #[test]
    fn test_classify_known_stat() {
        let classifier = AffixTierClassifier::new(&life_table());
        let result = classifier.classify("+105 to maximum Life");
        assert_eq!(result.stat_type.as_deref(), Some("maximum_life"));
        assert_eq!(result.value, Some(105.0));
        assert_eq!(result.tier, Some(2));
        assert!(!result.is_crafted);
    }

    #[test]
    fn test_classify_crafted_suffix() {
        let classifier = AffixTierClassifier::new(&life_table());
        let result = classifier.classify("+85 to maximum Life (crafted)");
        assert_eq!(result.tier, Some(3));
        assert!(result.is_crafted);
    }

    #[test]
    fn test_unrecognized_mod_is_not_an_error() {
        let classifier = AffixTierClassifier::new(&life_table());
        let result = classifier.classify("Socketed Gems are Supported by Level 20 Fortify");
        assert!(result.stat_type.is_none());
        assert!(result.tier.is_none());
    }

    #[test]
    fn test_tier_boundary_is_deterministic() {
        let classifier = AffixTierClassifier::new(&life_table());
        // 119 is the top of tier 2, 120 the bottom of tier 1
        assert_eq!(classifier.classify("+119 to maximum Life").tier, Some(2));
        assert_eq!(classifier.classify("+120 to maximum Life").tier, Some(1));
    }

    #[test]
    fn test_out_of_range_roll_has_no_tier() {
        let classifier = AffixTierClassifier::new(&life_table());
        let result = classifier.classify("+12 to maximum Life");
        assert_eq!(result.stat_type.as_deref(), Some("maximum_life"));
        assert_eq!(result.tier, None);
    }

    #[test]
    fn test_tier_range_lookup() {
        let classifier = AffixTierClassifier::new(&life_table());
        assert_eq!(classifier.tier_range("maximum_life", 1), Some((120.0, 129.0)));
        assert_eq!(classifier.tier_range("maximum_life", 9), None);
        assert_eq!(classifier.tier_range("unknown_stat", 1), None);
    }

    #[test]
    fn test_pattern_compilation() {
        let regex = compile_value_pattern("#% increased Spell Damage").unwrap();
        assert_eq!(extract_value(&regex, "92% increased Spell Damage"), Some(92.0));
        assert_eq!(extract_value(&regex, "no numbers here"), None);
    }
}
