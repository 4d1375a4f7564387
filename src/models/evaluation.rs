use serde::{Deserialize, Serialize};

/// Tier classification of a single matched affix. The numeric tiers come
/// from roll-range tables; `Influence` marks mods only available on
/// influenced bases, which sit outside the regular tier ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffixTier {
    Tier1,
    Tier2,
    Tier3,
    Influence,
}

impl AffixTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffixTier::Tier1 => "tier1",
            AffixTier::Tier2 => "tier2",
            AffixTier::Tier3 => "tier3",
            AffixTier::Influence => "influence",
        }
    }
}

/// One explicit mod that matched a configured affix pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixMatch {
    pub affix_type: String,
    pub matched_pattern: String,
    pub mod_text: String,
    pub value: f64,
    /// Importance weight, 1-10.
    pub weight: u32,
    pub tier: AffixTier,
    pub is_influence_mod: bool,
}

/// Per-mod classification result used by the crafting analyzer. The
/// derived quantities are computed from the stored fields on demand so
/// they can never drift out of sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModAnalysis {
    pub mod_text: String,
    pub stat_type: Option<String>,
    pub current_value: Option<f64>,
    pub tier: Option<u32>,
    pub min_roll: Option<f64>,
    pub max_roll: Option<f64>,
    pub is_crafted: bool,
}

impl ModAnalysis {
    pub fn unrecognized(mod_text: &str, is_crafted: bool) -> Self {
        Self {
            mod_text: mod_text.to_string(),
            stat_type: None,
            current_value: None,
            tier: None,
            min_roll: None,
            max_roll: None,
            is_crafted,
        }
    }

    /// Value gained by a perfect divine reroll within the current tier.
    pub fn divine_potential(&self) -> f64 {
        match (self.current_value, self.max_roll) {
            (Some(value), Some(max)) => (max - value).max(0.0),
            _ => 0.0,
        }
    }

    /// Position of the current roll within its tier range, 0-100.
    /// Fixed rolls (min == max) count as perfect.
    pub fn roll_quality(&self) -> Option<f64> {
        let value = self.current_value?;
        let min = self.min_roll?;
        let max = self.max_roll?;
        if (max - min).abs() < f64::EPSILON {
            return Some(100.0);
        }
        Some(((value - min) / (max - min) * 100.0).clamp(0.0, 100.0))
    }
}

/// Result of scoring a rare item. `tier == "not_rare"` is the sentinel
/// returned for items of any other rarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RareItemEvaluation {
    pub tier: String,
    pub total_score: f64,
    pub base_score: f64,
    pub affix_score: f64,
    pub high_item_level: bool,
    pub synergy_bonus: f64,
    pub red_flag_penalty: f64,
    pub slot_bonus: f64,
    pub crafting_bonus: f64,
    pub fractured_bonus: f64,
    pub archetype_bonus: f64,
    pub meta_bonus: f64,
    pub matches: Vec<AffixMatch>,
    pub estimated_value: String,
    pub factors: Vec<String>,
}

impl RareItemEvaluation {
    pub fn not_rare() -> Self {
        Self {
            tier: "not_rare".to_string(),
            total_score: 0.0,
            base_score: 0.0,
            affix_score: 0.0,
            high_item_level: false,
            synergy_bonus: 0.0,
            red_flag_penalty: 0.0,
            slot_bonus: 0.0,
            crafting_bonus: 0.0,
            fractured_bonus: 0.0,
            archetype_bonus: 0.0,
            meta_bonus: 0.0,
            matches: Vec::new(),
            estimated_value: "n/a".to_string(),
            factors: Vec::new(),
        }
    }
}

/// One notable found on a cluster jewel, resolved against the notable
/// database (or the default entry for uncatalogued notables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotableMatch {
    pub name: String,
    pub tier: String,
    pub weight: u32,
    pub is_meta: bool,
    pub has_synergy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterJewelEvaluation {
    pub tier: String,
    pub total_score: f64,
    pub notable_score: f64,
    pub enchantment_score: f64,
    pub synergy_bonus: f64,
    pub item_level_bonus: f64,
    pub crafting_bonus: f64,
    pub socket_bonus: f64,
    pub notables: Vec<NotableMatch>,
    pub estimated_value: String,
    pub factors: Vec<String>,
}

/// Corruption outcome detail, present only on corrupted uniques.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorruptionEvaluation {
    pub tier: String,
    pub matched_implicits: Vec<String>,
    pub white_sockets: u32,
    pub is_bricked: bool,
    /// Multiplier applied to the item's market value (0.5 for bricks,
    /// up to 3.0 for excellent corruptions).
    pub value_modifier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEvaluation {
    pub links: u32,
    pub white_sockets: u32,
    pub value_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaRelevance {
    pub score: f64,
    pub top_build: Option<String>,
    pub is_trending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueItemEvaluation {
    pub tier: String,
    pub total_score: f64,
    pub base_score: f64,
    pub corruption_score: f64,
    pub link_score: f64,
    pub corruption: Option<CorruptionEvaluation>,
    pub link_evaluation: Option<LinkEvaluation>,
    pub meta: MetaRelevance,
    pub is_chase: bool,
    pub estimated_value: String,
    /// "market" when backed by a supplied price, "fallback" otherwise.
    pub confidence: String,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftOption {
    pub name: String,
    pub description: String,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftingAnalysis {
    pub mods: Vec<ModAnalysis>,
    pub open_prefixes: u32,
    pub open_suffixes: u32,
    pub divine_recommended: bool,
    pub best_divine_potential: f64,
    pub total_divine_potential: f64,
    pub craft_options: Vec<CraftOption>,
    /// "low" / "medium" / "high" / "very high".
    pub value_label: String,
}

impl CraftingAnalysis {
    pub fn open_slots(&self) -> u32 {
        self.open_prefixes + self.open_suffixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(value: f64, min: f64, max: f64) -> ModAnalysis {
        ModAnalysis {
            mod_text: "+50 to maximum Life".to_string(),
            stat_type: Some("maximum_life".to_string()),
            current_value: Some(value),
            tier: Some(2),
            min_roll: Some(min),
            max_roll: Some(max),
            is_crafted: false,
        }
    }

    #[test]
    fn test_divine_potential() {
        assert_eq!(analysis(50.0, 40.0, 59.0).divine_potential(), 9.0);
        // A max roll has nothing left to gain
        assert_eq!(analysis(59.0, 40.0, 59.0).divine_potential(), 0.0);
        assert_eq!(ModAnalysis::unrecognized("???", false).divine_potential(), 0.0);
    }

    #[test]
    fn test_roll_quality_bounds() {
        let q = analysis(50.0, 40.0, 60.0).roll_quality().unwrap();
        assert!((q - 50.0).abs() < 1e-9);
        assert_eq!(analysis(40.0, 40.0, 60.0).roll_quality(), Some(0.0));
        assert_eq!(analysis(60.0, 40.0, 60.0).roll_quality(), Some(100.0));
        // Fixed rolls count as perfect
        assert_eq!(analysis(25.0, 25.0, 25.0).roll_quality(), Some(100.0));
        assert_eq!(ModAnalysis::unrecognized("???", false).roll_quality(), None);
    }

    #[test]
    fn test_not_rare_sentinel() {
        let eval = RareItemEvaluation::not_rare();
        assert_eq!(eval.tier, "not_rare");
        assert_eq!(eval.total_score, 0.0);
    }
}
