pub mod affix_tiers;
mod cluster;
mod crafting;
mod rare;
mod unique;

pub use affix_tiers::{AffixTierClassifier, ModClassification};
pub use cluster::ClusterJewelEvaluator;
pub use crafting::CraftingPotentialAnalyzer;
pub use rare::RareItemEvaluator;
pub use unique::UniqueItemEvaluator;

// Ordered substring table for inferring the equipment slot from a base
// type name. First matching entry wins; bases that fit no entry stay
// unclassified.
const SLOT_KEYWORDS: &[(&str, &[&str])] = &[
    ("boots", &["boots", "greaves", "slippers"]),
    ("helmet", &["circlet", "helm", "crown", "mask", "hood", "bascinet", "burgonet"]),
    ("gloves", &["gloves", "gauntlets", "mitts"]),
    ("body_armour", &["plate", "vest", "garb", "regalia", "coat", "jacket", "tunic", "robe"]),
    ("belt", &["belt", "vise", "sash", "stygian"]),
    ("ring", &["ring"]),
    ("amulet", &["amulet", "talisman"]),
];

/// Infers the equipment slot from the base type. A display-name
/// heuristic shared by the rare evaluator, the crafting analyzer, and
/// the value rule engine.
pub fn infer_slot(base_type: &str) -> Option<&'static str> {
    let lower = base_type.to_lowercase();
    SLOT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(slot, _)| *slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_inference() {
        assert_eq!(infer_slot("Sorcerer Boots"), Some("boots"));
        assert_eq!(infer_slot("Hubris Circlet"), Some("helmet"));
        assert_eq!(infer_slot("Titan Gauntlets"), Some("gloves"));
        assert_eq!(infer_slot("Astral Plate"), Some("body_armour"));
        assert_eq!(infer_slot("Stygian Vise"), Some("belt"));
        assert_eq!(infer_slot("Opal Ring"), Some("ring"));
        assert_eq!(infer_slot("Jade Amulet"), Some("amulet"));
        assert_eq!(infer_slot("Thicket Bow"), None);
    }
}
