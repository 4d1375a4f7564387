use std::collections::HashMap;

use crate::analyzer::affix_tiers::AffixTierClassifier;
use crate::analyzer::infer_slot;
use crate::config::{CraftingTables, StatTierEntry};
use crate::models::{CraftOption, CraftingAnalysis, Item, ModAnalysis};

// Divine reroll is only worth recommending when the best mod gains at
// least this much and the item as a whole gains at least the total
const DIVINE_BEST_THRESHOLD: f64 = 5.0;
const DIVINE_TOTAL_THRESHOLD: f64 = 10.0;

const MAX_CRAFT_SUGGESTIONS: usize = 5;

/// Estimates open affix slots and divine-orb upside, and suggests
/// crafting actions from the bench-craft tables.
pub struct CraftingPotentialAnalyzer {
    classifier: AffixTierClassifier,
    tables: CraftingTables,
}

impl CraftingPotentialAnalyzer {
    pub fn new(stat_tiers: &HashMap<String, StatTierEntry>, tables: CraftingTables) -> Self {
        Self {
            classifier: AffixTierClassifier::new(stat_tiers),
            tables,
        }
    }

    pub fn analyze(&self, item: &Item) -> CraftingAnalysis {
        let mods: Vec<ModAnalysis> = item
            .explicits
            .iter()
            .map(|mod_text| self.analyze_mod(mod_text))
            .collect();

        let (open_prefixes, open_suffixes) = self.estimate_open_slots(&mods);

        // Only naturally-rolled mods at tier 2 or better benefit from a
        // divine; crafted mods reroll at the bench instead
        let qualifying: Vec<&ModAnalysis> = mods
            .iter()
            .filter(|m| !m.is_crafted && m.tier.map_or(false, |t| t <= 2))
            .collect();
        let best_divine_potential = qualifying
            .iter()
            .map(|m| m.divine_potential())
            .fold(0.0, f64::max);
        let total_divine_potential: f64 = qualifying.iter().map(|m| m.divine_potential()).sum();
        let divine_recommended = best_divine_potential >= DIVINE_BEST_THRESHOLD
            && total_divine_potential >= DIVINE_TOTAL_THRESHOLD;

        let craft_options =
            self.suggest_crafts(item, &mods, open_prefixes, open_suffixes);

        let good_mods = mods
            .iter()
            .filter(|m| m.tier.map_or(false, |t| t <= 2))
            .count() as u32;
        let great_mods = mods.iter().filter(|m| m.tier == Some(1)).count() as u32;
        let open_slots = open_prefixes + open_suffixes;
        let points = open_slots * 10
            + good_mods * 5
            + great_mods * 10
            + if divine_recommended { 10 } else { 0 };
        let value_label = match points {
            p if p >= 50 => "very high",
            p if p >= 30 => "high",
            p if p >= 15 => "medium",
            _ => "low",
        }
        .to_string();

        CraftingAnalysis {
            mods,
            open_prefixes,
            open_suffixes,
            divine_recommended,
            best_divine_potential,
            total_divine_potential,
            craft_options,
            value_label,
        }
    }

    fn analyze_mod(&self, mod_text: &str) -> ModAnalysis {
        let classification = self.classifier.classify(mod_text);
        let Some(stat_type) = classification.stat_type else {
            return ModAnalysis::unrecognized(mod_text, classification.is_crafted);
        };
        let range = classification
            .tier
            .and_then(|tier| self.classifier.tier_range(&stat_type, tier));
        ModAnalysis {
            mod_text: mod_text.to_string(),
            stat_type: Some(stat_type),
            current_value: classification.value,
            tier: classification.tier,
            min_roll: range.map(|(min, _)| min),
            max_roll: range.map(|(_, max)| max),
            is_crafted: classification.is_crafted,
        }
    }

    // Fractional prefix/suffix accumulation: stats we cannot place are
    // split half-and-half and the sums rounded at the end. A deliberate
    // approximation, not a real affix-side classifier.
    fn estimate_open_slots(&self, mods: &[ModAnalysis]) -> (u32, u32) {
        let mut prefixes = 0.0f64;
        let mut suffixes = 0.0f64;
        for m in mods {
            match m.stat_type.as_deref() {
                Some(stat) if self.tables.prefix_stats.iter().any(|s| s == stat) => {
                    prefixes += 1.0;
                }
                Some(stat) if self.tables.suffix_stats.iter().any(|s| s == stat) => {
                    suffixes += 1.0;
                }
                _ => {
                    prefixes += 0.5;
                    suffixes += 0.5;
                }
            }
        }
        let filled_prefixes = (prefixes.round() as u32).min(3);
        let filled_suffixes = (suffixes.round() as u32).min(3);
        (3 - filled_prefixes, 3 - filled_suffixes)
    }

    fn suggest_crafts(
        &self,
        item: &Item,
        mods: &[ModAnalysis],
        open_prefixes: u32,
        open_suffixes: u32,
    ) -> Vec<CraftOption> {
        let slot = infer_slot(&item.base_type);
        let mut options: Vec<CraftOption> = self
            .tables
            .bench_crafts
            .iter()
            .filter(|craft| match craft.side.as_str() {
                "prefix" => open_prefixes > 0,
                "suffix" => open_suffixes > 0,
                _ => false,
            })
            .filter(|craft| {
                craft.slots.is_empty() || slot.map_or(false, |s| craft.slots.iter().any(|c| c == s))
            })
            .map(|craft| CraftOption {
                name: craft.name.clone(),
                description: craft.description.clone(),
                expected_value: craft.expected_value,
            })
            .collect();

        // Advanced crafts only make sense on an item that is already
        // good and still has room
        let strong_mods = mods.iter().filter(|m| m.tier.map_or(false, |t| t <= 2)).count();
        if strong_mods >= 2 && open_prefixes + open_suffixes >= 1 {
            options.push(CraftOption {
                name: "exalt_slam".to_string(),
                description: "Exalted Orb slam into the open slot".to_string(),
                expected_value: 40.0,
            });
            options.push(CraftOption {
                name: "aisling_t4".to_string(),
                description: "Aisling T4 veiled mod gamble".to_string(),
                expected_value: 60.0,
            });
            options.push(CraftOption {
                name: "harvest_reforge".to_string(),
                description: "Harvest reforge keeping the strong mod group".to_string(),
                expected_value: 30.0,
            });
        }

        options.sort_by(|a, b| {
            b.expected_value
                .partial_cmp(&a.expected_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        options.truncate(MAX_CRAFT_SUGGESTIONS);
        options
    }
}
