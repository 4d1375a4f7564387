use regex::Regex;
use tracing::warn;

use crate::analyzer::affix_tiers::{compile_value_pattern, extract_value};
use crate::analyzer::infer_slot;
use crate::config::RareTables;
use crate::models::{AffixMatch, AffixTier, Item, RareItemEvaluation};
use std::collections::HashMap;

// Item level at which the top mod tiers become obtainable
const HIGH_ITEM_LEVEL: u32 = 84;
const HIGH_TIER_BASE_SCORE: f64 = 50.0;
// Unknown bases score low but never zero; a great roll on an odd base
// still deserves a look
const UNKNOWN_BASE_SCORE: f64 = 10.0;
const SIX_LINK_BONUS: f64 = 15.0;

struct CompiledPattern {
    source: String,
    regex: Regex,
}

struct CompiledAffix {
    affix_type: String,
    weight: u32,
    min_value: f64,
    // Pattern lists per textual tier, best first
    tiers: Vec<(AffixTier, Vec<CompiledPattern>)>,
    ranges: [Option<(f64, f64)>; 3],
}

struct CompiledInfluenceMod {
    pattern: CompiledPattern,
    weight: u32,
}

/// Scores rare items against the configured affix-weight tables,
/// synergy and red-flag rules, slot rules, and build archetypes.
/// Pure function of the item plus tables injected at construction.
pub struct RareItemEvaluator {
    tables: RareTables,
    affixes: Vec<CompiledAffix>,
    influence_mods: HashMap<String, Vec<CompiledInfluenceMod>>,
}

impl RareItemEvaluator {
    pub fn new(tables: RareTables) -> Self {
        let mut affixes: Vec<CompiledAffix> = tables
            .affixes
            .iter()
            .map(|(affix_type, config)| {
                let tier_lists = [
                    (AffixTier::Tier1, &config.tier1),
                    (AffixTier::Tier2, &config.tier2),
                    (AffixTier::Tier3, &config.tier3),
                ];
                let tiers = tier_lists
                    .into_iter()
                    .map(|(tier, patterns)| {
                        let compiled = patterns
                            .iter()
                            .filter_map(|p| compile_pattern_logged(affix_type, p))
                            .collect();
                        (tier, compiled)
                    })
                    .collect();
                CompiledAffix {
                    affix_type: affix_type.clone(),
                    weight: config.weight,
                    min_value: config.min_value,
                    tiers,
                    ranges: [config.tier1_range, config.tier2_range, config.tier3_range],
                }
            })
            .collect();
        // Deterministic matching order regardless of map iteration
        affixes.sort_by(|a, b| a.affix_type.cmp(&b.affix_type));

        let influence_mods = tables
            .influence_mods
            .iter()
            .map(|(influence, mods)| {
                let compiled = mods
                    .iter()
                    .filter_map(|m| {
                        compile_pattern_logged(influence, &m.pattern).map(|pattern| {
                            CompiledInfluenceMod { pattern, weight: m.weight }
                        })
                    })
                    .collect();
                (influence.clone(), compiled)
            })
            .collect();

        Self { tables, affixes, influence_mods }
    }

    pub fn evaluate(&self, item: &Item) -> RareItemEvaluation {
        if !item.is_rare() {
            return self.build_evaluation(item, Components::default(), Vec::new(), Vec::new());
        }

        let mut factors = Vec::new();
        let mut components = Components::default();

        // 1. Base type
        components.base_score = if self.tables.high_tier_bases.iter().any(|b| b == &item.base_type) {
            factors.push(format!("high-tier base: {}", item.base_type));
            HIGH_TIER_BASE_SCORE
        } else {
            UNKNOWN_BASE_SCORE
        };

        // 2. Item level
        components.high_item_level = item.item_level.map_or(false, |ilvl| ilvl >= HIGH_ITEM_LEVEL);
        if components.high_item_level {
            factors.push(format!("item level {}+ unlocks top-tier mods", HIGH_ITEM_LEVEL));
        }

        // 3. Affix matching
        let matches = self.match_affixes(item);
        if !matches.is_empty() {
            let weight: u32 = matches.iter().map(|m| m.weight).sum();
            factors.push(format!(
                "{} valuable affixes (combined weight {})",
                matches.len(),
                weight
            ));
        }

        // 4. Affix score
        components.affix_score = affix_score(
            matches.len(),
            matches.iter().map(|m| m.weight as f64).sum(),
        );

        let type_counts = affix_type_counts(&matches);

        // 5. Synergies stack
        for rule in &self.tables.synergies {
            let satisfied = rule
                .requires
                .iter()
                .all(|(affix, needed)| type_counts.get(affix).copied().unwrap_or(0) >= *needed);
            if satisfied {
                components.synergy_bonus += rule.bonus;
                factors.push(format!("synergy: {}", rule.name));
            }
        }

        // 6. Red flags
        let slot = infer_slot(&item.base_type);
        for rule in &self.tables.red_flags {
            if let Some((a, b)) = &rule.has_both {
                if type_counts.contains_key(a) && type_counts.contains_key(b) {
                    components.red_flag_penalty -= rule.penalty;
                    factors.push(format!("red flag: {}", rule.name));
                }
            }
            if let Some(missing) = &rule.missing_required {
                if slot == Some(missing.slot.as_str()) && !type_counts.contains_key(&missing.affix) {
                    components.red_flag_penalty -= rule.penalty;
                    factors.push(format!("red flag: {}", rule.name));
                }
            }
        }

        // 7. Slot-specific rules
        if let Some(slot) = slot {
            if let Some(rule) = self.tables.slot_rules.get(slot) {
                if rule.premium_bases.iter().any(|b| b == &item.base_type) {
                    components.slot_bonus += rule.premium_bonus;
                    factors.push(format!("premium {} base", slot));
                }
                let optimal = rule
                    .bonus_affixes
                    .iter()
                    .filter(|affix| type_counts.contains_key(*affix))
                    .count();
                if optimal >= 3 {
                    components.slot_bonus += rule.bonus;
                    factors.push(format!("{} slot-optimal affix set", slot));
                }
            }
            // Socket-string heuristic; true link grouping is not always
            // recoverable from the display string
            if slot == "body_armour" && item.links >= 6 {
                components.slot_bonus += SIX_LINK_BONUS;
                factors.push("6-linked body armour".to_string());
            }
        }

        // 8. Open affix estimate
        let has_tier1 = matches.iter().any(|m| m.tier == AffixTier::Tier1);
        let open_slots = estimated_open_slots(item.explicits.len());
        components.crafting_bonus = match open_slots {
            0 => 0.0,
            1 => 5.0,
            _ if has_tier1 => 15.0,
            _ => 10.0,
        };
        if open_slots > 0 {
            factors.push(format!("~{} open affix slots", open_slots));
        }

        // 9. Fractured bonus
        if item.is_fractured {
            let best_tier1 = matches
                .iter()
                .filter(|m| m.tier == AffixTier::Tier1)
                .max_by_key(|m| m.weight);
            if let Some(best) = best_tier1 {
                components.fractured_bonus = match best.weight {
                    w if w >= 9 => 35.0,
                    w if w >= 7 => 30.0,
                    _ => 25.0,
                };
                factors.push(format!("fractured tier-1 {}", best.affix_type));
            } else if let Some(best) = matches.iter().max_by_key(|m| m.weight) {
                components.fractured_bonus = 10.0;
                factors.push(format!("fractured item ({})", best.affix_type));
            }
        }

        // 10. Archetype and meta bonuses
        let (archetype_bonus, archetype_name) = self.best_archetype_bonus(&type_counts);
        components.archetype_bonus = archetype_bonus;
        if let Some(name) = archetype_name {
            factors.push(format!("fits archetype: {}", name));
        }
        components.meta_bonus = self.meta_bonus(&type_counts);
        if components.meta_bonus > 0.0 {
            factors.push("meta-popular affixes".to_string());
        }

        self.build_evaluation(item, components, matches, factors)
    }

    /// Re-scores an already parsed item with archetype-specific weight
    /// multipliers applied to the affix score. All other components
    /// are those of the plain evaluation.
    pub fn evaluate_with_archetype(&self, item: &Item, archetype: &str) -> RareItemEvaluation {
        let mut evaluation = self.evaluate(item);
        if evaluation.tier == "not_rare" {
            return evaluation;
        }
        let Some(config) = self.tables.archetypes.get(archetype) else {
            return evaluation;
        };

        let weighted: f64 = evaluation
            .matches
            .iter()
            .map(|m| {
                let multiplier = config
                    .weight_multipliers
                    .get(&m.affix_type)
                    .copied()
                    .unwrap_or(1.0);
                m.weight as f64 * multiplier
            })
            .sum();

        evaluation.affix_score = affix_score(evaluation.matches.len(), weighted);
        evaluation
            .factors
            .push(format!("re-weighted for archetype: {}", archetype));
        self.recombine(item, &mut evaluation);
        evaluation
    }

    fn match_affixes(&self, item: &Item) -> Vec<AffixMatch> {
        let mut matches = Vec::new();

        for mod_text in &item.explicits {
            'affixes: for affix in &self.affixes {
                for (pattern_tier, patterns) in &affix.tiers {
                    for pattern in patterns {
                        let Some(value) = extract_value(&pattern.regex, mod_text) else {
                            continue;
                        };
                        if value < affix.min_value {
                            continue;
                        }
                        // The real tier comes from the value ranges, not
                        // from which pattern list happened to match
                        let tier = derive_tier(&affix.ranges, value).unwrap_or(*pattern_tier);
                        matches.push(AffixMatch {
                            affix_type: affix.affix_type.clone(),
                            matched_pattern: pattern.source.clone(),
                            mod_text: mod_text.clone(),
                            value,
                            weight: affix.weight,
                            tier,
                            is_influence_mod: false,
                        });
                        // One match per mod line
                        break 'affixes;
                    }
                }
            }
        }

        // Influence mods are matched independently of the affix table,
        // once per influence the item carries
        for influence in &item.influences {
            let Some(mods) = self.influence_mods.get(influence) else {
                continue;
            };
            for mod_text in &item.explicits {
                for inf_mod in mods {
                    if let Some(value) = extract_value(&inf_mod.pattern.regex, mod_text) {
                        matches.push(AffixMatch {
                            affix_type: format!("influence_{}", influence.to_lowercase()),
                            matched_pattern: inf_mod.pattern.source.clone(),
                            mod_text: mod_text.clone(),
                            value,
                            weight: inf_mod.weight,
                            tier: AffixTier::Influence,
                            is_influence_mod: true,
                        });
                    }
                }
            }
        }

        matches
    }

    fn best_archetype_bonus(&self, type_counts: &HashMap<String, u32>) -> (f64, Option<String>) {
        let mut best = (0.0, None);
        for (name, config) in &self.tables.archetypes {
            let disqualified = config
                .disqualifiers
                .iter()
                .any(|affix| type_counts.contains_key(affix));
            if disqualified {
                continue;
            }
            let matched = config
                .priority_affixes
                .iter()
                .filter(|affix| type_counts.contains_key(*affix))
                .count();
            let bonus = match matched {
                0 | 1 => 0.0,
                2 => 5.0,
                3 => 10.0,
                _ => 15.0,
            };
            // Best-fitting archetype wins; bonuses do not stack
            if bonus > best.0 {
                best = (bonus, Some(name.clone()));
            }
        }
        best
    }

    fn meta_bonus(&self, type_counts: &HashMap<String, u32>) -> f64 {
        let total: f64 = type_counts
            .keys()
            .filter_map(|affix| self.tables.meta_popularity.get(affix))
            .sum();
        total.min(10.0)
    }

    fn recombine(&self, item: &Item, evaluation: &mut RareItemEvaluation) {
        evaluation.total_score = (0.3 * evaluation.base_score
            + 0.6 * evaluation.affix_score
            + if evaluation.high_item_level { 10.0 } else { 0.0 }
            + evaluation.synergy_bonus
            + evaluation.red_flag_penalty
            + evaluation.slot_bonus
            + evaluation.crafting_bonus
            + evaluation.fractured_bonus
            + evaluation.archetype_bonus
            + evaluation.meta_bonus)
            .clamp(0.0, 100.0);

        let (tier, value) = self.determine_tier(item, evaluation);
        evaluation.tier = tier;
        evaluation.estimated_value = value;
    }

    fn determine_tier(&self, item: &Item, evaluation: &RareItemEvaluation) -> (String, String) {
        let score = evaluation.total_score;
        let has_tier1 = evaluation.matches.iter().any(|m| m.tier == AffixTier::Tier1);
        let has_influence = evaluation.matches.iter().any(|m| m.is_influence_mod);

        // A fractured tier-1 mod makes the item a crafting base in its
        // own value bracket, whatever the general thresholds say
        if item.is_fractured && has_tier1 {
            return ("crafting_base".to_string(), "50-300c (fracture base)".to_string());
        }

        if score >= 80.0 && (has_tier1 || has_influence) {
            ("excellent".to_string(), "200c-5div".to_string())
        } else if score >= 75.0 && evaluation.matches.len() >= 3 {
            ("excellent".to_string(), "1div+".to_string())
        } else if score >= 65.0 && (evaluation.synergy_bonus > 0.0 || has_influence) {
            ("good".to_string(), "50-200c".to_string())
        } else if score >= 65.0 {
            ("good".to_string(), "30-100c".to_string())
        } else if score >= 50.0 {
            ("average".to_string(), "10-50c".to_string())
        } else if score >= 35.0 {
            ("average".to_string(), "5-15c".to_string())
        } else {
            ("vendor".to_string(), "<5c".to_string())
        }
    }

    fn build_evaluation(
        &self,
        item: &Item,
        components: Components,
        matches: Vec<AffixMatch>,
        factors: Vec<String>,
    ) -> RareItemEvaluation {
        if !item.is_rare() {
            return RareItemEvaluation::not_rare();
        }
        let mut evaluation = RareItemEvaluation {
            tier: String::new(),
            total_score: 0.0,
            base_score: components.base_score,
            affix_score: components.affix_score,
            high_item_level: components.high_item_level,
            synergy_bonus: components.synergy_bonus,
            red_flag_penalty: components.red_flag_penalty,
            slot_bonus: components.slot_bonus,
            crafting_bonus: components.crafting_bonus,
            fractured_bonus: components.fractured_bonus,
            archetype_bonus: components.archetype_bonus,
            meta_bonus: components.meta_bonus,
            matches,
            estimated_value: String::new(),
            factors,
        };
        self.recombine(item, &mut evaluation);
        evaluation
    }
}

#[derive(Default)]
struct Components {
    base_score: f64,
    affix_score: f64,
    high_item_level: bool,
    synergy_bonus: f64,
    red_flag_penalty: f64,
    slot_bonus: f64,
    crafting_bonus: f64,
    fractured_bonus: f64,
    archetype_bonus: f64,
    meta_bonus: f64,
}

// Break-points reward match count before raw weight, so one huge-weight
// mod cannot dominate the score on its own
fn affix_score(count: usize, weight: f64) -> f64 {
    if count == 0 {
        0.0
    } else if count >= 3 && weight >= 25.0 {
        (60.0 + weight).min(100.0)
    } else if count >= 2 && weight >= 16.0 {
        (40.0 + 2.0 * weight).min(100.0)
    } else {
        (20.0 + 3.0 * weight).min(100.0)
    }
}

// Coarse open-slot estimate: assume explicit mods split evenly between
// prefixes and suffixes, three of each at most
fn estimated_open_slots(explicit_count: usize) -> u32 {
    let filled_prefixes = ((explicit_count + 1) / 2).min(3) as u32;
    let filled_suffixes = (explicit_count / 2).min(3) as u32;
    (3 - filled_prefixes) + (3 - filled_suffixes)
}

fn derive_tier(ranges: &[Option<(f64, f64)>; 3], value: f64) -> Option<AffixTier> {
    let tiers = [AffixTier::Tier1, AffixTier::Tier2, AffixTier::Tier3];
    for (range, tier) in ranges.iter().zip(tiers) {
        if let Some((min, max)) = range {
            if value >= *min && value <= *max {
                return Some(tier);
            }
        }
    }
    None
}

fn affix_type_counts(matches: &[AffixMatch]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for m in matches {
        *counts.entry(m.affix_type.clone()).or_insert(0) += 1;
    }
    counts
}

fn compile_pattern_logged(owner: &str, pattern: &str) -> Option<CompiledPattern> {
    match compile_value_pattern(pattern) {
        Ok(regex) => Some(CompiledPattern { source: pattern.to_string(), regex }),
        Err(err) => {
            warn!(%owner, %pattern, %err, "skipping malformed affix pattern");
            None
        }
    }
}
