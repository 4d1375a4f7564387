use regex::Regex;
use tracing::warn;

use crate::analyzer::affix_tiers::compile_value_pattern;
use crate::config::UniqueTables;
use crate::models::{
    CorruptionEvaluation, Item, LinkEvaluation, MetaRelevance, UniqueItemEvaluation,
};

// Neutral midpoints used when a component has nothing to say
const NEUTRAL_CORRUPTION_SCORE: f64 = 50.0;
const NEUTRAL_LINK_SCORE: f64 = 50.0;
const BRICKED_CORRUPTION_SCORE: f64 = 10.0;
const UNLISTED_META_SCORE: f64 = 20.0;
const CHASE_BASE_SCORE: f64 = 95.0;

// At most this many white sockets count towards the corruption score
const WHITE_SOCKET_CAP: u32 = 3;

struct CompiledOverride {
    regex: Regex,
    tier: String,
    weight: f64,
}

struct CompiledKeystone {
    regex: Regex,
    weight: f64,
}

/// Scores unique (fixed-name) items from corruption tables, link
/// multipliers, and build-meta popularity data, anchored on an
/// externally-supplied market price when one is available.
pub struct UniqueItemEvaluator {
    tables: UniqueTables,
    implicit_overrides: Vec<CompiledOverride>,
    keystones: Vec<CompiledKeystone>,
    brick_patterns: Vec<Regex>,
}

impl UniqueItemEvaluator {
    pub fn new(tables: UniqueTables) -> Self {
        let implicit_overrides = tables
            .implicit_overrides
            .iter()
            .filter_map(|o| match compile_value_pattern(&o.pattern) {
                Ok(regex) => Some(CompiledOverride {
                    regex,
                    tier: o.tier.clone(),
                    weight: o.weight,
                }),
                Err(err) => {
                    warn!(pattern = %o.pattern, %err, "skipping malformed implicit override");
                    None
                }
            })
            .collect();
        let keystones = tables
            .keystones
            .iter()
            .filter_map(|k| match compile_value_pattern(&k.pattern) {
                Ok(regex) => Some(CompiledKeystone { regex, weight: k.weight as f64 }),
                Err(err) => {
                    warn!(pattern = %k.pattern, %err, "skipping malformed keystone pattern");
                    None
                }
            })
            .collect();
        let brick_patterns = tables
            .brick_patterns
            .iter()
            .filter_map(|p| match compile_value_pattern(p) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern = %p, %err, "skipping malformed brick pattern");
                    None
                }
            })
            .collect();
        Self { tables, implicit_overrides, keystones, brick_patterns }
    }

    pub fn is_unique_item(&self, item: &Item) -> bool {
        item.is_unique()
    }

    pub fn evaluate(&self, item: &Item, ninja_price: Option<f64>) -> Option<UniqueItemEvaluation> {
        if !self.is_unique_item(item) {
            return None;
        }

        let mut factors = Vec::new();
        let name = item.display_name().to_string();
        let is_chase = self.tables.chase_uniques.iter().any(|c| c == &name);

        // Known chase uniques are valuable whatever the price feed says
        let base_score = if is_chase {
            factors.push("chase unique".to_string());
            CHASE_BASE_SCORE
        } else {
            match ninja_price {
                Some(p) if p >= 500.0 => 90.0,
                Some(p) if p >= 100.0 => 70.0,
                Some(p) if p >= 20.0 => 50.0,
                Some(p) if p >= 5.0 => 30.0,
                Some(_) => 15.0,
                // No market data: neither cheap nor proven
                None => 30.0,
            }
        };
        if let Some(price) = ninja_price {
            factors.push(format!("market price {:.0}c", price));
        }

        let white_sockets = item
            .sockets
            .as_deref()
            .map(|s| s.chars().filter(|c| *c == 'W').count() as u32)
            .unwrap_or(0);

        let (corruption, corruption_score) = if item.is_corrupted {
            let result = self.evaluate_corruption(item, white_sockets, &mut factors);
            let score = result.0;
            (Some(result.1), score)
        } else {
            (None, NEUTRAL_CORRUPTION_SCORE)
        };

        let (link_evaluation, link_score) = match item.sockets.as_deref() {
            // No socket data at all means no link verdict, not a zero one
            None => (None, NEUTRAL_LINK_SCORE),
            Some(_) => {
                let multiplier = if item.links >= 6 {
                    self.tables.links.six_link_multiplier
                } else if item.links == 5 {
                    self.tables.links.five_link_multiplier
                } else {
                    1.0
                };
                if item.links >= 5 {
                    factors.push(format!("{}-linked", item.links));
                }
                let score = (30.0
                    + match item.links {
                        l if l >= 6 => 60.0,
                        5 => 30.0,
                        _ => 0.0,
                    }
                    + white_sockets as f64 * self.tables.links.white_socket_bonus)
                    .min(100.0);
                (
                    Some(LinkEvaluation {
                        links: item.links,
                        white_sockets,
                        value_multiplier: multiplier,
                    }),
                    score,
                )
            }
        };

        let meta = self.meta_relevance(&name, &mut factors);

        let corruption_modifier = corruption.as_ref().map_or(1.0, |c| c.value_modifier);
        let weighted = 0.4 * base_score + 0.2 * corruption_score + 0.2 * link_score + 0.2 * meta.score;
        // The corruption modifier applies to the already-weighted total
        let total_score = (weighted * corruption_modifier).clamp(0.0, 100.0);

        let tier = if is_chase {
            "chase".to_string()
        } else if total_score >= 90.0 {
            "chase".to_string()
        } else if total_score >= 70.0 {
            "excellent".to_string()
        } else if total_score >= 50.0 {
            "good".to_string()
        } else if total_score >= 30.0 {
            "average".to_string()
        } else {
            "vendor".to_string()
        };

        let link_multiplier = link_evaluation.as_ref().map_or(1.0, |l| l.value_multiplier);
        let (estimated_value, confidence) = match ninja_price {
            Some(price) => {
                let adjusted = price * corruption_modifier * link_multiplier;
                (format_chaos(adjusted), "market".to_string())
            }
            None => {
                let fallback = match tier.as_str() {
                    "chase" => "5div+",
                    "excellent" => "1-5div",
                    "good" => "50-200c",
                    "average" => "10-50c",
                    _ => "<10c",
                };
                (fallback.to_string(), "fallback".to_string())
            }
        };

        Some(UniqueItemEvaluation {
            tier,
            total_score,
            base_score,
            corruption_score,
            link_score,
            corruption,
            link_evaluation,
            meta,
            is_chase,
            estimated_value,
            confidence,
            factors,
        })
    }

    fn evaluate_corruption(
        &self,
        item: &Item,
        white_sockets: u32,
        factors: &mut Vec<String>,
    ) -> (f64, CorruptionEvaluation) {
        let mut matched_implicits = Vec::new();
        let mut best_tier: Option<&str> = None;
        let mut weight_sum = 0.0;

        // A brick implicit ruins the item outright. Corrupted implicits
        // occupy a single slot in game, so a simultaneous good-looking
        // implicit cannot rescue it.
        let bricked = item
            .implicits
            .iter()
            .any(|imp| self.brick_patterns.iter().any(|p| p.is_match(imp)));
        if bricked {
            factors.push("bricked corruption".to_string());
            let eval = CorruptionEvaluation {
                tier: "bricked".to_string(),
                matched_implicits,
                white_sockets,
                is_bricked: true,
                value_modifier: 0.5,
            };
            return (BRICKED_CORRUPTION_SCORE, eval);
        }

        for implicit in &item.implicits {
            for over in &self.implicit_overrides {
                if over.regex.is_match(implicit) {
                    matched_implicits.push(implicit.clone());
                    weight_sum += over.weight;
                    if tier_rank(&over.tier) > best_tier.map_or(0, tier_rank) {
                        best_tier = Some(&over.tier);
                    }
                }
            }
            for keystone in &self.keystones {
                if keystone.regex.is_match(implicit) {
                    matched_implicits.push(implicit.clone());
                    weight_sum += keystone.weight;
                    factors.push("keystone corruption".to_string());
                }
            }
        }
        weight_sum += white_sockets.min(WHITE_SOCKET_CAP) as f64 * self.tables.white_socket_weight;

        let tier = best_tier.unwrap_or("neutral").to_string();
        let baseline = match tier.as_str() {
            "excellent" => 80.0,
            "high" => 60.0,
            "good" => 50.0,
            "niche" => 40.0,
            _ => 40.0,
        };
        let score = (baseline + weight_sum).min(100.0);

        let value_modifier = match tier.as_str() {
            "excellent" => 2.5,
            "high" => 1.8,
            "good" => 1.3,
            "niche" => 1.1,
            _ => 1.0,
        };
        // Keystone grants push the modifier further, capped well short
        // of absurdity
        let keystone_hits = factors.iter().filter(|f| *f == "keystone corruption").count();
        let value_modifier = (value_modifier + 0.2 * keystone_hits as f64).min(3.0);

        if !matched_implicits.is_empty() {
            factors.push(format!("{} corruption implicit", tier));
        }

        let eval = CorruptionEvaluation {
            tier,
            matched_implicits,
            white_sockets,
            is_bricked: false,
            value_modifier,
        };
        (score, eval)
    }

    fn meta_relevance(&self, name: &str, factors: &mut Vec<String>) -> MetaRelevance {
        let mut score = 0.0;
        let mut top_build: Option<(&str, u8)> = None;
        let mut is_trending = false;
        let mut listed = false;

        for build in &self.tables.builds {
            if !build.key_items.iter().any(|k| k == name) {
                continue;
            }
            listed = true;
            score += build.usage;
            is_trending |= build.trending;
            let rank = popularity_rank(&build.tier);
            if top_build.map_or(true, |(_, r)| rank > r) {
                top_build = Some((&build.name, rank));
            }
        }

        if !listed {
            // Not yet catalogued is different from worthless
            return MetaRelevance { score: UNLISTED_META_SCORE, top_build: None, is_trending: false };
        }

        if let Some((build, _)) = top_build {
            factors.push(format!("used by meta build: {}", build));
        }
        if is_trending {
            factors.push("trending in build meta".to_string());
        }

        MetaRelevance {
            score: score.min(100.0),
            top_build: top_build.map(|(b, _)| b.to_string()),
            is_trending,
        }
    }
}

fn tier_rank(tier: &str) -> u8 {
    match tier {
        "excellent" => 4,
        "high" => 3,
        "good" => 2,
        "niche" => 1,
        _ => 0,
    }
}

fn popularity_rank(tier: &str) -> u8 {
    match tier {
        "S" => 4,
        "A" => 3,
        "B" => 2,
        "C" => 1,
        _ => 0,
    }
}

fn format_chaos(value: f64) -> String {
    if value >= 10.0 {
        format!("~{:.0}c", value)
    } else {
        format!("~{:.1}c", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImplicitOverride, LinkValues, MetaBuild, PatternWeight};
    use crate::models::Rarity;

    fn test_tables() -> UniqueTables {
        UniqueTables {
            implicit_overrides: vec![ImplicitOverride {
                pattern: "+# to Level of Socketed Gems".to_string(),
                tier: "excellent".to_string(),
                weight: 20.0,
            }],
            keystones: vec![PatternWeight {
                pattern: "Corrupted Soul".to_string(),
                weight: 15,
            }],
            brick_patterns: vec!["-#% to all Resistances".to_string()],
            white_socket_weight: 5.0,
            chase_uniques: vec!["Mageblood".to_string()],
            links: LinkValues::default(),
            builds: vec![MetaBuild {
                name: "RF Juggernaut".to_string(),
                tier: "S".to_string(),
                usage: 60.0,
                trending: true,
                key_items: vec!["Rise of the Phoenix".to_string()],
            }],
        }
    }

    fn unique(name: &str, base: &str) -> Item {
        Item::new(base.to_string())
            .with_rarity(Rarity::Unique)
            .with_name(name.to_string())
    }

    #[test]
    fn test_non_unique_returns_none() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = Item::new("Hubris Circlet".to_string()).with_rarity(Rarity::Rare);
        assert!(evaluator.evaluate(&item, None).is_none());
    }

    #[test]
    fn test_chase_unique_is_always_chase_tier() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = unique("Mageblood", "Heavy Belt");
        // Even a laughable price feed cannot demote a chase unique
        let eval = evaluator.evaluate(&item, Some(1.0)).unwrap();
        assert!(eval.is_chase);
        assert_eq!(eval.tier, "chase");
        assert_eq!(eval.base_score, 95.0);
    }

    #[test]
    fn test_base_score_price_thresholds() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = unique("Tabula Rasa", "Simple Robe");
        assert_eq!(evaluator.evaluate(&item, Some(600.0)).unwrap().base_score, 90.0);
        assert_eq!(evaluator.evaluate(&item, Some(150.0)).unwrap().base_score, 70.0);
        assert_eq!(evaluator.evaluate(&item, Some(25.0)).unwrap().base_score, 50.0);
        assert_eq!(evaluator.evaluate(&item, Some(7.0)).unwrap().base_score, 30.0);
        assert_eq!(evaluator.evaluate(&item, Some(1.0)).unwrap().base_score, 15.0);
    }

    #[test]
    fn test_brick_is_sticky() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let mut item = unique("Shavronne's Wrappings", "Occultist's Vestment");
        item.is_corrupted = true;
        // A good implicit and a brick implicit together still brick
        item.implicits = vec![
            "+2 to Level of Socketed Gems".to_string(),
            "-10% to all Resistances".to_string(),
        ];
        let eval = evaluator.evaluate(&item, Some(100.0)).unwrap();
        let corruption = eval.corruption.as_ref().unwrap();
        assert!(corruption.is_bricked);
        assert_eq!(corruption.tier, "bricked");
        assert_eq!(corruption.value_modifier, 0.5);
        assert_eq!(eval.corruption_score, 10.0);
    }

    #[test]
    fn test_excellent_corruption_raises_value() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let mut plain = unique("Shavronne's Wrappings", "Occultist's Vestment");
        let mut corrupted = plain.clone();
        corrupted.is_corrupted = true;
        corrupted.implicits = vec!["+2 to Level of Socketed Gems".to_string()];
        plain.implicits = vec![];
        let plain_eval = evaluator.evaluate(&plain, Some(100.0)).unwrap();
        let corrupted_eval = evaluator.evaluate(&corrupted, Some(100.0)).unwrap();
        assert!(corrupted_eval.total_score > plain_eval.total_score);
        assert_eq!(
            corrupted_eval.corruption.as_ref().unwrap().value_modifier,
            2.5
        );
    }

    #[test]
    fn test_uncorrupted_has_neutral_score_and_no_detail() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = unique("Tabula Rasa", "Simple Robe");
        let eval = evaluator.evaluate(&item, None).unwrap();
        assert_eq!(eval.corruption_score, 50.0);
        assert!(eval.corruption.is_none());
    }

    #[test]
    fn test_no_socket_data_yields_no_link_evaluation() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = unique("Headhunter", "Leather Belt");
        let eval = evaluator.evaluate(&item, Some(50.0)).unwrap();
        assert!(eval.link_evaluation.is_none());
        assert_eq!(eval.link_score, 50.0);
    }

    #[test]
    fn test_six_link_multiplier() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let mut item = unique("Tabula Rasa", "Simple Robe");
        item.sockets = Some("W-W-W-W-W-W".to_string());
        item.links = 6;
        let eval = evaluator.evaluate(&item, Some(10.0)).unwrap();
        let link = eval.link_evaluation.as_ref().unwrap();
        assert_eq!(link.value_multiplier, 2.5);
        assert_eq!(link.white_sockets, 6);
        // Estimated value reflects price x link multiplier
        assert_eq!(eval.estimated_value, "~25c");
        assert_eq!(eval.confidence, "market");
    }

    #[test]
    fn test_meta_relevance_listed_and_unlisted() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let listed = unique("Rise of the Phoenix", "Mosaic Kite Shield");
        let eval = evaluator.evaluate(&listed, None).unwrap();
        assert_eq!(eval.meta.score, 60.0);
        assert_eq!(eval.meta.top_build.as_deref(), Some("RF Juggernaut"));
        assert!(eval.meta.is_trending);

        let unlisted = unique("Obscure Unique", "Iron Ring");
        let eval = evaluator.evaluate(&unlisted, None).unwrap();
        assert_eq!(eval.meta.score, 20.0);
        assert!(eval.meta.top_build.is_none());
    }

    #[test]
    fn test_fallback_value_without_price() {
        let evaluator = UniqueItemEvaluator::new(test_tables());
        let item = unique("Obscure Unique", "Iron Ring");
        let eval = evaluator.evaluate(&item, None).unwrap();
        assert_eq!(eval.confidence, "fallback");
        assert!(!eval.estimated_value.is_empty());
    }
}
