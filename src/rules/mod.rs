use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analyzer::infer_slot;
use crate::config::ValueRuleDef;
use crate::models::Item;

/// Coarse value flag assigned by the rule engine, ordered by priority:
/// when several matched rules disagree, the highest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueFlag {
    Junk,
    CraftBase,
    FractureBase,
    CheckTrade,
}

impl ValueFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueFlag::Junk => "junk",
            ValueFlag::CraftBase => "craft_base",
            ValueFlag::FractureBase => "fracture_base",
            ValueFlag::CheckTrade => "check_trade",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "junk" => Some(ValueFlag::Junk),
            "craft_base" => Some(ValueFlag::CraftBase),
            "fracture_base" => Some(ValueFlag::FractureBase),
            "check_trade" => Some(ValueFlag::CheckTrade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub flag: ValueFlag,
    pub weight: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            _ => None,
        }
    }

    fn check_f64(&self, left: f64, right: f64) -> bool {
        match self {
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
        }
    }
}

enum Condition {
    StringCmp { field: String, negate: bool, value: String },
    NumCmp { field: String, op: CmpOp, value: f64 },
    BoolEq { field: String, value: bool },
    ModMatch { regex: Regex },
    ModCount { regex: Regex, op: CmpOp, value: usize },
    SlotEq { slot: String },
    SlotIn { slots: Vec<String> },
}

struct CompiledRule {
    name: String,
    slots: Vec<String>,
    conditions: Vec<Condition>,
    weight: f64,
    flag: Option<ValueFlag>,
}

/// Evaluates declarative value rules against parsed items. Conditions
/// are compiled once at load time; a rule with a malformed condition
/// is rejected then, not at evaluation time.
pub struct ValueRuleEngine {
    rules: Vec<CompiledRule>,
    slot_in: Regex,
    slot_eq: Regex,
    mod_count: Regex,
    mod_match: Regex,
    generic: Regex,
}

// Weight thresholds applied when no matched rule names a flag
const CHECK_TRADE_WEIGHT: f64 = 100.0;
const CRAFT_BASE_WEIGHT: f64 = 50.0;

impl ValueRuleEngine {
    pub fn new(defs: &[ValueRuleDef]) -> Self {
        let mut engine = Self {
            rules: Vec::new(),
            slot_in: Regex::new(r"^slot\s+in\s+\[([^\]]*)\]$").unwrap(),
            slot_eq: Regex::new(r"^slot\s*==\s*(\w+)$").unwrap(),
            mod_count: Regex::new(r"^mod_count\s*~\s*'([^']+)'\s*(==|!=|>=|<=|>|<)\s*(\d+)$")
                .unwrap(),
            mod_match: Regex::new(r"^mod\s*~\s*'([^']+)'$").unwrap(),
            generic: Regex::new(r"^(\w+)\s*(==|!=|>=|<=|>|<)\s*(.+)$").unwrap(),
        };

        for def in defs {
            match engine.compile_rule(def) {
                Ok(rule) => engine.rules.push(rule),
                Err(reason) => {
                    warn!(rule = %def.name, %reason, "rejecting malformed value rule");
                }
            }
        }
        engine
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn assess(&self, item: &Item) -> ValueAssessment {
        // Only rares go through the rule set at all
        if !item.is_rare() {
            return ValueAssessment {
                flag: ValueFlag::Junk,
                weight: 0.0,
                reasons: vec!["not a rare item".to_string()],
            };
        }

        let slot = infer_slot(&item.base_type);
        let mut weight = 0.0;
        let mut reasons = Vec::new();
        let mut best_flag: Option<ValueFlag> = None;

        // Every rule is evaluated independently; no short-circuiting
        // across rules
        for rule in &self.rules {
            if !rule.slots.is_empty()
                && !slot.map_or(false, |s| rule.slots.iter().any(|r| r == s))
            {
                continue;
            }
            if rule.conditions.iter().all(|c| self.check(c, item, slot)) {
                weight += rule.weight;
                reasons.push(rule.name.clone());
                if let Some(flag) = rule.flag {
                    best_flag = Some(best_flag.map_or(flag, |f| f.max(flag)));
                }
            }
        }

        let flag = match best_flag {
            Some(flag) => flag,
            None if weight >= CHECK_TRADE_WEIGHT => ValueFlag::CheckTrade,
            None if weight >= CRAFT_BASE_WEIGHT => ValueFlag::CraftBase,
            None => {
                if weight == 0.0 {
                    reasons.push("no rules matched".to_string());
                }
                ValueFlag::Junk
            }
        };

        ValueAssessment { flag, weight, reasons }
    }

    fn compile_rule(&self, def: &ValueRuleDef) -> Result<CompiledRule, String> {
        let flag = match &def.flag {
            Some(raw) => {
                Some(ValueFlag::from_str(raw).ok_or_else(|| format!("unknown flag '{}'", raw))?)
            }
            None => None,
        };
        let conditions = def
            .conditions
            .iter()
            .map(|c| self.compile_condition(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledRule {
            name: def.name.clone(),
            slots: def.slots.clone(),
            conditions,
            weight: def.weight,
            flag,
        })
    }

    fn compile_condition(&self, text: &str) -> Result<Condition, String> {
        let text = text.trim();

        if let Some(caps) = self.slot_in.captures(text) {
            let slots = caps[1]
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            return Ok(Condition::SlotIn { slots });
        }
        if let Some(caps) = self.slot_eq.captures(text) {
            return Ok(Condition::SlotEq { slot: caps[1].to_string() });
        }
        if let Some(caps) = self.mod_count.captures(text) {
            let regex = compile_mod_pattern(&caps[1])?;
            let op = CmpOp::parse(&caps[2]).ok_or("bad operator")?;
            let value = caps[3].parse::<usize>().map_err(|e| e.to_string())?;
            return Ok(Condition::ModCount { regex, op, value });
        }
        if let Some(caps) = self.mod_match.captures(text) {
            let regex = compile_mod_pattern(&caps[1])?;
            return Ok(Condition::ModMatch { regex });
        }
        if let Some(caps) = self.generic.captures(text) {
            let field = caps[1].to_string();
            let op = CmpOp::parse(&caps[2]).ok_or("bad operator")?;
            let raw = caps[3].trim().trim_matches('\'').to_string();

            if raw == "true" || raw == "false" {
                if op != CmpOp::Eq && op != CmpOp::Ne {
                    return Err(format!("boolean field '{}' only supports == and !=", field));
                }
                let value = (raw == "true") == (op == CmpOp::Eq);
                return Ok(Condition::BoolEq { field, value });
            }
            if let Ok(value) = raw.parse::<f64>() {
                return Ok(Condition::NumCmp { field, op, value });
            }
            match op {
                CmpOp::Eq => Ok(Condition::StringCmp { field, negate: false, value: raw }),
                CmpOp::Ne => Ok(Condition::StringCmp { field, negate: true, value: raw }),
                _ => Err(format!("string field '{}' only supports == and !=", field)),
            }
        } else {
            Err(format!("unparseable condition '{}'", text))
        }
    }

    fn check(&self, condition: &Condition, item: &Item, slot: Option<&'static str>) -> bool {
        match condition {
            Condition::StringCmp { field, negate, value } => {
                let actual = match field.as_str() {
                    "base_type" => Some(item.base_type.clone()),
                    "item_class" => item.item_class.clone(),
                    "name" => item.name.clone(),
                    _ => None,
                };
                match actual {
                    Some(actual) => (actual == *value) != *negate,
                    None => false,
                }
            }
            Condition::NumCmp { field, op, value } => {
                let actual = match field.as_str() {
                    "item_level" => item.item_level.map(f64::from),
                    "quality" => item.quality.map(f64::from),
                    "links" => Some(item.links as f64),
                    "explicit_count" => Some(item.explicits.len() as f64),
                    "influence_count" => Some(item.influences.len() as f64),
                    "stack_size" => item.stack_size.map(f64::from),
                    _ => None,
                };
                actual.map_or(false, |a| op.check_f64(a, *value))
            }
            Condition::BoolEq { field, value } => {
                let actual = match field.as_str() {
                    "corrupted" => Some(item.is_corrupted),
                    "fractured" => Some(item.is_fractured),
                    "synthesised" => Some(item.is_synthesised),
                    "mirrored" => Some(item.is_mirrored),
                    _ => None,
                };
                actual == Some(*value)
            }
            Condition::ModMatch { regex } => any_mod_line(item).any(|line| regex.is_match(line)),
            Condition::ModCount { regex, op, value } => {
                let count = any_mod_line(item).filter(|line| regex.is_match(line)).count();
                op.check_f64(count as f64, *value as f64)
            }
            Condition::SlotEq { slot: wanted } => slot == Some(wanted.as_str()),
            Condition::SlotIn { slots } => {
                slot.map_or(false, |s| slots.iter().any(|w| w == s))
            }
        }
    }
}

fn any_mod_line(item: &Item) -> impl Iterator<Item = &str> {
    item.implicits
        .iter()
        .chain(item.explicits.iter())
        .chain(item.enchants.iter())
        .map(|s| s.as_str())
}

// `#` stands for one-or-more digits; the rest matches literally,
// case-insensitively
fn compile_mod_pattern(pattern: &str) -> Result<Regex, String> {
    let escaped = regex::escape(pattern);
    let with_digits = escaped.replace("\\#", r"\d+");
    Regex::new(&format!("(?i){}", with_digits)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rarity;

    fn rule(name: &str, conditions: &[&str], weight: f64, flag: Option<&str>) -> ValueRuleDef {
        ValueRuleDef {
            name: name.to_string(),
            slots: vec![],
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            weight,
            flag: flag.map(|f| f.to_string()),
        }
    }

    fn rare_boots(explicits: &[&str]) -> Item {
        let mut item = Item::new("Sorcerer Boots".to_string()).with_rarity(Rarity::Rare);
        item.item_level = Some(85);
        item.explicits = explicits.iter().map(|s| s.to_string()).collect();
        item
    }

    #[test]
    fn test_non_rare_is_always_junk() {
        let engine = ValueRuleEngine::new(&[rule("anything", &["item_level >= 1"], 500.0, None)]);
        let item = Item::new("Divine Orb".to_string()).with_rarity(Rarity::Currency);
        let assessment = engine.assess(&item);
        assert_eq!(assessment.flag, ValueFlag::Junk);
        assert_eq!(assessment.weight, 0.0);
    }

    #[test]
    fn test_numeric_and_bool_conditions() {
        let engine = ValueRuleEngine::new(&[rule(
            "high_ilvl_fractured",
            &["item_level >= 84", "fractured == true"],
            60.0,
            None,
        )]);
        let mut item = rare_boots(&["+100 to maximum Life"]);
        item.is_fractured = true;
        let assessment = engine.assess(&item);
        assert_eq!(assessment.weight, 60.0);
        assert_eq!(assessment.flag, ValueFlag::CraftBase);

        item.is_fractured = false;
        let assessment = engine.assess(&item);
        assert_eq!(assessment.weight, 0.0);
        assert!(assessment.reasons.contains(&"no rules matched".to_string()));
    }

    #[test]
    fn test_mod_pattern_with_placeholder() {
        let engine = ValueRuleEngine::new(&[rule(
            "has_life",
            &["mod ~ '+# to maximum Life'"],
            30.0,
            None,
        )]);
        let assessment = engine.assess(&rare_boots(&["+105 to maximum Life"]));
        assert_eq!(assessment.weight, 30.0);

        let assessment = engine.assess(&rare_boots(&["+5% to Cold Resistance"]));
        assert_eq!(assessment.weight, 0.0);
    }

    #[test]
    fn test_mod_count_condition() {
        let engine = ValueRuleEngine::new(&[rule(
            "triple_resist",
            &["mod_count ~ '+#% to # Resistance' >= 2"],
            40.0,
            None,
        )]);
        // The # placeholder only matches digits, so use per-element rules
        let engine2 = ValueRuleEngine::new(&[rule(
            "double_resist",
            &["mod_count ~ 'Resistance' >= 2"],
            40.0,
            None,
        )]);
        let item = rare_boots(&["+45% to Fire Resistance", "+40% to Cold Resistance"]);
        assert_eq!(engine.assess(&item).weight, 0.0);
        assert_eq!(engine2.assess(&item).weight, 40.0);
    }

    #[test]
    fn test_slot_conditions() {
        let engine = ValueRuleEngine::new(&[
            rule("boots_rule", &["slot == boots"], 20.0, None),
            rule("armour_rule", &["slot in [helmet, body_armour]"], 20.0, None),
        ]);
        let assessment = engine.assess(&rare_boots(&[]));
        assert_eq!(assessment.weight, 20.0);
        assert_eq!(assessment.reasons, vec!["boots_rule"]);
    }

    #[test]
    fn test_flag_priority_wins_over_first_match() {
        let engine = ValueRuleEngine::new(&[
            rule("craft_it", &["item_level >= 80"], 10.0, Some("craft_base")),
            rule("trade_it", &["item_level >= 80"], 10.0, Some("check_trade")),
            rule("junk_it", &["item_level >= 80"], 10.0, Some("junk")),
        ]);
        let assessment = engine.assess(&rare_boots(&[]));
        // check_trade outranks craft_base and junk regardless of order
        assert_eq!(assessment.flag, ValueFlag::CheckTrade);
        assert_eq!(assessment.reasons.len(), 3);
    }

    #[test]
    fn test_weight_fallback_thresholds() {
        let engine = ValueRuleEngine::new(&[
            rule("a", &["item_level >= 80"], 60.0, None),
            rule("b", &["item_level >= 84"], 60.0, None),
        ]);
        let assessment = engine.assess(&rare_boots(&[]));
        assert_eq!(assessment.weight, 120.0);
        assert_eq!(assessment.flag, ValueFlag::CheckTrade);

        let engine = ValueRuleEngine::new(&[rule("a", &["item_level >= 80"], 60.0, None)]);
        assert_eq!(engine.assess(&rare_boots(&[])).flag, ValueFlag::CraftBase);
    }

    #[test]
    fn test_malformed_rules_rejected_at_load() {
        let engine = ValueRuleEngine::new(&[
            rule("bad_op", &["item_level >>> 80"], 10.0, None),
            rule("bad_flag", &["item_level >= 80"], 10.0, Some("nonsense")),
            rule("good", &["item_level >= 80"], 10.0, None),
        ]);
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_slot_applicability_list() {
        let mut def = rule("helmet_only", &["item_level >= 80"], 25.0, None);
        def.slots = vec!["helmet".to_string()];
        let engine = ValueRuleEngine::new(&[def]);
        // Boots do not satisfy a helmet-scoped rule
        assert_eq!(engine.assess(&rare_boots(&[])).weight, 0.0);

        let mut helmet = Item::new("Hubris Circlet".to_string()).with_rarity(Rarity::Rare);
        helmet.item_level = Some(85);
        assert_eq!(engine.assess(&helmet).weight, 25.0);
    }
}
