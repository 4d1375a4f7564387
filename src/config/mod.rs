use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// One roll-range row in a stat's tier ladder. Rows are ordered best
/// tier first; classification picks the first containing range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRange {
    pub tier: u32,
    #[serde(default)]
    pub min_item_level: u32,
    pub min_roll: f64,
    pub max_roll: f64,
}

/// Tier ladder for one canonical stat, with the pattern used to pull
/// the rolled value out of the mod text (`#` marks the number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatTierEntry {
    pub pattern: String,
    pub tiers: Vec<TierRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternWeight {
    pub pattern: String,
    pub weight: u32,
}

/// Scoring configuration for one affix type on rare items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixConfig {
    /// Importance weight, 1-10.
    pub weight: u32,
    /// Rolls below this value are ignored entirely.
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub tier1: Vec<String>,
    #[serde(default)]
    pub tier2: Vec<String>,
    #[serde(default)]
    pub tier3: Vec<String>,
    /// Numeric ranges used to re-derive the actual tier from the
    /// matched value, independent of which pattern list matched.
    #[serde(default)]
    pub tier1_range: Option<(f64, f64)>,
    #[serde(default)]
    pub tier2_range: Option<(f64, f64)>,
    #[serde(default)]
    pub tier3_range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyRule {
    pub name: String,
    /// Required affix-type counts, all of which must be satisfied.
    pub requires: HashMap<String, u32>,
    pub bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingRequired {
    pub slot: String,
    pub affix: String,
}

/// A red-flag rule: either two affix types that should never share an
/// item, or an affix a slot cannot do without.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedFlagRule {
    pub name: String,
    #[serde(default)]
    pub has_both: Option<(String, String)>,
    #[serde(default)]
    pub missing_required: Option<MissingRequired>,
    pub penalty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRule {
    #[serde(default)]
    pub premium_bases: Vec<String>,
    #[serde(default)]
    pub premium_bonus: f64,
    /// Slot-optimal affix set; the bonus applies when 3+ are present.
    #[serde(default)]
    pub bonus_affixes: Vec<String>,
    #[serde(default)]
    pub bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeConfig {
    #[serde(default)]
    pub priority_affixes: Vec<String>,
    #[serde(default)]
    pub disqualifiers: Vec<String>,
    /// Per-affix weight multipliers for archetype-specific rescoring.
    #[serde(default)]
    pub weight_multipliers: HashMap<String, f64>,
}

/// Everything the rare-item evaluator needs, in one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RareTables {
    #[serde(default)]
    pub affixes: HashMap<String, AffixConfig>,
    #[serde(default)]
    pub influence_mods: HashMap<String, Vec<PatternWeight>>,
    #[serde(default)]
    pub high_tier_bases: Vec<String>,
    #[serde(default)]
    pub synergies: Vec<SynergyRule>,
    #[serde(default)]
    pub red_flags: Vec<RedFlagRule>,
    #[serde(default)]
    pub slot_rules: HashMap<String, SlotRule>,
    #[serde(default)]
    pub archetypes: HashMap<String, ArchetypeConfig>,
    #[serde(default)]
    pub meta_popularity: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotableInfo {
    pub tier: String,
    pub weight: u32,
    #[serde(default)]
    pub is_meta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnchantValue {
    pub weight: f64,
    #[serde(default = "default_multiplier")]
    pub meta_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotableCombo {
    pub name: String,
    pub notables: Vec<String>,
    pub bonus: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterTables {
    #[serde(default)]
    pub notables: HashMap<String, NotableInfo>,
    #[serde(default)]
    pub enchants: HashMap<String, EnchantValue>,
    #[serde(default)]
    pub combos: Vec<NotableCombo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitOverride {
    pub pattern: String,
    /// "excellent" / "high" / "good" / "niche".
    pub tier: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkValues {
    pub six_link_multiplier: f64,
    pub five_link_multiplier: f64,
    pub white_socket_bonus: f64,
}

impl Default for LinkValues {
    fn default() -> Self {
        Self {
            six_link_multiplier: 2.5,
            five_link_multiplier: 1.3,
            white_socket_bonus: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaBuild {
    pub name: String,
    /// Popularity tier, e.g. "S" / "A" / "B".
    pub tier: String,
    pub usage: f64,
    #[serde(default)]
    pub trending: bool,
    #[serde(default)]
    pub key_items: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniqueTables {
    #[serde(default)]
    pub implicit_overrides: Vec<ImplicitOverride>,
    #[serde(default)]
    pub keystones: Vec<PatternWeight>,
    #[serde(default)]
    pub brick_patterns: Vec<String>,
    #[serde(default = "default_white_socket_weight")]
    pub white_socket_weight: f64,
    #[serde(default)]
    pub chase_uniques: Vec<String>,
    #[serde(default)]
    pub links: LinkValues,
    #[serde(default)]
    pub builds: Vec<MetaBuild>,
}

fn default_white_socket_weight() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchCraft {
    pub name: String,
    pub description: String,
    /// "prefix" or "suffix".
    pub side: String,
    /// Slots the craft makes sense for; empty means any.
    #[serde(default)]
    pub slots: Vec<String>,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CraftingTables {
    #[serde(default)]
    pub prefix_stats: Vec<String>,
    #[serde(default)]
    pub suffix_stats: Vec<String>,
    #[serde(default)]
    pub bench_crafts: Vec<BenchCraft>,
}

/// Raw value rule as written in the data file; compiled by the rule
/// engine at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRuleDef {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<String>,
    pub conditions: Vec<String>,
    pub weight: f64,
    #[serde(default)]
    pub flag: Option<String>,
}

/// All static data tables, loaded once at startup and passed by
/// constructor injection into each evaluator. A missing or corrupt
/// file degrades to an empty table with a single logged warning;
/// evaluation must still run, just with systematically lower scores.
#[derive(Debug, Clone, Default)]
pub struct ConfigTables {
    pub stat_tiers: HashMap<String, StatTierEntry>,
    pub rare: RareTables,
    pub cluster: ClusterTables,
    pub unique: UniqueTables,
    pub crafting: CraftingTables,
    pub value_rules: Vec<ValueRuleDef>,
}

impl ConfigTables {
    pub fn load_from_dir(dir: &Path) -> Self {
        Self {
            stat_tiers: load_table(dir, "stat_tiers.json"),
            rare: load_table(dir, "rare.json"),
            cluster: load_table(dir, "cluster.json"),
            unique: load_table(dir, "unique.json"),
            crafting: load_table(dir, "crafting.json"),
            value_rules: load_table(dir, "value_rules.json"),
        }
    }
}

fn load_table<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> T {
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            warn!(file = %path.display(), %err, "data table missing, using empty table");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(table) => table,
        Err(err) => {
            warn!(file = %path.display(), %err, "data table corrupt, using empty table");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_degrades_to_empty_tables() {
        let tables = ConfigTables::load_from_dir(Path::new("/nonexistent/data/dir"));
        assert!(tables.stat_tiers.is_empty());
        assert!(tables.rare.affixes.is_empty());
        assert!(tables.value_rules.is_empty());
    }

    #[test]
    fn test_rare_tables_deserialization() {
        let json = r#"{
            "affixes": {
                "maximum_life": {
                    "weight": 10,
                    "min_value": 60,
                    "tier1": ["+# to maximum Life"],
                    "tier1_range": [100, 129]
                }
            },
            "high_tier_bases": ["Hubris Circlet"],
            "synergies": [
                {"name": "life_res", "requires": {"maximum_life": 1, "fire_resistance": 1}, "bonus": 10}
            ]
        }"#;
        let tables: RareTables = serde_json::from_str(json).unwrap();
        let life = &tables.affixes["maximum_life"];
        assert_eq!(life.weight, 10);
        assert_eq!(life.tier1_range, Some((100.0, 129.0)));
        assert!(life.tier2.is_empty());
        assert_eq!(tables.synergies[0].requires["maximum_life"], 1);
    }

    #[test]
    fn test_link_values_defaults() {
        let tables: UniqueTables = serde_json::from_str("{}").unwrap();
        assert_eq!(tables.links.six_link_multiplier, 2.5);
        assert_eq!(tables.links.five_link_multiplier, 1.3);
        assert_eq!(tables.white_socket_weight, 5.0);
    }
}
