use crate::config::{ClusterTables, NotableInfo};
use crate::models::{ClusterJewelEvaluation, ClusterJewelSize, Item, NotableMatch};

// Score scaling per jewel size; large jewels carry more passives and
// more notable slots
fn size_multiplier(size: ClusterJewelSize) -> f64 {
    match size {
        ClusterJewelSize::Small => 0.8,
        ClusterJewelSize::Medium => 1.0,
        ClusterJewelSize::Large => 1.2,
    }
}

// Market baseline per size, applied to the combined score
fn base_value_multiplier(size: ClusterJewelSize) -> f64 {
    match size {
        ClusterJewelSize::Small => 0.7,
        ClusterJewelSize::Medium => 1.0,
        ClusterJewelSize::Large => 1.15,
    }
}

fn max_notables(size: ClusterJewelSize) -> usize {
    match size {
        ClusterJewelSize::Small => 1,
        ClusterJewelSize::Medium => 2,
        ClusterJewelSize::Large => 3,
    }
}

/// Scores cluster jewels from the notable database, enchantment value
/// table, and synergy combos.
pub struct ClusterJewelEvaluator {
    tables: ClusterTables,
}

impl ClusterJewelEvaluator {
    pub fn new(tables: ClusterTables) -> Self {
        Self { tables }
    }

    pub fn is_cluster_jewel(&self, item: &Item) -> bool {
        item.is_cluster_jewel()
    }

    pub fn evaluate(&self, item: &Item) -> Option<ClusterJewelEvaluation> {
        if !self.is_cluster_jewel(item) {
            return None;
        }

        let size = item.cluster_jewel_size.unwrap_or(ClusterJewelSize::Medium);
        let scale = size_multiplier(size);
        let mut factors = Vec::new();

        // Enchantment value, scaled by size and capped
        let enchantment_score = item
            .cluster_jewel_enchantment
            .as_deref()
            .and_then(|key| self.tables.enchants.get(key))
            .map(|e| (e.weight * e.meta_multiplier * scale).min(100.0))
            .unwrap_or(0.0);
        if enchantment_score > 0.0 {
            factors.push(format!(
                "valued enchantment: {}",
                item.cluster_jewel_enchantment.as_deref().unwrap_or("?")
            ));
        }

        // New game content may not be catalogued yet; unknown notables
        // still score a medium default instead of being dropped
        let mut notables: Vec<NotableMatch> = item
            .cluster_jewel_notables
            .iter()
            .map(|name| {
                let info = self.tables.notables.get(name).cloned().unwrap_or(NotableInfo {
                    tier: "medium".to_string(),
                    weight: 5,
                    is_meta: false,
                });
                NotableMatch {
                    name: name.clone(),
                    tier: info.tier,
                    weight: info.weight,
                    is_meta: info.is_meta,
                    has_synergy: false,
                }
            })
            .collect();

        let notable_weight: u32 = notables.iter().map(|n| n.weight).sum();
        let notable_score = notable_score(notables.len(), notable_weight as f64);
        let meta_count = notables.iter().filter(|n| n.is_meta).count();
        if meta_count > 0 {
            factors.push(format!("{} meta notables", meta_count));
        }

        // Synergy combos: a combo applies when the jewel carries every
        // notable it names
        let mut synergy_bonus = 0.0;
        for combo in &self.tables.combos {
            let complete = combo
                .notables
                .iter()
                .all(|needed| notables.iter().any(|n| &n.name == needed));
            if complete {
                synergy_bonus += combo.bonus;
                for n in notables.iter_mut() {
                    if combo.notables.contains(&n.name) {
                        n.has_synergy = true;
                    }
                }
                factors.push(format!("notable combo: {}", combo.name));
            }
        }

        // High item level matters most on large jewels, which have more
        // notable slots to reroll
        let ilvl = item.item_level.unwrap_or(0);
        let item_level_bonus = match ilvl {
            l if l >= 84 => 15.0,
            l if l >= 75 => 10.0,
            l if l >= 68 => 5.0,
            _ => 0.0,
        } * scale;
        if ilvl >= 75 {
            factors.push(format!("item level {}", ilvl));
        }

        // Open notable slots leave crafting room
        let mut crafting_bonus = 0.0;
        if notables.len() < max_notables(size) {
            crafting_bonus = 8.0;
            if ilvl >= 75 {
                crafting_bonus += 7.0;
            }
            factors.push("open notable slot".to_string());
        }

        let socket_bonus = item.cluster_jewel_sockets.unwrap_or(0) as f64 * 10.0;
        if socket_bonus > 0.0 {
            factors.push(format!(
                "{} jewel sockets",
                item.cluster_jewel_sockets.unwrap_or(0)
            ));
        }

        let total_score = ((0.5 * notable_score
            + 0.25 * enchantment_score
            + synergy_bonus
            + item_level_bonus
            + crafting_bonus
            + socket_bonus)
            * base_value_multiplier(size))
        .clamp(0.0, 100.0);

        let has_synergy = synergy_bonus > 0.0;
        let sockets = item.cluster_jewel_sockets.unwrap_or(0);
        let (tier, estimated_value) = if total_score >= 75.0
            && meta_count >= 1
            && (has_synergy || size == ClusterJewelSize::Large)
            && sockets >= 2
        {
            ("excellent".to_string(), "1-5div".to_string())
        } else if total_score >= 60.0 && (meta_count >= 1 || has_synergy) {
            ("good".to_string(), "50-150c".to_string())
        } else if total_score >= 40.0 {
            ("average".to_string(), "10-50c".to_string())
        } else {
            ("vendor".to_string(), "<10c".to_string())
        };

        Some(ClusterJewelEvaluation {
            tier,
            total_score,
            notable_score,
            enchantment_score,
            synergy_bonus,
            item_level_bonus,
            crafting_bonus,
            socket_bonus,
            notables,
            estimated_value,
            factors,
        })
    }
}

// Same shape as the rare affix score: count gates first, then weight
fn notable_score(count: usize, weight: f64) -> f64 {
    if count == 0 {
        0.0
    } else if count >= 3 && weight >= 20.0 {
        (55.0 + weight).min(100.0)
    } else if count >= 2 && weight >= 12.0 {
        (35.0 + 2.0 * weight).min(100.0)
    } else {
        (15.0 + 3.0 * weight).min(100.0)
    }
}
