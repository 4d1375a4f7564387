use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Normal,
    Magic,
    Rare,
    Unique,
    Currency,
    Gem,
    DivinationCard,
}

impl Rarity {
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "magic" => Rarity::Magic,
            "rare" => Rarity::Rare,
            "unique" => Rarity::Unique,
            "currency" => Rarity::Currency,
            "gem" => Rarity::Gem,
            "divination card" => Rarity::DivinationCard,
            _ => Rarity::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterJewelSize {
    Small,
    Medium,
    Large,
}

impl ClusterJewelSize {
    pub fn from_base_type(base_type: &str) -> Option<Self> {
        if base_type.contains("Large") {
            Some(ClusterJewelSize::Large)
        } else if base_type.contains("Medium") {
            Some(ClusterJewelSize::Medium)
        } else if base_type.contains("Small") {
            Some(ClusterJewelSize::Small)
        } else {
            None
        }
    }
}

/// A structured item as copied from the game client. Built once by the
/// parser and never mutated afterwards; evaluators only borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub rarity: Rarity,
    pub name: Option<String>,
    pub base_type: String,
    pub item_class: Option<String>,
    pub item_level: Option<u32>,
    pub quality: Option<u32>,
    pub sockets: Option<String>,
    // Size of the largest dash-joined socket group in the display string.
    // This is a display heuristic, not true link topology.
    pub links: u32,
    pub stack_size: Option<u32>,
    pub max_stack_size: Option<u32>,
    pub is_corrupted: bool,
    pub is_fractured: bool,
    pub is_synthesised: bool,
    pub is_mirrored: bool,
    pub influences: BTreeSet<String>,
    pub implicits: Vec<String>,
    pub explicits: Vec<String>,
    pub enchants: Vec<String>,
    pub requirements: HashMap<String, u32>,
    pub cluster_jewel_size: Option<ClusterJewelSize>,
    pub cluster_jewel_passives: Option<u32>,
    pub cluster_jewel_enchantment: Option<String>,
    pub cluster_jewel_notables: Vec<String>,
    pub cluster_jewel_sockets: Option<u32>,
}

impl Item {
    pub fn new(base_type: String) -> Self {
        Self {
            rarity: Rarity::Normal,
            name: None,
            base_type,
            item_class: None,
            item_level: None,
            quality: None,
            sockets: None,
            links: 0,
            stack_size: None,
            max_stack_size: None,
            is_corrupted: false,
            is_fractured: false,
            is_synthesised: false,
            is_mirrored: false,
            influences: BTreeSet::new(),
            implicits: Vec::new(),
            explicits: Vec::new(),
            enchants: Vec::new(),
            requirements: HashMap::new(),
            cluster_jewel_size: None,
            cluster_jewel_passives: None,
            cluster_jewel_enchantment: None,
            cluster_jewel_notables: Vec::new(),
            cluster_jewel_sockets: None,
        }
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn is_rare(&self) -> bool {
        self.rarity == Rarity::Rare
    }

    pub fn is_unique(&self) -> bool {
        self.rarity == Rarity::Unique
    }

    pub fn is_cluster_jewel(&self) -> bool {
        self.base_type.contains("Cluster Jewel")
    }

    /// The name shown to the user: the unique/rare name when present,
    /// otherwise the base type.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.base_type)
    }

    pub fn explicit_count(&self) -> usize {
        self.explicits.len()
    }

    pub fn has_any_mods(&self) -> bool {
        !self.explicits.is_empty() || !self.implicits.is_empty() || !self.enchants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_creation_and_display_name() {
        let item = Item::new("Hubris Circlet".to_string())
            .with_rarity(Rarity::Rare)
            .with_name("Gale Crown".to_string());

        assert!(item.is_rare());
        assert_eq!(item.display_name(), "Gale Crown");

        let plain = Item::new("Divine Orb".to_string()).with_rarity(Rarity::Currency);
        assert_eq!(plain.display_name(), "Divine Orb");
    }

    #[test]
    fn test_cluster_jewel_detection() {
        let jewel = Item::new("Large Cluster Jewel".to_string());
        assert!(jewel.is_cluster_jewel());
        assert_eq!(
            ClusterJewelSize::from_base_type(&jewel.base_type),
            Some(ClusterJewelSize::Large)
        );
        assert_eq!(ClusterJewelSize::from_base_type("Cobalt Jewel"), None);
    }

    #[test]
    fn test_rarity_from_header() {
        assert_eq!(Rarity::from_header("Rare"), Rarity::Rare);
        assert_eq!(Rarity::from_header("  unique "), Rarity::Unique);
        assert_eq!(Rarity::from_header("Divination Card"), Rarity::DivinationCard);
        assert_eq!(Rarity::from_header("Whatever"), Rarity::Normal);
    }
}
