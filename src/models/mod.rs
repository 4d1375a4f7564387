pub mod evaluation;
pub mod item;
pub mod price;

pub use item::{
    ClusterJewelSize,
    Item,
    Rarity,
};

pub use evaluation::{
    AffixMatch,
    AffixTier,
    ClusterJewelEvaluation,
    CorruptionEvaluation,
    CraftOption,
    CraftingAnalysis,
    LinkEvaluation,
    MetaRelevance,
    ModAnalysis,
    NotableMatch,
    RareItemEvaluation,
    UniqueItemEvaluation,
};

pub use price::{
    MarketPrice,
    PriceStatistics,
};
