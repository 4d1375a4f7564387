use crate::analyzer::{
    ClusterJewelEvaluator, CraftingPotentialAnalyzer, RareItemEvaluator, UniqueItemEvaluator,
};
use crate::config::ConfigTables;
use crate::models::{
    ClusterJewelEvaluation, CraftingAnalysis, Item, RareItemEvaluation, UniqueItemEvaluation,
};
use crate::parser::ItemTextParser;
use crate::rules::{ValueAssessment, ValueRuleEngine};

/// Which evaluator handled the item, with its result.
#[derive(Debug, Clone)]
pub enum Verdict {
    ClusterJewel(ClusterJewelEvaluation),
    Unique(UniqueItemEvaluation),
    Rare(RareItemEvaluation),
    /// Currency, gems, cards: priced purely by market data upstream.
    MarketOnly,
}

impl Verdict {
    pub fn tier(&self) -> &str {
        match self {
            Verdict::ClusterJewel(e) => &e.tier,
            Verdict::Unique(e) => &e.tier,
            Verdict::Rare(e) => &e.tier,
            Verdict::MarketOnly => "market",
        }
    }

    pub fn total_score(&self) -> f64 {
        match self {
            Verdict::ClusterJewel(e) => e.total_score,
            Verdict::Unique(e) => e.total_score,
            Verdict::Rare(e) => e.total_score,
            Verdict::MarketOnly => 0.0,
        }
    }

    pub fn estimated_value(&self) -> &str {
        match self {
            Verdict::ClusterJewel(e) => &e.estimated_value,
            Verdict::Unique(e) => &e.estimated_value,
            Verdict::Rare(e) => &e.estimated_value,
            Verdict::MarketOnly => "see market price",
        }
    }

    pub fn factors(&self) -> &[String] {
        match self {
            Verdict::ClusterJewel(e) => &e.factors,
            Verdict::Unique(e) => &e.factors,
            Verdict::Rare(e) => &e.factors,
            Verdict::MarketOnly => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Appraisal {
    pub verdict: Verdict,
    pub crafting: Option<CraftingAnalysis>,
    pub assessment: ValueAssessment,
}

/// Owns every evaluator plus the parser, built once from the loaded
/// tables. Hot-reloading tables means building a new Appraiser, never
/// mutating this one.
pub struct Appraiser {
    parser: ItemTextParser,
    rare: RareItemEvaluator,
    cluster: ClusterJewelEvaluator,
    unique: UniqueItemEvaluator,
    crafting: CraftingPotentialAnalyzer,
    rules: ValueRuleEngine,
}

impl Appraiser {
    pub fn new(tables: ConfigTables) -> Self {
        Self {
            parser: ItemTextParser::new(),
            rare: RareItemEvaluator::new(tables.rare),
            cluster: ClusterJewelEvaluator::new(tables.cluster),
            unique: UniqueItemEvaluator::new(tables.unique),
            crafting: CraftingPotentialAnalyzer::new(&tables.stat_tiers, tables.crafting),
            rules: ValueRuleEngine::new(&tables.value_rules),
        }
    }

    pub fn parser(&self) -> &ItemTextParser {
        &self.parser
    }

    /// Routes a parsed item to the right evaluator: cluster jewels
    /// first (they are rare items too), then uniques, then rares.
    pub fn appraise(&self, item: &Item, market_price: Option<f64>) -> Appraisal {
        let verdict = if self.cluster.is_cluster_jewel(item) {
            match self.cluster.evaluate(item) {
                Some(eval) => Verdict::ClusterJewel(eval),
                None => Verdict::MarketOnly,
            }
        } else if self.unique.is_unique_item(item) {
            match self.unique.evaluate(item, market_price) {
                Some(eval) => Verdict::Unique(eval),
                None => Verdict::MarketOnly,
            }
        } else if item.is_rare() {
            Verdict::Rare(self.rare.evaluate(item))
        } else {
            Verdict::MarketOnly
        };

        // Crafting upside only makes sense for rare equipment
        let crafting = match &verdict {
            Verdict::Rare(_) => Some(self.crafting.analyze(item)),
            _ => None,
        };

        let assessment = self.rules.assess(item);

        Appraisal { verdict, crafting, assessment }
    }
}
