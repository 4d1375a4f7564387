use regex::Regex;
use tracing::debug;

use crate::models::{ClusterJewelSize, Item, Rarity};

const MIN_TEXT_LENGTH: usize = 10;

// Influence lines as they appear in item text, paired with the
// normalized tag we store
const INFLUENCE_KEYWORDS: &[(&str, &str)] = &[
    ("Shaper Item", "Shaper"),
    ("Elder Item", "Elder"),
    ("Crusader Item", "Crusader"),
    ("Redeemer Item", "Redeemer"),
    ("Hunter Item", "Hunter"),
    ("Warlord Item", "Warlord"),
    ("Searing Exarch Item", "Exarch"),
    ("Eater of Worlds Item", "Eater"),
];

// Ordered phrase -> category table for cluster jewel enchantments.
// First containing phrase wins, so more specific phrases come first.
const ENCHANT_CATEGORIES: &[(&str, &str)] = &[
    ("Minions deal", "minion_damage"),
    ("Fire Damage", "fire_damage"),
    ("Cold Damage", "cold_damage"),
    ("Lightning Damage", "lightning_damage"),
    ("Physical Damage", "physical_damage"),
    ("Chaos Damage", "chaos_damage"),
    ("Attack Damage", "attack_damage"),
    ("Spell Damage", "spell_damage"),
    ("Projectile Damage", "projectile_damage"),
    ("Damage over Time", "damage_over_time"),
    ("Maximum Life", "life"),
    ("maximum Energy Shield", "energy_shield"),
    ("Maximum Mana", "mana"),
    ("Armour", "armour"),
    ("Evasion", "evasion"),
    ("Chaos Resistance", "chaos_resistance"),
    ("Elemental Resistances", "resistances"),
];

/// Converts raw clipboard text from the game client into a structured
/// [`Item`]. All recognizable-structure failures surface as `None`;
/// malformed clipboard content is an expected, frequent input.
pub struct ItemTextParser {
    separator: Regex,
    stack_size: Regex,
    quality: Regex,
    item_level: Regex,
    requirement: Regex,
    cluster_passives: Regex,
    cluster_notable: Regex,
    cluster_sockets: Regex,
    enchant_tag: Regex,
    implicit_tag: Regex,
}

impl ItemTextParser {
    pub fn new() -> Self {
        // These patterns are fixed; a failure here is a programming error,
        // caught by the constructor test below.
        Self {
            separator: Regex::new(r"^-{5,}$").unwrap(),
            stack_size: Regex::new(r"^Stack Size:\s*([\d,]+)/([\d,]+)").unwrap(),
            quality: Regex::new(r"^Quality:\s*\+(\d+)%").unwrap(),
            item_level: Regex::new(r"^Item Level:\s*(\d+)").unwrap(),
            requirement: Regex::new(r"^(Level|Str|Dex|Int):\s*(\d+)").unwrap(),
            cluster_passives: Regex::new(r"Adds (\d+) Passive Skills").unwrap(),
            cluster_notable: Regex::new(r"^1 Added Passive Skill is (.+)$").unwrap(),
            cluster_sockets: Regex::new(r"Adds (\d+) Jewel Sockets?").unwrap(),
            enchant_tag: Regex::new(r"(?i)\(enchant\)").unwrap(),
            implicit_tag: Regex::new(r"(?i)\(implicit\)").unwrap(),
        }
    }

    /// Parses one item's worth of clipboard text. Returns `None` for
    /// empty, too-short, or structurally unrecognizable input.
    pub fn parse(&self, text: &str) -> Option<Item> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.len() < MIN_TEXT_LENGTH {
            return None;
        }

        let lines: Vec<&str> = trimmed.lines().map(|l| l.trim()).collect();
        let mut idx = 0;

        let mut item_class: Option<String> = None;
        let mut rarity: Option<Rarity> = None;
        let mut stack_size: Option<u32> = None;
        let mut max_stack_size: Option<u32> = None;

        // Header phase. The Item Class line is informational; currency
        // presents its stack size before the rarity line.
        if let Some(line) = lines.get(idx) {
            if let Some(value) = line.strip_prefix("Item Class:") {
                item_class = Some(value.trim().to_string());
                idx += 1;
            }
        }
        if let Some(line) = lines.get(idx) {
            if let Some((current, max)) = self.match_stack_size(line) {
                stack_size = Some(current);
                max_stack_size = Some(max);
                idx += 1;
            }
        }
        if let Some(line) = lines.get(idx) {
            if let Some(value) = line.strip_prefix("Rarity:") {
                rarity = Some(Rarity::from_header(value));
                idx += 1;
            }
        }

        // Up to two non-separator lines follow: name, then base type.
        // A single line means the item is single-named (Normal, Magic,
        // Currency) and we keep only the base type.
        let mut header_names: Vec<String> = Vec::new();
        while header_names.len() < 2 {
            match lines.get(idx) {
                Some(line) if !line.is_empty() && !self.separator.is_match(line) => {
                    header_names.push((*line).to_string());
                    idx += 1;
                }
                _ => break,
            }
        }
        let (name, base_type) = match header_names.len() {
            2 => {
                let name = header_names[0].clone();
                let base = header_names[1].clone();
                if name == base {
                    (None, base)
                } else {
                    (Some(name), base)
                }
            }
            1 => (None, header_names[0].clone()),
            _ => (None, String::new()),
        };

        let mut item = Item::new(base_type);
        item.name = name;
        item.item_class = item_class;
        item.stack_size = stack_size;
        item.max_stack_size = max_stack_size;
        if let Some(r) = rarity {
            item.rarity = r;
        }

        // Body phase: a running section counter driven by separator and
        // blank lines, with specific prefixes recognized in any section.
        let mut section_counter = 0u32;
        let mut in_requirements = false;
        let mut saw_uncorrupted = false;

        for line in lines.iter().skip(idx) {
            if line.is_empty() || self.separator.is_match(line) {
                section_counter += 1;
                in_requirements = false;
                continue;
            }

            if in_requirements {
                if let Some(caps) = self.requirement.captures(line) {
                    if let Ok(value) = caps[2].parse::<u32>() {
                        item.requirements.insert(caps[1].to_string(), value);
                    }
                    continue;
                }
                // Any non-matching line leaves the requirements block
                in_requirements = false;
            }

            if let Some(value) = line.strip_prefix("Item Class:") {
                item.item_class = Some(value.trim().to_string());
                continue;
            }
            if let Some(caps) = self.item_level.captures(line) {
                item.item_level = caps[1].parse().ok();
                continue;
            }
            if let Some((current, max)) = self.match_stack_size(line) {
                item.stack_size = Some(current);
                item.max_stack_size = Some(max);
                continue;
            }
            if let Some(caps) = self.quality.captures(line) {
                item.quality = caps[1].parse().ok();
                continue;
            }
            if let Some(value) = line.strip_prefix("Sockets:") {
                let sockets = value.trim().to_string();
                item.links = largest_link_group(&sockets);
                item.sockets = Some(sockets);
                continue;
            }
            if line.starts_with("Requirements:") {
                in_requirements = true;
                continue;
            }

            match *line {
                "Corrupted" => {
                    item.is_corrupted = true;
                    continue;
                }
                "Uncorrupted" => {
                    saw_uncorrupted = true;
                    continue;
                }
                "Fractured Item" => {
                    item.is_fractured = true;
                    continue;
                }
                "Synthesised Item" => {
                    item.is_synthesised = true;
                    continue;
                }
                "Mirrored" => {
                    item.is_mirrored = true;
                    continue;
                }
                _ => {}
            }

            let mut influenced = false;
            for (keyword, tag) in INFLUENCE_KEYWORDS {
                if line.contains(keyword) {
                    item.influences.insert((*tag).to_string());
                    influenced = true;
                }
            }
            if influenced {
                continue;
            }

            // Everything else past the second separator is a mod line
            if section_counter >= 2 {
                if self.enchant_tag.is_match(line) {
                    item.enchants.push(strip_tag(line, &self.enchant_tag));
                } else if self.implicit_tag.is_match(line) {
                    item.implicits.push(strip_tag(line, &self.implicit_tag));
                } else {
                    item.explicits.push((*line).to_string());
                }
            }
        }

        if saw_uncorrupted {
            item.is_corrupted = false;
        }

        if item.is_cluster_jewel() {
            self.detect_cluster_fields(&mut item);
        }

        if !self.has_valid_structure(&item, rarity.is_some()) {
            debug!(text_len = trimmed.len(), "rejected text with no item structure");
            return None;
        }

        Some(item)
    }

    /// Splits bulk text into item segments and parses each one,
    /// silently skipping segments that fail to parse.
    pub fn parse_multiple(&self, bulk_text: &str) -> Vec<Item> {
        let mut segments: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut blank_run = false;

        for line in bulk_text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                blank_run = true;
                current.push(line);
                continue;
            }
            // A new Rarity header after a blank run, or in a segment that
            // already has one, starts the next item
            let starts_item = trimmed.starts_with("Rarity:")
                && (blank_run || current.iter().any(|l| l.trim().starts_with("Rarity:")));
            if starts_item && !current.iter().all(|l| l.trim().is_empty()) {
                segments.push(std::mem::take(&mut current));
            }
            blank_run = false;
            current.push(line);
        }
        if !current.is_empty() {
            segments.push(current);
        }

        segments
            .into_iter()
            .filter_map(|segment| {
                let first = segment.iter().map(|l| l.trim()).find(|l| !l.is_empty())?;
                if !first.starts_with("Rarity:") && !first.starts_with("Stack Size:") {
                    return None;
                }
                self.parse(&segment.join("\n"))
            })
            .collect()
    }

    fn match_stack_size(&self, line: &str) -> Option<(u32, u32)> {
        let caps = self.stack_size.captures(line)?;
        let current = caps[1].replace(',', "").parse().ok()?;
        let max = caps[2].replace(',', "").parse().ok()?;
        Some((current, max))
    }

    // Heuristic guard against pasted garbage: some recognizable item
    // structure must be present
    fn has_valid_structure(&self, item: &Item, rarity_present: bool) -> bool {
        rarity_present
            || item.stack_size.map_or(false, |s| s > 1)
            || item.item_level.is_some()
            || !item.explicits.is_empty()
            || !item.implicits.is_empty()
            || item.quality.is_some()
    }

    fn detect_cluster_fields(&self, item: &mut Item) {
        item.cluster_jewel_size = ClusterJewelSize::from_base_type(&item.base_type);

        for enchant in &item.enchants {
            if let Some(caps) = self.cluster_passives.captures(enchant) {
                item.cluster_jewel_passives = caps[1].parse().ok();
            }
            if enchant.contains("Added Small Passive Skills grant") {
                let category = ENCHANT_CATEGORIES
                    .iter()
                    .find(|(phrase, _)| enchant.contains(phrase))
                    .map(|(_, category)| *category)
                    .unwrap_or("unknown");
                item.cluster_jewel_enchantment = Some(category.to_string());
            }
        }

        for explicit in &item.explicits {
            if let Some(caps) = self.cluster_notable.captures(explicit) {
                item.cluster_jewel_notables.push(caps[1].trim().to_string());
            }
            if let Some(caps) = self.cluster_sockets.captures(explicit) {
                item.cluster_jewel_sockets = caps[1].parse().ok();
            }
        }
    }
}

impl Default for ItemTextParser {
    fn default() -> Self {
        Self::new()
    }
}

// Size of the largest dash-joined group in the display socket string.
// "R-G-B R-R" has groups of 3 and 2, so the result is 3. The display
// string cannot express branching links, so this stays a heuristic.
fn largest_link_group(sockets: &str) -> u32 {
    sockets
        .split_whitespace()
        .map(|group| group.split('-').count() as u32)
        .max()
        .unwrap_or(0)
}

// Removing the tag through the regex keeps byte offsets aligned with
// the original line, whatever characters precede the tag
fn strip_tag(line: &str, tag: &Regex) -> String {
    tag.replace(line, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ItemTextParser {
        ItemTextParser::new()
    }

    #[test]
    fn test_rejects_garbage_input() {
        let p = parser();
        assert!(p.parse("").is_none());
        assert!(p.parse("   ").is_none());
        assert!(p.parse("X").is_none());
        assert!(p.parse("just a random sentence with no item structure at all").is_none());
    }

    #[test]
    fn test_parses_currency_with_stack_size() {
        let text = "Rarity: Currency\nDivine Orb\n--------\nStack Size: 1/10\n--------";
        let item = parser().parse(text).expect("currency should parse");
        assert_eq!(item.rarity, Rarity::Currency);
        // Single-line-named items keep only the base type
        assert!(item.name.is_none());
        assert_eq!(item.base_type, "Divine Orb");
        assert_eq!(item.stack_size, Some(1));
        assert_eq!(item.max_stack_size, Some(10));
    }

    #[test]
    fn test_stack_size_before_rarity() {
        let text = "Stack Size: 5/20\nRarity: Currency\nChaos Orb\n--------\n--------";
        let item = parser().parse(text).expect("should parse");
        assert_eq!(item.stack_size, Some(5));
        assert_eq!(item.rarity, Rarity::Currency);
    }

    fn rare_helmet_text() -> String {
        [
            "Item Class: Helmets",
            "Rarity: Rare",
            "Gale Crown",
            "Hubris Circlet",
            "--------",
            "Quality: +20%",
            "Sockets: R-G-B R-R",
            "--------",
            "Requirements:",
            "Level: 69",
            "Int: 154",
            "--------",
            "Item Level: 85",
            "--------",
            "+32 to maximum Energy Shield (implicit)",
            "--------",
            "+105 to maximum Life",
            "+45% to Fire Resistance",
            "+38 to Intelligence (crafted)",
            "--------",
            "Searing Exarch Item",
            "Eater of Worlds Item",
            "Shaper Item",
            "--------",
            "Corrupted",
        ]
        .join("\n")
    }

    #[test]
    fn test_parses_rare_helmet() {
        let item = parser().parse(&rare_helmet_text()).expect("helmet should parse");
        assert_eq!(item.rarity, Rarity::Rare);
        assert_eq!(item.name.as_deref(), Some("Gale Crown"));
        assert_eq!(item.base_type, "Hubris Circlet");
        assert_eq!(item.item_class.as_deref(), Some("Helmets"));
        assert_eq!(item.item_level, Some(85));
        assert_eq!(item.quality, Some(20));
        assert_eq!(item.requirements.get("Level"), Some(&69));
        assert_eq!(item.requirements.get("Int"), Some(&154));
        assert_eq!(item.implicits, vec!["+32 to maximum Energy Shield"]);
        assert_eq!(item.explicits.len(), 3);
        // Crafted suffix stays on the line for downstream consumers
        assert!(item.explicits[2].contains("(crafted)"));
        assert!(item.is_corrupted);
    }

    #[test]
    fn test_links_use_largest_group_not_total() {
        let item = parser().parse(&rare_helmet_text()).unwrap();
        assert_eq!(item.sockets.as_deref(), Some("R-G-B R-R"));
        assert_eq!(item.links, 3);
    }

    #[test]
    fn test_influences_are_normalized() {
        let item = parser().parse(&rare_helmet_text()).unwrap();
        let tags: Vec<&str> = item.influences.iter().map(|s| s.as_str()).collect();
        assert_eq!(tags, vec!["Eater", "Exarch", "Shaper"]);
    }

    #[test]
    fn test_uncorrupted_overrides_corrupted() {
        let text = "Rarity: Rare\nDoom Veil\nVaal Mask\n--------\nItem Level: 80\n--------\n+40 to maximum Life\n--------\nCorrupted\nUncorrupted";
        let item = parser().parse(text).unwrap();
        assert!(!item.is_corrupted);
    }

    #[test]
    fn test_enchant_and_implicit_tags_are_stripped() {
        let text = [
            "Rarity: Rare",
            "Storm Halo",
            "Iron Circlet",
            "--------",
            "Item Level: 70",
            "--------",
            "40% increased Damage (Enchant)",
            "+12% to all Elemental Resistances (implicit)",
            "+80 to maximum Life",
        ]
        .join("\n");
        let item = parser().parse(&text).unwrap();
        assert_eq!(item.enchants, vec!["40% increased Damage"]);
        assert_eq!(item.implicits, vec!["+12% to all Elemental Resistances"]);
        assert_eq!(item.explicits, vec!["+80 to maximum Life"]);
    }

    #[test]
    fn test_tag_stripping_survives_multibyte_mod_text() {
        // "İ" lowercases to two characters, so any byte offset computed
        // on a lowercased copy would misalign against the original line
        let text = [
            "Rarity: Rare",
            "Storm Halo",
            "Iron Circlet",
            "--------",
            "Item Level: 70",
            "--------",
            "İnferno Touch effect (Enchant)",
            "+12% to all Elemental Resistances (implicit)",
        ]
        .join("\n");
        let item = parser().parse(&text).unwrap();
        assert_eq!(item.enchants, vec!["İnferno Touch effect"]);
        assert_eq!(item.implicits, vec!["+12% to all Elemental Resistances"]);
    }

    fn cluster_jewel_text() -> String {
        [
            "Item Class: Jewels",
            "Rarity: Rare",
            "Whorl Splinter",
            "Large Cluster Jewel",
            "--------",
            "Item Level: 84",
            "--------",
            "Adds 8 Passive Skills (enchant)",
            "Added Small Passive Skills grant: 12% increased Fire Damage (enchant)",
            "--------",
            "Adds 2 Jewel Sockets",
            "1 Added Passive Skill is Burning Bright",
            "1 Added Passive Skill is Cremator",
        ]
        .join("\n")
    }

    #[test]
    fn test_cluster_jewel_fields() {
        let item = parser().parse(&cluster_jewel_text()).expect("jewel should parse");
        assert_eq!(item.cluster_jewel_size, Some(ClusterJewelSize::Large));
        assert_eq!(item.cluster_jewel_passives, Some(8));
        assert_eq!(item.cluster_jewel_enchantment.as_deref(), Some("fire_damage"));
        assert_eq!(item.cluster_jewel_sockets, Some(2));
        assert_eq!(
            item.cluster_jewel_notables,
            vec!["Burning Bright", "Cremator"]
        );
    }

    #[test]
    fn test_unknown_enchant_category() {
        let text = [
            "Rarity: Magic",
            "Small Cluster Jewel",
            "--------",
            "Item Level: 50",
            "--------",
            "Added Small Passive Skills grant: Something Brand New (enchant)",
        ]
        .join("\n");
        let item = parser().parse(&text).unwrap();
        assert_eq!(item.cluster_jewel_enchantment.as_deref(), Some("unknown"));
        assert_eq!(item.cluster_jewel_size, Some(ClusterJewelSize::Small));
    }

    #[test]
    fn test_parse_multiple_skips_bad_segments() {
        let bulk = [
            "Rarity: Currency",
            "Chaos Orb",
            "--------",
            "Stack Size: 23/20",
            "",
            "",
            "this is not an item at all",
            "",
            "Rarity: Rare",
            "Gale Crown",
            "Hubris Circlet",
            "--------",
            "Item Level: 85",
            "--------",
            "+105 to maximum Life",
        ]
        .join("\n");
        let items = parser().parse_multiple(&bulk);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].base_type, "Chaos Orb");
        assert_eq!(items[1].base_type, "Hubris Circlet");
    }

    #[test]
    fn test_parse_multiple_splits_on_rarity_lookahead() {
        // No blank line between the two items
        let bulk = [
            "Rarity: Currency",
            "Chaos Orb",
            "--------",
            "Stack Size: 23/20",
            "Rarity: Currency",
            "Divine Orb",
            "--------",
            "Stack Size: 3/10",
        ]
        .join("\n");
        let items = parser().parse_multiple(&bulk);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].base_type, "Divine Orb");
    }

    #[test]
    fn test_largest_link_group() {
        assert_eq!(largest_link_group("R-G-B R-R"), 3);
        assert_eq!(largest_link_group("R R R R"), 1);
        assert_eq!(largest_link_group("R-R-R-R-R-R"), 6);
        assert_eq!(largest_link_group(""), 0);
    }
}
