use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

pub const DEFAULT_SECTION_MARKER: char = '\u{b0}';

/// Which discovery strategy the segmenter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    /// Index strategy first, pattern strategy when the index is missing or broken.
    Auto,
    Pattern,
    Index,
}

/// How the authoritative occurrence of the first item is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FirstItemPolicy {
    Longest,
    Last,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub numeric_table_ratio: f64,
    pub strategy: StrategyMode,
    pub first_item_policy: FirstItemPolicy,
    pub section_marker: char,
    pub excerpt_radius: usize,
    /// Sub-document types removed wholesale before discovery; matched as
    /// prefixes, so `EX` covers every exhibit.
    pub payload_types: Vec<String>,
    /// Item codes to emit. Empty means all of them.
    pub items: Vec<String>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            numeric_table_ratio: 0.10,
            strategy: StrategyMode::Auto,
            first_item_policy: FirstItemPolicy::Longest,
            section_marker: DEFAULT_SECTION_MARKER,
            excerpt_radius: 200,
            payload_types: ["GRAPHIC", "ZIP", "EXCEL", "JSON", "PDF", "XML", "EX"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            items: Vec::new(),
        }
    }
}

impl SegmenterConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(ratio) = std::env::var("ITEMIZER_TABLE_RATIO") {
            let ratio: f64 = ratio
                .parse()
                .map_err(|_| anyhow!("ITEMIZER_TABLE_RATIO is not a number: {}", ratio))?;
            if !(0.0..=1.0).contains(&ratio) {
                return Err(anyhow!("ITEMIZER_TABLE_RATIO must be within 0..1, got {}", ratio));
            }
            config.numeric_table_ratio = ratio;
        }

        if let Ok(strategy) = std::env::var("ITEMIZER_STRATEGY") {
            config.strategy = StrategyMode::from_str(&strategy)
                .map_err(|_| anyhow!("Unknown ITEMIZER_STRATEGY: {}", strategy))?;
        }

        if let Ok(policy) = std::env::var("ITEMIZER_FIRST_ITEM") {
            config.first_item_policy = FirstItemPolicy::from_str(&policy)
                .map_err(|_| anyhow!("Unknown ITEMIZER_FIRST_ITEM: {}", policy))?;
        }

        if let Ok(marker) = std::env::var("ITEMIZER_SECTION_MARKER") {
            let mut chars = marker.chars();
            config.section_marker = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(anyhow!(
                        "ITEMIZER_SECTION_MARKER must be a single character, got {:?}",
                        marker
                    ))
                }
            };
        }

        if let Ok(radius) = std::env::var("ITEMIZER_EXCERPT_RADIUS") {
            config.excerpt_radius = radius
                .parse()
                .map_err(|_| anyhow!("ITEMIZER_EXCERPT_RADIUS is not a number: {}", radius))?;
        }

        if let Ok(items) = std::env::var("ITEMIZER_ITEMS") {
            config.items = parse_item_list(&items);
        }

        Ok(config)
    }
}

/// Splits a comma separated item list (`1a, 7, item7a`) into item codes.
pub fn parse_item_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase().replace(' ', ""))
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with("item") {
                s
            } else {
                format!("item{}", s)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SegmenterConfig::default();
        assert_eq!(config.numeric_table_ratio, 0.10);
        assert_eq!(config.strategy, StrategyMode::Auto);
        assert_eq!(config.first_item_policy, FirstItemPolicy::Longest);
        assert_eq!(config.section_marker, '°');
        assert!(config.items.is_empty());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(StrategyMode::from_str("Index").unwrap(), StrategyMode::Index);
        assert_eq!(FirstItemPolicy::from_str("last").unwrap(), FirstItemPolicy::Last);
        assert_eq!(StrategyMode::Pattern.to_string(), "pattern");
        assert!(StrategyMode::from_str("fuzzy").is_err());
    }

    #[test]
    fn test_parse_item_list() {
        assert_eq!(
            parse_item_list("1A, 7,item7a ,, Item 8"),
            vec!["item1a", "item7", "item7a", "item8"]
        );
    }
}
