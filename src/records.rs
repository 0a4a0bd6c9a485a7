//! Input data: card records from `cards.json` and the alias map from `alias.json`.

use anyhow::{Context, Result};
use fs_err as fs;
use indexmap::IndexMap;
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

/// One entry of `cards.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CardRecord {
    pub code: u64,
    pub points: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl CardRecord {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Card {}", self.code),
        }
    }
}

/// Name of the image file produced for (or read for) a card code.
pub fn image_file_name(code: u64) -> String {
    format!("{code}.jpg")
}

pub fn parse_cards(json: &str) -> Result<Vec<CardRecord>> {
    serde_json::from_str(json).context("cards JSON must be an array of {code, points, name?}")
}

pub fn load_cards(path: &Path) -> Result<Vec<CardRecord>> {
    let json = fs::read_to_string(path)?;
    parse_cards(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Collapse repeated codes into one record each. A code keeps the position
/// of its first record and the contents of its last one.
pub fn unique_by_code(cards: Vec<CardRecord>) -> Vec<CardRecord> {
    let mut unique: IndexMap<u64, CardRecord> = IndexMap::with_capacity(cards.len());
    for card in cards {
        unique.insert(card.code, card);
    }
    unique.into_values().collect()
}

/// Lookup from code to card. Run the records through [`unique_by_code`]
/// first so every pass agrees on which record a code means.
pub fn index_by_code(cards: &[CardRecord]) -> HashMap<u64, &CardRecord> {
    cards.iter().map(|card| (card.code, card)).collect()
}

/// Original card code mapped to the alias codes that share its points.
/// Entries keep the order they have in the JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(u64, Vec<u64>)>,
}

impl AliasMap {
    pub fn parse(json: &str) -> Result<AliasMap> {
        let raw: IndexMap<String, Vec<u64>> = serde_json::from_str(json)
            .context("alias JSON must map card codes to arrays of alias codes")?;

        let entries = raw
            .into_iter()
            .map(|(key, aliases)| {
                let code = key
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("alias key {key:?} is not a card code"))?;
                Ok((code, aliases))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AliasMap { entries })
    }

    pub fn load(path: &Path) -> Result<AliasMap> {
        let json = fs::read_to_string(path)?;
        AliasMap::parse(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u64])> {
        self.entries
            .iter()
            .map(|(code, aliases)| (*code, aliases.as_slice()))
    }

    /// Total number of alias codes across all originals.
    pub fn alias_count(&self) -> usize {
        self.entries.iter().map(|(_, aliases)| aliases.len()).sum()
    }
}
