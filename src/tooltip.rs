//! Item tooltips copied from the game client.
//!
//! Copying an item in game puts a text tooltip on the clipboard:
//!
//! ```text
//! Rarity: Currency
//! Chaos Orb
//! --------
//! Stack Size: 10/10
//! --------
//! Reforges a rare item with new random modifiers
//! ```
//!
//! The header (everything before the first divider) holds the rarity, the
//! name and, for rare and unique items, the base type. Magic items show a
//! base line only in some client versions, so it is read when present.
//!
//! The remaining sections are either properties (`Key: value` lines such as
//! the map rolls) or free text. The last free section is the description
//! and the ones before it are affixes, except on divination cards where the
//! first one names the reward.

use crate::error::TooltipError;
use crate::types::LogEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const DIVIDER: &str = "--------";

/// Item rarity as shown on the first tooltip line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Normal,
    Magic,
    Rare,
    Unique,
    Currency,
    DivinationCard,
    Gem,
}

impl Rarity {
    fn parse(value: &str) -> Result<Self, TooltipError> {
        match value {
            "Normal" => Ok(Rarity::Normal),
            "Magic" | "Magical" => Ok(Rarity::Magic),
            "Rare" => Ok(Rarity::Rare),
            "Unique" => Ok(Rarity::Unique),
            "Currency" => Ok(Rarity::Currency),
            "Divination Card" => Ok(Rarity::DivinationCard),
            "Gem" => Ok(Rarity::Gem),
            other => Err(TooltipError::UnknownRarity(other.to_string())),
        }
    }
}

/// Current and maximum stack size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSize {
    pub current: u32,
    pub max: u32,
}

/// A parsed item.
///
/// Map rolls are `None` when the tooltip does not show them (unrolled
/// maps, non-map items).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub rarity: Rarity,
    pub name: String,
    pub base_type: Option<String>,
    pub stack_size: Option<StackSize>,
    pub map_tier: Option<u32>,
    pub item_level: Option<u32>,
    pub quality: Option<u32>,
    pub item_quantity: Option<u32>,
    pub item_rarity: Option<u32>,
    pub pack_size: Option<u32>,
    /// Modifier lines, in tooltip order.
    pub affixes: Vec<String>,
    /// What a divination card turns into.
    pub reward: Option<String>,
    /// Flavour or usage text from the last section.
    pub description: Option<String>,
}

impl Item {
    fn new(rarity: Rarity, name: String, base_type: Option<String>) -> Self {
        Self {
            rarity,
            name,
            base_type,
            stack_size: None,
            map_tier: None,
            item_level: None,
            quality: None,
            item_quantity: None,
            item_rarity: None,
            pack_size: None,
            affixes: Vec::new(),
            reward: None,
            description: None,
        }
    }

    pub fn is_map(&self) -> bool {
        self.map_tier.is_some()
    }

    /// Entry for the event pipe: the item name, valued by stack size when
    /// stacked.
    pub fn to_log_entry(&self) -> LogEntry {
        match self.stack_size {
            Some(stack) => LogEntry::with_value(self.name.clone(), format!("x{}", stack.current)),
            None => LogEntry::named(self.name.clone()),
        }
    }
}

/// Keys that mark a section as item properties rather than free text.
const PROPERTY_KEYS: &[&str] = &[
    "Stack Size:",
    "Map Tier:",
    "Atlas Region:",
    "Item Quantity:",
    "Item Rarity:",
    "Monster Pack Size:",
    "Quality:",
    "Item Level:",
    "Level:",
    "Requirements:",
    "Sockets:",
];

/// Map rolls read `+142% (augmented)`.
static MAP_ROLL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+(\d+)%(?: \(augmented\))?$").expect("valid map roll regex"));

/// Parse a clipboard tooltip.
pub fn parse_tooltip(text: &str) -> Result<Item, TooltipError> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .skip_while(|l| l.trim().is_empty());

    let first = lines.next().ok_or(TooltipError::Empty)?;
    let rarity = first
        .strip_prefix("Rarity: ")
        .ok_or(TooltipError::MissingRarity)
        .and_then(|value| Rarity::parse(value.trim()))?;

    let header: Vec<&str> = lines.by_ref().take_while(|l| *l != DIVIDER).collect();
    let header_line = |i: usize| {
        header
            .get(i)
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
    };
    let name = header_line(0).ok_or(TooltipError::MissingLine("name"))?;
    let base_type = match rarity {
        Rarity::Rare | Rarity::Unique => {
            Some(header_line(1).ok_or(TooltipError::MissingLine("base type"))?)
        }
        Rarity::Magic => header_line(1),
        _ => None,
    };

    let mut item = Item::new(rarity, name.to_string(), base_type.map(str::to_string));

    let mut free_text = Vec::new();
    for section in sections(lines) {
        if is_property_section(&section) {
            for line in section {
                read_property(&mut item, line)?;
            }
        } else {
            free_text.push(section);
        }
    }

    if rarity == Rarity::DivinationCard {
        item.reward = free_text
            .first()
            .and_then(|s| s.first())
            .map(|l| l.to_string());
        if free_text.len() > 1 {
            item.description = free_text.pop().map(|s| s.join("\n"));
        }
    } else {
        item.description = free_text.pop().map(|s| s.join("\n"));
        item.affixes = free_text
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
    }

    Ok(item)
}

/// Split the lines after the header at dividers, dropping blank lines and
/// empty sections.
fn sections<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Vec<&'a str>> {
    let mut sections = vec![Vec::new()];
    for line in lines {
        if line == DIVIDER {
            sections.push(Vec::new());
        } else if !line.trim().is_empty() {
            if let Some(current) = sections.last_mut() {
                current.push(line.trim());
            }
        }
    }
    sections.retain(|s| !s.is_empty());
    sections
}

fn is_property_section(section: &[&str]) -> bool {
    section
        .first()
        .map_or(false, |line| PROPERTY_KEYS.iter().any(|key| line.starts_with(key)))
}

fn read_property(item: &mut Item, line: &str) -> Result<(), TooltipError> {
    let (key, value) = match line.split_once(": ") {
        Some(pair) => pair,
        None => return Ok(()),
    };
    match key {
        "Stack Size" => item.stack_size = Some(parse_stack_size(value)?),
        "Map Tier" => item.map_tier = Some(parse_leading_number("map tier", value)?),
        "Item Level" => item.item_level = Some(parse_leading_number("item level", value)?),
        "Quality" => item.quality = Some(parse_roll("quality", value)?),
        "Item Quantity" => item.item_quantity = Some(parse_roll("item quantity", value)?),
        "Item Rarity" => item.item_rarity = Some(parse_roll("item rarity", value)?),
        "Monster Pack Size" => item.pack_size = Some(parse_roll("pack size", value)?),
        _ => {}
    }
    Ok(())
}

fn parse_roll(field: &'static str, value: &str) -> Result<u32, TooltipError> {
    let malformed = || TooltipError::Malformed {
        field,
        value: value.to_string(),
    };
    let digits = MAP_ROLL
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .ok_or_else(malformed)?;
    digits.as_str().parse().map_err(|_| malformed())
}

fn parse_stack_size(value: &str) -> Result<StackSize, TooltipError> {
    let malformed = || TooltipError::Malformed {
        field: "stack size",
        value: value.to_string(),
    };

    let (current, max) = value.trim().split_once('/').ok_or_else(malformed)?;
    let number = |s: &str| s.trim().replace(',', "").parse::<u32>().map_err(|_| malformed());

    Ok(StackSize {
        current: number(current)?,
        max: number(max)?,
    })
}

/// Numbers may carry a suffix such as " (augmented)".
fn parse_leading_number(field: &'static str, value: &str) -> Result<u32, TooltipError> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().map_err(|_| TooltipError::Malformed {
        field,
        value: value.to_string(),
    })
}
