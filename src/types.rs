use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Catalog identifiers: a run of at least six digits and the `.jpg` extension.
const ITEM_ID_PATTERN: &str = r"^\d{6,}\.jpg$";

fn item_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ITEM_ID_PATTERN).expect("valid item id pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("item identifier format unexpected: {0:?}")]
pub struct InvalidItemId(pub String);

/// A validated catalog identifier, e.g. `"1503120001.jpg"`.
///
/// Only ASCII digits followed by `.jpg` are accepted, so the identifier is
/// always safe to use as a single path component and has at least six
/// leading digits for the shard directories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn parse(raw: &str) -> Result<Self, InvalidItemId> {
        if item_id_regex().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidItemId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three shard components: `20YY`, `MM`, `DD` taken from the leading digits.
    pub fn shard(&self) -> [String; 3] {
        let s = &self.0;
        [format!("20{}", &s[0..2]), s[2..4].to_string(), s[4..6].to_string()]
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Disjoint partition of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Restricted,
    General,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Restricted, Category::General];

    /// Directory name of this category's root inside the collection.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Restricted => "restricted",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
