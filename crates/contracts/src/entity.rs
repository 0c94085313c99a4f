//! EntityRef - description of a changed entity emitted by the trigger source

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domains;

/// Kind of changed entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Content item (a "node")
    Content,
    /// Taxonomy-like term
    TaxonomyTerm,
    /// Navigation menu
    Menu,
    /// Anything else; resolves to no tags
    Other(String),
}

impl EntityKind {
    /// Revalidation domain for this kind, if it has one
    pub fn domain(&self) -> Option<&'static str> {
        match self {
            Self::Content => Some(domains::CONTENT),
            Self::TaxonomyTerm => Some(domains::TAXONOMY),
            Self::Menu => Some(domains::MENU),
            Self::Other(_) => None,
        }
    }
}

impl FromStr for EntityKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "content" | "node" => Self::Content,
            "taxonomy_term" | "taxonomy" | "term" => Self::TaxonomyTerm,
            "menu" => Self::Menu,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => f.write_str("content"),
            Self::TaxonomyTerm => f.write_str("taxonomy_term"),
            Self::Menu => f.write_str("menu"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// A changed entity: kind, bundle/vocabulary and id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    /// Content bundle or taxonomy vocabulary
    #[serde(default)]
    pub bundle: Option<String>,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, bundle: Option<&str>, id: impl ToString) -> Self {
        Self {
            kind,
            bundle: bundle.map(str::to_string),
            id: id.to_string(),
        }
    }

    pub fn content(bundle: &str, id: impl ToString) -> Self {
        Self::new(EntityKind::Content, Some(bundle), id)
    }

    pub fn term(vocabulary: &str, id: impl ToString) -> Self {
        Self::new(EntityKind::TaxonomyTerm, Some(vocabulary), id)
    }

    pub fn menu(id: impl ToString) -> Self {
        Self::new(EntityKind::Menu, None, id)
    }
}
