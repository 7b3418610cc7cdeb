//! External data sources consumed by the resolver.
//!
//! Two independent collaborators feed entities:
//! - a page source (encyclopedia pages keyed by title)
//! - a fact source (structured records keyed by title, id or label)
//!
//! Both are batch interfaces: one call carries every key of a resolver tier.
//! Transport, caching, pagination and rate limiting belong to the
//! implementations. [`memory`] provides a deterministic in-memory backend.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

pub mod memory;

pub use memory::{InMemorySources, SourceCall, SourceCallKind};

/// Errors raised by external sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time.
    #[error("Source request timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    /// The source answered with something that could not be decoded.
    #[error("Malformed source response: {0}")]
    MalformedResponse(String),

    /// Any other backend failure.
    #[error("Source backend error: {0}")]
    Backend(String),
}

impl SourceError {
    /// Returns true if repeating the request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Result type for source calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Batch answer: every requested key maps to a hit or `None`.
///
/// Keys missing from the map are treated the same as `None`.
pub type Lookup<T> = HashMap<String, Option<T>>;

/// Structured summary box of an encyclopedia page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Infobox {
    /// Template name, e.g. `Infobox country`.
    pub name: String,
    /// Raw field values, still in wiki markup.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Infobox {
    /// Creates an infobox with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field (builder style).
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a field's raw text if present and not blank.
    #[must_use]
    pub fn fetch(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// A page returned by the page source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Canonical title (after redirects).
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infobox: Option<Infobox>,
}

impl Page {
    /// Creates a page without an infobox.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            infobox: None,
        }
    }

    /// Attaches an infobox (builder style).
    #[must_use]
    pub fn with_infobox(mut self, infobox: Infobox) -> Self {
        self.infobox = Some(infobox);
        self
    }

    /// Looks up an infobox field.
    #[must_use]
    pub fn fetch(&self, key: &str) -> Option<&str> {
        self.infobox.as_ref().and_then(|i| i.fetch(key))
    }
}

/// A record returned by the fact source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Stable id in the fact store (e.g. `Q414`).
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Title of the encyclopedia page this record is linked to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en_wikipage: Option<String>,
    /// Predicate key to raw value.
    #[serde(default)]
    pub predicates: BTreeMap<String, Value>,
}

impl FactRecord {
    /// Creates a record with no predicates.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            en_wikipage: None,
            predicates: BTreeMap::new(),
        }
    }

    /// Sets the label (builder style).
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the linked page title (builder style).
    #[must_use]
    pub fn with_wikipage(mut self, title: impl Into<String>) -> Self {
        self.en_wikipage = Some(title.into());
        self
    }

    /// Adds a predicate value (builder style).
    #[must_use]
    pub fn with(mut self, predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(predicate.into(), value.into());
        self
    }

    /// Returns a predicate's value, treating explicit nulls as missing.
    #[must_use]
    pub fn fetch(&self, predicate: &str) -> Option<&Value> {
        self.predicates.get(predicate).filter(|v| !v.is_null())
    }
}

/// Source of encyclopedia pages.
pub trait PageSource: Send + Sync {
    /// Fetches pages for all titles in one round trip.
    fn fetch_pages(&self, titles: &[String]) -> SourceResult<Lookup<Page>>;
}

/// Source of structured fact records.
pub trait FactSource: Send + Sync {
    /// Looks records up by the title of their linked page.
    fn by_title(&self, titles: &[String]) -> SourceResult<Lookup<FactRecord>>;

    /// Looks records up by their stable id.
    fn by_id(&self, ids: &[String]) -> SourceResult<Lookup<FactRecord>>;

    /// Looks records up by free-text label.
    fn by_label(&self, labels: &[String]) -> SourceResult<Lookup<FactRecord>>;
}
