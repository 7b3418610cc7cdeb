//! Entity types and lazy attribute access.
//!
//! An entity starts as a name (optionally with a known fact-store id). The
//! resolver attaches raw payloads exactly once per resolution attempt; typed
//! attributes are derived from those payloads on first access and memoized
//! until the next attachment.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::attributes::{self, Attribute, AttributeCache, EntityRef, Payloads};
use crate::error::{MalformedValueError, RealityResult, ValidationError};
use crate::geo::GeoCoord;
use crate::measure::Measure;
use crate::resolver::Resolver;
use crate::source::{FactRecord, Page};
use crate::tz_offset::TZOffset;

/// Classification of an entity, taken from its page's infobox template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityKind {
    /// A sovereign state
    Country,
    /// A city, town or other settlement
    City,
    /// A company, institution, or group
    Organization,
    /// A human person
    Person,
    /// Any other infobox template, by name
    Other(String),
}

impl EntityKind {
    /// Classifies an infobox template name such as `Infobox settlement`.
    #[must_use]
    pub fn from_infobox(name: &str) -> Self {
        let bare = name.trim();
        let bare = bare
            .get(..8)
            .filter(|prefix| prefix.eq_ignore_ascii_case("infobox "))
            .map_or(bare, |_| bare[8..].trim());

        match bare.to_ascii_lowercase().as_str() {
            "country" | "former country" => Self::Country,
            "settlement" | "city" | "town" | "capital" => Self::City,
            "company" | "organization" | "organisation" | "university" => Self::Organization,
            "person" | "officeholder" | "royalty" => Self::Person,
            _ => Self::Other(bare.to_string()),
        }
    }
}

impl TryFrom<String> for EntityKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err("entity kind cannot be empty".to_string());
        }

        let bytes = value.as_bytes();
        if bytes.len() >= 6 && bytes[..6].eq_ignore_ascii_case(b"other:") {
            let rest = value[6..].trim();
            if rest.is_empty() {
                return Err("other entity kind cannot be empty".to_string());
            }
            return Ok(Self::Other(rest.to_string()));
        }

        Ok(if value.eq_ignore_ascii_case("country") {
            Self::Country
        } else if value.eq_ignore_ascii_case("city") {
            Self::City
        } else if value.eq_ignore_ascii_case("organization") {
            Self::Organization
        } else if value.eq_ignore_ascii_case("person") {
            Self::Person
        } else {
            return Err(format!(
                "unknown entity kind: {value}. Use a built-in kind (country, city, organization, person) or prefix others with other:<name>"
            ));
        })
    }
}

impl From<EntityKind> for String {
    fn from(value: EntityKind) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Country => write!(f, "country"),
            Self::City => write!(f, "city"),
            Self::Organization => write!(f, "organization"),
            Self::Person => write!(f, "person"),
            Self::Other(name) => write!(f, "other:{name}"),
        }
    }
}

/// A named real-world thing and the raw data found for it.
///
/// # Examples
///
/// ```
/// use reality::Entity;
///
/// let entity = Entity::new("Argentina").unwrap();
/// assert!(!entity.is_loaded());
/// assert_eq!(entity.describe(), "Argentina?");
/// assert_eq!(entity.area().unwrap(), None);
///
/// assert!(Entity::new("   ").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    wikidata_id: Option<String>,
    page: Option<Arc<Page>>,
    facts: Option<Arc<FactRecord>>,
    loaded: bool,
    cache: AttributeCache,
}

impl Entity {
    /// Creates an unresolved entity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] if `name` is empty or blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidName { name });
        }
        Ok(Self {
            name: trimmed.to_string(),
            wikidata_id: None,
            page: None,
            facts: None,
            loaded: false,
            cache: AttributeCache::default(),
        })
    }

    /// Creates an unresolved entity whose fact-store id is already known.
    ///
    /// Such entities are looked up by id rather than by name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] if `name` is empty or blank.
    pub fn with_wikidata_id(name: impl Into<String>, id: impl Into<String>) -> Result<Self, ValidationError> {
        let mut entity = Self::new(name)?;
        let id = id.into();
        let id = id.trim();
        entity.wikidata_id = (!id.is_empty()).then(|| id.to_string());
        Ok(entity)
    }

    /// Display and query name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fact-store id, if known or learned during resolution.
    #[must_use]
    pub fn wikidata_id(&self) -> Option<&str> {
        self.wikidata_id.as_deref()
    }

    /// Raw page payload.
    #[must_use]
    pub fn page(&self) -> Option<&Page> {
        self.page.as_deref()
    }

    /// Raw fact payload.
    #[must_use]
    pub fn facts(&self) -> Option<&FactRecord> {
        self.facts.as_deref()
    }

    /// True once a resolution attempt has completed, found or not.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True if resolution found neither a page nor a fact record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.loaded && self.page.is_none() && self.facts.is_none()
    }

    /// Sets the payloads found by a resolution attempt and marks the entity loaded.
    ///
    /// Absent payloads are a valid outcome. Memoized attributes are dropped.
    /// A fact record supplies the fact-store id if the entity had none.
    pub fn attach(&mut self, page: Option<Arc<Page>>, facts: Option<Arc<FactRecord>>) -> &mut Self {
        if self.wikidata_id.is_none() {
            self.wikidata_id = facts.as_ref().map(|f| f.id.clone());
        }
        self.page = page;
        self.facts = facts;
        self.loaded = true;
        self.cache.clear();
        self
    }

    /// Forgets payloads so the next resolution looks the entity up again.
    ///
    /// A known fact-store id is kept.
    pub fn reset(&mut self) -> &mut Self {
        self.page = None;
        self.facts = None;
        self.loaded = false;
        self.cache.clear();
        self
    }

    /// Resolves this entity alone (a batch of one). No-op if already loaded.
    ///
    /// # Errors
    ///
    /// Propagates source failures.
    pub fn load(&mut self, resolver: &Resolver<'_>) -> RealityResult<&mut Self> {
        resolver.resolve_batch([&mut *self])?;
        Ok(self)
    }

    /// Classification from the page infobox; `None` without one.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        let infobox = self.page.as_ref()?.infobox.as_ref()?;
        Some(EntityKind::from_infobox(&infobox.name))
    }

    fn payloads(&self) -> Payloads<'_> {
        Payloads {
            page: self.page.as_deref(),
            facts: self.facts.as_deref(),
        }
    }

    /// Returns an attribute by name.
    ///
    /// Unknown names and missing data yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] if the payload holds the attribute in
    /// a shape that cannot be converted.
    pub fn get(&self, name: &str) -> Result<Option<Attribute>, MalformedValueError> {
        let Some(def) = attributes::find(name) else {
            return Ok(None);
        };
        if let Some(cached) = self.cache.get(def.name) {
            return Ok(cached);
        }
        let value = def.derive(&self.payloads())?;
        self.cache.store(def.name, value.clone());
        Ok(value)
    }

    /// All present attributes, keyed by name.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed attribute.
    pub fn attributes(&self) -> Result<BTreeMap<&'static str, Attribute>, MalformedValueError> {
        let mut out = BTreeMap::new();
        for name in attributes::names() {
            if let Some(value) = self.get(name)? {
                out.insert(name, value);
            }
        }
        Ok(out)
    }

    fn text(&self, name: &str) -> Result<Option<String>, MalformedValueError> {
        Ok(match self.get(name)? {
            Some(Attribute::Text(v)) => Some(v),
            _ => None,
        })
    }

    fn measure(&self, name: &str) -> Result<Option<Measure>, MalformedValueError> {
        Ok(match self.get(name)? {
            Some(Attribute::Measure(v)) => Some(v),
            _ => None,
        })
    }

    /// Official long-form name, e.g. `Argentine Republic`.
    pub fn long_name(&self) -> Result<Option<String>, MalformedValueError> {
        self.text("long_name")
    }

    /// ISO 3166-1 alpha-2 code.
    pub fn iso2_code(&self) -> Result<Option<String>, MalformedValueError> {
        self.text("iso2_code")
    }

    /// ISO 3166-1 alpha-3 code.
    pub fn iso3_code(&self) -> Result<Option<String>, MalformedValueError> {
        self.text("iso3_code")
    }

    /// Country-code top-level domain.
    pub fn tld(&self) -> Result<Option<String>, MalformedValueError> {
        self.text("tld")
    }

    /// International calling code, e.g. `+54`.
    pub fn calling_code(&self) -> Result<Option<String>, MalformedValueError> {
        self.text("calling_code")
    }

    /// Surface area in km².
    pub fn area(&self) -> Result<Option<Measure>, MalformedValueError> {
        self.measure("area")
    }

    /// Resident population, in `person`.
    pub fn population(&self) -> Result<Option<Measure>, MalformedValueError> {
        self.measure("population")
    }

    /// Metropolitan-area population, in `person`.
    pub fn population_metro(&self) -> Result<Option<Measure>, MalformedValueError> {
        self.measure("population_metro")
    }

    /// GDP at purchasing power parity, in `$`.
    pub fn gdp_ppp(&self) -> Result<Option<Measure>, MalformedValueError> {
        self.measure("gdp_ppp")
    }

    /// Nominal GDP, in `$`.
    pub fn gdp_nominal(&self) -> Result<Option<Measure>, MalformedValueError> {
        self.measure("gdp_nominal")
    }

    /// Location of the entity.
    pub fn coord(&self) -> Result<Option<GeoCoord>, MalformedValueError> {
        Ok(match self.get("coord")? {
            Some(Attribute::Coord(v)) => Some(v),
            _ => None,
        })
    }

    /// Fixed UTC offset of the entity's time zone.
    pub fn tz_offset(&self) -> Result<Option<TZOffset>, MalformedValueError> {
        Ok(match self.get("tz_offset")? {
            Some(Attribute::Offset(v)) => Some(v),
            _ => None,
        })
    }

    /// UTC offset in hours.
    pub fn utc_offset(&self) -> Result<Option<f64>, MalformedValueError> {
        Ok(match self.get("utc_offset")? {
            Some(Attribute::Number(v)) => Some(v),
            _ => None,
        })
    }

    /// The country this entity belongs to, as a new unresolved entity.
    ///
    /// # Errors
    ///
    /// Fails on a malformed country link.
    pub fn country(&self) -> RealityResult<Option<Entity>> {
        let Some(Attribute::Link(EntityRef { name, wikidata_id })) = self.get("country")? else {
            return Ok(None);
        };
        let entity = match wikidata_id {
            Some(id) => Self::with_wikidata_id(name, id)?,
            None => Self::new(name)?,
        };
        Ok(Some(entity))
    }

    /// Short label: `name` once loaded, `name?` before.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.loaded {
            self.name.clone()
        } else {
            format!("{}?", self.name)
        }
    }

    /// Renders identity, state and all present attributes as JSON.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed attribute.
    pub fn to_json(&self) -> RealityResult<serde_json::Value> {
        let attributes = self.attributes()?;
        Ok(serde_json::json!({
            "name": self.name,
            "wikidata_id": self.wikidata_id,
            "kind": self.kind(),
            "loaded": self.loaded,
            "attributes": attributes,
        }))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
