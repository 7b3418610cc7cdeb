//! # Reality - Batch Resolution of Real-World Entities
//!
//! Reality turns human-readable names (countries, cities, organizations) into
//! typed records by reconciling two loosely linked sources: an encyclopedia
//! page source keyed by title and a structured fact source keyed by title, id
//! or label.
//!
//! ## Core Concepts
//!
//! - **Entity**: a named thing with a lifecycle (unresolved, then loaded with or
//!   without data) and typed attributes derived lazily from raw payloads
//! - **Resolver**: the three-tier batch lookup (name, known id, label) that
//!   attaches payloads with one round trip per source and tier
//! - **EntityList**: an ordered, nil-tolerant collection that resolves in one batch
//! - **Measure / GeoCoord / TZOffset**: unit-aware value types
//!
//! ## Usage
//!
//! ```
//! use reality::source::{FactRecord, InMemorySources, Page};
//! use reality::{EntityList, Resolver, Value};
//!
//! let sources = InMemorySources::new();
//! sources.insert_page(Page::new("Argentina")).unwrap();
//! sources
//!     .insert_record(
//!         FactRecord::new("Q414")
//!             .with_wikipage("Argentina")
//!             .with("P2046", Value::quantity(2_780_400.0, "km²")),
//!     )
//!     .unwrap();
//!
//! let mut list = EntityList::new([Some("Argentina"), None]).unwrap();
//! assert_eq!(list.describe(), "[Argentina?, nil]");
//!
//! list.resolve_all(&Resolver::new(&sources, &sources)).unwrap();
//! assert_eq!(list.describe(), "[Argentina, nil]");
//!
//! let area = list.first().unwrap().area().unwrap().unwrap();
//! assert_eq!(area.to_string(), "2780400 km²");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Value types
pub mod error;
pub mod geo;
pub mod measure;
pub mod parse;
pub mod tz_offset;
pub mod value;

// Sources, entities and resolution
pub mod entity;
pub mod list;
pub mod resolver;
pub mod source;

// Re-export primary types at crate root for convenience
pub use entity::{Attribute, Entity, EntityKind, EntityRef};
pub use error::{MalformedValueError, RealityError, RealityResult, ValidationError};
pub use geo::{Dms, GeoCoord, Hemisphere};
pub use list::{EntityList, Member};
pub use measure::Measure;
pub use resolver::{ResolveReport, Resolver, ResolverConfig};
pub use source::{
    FactRecord, FactSource, InMemorySources, Infobox, Lookup, Page, PageSource, SourceError,
    SourceResult,
};
pub use tz_offset::TZOffset;
pub use value::Value;
