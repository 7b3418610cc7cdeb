//! Ordered, nil-tolerant entity collections.
//!
//! An [`EntityList`] holds entities and explicit absence markers in caller
//! order. Operations that yield `Option<Entity>` elements return a new
//! `EntityList`; projections to anything else return a plain `Vec`.
//!
//! Lists have value semantics: a filtered or sorted list holds clones of the
//! original entities, so resolving one list does not load the other.

use std::cmp::Ordering;
use std::fmt;

use crate::entity::Entity;
use crate::error::{RealityResult, ValidationError};
use crate::resolver::{ResolveReport, Resolver};

/// One construction item of an [`EntityList`].
#[derive(Debug, Clone)]
pub enum Member {
    /// A name, coerced to a new unresolved entity.
    Name(String),
    /// A name with a known fact-store id.
    Known {
        /// Display and query name
        name: String,
        /// Fact-store id
        wikidata_id: String,
    },
    /// An existing entity, used as-is (resolved or not).
    Entity(Entity),
    /// An explicit "no entity here" marker.
    Absent,
}

impl Member {
    fn into_entity(self) -> Result<Option<Entity>, ValidationError> {
        Ok(match self {
            Self::Name(name) => Some(Entity::new(name)?),
            Self::Known { name, wikidata_id } => Some(Entity::with_wikidata_id(name, wikidata_id)?),
            Self::Entity(entity) => Some(entity),
            Self::Absent => None,
        })
    }
}

impl From<&str> for Member {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Member {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<(&str, &str)> for Member {
    fn from((name, id): (&str, &str)) -> Self {
        Self::Known {
            name: name.to_string(),
            wikidata_id: id.to_string(),
        }
    }
}

impl From<Entity> for Member {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl<T: Into<Member>> From<Option<T>> for Member {
    fn from(item: Option<T>) -> Self {
        item.map_or(Self::Absent, Into::into)
    }
}

/// Ordered sequence of entities and absence markers.
///
/// # Examples
///
/// ```
/// use reality::EntityList;
///
/// let list = EntityList::new([Some("Argentina"), None, Some("Chile")]).unwrap();
/// assert_eq!(list.describe(), "[Argentina?, nil, Chile?]");
/// assert_eq!(list.compact().describe(), "[Argentina?, Chile?]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityList {
    items: Vec<Option<Entity>>,
}

impl EntityList {
    /// Builds a list from names, entities, `(name, id)` pairs or absences.
    ///
    /// Names become unresolved entities here, not at resolution time.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] for a blank name.
    pub fn new<I, M>(items: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        let items = items
            .into_iter()
            .map(|item| item.into().into_entity())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }

    /// Builds a list of unresolved entities from plain names.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] for a blank name.
    pub fn from_names<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| Member::Name(n.into())))
    }

    /// Resolves every present entity that is not loaded yet, in one batch.
    ///
    /// # Errors
    ///
    /// Propagates source failures; entities attached before the failure keep
    /// their payloads.
    pub fn resolve_all(&mut self, resolver: &Resolver<'_>) -> RealityResult<ResolveReport> {
        resolver.resolve_batch(self.items.iter_mut().flatten())
    }

    /// Forgets earlier results and resolves every present entity again.
    ///
    /// # Errors
    ///
    /// Same as [`EntityList::resolve_all`].
    pub fn reload_all(&mut self, resolver: &Resolver<'_>) -> RealityResult<ResolveReport> {
        resolver.reresolve_batch(self.items.iter_mut().flatten())
    }

    /// Number of elements, absences included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True for a list with no elements, not even absences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`; `None` both past the end and for an absence.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.items.get(index)?.as_ref()
    }

    /// First element, if present.
    #[must_use]
    pub fn first(&self) -> Option<&Entity> {
        self.get(0)
    }

    /// Iterates elements in order, absences as `None`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Entity>> + '_ {
        self.items.iter().map(Option::as_ref)
    }

    /// Mutable members in order, `None` for absent slots.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = Option<&mut Entity>> + '_ {
        self.items.iter_mut().map(Option::as_mut)
    }

    /// Present entities only.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.items.iter().flatten()
    }

    /// True when every present entity is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.entities().all(Entity::is_loaded)
    }

    /// Keeps the elements matching `predicate`.
    #[must_use]
    pub fn select<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(Option<&Entity>) -> bool,
    {
        self.iter().filter(|e| predicate(*e)).map(Option::<&Entity>::cloned).collect()
    }

    /// Drops the elements matching `predicate`.
    #[must_use]
    pub fn reject<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(Option<&Entity>) -> bool,
    {
        self.select(|e| !predicate(e))
    }

    /// Drops absences.
    #[must_use]
    pub fn compact(&self) -> Self {
        self.select(|e| e.is_some())
    }

    /// The first `n` elements.
    #[must_use]
    pub fn first_n(&self, n: usize) -> Self {
        self.items.iter().take(n).cloned().collect()
    }

    /// Elements in reverse order.
    #[must_use]
    pub fn reversed(&self) -> Self {
        self.items.iter().rev().cloned().collect()
    }

    /// Stable sort with a caller comparator.
    #[must_use]
    pub fn sort_by<F>(&self, mut compare: F) -> Self
    where
        F: FnMut(Option<&Entity>, Option<&Entity>) -> Ordering,
    {
        let mut items = self.items.clone();
        items.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
        Self { items }
    }

    /// Sorts by name; absences go last.
    #[must_use]
    pub fn sort_by_name(&self) -> Self {
        self.sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => a.name().cmp(b.name()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }

    /// Maps elements to other entities (or absences), keeping the list type.
    #[must_use]
    pub fn map_entities<F>(&self, f: F) -> Self
    where
        F: FnMut(Option<&Entity>) -> Option<Entity>,
    {
        self.iter().map(f).collect()
    }

    /// Projects elements to non-entity values; the result is a plain `Vec`.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(Option<&Entity>) -> T,
    {
        self.iter().map(f).collect()
    }

    /// Names in order, `None` for absences.
    #[must_use]
    pub fn names(&self) -> Vec<Option<&str>> {
        self.iter().map(|e| e.map(Entity::name)).collect()
    }

    /// Renders `[a, b?, nil]` from each element's [`Entity::describe`].
    #[must_use]
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .map(|e| e.map_or_else(|| "nil".to_string(), Entity::describe))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl fmt::Display for EntityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl FromIterator<Option<Entity>> for EntityList {
    fn from_iter<I: IntoIterator<Item = Option<Entity>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Entity> for EntityList {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        iter.into_iter().map(Some).collect()
    }
}

impl IntoIterator for EntityList {
    type Item = Option<Entity>;
    type IntoIter = std::vec::IntoIter<Option<Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl From<Vec<Option<Entity>>> for EntityList {
    fn from(items: Vec<Option<Entity>>) -> Self {
        Self { items }
    }
}
