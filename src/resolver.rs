//! Batch entity resolution.
//!
//! The resolver fills unresolved entities with payloads from the page and
//! fact sources using a fixed sequence of lookup tiers:
//!
//! 1. **direct**: entities without a known id are looked up by name, one
//!    page call and one fact-by-title call for the whole batch
//! 2. **id**: entities with a known id are looked up by id; a record that
//!    names its page triggers one follow-up page call for all such titles
//! 3. **label**: entities that found nothing in tiers 1-2 (and have no id)
//!    are looked up by label in the fact source
//!
//! Each entity is attached exactly once per attempt, by the first tier that
//! settles it. Absence after a lookup is a completed resolution, not an error.
//! Source errors propagate; entities attached before the failure stay attached.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::entity::Entity;
use crate::error::{RealityError, RealityResult};
use crate::source::{FactRecord, FactSource, Lookup, Page, PageSource, SourceResult};

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Look entities that found nothing up by label (tier 3).
    pub label_fallback: bool,
    /// Fetch the page a by-id record declares (tier 2 follow-up).
    pub follow_canonical_title: bool,
    /// Issue the two tier-1 calls concurrently.
    pub concurrent_direct_lookup: bool,
    /// Maximum distinct keys per source call. `None` sends each tier's keys
    /// in a single call and leaves fan-out to the source.
    pub max_batch_size: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            label_fallback: true,
            follow_canonical_title: true,
            concurrent_direct_lookup: true,
            max_batch_size: None,
        }
    }
}

impl ResolverConfig {
    const MIN_BATCH_SIZE: usize = 1;

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `max_batch_size` is `Some(0)`.
    pub fn validate(self) -> RealityResult<Self> {
        match self.max_batch_size {
            Some(size) if size < Self::MIN_BATCH_SIZE => Err(RealityError::internal(format!(
                "max_batch_size must be at least {} (got {size})",
                Self::MIN_BATCH_SIZE
            ))),
            _ => Ok(self),
        }
    }
}

/// Statistics of one resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Entities that took part (already-loaded ones are skipped).
    pub entities: usize,
    /// Page source calls.
    pub page_calls: usize,
    /// Fact source by-title calls.
    pub title_calls: usize,
    /// Fact source by-id calls.
    pub id_calls: usize,
    /// Fact source by-label calls.
    pub label_calls: usize,
    /// Entities that ended with a page.
    pub pages_found: usize,
    /// Entities that ended with a fact record.
    pub facts_found: usize,
    /// Entities settled by the label tier with a record.
    pub label_matches: usize,
    /// Entities that ended with neither payload.
    pub not_found: usize,
}

impl ResolveReport {
    /// Total calls made to both sources.
    #[must_use]
    pub const fn round_trips(&self) -> usize {
        self.page_calls + self.title_calls + self.id_calls + self.label_calls
    }
}

/// Per-entity state while a batch is being resolved.
struct Slot<'e> {
    entity: &'e mut Entity,
    page: Option<Arc<Page>>,
    facts: Option<Arc<FactRecord>>,
    attached: bool,
}

impl<'e> Slot<'e> {
    fn new(entity: &'e mut Entity) -> Self {
        Self {
            entity,
            page: None,
            facts: None,
            attached: false,
        }
    }

    const fn has_data(&self) -> bool {
        self.page.is_some() || self.facts.is_some()
    }

    fn attach(&mut self, tier: &'static str) {
        if self.attached {
            return;
        }
        trace!(
            tier,
            entity = self.entity.name(),
            page = self.page.is_some(),
            facts = self.facts.is_some(),
            "attached"
        );
        self.entity.attach(self.page.clone(), self.facts.clone());
        self.attached = true;
    }
}

fn unique_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|k| seen.insert(*k))
        .map(str::to_string)
        .collect()
}

fn share<T>(lookup: Lookup<T>) -> HashMap<String, Arc<T>> {
    lookup
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, Arc::new(v))))
        .collect()
}

/// Batch resolver over a page source and a fact source.
///
/// # Examples
///
/// ```
/// use reality::source::{FactRecord, InMemorySources, Page};
/// use reality::{Entity, Resolver};
///
/// let sources = InMemorySources::new();
/// sources.insert_page(Page::new("Chile")).unwrap();
/// sources.insert_record(FactRecord::new("Q298").with_wikipage("Chile")).unwrap();
///
/// let resolver = Resolver::new(&sources, &sources);
/// let mut chile = Entity::new("Chile").unwrap();
/// let report = resolver.resolve_batch([&mut chile]).unwrap();
///
/// assert!(chile.is_loaded());
/// assert_eq!(chile.wikidata_id(), Some("Q298"));
/// assert_eq!(report.round_trips(), 2);
/// ```
#[derive(Clone)]
pub struct Resolver<'s> {
    pages: &'s dyn PageSource,
    facts: &'s dyn FactSource,
    config: ResolverConfig,
}

impl<'s> Resolver<'s> {
    /// Creates a resolver with the default configuration.
    #[must_use]
    pub fn new(pages: &'s dyn PageSource, facts: &'s dyn FactSource) -> Self {
        Self {
            pages,
            facts,
            config: ResolverConfig::default(),
        }
    }

    /// Creates a resolver with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(
        pages: &'s dyn PageSource,
        facts: &'s dyn FactSource,
        config: ResolverConfig,
    ) -> RealityResult<Self> {
        let config = config.validate()?;
        Ok(Self { pages, facts, config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every entity that is not loaded yet.
    ///
    /// Already-loaded entities are skipped, so resolving the same entities
    /// twice makes no source calls the second time.
    ///
    /// # Errors
    ///
    /// Propagates the first source failure. Entities attached by earlier
    /// tiers of the same call keep their payloads.
    pub fn resolve_batch<'e, I>(&self, entities: I) -> RealityResult<ResolveReport>
    where
        I: IntoIterator<Item = &'e mut Entity>,
    {
        let mut slots: Vec<Slot<'e>> = entities
            .into_iter()
            .filter(|e| !e.is_loaded())
            .map(Slot::new)
            .collect();

        let mut report = ResolveReport {
            entities: slots.len(),
            ..ResolveReport::default()
        };
        if slots.is_empty() {
            return Ok(report);
        }

        self.direct_tier(&mut slots, &mut report)?;
        self.id_tier(&mut slots, &mut report)?;
        self.label_tier(&mut slots, &mut report)?;

        for slot in &mut slots {
            slot.attach("final");
            if slot.page.is_some() {
                report.pages_found += 1;
            }
            if slot.facts.is_some() {
                report.facts_found += 1;
            }
            if !slot.has_data() {
                report.not_found += 1;
            }
        }

        debug!(
            entities = report.entities,
            round_trips = report.round_trips(),
            pages_found = report.pages_found,
            facts_found = report.facts_found,
            not_found = report.not_found,
            "batch resolved"
        );
        Ok(report)
    }

    /// Forgets earlier results and resolves the entities again.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve_batch`].
    pub fn reresolve_batch<'e, I>(&self, entities: I) -> RealityResult<ResolveReport>
    where
        I: IntoIterator<Item = &'e mut Entity>,
    {
        let entities: Vec<&'e mut Entity> = entities
            .into_iter()
            .map(|e| {
                e.reset();
                e
            })
            .collect();
        self.resolve_batch(entities)
    }

    fn chunk_size(&self, keys: &[String]) -> usize {
        self.config.max_batch_size.unwrap_or(keys.len()).max(1)
    }

    fn calls_for(&self, keys: &[String]) -> usize {
        keys.len().div_ceil(self.chunk_size(keys))
    }

    fn chunked<T, F>(&self, keys: &[String], call: F) -> SourceResult<Lookup<T>>
    where
        F: Fn(&[String]) -> SourceResult<Lookup<T>>,
    {
        let mut out = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(self.chunk_size(keys)) {
            out.extend(call(chunk)?);
        }
        Ok(out)
    }

    fn fetch_pages(&self, titles: &[String]) -> SourceResult<Lookup<Page>> {
        self.chunked(titles, |chunk| self.pages.fetch_pages(chunk))
    }

    fn direct_lookup(&self, names: &[String]) -> RealityResult<(Lookup<Page>, Lookup<FactRecord>)> {
        if !self.config.concurrent_direct_lookup {
            let pages = self.fetch_pages(names)?;
            let facts = self.chunked(names, |chunk| self.facts.by_title(chunk))?;
            return Ok((pages, facts));
        }

        let (pages, facts) = thread::scope(|scope| {
            let pages = scope.spawn(|| self.fetch_pages(names));
            let facts = self.chunked(names, |chunk| self.facts.by_title(chunk));
            (pages.join(), facts)
        });
        let pages = pages.map_err(|_| RealityError::internal("page lookup thread panicked"))?;
        Ok((pages?, facts?))
    }

    fn direct_tier(&self, slots: &mut [Slot<'_>], report: &mut ResolveReport) -> RealityResult<()> {
        let direct: Vec<usize> = (0..slots.len())
            .filter(|&i| slots[i].entity.wikidata_id().is_none())
            .collect();
        if direct.is_empty() {
            return Ok(());
        }

        let names = unique_keys(direct.iter().map(|&i| slots[i].entity.name()));
        let (pages, facts) = self.direct_lookup(&names)?;
        report.page_calls += self.calls_for(&names);
        report.title_calls += self.calls_for(&names);

        let pages = share(pages);
        let facts = share(facts);
        let mut settled = 0usize;
        for &i in &direct {
            let slot = &mut slots[i];
            slot.page = pages.get(slot.entity.name()).cloned();
            slot.facts = facts.get(slot.entity.name()).cloned();
            if slot.has_data() {
                slot.attach("direct");
                settled += 1;
            }
        }

        debug!(
            tier = "direct",
            entities = direct.len(),
            keys = names.len(),
            pages = pages.len(),
            facts = facts.len(),
            settled,
            "tier complete"
        );
        Ok(())
    }

    fn id_tier(&self, slots: &mut [Slot<'_>], report: &mut ResolveReport) -> RealityResult<()> {
        let by_id: Vec<usize> = (0..slots.len())
            .filter(|&i| !slots[i].attached && slots[i].entity.wikidata_id().is_some())
            .collect();
        if by_id.is_empty() {
            return Ok(());
        }

        let ids = unique_keys(by_id.iter().filter_map(|&i| slots[i].entity.wikidata_id()));
        let records = share(self.chunked(&ids, |chunk| self.facts.by_id(chunk))?);
        report.id_calls += self.calls_for(&ids);

        for &i in &by_id {
            let slot = &mut slots[i];
            slot.facts = slot.entity.wikidata_id().and_then(|id| records.get(id).cloned());
        }

        let mut pages_found = 0usize;
        if self.config.follow_canonical_title {
            let titles = unique_keys(
                by_id
                    .iter()
                    .filter_map(|&i| slots[i].facts.as_ref()?.en_wikipage.as_deref()),
            );
            if !titles.is_empty() {
                let pages = share(self.fetch_pages(&titles)?);
                report.page_calls += self.calls_for(&titles);
                for &i in &by_id {
                    let slot = &mut slots[i];
                    slot.page = slot
                        .facts
                        .as_ref()
                        .and_then(|f| f.en_wikipage.as_deref())
                        .and_then(|title| pages.get(title).cloned());
                }
                pages_found = pages.len();
            }
        }

        for &i in &by_id {
            slots[i].attach("id");
        }

        debug!(
            tier = "id",
            entities = by_id.len(),
            records = records.len(),
            pages = pages_found,
            "tier complete"
        );
        Ok(())
    }

    fn label_tier(&self, slots: &mut [Slot<'_>], report: &mut ResolveReport) -> RealityResult<()> {
        let fallback: Vec<usize> = (0..slots.len())
            .filter(|&i| {
                let slot = &slots[i];
                !slot.attached && !slot.has_data() && slot.entity.wikidata_id().is_none()
            })
            .collect();
        if fallback.is_empty() || !self.config.label_fallback {
            return Ok(());
        }

        let labels = unique_keys(fallback.iter().map(|&i| slots[i].entity.name()));
        let records = share(self.chunked(&labels, |chunk| self.facts.by_label(chunk))?);
        report.label_calls += self.calls_for(&labels);

        for &i in &fallback {
            let slot = &mut slots[i];
            slot.facts = records.get(slot.entity.name()).cloned();
            if slot.facts.is_some() {
                report.label_matches += 1;
            }
            slot.attach("label");
        }

        debug!(
            tier = "label",
            entities = fallback.len(),
            matches = report.label_matches,
            "tier complete"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("config", &self.config).finish_non_exhaustive()
    }
}
