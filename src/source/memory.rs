//! In-memory source backend.
//!
//! Deterministic stand-in for the networked page and fact sources. It answers
//! from seeded data, records every batch call it receives (so tests can
//! assert round trips and ordering) and can be told to fail a call.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::source::{FactRecord, FactSource, Lookup, Page, PageSource, SourceError, SourceResult};

fn lock_err(context: &'static str) -> SourceError {
    SourceError::Backend(format!("poisoned lock: {context}"))
}

fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Which collaborator operation a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCallKind {
    FetchPages,
    ByTitle,
    ById,
    ByLabel,
}

/// One recorded batch call with the keys it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    FetchPages(Vec<String>),
    ByTitle(Vec<String>),
    ById(Vec<String>),
    ByLabel(Vec<String>),
}

impl SourceCall {
    /// Returns the operation this call went to.
    #[must_use]
    pub const fn kind(&self) -> SourceCallKind {
        match self {
            Self::FetchPages(_) => SourceCallKind::FetchPages,
            Self::ByTitle(_) => SourceCallKind::ByTitle,
            Self::ById(_) => SourceCallKind::ById,
            Self::ByLabel(_) => SourceCallKind::ByLabel,
        }
    }

    /// Returns the keys the call carried.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::FetchPages(k) | Self::ByTitle(k) | Self::ById(k) | Self::ByLabel(k) => k,
        }
    }
}

#[derive(Debug, Default)]
struct SourceState {
    pages: HashMap<String, Page>,
    redirects: HashMap<String, String>,
    records: HashMap<String, FactRecord>,
    by_title: HashMap<String, String>,
    by_label: HashMap<String, String>,
}

/// Thread-safe in-memory page and fact source.
///
/// # Examples
///
/// ```
/// use reality::source::{FactRecord, InMemorySources, Page, PageSource};
///
/// let sources = InMemorySources::new();
/// sources.insert_page(Page::new("Argentina")).unwrap();
/// sources.insert_record(FactRecord::new("Q414").with_wikipage("Argentina")).unwrap();
///
/// let pages = sources.fetch_pages(&["Argentina".to_string()]).unwrap();
/// assert!(pages["Argentina"].is_some());
/// assert_eq!(sources.calls().unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemorySources {
    state: RwLock<SourceState>,
    calls: Mutex<Vec<SourceCall>>,
    failures: Mutex<HashMap<SourceCallKind, SourceError>>,
}

impl InMemorySources {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a page under its title.
    pub fn insert_page(&self, page: Page) -> SourceResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("sources.state"))?;
        state.pages.insert(page.title.clone(), page);
        Ok(())
    }

    /// Makes `from` resolve to the page titled `to`.
    pub fn insert_redirect(&self, from: impl Into<String>, to: impl Into<String>) -> SourceResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("sources.state"))?;
        state.redirects.insert(from.into(), to.into());
        Ok(())
    }

    /// Stores a fact record, indexing it by id, linked page title and label.
    pub fn insert_record(&self, record: FactRecord) -> SourceResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("sources.state"))?;
        if let Some(title) = &record.en_wikipage {
            state.by_title.insert(title.clone(), record.id.clone());
        }
        if let Some(label) = &record.label {
            state.by_label.insert(normalize_key(label), record.id.clone());
        }
        state.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Makes the next call of `kind` fail with `error`.
    pub fn fail_next(&self, kind: SourceCallKind, error: SourceError) -> SourceResult<()> {
        let mut failures = self.failures.lock().map_err(|_| lock_err("sources.failures"))?;
        failures.insert(kind, error);
        Ok(())
    }

    /// Returns every call received so far, oldest first.
    pub fn calls(&self) -> SourceResult<Vec<SourceCall>> {
        let calls = self.calls.lock().map_err(|_| lock_err("sources.calls"))?;
        Ok(calls.clone())
    }

    /// Returns the calls of one kind, oldest first.
    pub fn calls_of(&self, kind: SourceCallKind) -> SourceResult<Vec<SourceCall>> {
        Ok(self.calls()?.into_iter().filter(|c| c.kind() == kind).collect())
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) -> SourceResult<()> {
        let mut calls = self.calls.lock().map_err(|_| lock_err("sources.calls"))?;
        calls.clear();
        Ok(())
    }

    fn record_call(&self, call: SourceCall) -> SourceResult<()> {
        let kind = call.kind();
        self.calls.lock().map_err(|_| lock_err("sources.calls"))?.push(call);

        let mut failures = self.failures.lock().map_err(|_| lock_err("sources.failures"))?;
        match failures.remove(&kind) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lookup_records<F>(&self, keys: &[String], index: F) -> SourceResult<Lookup<FactRecord>>
    where
        F: Fn(&SourceState, &str) -> Option<String>,
    {
        let state = self.state.read().map_err(|_| lock_err("sources.state"))?;
        Ok(keys
            .iter()
            .map(|key| {
                let record = index(&state, key).and_then(|id| state.records.get(&id).cloned());
                (key.clone(), record)
            })
            .collect())
    }
}

impl PageSource for InMemorySources {
    fn fetch_pages(&self, titles: &[String]) -> SourceResult<Lookup<Page>> {
        self.record_call(SourceCall::FetchPages(titles.to_vec()))?;

        let state = self.state.read().map_err(|_| lock_err("sources.state"))?;
        Ok(titles
            .iter()
            .map(|title| {
                let target = state.redirects.get(title).unwrap_or(title);
                (title.clone(), state.pages.get(target).cloned())
            })
            .collect())
    }
}

impl FactSource for InMemorySources {
    fn by_title(&self, titles: &[String]) -> SourceResult<Lookup<FactRecord>> {
        self.record_call(SourceCall::ByTitle(titles.to_vec()))?;
        self.lookup_records(titles, |state, title| {
            let target = state.redirects.get(title).map_or(title, String::as_str);
            state.by_title.get(target).cloned()
        })
    }

    fn by_id(&self, ids: &[String]) -> SourceResult<Lookup<FactRecord>> {
        self.record_call(SourceCall::ById(ids.to_vec()))?;
        self.lookup_records(ids, |_, id| Some(id.to_string()))
    }

    fn by_label(&self, labels: &[String]) -> SourceResult<Lookup<FactRecord>> {
        self.record_call(SourceCall::ByLabel(labels.to_vec()))?;
        self.lookup_records(labels, |state, label| state.by_label.get(&normalize_key(label)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemorySources {
        let sources = InMemorySources::new();
        sources.insert_page(Page::new("Bolivia")).unwrap();
        sources
            .insert_record(FactRecord::new("Q750").with_label("Bolivia").with_wikipage("Bolivia"))
            .unwrap();
        sources
    }

    #[test]
    fn test_fetch_pages_reports_misses() {
        let sources = seeded();
        let pages = sources
            .fetch_pages(&["Bolivia".to_string(), "Atlantis".to_string()])
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages["Bolivia"].is_some());
        assert!(pages["Atlantis"].is_none());
    }

    #[test]
    fn test_redirect_resolves_to_target_page() {
        let sources = seeded();
        sources.insert_redirect("Plurinational State of Bolivia", "Bolivia").unwrap();
        let pages = sources
            .fetch_pages(&["Plurinational State of Bolivia".to_string()])
            .unwrap();
        let page = pages["Plurinational State of Bolivia"].as_ref().unwrap();
        assert_eq!(page.title, "Bolivia");
    }

    #[test]
    fn test_fact_lookups_by_each_key() {
        let sources = seeded();
        assert!(sources.by_title(&["Bolivia".to_string()]).unwrap()["Bolivia"].is_some());
        assert!(sources.by_id(&["Q750".to_string()]).unwrap()["Q750"].is_some());
        assert!(sources.by_label(&[" bolivia ".to_string()]).unwrap()[" bolivia "].is_some());
        assert!(sources.by_id(&["Q1".to_string()]).unwrap()["Q1"].is_none());
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let sources = seeded();
        sources.by_id(&["Q750".to_string()]).unwrap();
        sources.fetch_pages(&["Bolivia".to_string()]).unwrap();

        let calls = sources.calls().unwrap();
        assert_eq!(
            calls,
            vec![
                SourceCall::ById(vec!["Q750".to_string()]),
                SourceCall::FetchPages(vec!["Bolivia".to_string()]),
            ]
        );
        assert_eq!(sources.calls_of(SourceCallKind::ById).unwrap().len(), 1);

        sources.clear_calls().unwrap();
        assert!(sources.calls().unwrap().is_empty());
    }

    #[test]
    fn test_fail_next_fails_once() {
        let sources = seeded();
        sources
            .fail_next(SourceCallKind::ByLabel, SourceError::Timeout { duration_ms: 10 })
            .unwrap();

        let err = sources.by_label(&["Bolivia".to_string()]).unwrap_err();
        assert_eq!(err, SourceError::Timeout { duration_ms: 10 });
        assert!(sources.by_label(&["Bolivia".to_string()]).is_ok());
        assert_eq!(sources.calls_of(SourceCallKind::ByLabel).unwrap().len(), 2);
    }
}
