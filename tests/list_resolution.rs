use reality::source::{SourceCall, SourceCallKind};
use reality::{
    Entity, EntityList, FactRecord, InMemorySources, Member, Page, Resolver, ResolverConfig,
    SourceError,
};

fn keys(call: &SourceCall) -> Vec<&str> {
    call.keys().iter().map(String::as_str).collect()
}

fn south_america() -> InMemorySources {
    let sources = InMemorySources::new();
    for (id, title) in [("Q414", "Argentina"), ("Q750", "Bolivia"), ("Q298", "Chile")] {
        sources.insert_page(Page::new(title)).unwrap();
        sources
            .insert_record(FactRecord::new(id).with_label(title).with_wikipage(title))
            .unwrap();
    }
    sources
}

#[test]
fn three_names_found_by_direct_lookup() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Argentina", "Bolivia", "Chile"]).unwrap();
    assert_eq!(list.describe(), "[Argentina?, Bolivia?, Chile?]");

    let report = list.resolve_all(&resolver).expect("resolve must succeed");

    assert!(list.is_loaded());
    assert_eq!(list.describe(), "[Argentina, Bolivia, Chile]");
    assert_eq!(report.entities, 3);
    assert_eq!(report.pages_found, 3);
    assert_eq!(report.facts_found, 3);
    assert!(sources.calls_of(SourceCallKind::ById).unwrap().is_empty());
    assert!(sources.calls_of(SourceCallKind::ByLabel).unwrap().is_empty());

    let pages = sources.calls_of(SourceCallKind::FetchPages).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(keys(&pages[0]), vec!["Argentina", "Bolivia", "Chile"]);
    assert_eq!(sources.calls_of(SourceCallKind::ByTitle).unwrap().len(), 1);

    let ids: Vec<Option<String>> = list.map(|e| e.and_then(Entity::wikidata_id).map(str::to_string));
    assert_eq!(
        ids,
        vec![Some("Q414".to_string()), Some("Q750".to_string()), Some("Q298".to_string())]
    );
}

#[test]
fn known_id_fetches_declared_page_title() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::new([
        Member::from("Argentina"),
        Member::from(("Plurinational State of Bolivia", "Q750")),
    ])
    .unwrap();

    list.resolve_all(&resolver).expect("resolve must succeed");

    let calls = sources.calls().unwrap();
    assert_eq!(calls.len(), 4);
    // The two direct calls may run in either order.
    let mut direct: Vec<SourceCallKind> = calls[..2].iter().map(SourceCall::kind).collect();
    direct.sort_by_key(|k| *k == SourceCallKind::ByTitle);
    assert_eq!(direct, vec![SourceCallKind::FetchPages, SourceCallKind::ByTitle]);
    assert!(calls[..2].iter().all(|c| keys(c) == vec!["Argentina"]));
    assert_eq!(calls[2], SourceCall::ById(vec!["Q750".to_string()]));
    assert_eq!(calls[3], SourceCall::FetchPages(vec!["Bolivia".to_string()]));

    let bolivia = list.get(1).unwrap();
    assert!(bolivia.is_loaded());
    assert_eq!(bolivia.name(), "Plurinational State of Bolivia");
    assert_eq!(bolivia.page().map(|p| p.title.as_str()), Some("Bolivia"));
    assert_eq!(bolivia.facts().map(|f| f.id.as_str()), Some("Q750"));
}

#[test]
fn known_id_wins_over_name() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut mislabeled = Entity::with_wikidata_id("Chile", "Q750").unwrap();

    resolver.resolve_batch([&mut mislabeled]).unwrap();

    assert_eq!(mislabeled.facts().map(|f| f.id.as_str()), Some("Q750"));
    assert_eq!(mislabeled.page().map(|p| p.title.as_str()), Some("Bolivia"));
    assert!(sources.calls_of(SourceCallKind::ByTitle).unwrap().is_empty());
}

#[test]
fn label_fallback_attaches_facts_without_page() {
    let sources = south_america();
    sources
        .insert_record(FactRecord::new("Q7194853").with_label("Piper Club"))
        .unwrap();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Chile", "Piper Club"]).unwrap();

    let report = list.resolve_all(&resolver).unwrap();

    let club = list.get(1).unwrap();
    assert!(club.is_loaded());
    assert!(club.page().is_none());
    assert_eq!(club.facts().map(|f| f.id.as_str()), Some("Q7194853"));
    assert_eq!(club.wikidata_id(), Some("Q7194853"));
    assert_eq!(report.label_matches, 1);

    let labels = sources.calls_of(SourceCallKind::ByLabel).unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(keys(&labels[0]), vec!["Piper Club"]);
}

#[test]
fn facts_from_direct_lookup_skip_label_fallback() {
    let sources = south_america();
    sources
        .insert_record(FactRecord::new("Q1").with_label("Pageless").with_wikipage("Pageless"))
        .unwrap();
    let resolver = Resolver::new(&sources, &sources);
    let mut entity = Entity::new("Pageless").unwrap();

    entity.load(&resolver).unwrap();

    assert!(entity.is_loaded());
    assert!(entity.page().is_none());
    assert!(entity.facts().is_some());
    assert!(sources.calls_of(SourceCallKind::ByLabel).unwrap().is_empty());
}

#[test]
fn unknown_name_is_loaded_but_not_found() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Atlantis"]).unwrap();

    let report = list.resolve_all(&resolver).unwrap();

    let atlantis = list.first().unwrap();
    assert!(atlantis.is_loaded());
    assert!(atlantis.is_not_found());
    assert_eq!(atlantis.area().unwrap(), None);
    assert_eq!(list.describe(), "[Atlantis]");
    assert_eq!(report.not_found, 1);
    assert_eq!(report.round_trips(), 3);
}

#[test]
fn known_id_with_missing_page_keeps_facts() {
    let sources = south_america();
    sources
        .insert_record(FactRecord::new("Q999").with_wikipage("Deleted Article"))
        .unwrap();
    let resolver = Resolver::new(&sources, &sources);
    let mut orphan = Entity::with_wikidata_id("Orphan", "Q999").unwrap();
    let mut ghost = Entity::with_wikidata_id("Ghost", "Q0").unwrap();

    resolver.resolve_batch([&mut orphan, &mut ghost]).unwrap();

    assert!(orphan.is_loaded());
    assert!(orphan.page().is_none());
    assert_eq!(orphan.facts().map(|f| f.id.as_str()), Some("Q999"));

    assert!(ghost.is_loaded());
    assert!(ghost.is_not_found());
    assert!(sources.calls_of(SourceCallKind::ByLabel).unwrap().is_empty());
}

#[test]
fn second_resolve_makes_no_calls() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Argentina", "Atlantis"]).unwrap();

    list.resolve_all(&resolver).unwrap();
    let before = sources.calls().unwrap().len();
    let report = list.resolve_all(&resolver).unwrap();

    assert_eq!(report.entities, 0);
    assert_eq!(report.round_trips(), 0);
    assert_eq!(sources.calls().unwrap().len(), before);
}

#[test]
fn reload_all_looks_entities_up_again() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Chile"]).unwrap();
    list.resolve_all(&resolver).unwrap();
    sources.clear_calls().unwrap();

    sources
        .insert_record(FactRecord::new("Q298").with_wikipage("Chile").with("P297", "CL"))
        .unwrap();
    list.reload_all(&resolver).unwrap();

    assert!(!sources.calls().unwrap().is_empty());
    assert_eq!(list.first().unwrap().iso2_code().unwrap().as_deref(), Some("CL"));
}

#[test]
fn already_loaded_members_pass_through() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut settled = Entity::new("Argentina").unwrap();
    settled.attach(None, None);

    let mut list = EntityList::new([Member::from(settled), Member::from("Chile")]).unwrap();
    list.resolve_all(&resolver).unwrap();

    let pages = sources.calls_of(SourceCallKind::FetchPages).unwrap();
    assert_eq!(keys(&pages[0]), vec!["Chile"]);
    assert!(list.first().unwrap().is_not_found());
}

#[test]
fn duplicate_names_are_looked_up_once() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names(["Chile", "Argentina", "Chile"]).unwrap();

    list.resolve_all(&resolver).unwrap();

    let titles = sources.calls_of(SourceCallKind::ByTitle).unwrap();
    assert_eq!(keys(&titles[0]), vec!["Chile", "Argentina"]);
    assert_eq!(list.describe(), "[Chile, Argentina, Chile]");
    assert_eq!(list.get(0).unwrap().wikidata_id(), list.get(2).unwrap().wikidata_id());
}

#[test]
fn sparse_list_keeps_order_and_compacts() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::new([Some("Argentina"), None, Some("Chile")]).unwrap();
    assert_eq!(list.describe(), "[Argentina?, nil, Chile?]");

    list.resolve_all(&resolver).unwrap();
    assert_eq!(list.describe(), "[Argentina, nil, Chile]");

    let compact = list.compact();
    assert_eq!(compact.len(), 2);
    assert!(compact.entities().all(Entity::is_loaded));
    assert_eq!(compact.describe(), "[Argentina, Chile]");
}

#[test]
fn entity_operations_chain_as_lists() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::new([Some("Chile"), None, Some("Argentina"), Some("Bolivia")]).unwrap();
    list.resolve_all(&resolver).unwrap();

    let chained: EntityList = list
        .compact()
        .sort_by_name()
        .reject(|e| e.is_some_and(|e| e.name() == "Bolivia"))
        .first_n(1);
    assert_eq!(chained.describe(), "[Argentina]");

    let names: Vec<Option<&str>> = list.names();
    assert_eq!(names, vec![Some("Chile"), None, Some("Argentina"), Some("Bolivia")]);
}

#[test]
fn source_failure_propagates_without_rollback() {
    let sources = south_america();
    sources
        .fail_next(SourceCallKind::ById, SourceError::Timeout { duration_ms: 5_000 })
        .unwrap();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::new([
        Member::from("Argentina"),
        Member::from(("Plurinational State of Bolivia", "Q750")),
    ])
    .unwrap();

    let err = list.resolve_all(&resolver).unwrap_err();
    assert!(err.is_source());
    assert!(err.is_retryable());

    assert!(list.get(0).unwrap().is_loaded());
    assert!(!list.get(1).unwrap().is_loaded());
    assert_eq!(list.describe(), "[Argentina, Plurinational State of Bolivia?]");

    // A retry only touches what is still unresolved.
    sources.clear_calls().unwrap();
    list.resolve_all(&resolver).unwrap();
    assert!(list.is_loaded());
    assert!(sources.calls_of(SourceCallKind::ByTitle).unwrap().is_empty());
}

#[test]
fn sequential_direct_lookup_orders_page_call_first() {
    let sources = south_america();
    let config = ResolverConfig {
        concurrent_direct_lookup: false,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::with_config(&sources, &sources, config).unwrap();
    let mut list = EntityList::from_names(["Bolivia"]).unwrap();

    list.resolve_all(&resolver).unwrap();

    let kinds: Vec<SourceCallKind> = sources.calls().unwrap().iter().map(SourceCall::kind).collect();
    assert_eq!(kinds, vec![SourceCallKind::FetchPages, SourceCallKind::ByTitle]);
}

#[test]
fn large_batch_uses_one_call_per_source() {
    let sources = south_america();
    let resolver = Resolver::new(&sources, &sources);
    let mut list = EntityList::from_names((0..1_200).map(|i| format!("Unknown Place {i}"))).unwrap();

    let report = list.resolve_all(&resolver).unwrap();

    assert!(list.is_loaded());
    assert_eq!(report.page_calls, 1);
    assert_eq!(report.title_calls, 1);
    assert_eq!(report.label_calls, 1);
    let pages = sources.calls_of(SourceCallKind::FetchPages).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].keys().len(), 1_200);
    assert_eq!(sources.calls_of(SourceCallKind::ByTitle).unwrap().len(), 1);
}
