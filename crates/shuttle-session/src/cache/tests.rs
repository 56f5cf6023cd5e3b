//! Unit tests for the object cache.

use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};
use shuttle_sidecar::{
    AggregateMetadata, MetadataObject, PuppetClass, PuppetClassList, PuppetFunction, PuppetFunctionList, PuppetType,
    PuppetTypeList,
};

use super::*;

#[fixture]
fn cache() -> ObjectCache {
    ObjectCache::new()
}

fn classes(keys: &[&str]) -> PuppetClassList {
    keys.iter().map(|key| PuppetClass::new(*key)).collect()
}

#[rstest]
fn lookup_on_empty_cache_finds_nothing(cache: ObjectCache) {
    assert!(cache.is_empty());
    assert!(cache.object_by_name(ObjectKind::Class, "ntp").is_none());
}

#[rstest]
fn import_populates_only_the_list_kind(cache: ObjectCache) {
    let summary = cache
        .import(classes(&["ntp", "ssh"]), Origin::Default)
        .expect("import");

    assert_eq!(summary.kind, ObjectKind::Class);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.replaced, 0);
    assert!(cache.object_by_name(ObjectKind::Class, "ntp").is_some());
    assert_eq!(cache.len_of(ObjectKind::Function), 0);
    assert_eq!(cache.len_of(ObjectKind::Type), 0);
    assert!(cache.object_by_name(ObjectKind::Function, "ntp").is_none());
}

#[rstest]
fn cached_slot_matches_entry_identity(cache: ObjectCache) {
    let functions: PuppetFunctionList = vec![PuppetFunction::new("lookup")].into_iter().collect();
    cache.import(functions, Origin::Default).expect("import");

    let cached = cache
        .object_by_name(ObjectKind::Function, "lookup")
        .expect("cached function");
    assert_eq!(cached.kind(), ObjectKind::Function);
    assert_eq!(cached.key(), "lookup");
    assert!(cached.object().as_function().is_some());
}

#[rstest]
fn reimport_overwrites_without_duplicating(cache: ObjectCache) {
    let first: PuppetClassList = vec![PuppetClass::new("ntp").with_doc("old")]
        .into_iter()
        .collect();
    let second: PuppetClassList = vec![PuppetClass::new("ntp").with_doc("new")]
        .into_iter()
        .collect();

    cache.import(first, Origin::Default).expect("first import");
    let summary = cache.import(second, Origin::Default).expect("second import");

    assert_eq!(summary.replaced, 1);
    assert_eq!(summary.inserted, 0);
    assert_eq!(cache.len_of(ObjectKind::Class), 1);
    let cached = cache
        .object_by_name(ObjectKind::Class, "ntp")
        .expect("cached class");
    assert_eq!(
        cached.object().as_class().and_then(PuppetClass::doc),
        Some("new")
    );
}

#[rstest]
fn duplicate_keys_within_one_list_keep_the_last(cache: ObjectCache) {
    let list: PuppetTypeList = vec![
        PuppetType::new("file").with_doc("first"),
        PuppetType::new("file").with_doc("second"),
    ]
    .into_iter()
    .collect();

    let summary = cache.import(list, Origin::Default).expect("import");
    assert_eq!(summary.written(), 2);
    assert_eq!(cache.len_of(ObjectKind::Type), 1);
    let cached = cache
        .object_by_name(ObjectKind::Type, "file")
        .expect("cached type");
    assert_eq!(
        cached.object().as_type().and_then(PuppetType::doc),
        Some("second")
    );
}

#[rstest]
fn origin_is_recorded_and_queryable(cache: ObjectCache) {
    cache
        .import(classes(&["ntp"]), Origin::Default)
        .expect("default import");
    cache
        .import(classes(&["profile::base"]), Origin::Workspace)
        .expect("workspace import");

    let workspace = cache.objects_by_origin(Origin::Workspace);
    let keys: Vec<&str> = workspace.iter().map(CachedObject::key).collect();
    assert_eq!(keys, ["profile::base"]);

    let all_classes = cache.objects_by_kind(ObjectKind::Class);
    let keys: Vec<&str> = all_classes.iter().map(CachedObject::key).collect();
    assert_eq!(keys, ["ntp", "profile::base"]);
}

#[rstest]
fn workspace_import_takes_over_default_slot(cache: ObjectCache) {
    cache
        .import(classes(&["ntp"]), Origin::Default)
        .expect("default import");
    cache
        .import(classes(&["ntp"]), Origin::Workspace)
        .expect("workspace import");

    let cached = cache
        .object_by_name(ObjectKind::Class, "ntp")
        .expect("cached class");
    assert_eq!(cached.origin(), Origin::Workspace);
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_imports_of_different_kinds_are_independent() {
    let cache = Arc::new(ObjectCache::new());
    thread::scope(|scope| {
        scope.spawn(|| {
            let list: PuppetClassList = (0..100)
                .map(|index| PuppetClass::new(format!("class{index}")))
                .collect();
            cache.import(list, Origin::Default).expect("class import");
        });
        scope.spawn(|| {
            let list: PuppetFunctionList = (0..100)
                .map(|index| PuppetFunction::new(format!("function{index}")))
                .collect();
            cache.import(list, Origin::Default).expect("function import");
        });
    });

    assert_eq!(cache.len_of(ObjectKind::Class), 100);
    assert_eq!(cache.len_of(ObjectKind::Function), 100);
    assert_eq!(cache.len(), 200);
}

#[test]
fn into_object_returns_wrapped_entry() {
    let cached = CachedObject::new(MetadataObject::from(PuppetType::new("file")), Origin::Default);
    assert_eq!(cached.into_object().key(), "file");
}

fn aggregate(classes: usize, functions: usize, types: usize) -> AggregateMetadata {
    let mut aggregate = AggregateMetadata::new();
    for index in 0..classes {
        aggregate.append(PuppetClass::new(format!("class{index}")).into());
    }
    for index in 0..functions {
        aggregate.append(PuppetFunction::new(format!("function{index}")).into());
    }
    for index in 0..types {
        aggregate.append(PuppetType::new(format!("type{index}")).into());
    }
    aggregate
}

#[rstest]
fn aggregate_import_reports_each_kind_in_order(cache: ObjectCache) {
    cache
        .import(classes(&["class0"]), Origin::Workspace)
        .expect("seed import");

    let summaries = cache
        .import_aggregate(aggregate(2, 1, 0), Origin::Default)
        .expect("aggregate import");

    let kinds: Vec<ObjectKind> = summaries.iter().map(|summary| summary.kind).collect();
    assert_eq!(kinds, [ObjectKind::Class, ObjectKind::Function, ObjectKind::Type]);
    assert_eq!(summaries.first().map(|summary| summary.replaced), Some(1));
    assert_eq!(summaries.first().map(|summary| summary.inserted), Some(1));
    assert_eq!(summaries.get(1).map(ImportSummary::written), Some(1));
    assert_eq!(summaries.get(2).map(ImportSummary::written), Some(0));
    assert_eq!(cache.len(), 3);
    let replaced = cache
        .object_by_name(ObjectKind::Class, "class0")
        .expect("cached class");
    assert_eq!(replaced.origin(), Origin::Default);
}

#[test]
fn readers_never_observe_a_partial_aggregate() {
    const PER_KIND: usize = 300;
    let cache = ObjectCache::new();
    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            loop {
                let seen = cache.len();
                if seen != 0 {
                    return seen;
                }
                thread::yield_now();
            }
        });
        scope.spawn(|| {
            cache
                .import_aggregate(aggregate(PER_KIND, PER_KIND, PER_KIND), Origin::Default)
                .expect("aggregate import");
        });
        let seen = reader.join().expect("reader thread panicked");
        assert_eq!(seen, PER_KIND * 3);
    });
}
