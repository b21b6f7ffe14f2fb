mod common;

use common::{City, Hotel, Manager, bath, new_hotel, registry, seeded, stored_hotels};
use graftdb::{
    AuthorizationDenied, AuthorizeEntity, EntityRef, ErrorKind, ErrorOrigin, FlushReport,
    ReconcileConfig, RowRef, StoredRecord, core::entity::CollectionKind, prelude::*,
};

#[test]
fn null_collection_keeps_stored_hotels() {
    let registry = registry();
    let mut store = seeded(&registry, 9);

    let mut graph = DetachedGraph::new();
    let root = graph.insert(bath().with_many("hotels", None));

    let mut uow = store.begin();
    Reconciler::new(&registry)
        .save(&graph, root, &mut uow)
        .unwrap();
    uow.flush().unwrap();

    assert_eq!(stored_hotels(&store).len(), 9);
    assert_eq!(store.len(Hotel::MODEL), 9);
}

#[test]
fn empty_collection_removes_stored_hotels() {
    let registry = registry();
    let mut store = seeded(&registry, 9);

    let mut graph = DetachedGraph::new();
    let root = graph.insert(bath().with_many("hotels", Some(Refs::new(CollectionKind::Set))));

    let mut uow = store.begin();
    let report = Reconciler::new(&registry)
        .reconcile_with_report(&graph, root, OperationType::Save, &mut uow)
        .unwrap();
    assert_eq!(report.stats.removed, 9);
    uow.flush().unwrap();

    assert!(stored_hotels(&store).is_empty());
    assert_eq!(store.len(Hotel::MODEL), 0);
}

#[test]
fn hotel_saved_with_existing_city_gets_an_identifier_and_backlink() {
    let registry = registry();
    let mut store = seeded(&registry, 0);

    // the detached city carries a stale name; the reference must not merge it
    let mut graph = DetachedGraph::new();
    let city = graph.insert(bath().with_scalar("name", "Bath Spa"));
    let root = graph.insert(new_hotel("Assis Hotel").with_one("city", Some(city)));

    let mut uow = store.begin();
    let hotel = Reconciler::new(&registry)
        .save(&graph, root, &mut uow)
        .unwrap();
    uow.flush().unwrap();

    let key = uow.key_of(hotel).unwrap().unwrap();
    let stored = store.get(Hotel::MODEL, &key).unwrap();
    assert_eq!(stored.get_scalar("name").unwrap(), &Value::from("Assis Hotel"));
    assert_eq!(
        stored.get_one("city").unwrap(),
        Some(&RowRef::new("City", 9_i64))
    );

    let stored_city = store.get(City::MODEL, &Key::Int(9)).unwrap();
    assert_eq!(stored_city.get_scalar("name").unwrap(), &Value::from("Bath"));
    assert_eq!(stored_hotels(&store), vec![key]);
}

#[test]
fn collection_members_follow_the_detached_set() {
    let registry = registry();
    let mut store = seeded(&registry, 3);

    // keep 100, rename 101, drop 102, add one
    let mut graph = DetachedGraph::new();
    let kept = graph.insert(DetachedRecord::tracked(Hotel::MODEL).with_scalar("id", 100_i64));
    let renamed = graph.insert(
        DetachedRecord::new(Hotel::MODEL)
            .with_scalar("id", 101_i64)
            .with_scalar("name", "Royal Crescent"),
    );
    let added = graph.insert(new_hotel("Assis Hotel"));
    let root = graph.insert(bath().with_many("hotels", Some(Refs::set([kept, renamed, added]))));

    let mut uow = store.begin();
    Reconciler::new(&registry)
        .save(&graph, root, &mut uow)
        .unwrap();
    let flushed = uow.flush().unwrap();
    assert_eq!(flushed.inserted, 1);
    assert_eq!(flushed.deleted, 1);

    let hotels = stored_hotels(&store);
    assert_eq!(hotels.len(), 3);
    assert!(hotels.contains(&Key::Int(100)));
    assert!(hotels.contains(&Key::Int(101)));
    assert!(!hotels.contains(&Key::Int(102)));
    assert!(!store.contains(Hotel::MODEL, &Key::Int(102)));

    let royal = store.get(Hotel::MODEL, &Key::Int(101)).unwrap();
    assert_eq!(royal.get_scalar("name").unwrap(), &Value::from("Royal Crescent"));
    let kept = store.get(Hotel::MODEL, &Key::Int(100)).unwrap();
    assert_eq!(kept.get_scalar("name").unwrap(), &Value::from("Hotel 0"));

    // every stored member points back at the city
    for key in hotels {
        let hotel = store.get(Hotel::MODEL, &key).unwrap();
        assert_eq!(
            hotel.get_one("city").unwrap(),
            Some(&RowRef::new("City", 9_i64))
        );
    }
}

#[test]
fn saving_twice_changes_nothing_the_second_time() {
    let registry = registry();
    let mut store = seeded(&registry, 2);

    let mut graph = DetachedGraph::new();
    let hotel = graph.insert(
        DetachedRecord::new(Hotel::MODEL)
            .with_scalar("id", 100_i64)
            .with_scalar("name", "Renamed"),
    );
    let root = graph.insert(bath().with_many("hotels", Some(Refs::set([hotel]))));
    let reconciler = Reconciler::new(&registry);

    let mut uow = store.begin();
    reconciler.save(&graph, root, &mut uow).unwrap();
    let first = uow.flush().unwrap();
    assert_eq!(first.deleted, 1);

    let mut uow = store.begin();
    let report = reconciler
        .reconcile_with_report(&graph, root, OperationType::Save, &mut uow)
        .unwrap();
    assert_eq!(report.stats.created, 0);
    assert_eq!(report.stats.removed, 0);
    assert_eq!(report.stats.links_added, 0);
    assert_eq!(report.stats.links_removed, 0);
    assert_eq!(uow.flush().unwrap(), FlushReport::default());
}

#[test]
fn cyclic_detached_graph_is_merged_once_per_node() {
    let registry = registry();
    let mut store = seeded(&registry, 1);

    let mut graph = DetachedGraph::new();
    let root = graph.insert(bath());
    let hotel = graph.insert(
        DetachedRecord::tracked(Hotel::MODEL)
            .with_scalar("id", 100_i64)
            .with_one("city", Some(root)),
    );
    graph
        .push_member(root, "hotels", CollectionKind::Set, hotel)
        .unwrap();

    let mut uow = store.begin();
    let report = Reconciler::new(&registry)
        .reconcile_with_report(&graph, root, OperationType::Save, &mut uow)
        .unwrap();

    assert_eq!(report.stats.merged, 2);
    assert_eq!(uow.flush().unwrap().deleted, 0);
    assert_eq!(stored_hotels(&store), vec![Key::Int(100)]);
}

#[test]
fn dropping_a_one_to_one_child_removes_it() {
    let registry = registry();
    let mut store = seeded(&registry, 0);
    store
        .insert(
            StoredRecord::new(Hotel::MODEL)
                .with_scalar("id", 7_i64)
                .with_scalar("name", "Francis")
                .with_one("manager", Some(RowRef::new("Manager", 1_i64))),
        )
        .unwrap();
    store
        .insert(
            StoredRecord::new(Manager::MODEL)
                .with_scalar("id", 1_i64)
                .with_scalar("name", "Ada")
                .with_one("hotel", Some(RowRef::new("Hotel", 7_i64))),
        )
        .unwrap();

    let mut graph = DetachedGraph::new();
    let root = graph.insert(
        DetachedRecord::tracked(Hotel::MODEL)
            .with_scalar("id", 7_i64)
            .with_one("manager", None),
    );

    let mut uow = store.begin();
    Reconciler::new(&registry)
        .save(&graph, root, &mut uow)
        .unwrap();
    uow.flush().unwrap();

    assert!(!store.contains(Manager::MODEL, &Key::Int(1)));
    let stored = store.get(Hotel::MODEL, &Key::Int(7)).unwrap();
    assert_eq!(stored.get_one("manager").unwrap(), None);
}

#[test]
fn lookup_only_links_without_writing_children() {
    let registry = registry();
    let mut store = seeded(&registry, 1);

    let mut graph = DetachedGraph::new();
    let root = graph.insert(
        bath()
            .with_scalar("name", "Ignored")
            .with_many("hotels", Some(Refs::new(CollectionKind::Set))),
    );

    let mut uow = store.begin();
    Reconciler::new(&registry)
        .with_config(ReconcileConfig::lookup_only())
        .save(&graph, root, &mut uow)
        .unwrap();
    uow.flush().unwrap();

    let city = store.get(City::MODEL, &Key::Int(9)).unwrap();
    assert_eq!(city.get_scalar("name").unwrap(), &Value::from("Bath"));
    assert_eq!(stored_hotels(&store), vec![Key::Int(100)]);
}

#[test]
fn delete_removes_the_root() {
    let registry = registry();
    let mut store = seeded(&registry, 0);
    store
        .insert(StoredRecord::new(Hotel::MODEL).with_scalar("id", 50_i64))
        .unwrap();

    let mut graph = DetachedGraph::new();
    let root = graph.insert(DetachedRecord::new(Hotel::MODEL).with_scalar("id", 50_i64));

    let mut uow = store.begin();
    Reconciler::new(&registry)
        .delete(&graph, root, &mut uow)
        .unwrap();
    assert_eq!(uow.flush().unwrap().deleted, 1);
    assert!(!store.contains(Hotel::MODEL, &Key::Int(50)));
}

#[test]
fn load_returns_the_attached_entity() {
    let registry = registry();
    let mut store = seeded(&registry, 1);

    let mut uow = store.begin();
    let reconciler = Reconciler::new(&registry);
    let hotel = reconciler
        .load(Hotel::MODEL, &Key::Int(100), &mut uow)
        .unwrap();
    assert_eq!(
        uow.entity(hotel).unwrap().get_scalar("name").unwrap(),
        &Value::from("Hotel 0")
    );

    let err: graftdb::Error = reconciler
        .load(Hotel::MODEL, &Key::Int(404), &mut uow)
        .unwrap_err()
        .into();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.origin, ErrorOrigin::Reconcile);
    assert_eq!(err.message, "entity not found: booking::Hotel[404]");
}

#[test]
fn missing_child_surfaces_as_not_found() {
    let registry = registry();
    let mut store = seeded(&registry, 0);

    let mut graph = DetachedGraph::new();
    let ghost = graph.insert(DetachedRecord::new(Hotel::MODEL).with_scalar("id", 404_i64));
    let root = graph.insert(bath().with_many("hotels", Some(Refs::set([ghost]))));

    let mut uow = store.begin();
    let err: graftdb::Error = Reconciler::new(&registry)
        .save(&graph, root, &mut uow)
        .unwrap_err()
        .into();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

struct DenyHotels;

impl AuthorizeEntity for DenyHotels {
    fn authorize(
        &self,
        entity: EntityRef<'_>,
        _: OperationType,
    ) -> Result<(), AuthorizationDenied> {
        if entity.model().entity_name == "Hotel" {
            return Err(AuthorizationDenied::new("hotels are managed elsewhere"));
        }
        Ok(())
    }

    fn authorize_field(
        &self,
        _: EntityRef<'_>,
        _: &'static EntityFieldModel,
    ) -> Result<(), AuthorizationDenied> {
        Ok(())
    }
}

#[test]
fn authorization_denial_aborts_and_leaves_the_store_untouched() {
    let registry = registry();
    let mut store = seeded(&registry, 1);

    let mut graph = DetachedGraph::new();
    let hotel = graph.insert(new_hotel("Assis Hotel"));
    let root = graph.insert(
        bath()
            .with_scalar("name", "Renamed")
            .with_many("hotels", Some(Refs::set([hotel]))),
    );

    {
        let mut uow = store.begin();
        let err: graftdb::Error = Reconciler::new(&registry)
            .with_authorizer(DenyHotels)
            .save(&graph, root, &mut uow)
            .unwrap_err()
            .into();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(err.message.contains("hotels are managed elsewhere"));
    }

    let city = store.get(City::MODEL, &Key::Int(9)).unwrap();
    assert_eq!(city.get_scalar("name").unwrap(), &Value::from("Bath"));
    assert_eq!(store.len(Hotel::MODEL), 1);
}
