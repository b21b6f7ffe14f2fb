use super::*;
use crate::{
    error::AccessFault,
    test_fixtures::{City, Hotel},
    traits::EntityKind,
    value::Value,
};

#[test]
fn missing_slots_read_as_null_or_absent() {
    let record: Record<NodeId> = Record::new(City::MODEL);
    assert_eq!(record.get_scalar("name").unwrap(), &Value::Null);
    assert_eq!(record.get_one("mayor").unwrap(), None);
    assert!(record.get_many("hotels").unwrap().is_none());
    assert!(record.dirty_fields().is_none());
}

#[test]
fn shape_mismatch_is_reported() {
    let record: Record<NodeId> = Record::new(City::MODEL).with_scalar("hotels", 3_i64);
    let err = record.get_many("hotels").unwrap_err();
    assert!(matches!(
        err,
        AccessFault::ShapeMismatch {
            expected: SlotShape::Many,
            found: SlotShape::Scalar,
        }
    ));
}

#[test]
fn tracked_records_remember_writes() {
    let mut record: Record<NodeId> = Record::tracked(City::MODEL).with_scalar("name", "Bath");
    record.set_many("hotels", None);
    let dirty: Vec<_> = record.dirty_fields().unwrap().iter().copied().collect();
    assert_eq!(dirty, vec!["hotels", "name"]);

    record.mark_clean();
    assert!(record.dirty_fields().unwrap().is_empty());
}

#[test]
fn many_mut_instantiates_declared_kind() {
    let mut record: Record<EntityHandle> = Record::new(City::MODEL);
    let members = record.many_mut("hotels", CollectionKind::Set).unwrap();
    assert!(members.push(EntityHandle::new(1)));
    assert!(!members.push(EntityHandle::new(1)));
    assert_eq!(record.get_many("hotels").unwrap().unwrap().len(), 1);

    let mut record: Record<EntityHandle> = Record::new(City::MODEL).with_scalar("hotels", "x");
    assert!(record.many_mut("hotels", CollectionKind::Set).is_err());
}

#[test]
fn lists_keep_duplicates_and_sets_do_not() {
    let list = Refs::list([1, 2, 1]);
    let set = Refs::set([1, 2, 1]);
    assert_eq!(&**list, &[1, 2, 1]);
    assert_eq!(&**set, &[1, 2]);

    let mut list = list;
    assert!(list.remove(&1));
    assert_eq!(&**list, &[2, 1]);
    assert!(!list.insert_unique(2));
}

#[test]
fn graph_links_nodes_by_index() {
    let mut graph = DetachedGraph::new();
    let city = graph.insert(Record::new(City::MODEL).with_scalar("id", 9_i64));
    let hotel = graph.insert(Record::new(Hotel::MODEL).with_scalar("name", "Assis Hotel"));

    graph.link(hotel, "city", city).unwrap();
    graph
        .push_member(city, "hotels", CollectionKind::Set, hotel)
        .unwrap();

    assert_eq!(graph.len(), 2);
    let hotel_record = graph.get(hotel).unwrap();
    assert_eq!(hotel_record.get_one("city").unwrap(), Some(&city));
    let members = graph.get(city).unwrap().get_many("hotels").unwrap().unwrap();
    assert_eq!(&**members, &[hotel]);
}

#[test]
fn graph_rejects_dangling_nodes() {
    let mut graph = DetachedGraph::new();
    let city = graph.insert(Record::new(City::MODEL));
    let ghost = NodeId::new(7);

    assert!(graph.link(city, "mayor", ghost).is_err());
    assert!(
        graph
            .set_members(city, "hotels", CollectionKind::Set, [ghost])
            .is_err()
    );
}

#[test]
fn explicit_empty_collection_differs_from_absent() {
    let mut graph = DetachedGraph::new();
    let city = graph.insert(Record::new(City::MODEL));
    graph
        .set_members(city, "hotels", CollectionKind::Set, [])
        .unwrap();

    let members = graph.get(city).unwrap().get_many("hotels").unwrap();
    assert!(members.is_some_and(|m| m.is_empty()));
}
