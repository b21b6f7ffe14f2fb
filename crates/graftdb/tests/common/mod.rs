#![allow(dead_code)]

use graftdb::{RowRef, StoredRecord, prelude::*};
use std::sync::Arc;

///
/// Booking schema
///
/// Country ──cities (1:N, set, PERSIST)──▶ City ──hotels (1:N, set, ALL)──▶ Hotel
/// Hotel ──manager (1:1, ALL)──▶ Manager
///

entity_model! {
    pub Country,
    path = "booking::Country",
    entity_name = "Country",
    primary_key = "code",
    fields = [
        EntityFieldModel::scalar("code", ScalarKind::Text),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::relation(
            "cities",
            RelationModel::one_to_many("City", Container::Set)
                .cascade(CascadeSet::of(&[CascadeType::Persist]))
                .mapped_by("country"),
        ),
    ],
}

entity_model! {
    pub City,
    path = "booking::City",
    entity_name = "City",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::relation("country", RelationModel::many_to_one("Country")),
        EntityFieldModel::relation(
            "hotels",
            RelationModel::one_to_many("Hotel", Container::Set)
                .cascade(CascadeSet::ALL)
                .mapped_by("city"),
        ),
    ],
}

entity_model! {
    pub Hotel,
    path = "booking::Hotel",
    entity_name = "Hotel",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::relation("city", RelationModel::many_to_one("City")),
        EntityFieldModel::relation(
            "manager",
            RelationModel::one_to_one("Manager").cascade(CascadeSet::ALL),
        ),
    ],
}

entity_model! {
    pub Manager,
    path = "booking::Manager",
    entity_name = "Manager",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::relation(
            "hotel",
            RelationModel::one_to_one("Hotel").mapped_by("manager"),
        ),
    ],
}

pub fn registry() -> Arc<EntityRegistry> {
    let registry = EntityRegistry::new()
        .with(Country::MODEL)
        .and_then(|r| r.with(City::MODEL))
        .and_then(|r| r.with(Hotel::MODEL))
        .and_then(|r| r.with(Manager::MODEL))
        .unwrap();
    registry.validate().unwrap();

    Arc::new(registry)
}

/// Country "UK", City 9 "Bath" and `hotels` hotels numbered from 100.
pub fn seeded(registry: &Arc<EntityRegistry>, hotels: i64) -> MemoryStore {
    let mut store = MemoryStore::new(Arc::clone(registry));

    store
        .insert(
            StoredRecord::new(Country::MODEL)
                .with_scalar("code", "UK")
                .with_scalar("name", "United Kingdom")
                .with_many("cities", Some(Refs::set([RowRef::new("City", 9_i64)]))),
        )
        .unwrap();
    store
        .insert(
            StoredRecord::new(City::MODEL)
                .with_scalar("id", 9_i64)
                .with_scalar("name", "Bath")
                .with_one("country", Some(RowRef::new("Country", "UK")))
                .with_many(
                    "hotels",
                    Some(Refs::set((0..hotels).map(|i| RowRef::new("Hotel", 100 + i)))),
                ),
        )
        .unwrap();
    for i in 0..hotels {
        store
            .insert(
                StoredRecord::new(Hotel::MODEL)
                    .with_scalar("id", 100 + i)
                    .with_scalar("name", format!("Hotel {i}"))
                    .with_one("city", Some(RowRef::new("City", 9_i64))),
            )
            .unwrap();
    }

    store
}

pub fn bath() -> DetachedRecord {
    DetachedRecord::new(City::MODEL)
        .with_scalar("id", 9_i64)
        .with_scalar("name", "Bath")
}

pub fn new_hotel(name: &str) -> DetachedRecord {
    DetachedRecord::new(Hotel::MODEL).with_scalar("name", name)
}

/// Stored hotel ids referenced by City 9.
pub fn stored_hotels(store: &MemoryStore) -> Vec<Key> {
    store
        .get(City::MODEL, &Key::Int(9))
        .and_then(|city| city.get_many("hotels").ok().flatten())
        .map(|rows| rows.iter().map(|row| row.key.clone()).collect())
        .unwrap_or_default()
}
