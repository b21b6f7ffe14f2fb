use crate::{
    entity_model,
    model::{
        field::{Container, EntityFieldModel, ScalarKind},
        relation::{CascadeSet, CascadeType, RelationModel},
    },
    registry::EntityRegistry,
    traits::EntityKind,
};

///
/// Hotel booking schema shared by unit tests.
///
/// City ──hotels (1:N, set, ALL)──▶ Hotel ──reviews (1:N, list, ALL)──▶ Review
///                                   │ └──address (1:1, ALL)──▶ Address
///                                   └──amenities (N:M, set, PERSIST)──▶ Amenity
///
/// Back references (`Hotel.city`, `Review.hotel`) only cascade REFRESH/DETACH.
///

pub const REFRESH_DETACH: CascadeSet = CascadeSet::of(&[CascadeType::Refresh, CascadeType::Detach]);

entity_model! {
    pub(crate) Place,
    path = "test_fixtures::Place",
    entity_name = "Place",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::scalar("label", ScalarKind::Text),
    ],
}

entity_model! {
    pub(crate) City,
    path = "test_fixtures::City",
    entity_name = "City",
    primary_key = "id",
    parent = Place,
    fields = [
        EntityFieldModel::transient("label"),
        EntityFieldModel::scalar("country", ScalarKind::Text),
        EntityFieldModel::relation(
            "hotels",
            RelationModel::one_to_many("Hotel", Container::Set)
                .cascade(CascadeSet::ALL)
                .mapped_by("city"),
        ),
    ],
}

entity_model! {
    pub(crate) Hotel,
    path = "test_fixtures::Hotel",
    entity_name = "Hotel",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("name", ScalarKind::Text),
        EntityFieldModel::scalar("stars", ScalarKind::Uint),
        EntityFieldModel::relation(
            "city",
            RelationModel::many_to_one("City").cascade(REFRESH_DETACH),
        ),
        EntityFieldModel::relation(
            "reviews",
            RelationModel::one_to_many("Review", Container::List)
                .cascade(CascadeSet::ALL)
                .mapped_by("hotel"),
        ),
        EntityFieldModel::relation(
            "address",
            RelationModel::one_to_one("Address").cascade(CascadeSet::ALL),
        ),
        EntityFieldModel::relation(
            "amenities",
            RelationModel::many_to_many("Amenity", Container::Set)
                .cascade(CascadeSet::of(&[CascadeType::Persist])),
        ),
    ],
}

entity_model! {
    pub(crate) Review,
    path = "test_fixtures::Review",
    entity_name = "Review",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("title", ScalarKind::Text),
        EntityFieldModel::scalar("rating", ScalarKind::Uint),
        EntityFieldModel::relation(
            "hotel",
            RelationModel::many_to_one("Hotel").cascade(REFRESH_DETACH),
        ),
    ],
}

entity_model! {
    pub(crate) Address,
    path = "test_fixtures::Address",
    entity_name = "Address",
    primary_key = "id",
    fields = [
        EntityFieldModel::scalar("id", ScalarKind::Int),
        EntityFieldModel::scalar("street", ScalarKind::Text),
        EntityFieldModel::relation(
            "hotel",
            RelationModel::one_to_one("Hotel").mapped_by("address"),
        ),
    ],
}

entity_model! {
    pub(crate) Amenity,
    path = "test_fixtures::Amenity",
    entity_name = "Amenity",
    primary_key = "code",
    fields = [
        EntityFieldModel::scalar("code", ScalarKind::Text),
        EntityFieldModel::scalar("label", ScalarKind::Text),
        EntityFieldModel::relation(
            "hotels",
            RelationModel::many_to_many("Hotel", Container::Set).mapped_by("amenities"),
        ),
    ],
}

/// Registry holding every fixture model, validated.
pub(crate) fn registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    for model in [
        Place::MODEL,
        City::MODEL,
        Hotel::MODEL,
        Review::MODEL,
        Address::MODEL,
        Amenity::MODEL,
    ] {
        registry.register(model).expect("fixture models are unique");
    }
    registry.validate().expect("fixture models are valid");

    registry
}
