mod common;

use common::{City, Hotel, bath, new_hotel, registry, seeded, stored_hotels};
use graftdb::prelude::*;
use parking_lot::Mutex;
use std::thread;

const THREADS: usize = 8;

#[test]
fn threads_share_one_registry_with_private_stores() {
    let registry = registry();

    let results: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let registry = &registry;
                scope.spawn(move || {
                    let mut store = seeded(registry, 2);

                    let mut graph = DetachedGraph::new();
                    let members: Vec<_> = (0..=i)
                        .map(|n| graph.insert(new_hotel(&format!("Hotel {i}.{n}"))))
                        .collect();
                    let root = graph.insert(bath().with_many("hotels", Some(Refs::set(members))));

                    let mut uow = store.begin();
                    Reconciler::new(registry)
                        .save(&graph, root, &mut uow)
                        .unwrap();
                    uow.flush().unwrap();

                    stored_hotels(&store).len()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // the two seeded hotels are replaced by the thread's own set
    for (i, hotels) in results.into_iter().enumerate() {
        assert_eq!(hotels, i + 1);
    }
}

#[test]
fn threads_serialize_through_a_shared_store() {
    let registry = registry();
    let store = Mutex::new(seeded(&registry, 0));

    thread::scope(|scope| {
        for i in 0..THREADS {
            let registry = &registry;
            let store = &store;
            scope.spawn(move || {
                // each thread adds one hotel; the collection is left absent so
                // hotels added by other threads survive
                let mut graph = DetachedGraph::new();
                let city = graph.insert(DetachedRecord::new(City::MODEL).with_scalar("id", 9_i64));
                let root = graph.insert(new_hotel(&format!("Hotel {i}")).with_one("city", Some(city)));

                let mut store = store.lock();
                let mut uow = store.begin();
                Reconciler::new(registry)
                    .save(&graph, root, &mut uow)
                    .unwrap();
                uow.flush().unwrap();
            });
        }
    });

    let store = store.into_inner();
    assert_eq!(store.len(Hotel::MODEL), THREADS);
    assert_eq!(stored_hotels(&store).len(), THREADS);

    let city = store.get(City::MODEL, &Key::Int(9)).unwrap();
    assert_eq!(city.get_scalar("name").unwrap(), &Value::from("Bath"));
}

#[test]
fn metadata_is_resolved_once_under_contention() {
    let registry = registry();
    let cached = registry.cached_len();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for model in [City::MODEL, Hotel::MODEL] {
                    let first = registry.metadata(model).unwrap();
                    let again = registry.metadata(model).unwrap();
                    assert!(std::sync::Arc::ptr_eq(&first, &again));
                }
            });
        }
    });

    assert_eq!(registry.cached_len(), cached);
}
