use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory reconcile counters for the current thread.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Reconcile entrypoints
    pub reconcile_calls: u64,
    pub save_calls: u64,
    pub retrieve_calls: u64,
    pub delete_calls: u64,
    pub failed_calls: u64,

    // Graph work
    pub nodes_merged: u64,
    pub entities_loaded: u64,
    pub entities_created: u64,
    pub links_added: u64,
    pub links_removed: u64,
    pub orphans_removed: u64,

    // Authorization
    pub authorization_denials: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub reconcile_calls: u64,
    pub nodes_merged: u64,
    pub entities_loaded: u64,
    pub entities_created: u64,
    pub orphans_removed: u64,
    pub authorization_denials: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Borrow one entity's counters mutably, creating them on first use.
pub(crate) fn with_entity_mut(m: &mut EventState, path: &str, f: impl FnOnce(&mut EntityCounters)) {
    f(m.entities.entry(path.to_string()).or_default());
}

/// Reset all counters and restart the window.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters, busiest first.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub reconcile_calls: u64,
    pub nodes_merged: u64,
    pub entities_loaded: u64,
    pub entities_created: u64,
    pub orphans_removed: u64,
    pub avg_nodes_per_call: f64,
}

/// Build a report, or an empty one if the window started before `window_start_ms`.
#[must_use]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.window_start_ms) {
        return EventReport::default();
    }

    report_from(snap)
}

#[allow(clippy::cast_precision_loss)]
fn report_from(snap: EventState) -> EventReport {
    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(path, ops)| {
            let avg_nodes = if ops.reconcile_calls > 0 {
                ops.nodes_merged as f64 / ops.reconcile_calls as f64
            } else {
                0.0
            };

            EntitySummary {
                path: path.clone(),
                reconcile_calls: ops.reconcile_calls,
                nodes_merged: ops.nodes_merged,
                entities_loaded: ops.entities_loaded,
                entities_created: ops.entities_created,
                orphans_removed: ops.orphans_removed,
                avg_nodes_per_call: avg_nodes,
            }
        })
        .collect();

    entity_counters.sort_by(|a, b| match b.nodes_merged.cmp(&a.nodes_merged) {
        Ordering::Equal => a.path.cmp(&b.path),
        other => other,
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///
