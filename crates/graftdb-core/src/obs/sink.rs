//! Metrics sink boundary.
//!
//! Reconcile logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{obs::metrics, operation::OperationType};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ReconcileStart {
        operation: OperationType,
        entity_path: &'static str,
    },
    ReconcileFinish {
        operation: OperationType,
        entity_path: &'static str,
        nodes_merged: u64,
        orphans_removed: u64,
        ok: bool,
    },
    NodeMerged {
        entity_path: &'static str,
    },
    EntityLoaded {
        entity_path: &'static str,
    },
    EntityCreated {
        entity_path: &'static str,
    },
    LinkAdded {
        entity_path: &'static str,
    },
    LinkRemoved {
        entity_path: &'static str,
    },
    OrphanRemoved {
        entity_path: &'static str,
    },
    AuthorizationDenied {
        entity_path: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ReconcileStart {
                operation,
                entity_path,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.reconcile_calls = m.ops.reconcile_calls.saturating_add(1);
                    if operation.is_save() {
                        m.ops.save_calls = m.ops.save_calls.saturating_add(1);
                    } else if operation.is_delete() {
                        m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                    } else {
                        m.ops.retrieve_calls = m.ops.retrieve_calls.saturating_add(1);
                    }
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.reconcile_calls = e.reconcile_calls.saturating_add(1);
                    });
                });
            }

            MetricsEvent::ReconcileFinish { ok, .. } => {
                if !ok {
                    metrics::with_state_mut(|m| {
                        m.ops.failed_calls = m.ops.failed_calls.saturating_add(1);
                    });
                }
            }

            MetricsEvent::NodeMerged { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.nodes_merged = m.ops.nodes_merged.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.nodes_merged = e.nodes_merged.saturating_add(1);
                    });
                });
            }

            MetricsEvent::EntityLoaded { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.entities_loaded = m.ops.entities_loaded.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.entities_loaded = e.entities_loaded.saturating_add(1);
                    });
                });
            }

            MetricsEvent::EntityCreated { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.entities_created = m.ops.entities_created.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.entities_created = e.entities_created.saturating_add(1);
                    });
                });
            }

            MetricsEvent::LinkAdded { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.links_added = m.ops.links_added.saturating_add(1);
                });
            }

            MetricsEvent::LinkRemoved { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.links_removed = m.ops.links_removed.saturating_add(1);
                });
            }

            MetricsEvent::OrphanRemoved { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.orphans_removed = m.ops.orphans_removed.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.orphans_removed = e.orphans_removed.saturating_add(1);
                    });
                });
            }

            MetricsEvent::AuthorizationDenied { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.authorization_denials = m.ops.authorization_denials.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.authorization_denials = e.authorization_denials.saturating_add(1);
                    });
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a live `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous slot on every exit (including unwind).
        // - `record` is synchronous and never stores `ptr`.
        // - Only a shared reference is materialized.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's metrics.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The erased pointer is installed only for this dynamic scope; `Guard`
    //   restores the previous slot on all exits, including panic.
    // - `record` dereferences it synchronously and never persists it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one reconcile call.
/// A span dropped without `succeed` reports a failed call.
///

pub(crate) struct Span {
    operation: OperationType,
    entity_path: &'static str,
    nodes_merged: u64,
    orphans_removed: u64,
    ok: bool,
}

impl Span {
    #[must_use]
    pub(crate) fn new(operation: OperationType, entity_path: &'static str) -> Self {
        record(MetricsEvent::ReconcileStart {
            operation,
            entity_path,
        });

        Self {
            operation,
            entity_path,
            nodes_merged: 0,
            orphans_removed: 0,
            ok: false,
        }
    }

    pub(crate) const fn succeed(&mut self, nodes_merged: u64, orphans_removed: u64) {
        self.nodes_merged = nodes_merged;
        self.orphans_removed = orphans_removed;
        self.ok = true;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ReconcileFinish {
            operation: self.operation,
            entity_path: self.entity_path,
            nodes_merged: self.nodes_merged,
            orphans_removed: self.orphans_removed,
            ok: self.ok,
        });
    }
}

///
/// TESTS
///
