//! Creation and invocation trace tree.
//!
//! When tracing is enabled on a resolver, every `create_instance` and
//! `invoke_function` call records which services it created and which it
//! merely used. The tree is reported through `tracing` under the
//! `instill::trace` target once the call finishes, if the call took longer
//! than [`SLOW_CALL`] or caused a service to be created.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::ServiceId;

/// Calls faster than this are only reported when they created a service.
pub(crate) const SLOW_CALL: Duration = Duration::from_millis(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TraceKind {
    Creation,
    Invocation,
    Branch,
}

/// Time spent in traced calls across one resolver tree.
#[derive(Debug, Default)]
pub(crate) struct TraceTotals {
    micros: AtomicU64,
}

impl TraceTotals {
    fn add(&self, duration: Duration) -> Duration {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let total = self.micros.fetch_add(micros, Ordering::Relaxed).saturating_add(micros);
        Duration::from_micros(total)
    }
}

struct TraceNode {
    kind: TraceKind,
    name: String,
    start: Instant,
    deps: Mutex<Vec<(ServiceId, bool, Trace)>>,
    totals: Arc<TraceTotals>,
}

/// Handle to a trace tree node. The default value records nothing.
#[derive(Clone, Default)]
pub(crate) struct Trace(Option<Arc<TraceNode>>);

impl Trace {
    pub(crate) fn none() -> Self {
        Self(None)
    }

    pub(crate) fn start(kind: TraceKind, name: &str, totals: Arc<TraceTotals>) -> Self {
        Self(Some(Arc::new(TraceNode {
            kind,
            name: name.to_string(),
            start: Instant::now(),
            deps: Mutex::new(Vec::new()),
            totals,
        })))
    }

    /// Records that `id` was needed; `first` means it had to be created.
    pub(crate) fn branch(&self, id: ServiceId, first: bool) -> Trace {
        let Some(node) = &self.0 else {
            return Trace::none();
        };
        let child = Trace::start(TraceKind::Branch, id.label(), node.totals.clone());
        node.deps.lock().push((id, first, child.clone()));
        child
    }

    pub(crate) fn stop(&self) {
        let Some(node) = &self.0 else {
            return;
        };
        let duration = node.start.elapsed();
        let total = node.totals.add(duration);
        let (report, caused_creation) = self.render(duration, total);
        if duration > SLOW_CALL || caused_creation {
            tracing::info!(target: "instill::trace", "{report}");
        }
    }

    fn render(&self, duration: Duration, total: Duration) -> (String, bool) {
        let Some(node) = &self.0 else {
            return (String::new(), false);
        };
        let mut lines = Vec::new();
        let header = match node.kind {
            TraceKind::Creation => "CREATE",
            _ => "CALL",
        };
        lines.push(format!("{header} {}", node.name));
        let caused_creation = self.render_children(1, &mut lines);
        lines.push(format!(
            "DONE, took {:.2}ms (grand total {:.2}ms)",
            duration.as_secs_f64() * 1000.0,
            total.as_secs_f64() * 1000.0,
        ));
        (lines.join("\n"), caused_creation)
    }

    fn render_children(&self, depth: usize, lines: &mut Vec<String>) -> bool {
        let Some(node) = &self.0 else {
            return false;
        };
        let prefix = "\t".repeat(depth);
        let mut caused_creation = false;
        for (id, first, child) in node.deps.lock().iter() {
            if *first {
                caused_creation = true;
                lines.push(format!("{prefix}CREATES -> {id}"));
                child.render_children(depth + 1, lines);
            } else {
                lines.push(format!("{prefix}uses -> {id}"));
            }
        }
        caused_creation
    }
}
