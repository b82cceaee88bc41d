//! Tracing layer that feeds the activity log

use tokio::sync::mpsc::UnboundedSender;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::Interest;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Crates that belong to this project (for filtering)
const PROJECT_CRATES: &[&str] = &["luxbridge", "lux_protocol", "lux_bridge", "lux_sim"];

fn is_project_target(target: &str) -> bool {
    PROJECT_CRATES
        .iter()
        .any(|crate_name| target.starts_with(crate_name))
}

/// Filter that only passes project crates up to a maximum level
pub struct ProjectCrateFilter {
    max_level: LevelFilter,
}

impl ProjectCrateFilter {
    /// Create a filter passing events at or above `max_level` in severity
    pub fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }
}

impl<S> tracing_subscriber::layer::Filter<S> for ProjectCrateFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        is_project_target(meta.target()) && *meta.level() <= self.max_level
    }

    fn callsite_enabled(&self, meta: &'static Metadata<'static>) -> Interest {
        if is_project_target(meta.target()) && *meta.level() <= self.max_level {
            Interest::always()
        } else {
            Interest::never()
        }
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Source of the entry (derived from tracing target or custom field)
    pub source: String,
    /// Severity level
    pub level: Level,
    /// Log message
    pub message: String,
}

impl std::fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.source, self.message)
    }
}

/// Layer that captures log events and sends them via channel
pub struct ActivityLayer {
    tx: UnboundedSender<ActivityEntry>,
}

impl ActivityLayer {
    /// Create a layer that sends entries to the given channel
    pub fn new(tx: UnboundedSender<ActivityEntry>) -> Self {
        Self { tx }
    }
}

impl<S: Subscriber> Layer<S> for ActivityLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let entry = ActivityEntry {
            source: visitor
                .source
                .unwrap_or_else(|| simplify_target(event.metadata().target())),
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
        };

        // Receiver gone means the log writer stopped
        let _ = self.tx.send(entry);
    }
}

/// Visitor to extract message and optional source from tracing fields
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    source: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "source" => self.source = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "source" => self.source = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

/// Turn a module path into a short source name
///
/// `lux_bridge::bus` becomes `Bus`.
fn simplify_target(target: &str) -> String {
    let last = target.rsplit("::").next().unwrap_or(target);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => target.to_string(),
    }
}
