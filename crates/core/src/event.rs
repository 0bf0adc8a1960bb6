use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are facts emitted by an aggregate's decision logic. They are applied
/// to evolve state and are surfaced to callers (and logs) as the record of what
/// a command changed.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "orders.order.placed").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
