use tracing::Span;

use super::tick_id::TickId;

/// Create the root span for one scheduling tick.
pub fn tick_span(tick_id: &TickId) -> Span {
    tracing::info_span!("tick", tick_id = %tick_id)
}

/// Create a child span for one application's dispatch (inherits tick_id).
pub fn app_span(app_id: &str) -> Span {
    tracing::info_span!("app", app_id = %app_id)
}
