pub mod logger;

pub use logger::init::init_tracing;
pub use logger::spans::{app_span, tick_span};
pub use logger::tick_id::TickId;
