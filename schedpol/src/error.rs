use thiserror::Error;

/// Tick-fatal failures. Anything else is contained per application.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("no processing elements available")]
    ResourceUnavailable,
}

/// Per-application dispatch failures. These never abort the tick; the
/// affected application is simply left unscheduled.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("null application descriptor")]
    NullApplication,

    #[error("[{app}] no CPU accepted the binding")]
    NoBindingAccepted { app: String },
}
