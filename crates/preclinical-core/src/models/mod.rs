//! Domain models for the preclinical study core.

mod animal;
mod cohort;
mod procedure;
mod study;
mod visit;

pub use animal::*;
pub use cohort::*;
pub use procedure::*;
pub use study::*;
pub use visit::*;

/// Error returned when a display label does not map to a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Current UTC time as an RFC 3339 string.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fresh UUID v4 string.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
