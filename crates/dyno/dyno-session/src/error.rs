//! Session error types.

use dyno_core::RemoteCallError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A workflow is active; the request would compete with it.
    #[error("busy: workflow is {state}")]
    Busy { state: &'static str },

    #[error("no table selected")]
    NoTableSelected,

    #[error("unknown table '{name}'")]
    UnknownTable { name: String },

    #[error("no item selected")]
    NoCurrentItem,

    #[error("item is missing key attribute values for table '{table}'")]
    IncompleteKey { table: String },

    #[error("'{event}' does not apply while the workflow is {state}")]
    NotApplicable {
        event: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Remote(#[from] RemoteCallError),
}
