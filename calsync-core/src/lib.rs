//! Core of calsync: mirrors busy time between two calendars that can only
//! exchange email.
//!
//! - `occurrence`, `fingerprint`, `window`: the event model
//! - `filter`, `change`, `reconcile`: the pure sync decisions
//! - `ics`: reading and writing attachment data
//! - `session`: one run over the collaborator traits in `collaborators`
//! - `setup`: one-time mailbox provisioning

pub mod change;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod ics;
pub mod occurrence;
pub mod reconcile;
mod recurrence;
pub mod session;
pub mod setup;
pub mod window;

pub use error::{CalSyncError, CalSyncResult, ErrorKind};
pub use occurrence::{BusyState, Occurrence, Origin, SyncTag};
pub use window::SyncWindow;
