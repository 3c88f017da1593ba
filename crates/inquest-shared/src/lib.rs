//! # inquest-shared
//!
//! Vocabulary shared by every inquest crate: actor roles and the static
//! capability table, the case status machine with its allowed-edge table,
//! the timeline event kinds with their typed payloads, and notification
//! kinds.  The crate is pure data (no I/O, no storage) so the store and
//! the server consult a single definition of every closed set.

pub mod notify;
pub mod roles;
pub mod status;
pub mod timeline;

pub use notify::NotificationKind;
pub use roles::{role_grants, Capability, Role};
pub use status::CaseStatus;
pub use timeline::{TimelineKind, TimelinePayload};
