//! # inquest-store
//!
//! SQLite persistence for the case request lifecycle engine.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed CRUD helpers for every domain model.
//! The operations with business-level atomicity requirements (request
//! creation, status transitions, review writes, chat sends) run their
//! whole check-then-write sequence inside a single transaction so
//! concurrent writers can never observe a torn state.

pub mod audit;
pub mod chat;
pub mod database;
pub mod directory;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod requests;
pub mod reviews;
pub mod timeline;

mod convert;
mod error;

#[cfg(test)]
pub(crate) mod testutil;

pub use chat::NewChatMessage;
pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use notifications::NewNotification;
pub use requests::{ExpectedStatus, FieldEdits, NewCaseRequest, RequestFilter, StatusChange};
pub use reviews::NewReview;
pub use timeline::NewTimelineEntry;
