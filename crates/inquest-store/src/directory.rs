//! Mirror records for users, providers, and scenario templates.
//!
//! These tables are maintained by the upstream systems that own them; the
//! lifecycle engine reads them to gate operations and resolve identities,
//! and only ever writes the provider rating aggregate.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Provider, Scenario, UserAccount};

impl Database {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert or refresh a mirrored user account.
    pub fn upsert_user(&self, user: &UserAccount) -> Result<()> {
        // ON CONFLICT DO UPDATE rather than OR REPLACE: REPLACE deletes and
        // reinserts, which trips foreign keys on referenced rows.
        self.conn().execute(
            "INSERT INTO users (id, display_name, role, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 display_name = excluded.display_name,
                 role = excluded.role",
            params![
                user.id.to_string(),
                user.display_name,
                user.role.to_string(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single user account by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<UserAccount> {
        self.conn()
            .query_row(
                "SELECT id, display_name, role, created_at
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a user account, returning `None` when the mirror has no row.
    /// Chat identity resolution is lenient, so absence is not an error there.
    pub fn find_user(&self, id: Uuid) -> Result<Option<UserAccount>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, display_name, role, created_at
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    /// Insert or refresh a mirrored provider profile.  The rating aggregate
    /// columns are owned by the review code and never overwritten here.
    pub fn upsert_provider(&self, provider: &Provider) -> Result<()> {
        self.conn().execute(
            "INSERT INTO providers (id, user_id, display_name, status, rating, review_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 display_name = excluded.display_name,
                 status = excluded.status",
            params![
                provider.id.to_string(),
                provider.user_id.to_string(),
                provider.display_name,
                provider.status.to_string(),
                provider.rating,
                provider.review_count,
                provider.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single provider by UUID.
    pub fn get_provider(&self, id: Uuid) -> Result<Provider> {
        self.conn()
            .query_row(
                "SELECT id, user_id, display_name, status, rating, review_count, created_at
                 FROM providers
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_provider,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a provider by UUID, returning `None` when absent.
    pub fn find_provider(&self, id: Uuid) -> Result<Option<Provider>> {
        let provider = self
            .conn()
            .query_row(
                "SELECT id, user_id, display_name, status, rating, review_count, created_at
                 FROM providers
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_provider,
            )
            .optional()?;
        Ok(provider)
    }

    /// Fetch the provider profile belonging to a user account, if any.
    pub fn find_provider_for_user(&self, user_id: Uuid) -> Result<Option<Provider>> {
        let provider = self
            .conn()
            .query_row(
                "SELECT id, user_id, display_name, status, rating, review_count, created_at
                 FROM providers
                 WHERE user_id = ?1",
                params![user_id.to_string()],
                row_to_provider,
            )
            .optional()?;
        Ok(provider)
    }

    // ------------------------------------------------------------------
    // Scenario templates
    // ------------------------------------------------------------------

    /// Insert or refresh a mirrored scenario template.
    pub fn upsert_scenario(&self, scenario: &Scenario) -> Result<()> {
        self.conn().execute(
            "INSERT INTO scenarios (id, title, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title",
            params![
                scenario.id.to_string(),
                scenario.title,
                scenario.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single scenario template by UUID.
    pub fn get_scenario(&self, id: Uuid) -> Result<Scenario> {
        self.conn()
            .query_row(
                "SELECT id, title, created_at
                 FROM scenarios
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_scenario,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a scenario template exists.
    pub fn scenario_exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM scenarios WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`UserAccount`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: convert::uuid_col(row, 0)?,
        display_name: row.get(1)?,
        role: convert::parsed_col(row, 2)?,
        created_at: convert::ts_col(row, 3)?,
    })
}

/// Map a `rusqlite::Row` to a [`Provider`].
fn row_to_provider(row: &rusqlite::Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: convert::uuid_col(row, 0)?,
        user_id: convert::uuid_col(row, 1)?,
        display_name: row.get(2)?,
        status: convert::parsed_col(row, 3)?,
        rating: row.get(4)?,
        review_count: row.get(5)?,
        created_at: convert::ts_col(row, 6)?,
    })
}

/// Map a `rusqlite::Row` to a [`Scenario`].
fn row_to_scenario(row: &rusqlite::Row<'_>) -> rusqlite::Result<Scenario> {
    Ok(Scenario {
        id: convert::uuid_col(row, 0)?,
        title: row.get(1)?,
        created_at: convert::ts_col(row, 2)?,
    })
}
