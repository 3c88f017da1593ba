//! Shared fixtures for the store tests: a throwaway database plus seed
//! helpers for the mirror tables and a baseline case request.

use chrono::Utc;
use inquest_shared::Role;
use tempfile::TempDir;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{CaseRequest, Provider, ProviderStatus, Scenario, UserAccount};
use crate::requests::NewCaseRequest;

/// Open a migrated database in a fresh temp directory.  The directory must
/// stay alive for the duration of the test.
pub(crate) fn open_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let db = Database::open_at(&dir.path().join("test.db")).expect("open test db");
    (dir, db)
}

/// Insert a mirrored user account with the given role.
pub(crate) fn seed_user(db: &Database, role: Role, name: &str) -> UserAccount {
    let user = UserAccount {
        id: Uuid::new_v4(),
        display_name: Some(name.to_string()),
        role,
        created_at: Utc::now(),
    };
    db.upsert_user(&user).expect("seed user");
    user
}

/// Insert a provider profile (and its backing investigator account).
pub(crate) fn seed_provider(db: &Database, status: ProviderStatus) -> Provider {
    let account = seed_user(db, Role::Investigator, "Sam Marlowe");
    let provider = Provider {
        id: Uuid::new_v4(),
        user_id: account.id,
        display_name: account
            .display_name
            .clone()
            .unwrap_or_else(|| "Provider".into()),
        status,
        rating: 0.0,
        review_count: 0,
        created_at: Utc::now(),
    };
    db.upsert_provider(&provider).expect("seed provider");
    provider
}

/// Insert a scenario template.
pub(crate) fn seed_scenario(db: &Database) -> Scenario {
    let scenario = Scenario {
        id: Uuid::new_v4(),
        title: "Background check".into(),
        created_at: Utc::now(),
    };
    db.upsert_scenario(&scenario).expect("seed scenario");
    scenario
}

/// A minimal valid creation payload against the given participants.
pub(crate) fn draft_request(customer_id: Uuid, provider_id: Uuid) -> NewCaseRequest {
    NewCaseRequest {
        title: "Locate missing ledger".into(),
        details: "The quarterly ledger disappeared from the archive room.".into(),
        desired_outcome: None,
        customer_id,
        provider_id,
        scenario_id: None,
        budget_min: None,
        budget_max: None,
    }
}

/// Create a case request in its initial state for the given participants.
pub(crate) fn seed_request(db: &mut Database, customer_id: Uuid, provider_id: Uuid) -> CaseRequest {
    db.create_case_request(&draft_request(customer_id, provider_id))
        .expect("seed request")
}
