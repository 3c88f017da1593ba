//! Shared fixtures for server tests: a throwaway database plus seed helpers
//! for the directory tables the engine reads but does not own.

use chrono::Utc;
use inquest_shared::Role;
use inquest_store::{
    CaseRequest, Database, NewCaseRequest, Provider, ProviderStatus, Scenario, UserAccount,
};
use tempfile::TempDir;
use uuid::Uuid;

use crate::auth::Identity;

/// Open a fresh database in a temp directory.  Keep the `TempDir` alive for
/// the duration of the test.
pub fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("inquest-test.db")).unwrap();
    (dir, db)
}

pub fn identity(user_id: Uuid, role: Role) -> Identity {
    Identity { user_id, role }
}

pub fn seed_user(db: &Database, role: Role, name: &str) -> UserAccount {
    let user = UserAccount {
        id: Uuid::new_v4(),
        display_name: Some(name.to_string()),
        role,
        created_at: Utc::now(),
    };
    db.upsert_user(&user).unwrap();
    user
}

/// Seed a provider profile together with its backing investigator account.
pub fn seed_provider(db: &Database, status: ProviderStatus) -> Provider {
    let user = seed_user(db, Role::Investigator, "Sam Marlowe");
    let provider = Provider {
        id: Uuid::new_v4(),
        user_id: user.id,
        display_name: "Marlowe Investigations".to_string(),
        status,
        rating: 0.0,
        review_count: 0,
        created_at: Utc::now(),
    };
    db.upsert_provider(&provider).unwrap();
    provider
}

pub fn seed_scenario(db: &Database) -> Scenario {
    let scenario = Scenario {
        id: Uuid::new_v4(),
        title: "Background check".to_string(),
        created_at: Utc::now(),
    };
    db.upsert_scenario(&scenario).unwrap();
    scenario
}

/// A customer, an approved provider, and one freshly created case request.
#[derive(Clone)]
pub struct CaseFixture {
    pub customer: UserAccount,
    pub provider: Provider,
    pub request: CaseRequest,
}

impl CaseFixture {
    pub fn create(db: &mut Database) -> Self {
        let customer = seed_user(db, Role::Customer, "Avery Quinn");
        let provider = seed_provider(db, ProviderStatus::Approved);
        let request = db
            .create_case_request(&NewCaseRequest {
                title: "Locate missing ledger".to_string(),
                details: "The ledger vanished from the records office last Tuesday.".to_string(),
                desired_outcome: Some("Recover the ledger".to_string()),
                customer_id: customer.id,
                provider_id: provider.id,
                scenario_id: None,
                budget_min: Some(10_000),
                budget_max: Some(50_000),
            })
            .unwrap();
        Self {
            customer,
            provider,
            request,
        }
    }
}
