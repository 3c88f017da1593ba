//! v001 -- Initial schema creation.
//!
//! Creates the core tables: the identity mirrors (`users`, `providers`,
//! `scenarios`), the lifecycle tables (`case_requests`,
//! `timeline_entries`), chat (`chat_rooms`, `chat_messages`), `reviews`,
//! and the write-only sinks (`notifications`, `audit_log`).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (identity mirror; credentials live upstream)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    display_name TEXT,
    role         TEXT NOT NULL,               -- customer / investigator / admin / super_admin
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Providers (directory mirror; the core only reads status + rating)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS providers (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id      TEXT NOT NULL,               -- the provider's login account
    display_name TEXT NOT NULL,
    status       TEXT NOT NULL,               -- pending / approved / suspended
    rating       REAL NOT NULL DEFAULT 0,     -- denormalized mean of review ratings
    review_count INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_providers_user_id ON providers(user_id);

-- ----------------------------------------------------------------
-- Scenario templates (catalog mirror; existence checks only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS scenarios (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    title      TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Case requests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS case_requests (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    title           TEXT NOT NULL,
    details         TEXT NOT NULL,
    desired_outcome TEXT,
    status          TEXT NOT NULL,             -- closed enum, e.g. MATCHING
    customer_id     TEXT NOT NULL,             -- owning user
    provider_id     TEXT NOT NULL,             -- FK -> providers(id), immutable
    scenario_id     TEXT,                      -- nullable FK -> scenarios(id)
    budget_min      INTEGER,                   -- minor currency units
    budget_max      INTEGER,
    decline_reason  TEXT,                      -- non-null iff status DECLINED
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    accepted_at     TEXT,
    declined_at     TEXT,
    cancelled_at    TEXT,
    completed_at    TEXT,

    FOREIGN KEY (provider_id) REFERENCES providers(id),
    FOREIGN KEY (scenario_id) REFERENCES scenarios(id)
);

CREATE INDEX IF NOT EXISTS idx_case_requests_customer
    ON case_requests(customer_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_case_requests_provider
    ON case_requests(provider_id, created_at DESC);

-- ----------------------------------------------------------------
-- Timeline entries (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS timeline_entries (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    request_id TEXT NOT NULL,                 -- FK -> case_requests(id)
    kind       TEXT NOT NULL,                 -- closed enum, e.g. PROGRESS_NOTE
    title      TEXT,
    note       TEXT,
    payload    TEXT,                          -- JSON, one schema per kind
    author_id  TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (request_id) REFERENCES case_requests(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_timeline_request_ts
    ON timeline_entries(request_id, created_at ASC);

-- ----------------------------------------------------------------
-- Chat rooms: at most one per request, enforced by UNIQUE(request_id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_rooms (
    id               TEXT PRIMARY KEY NOT NULL, -- UUID v4
    request_id       TEXT NOT NULL UNIQUE,      -- FK -> case_requests(id)
    customer_id      TEXT NOT NULL,
    provider_user_id TEXT NOT NULL,
    last_message     TEXT,                      -- denormalized preview
    last_message_at  TEXT,
    created_at       TEXT NOT NULL,

    FOREIGN KEY (request_id) REFERENCES case_requests(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Chat messages (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_messages (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    room_id     TEXT NOT NULL,                -- FK -> chat_rooms(id)
    sender_id   TEXT NOT NULL,
    content     TEXT NOT NULL,
    attachments TEXT,                         -- JSON array of {file_name, url}
    created_at  TEXT NOT NULL,

    FOREIGN KEY (room_id) REFERENCES chat_rooms(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chat_messages_room_ts
    ON chat_messages(room_id, created_at DESC);

-- ----------------------------------------------------------------
-- Reviews: one per request, enforced by UNIQUE(request_id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reviews (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    request_id  TEXT NOT NULL UNIQUE,         -- FK -> case_requests(id)
    provider_id TEXT NOT NULL,                -- FK -> providers(id)
    customer_id TEXT NOT NULL,
    rating      INTEGER NOT NULL,             -- 1..=5
    comment     TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    FOREIGN KEY (request_id) REFERENCES case_requests(id) ON DELETE CASCADE,
    FOREIGN KEY (provider_id) REFERENCES providers(id)
);

CREATE INDEX IF NOT EXISTS idx_reviews_provider ON reviews(provider_id);

-- ----------------------------------------------------------------
-- Notifications (outbox; delivery is the external system's concern).
-- No FK: records outlive the case requests they reference.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_id    TEXT NOT NULL,
    kind       TEXT NOT NULL,
    title      TEXT NOT NULL,
    message    TEXT NOT NULL,
    request_id TEXT,                          -- action reference
    metadata   TEXT,                          -- JSON
    read_at    TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user
    ON notifications(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Audit log: actor-attributed status changes for compliance tracing.
-- No FK: the trail survives request deletion.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS audit_log (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    actor_id    TEXT NOT NULL,
    action      TEXT NOT NULL,                -- e.g. status.change
    request_id  TEXT NOT NULL,
    from_status TEXT NOT NULL,                -- raw stored value, may be unrecognized
    to_status   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_request_ts
    ON audit_log(request_id, created_at ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
