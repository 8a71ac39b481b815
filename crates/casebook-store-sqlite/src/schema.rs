//! SQL schema for the Casebook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Structured list attributes (aliases, zones, antecedents, ...) live in
//! single TEXT columns as JSON. Relations between records use join tables
//! with a `position` column so list order survives a round trip.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS actors (
    actor_id      TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    role          TEXT NOT NULL,   -- unknown text decodes to no role
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    profile_id  TEXT PRIMARY KEY,
    surname     TEXT NOT NULL DEFAULT '',
    name        TEXT NOT NULL DEFAULT '',
    document    TEXT NOT NULL DEFAULT '',
    tax_id      INTEGER,
    nationality TEXT NOT NULL DEFAULT '',
    role        TEXT,
    custody     TEXT,
    occupation  TEXT NOT NULL DEFAULT '',
    birth_date  TEXT,
    aliases     TEXT,            -- JSON list of strings
    phones      TEXT,            -- JSON list of strings
    addresses   TEXT,            -- JSON list of objects
    vehicles    TEXT,            -- JSON list of objects
    employers   TEXT,            -- JSON list of objects
    owner       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Blank documents are allowed any number of times.
CREATE UNIQUE INDEX IF NOT EXISTS profiles_document_idx
    ON profiles(document) WHERE document <> '';

CREATE TABLE IF NOT EXISTS organizations (
    organization_id TEXT PRIMARY KEY,
    names           TEXT,        -- JSON list; principal name first
    zones           TEXT,        -- JSON list of zone objects
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organization_leaders (
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    profile_id      TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (organization_id, profile_id)
);

CREATE TABLE IF NOT EXISTS organization_members (
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    profile_id      TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (organization_id, profile_id)
);

-- Directed edges: a row (A, B) says nothing about (B, A).
CREATE TABLE IF NOT EXISTS organization_allies (
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    other_id        TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (organization_id, other_id),
    CHECK (organization_id <> other_id)
);

CREATE TABLE IF NOT EXISTS organization_rivals (
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    other_id        TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (organization_id, other_id),
    CHECK (organization_id <> other_id)
);

CREATE TABLE IF NOT EXISTS links (
    link_id                TEXT PRIMARY KEY,
    url                    TEXT NOT NULL UNIQUE,
    outlet                 TEXT,
    status                 TEXT NOT NULL DEFAULT 'pending',
    approved_at            TEXT,
    categories             TEXT,  -- JSON list of strings
    reviewed_by_classifier INTEGER NOT NULL DEFAULT 0,
    reviewed_by_editor     INTEGER NOT NULL DEFAULT 0,
    owner                  TEXT NOT NULL,
    submitted_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incidents (
    incident_id    TEXT PRIMARY KEY,
    date           TEXT NOT NULL,   -- YYYY-MM-DD
    category       TEXT,
    location       TEXT,            -- JSON location object
    qualification  TEXT NOT NULL DEFAULT 'robbery',
    description    TEXT NOT NULL DEFAULT '',
    author_unknown INTEGER NOT NULL DEFAULT 0,
    created_by     TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incident_authors (
    incident_id TEXT NOT NULL REFERENCES incidents(incident_id) ON DELETE CASCADE,
    profile_id  TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    PRIMARY KEY (incident_id, profile_id)
);

CREATE TABLE IF NOT EXISTS incident_organizations (
    incident_id     TEXT NOT NULL REFERENCES incidents(incident_id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (incident_id, organization_id)
);

CREATE TABLE IF NOT EXISTS incident_links (
    incident_id TEXT NOT NULL REFERENCES incidents(incident_id) ON DELETE CASCADE,
    link_id     TEXT NOT NULL REFERENCES links(link_id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    PRIMARY KEY (incident_id, link_id)
);

-- One report per organization.
CREATE TABLE IF NOT EXISTS reports (
    report_id           TEXT PRIMARY KEY,
    organization_id     TEXT NOT NULL UNIQUE
                        REFERENCES organizations(organization_id) ON DELETE CASCADE,
    introduction        TEXT NOT NULL DEFAULT '',
    relevant_conclusion TEXT NOT NULL DEFAULT '',
    likely_evolution    TEXT NOT NULL DEFAULT '',
    development_title   TEXT NOT NULL DEFAULT '',
    development_body    TEXT NOT NULL DEFAULT '',
    conclusions         TEXT NOT NULL DEFAULT '',
    antecedents         TEXT,       -- JSON list of {title, description}
    zones               TEXT,       -- copied from the organization at save
    export_count        INTEGER NOT NULL DEFAULT 0,
    created_by          TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- Snapshots, replaced wholesale on every report save.
CREATE TABLE IF NOT EXISTS report_allies (
    report_id       TEXT NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (report_id, organization_id)
);

CREATE TABLE IF NOT EXISTS report_rivals (
    report_id       TEXT NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL REFERENCES organizations(organization_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (report_id, organization_id)
);

-- Derived hierarchy. Deleted and regenerated on every report save; never
-- written anywhere else.
CREATE TABLE IF NOT EXISTS memberships (
    report_id TEXT NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
    member_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    role      TEXT NOT NULL,     -- 'leader' | 'lieutenant'
    position  INTEGER NOT NULL,
    UNIQUE (report_id, member_id)
);

CREATE TABLE IF NOT EXISTS activity (
    entry_id    TEXT PRIMARY KEY,
    actor_id    TEXT,
    kind        TEXT NOT NULL,
    description TEXT NOT NULL,
    at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS profiles_owner_idx     ON profiles(owner);
CREATE INDEX IF NOT EXISTS incidents_date_idx     ON incidents(date);
CREATE INDEX IF NOT EXISTS links_owner_idx        ON links(owner);
CREATE INDEX IF NOT EXISTS activity_at_idx        ON activity(at);

PRAGMA user_version = 1;
";
