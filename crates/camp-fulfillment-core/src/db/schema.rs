//! SQLite schema definition.

/// Complete database schema for the fulfillment engine.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Camps and Packages
-- ============================================================================

CREATE TABLE IF NOT EXISTS camps (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    district TEXT,
    state TEXT,
    start_date TEXT,
    end_date TEXT,
    completed INTEGER NOT NULL DEFAULT 0,       -- derived, written by the cascade only
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,       -- derived, written by the cascade only
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_packages_camp ON packages(camp_id);

-- ============================================================================
-- Service Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS services (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS package_services (
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    service_id TEXT NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    PRIMARY KEY (package_id, service_id)
);

-- ============================================================================
-- Technicians
-- ============================================================================

CREATE TABLE IF NOT EXISTS technicians (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS technician_services (
    technician_id TEXT NOT NULL REFERENCES technicians(id) ON DELETE CASCADE,
    service_id TEXT NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    PRIMARY KEY (technician_id, service_id)
);

CREATE TABLE IF NOT EXISTS technician_camps (
    technician_id TEXT NOT NULL REFERENCES technicians(id) ON DELETE CASCADE,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    PRIMARY KEY (technician_id, camp_id)
);

CREATE TABLE IF NOT EXISTS package_technicians (
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    technician_id TEXT NOT NULL REFERENCES technicians(id) ON DELETE CASCADE,
    PRIMARY KEY (package_id, technician_id)
);

-- ============================================================================
-- Service Assignments (replaced wholesale per camp+package scope)
-- ============================================================================

CREATE TABLE IF NOT EXISTS service_assignments (
    id TEXT PRIMARY KEY,
    technician_id TEXT NOT NULL REFERENCES technicians(id) ON DELETE CASCADE,
    service_id TEXT NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (technician_id, service_id, camp_id, package_id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_scope
    ON service_assignments(camp_id, package_id, service_id);

-- ============================================================================
-- Intake
-- ============================================================================

CREATE TABLE IF NOT EXISTS intake_batches (
    id TEXT PRIMARY KEY,
    public_id TEXT NOT NULL UNIQUE,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    package_id TEXT REFERENCES packages(id) ON DELETE SET NULL,
    source_ref TEXT,                             -- blob reference of the uploaded sheet
    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,                  -- public QR token, lowercase
    source_row_id TEXT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL DEFAULT 0,
    gender TEXT NOT NULL DEFAULT '',
    contact TEXT NOT NULL DEFAULT '',
    services TEXT NOT NULL DEFAULT '',           -- display string, comma-joined
    checked_in INTEGER NOT NULL DEFAULT 0,
    document_ref TEXT,
    slip_ref TEXT,
    qr_ref TEXT,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    package_id TEXT REFERENCES packages(id) ON DELETE SET NULL,
    batch_id TEXT NOT NULL REFERENCES intake_batches(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_camp ON patients(camp_id);
CREATE INDEX IF NOT EXISTS idx_patients_package ON patients(package_id);

-- Token is immutable once set
CREATE TRIGGER IF NOT EXISTS patients_token_immutable BEFORE UPDATE OF token ON patients
WHEN old.token <> new.token
BEGIN
    SELECT RAISE(ABORT, 'Patient token cannot be changed');
END;

-- Check-in is monotonic
CREATE TRIGGER IF NOT EXISTS patients_checked_in_monotonic BEFORE UPDATE OF checked_in ON patients
WHEN old.checked_in = 1 AND new.checked_in = 0
BEGIN
    SELECT RAISE(ABORT, 'Check-in cannot be reverted');
END;

-- ============================================================================
-- Completion Tracking
-- ============================================================================

CREATE TABLE IF NOT EXISTS service_statuses (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    service_id TEXT NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    technician_id TEXT REFERENCES technicians(id) ON DELETE SET NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (patient_id, service_id)
);

CREATE INDEX IF NOT EXISTS idx_statuses_technician ON service_statuses(technician_id);
CREATE INDEX IF NOT EXISTS idx_statuses_service ON service_statuses(service_id);

-- Completion is monotonic
CREATE TRIGGER IF NOT EXISTS service_statuses_completion_monotonic
BEFORE UPDATE OF completed ON service_statuses
WHEN old.completed = 1 AND new.completed = 0
BEGIN
    SELECT RAISE(ABORT, 'Service completion cannot be reverted');
END;

-- Audit log (Append-Only - Immutable after creation)
CREATE TABLE IF NOT EXISTS service_logs (
    id TEXT PRIMARY KEY,
    status_id TEXT NOT NULL REFERENCES service_statuses(id),
    technician_id TEXT NOT NULL REFERENCES technicians(id),
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_logs_status ON service_logs(status_id);
CREATE INDEX IF NOT EXISTS idx_logs_completed_at ON service_logs(completed_at);

CREATE TRIGGER IF NOT EXISTS service_logs_no_update BEFORE UPDATE ON service_logs
BEGIN
    SELECT RAISE(ABORT, 'Service logs are append-only');
END;

CREATE TRIGGER IF NOT EXISTS service_logs_no_delete BEFORE DELETE ON service_logs
BEGIN
    SELECT RAISE(ABORT, 'Service logs are append-only');
END;

-- ============================================================================
-- Stored Artifacts
-- ============================================================================

CREATE TABLE IF NOT EXISTS artifacts (
    reference TEXT PRIMARY KEY,                  -- as returned by the blob store
    kind TEXT NOT NULL CHECK (kind IN ('document', 'slip', 'qr')),
    checksum TEXT NOT NULL,                      -- SHA-256, hex
    byte_len INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
