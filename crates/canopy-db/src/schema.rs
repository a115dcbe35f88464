//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tents (physical grow spaces, the unit of occupancy)
-- =======================================================================
DEFINE TABLE tent SCHEMAFULL;
DEFINE FIELD name ON TABLE tent TYPE string;
DEFINE FIELD category ON TABLE tent TYPE string \
    ASSERT $value IN ['Maintenance', 'Vega', 'Flora', 'Drying'];
DEFINE FIELD width_cm ON TABLE tent TYPE float;
DEFINE FIELD depth_cm ON TABLE tent TYPE float;
DEFINE FIELD height_cm ON TABLE tent TYPE float;
DEFINE FIELD created_at ON TABLE tent TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tent TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tent_name ON TABLE tent COLUMNS name UNIQUE;

-- =======================================================================
-- Strains (immutable genetics reference data)
-- =======================================================================
DEFINE TABLE strain SCHEMAFULL;
DEFINE FIELD name ON TABLE strain TYPE string;
DEFINE FIELD vega_weeks ON TABLE strain TYPE int;
DEFINE FIELD flora_weeks ON TABLE strain TYPE int;
DEFINE FIELD created_at ON TABLE strain TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_strain_name ON TABLE strain COLUMNS name UNIQUE;

-- =======================================================================
-- Cycles (one cultivation run per tent; phase derived from dates)
-- =======================================================================
DEFINE TABLE cycle SCHEMAFULL;
DEFINE FIELD tent_id ON TABLE cycle TYPE string;
DEFINE FIELD strain_id ON TABLE cycle TYPE option<string>;
DEFINE FIELD status ON TABLE cycle TYPE string \
    ASSERT $value IN ['Active', 'Finished'];
DEFINE FIELD start_date ON TABLE cycle TYPE datetime;
DEFINE FIELD cloning_start_date ON TABLE cycle TYPE option<datetime>;
DEFINE FIELD flora_start_date ON TABLE cycle TYPE option<datetime>;
DEFINE FIELD drying_start_date ON TABLE cycle TYPE option<datetime>;
DEFINE FIELD clones_produced ON TABLE cycle TYPE option<int>;
DEFINE FIELD mother_plant_id ON TABLE cycle TYPE option<string>;
DEFINE FIELD harvest_notes ON TABLE cycle TYPE option<string>;
DEFINE FIELD created_at ON TABLE cycle TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE cycle TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_cycle_tent_status ON TABLE cycle \
    COLUMNS tent_id, status;

-- =======================================================================
-- Plants (exclusively owned by one tent at a time)
-- =======================================================================
DEFINE TABLE plant SCHEMAFULL;
DEFINE FIELD strain_id ON TABLE plant TYPE string;
DEFINE FIELD tent_id ON TABLE plant TYPE string;
DEFINE FIELD status ON TABLE plant TYPE string \
    ASSERT $value IN ['Active', 'Archived'];
DEFINE FIELD mother_plant_id ON TABLE plant TYPE option<string>;
DEFINE FIELD label ON TABLE plant TYPE option<string>;
DEFINE FIELD created_at ON TABLE plant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_plant_tent_status ON TABLE plant \
    COLUMNS tent_id, status;

-- =======================================================================
-- Weekly targets (per strain/phase/week environmental bounds)
-- =======================================================================
DEFINE TABLE weekly_target SCHEMAFULL;
DEFINE FIELD strain_id ON TABLE weekly_target TYPE string;
DEFINE FIELD phase ON TABLE weekly_target TYPE string \
    ASSERT $value IN ['Cloning', 'Maintenance', 'Vega', 'Flora', \
    'Drying'];
DEFINE FIELD week_number ON TABLE weekly_target TYPE int;
DEFINE FIELD ppfd_min ON TABLE weekly_target TYPE float;
DEFINE FIELD ppfd_max ON TABLE weekly_target TYPE float;
DEFINE FIELD photoperiod_min ON TABLE weekly_target TYPE float;
DEFINE FIELD photoperiod_max ON TABLE weekly_target TYPE float;
DEFINE FIELD temperature_min ON TABLE weekly_target TYPE float;
DEFINE FIELD temperature_max ON TABLE weekly_target TYPE float;
DEFINE FIELD humidity_min ON TABLE weekly_target TYPE float;
DEFINE FIELD humidity_max ON TABLE weekly_target TYPE float;
DEFINE FIELD ph_min ON TABLE weekly_target TYPE float;
DEFINE FIELD ph_max ON TABLE weekly_target TYPE float;
DEFINE FIELD ec_min ON TABLE weekly_target TYPE float;
DEFINE FIELD ec_max ON TABLE weekly_target TYPE float;
DEFINE FIELD created_at ON TABLE weekly_target TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_target_strain_phase_week ON TABLE weekly_target \
    COLUMNS strain_id, phase, week_number UNIQUE;

-- =======================================================================
-- Phase alert margins (one row per phase; ph NULL = no pH alerting)
-- =======================================================================
DEFINE TABLE phase_alert_margin SCHEMAFULL;
DEFINE FIELD phase ON TABLE phase_alert_margin TYPE string \
    ASSERT $value IN ['Cloning', 'Maintenance', 'Vega', 'Flora', \
    'Drying'];
DEFINE FIELD temperature_c ON TABLE phase_alert_margin TYPE float;
DEFINE FIELD humidity_pct ON TABLE phase_alert_margin TYPE float;
DEFINE FIELD ppfd ON TABLE phase_alert_margin TYPE float;
DEFINE FIELD ph ON TABLE phase_alert_margin TYPE option<float>;
DEFINE FIELD updated_at ON TABLE phase_alert_margin TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_margin_phase ON TABLE phase_alert_margin \
    COLUMNS phase UNIQUE;

-- =======================================================================
-- Plant tent history (append-only relocation log)
-- =======================================================================
DEFINE TABLE plant_tent_history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD plant_id ON TABLE plant_tent_history TYPE string;
DEFINE FIELD from_tent_id ON TABLE plant_tent_history TYPE string;
DEFINE FIELD to_tent_id ON TABLE plant_tent_history TYPE string;
DEFINE FIELD moved_at ON TABLE plant_tent_history TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD reason ON TABLE plant_tent_history TYPE string;
DEFINE INDEX idx_history_plant ON TABLE plant_tent_history \
    COLUMNS plant_id, moved_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
