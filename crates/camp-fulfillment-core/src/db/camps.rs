//! Camp and package database operations.

use log::info;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Camp, Package};

const CAMP_COLUMNS: &str =
    "id, name, district, state, start_date, end_date, completed, created_at";
const PACKAGE_COLUMNS: &str = "id, camp_id, name, completed, created_at";

fn camp_from_row(row: &Row<'_>) -> rusqlite::Result<Camp> {
    Ok(Camp {
        id: row.get(0)?,
        name: row.get(1)?,
        district: row.get(2)?,
        state: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        completed: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        camp_id: row.get(1)?,
        name: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a new camp. A camp starts incomplete whatever `camp.completed` says.
    pub fn insert_camp(&self, camp: &Camp) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO camps (
                id, name, district, state, start_date, end_date, completed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
            params![
                camp.id,
                camp.name,
                camp.district,
                camp.state,
                camp.start_date,
                camp.end_date,
                camp.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a camp by ID.
    pub fn get_camp(&self, id: &str) -> DbResult<Option<Camp>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM camps WHERE id = ?", CAMP_COLUMNS),
                [id],
                camp_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all camps.
    pub fn list_camps(&self) -> DbResult<Vec<Camp>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM camps ORDER BY name", CAMP_COLUMNS))?;
        let rows = stmt.query_map([], camp_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new, incomplete package and recompute its camp's flag.
    ///
    /// Runs inside the caller's transaction when one is open, otherwise in
    /// its own IMMEDIATE transaction.
    pub fn insert_package(&self, package: &Package) -> DbResult<()> {
        let tx = if self.conn.is_autocommit() {
            Some(self.immediate_transaction()?)
        } else {
            None
        };

        self.conn.execute(
            r#"
            INSERT INTO packages (id, camp_id, name, completed, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
            params![package.id, package.camp_id, package.name, package.created_at],
        )?;

        let (total, completed) = self.camp_package_counts(&package.camp_id)?;
        if self.set_camp_completed(&package.camp_id, total > 0 && completed == total)? {
            info!("Camp {} reopened by package {}", package.camp_id, package.name);
        }

        if let Some(tx) = tx {
            tx.commit()?;
        }
        Ok(())
    }

    /// Get a package by ID.
    pub fn get_package(&self, id: &str) -> DbResult<Option<Package>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM packages WHERE id = ?", PACKAGE_COLUMNS),
                [id],
                package_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the packages offered at a camp.
    pub fn list_packages_for_camp(&self, camp_id: &str) -> DbResult<Vec<Package>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM packages WHERE camp_id = ? ORDER BY name",
            PACKAGE_COLUMNS
        ))?;
        let rows = stmt.query_map([camp_id], package_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Attach a service to a package. Idempotent.
    pub fn add_package_service(&self, package_id: &str, service_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO package_services (package_id, service_id) VALUES (?, ?)",
            [package_id, service_id],
        )?;
        Ok(())
    }

    /// Make a technician eligible to work a package. Idempotent.
    pub fn add_package_technician(&self, package_id: &str, technician_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO package_technicians (package_id, technician_id) VALUES (?, ?)",
            [package_id, technician_id],
        )?;
        Ok(())
    }

    /// Write the derived package flag. Returns true if the stored value changed.
    pub(crate) fn set_package_completed(&self, package_id: &str, completed: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE packages SET completed = ?2 WHERE id = ?1 AND completed <> ?2",
            params![package_id, completed],
        )?;
        Ok(rows_affected > 0)
    }

    /// Write the derived camp flag. Returns true if the stored value changed.
    pub(crate) fn set_camp_completed(&self, camp_id: &str, completed: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE camps SET completed = ?2 WHERE id = ?1 AND completed <> ?2",
            params![camp_id, completed],
        )?;
        Ok(rows_affected > 0)
    }

    /// (total, completed) package counts for a camp.
    pub fn camp_package_counts(&self, camp_id: &str) -> DbResult<(u32, u32)> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM packages WHERE camp_id = ?",
                [camp_id],
                |row| Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u32)),
            )
            .map_err(Into::into)
    }
}
