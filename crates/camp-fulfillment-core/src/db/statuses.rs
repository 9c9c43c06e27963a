//! Service status, completion log and progress queries.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{
    PatientProgress, ServiceLine, ServiceLog, ServiceLogEntry, ServiceProgress, ServiceStatus,
    TechnicianProgress,
};

const STATUS_COLUMNS: &str = "id, patient_id, service_id, technician_id, completed, updated_at";

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceStatus> {
    Ok(ServiceStatus {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        service_id: row.get(2)?,
        technician_id: row.get(3)?,
        completed: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn counts_from_row(row: &Row<'_>) -> rusqlite::Result<(u32, u32)> {
    Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u32))
}

impl Database {
    /// Get a status by ID.
    pub fn get_status(&self, id: &str) -> DbResult<Option<ServiceStatus>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM service_statuses WHERE id = ?", STATUS_COLUMNS),
                [id],
                status_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the status of a (patient, service) pair.
    pub fn find_status(&self, patient_id: &str, service_id: &str) -> DbResult<Option<ServiceStatus>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM service_statuses WHERE patient_id = ? AND service_id = ?",
                    STATUS_COLUMNS
                ),
                [patient_id, service_id],
                status_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the status of a pair, creating a pending one if absent.
    ///
    /// Returns the row and whether this call created it. Never fails on the
    /// pair's uniqueness constraint.
    pub fn get_or_create_status(
        &self,
        patient_id: &str,
        service_id: &str,
        technician_id: Option<&str>,
    ) -> DbResult<(ServiceStatus, bool)> {
        let fresh = ServiceStatus::new(
            patient_id.to_string(),
            service_id.to_string(),
            technician_id.map(str::to_string),
        );
        let inserted = self.conn.execute(
            r#"
            INSERT INTO service_statuses (
                id, patient_id, service_id, technician_id, completed, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ON CONFLICT(patient_id, service_id) DO NOTHING
            "#,
            params![
                fresh.id,
                fresh.patient_id,
                fresh.service_id,
                fresh.technician_id,
                fresh.updated_at,
            ],
        )?;

        let status = self.conn.query_row(
            &format!(
                "SELECT {} FROM service_statuses WHERE patient_id = ? AND service_id = ?",
                STATUS_COLUMNS
            ),
            [patient_id, service_id],
            status_from_row,
        )?;
        Ok((status, inserted > 0))
    }

    /// Mark a pending status completed by `technician_id`.
    ///
    /// Returns false (and writes nothing) if it was already completed.
    pub fn complete_status(&self, status_id: &str, technician_id: &str, updated_at: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE service_statuses
            SET completed = 1, technician_id = ?2, updated_at = ?3
            WHERE id = ?1 AND completed = 0
            "#,
            [status_id, technician_id, updated_at],
        )?;
        Ok(rows_affected > 0)
    }

    /// All status rows of a patient.
    pub fn list_statuses_for_patient(&self, patient_id: &str) -> DbResult<Vec<ServiceStatus>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM service_statuses WHERE patient_id = ? ORDER BY rowid",
            STATUS_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id], status_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Append a completion log row.
    pub fn insert_service_log(&self, log: &ServiceLog) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO service_logs (id, status_id, technician_id, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![log.id, log.status_id, log.technician_id, log.completed_at],
        )?;
        Ok(())
    }

    pub fn count_logs_for_status(&self, status_id: &str) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM service_logs WHERE status_id = ?",
            [status_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Most recent completions first, with display names.
    pub fn recent_service_logs(&self, limit: u32) -> DbResult<Vec<ServiceLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT l.id, t.name, p.name, p.token, sv.name, l.completed_at
            FROM service_logs l
            JOIN service_statuses s ON s.id = l.status_id
            JOIN patients p ON p.id = s.patient_id
            JOIN services sv ON sv.id = s.service_id
            JOIN technicians t ON t.id = l.technician_id
            ORDER BY l.completed_at DESC, l.rowid DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(ServiceLogEntry {
                log_id: row.get(0)?,
                technician_name: row.get(1)?,
                patient_name: row.get(2)?,
                patient_token: row.get(3)?,
                service_name: row.get(4)?,
                completed_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// (total, completed) status rows over every patient attributed to a package.
    pub fn package_status_counts(&self, package_id: &str) -> DbResult<(u32, u32)> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(s.id), COALESCE(SUM(s.completed), 0)
                FROM service_statuses s
                JOIN patients p ON p.id = s.patient_id
                WHERE p.package_id = ?
                "#,
                [package_id],
                counts_from_row,
            )
            .map_err(Into::into)
    }

    /// (total, completed) status rows of one patient.
    pub fn patient_status_counts(&self, patient_id: &str) -> DbResult<(u32, u32)> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM service_statuses WHERE patient_id = ?",
                [patient_id],
                counts_from_row,
            )
            .map_err(Into::into)
    }

    /// (total, completed) status rows over every patient of a camp.
    pub fn camp_status_counts(&self, camp_id: &str) -> DbResult<(u32, u32)> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(s.id), COALESCE(SUM(s.completed), 0)
                FROM service_statuses s
                JOIN patients p ON p.id = s.patient_id
                WHERE p.camp_id = ?
                "#,
                [camp_id],
                counts_from_row,
            )
            .map_err(Into::into)
    }

    /// Camp status counts grouped by responsible technician, unassigned last.
    pub fn technician_progress(&self, camp_id: &str) -> DbResult<Vec<TechnicianProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.technician_id, t.name, COUNT(s.id), COALESCE(SUM(s.completed), 0)
            FROM service_statuses s
            JOIN patients p ON p.id = s.patient_id
            LEFT JOIN technicians t ON t.id = s.technician_id
            WHERE p.camp_id = ?
            GROUP BY s.technician_id
            ORDER BY s.technician_id IS NULL, t.name, s.technician_id
            "#,
        )?;
        let rows = stmt.query_map([camp_id], |row| {
            Ok(TechnicianProgress {
                technician_id: row.get(0)?,
                technician_name: row.get(1)?,
                total: row.get::<_, i64>(2)? as u32,
                completed: row.get::<_, i64>(3)? as u32,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Camp status counts grouped by service.
    pub fn service_progress(&self, camp_id: &str) -> DbResult<Vec<ServiceProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sv.id, sv.name, COUNT(s.id), COALESCE(SUM(s.completed), 0)
            FROM service_statuses s
            JOIN patients p ON p.id = s.patient_id
            JOIN services sv ON sv.id = s.service_id
            WHERE p.camp_id = ?
            GROUP BY sv.id
            ORDER BY sv.name
            "#,
        )?;
        let rows = stmt.query_map([camp_id], |row| {
            Ok(ServiceProgress {
                service_id: row.get(0)?,
                service_name: row.get(1)?,
                total: row.get::<_, i64>(2)? as u32,
                completed: row.get::<_, i64>(3)? as u32,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Camp status counts grouped by patient. Patients without rows are listed with zero.
    pub fn patient_progress(&self, camp_id: &str) -> DbResult<Vec<PatientProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.token, p.name, COUNT(s.id), COALESCE(SUM(s.completed), 0)
            FROM patients p
            LEFT JOIN service_statuses s ON s.patient_id = p.id
            WHERE p.camp_id = ?
            GROUP BY p.id
            ORDER BY p.name, p.token
            "#,
        )?;
        let rows = stmt.query_map([camp_id], |row| {
            Ok(PatientProgress::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get::<_, i64>(3)? as u32,
                row.get::<_, i64>(4)? as u32,
            ))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-service lines of a patient's sheet.
    pub fn patient_service_lines(&self, patient_id: &str) -> DbResult<Vec<ServiceLine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sv.id, sv.name, s.completed, t.name, s.updated_at
            FROM service_statuses s
            JOIN services sv ON sv.id = s.service_id
            LEFT JOIN technicians t ON t.id = s.technician_id
            WHERE s.patient_id = ?
            ORDER BY s.rowid
            "#,
        )?;
        let rows = stmt.query_map([patient_id], |row| {
            Ok(ServiceLine {
                service_id: row.get(0)?,
                service_name: row.get(1)?,
                completed: row.get(2)?,
                technician_name: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
