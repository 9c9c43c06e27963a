//! Patient and intake batch database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ArtifactKind, IntakeBatch, Patient, Service};

const PATIENT_COLUMNS: &str = r#"
    p.id, p.token, p.source_row_id, p.name, p.age, p.gender, p.contact, p.services,
    p.checked_in, p.document_ref, p.slip_ref, p.qr_ref, p.camp_id, p.package_id,
    p.batch_id, p.created_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        token: row.get(1)?,
        source_row_id: row.get(2)?,
        name: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        contact: row.get(6)?,
        services: row.get(7)?,
        checked_in: row.get(8)?,
        document_ref: row.get(9)?,
        slip_ref: row.get(10)?,
        qr_ref: row.get(11)?,
        camp_id: row.get(12)?,
        package_id: row.get(13)?,
        batch_id: row.get(14)?,
        created_at: row.get(15)?,
    })
}

impl Database {
    /// Insert a new intake batch.
    pub fn insert_batch(&self, batch: &IntakeBatch) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO intake_batches (id, public_id, camp_id, package_id, source_ref, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                batch.id,
                batch.public_id,
                batch.camp_id,
                batch.package_id,
                batch.source_ref,
                batch.uploaded_at,
            ],
        )?;
        Ok(())
    }

    /// Insert a new patient. Fails with a unique violation if the token is taken.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        if patient.token.is_empty() {
            return Err(DbError::Constraint("Patient token must be assigned".into()));
        }
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, token, source_row_id, name, age, gender, contact, services,
                checked_in, document_ref, slip_ref, qr_ref, camp_id, package_id,
                batch_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                patient.id,
                patient.token,
                patient.source_row_id,
                patient.name,
                patient.age,
                patient.gender,
                patient.contact,
                patient.services,
                patient.checked_in,
                patient.document_ref,
                patient.slip_ref,
                patient.qr_ref,
                patient.camp_id,
                patient.package_id,
                patient.batch_id,
                patient.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by internal ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients p WHERE p.id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by an already-normalized token.
    pub fn get_patient_by_token(&self, token: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients p WHERE p.token = ?", PATIENT_COLUMNS),
                [token],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Check whether a token is already in use.
    pub fn patient_token_exists(&self, token: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE token = ?)",
            [token],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// List the patients of a camp, by name.
    pub fn list_patients_for_camp(&self, camp_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients p WHERE p.camp_id = ? ORDER BY p.name, p.token",
            PATIENT_COLUMNS
        ))?;
        let rows = stmt.query_map([camp_id], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Store an artifact reference on the patient.
    pub fn set_patient_artifact(
        &self,
        patient_id: &str,
        kind: ArtifactKind,
        reference: &str,
    ) -> DbResult<bool> {
        let column = match kind {
            ArtifactKind::Document => "document_ref",
            ArtifactKind::Slip => "slip_ref",
            ArtifactKind::Qr => "qr_ref",
        };
        let rows_affected = self.conn.execute(
            &format!("UPDATE patients SET {} = ?2 WHERE id = ?1", column),
            [patient_id, reference],
        )?;
        Ok(rows_affected > 0)
    }

    /// Flip `checked_in` to true. Returns false if it was already set.
    pub fn mark_checked_in(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET checked_in = 1 WHERE id = ? AND checked_in = 0",
            [patient_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Checked-in patients of a camp with pending services the technician can
    /// perform, oldest intake first, each with those pending services.
    pub fn technician_queue(
        &self,
        technician_id: &str,
        camp_id: &str,
    ) -> DbResult<Vec<(Patient, Vec<Service>)>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, sv.id, sv.name, sv.created_at
            FROM patients p
            JOIN service_statuses s ON s.patient_id = p.id
            JOIN technician_services ts ON ts.service_id = s.service_id
            JOIN services sv ON sv.id = s.service_id
            WHERE ts.technician_id = ?1
              AND p.camp_id = ?2
              AND p.checked_in = 1
              AND s.completed = 0
            ORDER BY p.rowid, sv.name
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([technician_id, camp_id], |row| {
            let patient = patient_from_row(row)?;
            let service = Service {
                id: row.get(16)?,
                name: row.get(17)?,
                created_at: row.get(18)?,
            };
            Ok((patient, service))
        })?;

        let mut queue: Vec<(Patient, Vec<Service>)> = Vec::new();
        for row in rows {
            let (patient, service) = row?;
            match queue.last_mut() {
                Some((last, services)) if last.id == patient.id => services.push(service),
                _ => queue.push((patient, vec![service])),
            }
        }
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Camp;

    fn setup_db() -> (Database, IntakeBatch) {
        let db = Database::open_in_memory().unwrap();
        let camp = Camp::new("Pune".into());
        db.insert_camp(&camp).unwrap();
        let batch = IntakeBatch::new(camp.id, None);
        db.insert_batch(&batch).unwrap();
        (db, batch)
    }

    fn make_patient(batch: &IntakeBatch, name: &str, token: &str) -> Patient {
        let mut patient = Patient::new(batch, name.into());
        patient.token = token.into();
        patient.age = 42;
        patient.gender = "F".into();
        patient.contact = "9876543210".into();
        patient
    }

    #[test]
    fn test_insert_and_get() {
        let (db, batch) = setup_db();
        let patient = make_patient(&batch, "Asha", "a1b2c3d4");
        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved, patient);

        let by_token = db.get_patient_by_token("a1b2c3d4").unwrap().unwrap();
        assert_eq!(by_token.id, patient.id);
        assert!(db.patient_token_exists("a1b2c3d4").unwrap());
        assert!(!db.patient_token_exists("00000000").unwrap());
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let (db, batch) = setup_db();
        db.insert_patient(&make_patient(&batch, "Asha", "a1b2c3d4")).unwrap();

        let err = db
            .insert_patient(&make_patient(&batch, "Ravi", "a1b2c3d4"))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_empty_token_rejected() {
        let (db, batch) = setup_db();
        let patient = Patient::new(&batch, "Asha".into());
        assert!(matches!(
            db.insert_patient(&patient),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_mark_checked_in_once() {
        let (db, batch) = setup_db();
        let patient = make_patient(&batch, "Asha", "a1b2c3d4");
        db.insert_patient(&patient).unwrap();

        assert!(db.mark_checked_in(&patient.id).unwrap());
        assert!(!db.mark_checked_in(&patient.id).unwrap());
        assert!(db.get_patient(&patient.id).unwrap().unwrap().checked_in);
    }

    #[test]
    fn test_set_patient_artifact() {
        let (db, batch) = setup_db();
        let patient = make_patient(&batch, "Asha", "a1b2c3d4");
        db.insert_patient(&patient).unwrap();

        db.set_patient_artifact(&patient.id, ArtifactKind::Slip, "a1b2c3d4_slip.png")
            .unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.slip_ref, Some("a1b2c3d4_slip.png".into()));
        assert_eq!(retrieved.document_ref, None);
    }
}
