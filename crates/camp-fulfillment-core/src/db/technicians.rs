//! Technician database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Technician;

impl Database {
    /// Insert a new technician.
    pub fn insert_technician(&self, technician: &Technician) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO technicians (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![technician.id, technician.name, technician.created_at],
        )?;
        Ok(())
    }

    /// Get a technician by ID.
    pub fn get_technician(&self, id: &str) -> DbResult<Option<Technician>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM technicians WHERE id = ?",
                [id],
                |row| {
                    Ok(Technician {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all technicians.
    pub fn list_technicians(&self) -> DbResult<Vec<Technician>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM technicians ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Technician {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Record that a technician can perform a service. Idempotent.
    pub fn add_technician_service(&self, technician_id: &str, service_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO technician_services (technician_id, service_id) VALUES (?, ?)",
            [technician_id, service_id],
        )?;
        Ok(())
    }

    /// Service IDs a technician can perform.
    pub fn technician_service_ids(&self, technician_id: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT service_id FROM technician_services WHERE technician_id = ? ORDER BY service_id",
        )?;
        let rows = stmt.query_map([technician_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Record that a technician works at a camp. Idempotent.
    pub fn add_technician_camp(&self, technician_id: &str, camp_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO technician_camps (technician_id, camp_id) VALUES (?, ?)",
            [technician_id, camp_id],
        )?;
        Ok(())
    }

    /// Camp IDs a technician works at.
    pub fn technician_camp_ids(&self, technician_id: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT camp_id FROM technician_camps WHERE technician_id = ? ORDER BY camp_id",
        )?;
        let rows = stmt.query_map([technician_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Camp, Service};

    #[test]
    fn test_technician_links() {
        let db = Database::open_in_memory().unwrap();

        let technician = Technician::new("Ravi".into());
        db.insert_technician(&technician).unwrap();
        let ecg = Service::new("ECG".into());
        db.insert_service(&ecg).unwrap();
        let camp = Camp::new("Nashik".into());
        db.insert_camp(&camp).unwrap();

        db.add_technician_service(&technician.id, &ecg.id).unwrap();
        db.add_technician_service(&technician.id, &ecg.id).unwrap();
        db.add_technician_camp(&technician.id, &camp.id).unwrap();

        assert_eq!(db.technician_service_ids(&technician.id).unwrap(), vec![ecg.id]);
        assert_eq!(db.technician_camp_ids(&technician.id).unwrap(), vec![camp.id]);
        assert_eq!(
            db.get_technician(&technician.id).unwrap().unwrap().name,
            "Ravi"
        );
    }
}
