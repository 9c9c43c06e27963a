//! Service catalog database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Service;

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl Database {
    /// Insert a catalog service. Names are unique regardless of case.
    pub fn insert_service(&self, service: &Service) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO services (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![service.id, service.name, service.created_at],
        )?;
        Ok(())
    }

    /// Get a service by ID.
    pub fn get_service(&self, id: &str) -> DbResult<Option<Service>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM services WHERE id = ?",
                [id],
                service_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Case-insensitive exact match on the canonical name.
    pub fn find_service_by_name(&self, name: &str) -> DbResult<Option<Service>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM services WHERE name = ? COLLATE NOCASE",
                [name.trim()],
                service_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the whole catalog.
    pub fn list_services(&self) -> DbResult<Vec<Service>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM services ORDER BY name")?;
        let rows = stmt.query_map([], service_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Closest catalog name to an unmatched one, for log hints.
pub fn closest_service_name<'a>(name: &str, catalog: &'a [Service]) -> Option<&'a str> {
    let needle = name.trim().to_lowercase();
    catalog
        .iter()
        .map(|s| {
            (
                s.name.as_str(),
                strsim::normalized_levenshtein(&needle, &s.name.to_lowercase()),
            )
        })
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let db = setup_db();
        let service = Service::new("Doctor Consultation".into());
        db.insert_service(&service).unwrap();

        let found = db.find_service_by_name("doctor consultation").unwrap().unwrap();
        assert_eq!(found.id, service.id);

        let found = db.find_service_by_name("  DOCTOR CONSULTATION ").unwrap().unwrap();
        assert_eq!(found.id, service.id);

        assert!(db.find_service_by_name("Doctor").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = setup_db();
        db.insert_service(&Service::new("ECG".into())).unwrap();

        let err = db.insert_service(&Service::new("ecg".into())).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_closest_service_name() {
        let catalog = vec![
            Service::new("X-ray".into()),
            Service::new("Audiometry".into()),
            Service::new("Optometry".into()),
        ];

        assert_eq!(closest_service_name("Xray", &catalog), Some("X-ray"));
        assert_eq!(closest_service_name("audiometri", &catalog), Some("Audiometry"));
        assert_eq!(closest_service_name("Lipid Profile", &catalog), None);
    }
}
