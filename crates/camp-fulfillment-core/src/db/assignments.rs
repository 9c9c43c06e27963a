//! Service assignment database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{ServiceAssignment, Technician};

const ASSIGNMENT_COLUMNS: &str =
    "id, technician_id, service_id, camp_id, package_id, created_at";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceAssignment> {
    Ok(ServiceAssignment {
        id: row.get(0)?,
        technician_id: row.get(1)?,
        service_id: row.get(2)?,
        camp_id: row.get(3)?,
        package_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    /// Insert one assignment row.
    pub fn insert_assignment(&self, assignment: &ServiceAssignment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO service_assignments (
                id, technician_id, service_id, camp_id, package_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                assignment.id,
                assignment.technician_id,
                assignment.service_id,
                assignment.camp_id,
                assignment.package_id,
                assignment.created_at,
            ],
        )?;
        Ok(())
    }

    /// Delete every assignment of a (camp, package) scope. Returns rows removed.
    pub fn delete_scope_assignments(&self, camp_id: &str, package_id: &str) -> DbResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM service_assignments WHERE camp_id = ? AND package_id = ?",
            [camp_id, package_id],
        )?;
        Ok(removed)
    }

    /// Assignments of one scope, ordered by service then technician.
    pub fn scope_assignments(&self, camp_id: &str, package_id: &str) -> DbResult<Vec<ServiceAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM service_assignments
            WHERE camp_id = ? AND package_id = ?
            ORDER BY service_id, technician_id
            "#,
            ASSIGNMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([camp_id, package_id], assignment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every assignment of a camp across its packages.
    pub fn camp_assignments(&self, camp_id: &str) -> DbResult<Vec<ServiceAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM service_assignments
            WHERE camp_id = ?
            ORDER BY service_id, technician_id
            "#,
            ASSIGNMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([camp_id], assignment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Technician assigned to the exact (camp, package, service) tuple who is
    /// also part of the package's technician set. Lowest name, then id, wins.
    pub fn find_responsible_technician(
        &self,
        camp_id: &str,
        package_id: &str,
        service_id: &str,
    ) -> DbResult<Option<Technician>> {
        self.conn
            .query_row(
                r#"
                SELECT t.id, t.name, t.created_at
                FROM service_assignments a
                JOIN package_technicians pt
                  ON pt.package_id = a.package_id AND pt.technician_id = a.technician_id
                JOIN technicians t ON t.id = a.technician_id
                WHERE a.camp_id = ?1 AND a.package_id = ?2 AND a.service_id = ?3
                ORDER BY t.name, t.id
                LIMIT 1
                "#,
                [camp_id, package_id, service_id],
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Camp, Package, Service};

    struct Fixture {
        db: Database,
        camp: Camp,
        package: Package,
        service: Service,
    }

    fn setup_db() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let camp = Camp::new("Pune".into());
        db.insert_camp(&camp).unwrap();
        let package = Package::new(camp.id.clone(), "Basic".into());
        db.insert_package(&package).unwrap();
        let service = Service::new("ECG".into());
        db.insert_service(&service).unwrap();
        Fixture {
            db,
            camp,
            package,
            service,
        }
    }

    fn add_technician(f: &Fixture, name: &str, in_package: bool) -> Technician {
        let technician = Technician::new(name.into());
        f.db.insert_technician(&technician).unwrap();
        if in_package {
            f.db.add_package_technician(&f.package.id, &technician.id).unwrap();
        }
        f.db.insert_assignment(&ServiceAssignment::new(
            technician.id.clone(),
            f.service.id.clone(),
            f.camp.id.clone(),
            f.package.id.clone(),
        ))
        .unwrap();
        technician
    }

    #[test]
    fn test_responsible_technician_ordered_by_name() {
        let f = setup_db();
        add_technician(&f, "Zoya", true);
        let anil = add_technician(&f, "Anil", true);

        let found = f
            .db
            .find_responsible_technician(&f.camp.id, &f.package.id, &f.service.id)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, anil.id);
    }

    #[test]
    fn test_responsible_technician_requires_package_membership() {
        let f = setup_db();
        add_technician(&f, "Anil", false);

        let found = f
            .db
            .find_responsible_technician(&f.camp.id, &f.package.id, &f.service.id)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_duplicate_assignment_rejected() {
        let f = setup_db();
        let technician = add_technician(&f, "Anil", true);

        let err = f
            .db
            .insert_assignment(&ServiceAssignment::new(
                technician.id,
                f.service.id.clone(),
                f.camp.id.clone(),
                f.package.id.clone(),
            ))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_delete_scope() {
        let f = setup_db();
        add_technician(&f, "Anil", true);
        add_technician(&f, "Zoya", true);

        assert_eq!(f.db.scope_assignments(&f.camp.id, &f.package.id).unwrap().len(), 2);
        assert_eq!(f.db.delete_scope_assignments(&f.camp.id, &f.package.id).unwrap(), 2);
        assert!(f.db.camp_assignments(&f.camp.id).unwrap().is_empty());
    }
}
