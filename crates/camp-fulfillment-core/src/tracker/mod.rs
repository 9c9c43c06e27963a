//! Completion tracking for (patient, service) pairs.
//!
//! A status moves from pending to completed exactly once. Each completion
//! appends one service log row and recomputes the package and camp flags in
//! the same transaction.

pub(crate) mod cascade;

pub use cascade::CascadeOutcome;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::identity::normalize_token;
use crate::models::{Patient, Service, ServiceLog, ServiceLogEntry, ServiceStatus};

/// Result of a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CompletionOutcome {
    /// This call completed the service
    Completed {
        status: ServiceStatus,
        log: ServiceLog,
        package_completed: bool,
        camp_completed: bool,
    },
    /// The service was already completed; nothing was written
    AlreadyCompleted { status: ServiceStatus },
}

impl CompletionOutcome {
    pub fn status(&self) -> &ServiceStatus {
        match self {
            CompletionOutcome::Completed { status, .. } => status,
            CompletionOutcome::AlreadyCompleted { status } => status,
        }
    }
}

/// A checked-in patient waiting on a technician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub patient: Patient,
    /// Pending services this technician can perform
    pub pending_services: Vec<Service>,
}

/// Records service completions.
pub struct CompletionTracker<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
}

impl<'a> CompletionTracker<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// Mark a patient's service done by a technician.
    pub fn mark_service_done(
        &self,
        technician_id: &str,
        patient_token: &str,
        service_id: &str,
    ) -> EngineResult<CompletionOutcome> {
        let tx = self.db.immediate_transaction()?;

        let technician = self
            .db
            .get_technician(technician_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Technician, technician_id))?;
        let token = normalize_token(patient_token);
        let patient = self
            .db
            .get_patient_by_token(&token)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Patient, token.as_str()))?;
        let service = self
            .db
            .get_service(service_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Service, service_id))?;

        let (status, created) =
            self.db
                .get_or_create_status(&patient.id, &service.id, Some(&technician.id))?;

        let completed_at = chrono::Utc::now().to_rfc3339();
        if status.completed || !self.db.complete_status(&status.id, &technician.id, &completed_at)? {
            tx.commit()?;
            info!(
                "Service {} for patient {} already completed",
                service.name, patient.token
            );
            return Ok(CompletionOutcome::AlreadyCompleted { status });
        }

        let log = ServiceLog {
            completed_at,
            ..ServiceLog::new(status.id.clone(), technician.id.clone())
        };
        self.db.insert_service_log(&log)?;

        let cascade = match &patient.package_id {
            Some(package_id) => cascade::recompute_package_and_camp(
                self.db,
                &patient.camp_id,
                package_id,
                self.config.package_completion_scope,
                Some(&patient.id),
            )?,
            None => CascadeOutcome {
                package_completed: false,
                camp_completed: self
                    .db
                    .get_camp(&patient.camp_id)?
                    .map(|c| c.completed)
                    .unwrap_or(false),
            },
        };

        let status = self
            .db
            .get_status(&status.id)?
            .ok_or_else(|| EngineError::Conflict(format!("Status {} vanished", status.id)))?;

        tx.commit()?;

        info!(
            "{} completed {} for patient {}{}",
            technician.name,
            service.name,
            patient.token,
            if created { " (status created)" } else { "" }
        );

        Ok(CompletionOutcome::Completed {
            status,
            log,
            package_completed: cascade.package_completed,
            camp_completed: cascade.camp_completed,
        })
    }

    /// Most recent completions first.
    pub fn service_logs(&self, limit: u32) -> EngineResult<Vec<ServiceLogEntry>> {
        Ok(self.db.recent_service_logs(limit)?)
    }

    /// Checked-in patients of a camp with pending work for this technician.
    pub fn technician_queue(&self, technician_id: &str, camp_id: &str) -> EngineResult<Vec<QueueEntry>> {
        if self.db.get_technician(technician_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Technician, technician_id));
        }
        if self.db.get_camp(camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id));
        }

        Ok(self
            .db
            .technician_queue(technician_id, camp_id)?
            .into_iter()
            .map(|(patient, pending_services)| QueueEntry {
                patient,
                pending_services,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageCompletionScope;
    use crate::models::{Camp, IntakeBatch, Package, Technician};

    struct Fixture {
        db: Database,
        camp: Camp,
        package: Package,
        batch: IntakeBatch,
        ecg: Service,
        xray: Service,
        technician: Technician,
    }

    fn setup_db() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let camp = Camp::new("Pune".into());
        db.insert_camp(&camp).unwrap();
        let package = Package::new(camp.id.clone(), "Basic".into());
        db.insert_package(&package).unwrap();
        let batch = IntakeBatch::new(camp.id.clone(), Some(package.id.clone()));
        db.insert_batch(&batch).unwrap();
        let ecg = Service::new("ECG".into());
        let xray = Service::new("X-ray".into());
        db.insert_service(&ecg).unwrap();
        db.insert_service(&xray).unwrap();
        let technician = Technician::new("Ravi".into());
        db.insert_technician(&technician).unwrap();
        db.add_technician_service(&technician.id, &ecg.id).unwrap();
        Fixture {
            db,
            camp,
            package,
            batch,
            ecg,
            xray,
            technician,
        }
    }

    fn add_patient(f: &Fixture, token: &str, services: &[&Service]) -> Patient {
        let mut patient = Patient::new(&f.batch, format!("Patient {}", token));
        patient.token = token.into();
        f.db.insert_patient(&patient).unwrap();
        for service in services {
            f.db.get_or_create_status(&patient.id, &service.id, None).unwrap();
        }
        patient
    }

    #[test]
    fn test_double_completion_logs_once() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        add_patient(&f, "a1b2c3d4", &[&f.ecg]);

        let first = tracker
            .mark_service_done(&f.technician.id, "a1b2c3d4", &f.ecg.id)
            .unwrap();
        assert!(matches!(first, CompletionOutcome::Completed { .. }));

        let second = tracker
            .mark_service_done(&f.technician.id, " A1B2C3D4 ", &f.ecg.id)
            .unwrap();
        assert!(matches!(second, CompletionOutcome::AlreadyCompleted { .. }));

        assert_eq!(f.db.count_logs_for_status(&first.status().id).unwrap(), 1);
        assert_eq!(second.status().technician_id, Some(f.technician.id.clone()));
    }

    #[test]
    fn test_cascade_to_package_and_camp() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        add_patient(&f, "a1b2c3d4", &[&f.ecg, &f.xray]);

        match tracker
            .mark_service_done(&f.technician.id, "a1b2c3d4", &f.ecg.id)
            .unwrap()
        {
            CompletionOutcome::Completed {
                package_completed,
                camp_completed,
                ..
            } => {
                assert!(!package_completed);
                assert!(!camp_completed);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        match tracker
            .mark_service_done(&f.technician.id, "a1b2c3d4", &f.xray.id)
            .unwrap()
        {
            CompletionOutcome::Completed {
                package_completed,
                camp_completed,
                ..
            } => {
                assert!(package_completed);
                assert!(camp_completed);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(f.db.get_package(&f.package.id).unwrap().unwrap().completed);
        assert!(f.db.get_camp(&f.camp.id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_all_patients_scope_waits_for_everyone() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        add_patient(&f, "aaaaaaaa", &[&f.ecg]);
        add_patient(&f, "bbbbbbbb", &[&f.ecg]);

        tracker
            .mark_service_done(&f.technician.id, "aaaaaaaa", &f.ecg.id)
            .unwrap();
        assert!(!f.db.get_package(&f.package.id).unwrap().unwrap().completed);

        tracker
            .mark_service_done(&f.technician.id, "bbbbbbbb", &f.ecg.id)
            .unwrap();
        assert!(f.db.get_package(&f.package.id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_acting_patient_scope() {
        let f = setup_db();
        let config = EngineConfig {
            package_completion_scope: PackageCompletionScope::ActingPatient,
            ..EngineConfig::default()
        };
        let tracker = CompletionTracker::new(&f.db, &config);
        add_patient(&f, "aaaaaaaa", &[&f.ecg]);
        add_patient(&f, "bbbbbbbb", &[&f.ecg]);

        tracker
            .mark_service_done(&f.technician.id, "aaaaaaaa", &f.ecg.id)
            .unwrap();
        assert!(f.db.get_package(&f.package.id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_missing_status_is_created() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        let patient = add_patient(&f, "a1b2c3d4", &[]);

        tracker
            .mark_service_done(&f.technician.id, "a1b2c3d4", &f.xray.id)
            .unwrap();
        let status = f.db.find_status(&patient.id, &f.xray.id).unwrap().unwrap();
        assert!(status.completed);
    }

    #[test]
    fn test_not_found_names_entity() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        add_patient(&f, "a1b2c3d4", &[&f.ecg]);

        let cases = [
            ("ghost", "a1b2c3d4", f.ecg.id.as_str(), EntityKind::Technician),
            (f.technician.id.as_str(), "ffffffff", f.ecg.id.as_str(), EntityKind::Patient),
            (f.technician.id.as_str(), "a1b2c3d4", "no-such-service", EntityKind::Service),
        ];
        for (technician, token, service, expected) in cases {
            match tracker.mark_service_done(technician, token, service) {
                Err(EngineError::NotFound { entity, .. }) => assert_eq!(entity, expected),
                other => panic!("expected NotFound, got {:?}", other),
            }
        }
        assert!(f.db.recent_service_logs(10).unwrap().is_empty());
    }

    #[test]
    fn test_technician_queue() {
        let f = setup_db();
        let config = EngineConfig::default();
        let tracker = CompletionTracker::new(&f.db, &config);
        let waiting = add_patient(&f, "aaaaaaaa", &[&f.ecg, &f.xray]);
        add_patient(&f, "bbbbbbbb", &[&f.ecg]);
        f.db.mark_checked_in(&waiting.id).unwrap();

        let queue = tracker.technician_queue(&f.technician.id, &f.camp.id).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].patient.id, waiting.id);
        assert_eq!(queue[0].pending_services.len(), 1);
        assert_eq!(queue[0].pending_services[0].id, f.ecg.id);

        tracker
            .mark_service_done(&f.technician.id, "aaaaaaaa", &f.ecg.id)
            .unwrap();
        assert!(tracker
            .technician_queue(&f.technician.id, &f.camp.id)
            .unwrap()
            .is_empty());
        assert_eq!(tracker.service_logs(5).unwrap().len(), 1);
    }
}
