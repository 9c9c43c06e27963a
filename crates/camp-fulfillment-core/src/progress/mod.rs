//! On-demand completion statistics.

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::identity::IdentityRegistry;
use crate::models::{progress_percent, CampProgress, PatientServiceSummary, PatientServices};
use crate::tracker::cascade;

/// Reads completion statistics.
pub struct ProgressAggregator<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// Statistics over every status row of the camp's patients.
    ///
    /// Also raises package and camp flags whose rows turn out to be complete.
    /// This never clears a flag and never writes a service log row.
    pub fn camp_progress(&self, camp_id: &str) -> EngineResult<CampProgress> {
        let tx = self.db.immediate_transaction()?;

        if self.db.get_camp(camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id));
        }
        cascade::promote_camp_flags(self.db, camp_id)?;

        let (total, completed) = self.db.camp_status_counts(camp_id)?;
        let camp_completed = self
            .db
            .get_camp(camp_id)?
            .map(|c| c.completed)
            .unwrap_or(false);
        let progress = CampProgress {
            camp_id: camp_id.to_string(),
            total_services: total,
            completed_services: completed,
            pending_services: total.saturating_sub(completed),
            progress_percent: progress_percent(completed, total),
            camp_completed,
            per_technician: self.db.technician_progress(camp_id)?,
            per_service: self.db.service_progress(camp_id)?,
            per_patient: self.db.patient_progress(camp_id)?,
        };

        tx.commit()?;
        Ok(progress)
    }

    /// Service totals for the patient holding `token`.
    pub fn patient_service_summary(&self, token: &str) -> EngineResult<PatientServiceSummary> {
        let patient = IdentityRegistry::new(self.db, self.config).resolve_patient(token)?;
        let (total, completed) = self.db.patient_status_counts(&patient.id)?;
        Ok(PatientServiceSummary {
            total_services: total,
            completed_services: completed,
            pending_services: total.saturating_sub(completed),
        })
    }

    /// Every patient of a camp with its service lines.
    pub fn patient_roster(&self, camp_id: &str) -> EngineResult<Vec<PatientServices>> {
        if self.db.get_camp(camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id));
        }

        let mut roster = Vec::new();
        for patient in self.db.list_patients_for_camp(camp_id)? {
            let services = self.db.patient_service_lines(&patient.id)?;
            roster.push(PatientServices { patient, services });
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Camp, IntakeBatch, Package, Patient, Service, Technician};

    fn setup_db() -> (Database, Camp, IntakeBatch) {
        let db = Database::open_in_memory().unwrap();
        let camp = Camp::new("Pune".into());
        db.insert_camp(&camp).unwrap();
        let package = Package::new(camp.id.clone(), "Basic".into());
        db.insert_package(&package).unwrap();
        let batch = IntakeBatch::new(camp.id.clone(), Some(package.id.clone()));
        db.insert_batch(&batch).unwrap();
        (db, camp, batch)
    }

    #[test]
    fn test_empty_camp_progress() {
        let (db, camp, _) = setup_db();
        let config = EngineConfig::default();
        let progress = ProgressAggregator::new(&db, &config).camp_progress(&camp.id).unwrap();

        assert_eq!(progress.total_services, 0);
        assert_eq!(progress.progress_percent, 0.0);
        assert!(!progress.camp_completed);
        assert!(progress.per_patient.is_empty());
    }

    #[test]
    fn test_unknown_camp() {
        let (db, _, _) = setup_db();
        let config = EngineConfig::default();
        let aggregator = ProgressAggregator::new(&db, &config);
        assert!(matches!(
            aggregator.camp_progress("missing"),
            Err(EngineError::NotFound { entity: EntityKind::Camp, .. })
        ));
        assert!(aggregator.patient_roster("missing").is_err());
    }

    #[test]
    fn test_progress_promotes_flags_without_logs() {
        let (db, camp, batch) = setup_db();
        let config = EngineConfig::default();
        let service = Service::new("ECG".into());
        db.insert_service(&service).unwrap();
        let technician = Technician::new("Ravi".into());
        db.insert_technician(&technician).unwrap();

        let mut patient = Patient::new(&batch, "Asha".into());
        patient.token = "a1b2c3d4".into();
        db.insert_patient(&patient).unwrap();
        let (status, _) = db.get_or_create_status(&patient.id, &service.id, None).unwrap();
        // Completed outside the tracker, so no flag was raised yet
        db.complete_status(&status.id, &technician.id, "2025-01-01T00:00:00Z")
            .unwrap();

        let aggregator = ProgressAggregator::new(&db, &config);
        let progress = aggregator.camp_progress(&camp.id).unwrap();
        assert_eq!(progress.progress_percent, 100.0);
        assert!(progress.camp_completed);
        assert!(db.recent_service_logs(10).unwrap().is_empty());

        let again = aggregator.camp_progress(&camp.id).unwrap();
        assert_eq!(again, progress);
    }

    #[test]
    fn test_patient_summary_and_roster() {
        let (db, camp, batch) = setup_db();
        let config = EngineConfig::default();
        let ecg = Service::new("ECG".into());
        let xray = Service::new("X-ray".into());
        db.insert_service(&ecg).unwrap();
        db.insert_service(&xray).unwrap();

        let mut patient = Patient::new(&batch, "Asha".into());
        patient.token = "a1b2c3d4".into();
        db.insert_patient(&patient).unwrap();
        db.get_or_create_status(&patient.id, &ecg.id, None).unwrap();
        db.get_or_create_status(&patient.id, &xray.id, None).unwrap();

        let aggregator = ProgressAggregator::new(&db, &config);
        let summary = aggregator.patient_service_summary("A1B2C3D4").unwrap();
        assert_eq!(summary.total_services, 2);
        assert_eq!(summary.pending_services, 2);

        let roster = aggregator.patient_roster(&camp.id).unwrap();
        assert_eq!(roster.len(), 1);
        let names: Vec<_> = roster[0].services.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["ECG", "X-ray"]);
        assert!(roster[0].services.iter().all(|s| !s.completed && s.technician_name.is_none()));
    }
}
