//! Check-in by QR token.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::collaborators::BlobStore;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::identity::IdentityRegistry;
use crate::models::Patient;

/// Result of a check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CheckInOutcome {
    /// This call flipped `checked_in`
    CheckedIn {
        patient: Patient,
        artifact: Option<Vec<u8>>,
    },
    /// The patient was already checked in
    AlreadyCheckedIn {
        patient: Patient,
        artifact: Option<Vec<u8>>,
    },
}

impl CheckInOutcome {
    pub fn patient(&self) -> &Patient {
        match self {
            CheckInOutcome::CheckedIn { patient, .. } => patient,
            CheckInOutcome::AlreadyCheckedIn { patient, .. } => patient,
        }
    }

    pub fn artifact(&self) -> Option<&[u8]> {
        match self {
            CheckInOutcome::CheckedIn { artifact, .. } => artifact.as_deref(),
            CheckInOutcome::AlreadyCheckedIn { artifact, .. } => artifact.as_deref(),
        }
    }
}

/// Handles QR scans at the camp entrance.
pub struct CheckInGateway<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
    blobs: &'a dyn BlobStore,
}

impl<'a> CheckInGateway<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig, blobs: &'a dyn BlobStore) -> Self {
        Self { db, config, blobs }
    }

    /// Check a patient in and return their stored document.
    ///
    /// The flag is persisted before the document is read, so a missing or
    /// corrupt document still leaves the patient checked in. Repeated calls
    /// return the same document and write nothing.
    pub fn check_in(&self, token: &str) -> EngineResult<CheckInOutcome> {
        let patient = self.patient_details(token)?;
        let newly_checked_in = !patient.checked_in && self.db.mark_checked_in(&patient.id)?;
        let patient = Patient {
            checked_in: true,
            ..patient
        };

        if newly_checked_in {
            info!("Patient {} checked in", patient.token);
        } else {
            info!("Patient {} already checked in", patient.token);
        }

        let artifact = self.load_document(&patient)?;
        Ok(if newly_checked_in {
            CheckInOutcome::CheckedIn { patient, artifact }
        } else {
            CheckInOutcome::AlreadyCheckedIn { patient, artifact }
        })
    }

    /// Look a patient up by token.
    pub fn patient_details(&self, token: &str) -> EngineResult<Patient> {
        IdentityRegistry::new(self.db, self.config).resolve_patient(token)
    }

    /// Read the page document, falling back to the slip, and verify it.
    fn load_document(&self, patient: &Patient) -> EngineResult<Option<Vec<u8>>> {
        let reference = match patient.document_ref.as_ref().or(patient.slip_ref.as_ref()) {
            Some(reference) => reference,
            None => {
                info!("Artifact not found for patient {}", patient.token);
                return Ok(None);
            }
        };

        let bytes = self.blobs.open(reference.clone())?;
        match self.db.get_artifact(reference)? {
            Some(record) if !record.matches(&bytes) => Err(EngineError::ArtifactCorrupt(format!(
                "{} does not match its recorded checksum",
                reference
            ))),
            Some(_) => Ok(Some(bytes)),
            None => {
                warn!("No checksum recorded for {}", reference);
                Ok(Some(bytes))
            }
        }
    }
}
