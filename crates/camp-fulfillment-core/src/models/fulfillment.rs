//! Assignment, completion and artifact models.

use serde::{Deserialize, Serialize};

/// "This technician is responsible for this service within this camp+package."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceAssignment {
    pub id: String,
    pub technician_id: String,
    pub service_id: String,
    pub camp_id: String,
    pub package_id: String,
    pub created_at: String,
}

impl ServiceAssignment {
    pub fn new(technician_id: String, service_id: String, camp_id: String, package_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            technician_id,
            service_id,
            camp_id,
            package_id,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Completion state of one (patient, service) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionState {
    /// Service not yet performed
    Pending,
    /// Terminal
    Completed,
}

impl From<bool> for CompletionState {
    fn from(completed: bool) -> Self {
        if completed {
            CompletionState::Completed
        } else {
            CompletionState::Pending
        }
    }
}

/// Per-(patient, service) completion record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceStatus {
    pub id: String,
    pub patient_id: String,
    pub service_id: String,
    /// Pre-assigned at intake, overwritten by whoever completes the service
    pub technician_id: Option<String>,
    pub completed: bool,
    pub updated_at: String,
}

impl ServiceStatus {
    /// Create a pending status.
    pub fn new(patient_id: String, service_id: String, technician_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            service_id,
            technician_id,
            completed: false,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn state(&self) -> CompletionState {
        self.completed.into()
    }
}

/// Immutable audit row for a completion event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceLog {
    pub id: String,
    pub status_id: String,
    pub technician_id: String,
    pub completed_at: String,
}

impl ServiceLog {
    pub fn new(status_id: String, technician_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status_id,
            technician_id,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A service log row joined with display names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceLogEntry {
    pub log_id: String,
    pub technician_name: String,
    pub patient_name: String,
    pub patient_token: String,
    pub service_name: String,
    pub completed_at: String,
}

/// Kind of stored artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Page document handed out at check-in
    Document,
    /// Compact slip for thermal printing
    Slip,
    /// QR code image
    Qr,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Document => "document",
            ArtifactKind::Slip => "slip",
            ArtifactKind::Qr => "qr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(ArtifactKind::Document),
            "slip" => Some(ArtifactKind::Slip),
            "qr" => Some(ArtifactKind::Qr),
            _ => None,
        }
    }

    /// Blob name for a patient's artifact of this kind.
    pub fn blob_name(&self, token: &str) -> String {
        match self {
            ArtifactKind::Document => format!("{}_document.pdf", token),
            ArtifactKind::Slip => format!("{}_slip.png", token),
            ArtifactKind::Qr => format!("{}_qr.png", token),
        }
    }
}

/// Integrity record for a stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRecord {
    /// Reference returned by the blob store
    pub reference: String,
    pub kind: ArtifactKind,
    /// SHA-256 of the stored bytes, hex
    pub checksum: String,
    pub byte_len: u64,
    pub created_at: String,
}

impl ArtifactRecord {
    /// Fingerprint freshly stored bytes.
    pub fn for_bytes(reference: String, kind: ArtifactKind, bytes: &[u8]) -> Self {
        Self {
            reference,
            kind,
            checksum: checksum(bytes),
            byte_len: bytes.len() as u64,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Check bytes read back from the blob store.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.byte_len == bytes.len() as u64 && self.checksum == checksum(bytes)
    }
}

/// SHA-256 of data, hex encoded.
pub fn checksum(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_pending() {
        let status = ServiceStatus::new("p".into(), "s".into(), None);
        assert_eq!(status.state(), CompletionState::Pending);
    }

    #[test]
    fn test_artifact_kind_round_trip() {
        for kind in [ArtifactKind::Document, ArtifactKind::Slip, ArtifactKind::Qr] {
            assert_eq!(ArtifactKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ArtifactKind::parse("pdf"), None);
        assert_eq!(ArtifactKind::Document.blob_name("a1b2c3d4"), "a1b2c3d4_document.pdf");
    }

    #[test]
    fn test_artifact_checksum_detects_change() {
        let record = ArtifactRecord::for_bytes("ref".into(), ArtifactKind::Document, b"slip body");
        assert_eq!(record.checksum.len(), 64);
        assert!(record.matches(b"slip body"));
        assert!(!record.matches(b"slip bodY"));
    }
}
