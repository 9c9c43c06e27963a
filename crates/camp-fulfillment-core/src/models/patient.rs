//! Patient and intake batch models.

use serde::{Deserialize, Serialize};

/// Separator used in the patient's service display string.
pub const SERVICE_DISPLAY_SEPARATOR: &str = ", ";

/// One intaken patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Internal UUID
    pub id: String,
    /// Public 8-character token embedded in the QR code (lowercase, immutable)
    pub token: String,
    /// Identifier from the uploaded sheet, if the sheet had one
    pub source_row_id: Option<String>,
    pub name: String,
    pub age: u32,
    pub gender: String,
    /// Phone number
    pub contact: String,
    /// Applicable service names, comma-joined (display only)
    pub services: String,
    /// Set once the patient scans in; never reverts
    pub checked_in: bool,
    /// Blob reference of the rendered page document
    pub document_ref: Option<String>,
    /// Blob reference of the compact slip
    pub slip_ref: Option<String>,
    /// Blob reference of the QR image
    pub qr_ref: Option<String>,
    pub camp_id: String,
    /// Owning package; null until resolved
    pub package_id: Option<String>,
    /// Intake batch that created this patient
    pub batch_id: String,
    pub created_at: String,
}

impl Patient {
    /// Create a patient for an intake batch. The token is assigned on insert.
    pub fn new(batch: &IntakeBatch, name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: String::new(),
            source_row_id: None,
            name,
            age: 0,
            gender: String::new(),
            contact: String::new(),
            services: String::new(),
            checked_in: false,
            document_ref: None,
            slip_ref: None,
            qr_ref: None,
            camp_id: batch.camp_id.clone(),
            package_id: batch.package_id.clone(),
            batch_id: batch.id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Set the display string from the selected service names.
    pub fn set_service_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.services = names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(SERVICE_DISPLAY_SEPARATOR);
    }

    /// Split the display string back into service names.
    pub fn service_names(&self) -> Vec<String> {
        self.services
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// One bulk upload of patient rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeBatch {
    pub id: String,
    /// Short public identifier (12 characters)
    pub public_id: String,
    pub camp_id: String,
    pub package_id: Option<String>,
    /// Blob reference of the uploaded sheet
    pub source_ref: Option<String>,
    pub uploaded_at: String,
}

impl IntakeBatch {
    pub fn new(camp_id: String, package_id: Option<String>) -> Self {
        let public_id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            public_id,
            camp_id,
            package_id,
            source_ref: None,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
