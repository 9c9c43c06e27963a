//! Progress report models.

use serde::{Deserialize, Serialize};

use super::Patient;

/// `completed / total * 100` rounded to two decimals; 0 when total is 0.
pub fn progress_percent(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Camp-wide completion statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampProgress {
    pub camp_id: String,
    pub total_services: u32,
    pub completed_services: u32,
    pub pending_services: u32,
    pub progress_percent: f64,
    pub camp_completed: bool,
    pub per_technician: Vec<TechnicianProgress>,
    pub per_service: Vec<ServiceProgress>,
    pub per_patient: Vec<PatientProgress>,
}

/// Status counts grouped by responsible technician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicianProgress {
    /// None groups statuses no technician is responsible for yet
    pub technician_id: Option<String>,
    pub technician_name: Option<String>,
    pub total: u32,
    pub completed: u32,
}

/// Status counts grouped by service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceProgress {
    pub service_id: String,
    pub service_name: String,
    pub total: u32,
    pub completed: u32,
}

/// Status counts for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProgress {
    pub patient_id: String,
    pub token: String,
    pub patient_name: String,
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub progress_percent: f64,
}

impl PatientProgress {
    pub fn new(patient_id: String, token: String, patient_name: String, total: u32, completed: u32) -> Self {
        Self {
            patient_id,
            token,
            patient_name,
            total,
            completed,
            pending: total.saturating_sub(completed),
            progress_percent: progress_percent(completed, total),
        }
    }
}

/// Service totals for a single patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientServiceSummary {
    pub total_services: u32,
    pub completed_services: u32,
    pub pending_services: u32,
}

/// One line of a patient's service sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceLine {
    pub service_id: String,
    pub service_name: String,
    pub completed: bool,
    pub technician_name: Option<String>,
    pub updated_at: String,
}

/// A patient together with every service line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientServices {
    pub patient: Patient,
    pub services: Vec<ServiceLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(1, 2), 50.0);
        assert_eq!(progress_percent(1, 3), 33.33);
        assert_eq!(progress_percent(2, 3), 66.67);
        assert_eq!(progress_percent(3, 3), 100.0);
    }

    #[test]
    fn test_patient_progress_pending() {
        let p = PatientProgress::new("id".into(), "tok".into(), "Asha".into(), 4, 1);
        assert_eq!(p.pending, 3);
        assert_eq!(p.progress_percent, 25.0);
    }
}
