//! Camp, package, service and technician models.

use serde::{Deserialize, Serialize};

/// A time-and-location scoped medical camp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Camp {
    /// Unique camp ID
    pub id: String,
    /// Location / display name
    pub name: String,
    pub district: Option<String>,
    pub state: Option<String>,
    /// First camp day (ISO date)
    pub start_date: Option<String>,
    /// Last camp day (ISO date)
    pub end_date: Option<String>,
    /// Derived: every package of the camp is completed
    pub completed: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl Camp {
    /// Create a new camp.
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            district: None,
            state: None,
            start_date: None,
            end_date: None,
            completed: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A bundle of services offered at one camp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    /// Unique package ID
    pub id: String,
    /// Owning camp
    pub camp_id: String,
    /// Package name
    pub name: String,
    /// Derived: every service status of the package's patients is completed
    pub completed: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl Package {
    /// Create a new package under a camp.
    pub fn new(camp_id: String, name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            camp_id,
            name,
            completed: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A canonical catalog entry for a medical procedure or station.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    /// Unique name, compared case-insensitively
    pub name: String,
    pub created_at: String,
}

impl Service {
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// A worker who performs services at camps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Technician {
    pub id: String,
    /// Display name
    pub name: String,
    pub created_at: String,
}

impl Technician {
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_camp_not_completed() {
        let camp = Camp::new("Pune Industrial Estate".into());
        assert!(!camp.completed);
        assert_eq!(camp.id.len(), 36); // UUID format
    }

    #[test]
    fn test_service_name_matching() {
        let service = Service::new("  Doctor Consultation ".into());
        assert_eq!(service.name, "Doctor Consultation");
        assert!(service.matches_name("doctor consultation"));
        assert!(service.matches_name(" DOCTOR CONSULTATION"));
        assert!(!service.matches_name("Dental Consultation"));
    }
}
