//! Technician-to-service assignment within a camp and package.
//!
//! A scope's assignments are always replaced as a whole: the caller supplies
//! the complete technician → services map and every previous row of the
//! scope is discarded in the same transaction.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::UnknownEntityPolicy;
use crate::db::Database;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{Package, ServiceAssignment, Technician};

/// Why an entry of a replacement map was left out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    UnknownTechnician,
    UnknownService,
}

/// An entry of a replacement map that was not written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedAssignment {
    pub technician_id: String,
    /// None when the whole technician entry was skipped
    pub service_id: Option<String>,
    pub reason: SkipReason,
}

/// Result of a scope replacement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentReport {
    pub camp_id: String,
    pub package_id: String,
    /// Rows of the previous assignment set
    pub removed: usize,
    pub inserted: usize,
    pub skipped: Vec<SkippedAssignment>,
}

/// Maintains and queries service assignments.
pub struct AssignmentResolver<'a> {
    db: &'a Database,
}

impl<'a> AssignmentResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Replace every assignment of (camp, package) with `assignments`.
    ///
    /// Unknown ids are skipped and reported under `Skip`; under `Reject` the
    /// call fails with `Validation` and the previous assignments remain.
    pub fn replace_scope_assignments(
        &self,
        camp_id: &str,
        package_id: &str,
        assignments: &BTreeMap<String, BTreeSet<String>>,
        policy: UnknownEntityPolicy,
    ) -> EngineResult<AssignmentReport> {
        let tx = self.db.immediate_transaction()?;

        self.require_scope(camp_id, package_id)?;

        let mut pairs = Vec::new();
        let mut skipped = Vec::new();
        for (technician_id, service_ids) in assignments {
            if self.db.get_technician(technician_id)?.is_none() {
                skipped.push(SkippedAssignment {
                    technician_id: technician_id.clone(),
                    service_id: None,
                    reason: SkipReason::UnknownTechnician,
                });
                continue;
            }
            for service_id in service_ids {
                if self.db.get_service(service_id)?.is_none() {
                    skipped.push(SkippedAssignment {
                        technician_id: technician_id.clone(),
                        service_id: Some(service_id.clone()),
                        reason: SkipReason::UnknownService,
                    });
                    continue;
                }
                pairs.push((technician_id, service_id));
            }
        }

        if !skipped.is_empty() {
            if policy == UnknownEntityPolicy::Reject {
                return Err(EngineError::Validation(format!(
                    "{} unknown technician/service entries in assignment for package {}",
                    skipped.len(),
                    package_id
                )));
            }
            for entry in &skipped {
                warn!(
                    "Skipping assignment {:?} for technician {} service {:?}",
                    entry.reason, entry.technician_id, entry.service_id
                );
            }
        }

        let removed = self.db.delete_scope_assignments(camp_id, package_id)?;
        for (technician_id, service_id) in &pairs {
            self.db.insert_assignment(&ServiceAssignment::new(
                technician_id.to_string(),
                service_id.to_string(),
                camp_id.to_string(),
                package_id.to_string(),
            ))?;
        }

        tx.commit()?;

        info!(
            "Replaced assignments for camp {} package {}: {} removed, {} inserted, {} skipped",
            camp_id,
            package_id,
            removed,
            pairs.len(),
            skipped.len()
        );

        Ok(AssignmentReport {
            camp_id: camp_id.to_string(),
            package_id: package_id.to_string(),
            removed,
            inserted: pairs.len(),
            skipped,
        })
    }

    /// Technician responsible for a service in (camp, package), if any.
    pub fn find_responsible_technician(
        &self,
        camp_id: &str,
        package_id: &str,
        service_id: &str,
    ) -> EngineResult<Option<Technician>> {
        Ok(self
            .db
            .find_responsible_technician(camp_id, package_id, service_id)?)
    }

    /// Service id → technician ids across every package of a camp.
    pub fn camp_assignments(&self, camp_id: &str) -> EngineResult<BTreeMap<String, Vec<String>>> {
        if self.db.get_camp(camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id));
        }

        let mut by_service: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for assignment in self.db.camp_assignments(camp_id)? {
            let technicians = by_service.entry(assignment.service_id).or_default();
            if !technicians.contains(&assignment.technician_id) {
                technicians.push(assignment.technician_id);
            }
        }
        Ok(by_service)
    }

    /// Current rows of one scope.
    pub fn scope_assignments(&self, camp_id: &str, package_id: &str) -> EngineResult<Vec<ServiceAssignment>> {
        self.require_scope(camp_id, package_id)?;
        Ok(self.db.scope_assignments(camp_id, package_id)?)
    }

    fn require_scope(&self, camp_id: &str, package_id: &str) -> EngineResult<Package> {
        if self.db.get_camp(camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id));
        }
        match self.db.get_package(package_id)? {
            Some(package) if package.camp_id == camp_id => Ok(package),
            _ => Err(EngineError::not_found(EntityKind::Package, package_id)),
        }
    }
}
