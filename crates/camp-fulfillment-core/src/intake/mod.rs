//! Bulk patient intake from a parsed sheet.
//!
//! Pipeline per row: select services → insert patient and pending statuses
//! (one transaction) → encode QR → render and store documents.
//!
//! Rows are independent. A row whose documents fail keeps its patient and
//! statuses; only a missing mandatory column (or a rejected unknown service
//! column) fails the batch before anything is written.

mod rules;

pub use rules::*;

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::collaborators::{Collaborators, DocumentKind, RenderRequest};
use crate::config::{EngineConfig, UnknownEntityPolicy};
use crate::db::{closest_service_name, Database};
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::identity::IdentityRegistry;
use crate::models::{ArtifactKind, ArtifactRecord, Camp, IntakeBatch, Package, Patient, Service};
use crate::tracker::cascade;

/// An uploaded sheet, already parsed into rows keyed by header.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeSheet {
    /// Headers in sheet order
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl IntakeSheet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row given as (header, value) pairs.
    pub fn push_row<K: Into<String>, V: Into<String>>(&mut self, cells: impl IntoIterator<Item = (K, V)>) {
        self.rows
            .push(cells.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
    }
}

/// What happened to one row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RowStatus {
    Created,
    /// Patient and statuses stored, but QR or document generation failed
    DocumentFailed(String),
    /// No patient created
    Rejected(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowOutcome {
    /// Zero-based row position in the sheet
    pub row_index: usize,
    pub patient: Option<Patient>,
    /// Services flagged for the patient, in header order
    pub selected_services: Vec<String>,
    /// Selected names with no catalog match
    pub skipped_services: Vec<String>,
    pub status: RowStatus,
}

/// Result of a batch intake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeReport {
    pub batch: IntakeBatch,
    pub rows: Vec<RowOutcome>,
}

impl IntakeReport {
    /// Some rows did not finish cleanly.
    pub fn is_partial(&self) -> bool {
        self.rows.iter().any(|r| r.status != RowStatus::Created)
    }

    /// Patients created by the batch, in row order.
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.rows.iter().filter_map(|r| r.patient.as_ref())
    }

    pub fn created_count(&self) -> usize {
        self.patients().count()
    }
}

/// Column → catalog service, resolved once per batch.
type ServiceColumns = HashMap<String, Option<Service>>;

/// Turns uploaded sheets into patients, statuses and documents.
pub struct IntakePipeline<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
    collaborators: &'a Collaborators,
}

impl<'a> IntakePipeline<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig, collaborators: &'a Collaborators) -> Self {
        Self {
            db,
            config,
            collaborators,
        }
    }

    /// Ingest a sheet with the configured unknown-entity policy.
    pub fn ingest_batch(
        &self,
        camp_id: &str,
        package_id: Option<&str>,
        sheet: &IntakeSheet,
    ) -> EngineResult<IntakeReport> {
        self.ingest_batch_with_policy(camp_id, package_id, sheet, self.config.unknown_entity_policy)
    }

    pub fn ingest_batch_with_policy(
        &self,
        camp_id: &str,
        package_id: Option<&str>,
        sheet: &IntakeSheet,
        policy: UnknownEntityPolicy,
    ) -> EngineResult<IntakeReport> {
        let rules = &self.config.columns;

        let camp = self
            .db
            .get_camp(camp_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Camp, camp_id))?;
        let package = match package_id {
            Some(id) => match self.db.get_package(id)? {
                Some(package) if package.camp_id == camp.id => Some(package),
                _ => return Err(EngineError::not_found(EntityKind::Package, id)),
            },
            None => None,
        };

        let missing = rules.missing_mandatory(&sheet.columns);
        if !missing.is_empty() {
            return Err(EngineError::Validation(format!(
                "Missing columns in sheet: {}",
                missing.join(", ")
            )));
        }

        let service_columns = self.resolve_service_columns(sheet)?;
        let unknown: Vec<&str> = service_columns
            .iter()
            .filter(|(_, service)| service.is_none())
            .map(|(column, _)| column.as_str())
            .collect();
        if policy == UnknownEntityPolicy::Reject && !unknown.is_empty() {
            let mut unknown = unknown;
            unknown.sort_unstable();
            return Err(EngineError::Validation(format!(
                "Unknown service columns: {}",
                unknown.join(", ")
            )));
        }

        let batch = IntakeBatch::new(camp.id.clone(), package.as_ref().map(|p| p.id.clone()));
        self.db.insert_batch(&batch)?;

        let mut outcomes = Vec::with_capacity(sheet.rows.len());
        for (row_index, row) in sheet.rows.iter().enumerate() {
            outcomes.push(self.ingest_row(
                row_index,
                row,
                sheet,
                &camp,
                package.as_ref(),
                &batch,
                &service_columns,
            )?);
        }

        let report = IntakeReport {
            batch,
            rows: outcomes,
        };
        info!(
            "Intake batch {} for camp {}: {} of {} rows created{}",
            report.batch.public_id,
            camp.name,
            report.created_count(),
            sheet.rows.len(),
            if report.is_partial() { " (partial)" } else { "" }
        );
        Ok(report)
    }

    fn resolve_service_columns(&self, sheet: &IntakeSheet) -> EngineResult<ServiceColumns> {
        let mut resolved = ServiceColumns::new();
        for column in self.config.columns.candidate_service_columns(&sheet.columns) {
            let name = column.trim().to_string();
            if resolved.contains_key(&name) {
                continue;
            }
            let service = self.db.find_service_by_name(&name)?;
            resolved.insert(name, service);
        }

        if resolved.values().any(Option::is_none) {
            let catalog = self.db.list_services()?;
            for (name, _) in resolved.iter().filter(|(_, s)| s.is_none()) {
                match closest_service_name(name, &catalog) {
                    Some(hint) => warn!("Unknown service column {:?} (did you mean {:?}?)", name, hint),
                    None => warn!("Unknown service column {:?}", name),
                }
            }
        }
        Ok(resolved)
    }

    #[allow(clippy::too_many_arguments)]
    fn ingest_row(
        &self,
        row_index: usize,
        row: &HashMap<String, String>,
        sheet: &IntakeSheet,
        camp: &Camp,
        package: Option<&Package>,
        batch: &IntakeBatch,
        service_columns: &ServiceColumns,
    ) -> EngineResult<RowOutcome> {
        let rules = &self.config.columns;
        let selected = rules.selected_services(&sheet.columns, row);

        let age = match parse_age(rules.cell(row, &rules.age_column).unwrap_or("")) {
            Ok(age) => age,
            Err(reason) => {
                warn!("Row {} rejected: {}", row_index, reason);
                return Ok(RowOutcome {
                    row_index,
                    patient: None,
                    selected_services: selected,
                    skipped_services: Vec::new(),
                    status: RowStatus::Rejected(reason),
                });
            }
        };

        let text = |column: &str| rules.cell(row, column).unwrap_or("").trim().to_string();
        let mut patient = Patient::new(batch, text(&rules.name_column));
        patient.source_row_id = Some(text(&rules.row_id_column)).filter(|id| !id.is_empty());
        patient.age = age;
        patient.gender = text(&rules.gender_column);
        patient.contact = text(&rules.phone_column);
        patient.set_service_names(&selected);

        let skipped = self.insert_patient_with_statuses(&mut patient, package, &selected, service_columns)?;

        let status = match self.produce_documents(&mut patient, camp, package, &selected) {
            Ok(()) => RowStatus::Created,
            Err(e) => {
                warn!("Row {} documents failed for {}: {}", row_index, patient.token, e);
                RowStatus::DocumentFailed(e.to_string())
            }
        };

        Ok(RowOutcome {
            row_index,
            patient: Some(patient),
            selected_services: selected,
            skipped_services: skipped,
            status,
        })
    }

    /// Insert the patient and one pending status per known selected service.
    /// Returns the selected names that were skipped.
    fn insert_patient_with_statuses(
        &self,
        patient: &mut Patient,
        package: Option<&Package>,
        selected: &[String],
        service_columns: &ServiceColumns,
    ) -> EngineResult<Vec<String>> {
        let tx = self.db.immediate_transaction()?;

        IdentityRegistry::new(self.db, self.config).insert_patient_with_fresh_token(patient)?;

        let mut skipped = Vec::new();
        for name in selected {
            let service = match service_columns.get(name) {
                Some(Some(service)) => service,
                _ => {
                    skipped.push(name.clone());
                    continue;
                }
            };
            let technician = match package {
                Some(package) => {
                    self.db
                        .find_responsible_technician(&patient.camp_id, &package.id, &service.id)?
                }
                None => None,
            };
            self.db.get_or_create_status(
                &patient.id,
                &service.id,
                technician.as_ref().map(|t| t.id.as_str()),
            )?;
        }

        if let Some(package) = package {
            cascade::recompute_package_and_camp(
                self.db,
                &patient.camp_id,
                &package.id,
                self.config.package_completion_scope,
                Some(&patient.id),
            )?;
        }

        tx.commit()?;
        Ok(skipped)
    }

    /// Encode the QR code, render the configured documents and store them all.
    fn produce_documents(
        &self,
        patient: &mut Patient,
        camp: &Camp,
        package: Option<&Package>,
        selected: &[String],
    ) -> EngineResult<()> {
        let payload = self.config.qr_payload(&patient.token);
        let qr_png = self.collaborators.qr.encode(payload.clone())?;
        let qr_ref = self.store_artifact(patient, ArtifactKind::Qr, qr_png.clone())?;
        patient.qr_ref = Some(qr_ref);

        for kind in &self.config.documents {
            let request = RenderRequest {
                kind: *kind,
                token: patient.token.clone(),
                patient_name: patient.name.clone(),
                age: patient.age,
                gender: patient.gender.clone(),
                contact: patient.contact.clone(),
                camp_name: camp.name.clone(),
                package_name: package.map(|p| p.name.clone()),
                service_names: selected.to_vec(),
                qr_payload: payload.clone(),
                qr_png: qr_png.clone(),
            };
            let bytes = self.collaborators.renderer.render(request)?;
            let reference = self.store_artifact(patient, (*kind).into(), bytes)?;

            match kind {
                DocumentKind::Document => patient.document_ref = Some(reference),
                DocumentKind::Slip => {
                    if let Some(printer) = &self.collaborators.printer {
                        if let Err(e) = printer.dispatch(reference.clone(), patient.name.clone()) {
                            warn!("Printing slip for {} failed: {}", patient.token, e);
                        }
                    }
                    patient.slip_ref = Some(reference);
                }
            }
        }
        Ok(())
    }

    fn store_artifact(&self, patient: &Patient, kind: ArtifactKind, bytes: Vec<u8>) -> EngineResult<String> {
        let name = kind.blob_name(&patient.token);
        let record_bytes = bytes.clone();
        let reference = self.collaborators.blobs.save(name, bytes)?;
        self.db
            .insert_artifact(&ArtifactRecord::for_bytes(reference.clone(), kind, &record_bytes))?;
        self.db.set_patient_artifact(&patient.id, kind, &reference)?;
        Ok(reference)
    }
}
