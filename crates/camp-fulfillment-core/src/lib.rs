//! Camp Fulfillment Core Library
//!
//! Service fulfillment engine for medical camps: patients are intaken from a
//! spreadsheet, routed through technician stations, and tracked until every
//! service of every package is done.
//!
//! # Architecture
//!
//! ```text
//! Sheet rows ──► Intake Pipeline ──► Patient + token + pending ServiceStatus rows
//!                     │                          │
//!                     │  (responsible technician ◄── Assignment Resolver)
//!                     ▼
//!            QR + documents ──► Blob store
//!
//! QR scan ──► Check-in Gateway ──► checked_in + stored document
//!
//! Technician ──► Completion Tracker ──► ServiceStatus completed + ServiceLog
//!                                            │
//!                                   cascade: Package.completed ──► Camp.completed
//!
//! Dashboard ──► Progress Aggregator (camp / technician / service / patient)
//! ```
//!
//! # Core Principle
//!
//! **Derived flags are never written directly.** Package and camp completion
//! are recomputed inside the same transaction as the write that changes them.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Camp, Patient, ServiceStatus, etc.)
//! - [`identity`]: Patient token generation and lookup
//! - [`assignment`]: Technician ↔ service assignments per camp and package
//! - [`intake`]: Bulk patient intake
//! - [`tracker`]: Service completion and cascade
//! - [`progress`]: Completion statistics
//! - [`checkin`]: QR check-in
//! - [`collaborators`]: QR encoder, document renderer, blob store, printer

pub mod assignment;
pub mod checkin;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod intake;
pub mod models;
pub mod progress;
pub mod tracker;

// Re-export commonly used types
pub use assignment::{AssignmentReport, AssignmentResolver};
pub use checkin::{CheckInGateway, CheckInOutcome};
pub use collaborators::{
    BlobStore, CollaboratorError, Collaborators, DocumentKind, DocumentRenderer, FsBlobStore,
    PrintDispatcher, QrEncoder, RenderRequest,
};
pub use config::{EngineConfig, PackageCompletionScope, UnknownEntityPolicy};
pub use db::Database;
pub use error::{EngineError, EngineResult, EntityKind};
pub use identity::IdentityRegistry;
pub use intake::{ColumnRules, IntakePipeline, IntakeReport, IntakeSheet, RowOutcome, RowStatus};
pub use models::{
    Camp, CampProgress, IntakeBatch, Package, Patient, Service, ServiceAssignment, ServiceLog,
    ServiceStatus, Technician,
};
pub use progress::ProgressAggregator;
pub use tracker::{CompletionOutcome, CompletionTracker};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CampError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store busy, retry: {0}")]
    Transient(String),

    #[error("Collaborator error: {0}")]
    CollaboratorFailed(String),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),
}

impl From<EngineError> for CampError {
    fn from(e: EngineError) -> Self {
        let message = e.to_string();
        match e {
            EngineError::NotFound { .. } => CampError::NotFound(message),
            EngineError::Validation(_) => CampError::InvalidInput(message),
            EngineError::Conflict(_) => CampError::Conflict(message),
            EngineError::TransientStore(_) => CampError::Transient(message),
            EngineError::ArtifactCorrupt(_) => CampError::ArtifactCorrupt(message),
            EngineError::Collaborator(_) => CampError::CollaboratorFailed(message),
            EngineError::Database(_) => CampError::DatabaseError(message),
        }
    }
}

impl From<db::DbError> for CampError {
    fn from(e: db::DbError) -> Self {
        EngineError::from(e).into()
    }
}

impl From<config::ConfigError> for CampError {
    fn from(e: config::ConfigError) -> Self {
        CampError::InvalidInput(e.to_string())
    }
}

impl From<CollaboratorError> for CampError {
    fn from(e: CollaboratorError) -> Self {
        CampError::CollaboratorFailed(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CampError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CampError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

fn parse_config(config_json: Option<String>) -> Result<EngineConfig, CampError> {
    match config_json {
        Some(json) => Ok(EngineConfig::from_json_str(&json)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Open or create an engine database at the given path.
#[uniffi::export]
pub fn open_engine(
    path: String,
    config_json: Option<String>,
    qr: Arc<dyn QrEncoder>,
    renderer: Arc<dyn DocumentRenderer>,
    blobs: Arc<dyn BlobStore>,
    printer: Option<Arc<dyn PrintDispatcher>>,
) -> Result<Arc<CampFulfillmentCore>, CampError> {
    let config = parse_config(config_json)?;
    let db = Database::open_with_config(&path, &config)?;
    Ok(CampFulfillmentCore::new(db, config, qr, renderer, blobs, printer))
}

/// Create an in-memory engine (for testing).
#[uniffi::export]
pub fn open_engine_in_memory(
    config_json: Option<String>,
    qr: Arc<dyn QrEncoder>,
    renderer: Arc<dyn DocumentRenderer>,
    blobs: Arc<dyn BlobStore>,
    printer: Option<Arc<dyn PrintDispatcher>>,
) -> Result<Arc<CampFulfillmentCore>, CampError> {
    let config = parse_config(config_json)?;
    let db = Database::open_in_memory()?;
    Ok(CampFulfillmentCore::new(db, config, qr, renderer, blobs, printer))
}

/// Directory-backed blob store for hosts without their own.
#[uniffi::export]
pub fn open_fs_blob_store(root: String) -> Result<Arc<dyn BlobStore>, CampError> {
    Ok(Arc::new(FsBlobStore::new(root)?))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine wrapper for FFI.
#[derive(uniffi::Object)]
pub struct CampFulfillmentCore {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
    collaborators: Collaborators,
}

impl CampFulfillmentCore {
    fn new(
        db: Database,
        config: EngineConfig,
        qr: Arc<dyn QrEncoder>,
        renderer: Arc<dyn DocumentRenderer>,
        blobs: Arc<dyn BlobStore>,
        printer: Option<Arc<dyn PrintDispatcher>>,
    ) -> Arc<Self> {
        let mut collaborators = Collaborators::new(qr, renderer, blobs);
        if let Some(printer) = printer {
            collaborators = collaborators.with_printer(printer);
        }
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
            collaborators,
        })
    }
}

#[uniffi::export]
impl CampFulfillmentCore {
    // =========================================================================
    // Setup Operations
    // =========================================================================

    /// Create a camp.
    pub fn create_camp(
        &self,
        name: String,
        district: Option<String>,
        state: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<FfiCamp, CampError> {
        let db = self.db.lock()?;
        let mut camp = Camp::new(name);
        camp.district = district;
        camp.state = state;
        camp.start_date = start_date;
        camp.end_date = end_date;
        db.insert_camp(&camp)?;
        Ok(camp.into())
    }

    /// Get a camp by ID.
    pub fn get_camp(&self, camp_id: String) -> Result<Option<FfiCamp>, CampError> {
        let db = self.db.lock()?;
        Ok(db.get_camp(&camp_id)?.map(|c| c.into()))
    }

    /// List all camps by name.
    pub fn list_camps(&self) -> Result<Vec<FfiCamp>, CampError> {
        let db = self.db.lock()?;
        let camps = db.list_camps()?;
        Ok(camps.into_iter().map(|c| c.into()).collect())
    }

    /// Create a package under a camp.
    ///
    /// A completed camp is reopened, since the new package has no completed rows.
    pub fn create_package(&self, camp_id: String, name: String) -> Result<FfiPackage, CampError> {
        let db = self.db.lock()?;
        if db.get_camp(&camp_id)?.is_none() {
            return Err(EngineError::not_found(EntityKind::Camp, camp_id).into());
        }
        let package = Package::new(camp_id, name);
        db.insert_package(&package)?;
        Ok(package.into())
    }

    /// List the packages of a camp.
    pub fn list_packages(&self, camp_id: String) -> Result<Vec<FfiPackage>, CampError> {
        let db = self.db.lock()?;
        let packages = db.list_packages_for_camp(&camp_id)?;
        Ok(packages.into_iter().map(|p| p.into()).collect())
    }

    /// Add a service to the catalog.
    pub fn register_service(&self, name: String) -> Result<FfiService, CampError> {
        let db = self.db.lock()?;
        let service = Service::new(name);
        db.insert_service(&service)?;
        Ok(service.into())
    }

    /// Look a service up by name, ignoring case.
    pub fn find_service_by_name(&self, name: String) -> Result<Option<FfiService>, CampError> {
        let db = self.db.lock()?;
        Ok(db.find_service_by_name(&name)?.map(|s| s.into()))
    }

    /// List the whole catalog.
    pub fn list_services(&self) -> Result<Vec<FfiService>, CampError> {
        let db = self.db.lock()?;
        let services = db.list_services()?;
        Ok(services.into_iter().map(|s| s.into()).collect())
    }

    /// Register a technician with the services and camps they work.
    pub fn register_technician(
        &self,
        name: String,
        service_ids: Vec<String>,
        camp_ids: Vec<String>,
    ) -> Result<FfiTechnician, CampError> {
        let db = self.db.lock()?;
        let tx = db.immediate_transaction()?;
        let technician = Technician::new(name);
        db.insert_technician(&technician)?;
        for service_id in &service_ids {
            db.add_technician_service(&technician.id, service_id)?;
        }
        for camp_id in &camp_ids {
            db.add_technician_camp(&technician.id, camp_id)?;
        }
        tx.commit().map_err(db::DbError::from)?;
        Ok(technician.into())
    }

    /// List all technicians by name.
    pub fn list_technicians(&self) -> Result<Vec<FfiTechnician>, CampError> {
        let db = self.db.lock()?;
        let technicians = db.list_technicians()?;
        Ok(technicians.into_iter().map(|t| t.into()).collect())
    }

    /// Offer a service in a package.
    pub fn add_package_service(&self, package_id: String, service_id: String) -> Result<(), CampError> {
        let db = self.db.lock()?;
        db.add_package_service(&package_id, &service_id)?;
        Ok(())
    }

    /// Make a technician eligible to work a package.
    pub fn add_package_technician(&self, package_id: String, technician_id: String) -> Result<(), CampError> {
        let db = self.db.lock()?;
        db.add_package_technician(&package_id, &technician_id)?;
        Ok(())
    }

    // =========================================================================
    // Intake Operations
    // =========================================================================

    /// Ingest an uploaded sheet.
    pub fn ingest_batch(
        &self,
        camp_id: String,
        package_id: Option<String>,
        columns: Vec<String>,
        rows: Vec<HashMap<String, String>>,
    ) -> Result<FfiIntakeReport, CampError> {
        let db = self.db.lock()?;
        let sheet = IntakeSheet { columns, rows };
        let pipeline = IntakePipeline::new(&db, &self.config, &self.collaborators);
        let report = pipeline.ingest_batch(&camp_id, package_id.as_deref(), &sheet)?;
        Ok(report.into())
    }

    // =========================================================================
    // Assignment Operations
    // =========================================================================

    /// Replace every assignment of a (camp, package) scope.
    pub fn replace_scope_assignments(
        &self,
        camp_id: String,
        package_id: String,
        assignments: HashMap<String, Vec<String>>,
    ) -> Result<FfiAssignmentReport, CampError> {
        let db = self.db.lock()?;
        let assignments: BTreeMap<String, BTreeSet<String>> = assignments
            .into_iter()
            .map(|(technician, services)| (technician, services.into_iter().collect()))
            .collect();
        let report = AssignmentResolver::new(&db).replace_scope_assignments(
            &camp_id,
            &package_id,
            &assignments,
            self.config.unknown_entity_policy,
        )?;
        Ok(report.into())
    }

    /// Technician responsible for a service in a scope.
    pub fn find_responsible_technician(
        &self,
        camp_id: String,
        package_id: String,
        service_id: String,
    ) -> Result<Option<FfiTechnician>, CampError> {
        let db = self.db.lock()?;
        let technician = AssignmentResolver::new(&db)
            .find_responsible_technician(&camp_id, &package_id, &service_id)?;
        Ok(technician.map(|t| t.into()))
    }

    /// Service ID → technician IDs for a camp.
    pub fn camp_assignments(&self, camp_id: String) -> Result<HashMap<String, Vec<String>>, CampError> {
        let db = self.db.lock()?;
        let grouped = AssignmentResolver::new(&db).camp_assignments(&camp_id)?;
        Ok(grouped.into_iter().collect())
    }

    // =========================================================================
    // Completion Operations
    // =========================================================================

    /// Mark a patient's service done.
    pub fn mark_service_done(
        &self,
        technician_id: String,
        patient_token: String,
        service_id: String,
    ) -> Result<FfiCompletionOutcome, CampError> {
        let db = self.db.lock()?;
        let outcome = CompletionTracker::new(&db, &self.config).mark_service_done(
            &technician_id,
            &patient_token,
            &service_id,
        )?;
        Ok(outcome.into())
    }

    /// Most recent completions first.
    pub fn service_logs(&self, limit: u32) -> Result<Vec<FfiServiceLogEntry>, CampError> {
        let db = self.db.lock()?;
        let entries = CompletionTracker::new(&db, &self.config).service_logs(limit)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Checked-in patients waiting on a technician.
    pub fn technician_queue(
        &self,
        technician_id: String,
        camp_id: String,
    ) -> Result<Vec<FfiQueueEntry>, CampError> {
        let db = self.db.lock()?;
        let queue = CompletionTracker::new(&db, &self.config).technician_queue(&technician_id, &camp_id)?;
        Ok(queue.into_iter().map(|q| q.into()).collect())
    }

    // =========================================================================
    // Progress Operations
    // =========================================================================

    /// Completion statistics for a camp.
    pub fn camp_progress(&self, camp_id: String) -> Result<FfiCampProgress, CampError> {
        let db = self.db.lock()?;
        let progress = ProgressAggregator::new(&db, &self.config).camp_progress(&camp_id)?;
        Ok(progress.into())
    }

    /// Service totals for one patient.
    pub fn patient_service_summary(&self, token: String) -> Result<FfiPatientServiceSummary, CampError> {
        let db = self.db.lock()?;
        let summary = ProgressAggregator::new(&db, &self.config).patient_service_summary(&token)?;
        Ok(summary.into())
    }

    /// Every patient of a camp with their service lines.
    pub fn patient_roster(&self, camp_id: String) -> Result<Vec<FfiPatientServices>, CampError> {
        let db = self.db.lock()?;
        let roster = ProgressAggregator::new(&db, &self.config).patient_roster(&camp_id)?;
        Ok(roster.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Check-in Operations
    // =========================================================================

    /// Check a patient in by QR token.
    pub fn check_in(&self, token: String) -> Result<FfiCheckInOutcome, CampError> {
        let db = self.db.lock()?;
        let gateway = CheckInGateway::new(&db, &self.config, self.collaborators.blobs.as_ref());
        Ok(gateway.check_in(&token)?.into())
    }

    /// Look a patient up by QR token.
    pub fn patient_details(&self, token: String) -> Result<FfiPatient, CampError> {
        let db = self.db.lock()?;
        let gateway = CheckInGateway::new(&db, &self.config, self.collaborators.blobs.as_ref());
        Ok(gateway.patient_details(&token)?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe camp.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCamp {
    pub id: String,
    pub name: String,
    pub district: Option<String>,
    pub state: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub completed: bool,
}

impl From<Camp> for FfiCamp {
    fn from(camp: Camp) -> Self {
        Self {
            id: camp.id,
            name: camp.name,
            district: camp.district,
            state: camp.state,
            start_date: camp.start_date,
            end_date: camp.end_date,
            completed: camp.completed,
        }
    }
}

/// FFI-safe package.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPackage {
    pub id: String,
    pub camp_id: String,
    pub name: String,
    pub completed: bool,
}

impl From<Package> for FfiPackage {
    fn from(package: Package) -> Self {
        Self {
            id: package.id,
            camp_id: package.camp_id,
            name: package.name,
            completed: package.completed,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiService {
    pub id: String,
    pub name: String,
}

impl From<Service> for FfiService {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            name: service.name,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTechnician {
    pub id: String,
    pub name: String,
}

impl From<Technician> for FfiTechnician {
    fn from(technician: Technician) -> Self {
        Self {
            id: technician.id,
            name: technician.name,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub token: String,
    pub source_row_id: Option<String>,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
    pub services: String,
    pub checked_in: bool,
    pub document_ref: Option<String>,
    pub slip_ref: Option<String>,
    pub qr_ref: Option<String>,
    pub camp_id: String,
    pub package_id: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            token: patient.token,
            source_row_id: patient.source_row_id,
            name: patient.name,
            age: patient.age,
            gender: patient.gender,
            contact: patient.contact,
            services: patient.services,
            checked_in: patient.checked_in,
            document_ref: patient.document_ref,
            slip_ref: patient.slip_ref,
            qr_ref: patient.qr_ref,
            camp_id: patient.camp_id,
            package_id: patient.package_id,
        }
    }
}

/// FFI-safe row status.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiRowStatus {
    Created,
    DocumentFailed { reason: String },
    Rejected { reason: String },
}

impl From<RowStatus> for FfiRowStatus {
    fn from(status: RowStatus) -> Self {
        match status {
            RowStatus::Created => FfiRowStatus::Created,
            RowStatus::DocumentFailed(reason) => FfiRowStatus::DocumentFailed { reason },
            RowStatus::Rejected(reason) => FfiRowStatus::Rejected { reason },
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRowOutcome {
    pub row_index: u32,
    pub patient: Option<FfiPatient>,
    pub selected_services: Vec<String>,
    pub skipped_services: Vec<String>,
    pub status: FfiRowStatus,
}

impl From<RowOutcome> for FfiRowOutcome {
    fn from(outcome: RowOutcome) -> Self {
        Self {
            row_index: outcome.row_index as u32,
            patient: outcome.patient.map(|p| p.into()),
            selected_services: outcome.selected_services,
            skipped_services: outcome.skipped_services,
            status: outcome.status.into(),
        }
    }
}

/// FFI-safe intake report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntakeReport {
    pub batch_id: String,
    pub batch_public_id: String,
    pub partial: bool,
    pub rows: Vec<FfiRowOutcome>,
}

impl From<IntakeReport> for FfiIntakeReport {
    fn from(report: IntakeReport) -> Self {
        let partial = report.is_partial();
        Self {
            batch_id: report.batch.id,
            batch_public_id: report.batch.public_id,
            partial,
            rows: report.rows.into_iter().map(|r| r.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSkippedAssignment {
    pub technician_id: String,
    pub service_id: Option<String>,
    pub reason: String,
}

/// FFI-safe assignment report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssignmentReport {
    pub camp_id: String,
    pub package_id: String,
    pub removed: u32,
    pub inserted: u32,
    pub skipped: Vec<FfiSkippedAssignment>,
}

impl From<AssignmentReport> for FfiAssignmentReport {
    fn from(report: AssignmentReport) -> Self {
        Self {
            camp_id: report.camp_id,
            package_id: report.package_id,
            removed: report.removed as u32,
            inserted: report.inserted as u32,
            skipped: report
                .skipped
                .into_iter()
                .map(|s| FfiSkippedAssignment {
                    technician_id: s.technician_id,
                    service_id: s.service_id,
                    reason: format!("{:?}", s.reason),
                })
                .collect(),
        }
    }
}

/// FFI-safe service status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceStatus {
    pub id: String,
    pub patient_id: String,
    pub service_id: String,
    pub technician_id: Option<String>,
    pub completed: bool,
    pub updated_at: String,
}

impl From<ServiceStatus> for FfiServiceStatus {
    fn from(status: ServiceStatus) -> Self {
        Self {
            id: status.id,
            patient_id: status.patient_id,
            service_id: status.service_id,
            technician_id: status.technician_id,
            completed: status.completed,
            updated_at: status.updated_at,
        }
    }
}

/// FFI-safe completion result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCompletionOutcome {
    pub already_completed: bool,
    pub status: FfiServiceStatus,
    pub log_id: Option<String>,
    pub package_completed: bool,
    pub camp_completed: bool,
}

impl From<CompletionOutcome> for FfiCompletionOutcome {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Completed {
                status,
                log,
                package_completed,
                camp_completed,
            } => Self {
                already_completed: false,
                status: status.into(),
                log_id: Some(log.id),
                package_completed,
                camp_completed,
            },
            CompletionOutcome::AlreadyCompleted { status } => Self {
                already_completed: true,
                status: status.into(),
                log_id: None,
                package_completed: false,
                camp_completed: false,
            },
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceLogEntry {
    pub log_id: String,
    pub technician_name: String,
    pub patient_name: String,
    pub patient_token: String,
    pub service_name: String,
    pub completed_at: String,
}

impl From<models::ServiceLogEntry> for FfiServiceLogEntry {
    fn from(entry: models::ServiceLogEntry) -> Self {
        Self {
            log_id: entry.log_id,
            technician_name: entry.technician_name,
            patient_name: entry.patient_name,
            patient_token: entry.patient_token,
            service_name: entry.service_name,
            completed_at: entry.completed_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQueueEntry {
    pub patient: FfiPatient,
    pub pending_services: Vec<FfiService>,
}

impl From<tracker::QueueEntry> for FfiQueueEntry {
    fn from(entry: tracker::QueueEntry) -> Self {
        Self {
            patient: entry.patient.into(),
            pending_services: entry.pending_services.into_iter().map(|s| s.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTechnicianProgress {
    pub technician_id: Option<String>,
    pub technician_name: Option<String>,
    pub total: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceProgress {
    pub service_id: String,
    pub service_name: String,
    pub total: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientProgress {
    pub patient_id: String,
    pub token: String,
    pub patient_name: String,
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub progress_percent: f64,
}

/// FFI-safe camp statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCampProgress {
    pub camp_id: String,
    pub total_services: u32,
    pub completed_services: u32,
    pub pending_services: u32,
    pub progress_percent: f64,
    pub camp_completed: bool,
    pub per_technician: Vec<FfiTechnicianProgress>,
    pub per_service: Vec<FfiServiceProgress>,
    pub per_patient: Vec<FfiPatientProgress>,
}

impl From<CampProgress> for FfiCampProgress {
    fn from(progress: CampProgress) -> Self {
        Self {
            camp_id: progress.camp_id,
            total_services: progress.total_services,
            completed_services: progress.completed_services,
            pending_services: progress.pending_services,
            progress_percent: progress.progress_percent,
            camp_completed: progress.camp_completed,
            per_technician: progress
                .per_technician
                .into_iter()
                .map(|t| FfiTechnicianProgress {
                    technician_id: t.technician_id,
                    technician_name: t.technician_name,
                    total: t.total,
                    completed: t.completed,
                })
                .collect(),
            per_service: progress
                .per_service
                .into_iter()
                .map(|s| FfiServiceProgress {
                    service_id: s.service_id,
                    service_name: s.service_name,
                    total: s.total,
                    completed: s.completed,
                })
                .collect(),
            per_patient: progress
                .per_patient
                .into_iter()
                .map(|p| FfiPatientProgress {
                    patient_id: p.patient_id,
                    token: p.token,
                    patient_name: p.patient_name,
                    total: p.total,
                    completed: p.completed,
                    pending: p.pending,
                    progress_percent: p.progress_percent,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientServiceSummary {
    pub total_services: u32,
    pub completed_services: u32,
    pub pending_services: u32,
}

impl From<models::PatientServiceSummary> for FfiPatientServiceSummary {
    fn from(summary: models::PatientServiceSummary) -> Self {
        Self {
            total_services: summary.total_services,
            completed_services: summary.completed_services,
            pending_services: summary.pending_services,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceLine {
    pub service_id: String,
    pub service_name: String,
    pub completed: bool,
    pub technician_name: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientServices {
    pub patient: FfiPatient,
    pub services: Vec<FfiServiceLine>,
}

impl From<models::PatientServices> for FfiPatientServices {
    fn from(entry: models::PatientServices) -> Self {
        Self {
            patient: entry.patient.into(),
            services: entry
                .services
                .into_iter()
                .map(|s| FfiServiceLine {
                    service_id: s.service_id,
                    service_name: s.service_name,
                    completed: s.completed,
                    technician_name: s.technician_name,
                    updated_at: s.updated_at,
                })
                .collect(),
        }
    }
}

/// FFI-safe check-in result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCheckInOutcome {
    pub already_checked_in: bool,
    pub patient: FfiPatient,
    /// Stored document bytes; None when no document was generated
    pub artifact: Option<Vec<u8>>,
}

impl From<CheckInOutcome> for FfiCheckInOutcome {
    fn from(outcome: CheckInOutcome) -> Self {
        match outcome {
            CheckInOutcome::CheckedIn { patient, artifact } => Self {
                already_checked_in: false,
                patient: patient.into(),
                artifact,
            },
            CheckInOutcome::AlreadyCheckedIn { patient, artifact } => Self {
                already_checked_in: true,
                patient: patient.into(),
                artifact,
            },
        }
    }
}
