//! Several handles working on one database file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Result;

use camp_fulfillment_core::db::Database;
use camp_fulfillment_core::models::{Camp, IntakeBatch, Package, Patient, Service, Technician};
use camp_fulfillment_core::{
    BlobStore, CollaboratorError, Collaborators, CompletionOutcome, CompletionTracker, DocumentRenderer,
    EngineConfig, EngineError, FsBlobStore, IdentityRegistry, IntakePipeline, IntakeSheet, QrEncoder, RenderRequest,
};

struct EchoQr;

impl QrEncoder for EchoQr {
    fn encode(&self, payload: String) -> Result<Vec<u8>, CollaboratorError> {
        Ok(payload.into_bytes())
    }
}

struct NameRenderer;

impl DocumentRenderer for NameRenderer {
    fn render(&self, request: RenderRequest) -> Result<Vec<u8>, CollaboratorError> {
        Ok(request.patient_name.into_bytes())
    }
}

struct Fixture {
    path: PathBuf,
    camp: Camp,
    package: Package,
    service: Service,
    _dir: tempfile::TempDir,
}

fn setup_db() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("camp.db");
    // Schema is created once here so workers only open
    let db = Database::open(&path)?;
    let camp = Camp::new("Nashik".into());
    db.insert_camp(&camp)?;
    let package = Package::new(camp.id.clone(), "Basic".into());
    db.insert_package(&package)?;
    let service = Service::new("ECG".into());
    db.insert_service(&service)?;
    db.add_package_service(&package.id, &service.id)?;
    Ok(Fixture {
        path,
        camp,
        package,
        service,
        _dir: dir,
    })
}

fn collaborators(root: &Path) -> Result<Collaborators> {
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(root)?);
    Ok(Collaborators::new(Arc::new(EchoQr), Arc::new(NameRenderer), blobs))
}

#[test]
fn test_concurrent_intake_tokens_unique() -> Result<()> {
    let fixture = setup_db()?;
    let blob_dir = tempfile::tempdir()?;
    let workers = 4;
    let rows_per_worker = 25;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let path = fixture.path.clone();
            let camp_id = fixture.camp.id.clone();
            let package_id = fixture.package.id.clone();
            let blob_root = blob_dir.path().to_path_buf();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<Vec<String>> {
                let db = Database::open(&path)?;
                let config = EngineConfig::default();
                let collaborators = collaborators(&blob_root)?;

                let mut sheet = IntakeSheet::new(
                    ["patient_name", "age", "gender", "phone", "ECG"]
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                );
                for i in 0..rows_per_worker {
                    sheet.push_row([
                        ("patient_name", format!("P{}-{}", worker, i)),
                        ("age", "40".to_string()),
                        ("gender", "M".to_string()),
                        ("phone", "9800000000".to_string()),
                        ("ECG", "yes".to_string()),
                    ]);
                }

                barrier.wait();
                let report = IntakePipeline::new(&db, &config, &collaborators).ingest_batch(
                    &camp_id,
                    Some(&package_id),
                    &sheet,
                )?;
                Ok(report.patients().map(|p| p.token.clone()).collect())
            })
        })
        .collect();

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.extend(handle.join().unwrap()?);
    }
    assert_eq!(tokens.len(), workers * rows_per_worker);
    let unique: HashSet<_> = tokens.iter().collect();
    assert_eq!(unique.len(), tokens.len());

    let db = Database::open(&fixture.path)?;
    assert_eq!(
        db.list_patients_for_camp(&fixture.camp.id)?.len(),
        workers * rows_per_worker
    );
    Ok(())
}

#[test]
fn test_concurrent_completion_logs_once() -> Result<()> {
    let fixture = setup_db()?;
    let config = EngineConfig::default();
    let db = Database::open(&fixture.path)?;
    let technician = Technician::new("Ravi".into());
    db.insert_technician(&technician)?;
    let batch = IntakeBatch::new(fixture.camp.id.clone(), Some(fixture.package.id.clone()));
    db.insert_batch(&batch)?;
    let mut patient = Patient::new(&batch, "Asha".into());
    IdentityRegistry::new(&db, &config).insert_patient_with_fresh_token(&mut patient)?;
    db.get_or_create_status(&patient.id, &fixture.service.id, None)?;

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let path = fixture.path.clone();
            let technician_id = technician.id.clone();
            let token = patient.token.clone();
            let service_id = fixture.service.id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<CompletionOutcome> {
                let db = Database::open(&path)?;
                let config = EngineConfig::default();
                barrier.wait();
                Ok(CompletionTracker::new(&db, &config).mark_service_done(&technician_id, &token, &service_id)?)
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.join().unwrap()?);
    }
    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, CompletionOutcome::Completed { .. }))
        .count();
    assert_eq!(completed, 1);

    let status = db
        .find_status(&patient.id, &fixture.service.id)?
        .expect("status row exists");
    assert!(status.completed);
    assert_eq!(db.count_logs_for_status(&status.id)?, 1);
    assert!(db.get_package(&fixture.package.id)?.expect("package exists").completed);
    Ok(())
}

#[test]
fn test_locked_store_is_transient() -> Result<()> {
    let fixture = setup_db()?;
    let config = EngineConfig {
        busy_timeout_ms: 50,
        ..EngineConfig::default()
    };
    let db = Database::open_with_config(&fixture.path, &config)?;
    let technician = Technician::new("Ravi".into());
    db.insert_technician(&technician)?;
    let batch = IntakeBatch::new(fixture.camp.id.clone(), Some(fixture.package.id.clone()));
    db.insert_batch(&batch)?;
    let mut patient = Patient::new(&batch, "Asha".into());
    IdentityRegistry::new(&db, &config).insert_patient_with_fresh_token(&mut patient)?;

    let holder = Database::open_with_config(&fixture.path, &config)?;
    let tx = holder.immediate_transaction()?;

    let tracker = CompletionTracker::new(&db, &config);
    let err = tracker
        .mark_service_done(&technician.id, &patient.token, &fixture.service.id)
        .expect_err("write lock is held by another handle");
    assert!(matches!(err, EngineError::TransientStore(_)), "got {:?}", err);
    assert!(err.is_retryable());

    drop(tx);
    let outcome = tracker.mark_service_done(&technician.id, &patient.token, &fixture.service.id)?;
    assert!(matches!(outcome, CompletionOutcome::Completed { .. }));
    Ok(())
}
