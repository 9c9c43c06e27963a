//! Recomputation of the derived package and camp completion flags.
//!
//! Callers hold the write transaction; nothing here opens one.

use log::info;

use crate::config::PackageCompletionScope;
use crate::db::{Database, DbResult};

/// Flags after a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeOutcome {
    pub package_completed: bool,
    pub camp_completed: bool,
}

fn all_done((total, completed): (u32, u32)) -> bool {
    total > 0 && completed == total
}

/// Whether a package's status rows are all complete under `scope`.
pub(crate) fn package_is_complete(
    db: &Database,
    package_id: &str,
    scope: PackageCompletionScope,
    acting_patient_id: Option<&str>,
) -> DbResult<bool> {
    let counts = match (scope, acting_patient_id) {
        (PackageCompletionScope::ActingPatient, Some(patient_id)) => {
            db.patient_status_counts(patient_id)?
        }
        _ => db.package_status_counts(package_id)?,
    };
    Ok(all_done(counts))
}

/// Whether a camp has packages and every one is complete.
pub(crate) fn camp_is_complete(db: &Database, camp_id: &str) -> DbResult<bool> {
    db.camp_package_counts(camp_id).map(all_done)
}

/// Recompute a package's flag, then its camp's flag if the package flag changed.
///
/// Both flags may move in either direction: intake of a pending row into a
/// completed package clears them.
pub(crate) fn recompute_package_and_camp(
    db: &Database,
    camp_id: &str,
    package_id: &str,
    scope: PackageCompletionScope,
    acting_patient_id: Option<&str>,
) -> DbResult<CascadeOutcome> {
    let package_completed = package_is_complete(db, package_id, scope, acting_patient_id)?;
    let package_changed = db.set_package_completed(package_id, package_completed)?;

    let camp_completed = if package_changed {
        let complete = camp_is_complete(db, camp_id)?;
        if db.set_camp_completed(camp_id, complete)? {
            info!("Camp {} completion set to {}", camp_id, complete);
        }
        complete
    } else {
        current_camp_flag(db, camp_id)?
    };

    if package_changed {
        info!("Package {} completion set to {}", package_id, package_completed);
    }

    Ok(CascadeOutcome {
        package_completed,
        camp_completed,
    })
}

/// Raise any package or camp flag of `camp_id` whose rows are all complete.
/// Never clears a flag.
pub(crate) fn promote_camp_flags(db: &Database, camp_id: &str) -> DbResult<()> {
    for package in db.list_packages_for_camp(camp_id)? {
        if !package.completed
            && package_is_complete(db, &package.id, PackageCompletionScope::AllPatients, None)?
            && db.set_package_completed(&package.id, true)?
        {
            info!("Package {} found complete", package.id);
        }
    }
    if camp_is_complete(db, camp_id)? && db.set_camp_completed(camp_id, true)? {
        info!("Camp {} found complete", camp_id);
    }
    Ok(())
}

fn current_camp_flag(db: &Database, camp_id: &str) -> DbResult<bool> {
    Ok(db.get_camp(camp_id)?.map(|c| c.completed).unwrap_or(false))
}
