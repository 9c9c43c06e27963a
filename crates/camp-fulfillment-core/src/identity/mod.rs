//! Patient tokens: generation, insertion and lookup.
//!
//! A token is the 8-character lowercase hex string printed in a patient's QR
//! code. Tokens are unique and never change once assigned.

use log::debug;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::Patient;

/// Length of a patient token.
pub const TOKEN_LEN: usize = 8;

/// A fresh random token. Uniqueness is not checked.
pub fn random_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string()
}

/// Canonical form of a token typed or scanned by a user.
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// True for 8 lowercase hex characters.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Issues and resolves patient tokens.
pub struct IdentityRegistry<'a> {
    db: &'a Database,
    max_attempts: u32,
    token_source: fn() -> String,
}

impl<'a> IdentityRegistry<'a> {
    pub fn new(db: &'a Database, config: &EngineConfig) -> Self {
        Self {
            db,
            max_attempts: config.token_max_attempts.max(1),
            token_source: random_token,
        }
    }

    #[cfg(test)]
    fn with_token_source(mut self, source: fn() -> String) -> Self {
        self.token_source = source;
        self
    }

    /// Generate a token not currently used by any patient.
    ///
    /// Fails with `Conflict` once the attempt budget is spent.
    pub fn generate_unique_patient_token(&self) -> EngineResult<String> {
        for attempt in 1..=self.max_attempts {
            let token = (self.token_source)();
            if !self.db.patient_token_exists(&token)? {
                return Ok(token);
            }
            debug!("Token collision on attempt {}: {}", attempt, token);
        }
        Err(EngineError::Conflict(format!(
            "No unused patient token after {} attempts",
            self.max_attempts
        )))
    }

    /// Assign a fresh token to `patient` and insert it.
    ///
    /// A concurrent writer may take the token between the check and the
    /// insert; the unique constraint rejects it and a new token is tried.
    pub fn insert_patient_with_fresh_token(&self, patient: &mut Patient) -> EngineResult<()> {
        for attempt in 1..=self.max_attempts {
            patient.token = self.generate_unique_patient_token()?;
            match self.db.insert_patient(patient) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unique_violation() => {
                    if !self.db.patient_token_exists(&patient.token)? {
                        return Err(e.into());
                    }
                    debug!(
                        "Token {} taken before insert (attempt {}), retrying",
                        patient.token, attempt
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        patient.token.clear();
        Err(EngineError::Conflict(format!(
            "Could not insert patient {} with a unique token after {} attempts",
            patient.id, self.max_attempts
        )))
    }

    /// Look up a patient by token, ignoring case and surrounding whitespace.
    pub fn resolve_patient(&self, raw_token: &str) -> EngineResult<Patient> {
        let token = normalize_token(raw_token);
        self.db
            .get_patient_by_token(&token)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Patient, token))
    }
}
