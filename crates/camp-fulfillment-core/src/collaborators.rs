//! External collaborators: QR encoding, document rendering, blob storage and printing.
//!
//! The traits are exported with `with_foreign` so host apps can supply their
//! own implementations. [`FsBlobStore`] is the bundled directory-backed store.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ArtifactKind;

/// Errors raised by collaborator implementations.
#[derive(Error, Debug, uniffi::Error)]
pub enum CollaboratorError {
    #[error("Render failed: {reason}")]
    Render { reason: String },

    #[error("QR encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Blob storage failed: {reason}")]
    Storage { reason: String },

    #[error("Print dispatch failed: {reason}")]
    Print { reason: String },

    #[error("Unexpected callback error: {reason}")]
    Unexpected { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for CollaboratorError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        CollaboratorError::Unexpected { reason: e.reason }
    }
}

/// Rendered document variants produced at intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Full page document
    Document,
    /// Compact slip for thermal printers
    Slip,
}

impl From<DocumentKind> for ArtifactKind {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Document => ArtifactKind::Document,
            DocumentKind::Slip => ArtifactKind::Slip,
        }
    }
}

/// Everything a renderer needs to lay out a patient document.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct RenderRequest {
    pub kind: DocumentKind,
    pub token: String,
    pub patient_name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
    pub camp_name: String,
    pub package_name: Option<String>,
    pub service_names: Vec<String>,
    pub qr_payload: String,
    /// PNG bytes from the QR encoder
    pub qr_png: Vec<u8>,
}

/// Turns a payload into a QR code image.
#[uniffi::export(with_foreign)]
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: String) -> Result<Vec<u8>, CollaboratorError>;
}

/// Renders a patient document.
#[uniffi::export(with_foreign)]
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, request: RenderRequest) -> Result<Vec<u8>, CollaboratorError>;
}

/// Stores named blobs and hands back opaque references.
#[uniffi::export(with_foreign)]
pub trait BlobStore: Send + Sync {
    fn save(&self, name: String, bytes: Vec<u8>) -> Result<String, CollaboratorError>;
    fn open(&self, reference: String) -> Result<Vec<u8>, CollaboratorError>;
}

/// Sends a stored slip to a printer.
#[uniffi::export(with_foreign)]
pub trait PrintDispatcher: Send + Sync {
    fn dispatch(&self, reference: String, patient_name: String) -> Result<(), CollaboratorError>;
}

/// The collaborator set handed to the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub qr: Arc<dyn QrEncoder>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub blobs: Arc<dyn BlobStore>,
    pub printer: Option<Arc<dyn PrintDispatcher>>,
}

impl Collaborators {
    pub fn new(
        qr: Arc<dyn QrEncoder>,
        renderer: Arc<dyn DocumentRenderer>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            qr,
            renderer,
            blobs,
            printer: None,
        }
    }

    pub fn with_printer(mut self, printer: Arc<dyn PrintDispatcher>) -> Self {
        self.printer = Some(printer);
        self
    }
}

/// Blob store backed by a directory. References are file names under the root.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Use `root`, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, CollaboratorError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| CollaboratorError::Storage {
            reason: format!("{}: {}", root.display(), e),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, CollaboratorError> {
        let relative = Path::new(name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => Err(CollaboratorError::Storage {
                reason: format!("Invalid blob name: {:?}", name),
            }),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn save(&self, name: String, bytes: Vec<u8>) -> Result<String, CollaboratorError> {
        let path = self.resolve(&name)?;
        std::fs::write(&path, bytes).map_err(|e| CollaboratorError::Storage {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(name)
    }

    fn open(&self, reference: String) -> Result<Vec<u8>, CollaboratorError> {
        let path = self.resolve(&reference)?;
        std::fs::read(&path).map_err(|e| CollaboratorError::Storage {
            reason: format!("{}: {}", path.display(), e),
        })
    }
}
