//! Intake coordinator: what happens to one detected file.
//!
//! ```text
//! Detected ──(bad extension)──────────────▶ Ignored
//!    │
//!    ├──(source/{basename} in ledger)─────▶ Skipped
//!    │
//!    ▼
//! Processing: generate ──▶ [claim keys] ──▶ publish A ──▶ record A ──▶ publish B ──▶ record B
//!    │                                                                    │
//!    ├──(any error: stop here)──────────▶ Failed                           ▼
//!    │                                                  record source/{basename} ─▶ Completed
//! ```
//!
//! Artifacts are published strictly in order and each key is recorded as soon
//! as its upload succeeds. The first failure ends processing of that file: later
//! artifacts are not attempted, earlier ones stay uploaded and recorded. The
//! completion id is only recorded once every artifact is up, so a failed file
//! is retried the next time it is detected.
//!
//! Under [`NamingPolicy::Source`] two sources can map to one key (`a.png` and
//! `a.jpg` both become `a.jpg`). Each key is claimed for its source before any
//! upload; a key already claimed by another source fails the intake instead of
//! overwriting that source's object. See [`crate::naming`] for the id formats.
//!
//! Ledger writes run on the blocking pool. The source file itself is never
//! modified or removed.

use crate::artifact::{Artifact, ArtifactGenerator, ProcessingError};
use crate::ledger::Ledger;
use crate::naming::{
    NamingPolicy, claim_id, claim_prefix, completion_id, is_accepted_image, source_basename,
};
use crate::publish::{Publisher, UploadError, UploadResult};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Key {key} already belongs to {owner}")]
    KeyTaken { key: String, owner: String },
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Terminal state of one intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Not an accepted image; never reached the generator.
    Ignored,
    /// Already in the ledger.
    Skipped,
    /// Every artifact uploaded, in upload order.
    Completed(Vec<UploadResult>),
    /// Generation, a key claim or an upload failed. Carries the error message.
    Failed(String),
}

/// Drives detected files through generate, publish and record.
#[derive(Clone)]
pub struct IntakeCoordinator {
    ledger: Arc<Ledger>,
    generator: Arc<ArtifactGenerator>,
    publisher: Publisher,
}

impl IntakeCoordinator {
    pub fn new(ledger: Arc<Ledger>, generator: Arc<ArtifactGenerator>, publisher: Publisher) -> Self {
        Self {
            ledger,
            generator,
            publisher,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run one file through the state machine. Never panics on per-file errors.
    pub async fn handle(&self, path: &Path) -> IntakeOutcome {
        let Some(name) = source_basename(path).filter(|_| is_accepted_image(path)) else {
            debug!(path = %path.display(), "ignoring non-image file");
            return IntakeOutcome::Ignored;
        };

        if self.ledger.contains(&completion_id(&name)) {
            info!(file = %name, "skipping already uploaded file");
            return IntakeOutcome::Skipped;
        }

        info!(file = %name, "new image detected");
        match self.process(path, &name).await {
            Ok(results) => {
                info!(file = %name, artifacts = results.len(), "completed");
                IntakeOutcome::Completed(results)
            }
            Err(e) => {
                error!(file = %name, error = %e, "failed to process");
                IntakeOutcome::Failed(e.to_string())
            }
        }
    }

    async fn process(&self, path: &Path, name: &str) -> Result<Vec<UploadResult>, IntakeError> {
        let generator = Arc::clone(&self.generator);
        let source = path.to_path_buf();
        let artifacts = tokio::task::spawn_blocking(move || generator.generate(&source)).await??;

        if self.generator.naming() == NamingPolicy::Source {
            self.claim_keys(&artifacts, name).await?;
        }

        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let result = self.publisher.publish(artifact, artifact.announce).await?;
            self.record(result.key.clone()).await?;
            results.push(result);
        }
        self.record(completion_id(name)).await?;
        Ok(results)
    }

    /// Claim every artifact key for `name`, failing on the first key owned by
    /// another source. Re-claiming our own key is a no-op.
    async fn claim_keys(&self, artifacts: &[Artifact], name: &str) -> Result<(), IntakeError> {
        for artifact in artifacts {
            let prefix = claim_prefix(&artifact.key);
            let id = claim_id(&artifact.key, name);
            let ledger = Arc::clone(&self.ledger);
            let shared = prefix.clone();
            let claimed =
                tokio::task::spawn_blocking(move || ledger.record_exclusive(&shared, id)).await?;
            if let Err(existing) = claimed {
                let owner = existing.strip_prefix(&prefix).unwrap_or(&existing);
                return Err(IntakeError::KeyTaken {
                    key: artifact.key.clone(),
                    owner: owner.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn record(&self, id: String) -> Result<(), IntakeError> {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || ledger.record(id)).await?;
        Ok(())
    }
}
