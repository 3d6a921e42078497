//! Artifact-created notifications

use std::sync::Mutex;

use tracing::info;

use gantry_core::types::Artifact;

/// Receives artifact-created notifications as passes produce files.
pub trait ArtifactSink: Send + Sync {
    fn artifact_created(&self, artifact: &Artifact);
}

/// Logs each artifact as it is produced
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ArtifactSink for LoggingSink {
    fn artifact_created(&self, artifact: &Artifact) {
        info!(
            path = %artifact.path.display(),
            display_name = %artifact.display_name,
            arch = ?artifact.arch,
            "artifact created"
        );
    }
}

/// Collects artifacts for later inspection (used by tests and JSON output)
#[derive(Debug, Default)]
pub struct CollectingSink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().expect("sink lock poisoned").clone()
    }
}

impl ArtifactSink for CollectingSink {
    fn artifact_created(&self, artifact: &Artifact) {
        self.artifacts
            .lock()
            .expect("sink lock poisoned")
            .push(artifact.clone());
    }
}
