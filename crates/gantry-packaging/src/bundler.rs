//! Bundle assembly seam
//!
//! Assembling the `.app` directory tree is an external collaborator's job;
//! the flow controller only needs a bundle path per pass. `PrebuiltBundler`
//! covers the common case where the caller supplies an already-built bundle.

use std::path::{Path, PathBuf};

use crate::error::{PackagingError, Result};
use crate::pass::PackagingPass;

/// Produces (or locates) the `.app` bundle for a pass.
#[async_trait::async_trait]
pub trait Bundler: Send + Sync {
    /// Return the bundle path for this pass, placing any produced files
    /// under `out_dir`.
    async fn bundle(&self, pass: &PackagingPass, out_dir: &Path) -> Result<PathBuf>;
}

/// Uses an externally supplied, already-built bundle for every pass
pub struct PrebuiltBundler {
    app_path: PathBuf,
}

impl PrebuiltBundler {
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl Bundler for PrebuiltBundler {
    async fn bundle(&self, _pass: &PackagingPass, _out_dir: &Path) -> Result<PathBuf> {
        if !tokio::fs::try_exists(&self.app_path).await? {
            return Err(PackagingError::BundleNotFound(self.app_path.clone()));
        }
        Ok(self.app_path.clone())
    }
}
