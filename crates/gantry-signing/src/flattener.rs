//! Installer flattening for store passes
//!
//! Flattening combines a signed store-variant bundle into a single `.pkg`
//! installer via one `productbuild` invocation with a fixed
//! component-to-destination mapping.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::identity::SigningIdentity;
use crate::keychain::CredentialContext;
use crate::signer::{run_tool, DEFAULT_TOOL_TIMEOUT};

/// Installed location of the bundled application component
const COMPONENT_DESTINATION: &str = "/Applications";

/// Builds an installer package from a signed bundle.
#[async_trait::async_trait]
pub trait Flattener: Send + Sync {
    async fn flatten(
        &self,
        bundle_path: &Path,
        installer_identity: &SigningIdentity,
        context: &CredentialContext,
        output: &Path,
    ) -> Result<()>;
}

/// Flattens with `/usr/bin/productbuild`
pub struct ProductbuildFlattener {
    productbuild_path: String,
    timeout: Duration,
}

impl ProductbuildFlattener {
    pub fn new() -> Self {
        Self {
            productbuild_path: "/usr/bin/productbuild".to_string(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        Path::new(&self.productbuild_path).exists()
    }
}

impl Default for ProductbuildFlattener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Flattener for ProductbuildFlattener {
    async fn flatten(
        &self,
        bundle_path: &Path,
        installer_identity: &SigningIdentity,
        context: &CredentialContext,
        output: &Path,
    ) -> Result<()> {
        let bundle = bundle_path.display().to_string();
        let out = output.display().to_string();
        let mut args = vec![
            "--component",
            &bundle,
            COMPONENT_DESTINATION,
            "--sign",
            &installer_identity.name,
        ];
        if let Some(keychain) = context.keychain_name() {
            args.push("--keychain");
            args.push(keychain);
        }
        args.push(&out);

        info!(
            bundle = %bundle_path.display(),
            output = %output.display(),
            identity = %installer_identity.name,
            "flattening installer package"
        );
        debug!(?args, "running productbuild");

        run_tool(&self.productbuild_path, "productbuild", &args, self.timeout).await?;
        Ok(())
    }
}
