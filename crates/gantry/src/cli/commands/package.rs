//! Package command

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use gantry_core::config::{load_config_or_default, IdentitySetting};
use gantry_packaging::{LoggingSink, PackagingFlowController, PackagingRequest, PrebuiltBundler};
use gantry_signing::{
    CodesignSigner, CredentialContext, IdentityResolver, ProductbuildFlattener, ResourceListing,
    SecurityIdentitySource, SigningOrchestrator,
};

use crate::cli::{Cli, OutputFormat};

/// Environment override disabling automatic identity discovery. Affects
/// the direct-distribution pass only; store passes cannot ship unsigned
/// and keep discovering.
const AUTO_DISCOVERY_ENV: &str = "GANTRY_IDENTITY_AUTO_DISCOVERY";

/// Sign a bundle and build installer packages for the requested targets
#[derive(Debug, Args)]
#[command(
    after_help = "Environment:\n  GANTRY_IDENTITY_AUTO_DISCOVERY=false  disable automatic identity discovery\n                                        (direct-distribution pass only; store\n                                        passes always discover)"
)]
pub struct PackageCommand {
    /// Distribution targets (dmg, zip, dir, mas, mas-dev)
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Pre-built .app bundle to package (bundling is skipped)
    #[arg(long)]
    pub app: Option<PathBuf>,

    /// Output directory root
    #[arg(short, long, default_value = "dist")]
    pub out: PathBuf,

    /// Keychain holding the signing certificates
    #[arg(long)]
    pub keychain: Option<String>,

    /// Signing identity qualifier (name or team id); "false" disables signing
    #[arg(short, long)]
    pub identity: Option<String>,

    /// Fail instead of shipping unsigned when no identity is found
    #[arg(long)]
    pub force_sign: bool,

    /// Application name (overrides configuration)
    #[arg(long)]
    pub name: Option<String>,

    /// Bundle version (overrides configuration)
    #[arg(long)]
    pub app_version: Option<String>,
}

impl PackageCommand {
    /// Execute the package command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let (mut config, config_path) = load_config_or_default(&cwd);
        info!(config = ?config_path, targets = ?self.targets, "packaging");

        if let Some(name) = &self.name {
            config.app.name = name.clone();
        }
        if let Some(version) = &self.app_version {
            config.app.version = version.clone();
        }
        if config.app.name.is_empty() || config.app.version.is_empty() {
            anyhow::bail!(
                "application name and version are required; set [app] in gantry.toml or pass --name/--app-version"
            );
        }

        if let Some(identity) = &self.identity {
            config.mac.identity = Some(match identity.as_str() {
                "false" => IdentitySetting::Toggle(false),
                other => IdentitySetting::Name(other.to_string()),
            });
        }
        if self.force_sign {
            config.mac.force_sign = Some(true);
        }
        if let Some(app) = &self.app {
            config.mac.prebuilt_app = Some(app.clone());
        }

        let resources_dir = config
            .app
            .resources_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("build"));
        let resources = ResourceListing::from_dir(&resources_dir)?;

        let credentials = match &self.keychain {
            Some(name) => CredentialContext::keychain(name.clone()),
            None => CredentialContext::default_store(),
        };

        let disable_auto_discovery = std::env::var(AUTO_DISCOVERY_ENV)
            .map(|v| v == "false" || v == "0")
            .unwrap_or(false);

        // Bundle assembly is an external concern; the CLI packages bundles
        // that already exist.
        let prebuilt = config
            .mac
            .prebuilt_app
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.app", config.app.name)));

        let orchestrator = Arc::new(SigningOrchestrator::new(
            IdentityResolver::new(Arc::new(SecurityIdentitySource::new())),
            Arc::new(CodesignSigner::new()),
            Arc::new(ProductbuildFlattener::new()),
        ));
        let controller = PackagingFlowController::new(
            orchestrator,
            Arc::new(PrebuiltBundler::new(prebuilt)),
            Arc::new(LoggingSink),
        );

        let request = PackagingRequest {
            targets: self.targets.clone(),
            config,
            out_root: self.out.clone(),
            resources,
            credentials,
            disable_auto_discovery,
        };

        let artifacts = controller.run(request).await?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "artifacts": artifacts });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    if cli.verbose {
                        println!("output root: {}", self.out.display());
                    }
                    if artifacts.is_empty() {
                        println!("{}", style("Packaging finished (no installer artifacts)").bold());
                    } else {
                        println!("{}", style("Artifacts").bold());
                        for artifact in &artifacts {
                            println!("  {}  {}", artifact.display_name, artifact.path.display());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
