//! The packaging flow controller
//!
//! Runs the planned passes concurrently, each with its own output directory
//! and sign request. Within a pass the order is strict: bundle, sign, and
//! for store variants flatten. A fatal pass fails the overall build; sibling
//! passes are allowed to finish first and failures are aggregated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use gantry_core::config::{Config, IdentityPreference};
use gantry_core::types::{Artifact, BuildVariant};
use gantry_signing::{
    CredentialContext, ResourceListing, SignJob, SigningOptions, SigningOrchestrator,
};

use crate::artifact::ArtifactSink;
use crate::bundler::Bundler;
use crate::error::{PackagingError, PassFailure, Result};
use crate::pass::{plan_passes, PackagingPass};

/// One build run: the requested targets and everything shared across passes
#[derive(Debug, Clone)]
pub struct PackagingRequest {
    /// Requested distribution target names (`dmg`, `zip`, `mas`, ...)
    pub targets: Vec<String>,
    pub config: Config,
    /// Root under which each pass gets its own output directory
    pub out_root: PathBuf,
    /// Resource listing, captured once and shared read-only by every pass
    pub resources: ResourceListing,
    /// Credential container for the run; read-only
    pub credentials: CredentialContext,
    /// Environment-level override disabling automatic identity discovery.
    ///
    /// Applies to the direct pass only: store channels cannot ship
    /// unsigned, so store passes keep discovering even when this is set.
    pub disable_auto_discovery: bool,
}

/// Partitions targets into passes and drives each to completion.
pub struct PackagingFlowController {
    orchestrator: Arc<SigningOrchestrator>,
    bundler: Arc<dyn Bundler>,
    sink: Arc<dyn ArtifactSink>,
}

impl PackagingFlowController {
    pub fn new(
        orchestrator: Arc<SigningOrchestrator>,
        bundler: Arc<dyn Bundler>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            orchestrator,
            bundler,
            sink,
        }
    }

    /// Run every planned pass to completion and collect produced artifacts.
    pub async fn run(&self, request: PackagingRequest) -> Result<Vec<Artifact>> {
        let plan = plan_passes(&request.targets);
        let variants = plan.variants();
        let total = variants.len();
        if total == 0 {
            info!("no packaging passes requested");
            return Ok(Vec::new());
        }

        let request = Arc::new(request);
        let mut set: JoinSet<(BuildVariant, Result<Option<Artifact>>)> = JoinSet::new();
        for variant in variants {
            let orchestrator = self.orchestrator.clone();
            let bundler = self.bundler.clone();
            let sink = self.sink.clone();
            let request = request.clone();
            set.spawn(async move {
                let result = run_pass(&orchestrator, &bundler, &sink, &request, variant).await;
                (variant, result)
            });
        }

        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (variant, result) = joined?;
            match result {
                Ok(Some(artifact)) => artifacts.push(artifact),
                Ok(None) => {}
                Err(source) => {
                    error!(pass = %variant, error = %source, "packaging pass failed");
                    failures.push(PassFailure {
                        pass: variant.to_string(),
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(artifacts)
        } else {
            // Deterministic reporting order regardless of completion order
            failures.sort_by(|a, b| a.pass.cmp(&b.pass));
            Err(PackagingError::PassesFailed { failures, total })
        }
    }
}

/// One pass, start to finish: bundle, sign, flatten.
async fn run_pass(
    orchestrator: &SigningOrchestrator,
    bundler: &Arc<dyn Bundler>,
    sink: &Arc<dyn ArtifactSink>,
    request: &PackagingRequest,
    variant: BuildVariant,
) -> Result<Option<Artifact>> {
    let config = request.config.pass_config(variant);
    let pass = PackagingPass::new(variant, config.clone(), &request.out_root);
    info!(pass = %variant, out_dir = %pass.out_dir.display(), "starting packaging pass");

    tokio::fs::create_dir_all(&pass.out_dir).await?;

    let app_path = match &config.prebuilt_app {
        Some(path) => {
            info!(pass = %variant, app = %path.display(), "using pre-built bundle, skipping bundling");
            stage_prebuilt(path, &pass.out_dir).await?
        }
        None => bundler.bundle(&pass, &pass.out_dir).await?,
    };

    let mut preference = config.identity_preference();
    if request.disable_auto_discovery
        && variant == BuildVariant::Direct
        && preference == IdentityPreference::Auto
    {
        preference = IdentityPreference::Disabled;
    }

    let job = SignJob {
        app_name: request.config.app.name.clone(),
        version: request.config.app.version.clone(),
        app_path,
        out_dir: pass.out_dir.clone(),
        resources: request.resources.clone(),
        credentials: request.credentials.clone(),
        options: SigningOptions {
            variant,
            identity_preference: preference,
            signing_type: config.signing_type,
            force_sign: config.force_sign(),
            entitlements: config.entitlements.clone(),
            entitlements_inherit: config.entitlements_inherit.clone(),
        },
    };

    let outcome = orchestrator.run(&job).await.map_err(PackagingError::Signing)?;
    if let Some(artifact) = outcome.artifact() {
        sink.artifact_created(artifact);
    }
    info!(pass = %variant, "packaging pass finished");
    Ok(outcome.artifact().cloned())
}

/// Copy a pre-built bundle into the pass output directory.
///
/// Signing mutates the bundle in place and passes run concurrently, so a
/// shared pre-built bundle is never signed at its original path. Each pass
/// works on its own copy under its own `out_dir`.
async fn stage_prebuilt(source: &Path, out_dir: &Path) -> Result<PathBuf> {
    if !tokio::fs::try_exists(source).await? {
        return Err(PackagingError::BundleNotFound(source.to_path_buf()));
    }
    let name = source
        .file_name()
        .ok_or_else(|| PackagingError::BundleNotFound(source.to_path_buf()))?;
    let staged = out_dir.join(name);
    let (source, dest) = (source.to_path_buf(), staged.clone());
    tokio::task::spawn_blocking(move || copy_tree(&source, &dest)).await??;
    Ok(staged)
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    use gantry_core::config::{AppConfig, IdentitySetting, MacPassConfig};
    use gantry_signing::{
        CodesignSigner, Flattener, IdentityResolver, IdentitySource, SignRequest, Signer,
        SigningIdentity,
    };

    use crate::artifact::CollectingSink;

    struct FakeSource(Vec<SigningIdentity>);

    #[async_trait::async_trait]
    impl IdentitySource for FakeSource {
        async fn list_identities(
            &self,
            _context: &CredentialContext,
        ) -> gantry_signing::Result<Vec<SigningIdentity>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct FakeSigner {
        count: AtomicUsize,
        paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait::async_trait]
    impl Signer for FakeSigner {
        async fn sign(&self, request: &SignRequest) -> gantry_signing::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.paths.lock().unwrap().push(request.app_path.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFlattener;

    #[async_trait::async_trait]
    impl Flattener for FakeFlattener {
        async fn flatten(
            &self,
            _bundle_path: &Path,
            _installer_identity: &SigningIdentity,
            _context: &CredentialContext,
            _output: &Path,
        ) -> gantry_signing::Result<()> {
            Ok(())
        }
    }

    struct CountingBundler {
        app_path: PathBuf,
        count: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Bundler for CountingBundler {
        async fn bundle(&self, _pass: &PackagingPass, _out_dir: &Path) -> Result<PathBuf> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(self.app_path.clone())
        }
    }

    fn identities(with_store: bool) -> Vec<SigningIdentity> {
        let mut ids = vec![SigningIdentity::named("Developer ID Application: Acme (T1)")];
        if with_store {
            ids.push(SigningIdentity::named(
                "3rd Party Mac Developer Application: Acme (T1)",
            ));
            ids.push(SigningIdentity::named(
                "3rd Party Mac Developer Installer: Acme (T1)",
            ));
        }
        ids
    }

    struct Setup {
        controller: PackagingFlowController,
        signer: Arc<FakeSigner>,
        bundler: Arc<CountingBundler>,
        sink: Arc<CollectingSink>,
        _temp: TempDir,
        out_root: PathBuf,
    }

    fn setup(ids: Vec<SigningIdentity>) -> Setup {
        let temp = TempDir::new().unwrap();
        let out_root = temp.path().join("out");
        let signer = Arc::new(FakeSigner::default());
        let bundler = Arc::new(CountingBundler {
            app_path: temp.path().join("Acme.app"),
            count: AtomicUsize::new(0),
        });
        let sink = Arc::new(CollectingSink::new());
        let orchestrator = Arc::new(
            SigningOrchestrator::new(
                IdentityResolver::new(Arc::new(FakeSource(ids))),
                signer.clone(),
                Arc::new(FakeFlattener),
            )
            .with_host_capability(true),
        );
        let controller =
            PackagingFlowController::new(orchestrator, bundler.clone(), sink.clone());
        Setup {
            controller,
            signer,
            bundler,
            sink,
            _temp: temp,
            out_root,
        }
    }

    fn request(targets: &[&str], out_root: &Path) -> PackagingRequest {
        PackagingRequest {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            config: Config {
                app: AppConfig {
                    name: "Acme".to_string(),
                    version: "2.0.0".to_string(),
                    resources_dir: None,
                },
                ..Default::default()
            },
            out_root: out_root.to_path_buf(),
            resources: ResourceListing::new("build", Vec::new()),
            credentials: CredentialContext::default_store(),
            disable_auto_discovery: false,
        }
    }

    #[tokio::test]
    async fn test_store_target_produces_one_installer_artifact() {
        let s = setup(identities(true));
        let artifacts = s
            .controller
            .run(request(&["mas"], &s.out_root))
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].display_name, "Acme-2.0.0.pkg");
        assert_eq!(s.sink.artifacts(), artifacts);
        // Single store target: no direct pass
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 1);
        assert_eq!(s.bundler.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mixed_targets_run_both_passes() {
        let s = setup(identities(true));
        let artifacts = s
            .controller
            .run(request(&["dmg", "mas"], &s.out_root))
            .await
            .unwrap();

        // One sign per pass, but only the store pass yields an installer
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 2);
        assert_eq!(artifacts.len(), 1);
        assert!(s.out_root.join("mac").is_dir());
        assert!(s.out_root.join("mas").is_dir());
    }

    #[tokio::test]
    async fn test_failed_store_pass_fails_build_but_siblings_finish() {
        // No store identities: the mas pass is fatal, the direct pass is not
        let s = setup(identities(false));
        let err = s
            .controller
            .run(request(&["dmg", "mas"], &s.out_root))
            .await
            .unwrap_err();

        match err {
            PackagingError::PassesFailed { failures, total } => {
                assert_eq!(total, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].pass, "store");
            }
            other => panic!("expected PassesFailed, got {other}"),
        }
        // The direct pass still ran to completion
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 1);
    }

    fn make_prebuilt(root: &Path) -> PathBuf {
        let app = root.join("Prebuilt.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(app.join("Contents/MacOS/Prebuilt"), b"binary").unwrap();
        app
    }

    #[tokio::test]
    async fn test_prebuilt_bundle_skips_bundling() {
        let s = setup(identities(true));
        let mut req = request(&["mas"], &s.out_root);
        req.config.mac = MacPassConfig {
            prebuilt_app: Some(make_prebuilt(s._temp.path())),
            ..Default::default()
        };

        s.controller.run(req).await.unwrap();
        assert_eq!(s.bundler.count.load(Ordering::SeqCst), 0);
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prebuilt_bundle_is_staged_per_pass() {
        let s = setup(identities(true));
        let prebuilt = make_prebuilt(s._temp.path());
        let mut req = request(&["dmg", "mas"], &s.out_root);
        req.config.mac = MacPassConfig {
            prebuilt_app: Some(prebuilt.clone()),
            ..Default::default()
        };

        s.controller.run(req).await.unwrap();

        // Concurrent passes each sign their own copy, never the shared
        // original
        let paths = s.signer.paths.lock().unwrap().clone();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| *p != prebuilt));
        assert!(paths.contains(&s.out_root.join("mac").join("Prebuilt.app")));
        assert!(paths.contains(&s.out_root.join("mas").join("Prebuilt.app")));
        // The copy is a full tree, not an empty directory
        assert!(s
            .out_root
            .join("mac/Prebuilt.app/Contents/MacOS/Prebuilt")
            .is_file());
    }

    #[tokio::test]
    async fn test_missing_prebuilt_bundle_fails_the_pass() {
        let s = setup(identities(true));
        let mut req = request(&["mas"], &s.out_root);
        req.config.mac = MacPassConfig {
            prebuilt_app: Some(s._temp.path().join("Absent.app")),
            ..Default::default()
        };

        let err = s.controller.run(req).await.unwrap_err();
        match err {
            PackagingError::PassesFailed { failures, .. } => {
                assert!(matches!(
                    failures[0].source,
                    PackagingError::BundleNotFound(_)
                ));
            }
            other => panic!("expected PassesFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_auto_discovery_override_disables_direct_signing() {
        let s = setup(identities(true));
        let mut req = request(&["dmg"], &s.out_root);
        req.disable_auto_discovery = true;

        let artifacts = s.controller.run(req).await.unwrap();
        assert!(artifacts.is_empty());
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auto_discovery_override_leaves_store_passes_discovering() {
        let s = setup(identities(true));
        let mut req = request(&["mas"], &s.out_root);
        req.disable_auto_discovery = true;

        // The override narrows to the direct pass; the store pass still
        // resolves and flattens
        let artifacts = s.controller.run(req).await.unwrap();
        assert_eq!(artifacts.len(), 1);
    }

    #[tokio::test]
    async fn test_explicitly_disabled_identity_still_allows_store_discovery() {
        let s = setup(identities(true));
        let mut req = request(&["mas"], &s.out_root);
        req.config.mac = MacPassConfig {
            identity: Some(IdentitySetting::Toggle(false)),
            ..Default::default()
        };

        // Store channels cannot ship unsigned; the pass discovers anyway
        let artifacts = s.controller.run(req).await.unwrap();
        assert_eq!(artifacts.len(), 1);
    }

    #[tokio::test]
    async fn test_no_targets_is_a_no_op() {
        let s = setup(identities(true));
        let artifacts = s.controller.run(request(&[], &s.out_root)).await.unwrap();
        assert!(artifacts.is_empty());
        assert_eq!(s.signer.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_real_tool_wrappers_construct() {
        // Compile-time sanity that production collaborators satisfy the seams
        let _signer: Arc<dyn Signer> = Arc::new(CodesignSigner::new());
        let _flattener: Arc<dyn Flattener> = Arc::new(gantry_signing::ProductbuildFlattener::new());
    }
}
