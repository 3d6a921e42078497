//! Signer trait and the codesign-backed implementation

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SigningError};
use crate::request::SignRequest;

/// Executes sign requests against the operating system.
///
/// Narrow seam so tests can substitute a fake without invoking real
/// tooling.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: &SignRequest) -> Result<()>;
}

/// Signs bundles in place with `/usr/bin/codesign`
pub struct CodesignSigner {
    codesign_path: String,
    timeout: Duration,
}

/// External tool invocations carry an explicit deadline; the underlying
/// tools define none of their own.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

impl CodesignSigner {
    pub fn new() -> Self {
        Self {
            codesign_path: "/usr/bin/codesign".to_string(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        Path::new(&self.codesign_path).exists()
    }

    /// Argument list for one codesign invocation over `target`.
    fn sign_args(request: &SignRequest, target: &str, entitlements: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--sign".to_string(),
            request.identity.name.clone(),
            "--force".to_string(),
            "--timestamp".to_string(),
        ];
        if let Some(keychain) = &request.keychain {
            args.push("--keychain".to_string());
            args.push(keychain.clone());
        }
        if let Some(path) = entitlements {
            args.push("--entitlements".to_string());
            args.push(path.to_string());
        }
        args.push(target.to_string());
        args
    }
}

/// Nested code inside the bundle. Signed before the outer bundle, with the
/// inherited entitlements, so the outer seal covers already-valid children.
async fn nested_code_targets(app_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    for dir in ["Frameworks", "PlugIns", "XPCServices"] {
        let nested = app_path.join("Contents").join(dir);
        let mut entries = match tokio::fs::read_dir(&nested).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            targets.push(entry.path());
        }
    }
    // Deterministic order keeps tool output stable across runs
    targets.sort();
    Ok(targets)
}

impl Default for CodesignSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Signer for CodesignSigner {
    async fn sign(&self, request: &SignRequest) -> Result<()> {
        let app = request.app_path.display().to_string();

        if let Some(inherit) = &request.entitlements_inherit {
            let inherit = inherit.display().to_string();
            for target in nested_code_targets(&request.app_path).await? {
                let target = target.display().to_string();
                debug!(target = %target, "signing nested code with inherited entitlements");
                let args = Self::sign_args(request, &target, Some(&inherit));
                let argv: Vec<&str> = args.iter().map(String::as_str).collect();
                run_tool(&self.codesign_path, "codesign", &argv, self.timeout).await?;
            }
        }

        let entitlements = request.entitlements.as_ref().map(|p| p.display().to_string());
        let args = Self::sign_args(request, &app, entitlements.as_deref());

        info!(
            app = %request.app_path.display(),
            identity = %request.identity.name,
            platform = request.channel.platform(),
            "signing bundle"
        );
        debug!(?args, "running codesign");

        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        run_tool(&self.codesign_path, "codesign", &argv, self.timeout).await?;

        if request.gatekeeper_assess {
            debug!(app = %app, "requesting gatekeeper assessment");
            run_tool(
                "/usr/sbin/spctl",
                "spctl",
                &["--assess", "--type", "execute", &app],
                self.timeout,
            )
            .await?;
        }
        Ok(())
    }
}

/// Run an external tool, wrapping failure diagnostics verbatim and applying
/// the configured deadline.
pub(crate) async fn run_tool(
    path: &str,
    tool: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String> {
    let output = Command::new(path)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| SigningError::ToolTimeout {
            tool: tool.to_string(),
            seconds: timeout.as_secs(),
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(SigningError::ToolFailed {
            tool: tool.to_string(),
            reason: if stderr.is_empty() { stdout } else { stderr },
        });
    }

    Ok(if stdout.is_empty() { stderr } else { stdout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use gantry_core::types::SigningType;

    use crate::identity::SigningIdentity;
    use crate::request::Channel;
    use crate::request::SignRequest;

    fn request() -> SignRequest {
        SignRequest {
            identity: SigningIdentity::named("Developer ID Application: Acme (T1)"),
            signing_type: SigningType::Distribution,
            channel: Channel::Direct,
            version: "1.0.0".to_string(),
            app_path: PathBuf::from("/work/Acme.app"),
            keychain: Some("build.keychain".to_string()),
            entitlements: Some(PathBuf::from("/res/entitlements.mac.plist")),
            entitlements_inherit: Some(PathBuf::from("/res/entitlements.mac.inherit.plist")),
            gatekeeper_assess: true,
            skip_identity_validation: true,
        }
    }

    #[test]
    fn test_sign_args_carry_identity_keychain_and_entitlements() {
        let req = request();
        let args = CodesignSigner::sign_args(
            &req,
            "/work/Acme.app",
            Some("/res/entitlements.mac.plist"),
        );

        assert_eq!(args[0], "--sign");
        assert_eq!(args[1], "Developer ID Application: Acme (T1)");
        assert!(args.contains(&"--keychain".to_string()));
        assert!(args.contains(&"build.keychain".to_string()));
        let i = args.iter().position(|a| a == "--entitlements").unwrap();
        assert_eq!(args[i + 1], "/res/entitlements.mac.plist");
        assert_eq!(args.last().unwrap(), "/work/Acme.app");
    }

    #[test]
    fn test_inherit_entitlements_reach_nested_invocations() {
        let req = request();
        let inherit = req.entitlements_inherit.as_ref().unwrap();
        let args = CodesignSigner::sign_args(
            &req,
            "/work/Acme.app/Contents/Frameworks/Helper.framework",
            Some(&inherit.display().to_string()),
        );

        let i = args.iter().position(|a| a == "--entitlements").unwrap();
        assert_eq!(args[i + 1], "/res/entitlements.mac.inherit.plist");
        assert_eq!(
            args.last().unwrap(),
            "/work/Acme.app/Contents/Frameworks/Helper.framework"
        );
    }

    #[tokio::test]
    async fn test_nested_code_targets_enumerate_known_locations() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("Acme.app");
        std::fs::create_dir_all(app.join("Contents/Frameworks/Acme Helper.framework")).unwrap();
        std::fs::create_dir_all(app.join("Contents/PlugIns/Quick.plugin")).unwrap();
        std::fs::create_dir_all(app.join("Contents/Resources")).unwrap();

        let targets = nested_code_targets(&app).await.unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets[0].ends_with("Acme Helper.framework"));
        assert!(targets[1].ends_with("Quick.plugin"));
    }

    #[tokio::test]
    async fn test_bundle_without_nested_code_has_no_targets() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("Acme.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();

        assert!(nested_code_targets(&app).await.unwrap().is_empty());
    }
}
