//! The sign-request payload handed to the signing tool
//!
//! The payload is a strongly typed struct with explicit optional fields, and
//! it serializes to (and parses back from) the tool's argument form so the
//! contract stays statically checkable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use gantry_core::types::SigningType;

use crate::error::{Result, SigningError};
use crate::identity::SigningIdentity;

/// Distribution channel of the bundle being signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Direct,
    Store,
}

impl Channel {
    /// Platform string in the tool's argument form
    pub fn platform(&self) -> &'static str {
        match self {
            Self::Direct => "darwin",
            Self::Store => "mas",
        }
    }

    pub fn from_platform(s: &str) -> Option<Self> {
        match s {
            "darwin" => Some(Self::Direct),
            "mas" => Some(Self::Store),
            _ => None,
        }
    }
}

/// One signing invocation. All fields are fixed at construction and never
/// mutated after being handed to the signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignRequest {
    /// The resolved identity; exactly one per request
    pub identity: SigningIdentity,

    /// Signature kind
    pub signing_type: SigningType,

    /// Distribution channel, determining the platform argument
    pub channel: Channel,

    /// Bundle version string
    pub version: String,

    /// The `.app` bundle to sign in place
    pub app_path: PathBuf,

    /// Keychain to restrict identity lookup to, when a build keychain is
    /// in use
    pub keychain: Option<String>,

    /// Entitlements attached to the bundle
    pub entitlements: Option<PathBuf>,

    /// Entitlements inherited by nested code
    pub entitlements_inherit: Option<PathBuf>,

    /// Ask the tool for a gatekeeper assessment of the result
    pub gatekeeper_assess: bool,

    /// The identity was already validated during discovery; always true
    pub skip_identity_validation: bool,
}

impl SignRequest {
    /// Serialize to the signing tool's argument form
    pub fn to_tool_args(&self) -> Vec<String> {
        let mut args = vec![
            "--identity".to_string(),
            self.identity.name.clone(),
            "--type".to_string(),
            self.signing_type.as_str().to_string(),
            "--platform".to_string(),
            self.channel.platform().to_string(),
            "--version".to_string(),
            self.version.clone(),
            "--app".to_string(),
            self.app_path.display().to_string(),
        ];
        if let Some(keychain) = &self.keychain {
            args.push("--keychain".to_string());
            args.push(keychain.clone());
        }
        if let Some(path) = &self.entitlements {
            args.push("--entitlements".to_string());
            args.push(path.display().to_string());
        }
        if let Some(path) = &self.entitlements_inherit {
            args.push("--entitlements-inherit".to_string());
            args.push(path.display().to_string());
        }
        if self.gatekeeper_assess {
            args.push("--gatekeeper-assess".to_string());
        }
        if self.skip_identity_validation {
            args.push("--skip-identity-validation".to_string());
        }
        args
    }

    /// Parse a request back from the tool's argument form.
    ///
    /// Only the name of the identity survives the argument form; team id and
    /// fingerprint are discovery-time detail the tool never sees.
    pub fn from_tool_args(args: &[String]) -> Result<Self> {
        fn missing(flag: &str) -> SigningError {
            SigningError::ToolFailed {
                tool: "sign".to_string(),
                reason: format!("missing required argument {flag}"),
            }
        }
        fn invalid(flag: &str, value: &str) -> SigningError {
            SigningError::ToolFailed {
                tool: "sign".to_string(),
                reason: format!("invalid value '{value}' for {flag}"),
            }
        }

        let mut identity = None;
        let mut signing_type = None;
        let mut channel = None;
        let mut version = None;
        let mut app_path = None;
        let mut keychain = None;
        let mut entitlements = None;
        let mut entitlements_inherit = None;
        let mut gatekeeper_assess = false;
        let mut skip_identity_validation = false;

        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let mut value = || iter.next().cloned().ok_or_else(|| missing(flag));
            match flag.as_str() {
                "--identity" => identity = Some(SigningIdentity::named(value()?)),
                "--type" => {
                    let v = value()?;
                    signing_type =
                        Some(SigningType::parse(&v).ok_or_else(|| invalid("--type", &v))?);
                }
                "--platform" => {
                    let v = value()?;
                    channel = Some(Channel::from_platform(&v).ok_or_else(|| invalid("--platform", &v))?);
                }
                "--version" => version = Some(value()?),
                "--app" => app_path = Some(PathBuf::from(value()?)),
                "--keychain" => keychain = Some(value()?),
                "--entitlements" => entitlements = Some(PathBuf::from(value()?)),
                "--entitlements-inherit" => entitlements_inherit = Some(PathBuf::from(value()?)),
                "--gatekeeper-assess" => gatekeeper_assess = true,
                "--skip-identity-validation" => skip_identity_validation = true,
                other => return Err(invalid("argument", other)),
            }
        }

        Ok(Self {
            identity: identity.ok_or_else(|| missing("--identity"))?,
            signing_type: signing_type.ok_or_else(|| missing("--type"))?,
            channel: channel.ok_or_else(|| missing("--platform"))?,
            version: version.ok_or_else(|| missing("--version"))?,
            app_path: app_path.ok_or_else(|| missing("--app"))?,
            keychain,
            entitlements,
            entitlements_inherit,
            gatekeeper_assess,
            skip_identity_validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignRequest {
        SignRequest {
            identity: SigningIdentity::named("3rd Party Mac Developer Application: Acme (T1)"),
            signing_type: SigningType::Distribution,
            channel: Channel::Store,
            version: "1.2.3".to_string(),
            app_path: PathBuf::from("/out/mas/Acme.app"),
            keychain: Some("build.keychain".to_string()),
            entitlements: Some(PathBuf::from("build/entitlements.mas.plist")),
            entitlements_inherit: Some(PathBuf::from("build/entitlements.mas.inherit.plist")),
            gatekeeper_assess: true,
            skip_identity_validation: true,
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let original = request();
        let parsed = SignRequest::from_tool_args(&original.to_tool_args()).unwrap();
        assert_eq!(parsed.identity.name, original.identity.name);
        assert_eq!(parsed.signing_type, original.signing_type);
        assert_eq!(parsed.channel, original.channel);
        assert_eq!(parsed.entitlements, original.entitlements);
        assert_eq!(parsed.entitlements_inherit, original.entitlements_inherit);
        assert_eq!(parsed.version, original.version);
        assert_eq!(parsed.app_path, original.app_path);
        assert_eq!(parsed.keychain, original.keychain);
        assert_eq!(parsed.gatekeeper_assess, original.gatekeeper_assess);
    }

    #[test]
    fn test_round_trip_without_optionals() {
        let mut original = request();
        original.keychain = None;
        original.entitlements = None;
        original.entitlements_inherit = None;
        original.gatekeeper_assess = false;

        let args = original.to_tool_args();
        assert!(!args.contains(&"--keychain".to_string()));
        assert!(!args.contains(&"--gatekeeper-assess".to_string()));

        let parsed = SignRequest::from_tool_args(&args).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_rejects_missing_identity() {
        let err = SignRequest::from_tool_args(&["--type".to_string(), "distribution".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("--platform") || err.to_string().contains("--identity"));
    }

    #[test]
    fn test_parse_rejects_unknown_platform() {
        let mut args = request().to_tool_args();
        let i = args.iter().position(|a| a == "--platform").unwrap();
        args[i + 1] = "windows".to_string();
        assert!(SignRequest::from_tool_args(&args).is_err());
    }
}
