//! Shared types for packaging passes and produced artifacts

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Distribution variant of a packaging pass.
///
/// The variant determines the certificate-type prefix used during identity
/// discovery, the entitlement file naming convention, and the platform string
/// passed to the signing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildVariant {
    /// Distribution outside the Mac App Store (Developer ID)
    Direct,
    /// Mac App Store distribution
    Store,
    /// Mac App Store development build (runs on provisioned machines)
    StoreDevelopment,
}

impl BuildVariant {
    /// Whether this variant is distributed through the Mac App Store
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store | Self::StoreDevelopment)
    }

    /// File-name component used by conventional entitlement files
    /// (`entitlements.<component>.plist`)
    pub fn entitlements_component(&self) -> &'static str {
        if self.is_store() {
            "mas"
        } else {
            "mac"
        }
    }

    /// Platform string handed to the signing tool
    pub fn platform(&self) -> &'static str {
        if self.is_store() {
            "mas"
        } else {
            "darwin"
        }
    }

    /// Directory name for this pass's output, distinct per variant so
    /// concurrent passes never share an output directory
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Self::Direct => "mac",
            Self::Store => "mas",
            Self::StoreDevelopment => "mas-dev",
        }
    }
}

impl std::fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Store => write!(f, "store"),
            Self::StoreDevelopment => write!(f, "store-development"),
        }
    }
}

/// Kind of signature requested from the signing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningType {
    /// Development signature, unsuitable for shipping to users
    Development,
    /// Distribution signature
    Distribution,
}

impl SigningType {
    /// Parse from the signing tool's argument form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "development" => Some(Self::Development),
            "distribution" => Some(Self::Distribution),
            _ => None,
        }
    }

    /// The signing tool's argument form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Distribution => "distribution",
        }
    }
}

impl std::fmt::Display for SigningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target CPU architecture of a produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86_64,
    Arm64,
    Universal,
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Universal => write!(f, "universal"),
        }
    }
}

/// A file produced by a packaging pass, reported once on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Absolute path of the produced file
    pub path: PathBuf,

    /// Architecture the artifact targets, if architecture-specific
    pub arch: Option<Arch>,

    /// File name shown to the user (e.g. `MyApp-1.2.3.pkg`)
    pub display_name: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, arch: Option<Arch>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            arch,
            display_name: display_name.into(),
        }
    }
}
