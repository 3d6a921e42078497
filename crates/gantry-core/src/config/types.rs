//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{BuildVariant, SigningType};

/// Main configuration for Gantry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application being packaged
    pub app: AppConfig,

    /// Base options for every macOS packaging pass
    pub mac: MacPassConfig,

    /// Overlay applied for the Mac App Store pass
    pub mas: MacPassConfig,

    /// Overlay applied on top of `mas` for the store-development pass
    #[serde(rename = "mas-dev")]
    pub mas_dev: MacPassConfig,
}

impl Config {
    /// Effective per-pass options for a variant.
    ///
    /// `Direct` uses the base table as-is. `Store` overlays `[mas]` on the
    /// base. `StoreDevelopment` additionally overlays `[mas-dev]` and forces
    /// the signing type to development.
    pub fn pass_config(&self, variant: BuildVariant) -> MacPassConfig {
        match variant {
            BuildVariant::Direct => self.mac.clone(),
            BuildVariant::Store => self.mac.overlay(&self.mas),
            BuildVariant::StoreDevelopment => {
                let mut merged = self.mac.overlay(&self.mas).overlay(&self.mas_dev);
                merged.signing_type = Some(SigningType::Development);
                merged
            }
        }
    }
}

/// Application metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name of the application (used in artifact file names)
    pub name: String,

    /// Bundle version string
    pub version: String,

    /// Directory holding build resources such as entitlement files.
    /// Defaults to `build/` next to the configuration file.
    pub resources_dir: Option<PathBuf>,
}

/// Options for one packaging pass.
///
/// Every field is optional so the same type serves as a base table and as an
/// overlay; [`MacPassConfig::overlay`] is the total merge between the two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacPassConfig {
    /// Signing identity preference: absent for automatic discovery,
    /// `false` to ship unsigned, or a name/team qualifier.
    pub identity: Option<IdentitySetting>,

    /// Explicit signing type override
    pub signing_type: Option<SigningType>,

    /// Explicit entitlements file, used verbatim
    pub entitlements: Option<PathBuf>,

    /// Explicit inherit-entitlements file, used verbatim
    pub entitlements_inherit: Option<PathBuf>,

    /// Fail the pass instead of shipping unsigned when no identity is found
    pub force_sign: Option<bool>,

    /// Pre-built `.app` bundle; when set, bundling is skipped and only
    /// signing (and flattening, for store variants) is performed
    pub prebuilt_app: Option<PathBuf>,
}

impl MacPassConfig {
    /// Overlay `over` onto `self`, field by field. A field set in the
    /// overlay wins; an unset overlay field keeps the base value.
    pub fn overlay(&self, over: &MacPassConfig) -> MacPassConfig {
        MacPassConfig {
            identity: over.identity.clone().or_else(|| self.identity.clone()),
            signing_type: over.signing_type.or(self.signing_type),
            entitlements: over.entitlements.clone().or_else(|| self.entitlements.clone()),
            entitlements_inherit: over
                .entitlements_inherit
                .clone()
                .or_else(|| self.entitlements_inherit.clone()),
            force_sign: over.force_sign.or(self.force_sign),
            prebuilt_app: over.prebuilt_app.clone().or_else(|| self.prebuilt_app.clone()),
        }
    }

    /// Identity preference expressed by this pass configuration
    pub fn identity_preference(&self) -> IdentityPreference {
        match &self.identity {
            None | Some(IdentitySetting::Toggle(true)) => IdentityPreference::Auto,
            Some(IdentitySetting::Toggle(false)) => IdentityPreference::Disabled,
            Some(IdentitySetting::Name(name)) => IdentityPreference::Qualifier(name.clone()),
        }
    }

    /// Whether unsigned output is an error for this pass
    pub fn force_sign(&self) -> bool {
        self.force_sign.unwrap_or(false)
    }
}

/// Raw identity value as written in TOML (`identity = false` or
/// `identity = "Team Name"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentitySetting {
    Toggle(bool),
    Name(String),
}

/// Interpreted identity preference for a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityPreference {
    /// Discover an identity automatically
    Auto,
    /// Identity explicitly disabled; ship unsigned
    Disabled,
    /// Restrict discovery to a name or team qualifier
    Qualifier(String),
}

impl IdentityPreference {
    /// The qualifier, when one was configured
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            Self::Qualifier(q) => Some(q),
            _ => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}
