//! Entitlement file resolution
//!
//! Entitlement files are discovered by convention from the build resources
//! directory (`entitlements.mac.plist`, `entitlements.mas.plist` and their
//! `.inherit` counterparts) unless explicit paths are configured. The legacy
//! `entitlements.osx.*` names are permanently rejected.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use gantry_core::types::BuildVariant;

use crate::error::{Result, SigningError};

/// Legacy names and their replacements
const DEPRECATED_NAMES: &[(&str, &str)] = &[
    ("entitlements.osx.plist", "entitlements.mac.plist"),
    ("entitlements.osx.inherit.plist", "entitlements.mac.inherit.plist"),
];

/// The file names available in the build's resource directory.
///
/// Captured once per pass and queried read-only afterwards.
#[derive(Debug, Clone)]
pub struct ResourceListing {
    dir: PathBuf,
    names: BTreeSet<String>,
}

impl ResourceListing {
    pub fn new(dir: impl Into<PathBuf>, names: impl IntoIterator<Item = String>) -> Self {
        Self {
            dir: dir.into(),
            names: names.into_iter().collect(),
        }
    }

    /// Capture the listing from a directory. A missing directory yields an
    /// empty listing; resources are optional.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut names = BTreeSet::new();
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry?;
                    if let Ok(name) = entry.file_name().into_string() {
                        names.insert(name);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "resources directory does not exist");
            }
            Err(e) => return Err(e),
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Entitlement paths for one sign request, resolved once per pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEntitlements {
    pub entitlements: Option<PathBuf>,
    pub entitlements_inherit: Option<PathBuf>,
}

/// Fail if the listing contains a permanently rejected legacy name.
///
/// Runs before any identity search, for every pass, independent of
/// distribution channel or signing policy.
pub fn check_deprecated(listing: &ResourceListing) -> Result<()> {
    for (legacy, replacement) in DEPRECATED_NAMES {
        if listing.contains(legacy) {
            return Err(SigningError::DeprecatedResourceName {
                found: (*legacy).to_string(),
                replacement: (*replacement).to_string(),
            });
        }
    }
    Ok(())
}

/// Resolve entitlement paths for a pass.
///
/// Explicit paths are used verbatim; otherwise conventional names for the
/// variant are looked up in the listing. Absence of both is not an error.
pub fn resolve(
    variant: BuildVariant,
    explicit: Option<&Path>,
    explicit_inherit: Option<&Path>,
    listing: &ResourceListing,
) -> Result<ResolvedEntitlements> {
    check_deprecated(listing)?;

    let component = variant.entitlements_component();
    let entitlements = resolve_one(explicit, &format!("entitlements.{component}.plist"), listing);
    let entitlements_inherit = resolve_one(
        explicit_inherit,
        &format!("entitlements.{component}.inherit.plist"),
        listing,
    );

    debug!(
        variant = %variant,
        entitlements = ?entitlements,
        inherit = ?entitlements_inherit,
        "resolved entitlements"
    );
    Ok(ResolvedEntitlements {
        entitlements,
        entitlements_inherit,
    })
}

fn resolve_one(
    explicit: Option<&Path>,
    conventional: &str,
    listing: &ResourceListing,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    listing
        .contains(conventional)
        .then(|| listing.dir().join(conventional))
}
