//! Pass planning: partitioning distribution targets into packaging passes

use std::path::{Path, PathBuf};

use tracing::debug;

use gantry_core::config::MacPassConfig;
use gantry_core::types::BuildVariant;

/// Target names that select a store variant; everything else is a direct
/// distribution target (dmg, zip, dir, ...)
const STORE_TARGETS: &[(&str, BuildVariant)] = &[
    ("mas", BuildVariant::Store),
    ("mas-dev", BuildVariant::StoreDevelopment),
];

/// The set of passes a build will run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    /// Whether a direct-distribution pass runs
    pub direct: bool,
    /// Store variants, one pass each, in request order and deduplicated
    pub store_variants: Vec<BuildVariant>,
}

impl PassPlan {
    pub fn variants(&self) -> Vec<BuildVariant> {
        let mut variants = Vec::new();
        if self.direct {
            variants.push(BuildVariant::Direct);
        }
        variants.extend(self.store_variants.iter().copied());
        variants
    }

    pub fn is_empty(&self) -> bool {
        !self.direct && self.store_variants.is_empty()
    }
}

/// Partition requested target names into passes.
///
/// At most one direct pass runs, whenever any non-store target is requested
/// or more than one target is requested in total. Each distinct store
/// variant gets its own pass.
pub fn plan_passes<S: AsRef<str>>(targets: &[S]) -> PassPlan {
    let mut store_variants = Vec::new();
    let mut non_store = 0usize;

    for target in targets {
        let name = target.as_ref();
        match STORE_TARGETS.iter().find(|(t, _)| *t == name) {
            Some((_, variant)) => {
                if !store_variants.contains(variant) {
                    store_variants.push(*variant);
                }
            }
            None => non_store += 1,
        }
    }

    let plan = PassPlan {
        direct: non_store > 0 || targets.len() > 1,
        store_variants,
    };
    debug!(?plan, "planned packaging passes");
    plan
}

/// One independent packaging pass: its variant, merged configuration, and
/// its own output directory.
#[derive(Debug, Clone)]
pub struct PackagingPass {
    pub variant: BuildVariant,
    /// Effective options after variant overlays
    pub config: MacPassConfig,
    pub out_dir: PathBuf,
}

impl PackagingPass {
    pub fn new(variant: BuildVariant, config: MacPassConfig, out_root: &Path) -> Self {
        Self {
            variant,
            config,
            out_dir: out_root.join(variant.output_dir_name()),
        }
    }
}
