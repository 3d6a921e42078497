//! Configuration for Gantry
//!
//! Configuration lives in `gantry.toml`, discovered by walking parent
//! directories. Per-variant options are expressed as a base `[mac]` table
//! overlaid by `[mas]` and `[mas-dev]` tables; the overlay is a typed,
//! field-by-field merge rather than a dynamic map merge.

mod loader;
mod types;

pub use loader::{find_config, load_config, load_config_from_dir, load_config_or_default};
pub use types::{AppConfig, Config, IdentityPreference, IdentitySetting, MacPassConfig};
