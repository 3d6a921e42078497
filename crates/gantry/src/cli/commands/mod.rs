//! CLI command implementations

mod identities;
mod package;

pub use identities::IdentitiesCommand;
pub use package::PackageCommand;
