//! Identities command

use clap::Args;
use console::style;

use gantry_signing::{CredentialContext, IdentitySource, SecurityIdentitySource};

use crate::cli::{Cli, OutputFormat};

/// List available signing identities
#[derive(Debug, Args)]
pub struct IdentitiesCommand {
    /// Keychain to search instead of the default store
    #[arg(long)]
    pub keychain: Option<String>,
}

impl IdentitiesCommand {
    /// Execute the identities command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli))
    }

    async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let context = match &self.keychain {
            Some(name) => CredentialContext::keychain(name.clone()),
            None => CredentialContext::default_store(),
        };

        let source = SecurityIdentitySource::new();
        let identities = source.list_identities(&context).await?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "context": context,
                    "identities": identities
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                println!("{} ({})", style("Signing Identities").bold(), context);
                if identities.is_empty() {
                    println!("  none found");
                }
                for identity in &identities {
                    match &identity.team_id {
                        Some(team) => println!("  {}  [{}]", identity.name, team),
                        None => println!("  {}", identity.name),
                    }
                }
            }
        }

        Ok(())
    }
}
