use clap::{Args, Subcommand};
use stardb_catalog::{NewInstrument, Session};
use stardb_datapkg::declarations::load_instruments;
use std::path::PathBuf;
use tracing::info;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::success;

#[derive(Args)]
pub struct InstrumentsCommand {
    #[command(subcommand)]
    command: InstrumentsCommands,
}

#[derive(Subcommand)]
enum InstrumentsCommands {
    /// Insert the instruments declared in a file, skipping existing ones
    Load(LoadInstrumentsArgs),
}

#[derive(Args)]
struct LoadInstrumentsArgs {
    /// Declaration file with an `instruments` list
    file: PathBuf,
}

impl InstrumentsCommand {
    pub fn execute(self, options: &GlobalOptions) -> anyhow::Result<()> {
        block_on(async {
            let env = CatalogEnv::open(options).await?;
            let session = env.begin().await?;
            let result = self.run(&session).await;
            finish(session, result).await
        })
    }

    async fn run(&self, session: &Session<'_>) -> anyhow::Result<()> {
        match &self.command {
            InstrumentsCommands::Load(args) => {
                let provenance = session.provenance();
                let declarations = load_instruments(&args.file)?;
                let mut created = 0;
                for decl in &declarations {
                    if provenance.fetch_instrument(&decl.name).await?.is_some() {
                        info!("Instrument '{}' already exists, skipping", decl.name);
                        continue;
                    }
                    provenance
                        .insert_instrument(&NewInstrument::from_decl(decl)?)
                        .await?;
                    created += 1;
                }
                success(&format!(
                    "Inserted {} of {} declared instruments",
                    created,
                    declarations.len()
                ));
            }
        }
        Ok(())
    }
}
