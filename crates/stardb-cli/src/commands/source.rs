use clap::{Args, Subcommand};
use stardb_catalog::Session;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::success;

#[derive(Args)]
pub struct SourceCommand {
    #[command(subcommand)]
    command: SourceCommands,
}

#[derive(Subcommand)]
enum SourceCommands {
    /// Drop sources with every value, timeseries and dataset derived from them
    Drop(DropSourceArgs),
}

#[derive(Args)]
struct DropSourceArgs {
    #[arg(required = true)]
    names: Vec<String>,
}

impl SourceCommand {
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
            SourceCommands::Drop(args) => {
                let provenance = session.provenance();
                for name in &args.names {
                    let deletion = provenance.delete_source(name).await?;
                    success(&format!(
                        "Dropped source '{}': {} properties, {} values, {} timeseries",
                        name, deletion.properties, deletion.values, deletion.timeseries
                    ));
                }
            }
        }
        Ok(())
    }
}
