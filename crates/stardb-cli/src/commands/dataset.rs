use clap::{Args, Subcommand};
use stardb_catalog::Session;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::success;

#[derive(Args)]
pub struct DatasetCommand {
    #[command(subcommand)]
    command: DatasetCommands,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Map every property of a source into the dataset of the same name
    Rebuild(RebuildArgs),
}

#[derive(Args)]
struct RebuildArgs {
    /// Source name
    source: String,
}

impl DatasetCommand {
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
            DatasetCommands::Rebuild(args) => {
                let rebuilt = session.datasets().rebuild(&args.source).await?;
                success(&format!(
                    "Dataset '{}' maps {} properties",
                    rebuilt.dataset.name, rebuilt.mapped
                ));
            }
        }
        Ok(())
    }
}
