use clap::Args;
use stardb_catalog::{CatalogError, Session, VersionFilter};

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::success;

#[derive(Args)]
pub struct CheckCommand {
    /// Datatype every star must have
    datatype: String,

    /// Source name; the most recent source of that name is checked
    source: String,
}

impl CheckCommand {
    pub fn execute(self, options: &GlobalOptions) -> anyhow::Result<()> {
        block_on(async {
            let env = CatalogEnv::open(options).await?;
            let session = env.begin().await?;
            let result = self.run(&session).await;
            finish(session, result).await
        })
    }

    async fn run(&self, session: &Session<'_>) -> anyhow::Result<()> {
        let source = session
            .provenance()
            .fetch_source(&self.source, &VersionFilter::Any)
            .await?
            .ok_or_else(|| CatalogError::MissingData {
                entity: format!("Source '{}'", self.source),
            })?;
        session
            .sanity()
            .check_completeness(&self.datatype, source.id)
            .await?;
        success(&format!(
            "CHECK OK: every star of '{}' has '{}'",
            source.name, self.datatype
        ));
        Ok(())
    }
}
