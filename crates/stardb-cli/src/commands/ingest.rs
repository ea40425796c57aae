use clap::Args;
use stardb_catalog::{CatalogError, FailurePolicy, Session};
use stardb_datapkg::{open_package, DataReader};
use std::path::PathBuf;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::{success, warning};

#[derive(Args)]
pub struct IngestCommand {
    /// Package directory (info.json + properties.json) or single-file package
    package: PathBuf,

    /// Version recorded on the new source
    #[arg(long)]
    version: Option<String>,

    /// Skip data points that fail instead of aborting the whole package
    #[arg(long)]
    skip_errors: bool,

    /// Fail data points naming stars that are not in the catalog yet
    #[arg(long)]
    no_create_stars: bool,

    /// Roll back when a sanity check of the package fails
    #[arg(long)]
    strict: bool,
}

impl IngestCommand {
    pub fn execute(self, options: &GlobalOptions) -> anyhow::Result<()> {
        block_on(async {
            let env = CatalogEnv::open(options).await?;
            let session = env.begin().await?;
            let result = self.run(&session).await;
            finish(session, result).await
        })
    }

    async fn run(&self, session: &Session<'_>) -> anyhow::Result<()> {
        let reader = open_package(&self.package)?.with_version(self.version.clone());
        let policy = if self.skip_errors {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        };

        let mut run = session.ingest_run(!self.no_create_stars);
        let (source, report) = run.ingest_package(&reader, policy).await?;
        success(&format!(
            "Source '{}': {} data points for {} stars ({} new)",
            source.name, report.data_points, report.stars, report.new_stars
        ));
        if report.failures > 0 {
            warning(&format!("{} data points were skipped", report.failures));
        }

        if let Some(tasks) = reader.info().sanity_check.as_ref().filter(|t| !t.is_empty()) {
            match session.sanity().run(tasks, &source).await {
                Ok(checked) => success(&format!(
                    "Sanity checks passed: {}",
                    checked.checked.join(", ")
                )),
                Err(err @ CatalogError::CompletenessViolation { .. }) if !self.strict => {
                    warning(&err.to_string())
                }
                Err(err) => return Err(err.into()),
            }
        }

        let rebuilt = session.datasets().rebuild(&source.name).await?;
        success(&format!(
            "Dataset '{}' maps {} properties",
            rebuilt.dataset.name, rebuilt.mapped
        ));
        Ok(())
    }
}
