use anyhow::Context;
use clap::{Args, Subcommand};
use stardb_catalog::{Session, SkyCoord};
use std::path::PathBuf;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::print_row;

#[derive(Args)]
pub struct SearchCommand {
    #[command(subcommand)]
    command: SearchCommands,
}

#[derive(Subcommand)]
enum SearchCommands {
    /// Stars of a dataset inside a box around each listed position
    Boxmatch(BoxmatchArgs),
}

#[derive(Args)]
struct BoxmatchArgs {
    /// Side of the box in degrees
    side: f64,

    dataset: String,

    /// One position per line: decimal degrees or sexagesimal RA and Dec.
    /// Empty lines and lines starting with `#` are ignored.
    file: PathBuf,
}

impl SearchCommand {
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
            SearchCommands::Boxmatch(args) => {
                let positions = std::fs::read_to_string(&args.file)
                    .with_context(|| format!("Failed to read {}", args.file.display()))?;
                let query = session.query();
                print_row(["line", "position", "star", "ra_deg", "dec_deg"]);
                for (index, line) in positions.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    let center = SkyCoord::parse_pair(line)
                        .with_context(|| format!("Line {} of {}", index + 1, args.file.display()))?;
                    for m in query
                        .fetch_box_match(&args.dataset, &center, args.side)
                        .await?
                    {
                        print_row([
                            (index + 1).to_string(),
                            line.to_string(),
                            m.name,
                            m.ra_deg.to_string(),
                            m.dec_deg.to_string(),
                        ]);
                    }
                }
            }
        }
        Ok(())
    }
}
