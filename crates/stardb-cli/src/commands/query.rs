use clap::{Args, Subcommand};
use stardb_catalog::{Session, TableOptions};

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::{optional, print_row, print_table};

#[derive(Args)]
pub struct QueryCommand {
    #[command(subcommand)]
    command: QueryCommands,
}

#[derive(Subcommand)]
enum QueryCommands {
    /// One row per star of a dataset, one column per datatype
    Table(TableArgs),
    /// Timepoints of one star, oldest first
    Timeseries(TimeseriesArgs),
    /// Every value of a datatype with its provenance
    Data(DataArgs),
}

#[derive(Args)]
struct TableArgs {
    dataset: String,

    #[arg(required = true)]
    datatypes: Vec<String>,

    /// Only list stars that have every requested datatype
    #[arg(long)]
    no_nulls: bool,

    /// Add lower and upper error columns for measured datatypes
    #[arg(long)]
    errors: bool,
}

#[derive(Args)]
struct TimeseriesArgs {
    datatype: String,
    star: String,

    /// Restrict to one source
    #[arg(long)]
    source: Option<String>,
}

#[derive(Args)]
struct DataArgs {
    datatype: String,
}

impl QueryCommand {
    pub fn execute(self, options: &GlobalOptions) -> anyhow::Result<()> {
        block_on(async {
            let env = CatalogEnv::open(options).await?;
            let session = env.begin().await?;
            let result = self.run(&session).await;
            finish(session, result).await
        })
    }

    async fn run(&self, session: &Session<'_>) -> anyhow::Result<()> {
        let query = session.query();
        match &self.command {
            QueryCommands::Table(args) => {
                let table = query
                    .fetch_table(
                        &args.dataset,
                        &args.datatypes,
                        TableOptions {
                            include_nulls: !args.no_nulls,
                            include_errors: args.errors,
                        },
                    )
                    .await?;
                print_table(&table);
            }
            QueryCommands::Timeseries(args) => {
                let points = query
                    .fetch_timeseries(&args.datatype, &args.star, args.source.as_deref())
                    .await?;
                print_row(["obs_time", "value", "errlo", "errhi", "obs_duration", "source"]);
                for p in points {
                    print_row([
                        p.obs_time.to_rfc3339(),
                        p.value.to_string(),
                        optional(p.errlo),
                        optional(p.errhi),
                        optional(p.obs_duration),
                        p.source,
                    ]);
                }
            }
            QueryCommands::Data(args) => {
                let values = query.fetch_data(&args.datatype).await?;
                print_row([
                    "star",
                    "value",
                    "reference",
                    "origin",
                    "origin_kind",
                    "instrument",
                ]);
                for v in values {
                    print_row([
                        v.star,
                        v.value.to_string(),
                        v.reference,
                        v.origin,
                        v.origin_kind,
                        v.instrument.unwrap_or_default(),
                    ]);
                }
            }
        }
        Ok(())
    }
}
