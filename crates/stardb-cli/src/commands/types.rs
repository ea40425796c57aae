use clap::{Args, Subcommand};
use stardb_catalog::{NewDatatype, Session};
use stardb_datapkg::declarations::load_datatypes;
use std::path::PathBuf;
use tracing::info;

use super::catalog::{block_on, finish, CatalogEnv, GlobalOptions};
use super::output::{print_row, success};

#[derive(Args)]
pub struct TypesCommand {
    #[command(subcommand)]
    command: TypesCommands,
}

#[derive(Subcommand)]
enum TypesCommands {
    /// Create the datatypes declared in a file, skipping existing ones
    Load(LoadTypesArgs),
    /// Drop datatypes with all their values; `*` drops every datatype
    Drop(DropTypesArgs),
    /// List datatypes
    List,
}

#[derive(Args)]
struct LoadTypesArgs {
    /// Declaration file with a `datatypes` list
    file: PathBuf,
}

#[derive(Args)]
struct DropTypesArgs {
    #[arg(required = true)]
    names: Vec<String>,
}

impl TypesCommand {
    pub fn execute(self, options: &GlobalOptions) -> anyhow::Result<()> {
        block_on(async {
            let env = CatalogEnv::open(options).await?;
            let session = env.begin().await?;
            let result = self.run(&session).await;
            finish(session, result).await
        })
    }

    async fn run(&self, session: &Session<'_>) -> anyhow::Result<()> {
        let registry = session.datatypes();
        match &self.command {
            TypesCommands::Load(args) => {
                let declarations = load_datatypes(&args.file)?;
                let mut created = 0;
                for decl in &declarations {
                    if registry.fetch(&decl.name).await?.is_some() {
                        info!("Datatype '{}' already exists, skipping", decl.name);
                        continue;
                    }
                    registry.insert(&NewDatatype::from_decl(decl)?).await?;
                    created += 1;
                }
                success(&format!(
                    "Created {} of {} declared datatypes",
                    created,
                    declarations.len()
                ));
            }
            TypesCommands::Drop(args) => {
                let names = if args.names.iter().any(|n| n == "*") {
                    registry
                        .fetch_all()
                        .await?
                        .into_iter()
                        .map(|d| d.name)
                        .collect()
                } else {
                    args.names.clone()
                };
                for name in &names {
                    registry.drop(name).await?;
                }
                success(&format!("Dropped {} datatypes", names.len()));
            }
            TypesCommands::List => {
                print_row(["name", "kind", "unit", "description"]);
                for datatype in registry.fetch_all().await? {
                    print_row([
                        datatype.name,
                        datatype.kind.to_string(),
                        datatype.unit,
                        datatype.description,
                    ]);
                }
            }
        }
        Ok(())
    }
}
