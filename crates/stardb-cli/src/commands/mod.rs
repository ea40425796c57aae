pub mod catalog;
pub mod check;
pub mod dataset;
pub mod ingest;
pub mod instruments;
pub mod output;
pub mod query;
pub mod search;
pub mod source;
pub mod types;

pub use catalog::GlobalOptions;
pub use check::CheckCommand;
pub use dataset::DatasetCommand;
pub use ingest::IngestCommand;
pub use instruments::InstrumentsCommand;
pub use query::QueryCommand;
pub use search::SearchCommand;
pub use source::SourceCommand;
pub use types::TypesCommand;
