//! Input side of the catalog
//!
//! Everything here turns files on disk into plain records: data points,
//! package metadata and the datatype/instrument declaration lists. Nothing
//! in this crate touches the database.

pub mod declarations;
pub mod error;
pub mod info;
pub mod reader;
pub mod record;

pub use declarations::{DatatypeDecl, InstrumentDecl};
pub use error::{DataPkgError, DataPkgResult};
pub use info::{
    InstrumentInfo, OriginInfo, PackageInfo, ReferenceInfo, SanityTasks, SourceInfo,
};
pub use reader::{open_package, DataReader, JsonDataReader};
pub use record::{DataPoint, ErrValue, TimeValue};
