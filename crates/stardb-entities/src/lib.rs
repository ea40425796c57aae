pub mod struct_kind;

// Stars and their identifiers
pub mod star;
pub mod star_alias;

// Provenance
pub mod reference;
pub mod origin;
pub mod source;
pub mod instrument;

// Datatypes and facts
pub mod datatype;
pub mod property;
pub mod timeseries;

// Derived datasets
pub mod dataset;
pub mod dataset_map;

pub use struct_kind::StructKind;
