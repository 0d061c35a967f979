//! `stocktally-core`: tabular dataset abstraction shared by the engine and its collaborators.

pub mod dataset;
pub mod error;
pub mod value;

pub use dataset::{Dataset, Record};
pub use error::DatasetError;
pub use value::{Key, Value};
