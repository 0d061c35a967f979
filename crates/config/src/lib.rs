// Configuration loading

pub mod error;
pub mod labels;
pub mod settings;

pub use error::ConfigError;
pub use labels::Labels;
pub use settings::{
    ClassificationSettings, DatabaseSettings, Locale, SalesSchema, Settings, TableSource,
};
