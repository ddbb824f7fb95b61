//! Configuration management for phpbridge

mod settings;
pub mod validation;

// Re-export main types
pub use settings::{
    AggregationKind, CONFIG_FILE_NAMES, Config, DependencySpec, PharSettings, PhpSettings,
    PhpunitSettings,
};
pub use validation::{ConfigValidator, ValidationRule};
