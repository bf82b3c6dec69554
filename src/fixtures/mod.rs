pub mod builder;
pub mod classify;
pub mod error;
pub mod exporter;
pub mod format;
pub mod importer;
pub mod models;
