pub mod assemble;
pub mod classify;
pub mod coaches;
pub mod config;
pub mod db;
pub mod decode;
pub mod emit;
pub mod error;
pub mod export;
pub mod models;
pub mod periods;
pub mod pipeline;
pub mod report;
pub mod sql;
pub mod store;
pub mod workbook;

pub use error::{MigrationError, Stage};
