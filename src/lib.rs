pub mod analyzer;
pub mod appraise;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod rules;
pub mod storage;

pub use appraise::{Appraisal, Appraiser, Verdict};
pub use config::ConfigTables;
pub use errors::{AppraiserError, Result};
pub use models::Item;
pub use parser::ItemTextParser;
