pub mod database;

pub use database::{
    Database, PoolConfig, ReportSummary, SharedDatabase, StoredReport, StoredSection,
};
