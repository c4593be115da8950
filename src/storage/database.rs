//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite store for inspection history and the local billing ledger:
//! - Connection pooling via r2d2 for concurrent access
//! - Panic-safe transactions with automatic rollback
//! - WAL mode for optimal read/write performance
//!
//! [`Database`] is both the local [`ReportSink`] and the local [`ChargeSink`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::publish::{ChargeEvent, ChargeSink, ReportSink, content_digest};
use crate::report::InspectionReport;
use crate::tasks::{Rating, TaskCategory};
use crate::types::{
    InspectorError, ParseWithDefault, Result, ResultExt, RunId, enum_to_str, log_filter_warn,
};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version
const SCHEMA_VERSION: u32 = 1;

/// One row of the report history
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub run_id: String,
    pub actor_id: String,
    pub model: String,
    pub overall_rating: Rating,
    pub total_tokens: u64,
    pub digest: String,
    pub created_at: String,
}

/// Stored section of a report
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSection {
    pub category: TaskCategory,
    pub rating: Rating,
    pub gaps: Vec<String>,
}

/// A stored report with its sections
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub summary: ReportSummary,
    pub markdown: String,
    pub sections: Vec<StoredSection>,
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    /// A run writes a handful of rows; a small pool is plenty
    fn default() -> Self {
        Self {
            max_size: 4,
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl Database {
    /// Open database with connection pooling at the specified path.
    ///
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| {
                InspectorError::Storage(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for testing or temporary use.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
            InspectorError::Storage(format!("Failed to create in-memory pool: {}", e))
        })?;

        Ok(Self { pool })
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            InspectorError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Initialize database schema.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// All operations within the closure are atomic. If the closure panics,
    /// the transaction is automatically rolled back and an error is returned
    /// instead of poisoning the connection pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + std::panic::UnwindSafe,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(InspectorError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Store a report and its sections atomically.
    ///
    /// Fails if a report for `run_id` already exists.
    pub fn store_report(&self, run_id: &RunId, report: &InspectionReport) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let digest = content_digest(&report.markdown);

        self.transaction(|conn| {
            conn.execute(
                "INSERT INTO reports
                 (run_id, actor_id, model, overall_rating, summary, markdown, digest, total_tokens, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    run_id.as_str(),
                    report.actor.as_str(),
                    report.model,
                    enum_to_str(&report.overall),
                    report.summary,
                    report.markdown,
                    digest,
                    report.usage.total() as i64,
                    now,
                ],
            )
            .with_context_fn(|| format!("Failed to store report for run {}", run_id))?;

            for (position, result) in report.results.iter().enumerate() {
                conn.execute(
                    "INSERT INTO report_sections
                     (run_id, position, category, rating, body, gaps_json, input_tokens, output_tokens)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        run_id.as_str(),
                        position as i64,
                        enum_to_str(&result.category),
                        enum_to_str(&result.rating),
                        result.text,
                        serde_json::to_string(&result.gaps)?,
                        result.usage.input_tokens as i64,
                        result.usage.output_tokens as i64,
                    ],
                )
                .with_context("Failed to store report section")?;
            }
            Ok(())
        })?;

        tracing::debug!(
            "Stored report: run={}, actor={}, sections={}",
            run_id,
            report.actor,
            report.results.len()
        );
        Ok(())
    }

    fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportSummary> {
        let rating: String = row.get(3)?;
        let total_tokens: i64 = row.get(4)?;
        Ok(ReportSummary {
            run_id: row.get(0)?,
            actor_id: row.get(1)?,
            model: row.get(2)?,
            overall_rating: Rating::parse_or_default(&rating),
            total_tokens: total_tokens.max(0) as u64,
            digest: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    /// Most recent reports first, optionally for one Actor only.
    pub fn list_reports(&self, actor_id: Option<&str>, limit: usize) -> Result<Vec<ReportSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, actor_id, model, overall_rating, total_tokens, digest, created_at
                 FROM reports
                 WHERE ?1 IS NULL OR actor_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .with_context("Failed to prepare report history query")?;

        let rows = stmt
            .query_map(params![actor_id, limit as i64], Self::map_summary_row)
            .with_context("Failed to query report history")?;

        Ok(rows
            .filter_map(|r| log_filter_warn(r, "Skipping unreadable report row"))
            .collect())
    }

    /// Load one report with its sections.
    pub fn load_report(&self, run_id: &str) -> Result<StoredReport> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT run_id, actor_id, model, overall_rating, total_tokens, digest, created_at, markdown
                 FROM reports WHERE run_id = ?1",
                params![run_id],
                |row| Ok((Self::map_summary_row(row)?, row.get::<_, String>(7)?)),
            )
            .optional()
            .with_context("Failed to load report")?;

        let Some((summary, markdown)) = row else {
            return Err(InspectorError::ReportNotFound(run_id.to_string()));
        };

        let mut stmt = conn
            .prepare(
                "SELECT category, rating, gaps_json FROM report_sections
                 WHERE run_id = ?1 ORDER BY position",
            )
            .with_context("Failed to prepare section query")?;

        let sections = stmt
            .query_map(params![run_id], |row| {
                let category: String = row.get(0)?;
                let rating: String = row.get(1)?;
                let gaps_json: String = row.get(2)?;
                Ok(StoredSection {
                    category: TaskCategory::parse_or_default(&category),
                    rating: Rating::parse_or_default(&rating),
                    gaps: serde_json::from_str(&gaps_json).unwrap_or_default(),
                })
            })
            .with_context("Failed to query report sections")?
            .filter_map(|r| log_filter_warn(r, "Skipping unreadable section row"))
            .collect();

        Ok(StoredReport {
            summary,
            markdown,
            sections,
        })
    }

    /// Number of stored reports.
    pub fn count_reports(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .with_context("Failed to count reports")?;
        Ok(count as usize)
    }

    // =========================================================================
    // Charges
    // =========================================================================

    /// Append a billing event to the ledger.
    pub fn record_charge(&self, event: &ChargeEvent) -> Result<()> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn()?
            .execute(
                "INSERT INTO charges (id, run_id, event_name, count, price_usd, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    event.run_id.as_str(),
                    event.event_name,
                    event.count as i64,
                    event.price_usd,
                    now,
                ],
            )
            .with_context("Failed to record charge")?;

        tracing::debug!("Recorded charge: {} x{}", event.event_name, event.count);
        Ok(())
    }

    /// Charges of one run in emission order.
    pub fn charges_for_run(&self, run_id: &str) -> Result<Vec<ChargeEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, event_name, count, price_usd FROM charges
                 WHERE run_id = ?1 ORDER BY created_at, rowid",
            )
            .with_context("Failed to prepare charge query")?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                let run_id: String = row.get(0)?;
                let count: i64 = row.get(2)?;
                Ok(ChargeEvent {
                    run_id: RunId::new(run_id),
                    event_name: row.get(1)?,
                    count: count.max(0) as u32,
                    price_usd: row.get(3)?,
                })
            })
            .with_context("Failed to query charges")?;

        Ok(rows
            .filter_map(|r| log_filter_warn(r, "Skipping unreadable charge row"))
            .collect())
    }
}

#[async_trait]
impl ReportSink for Database {
    async fn persist(&self, run_id: &RunId, report: &InspectionReport) -> Result<()> {
        self.store_report(run_id, report)
    }
}

#[async_trait]
impl ChargeSink for Database {
    async fn charge(&self, event: &ChargeEvent) -> Result<()> {
        self.record_charge(event)
    }
}
