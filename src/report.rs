//! Forwarding device status replies to a relational store.
//!
//! A reply line is split into a one-character status and an identifying
//! code, then applied as a single parameterized `UPDATE` keyed by the code.

use crate::config::{is_sql_identifier, StoreConfig};
use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a [`StatusSink`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be established.
    #[error("status store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The update statement was rejected.
    #[error("status update failed: {0}")]
    WriteFailed(#[source] sqlx::Error),

    /// A configured table or column name is not a plain identifier.
    #[error("invalid store identifier: '{0}'")]
    InvalidIdentifier(String),
}

/// A parsed device reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// First byte of the reply, absent for an empty reply.
    pub status: Option<u8>,
    /// Every byte after the first.
    pub code: Vec<u8>,
}

impl StatusReport {
    /// Split a reply line into status and code.
    pub fn parse(line: &[u8]) -> Self {
        match line.split_first() {
            Some((&status, code)) => Self {
                status: Some(status),
                code: code.to_vec(),
            },
            None => Self {
                status: None,
                code: Vec::new(),
            },
        }
    }

    /// The status as bound to the text column: one byte, or empty.
    pub fn status_text(&self) -> String {
        self.status
            .map(|b| String::from_utf8_lossy(&[b]).into_owned())
            .unwrap_or_default()
    }

    /// The code as bound to the text column.
    pub fn code_text(&self) -> String {
        String::from_utf8_lossy(&self.code).into_owned()
    }
}

/// Destination for status reports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Apply one report. Returns the number of records updated.
    async fn report(&self, report: &StatusReport) -> Result<u64, StoreError>;
}

/// [`StatusSink`] backed by any database sqlx can reach through its `Any` driver.
///
/// Opens one connection per report and closes it afterwards.
#[derive(Debug, Clone)]
pub struct SqlStatusStore {
    url: String,
    statement: String,
}

impl SqlStatusStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        for name in [&config.table, &config.status_column, &config.code_column] {
            if !is_sql_identifier(name) {
                return Err(StoreError::InvalidIdentifier(name.clone()));
            }
        }
        Ok(Self {
            url: config.url.clone(),
            statement: format!(
                "UPDATE {} SET {} = ? WHERE {} = ?",
                config.table, config.status_column, config.code_column
            ),
        })
    }

    /// The parameterized update issued for every report.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Create the device table if it does not exist yet.
    pub async fn ensure_schema(config: &StoreConfig) -> Result<(), StoreError> {
        // validates identifiers before they reach the DDL
        Self::new(config)?;
        sqlx::any::install_default_drivers();

        let mut conn = AnyConnection::connect(&config.url)
            .await
            .map_err(StoreError::Unavailable)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(64) PRIMARY KEY, {} VARCHAR(8))",
            config.table, config.code_column, config.status_column
        );
        let result = sqlx::query(&ddl)
            .execute(&mut conn)
            .await
            .map_err(StoreError::WriteFailed);
        if let Err(e) = conn.close().await {
            debug!(error = %e, "closing store connection failed");
        }
        result.map(|_| ())
    }
}

#[async_trait]
impl StatusSink for SqlStatusStore {
    async fn report(&self, report: &StatusReport) -> Result<u64, StoreError> {
        sqlx::any::install_default_drivers();

        let mut conn = AnyConnection::connect(&self.url)
            .await
            .map_err(StoreError::Unavailable)?;

        let code = report.code_text();
        debug!(statement = %self.statement, status = ?report.status, code = %code, "updating status");
        let result = sqlx::query(&self.statement)
            .bind(report.status_text())
            .bind(code.as_str())
            .execute(&mut conn)
            .await
            .map_err(StoreError::WriteFailed);

        if let Err(e) = conn.close().await {
            debug!(error = %e, "closing store connection failed");
        }

        let affected = result?.rows_affected();
        if affected == 0 {
            warn!(code = %code, "status update matched no records");
        }
        Ok(affected)
    }
}
