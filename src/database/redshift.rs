//! Redshift warehouse backend implementation
//!
//! Redshift speaks the PostgreSQL wire protocol, so the backend is a single
//! `tokio-postgres` session. Statements go through the simple query protocol:
//! `COPY ... FROM 's3://...'` and the placement directives are Redshift-only
//! syntax that cannot be prepared, and every statement runs in autocommit.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::SimpleQueryMessage;

use super::config::ClusterSection;
use super::statement::{Dialect, Statement};
use super::{QueryResult, WarehouseBackend, WarehouseError, WarehouseResult};

/// Redshift warehouse backend
pub struct RedshiftBackend {
    /// Connection target without the password
    target: String,
    client: Arc<Mutex<tokio_postgres::Client>>,
}

impl RedshiftBackend {
    /// Open a session against the configured cluster
    ///
    /// Must be called inside a tokio runtime: the connection driver is
    /// spawned as a background task.
    pub async fn connect(cluster: &ClusterSection) -> WarehouseResult<Self> {
        let target = cluster.describe();

        let (client, connection) = tokio_postgres::Config::new()
            .host(&cluster.host)
            .port(cluster.db_port)
            .dbname(&cluster.db_name)
            .user(&cluster.db_user)
            .password(&cluster.db_password)
            .application_name("songplay-etl")
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| {
                WarehouseError::ConnectionFailed(format!(
                    "Failed to connect to Redshift at {}: {}",
                    target, e
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Redshift connection error: {}", e);
            }
        });

        tracing::debug!("Connected to Redshift at {}", target);

        Ok(Self {
            target,
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Connection target (user@host:port/db), never including the password
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn simple_query(&self, sql: &str) -> WarehouseResult<Vec<SimpleQueryMessage>> {
        let client = self.client.lock().await;

        if client.is_closed() {
            return Err(WarehouseError::ConnectionFailed(format!(
                "Session to {} is closed",
                self.target
            )));
        }

        client.simple_query(sql).await.map_err(|e| {
            if client.is_closed() {
                WarehouseError::ConnectionFailed(format!("Session lost: {}", e))
            } else {
                WarehouseError::QueryFailed(format!("Execute failed: {}", e))
            }
        })
    }

    /// Convert a text-protocol row to a JSON value
    ///
    /// The simple query protocol returns every value as text; numeric-looking
    /// values are kept as strings and parsed by the caller where needed.
    fn row_to_json(row: &tokio_postgres::SimpleQueryRow, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = match row.get(i) {
                Some(text) => serde_json::Value::String(text.to_string()),
                None => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }
}

#[async_trait(?Send)]
impl WarehouseBackend for RedshiftBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Redshift
    }

    async fn execute(&self, statement: &Statement) -> WarehouseResult<u64> {
        let messages = self.simple_query(&statement.sql).await?;

        let affected = messages
            .iter()
            .map(|message| match message {
                SimpleQueryMessage::CommandComplete(n) => *n,
                _ => 0,
            })
            .sum();

        Ok(affected)
    }

    async fn query(&self, sql: &str) -> WarehouseResult<QueryResult> {
        let start = std::time::Instant::now();
        let messages = self.simple_query(sql).await?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        for message in &messages {
            if let SimpleQueryMessage::Row(row) = message {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                rows.push(Self::row_to_json(row, &columns));
            }
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> WarehouseResult<bool> {
        let result = self.query("SELECT 1 AS healthy").await?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "redshift"
    }

    async fn close(&self) -> WarehouseResult<()> {
        // The session ends when the client is dropped
        Ok(())
    }
}
