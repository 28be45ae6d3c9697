//! Pipeline configuration file support
//!
//! Handles parsing of `warehouse.toml` configuration files and environment
//! variable overrides. The configuration is read once at process start and
//! handed to every component by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::statement::Dialect;
use super::{WarehouseError, WarehouseResult};
use crate::validation::input::{
    validate_iam_role_arn, validate_object_store_uri, validate_region,
};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "warehouse.toml";

/// Default database filename for DuckDB
pub const DEFAULT_DUCKDB_FILENAME: &str = "songplay.duckdb";

/// Default Redshift port
pub const DEFAULT_REDSHIFT_PORT: u16 = 5439;

/// Environment variable for the backend type
pub const ENV_BACKEND: &str = "SONGPLAY_WAREHOUSE_BACKEND";

/// Environment variable for the DuckDB path
pub const ENV_DUCKDB_PATH: &str = "SONGPLAY_WAREHOUSE_DUCKDB_PATH";

/// Environment variable for the cluster host
pub const ENV_HOST: &str = "SONGPLAY_WAREHOUSE_HOST";

/// Environment variable for the cluster password
pub const ENV_DB_PASSWORD: &str = "SONGPLAY_WAREHOUSE_DB_PASSWORD";

/// Environment variable for the delegated role ARN
pub const ENV_IAM_ROLE_ARN: &str = "SONGPLAY_WAREHOUSE_IAM_ROLE_ARN";

/// Warehouse backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Amazon Redshift cluster (default)
    #[default]
    Redshift,
    /// Embedded DuckDB database file
    DuckDB,
}

impl BackendType {
    /// SQL dialect the backend speaks
    pub fn dialect(self) -> Dialect {
        match self {
            BackendType::Redshift => Dialect::Redshift,
            BackendType::DuckDB => Dialect::DuckDb,
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redshift" => Ok(BackendType::Redshift),
            "duckdb" => Ok(BackendType::DuckDB),
            _ => Err(format!(
                "Unknown warehouse backend: {}. Use 'redshift' or 'duckdb'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Redshift => write!(f, "redshift"),
            BackendType::DuckDB => write!(f, "duckdb"),
        }
    }
}

/// Warehouse configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSection {
    /// Backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Path to the DuckDB database file (relative to the config file)
    #[serde(default = "default_duckdb_path")]
    pub path: String,
}

fn default_duckdb_path() -> String {
    DEFAULT_DUCKDB_FILENAME.to_string()
}

impl Default for WarehouseSection {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            path: default_duckdb_path(),
        }
    }
}

/// Redshift cluster connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct ClusterSection {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub db_user: String,
    #[serde(default)]
    pub db_password: String,
    #[serde(default = "default_port")]
    pub db_port: u16,
}

fn default_port() -> u16 {
    DEFAULT_REDSHIFT_PORT
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            db_name: String::new(),
            db_user: String::new(),
            db_password: String::new(),
            db_port: default_port(),
        }
    }
}

impl ClusterSection {
    /// Connection target with the password left out, for logs
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.db_user, self.host, self.db_port, self.db_name
        )
    }
}

impl std::fmt::Debug for ClusterSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSection")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"****")
            .field("db_port", &self.db_port)
            .finish()
    }
}

/// Delegated access role the warehouse assumes to read object storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IamRoleSection {
    #[serde(default)]
    pub arn: String,
}

impl IamRoleSection {
    /// Role ARN with surrounding quotes and whitespace removed
    ///
    /// Config files written for the older INI format often keep the quotes.
    pub fn role_arn(&self) -> &str {
        self.arn.trim().trim_matches(|c| c == '\'' || c == '"')
    }
}

/// Source locations for the staging loads
///
/// For Redshift these are `s3://` URIs; for DuckDB they are local file globs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesSection {
    /// Event log records
    #[serde(default = "default_log_data")]
    pub log_data: String,

    /// JSONPaths document mapping event-log fields to staging columns.
    /// Unset means `auto` field matching.
    #[serde(default)]
    pub log_jsonpath: Option<String>,

    /// Song catalog records
    #[serde(default = "default_song_data")]
    pub song_data: String,

    /// Region of the source bucket
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_log_data() -> String {
    "s3://udacity-dend/log_data".to_string()
}

fn default_song_data() -> String {
    "s3://udacity-dend/song_data".to_string()
}

fn default_region() -> String {
    "us-west-2".to_string()
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            log_data: default_log_data(),
            log_jsonpath: Some("s3://udacity-dend/log_json_path.json".to_string()),
            song_data: default_song_data(),
            region: default_region(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `warehouse.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Backend selection
    #[serde(default)]
    pub warehouse: WarehouseSection,

    /// Redshift connection parameters
    #[serde(default)]
    pub cluster: ClusterSection,

    /// Delegated access role for bulk loads
    #[serde(default)]
    pub iam_role: IamRoleSection,

    /// Staging source locations
    #[serde(default)]
    pub s3: SourcesSection,
}

impl PipelineConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DuckDB configuration reading local JSON files
    pub fn duckdb(
        path: impl Into<String>,
        log_data: impl Into<String>,
        song_data: impl Into<String>,
    ) -> Self {
        Self {
            warehouse: WarehouseSection {
                backend: BackendType::DuckDB,
                path: path.into(),
            },
            s3: SourcesSection {
                log_data: log_data.into(),
                log_jsonpath: None,
                song_data: song_data.into(),
                region: default_region(),
            },
            ..Default::default()
        }
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn load(config_path: &Path) -> WarehouseResult<Self> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            WarehouseError::IoError(format!(
                "Failed to read config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> WarehouseResult<Self> {
        toml::from_str(content)
            .map_err(|e| WarehouseError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a file
    pub fn save(&self, config_path: &Path) -> WarehouseResult<()> {
        let content = self.to_toml()?;

        std::fs::write(config_path, content)
            .map_err(|e| WarehouseError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> WarehouseResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            WarehouseError::ConfigError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var(ENV_BACKEND)
            && let Ok(backend_type) = backend.parse()
        {
            self.warehouse.backend = backend_type;
        }

        if let Ok(path) = std::env::var(ENV_DUCKDB_PATH) {
            self.warehouse.path = path;
        }

        if let Ok(host) = std::env::var(ENV_HOST) {
            self.cluster.host = host;
        }

        if let Ok(password) = std::env::var(ENV_DB_PASSWORD) {
            self.cluster.db_password = password;
        }

        if let Ok(arn) = std::env::var(ENV_IAM_ROLE_ARN) {
            self.iam_role.arn = arn;
        }
    }

    /// SQL dialect of the configured backend
    pub fn dialect(&self) -> Dialect {
        self.warehouse.backend.dialect()
    }

    /// Resolve the DuckDB path relative to the directory holding the config
    pub fn get_duckdb_path(&self, base_dir: &Path) -> PathBuf {
        if self.warehouse.path.is_empty() {
            base_dir.join(DEFAULT_DUCKDB_FILENAME)
        } else if Path::new(&self.warehouse.path).is_absolute() {
            PathBuf::from(&self.warehouse.path)
        } else {
            base_dir.join(&self.warehouse.path)
        }
    }

    /// Check the configuration before any connection is attempted
    pub fn validate(&self) -> WarehouseResult<()> {
        let invalid = |e: crate::validation::input::ValidationError| {
            WarehouseError::ConfigError(e.to_string())
        };

        if self.s3.log_data.trim().is_empty() {
            return Err(WarehouseError::ConfigError(
                "s3.log_data cannot be empty".to_string(),
            ));
        }
        if self.s3.song_data.trim().is_empty() {
            return Err(WarehouseError::ConfigError(
                "s3.song_data cannot be empty".to_string(),
            ));
        }

        if self.warehouse.backend == BackendType::Redshift {
            for (field, value) in [
                ("cluster.host", &self.cluster.host),
                ("cluster.db_name", &self.cluster.db_name),
                ("cluster.db_user", &self.cluster.db_user),
            ] {
                if value.trim().is_empty() {
                    return Err(WarehouseError::ConfigError(format!(
                        "{} is required for the redshift backend",
                        field
                    )));
                }
            }
            if self.cluster.db_port == 0 {
                return Err(WarehouseError::ConfigError(
                    "cluster.db_port must be non-zero".to_string(),
                ));
            }

            validate_iam_role_arn(self.iam_role.role_arn()).map_err(invalid)?;
            validate_object_store_uri("s3.log_data", &self.s3.log_data).map_err(invalid)?;
            validate_object_store_uri("s3.song_data", &self.s3.song_data).map_err(invalid)?;
            if let Some(jsonpath) = &self.s3.log_jsonpath {
                validate_object_store_uri("s3.log_jsonpath", jsonpath).map_err(invalid)?;
            }
            validate_region(&self.s3.region).map_err(invalid)?;
        }

        Ok(())
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# songplay-warehouse configuration

[warehouse]
# Backend: "redshift" (default) or "duckdb"
backend = "redshift"

# DuckDB database file (duckdb backend only, relative to this file)
path = "songplay.duckdb"

[cluster]
host = "dwhcluster.example.us-west-2.redshift.amazonaws.com"
db_name = "dwh"
db_user = "dwhuser"
# Prefer SONGPLAY_WAREHOUSE_DB_PASSWORD over storing the password here
db_password = ""
db_port = 5439

[iam_role]
# Role the cluster assumes to read the source bucket
arn = "arn:aws:iam::123456789012:role/dwhRole"

[s3]
log_data = "s3://udacity-dend/log_data"
log_jsonpath = "s3://udacity-dend/log_json_path.json"
song_data = "s3://udacity-dend/song_data"
region = "us-west-2"
"#
}
