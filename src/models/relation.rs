//! Relation catalogue: the staging tables and the star schema

use serde::{Deserialize, Serialize};

use super::column::{ColumnDef, ColumnType};

/// Role a relation plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Transient landing table for raw records
    Staging,
    /// Fact table (play events)
    Fact,
    /// Dimension table referenced by facts
    Dimension,
}

/// Storage-layer row distribution directive
///
/// Only Redshift renders these; they never change query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Distribution {
    /// Let the warehouse choose
    Auto,
    /// Copy the whole table to every node
    All,
    /// Distribute rows by the hash of a column
    Key(&'static str),
}

/// Every relation managed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    StagingEvents,
    StagingSongs,
    Songplays,
    Users,
    Songs,
    Artists,
    Time,
}

const STAGING_EVENTS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("artist", ColumnType::VarChar(255)),
    ColumnDef::new("auth", ColumnType::VarChar(50)),
    ColumnDef::new("firstName", ColumnType::VarChar(100)),
    ColumnDef::new("gender", ColumnType::Char(1)),
    ColumnDef::new("itemInSession", ColumnType::Integer),
    ColumnDef::new("lastName", ColumnType::VarChar(100)),
    ColumnDef::new("length", ColumnType::Double),
    ColumnDef::new("level", ColumnType::VarChar(10)),
    ColumnDef::new("location", ColumnType::VarChar(255)),
    ColumnDef::new("method", ColumnType::VarChar(10)),
    ColumnDef::new("page", ColumnType::VarChar(50)),
    ColumnDef::new("registration", ColumnType::BigInt),
    ColumnDef::new("sessionId", ColumnType::Integer),
    ColumnDef::new("song", ColumnType::VarChar(255)),
    ColumnDef::new("status", ColumnType::Integer),
    ColumnDef::new("ts", ColumnType::BigInt),
    ColumnDef::new("userAgent", ColumnType::VarChar(512)),
    ColumnDef::new("userId", ColumnType::Integer).blank_as_null(),
];

const STAGING_SONGS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("artist_id", ColumnType::VarChar(20)),
    ColumnDef::new("artist_latitude", ColumnType::Double),
    ColumnDef::new("artist_location", ColumnType::VarChar(255)),
    ColumnDef::new("artist_longitude", ColumnType::Double),
    ColumnDef::new("artist_name", ColumnType::VarChar(255)),
    ColumnDef::new("duration", ColumnType::Double),
    ColumnDef::new("num_songs", ColumnType::Integer),
    ColumnDef::new("song_id", ColumnType::VarChar(20)),
    ColumnDef::new("title", ColumnType::VarChar(255)),
    ColumnDef::new("year", ColumnType::Integer),
];

const SONGPLAYS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("songplay_id", ColumnType::BigInt).identity(),
    ColumnDef::new("start_time", ColumnType::BigInt).not_null(),
    ColumnDef::new("user_id", ColumnType::Integer).not_null(),
    ColumnDef::new("level", ColumnType::VarChar(10)).not_null(),
    ColumnDef::new("song_id", ColumnType::VarChar(20)),
    ColumnDef::new("artist_id", ColumnType::VarChar(20)),
    ColumnDef::new("session_id", ColumnType::Integer).not_null(),
    ColumnDef::new("location", ColumnType::VarChar(255)).not_null(),
    ColumnDef::new("user_agent", ColumnType::VarChar(512)).not_null(),
];

const USERS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("user_id", ColumnType::Integer).not_null(),
    ColumnDef::new("first_name", ColumnType::VarChar(255)).not_null(),
    ColumnDef::new("last_name", ColumnType::VarChar(255)).not_null(),
    ColumnDef::new("gender", ColumnType::Char(1)).not_null(),
    ColumnDef::new("level", ColumnType::VarChar(10)).not_null(),
];

const SONGS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("song_id", ColumnType::VarChar(20)).not_null(),
    ColumnDef::new("title", ColumnType::VarChar(255)).not_null(),
    ColumnDef::new("artist_id", ColumnType::VarChar(20)).not_null(),
    ColumnDef::new("year", ColumnType::Integer).not_null(),
    ColumnDef::new("duration", ColumnType::Decimal(10, 5)).not_null(),
];

const ARTISTS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("artist_id", ColumnType::VarChar(20)).not_null(),
    ColumnDef::new("name", ColumnType::VarChar(255)).not_null(),
    ColumnDef::new("location", ColumnType::VarChar(255)),
    ColumnDef::new("latitude", ColumnType::Decimal(10, 5)),
    ColumnDef::new("longitude", ColumnType::Decimal(10, 5)),
];

const TIME_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("start_time", ColumnType::BigInt).not_null(),
    ColumnDef::new("hour", ColumnType::Integer).not_null(),
    ColumnDef::new("day", ColumnType::Integer).not_null(),
    ColumnDef::new("week", ColumnType::Integer).not_null(),
    ColumnDef::new("month", ColumnType::Integer).not_null(),
    ColumnDef::new("year", ColumnType::Integer).not_null(),
    ColumnDef::new("weekday", ColumnType::Integer).not_null(),
];

impl Relation {
    /// All relations in drop/create order: staging first, then the star schema
    pub const ALL: [Relation; 7] = [
        Relation::StagingEvents,
        Relation::StagingSongs,
        Relation::Songplays,
        Relation::Users,
        Relation::Songs,
        Relation::Artists,
        Relation::Time,
    ];

    /// Warehouse table name
    pub fn name(self) -> &'static str {
        match self {
            Relation::StagingEvents => "staging_events",
            Relation::StagingSongs => "staging_songs",
            Relation::Songplays => "songplays",
            Relation::Users => "users",
            Relation::Songs => "songs",
            Relation::Artists => "artists",
            Relation::Time => "time",
        }
    }

    /// Table name quoted as an identifier (`time` is a keyword in both dialects)
    pub fn ident(self) -> String {
        format!("\"{}\"", self.name())
    }

    pub fn kind(self) -> RelationKind {
        match self {
            Relation::StagingEvents | Relation::StagingSongs => RelationKind::Staging,
            Relation::Songplays => RelationKind::Fact,
            Relation::Users | Relation::Songs | Relation::Artists | Relation::Time => {
                RelationKind::Dimension
            }
        }
    }

    /// Column definitions in table order
    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            Relation::StagingEvents => STAGING_EVENTS_COLUMNS,
            Relation::StagingSongs => STAGING_SONGS_COLUMNS,
            Relation::Songplays => SONGPLAYS_COLUMNS,
            Relation::Users => USERS_COLUMNS,
            Relation::Songs => SONGS_COLUMNS,
            Relation::Artists => ARTISTS_COLUMNS,
            Relation::Time => TIME_COLUMNS,
        }
    }

    /// Columns the pipeline writes (identity columns are generated by the warehouse)
    pub fn insert_columns(self) -> Vec<&'static str> {
        self.columns()
            .iter()
            .filter(|c| !c.identity)
            .map(|c| c.name)
            .collect()
    }

    pub fn distribution(self) -> Distribution {
        match self {
            Relation::StagingEvents | Relation::StagingSongs => Distribution::Auto,
            Relation::Songplays => Distribution::Key("user_id"),
            Relation::Users => Distribution::All,
            Relation::Songs => Distribution::Key("song_id"),
            Relation::Artists => Distribution::Key("artist_id"),
            Relation::Time => Distribution::Key("start_time"),
        }
    }

    pub fn sort_key(self) -> Option<&'static str> {
        match self {
            Relation::Songplays | Relation::Time => Some("start_time"),
            _ => None,
        }
    }

    /// Look up a relation by its table name
    pub fn from_name(name: &str) -> Option<Relation> {
        Relation::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
