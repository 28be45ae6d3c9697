//! Staging-to-dimensional transformation
//!
//! Five insert-select statements populate the star schema from the staging
//! relations: the songplays fact, then the users, songs, artists and time
//! dimensions. Each statement commits on its own.

pub mod time;

pub use time::TimeParts;

use serde::{Deserialize, Serialize};

use crate::database::{Dialect, Statement, StatementKind};
use crate::models::Relation;
use crate::pipeline::{PipelineResult, StatementExecutor};

/// Dimension relations populated from staging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Users,
    Songs,
    Artists,
    Time,
}

impl Dimension {
    /// Population order after the fact relation
    pub const ALL: [Dimension; 4] = [
        Dimension::Users,
        Dimension::Songs,
        Dimension::Artists,
        Dimension::Time,
    ];

    pub fn relation(self) -> Relation {
        match self {
            Dimension::Users => Relation::Users,
            Dimension::Songs => Relation::Songs,
            Dimension::Artists => Relation::Artists,
            Dimension::Time => Relation::Time,
        }
    }
}

/// Builds and runs the star-schema inserts
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    dialect: Dialect,
}

impl Transformer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn insert_prefix(relation: Relation) -> String {
        format!(
            "INSERT INTO {} ({})",
            relation.ident(),
            relation.insert_columns().join(", ")
        )
    }

    /// Songplays insert
    ///
    /// Only `NextSong` events are plays. The catalog join is a left join on
    /// title and artist name, so plays of songs missing from the catalog keep
    /// null `song_id` and `artist_id`. The catalog side is narrowed to one row
    /// per title and artist name (smallest `song_id`), so a play never fans out.
    pub fn facts_statement(&self) -> Statement {
        let sql = format!(
            "{}\n\
             SELECT e.ts, e.userId, e.level, s.song_id, s.artist_id, e.sessionId, e.location, e.userAgent\n\
             FROM {} e\n\
             LEFT JOIN (\n\
             \x20   SELECT title, artist_name, song_id, artist_id,\n\
             \x20          ROW_NUMBER() OVER (PARTITION BY title, artist_name ORDER BY song_id) AS catalog_rank\n\
             \x20   FROM {}\n\
             ) s ON e.song = s.title AND e.artist = s.artist_name AND s.catalog_rank = 1\n\
             WHERE e.page = 'NextSong'",
            Self::insert_prefix(Relation::Songplays),
            Relation::StagingEvents.ident(),
            Relation::StagingSongs.ident(),
        );
        Statement::new(Relation::Songplays, StatementKind::Insert, sql)
    }

    /// Insert statement for one dimension
    pub fn dimension_statement(&self, dimension: Dimension) -> Statement {
        let relation = dimension.relation();
        let prefix = Self::insert_prefix(relation);
        let events = Relation::StagingEvents.ident();
        let songs = Relation::StagingSongs.ident();

        let sql = match dimension {
            // Latest event per user decides name and level; later position in
            // the session breaks timestamp ties
            Dimension::Users => format!(
                "{}\n\
                 SELECT userId, firstName, lastName, gender, level\n\
                 FROM (\n\
                 \x20   SELECT userId, firstName, lastName, gender, level,\n\
                 \x20          ROW_NUMBER() OVER (PARTITION BY userId ORDER BY ts DESC NULLS LAST, sessionId DESC NULLS LAST, itemInSession DESC NULLS LAST, level) AS recency\n\
                 \x20   FROM {}\n\
                 \x20   WHERE userId IS NOT NULL\n\
                 ) latest\n\
                 WHERE recency = 1",
                prefix, events
            ),
            Dimension::Songs => format!(
                "{}\n\
                 SELECT song_id, title, artist_id, year, duration\n\
                 FROM {}",
                prefix, songs
            ),
            // Latest catalog year per artist, smallest song_id on ties
            Dimension::Artists => format!(
                "{}\n\
                 SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude\n\
                 FROM (\n\
                 \x20   SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude,\n\
                 \x20          ROW_NUMBER() OVER (PARTITION BY artist_id ORDER BY year DESC NULLS LAST, song_id) AS recency\n\
                 \x20   FROM {}\n\
                 \x20   WHERE artist_id IS NOT NULL\n\
                 ) latest\n\
                 WHERE recency = 1",
                prefix, songs
            ),
            Dimension::Time => {
                let t = time::timestamp_expr(self.dialect);
                format!(
                    "{}\n\
                     SELECT DISTINCT\n\
                     \x20   ts,\n\
                     \x20   EXTRACT(HOUR FROM {t}),\n\
                     \x20   EXTRACT(DAY FROM {t}),\n\
                     \x20   EXTRACT(WEEK FROM {t}),\n\
                     \x20   EXTRACT(MONTH FROM {t}),\n\
                     \x20   EXTRACT(YEAR FROM {t}),\n\
                     \x20   EXTRACT(DOW FROM {t})\n\
                     FROM {}\n\
                     WHERE page = 'NextSong' AND ts IS NOT NULL",
                    prefix, events
                )
            }
        };

        Statement::new(relation, StatementKind::Insert, sql)
    }

    /// Every transform statement in execution order: facts first
    pub fn statements(&self) -> Vec<Statement> {
        std::iter::once(self.facts_statement())
            .chain(Dimension::ALL.into_iter().map(|d| self.dimension_statement(d)))
            .collect()
    }

    /// Populate the songplays fact relation
    pub async fn populate_facts(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<u64> {
        exec.run(&self.facts_statement()).await
    }

    /// Populate one dimension relation
    pub async fn populate_dimension(
        &self,
        exec: &mut StatementExecutor<'_>,
        dimension: Dimension,
    ) -> PipelineResult<u64> {
        exec.run(&self.dimension_statement(dimension)).await
    }

    /// Populate the fact relation then every dimension
    pub async fn populate_all(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<u64> {
        let mut total = self.populate_facts(exec).await?;
        for dimension in Dimension::ALL {
            total += self.populate_dimension(exec, dimension).await?;
        }
        Ok(total)
    }
}
