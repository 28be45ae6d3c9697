//! End-to-end pipeline tests against an in-memory DuckDB warehouse

#![cfg(feature = "duckdb-backend")]

use std::path::Path;

use serde_json::{Value, json};
use songplay_warehouse::database::WarehouseBackend;
use songplay_warehouse::pipeline::StatementExecutor;
use songplay_warehouse::{
    DuckDbBackend, PipelineConfig, PipelineError, PipelineOrchestrator, PipelineStage,
    PipelineState, Relation, SchemaManager, TimeParts,
};
use tempfile::TempDir;

const ELENA_ARTIST_ID: &str = "AR5KOSW1187FB35FF4";
const SETANTA_SONG_ID: &str = "SOZCTXZ12AB0182364";

#[allow(clippy::too_many_arguments)]
fn event(
    page: &str,
    user_id: Option<i64>,
    ts: i64,
    level: &str,
    artist: Option<&str>,
    song: Option<&str>,
    first_name: &str,
    session_id: i64,
) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": first_name,
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Smith",
        "length": if song.is_some() { json!(269.58322) } else { Value::Null },
        "level": level,
        "location": "San Jose-Sunnyvale-Santa Clara, CA",
        "method": "PUT",
        "page": page,
        "registration": 1541016707796i64,
        "sessionId": session_id,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        // The event log carries user ids as strings, empty when logged out
        "userId": user_id.map(|id| id.to_string()).unwrap_or_default(),
    })
}

fn song(
    song_id: &str,
    title: &str,
    artist_id: &str,
    artist_name: &str,
    location: &str,
    year: i64,
) -> Value {
    json!({
        "artist_id": artist_id,
        "artist_latitude": 25.2048,
        "artist_location": location,
        "artist_longitude": 55.2708,
        "artist_name": artist_name,
        "duration": 269.58322,
        "num_songs": 1,
        "song_id": song_id,
        "title": title,
        "year": year,
    })
}

fn default_events() -> Vec<Value> {
    vec![
        event(
            "NextSong",
            Some(26),
            1542242826796,
            "free",
            Some("Elena"),
            Some("Setanta matins"),
            "Ryan",
            583,
        ),
        event(
            "NextSong",
            Some(26),
            1542243000000,
            "paid",
            Some("Unknown Band"),
            Some("Not In Catalog"),
            "Ryan",
            583,
        ),
        event(
            "NextSong",
            Some(10),
            1542245000000,
            "free",
            Some("Elena"),
            Some("Setanta matins"),
            "Sylvie",
            9,
        ),
        event("Home", Some(10), 1542250000000, "free", None, None, "Sylvie", 9),
        event("Logout", None, 1542251000000, "free", None, None, "", 9),
    ]
}

fn default_songs() -> Vec<Value> {
    vec![
        song(
            SETANTA_SONG_ID,
            "Setanta matins",
            ELENA_ARTIST_ID,
            "Elena",
            "Dubai UAE",
            0,
        ),
        song(
            "SOAAAAA12AB0180000",
            "Another Elena Song",
            ELENA_ARTIST_ID,
            "Elena",
            "Dubai",
            2004,
        ),
        song(
            "SOBBBBB12AB0180000",
            "Far Away",
            "ARBBBBB1187FB00000",
            "Other Artist",
            "Oslo",
            1999,
        ),
    ]
}

/// Event log as newline-delimited JSON, song catalog as one object per file
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(events: &[Value], songs: &[Value]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("log_data")).unwrap();
        std::fs::create_dir(dir.path().join("song_data")).unwrap();

        let log = events
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(dir.path().join("log_data/2018-11-15-events.json"), log).unwrap();

        for (i, s) in songs.iter().enumerate() {
            std::fs::write(
                dir.path().join(format!("song_data/song_{}.json", i)),
                s.to_string(),
            )
            .unwrap();
        }

        Self { dir }
    }

    fn standard() -> Self {
        Self::new(&default_events(), &default_songs())
    }

    fn glob(path: &Path, sub: &str) -> String {
        path.join(sub).join("*.json").to_string_lossy().into_owned()
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::duckdb(
            ":memory:",
            Self::glob(self.dir.path(), "log_data"),
            Self::glob(self.dir.path(), "song_data"),
        )
    }
}

async fn count(backend: &DuckDbBackend, relation: Relation) -> i64 {
    backend
        .query(&format!("SELECT COUNT(*) AS n FROM {}", relation.ident()))
        .await
        .unwrap()
        .first_i64("n")
        .unwrap()
}

async fn rows(backend: &DuckDbBackend, sql: &str) -> Vec<Value> {
    backend.query(sql).await.unwrap().rows
}

mod full_run {
    use super::*;

    #[tokio::test]
    async fn test_run_reaches_done() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        let mut orchestrator = PipelineOrchestrator::new(&fixture.config(), &backend).unwrap();
        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.final_state, PipelineState::Done);
        assert_eq!(orchestrator.state(), PipelineState::Done);
        // 7 drops + sequence, 7 creates + sequence, 2 loads, 5 inserts
        assert_eq!(report.outcomes.len(), 23);
    }

    #[tokio::test]
    async fn test_staging_completeness() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(count(&backend, Relation::StagingEvents).await, 5);
        assert_eq!(count(&backend, Relation::StagingSongs).await, 3);
    }

    #[tokio::test]
    async fn test_fact_left_join() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let plays = rows(
            &backend,
            "SELECT start_time, user_id, song_id, artist_id FROM \"songplays\" ORDER BY start_time",
        )
        .await;

        // Only NextSong events are plays
        assert_eq!(plays.len(), 3);

        assert_eq!(plays[0]["start_time"], 1542242826796i64);
        assert_eq!(plays[0]["song_id"], SETANTA_SONG_ID);
        assert_eq!(plays[0]["artist_id"], ELENA_ARTIST_ID);

        // Unknown to the catalog: kept, with null keys
        assert_eq!(plays[1]["user_id"], 26);
        assert!(plays[1]["song_id"].is_null());
        assert!(plays[1]["artist_id"].is_null());

        assert_eq!(plays[2]["user_id"], 10);
        assert_eq!(plays[2]["song_id"], SETANTA_SONG_ID);
    }

    #[tokio::test]
    async fn test_songplay_ids_are_generated() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let ids = rows(
            &backend,
            "SELECT COUNT(DISTINCT songplay_id) AS n, COUNT(*) FILTER (WHERE songplay_id IS NULL) AS missing FROM \"songplays\"",
        )
        .await;
        assert_eq!(ids[0]["n"], 3);
        assert_eq!(ids[0]["missing"], 0);
    }

    #[tokio::test]
    async fn test_users_keep_latest_attributes() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let users = rows(
            &backend,
            "SELECT user_id, first_name, level FROM \"users\" ORDER BY user_id",
        )
        .await;

        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["user_id"], 10);
        assert_eq!(users[0]["first_name"], "Sylvie");
        assert_eq!(users[1]["user_id"], 26);
        assert_eq!(users[1]["level"], "paid");
    }

    #[tokio::test]
    async fn test_artists_are_deduplicated() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(count(&backend, Relation::Songs).await, 3);
        assert_eq!(count(&backend, Relation::Artists).await, 2);

        let elena = rows(
            &backend,
            &format!(
                "SELECT name, location FROM \"artists\" WHERE artist_id = '{}'",
                ELENA_ARTIST_ID
            ),
        )
        .await;
        assert_eq!(elena.len(), 1);
        assert_eq!(elena[0]["name"], "Elena");
        // The 2004 release is the latest catalog row
        assert_eq!(elena[0]["location"], "Dubai");
    }

    #[tokio::test]
    async fn test_time_matches_decomposition() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let times = rows(
            &backend,
            "SELECT start_time, hour, day, week, month, year, weekday FROM \"time\" ORDER BY start_time",
        )
        .await;
        assert_eq!(times.len(), 3);

        for row in &times {
            let ts = row["start_time"].as_i64().unwrap();
            let parts = TimeParts::from_epoch_millis(ts).unwrap();
            assert_eq!(row["hour"], parts.hour, "hour of {}", ts);
            assert_eq!(row["day"], parts.day, "day of {}", ts);
            assert_eq!(row["week"], parts.week, "week of {}", ts);
            assert_eq!(row["month"], parts.month, "month of {}", ts);
            assert_eq!(row["year"], parts.year, "year of {}", ts);
            assert_eq!(row["weekday"], parts.weekday, "weekday of {}", ts);
        }

        assert_eq!(times[0]["hour"], 0);
        assert_eq!(times[0]["day"], 15);
        assert_eq!(times[0]["week"], 46);
        assert_eq!(times[0]["weekday"], 4);
    }

    #[tokio::test]
    async fn test_every_play_has_a_time_row() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let orphans = rows(
            &backend,
            "SELECT COUNT(*) AS n FROM \"songplays\" p LEFT JOIN \"time\" t ON p.start_time = t.start_time WHERE t.start_time IS NULL",
        )
        .await;
        assert_eq!(orphans[0]["n"], 0);
    }

    #[tokio::test]
    async fn test_string_user_ids_load() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let ids = rows(
            &backend,
            "SELECT page, userId FROM \"staging_events\" ORDER BY ts",
        )
        .await;
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0]["userId"], 26);
        assert_eq!(ids[4]["page"], "Logout");
        assert!(ids[4]["userId"].is_null());
    }

    #[tokio::test]
    async fn test_duplicate_catalog_entry_does_not_multiply_plays() {
        let mut songs = default_songs();
        songs.push(song(
            "SOZZZZZ12AB0189999",
            "Setanta matins",
            ELENA_ARTIST_ID,
            "Elena",
            "Dubai UAE",
            0,
        ));
        let fixture = Fixture::new(&default_events(), &songs);
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(count(&backend, Relation::StagingSongs).await, 4);
        assert_eq!(count(&backend, Relation::Songplays).await, 3);

        let matched = rows(
            &backend,
            "SELECT DISTINCT song_id FROM \"songplays\" WHERE song_id IS NOT NULL",
        )
        .await;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0]["song_id"], SETANTA_SONG_ID);
    }

    #[tokio::test]
    async fn test_users_tie_on_timestamp_takes_later_item() {
        let ts = 1542300000000i64;
        let mut upgraded = event("NextSong", Some(42), ts, "paid", None, None, "Kate", 7);
        upgraded["itemInSession"] = json!(1);
        let earlier = event("Home", Some(42), ts, "free", None, None, "Katherine", 7);

        for events in [
            vec![upgraded.clone(), earlier.clone()],
            vec![earlier.clone(), upgraded.clone()],
        ] {
            let fixture = Fixture::new(&events, &default_songs());
            let backend = DuckDbBackend::in_memory().unwrap();

            PipelineOrchestrator::new(&fixture.config(), &backend)
                .unwrap()
                .run()
                .await
                .unwrap();

            let users = rows(&backend, "SELECT first_name, level FROM \"users\"").await;
            assert_eq!(users.len(), 1);
            assert_eq!(users[0]["first_name"], "Kate");
            assert_eq!(users[0]["level"], "paid");
        }
    }

    #[tokio::test]
    async fn test_missing_catalog_row_gives_null_keys() {
        let songs: Vec<Value> = default_songs()
            .into_iter()
            .filter(|s| s["song_id"] != SETANTA_SONG_ID)
            .collect();
        let fixture = Fixture::new(&default_events(), &songs);
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let plays = rows(
            &backend,
            "SELECT COUNT(*) AS n FROM \"songplays\" WHERE song_id IS NULL AND artist_id IS NULL",
        )
        .await;
        assert_eq!(plays[0]["n"], 3);
    }
}

mod reruns {
    use super::*;

    #[tokio::test]
    async fn test_full_rerun_does_not_duplicate() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();
        let config = fixture.config();

        for _ in 0..2 {
            PipelineOrchestrator::new(&config, &backend)
                .unwrap()
                .run()
                .await
                .unwrap();
        }

        assert_eq!(count(&backend, Relation::StagingEvents).await, 5);
        assert_eq!(count(&backend, Relation::Songplays).await, 3);
        assert_eq!(count(&backend, Relation::Users).await, 2);
    }

    #[tokio::test]
    async fn test_load_without_reset_appends() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();
        let config = fixture.config();

        let report = PipelineOrchestrator::new(&config, &backend)
            .unwrap()
            .create_tables()
            .await
            .unwrap();
        assert_eq!(report.final_state, PipelineState::Done);
        assert_eq!(count(&backend, Relation::Songplays).await, 0);

        for _ in 0..2 {
            PipelineOrchestrator::new(&config, &backend)
                .unwrap()
                .load_and_transform()
                .await
                .unwrap();
        }

        // Staging is not cleared, so the second pass re-inserts the first pass's plays too
        assert_eq!(count(&backend, Relation::StagingEvents).await, 10);
        assert_eq!(count(&backend, Relation::Songplays).await, 3 + 6);
    }

    #[tokio::test]
    async fn test_orchestrator_runs_once() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        let mut orchestrator = PipelineOrchestrator::new(&fixture.config(), &backend).unwrap();
        orchestrator.create_tables().await.unwrap();

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyRun(PipelineState::Done)));
    }
}

mod schema_reset {
    use super::*;

    async fn table_names(backend: &DuckDbBackend) -> Vec<String> {
        rows(
            backend,
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main' ORDER BY table_name",
        )
        .await
        .iter()
        .filter_map(|r| r["table_name"].as_str().map(str::to_string))
        .collect()
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let backend = DuckDbBackend::in_memory().unwrap();
        let manager = SchemaManager::new(backend.dialect());

        let mut exec = StatementExecutor::new(&backend);
        manager.reset(&mut exec).await.unwrap();
        let first = table_names(&backend).await;

        let columns_sql = "SELECT table_name, column_name, data_type, is_nullable \
                           FROM information_schema.columns WHERE table_schema = 'main' \
                           ORDER BY table_name, ordinal_position";
        let first_columns = rows(&backend, columns_sql).await;

        manager.reset(&mut exec).await.unwrap();
        manager.reset(&mut exec).await.unwrap();

        assert_eq!(table_names(&backend).await, first);
        assert_eq!(rows(&backend, columns_sql).await, first_columns);
        assert_eq!(first.len(), 7);
        for relation in Relation::ALL {
            assert!(first.contains(&relation.name().to_string()));
            assert_eq!(count(&backend, relation).await, 0);
        }
    }

    #[tokio::test]
    async fn test_create_over_existing_relation_fails() {
        let backend = DuckDbBackend::in_memory().unwrap();
        let manager = SchemaManager::new(backend.dialect());
        let mut exec = StatementExecutor::new(&backend);

        exec.run(&songplay_warehouse::Statement::new(
            Relation::Users,
            songplay_warehouse::StatementKind::Create,
            "CREATE TABLE \"users\" (legacy VARCHAR)",
        ))
        .await
        .unwrap();

        let err = manager.create_all(&mut exec).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Schema {
                relation: Relation::Users,
                ..
            }
        ));

        // A reset replaces the stale relation
        manager.reset(&mut StatementExecutor::new(&backend)).await.unwrap();
        let columns = rows(
            &backend,
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'main' AND table_name = 'users' ORDER BY ordinal_position",
        )
        .await;
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0]["column_name"], "user_id");
    }

    #[tokio::test]
    async fn test_drop_all_on_empty_database() {
        let backend = DuckDbBackend::in_memory().unwrap();
        let manager = SchemaManager::new(backend.dialect());
        let mut exec = StatementExecutor::new(&backend);

        manager.drop_all(&mut exec).await.unwrap();
        assert!(table_names(&backend).await.is_empty());
    }

    #[tokio::test]
    async fn test_row_counts() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();

        PipelineOrchestrator::new(&fixture.config(), &backend)
            .unwrap()
            .run()
            .await
            .unwrap();

        let counts = SchemaManager::new(backend.dialect())
            .row_counts(&backend)
            .await
            .unwrap();
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0].relation, Relation::StagingEvents);
        assert_eq!(counts[0].rows, 5);
        let time = counts.iter().find(|c| c.relation == Relation::Time).unwrap();
        assert_eq!(time.rows, 3);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_missing_source_fails_bulk_load() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();
        let mut config = fixture.config();
        config.s3.log_data = fixture
            .dir
            .path()
            .join("absent/*.json")
            .to_string_lossy()
            .into_owned();

        let mut orchestrator = PipelineOrchestrator::new(&config, &backend).unwrap();
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::BulkLoad {
                relation: Relation::StagingEvents,
                ..
            }
        ));
        assert_eq!(
            orchestrator.state(),
            PipelineState::Failed {
                stage: PipelineStage::StagingLoad
            }
        );

        // The reset before the failure stays committed; nothing after it ran
        assert_eq!(count(&backend, Relation::Songplays).await, 0);
        assert_eq!(count(&backend, Relation::StagingSongs).await, 0);
        assert!(
            orchestrator
                .outcomes()
                .iter()
                .all(|o| o.relation != Relation::StagingSongs)
        );
    }

    #[tokio::test]
    async fn test_transform_failure_stops_run() {
        let fixture = Fixture::standard();
        let backend = DuckDbBackend::in_memory().unwrap();
        let config = fixture.config();

        PipelineOrchestrator::new(&config, &backend)
            .unwrap()
            .create_tables()
            .await
            .unwrap();

        // Without the users table the second transform statement fails
        let mut exec = StatementExecutor::new(&backend);
        exec.run(&songplay_warehouse::Statement::new(
            Relation::Users,
            songplay_warehouse::StatementKind::Drop,
            "DROP TABLE \"users\"",
        ))
        .await
        .unwrap();

        let mut orchestrator = PipelineOrchestrator::new(&config, &backend).unwrap();
        let err = orchestrator.load_and_transform().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Transform {
                relation: Relation::Users,
                ..
            }
        ));
        assert_eq!(
            orchestrator.state(),
            PipelineState::Failed {
                stage: PipelineStage::Transform
            }
        );
        assert_eq!(count(&backend, Relation::Songplays).await, 3);
        assert_eq!(count(&backend, Relation::Songs).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let backend = DuckDbBackend::in_memory().unwrap();
        let config = PipelineConfig::duckdb(":memory:", "", "songs/*.json");

        let err = PipelineOrchestrator::new(&config, &backend)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
