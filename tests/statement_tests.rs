//! Statement plans rendered for each dialect, without a warehouse

use songplay_warehouse::database::config::sample_config;
use songplay_warehouse::pipeline::full_pass_statements;
use songplay_warehouse::{Dialect, PipelineConfig, Relation, StatementKind};

fn sample() -> PipelineConfig {
    PipelineConfig::parse(sample_config()).unwrap()
}

mod redshift {
    use super::*;

    #[test]
    fn test_full_pass_order() {
        let statements = full_pass_statements(&sample(), Dialect::Redshift).unwrap();
        let kinds: Vec<StatementKind> = statements.iter().map(|s| s.kind).collect();

        assert_eq!(statements.len(), 21);
        assert!(kinds[..7].iter().all(|k| *k == StatementKind::Drop));
        assert!(kinds[7..14].iter().all(|k| *k == StatementKind::Create));
        assert!(kinds[14..16].iter().all(|k| *k == StatementKind::Copy));
        assert!(kinds[16..].iter().all(|k| *k == StatementKind::Insert));

        assert_eq!(statements[14].relation, Relation::StagingEvents);
        assert_eq!(statements[16].relation, Relation::Songplays);
    }

    #[test]
    fn test_copy_statements() {
        let statements = full_pass_statements(&sample(), Dialect::Redshift).unwrap();
        let copies: Vec<String> = statements
            .iter()
            .filter(|s| s.kind == StatementKind::Copy)
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            copies[0],
            "COPY \"staging_events\" FROM 's3://udacity-dend/log_data'\n\
             CREDENTIALS 'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'\n\
             JSON 's3://udacity-dend/log_json_path.json'\n\
             REGION 'us-west-2';"
        );
        assert_eq!(
            copies[1],
            "COPY \"staging_songs\" FROM 's3://udacity-dend/song_data'\n\
             CREDENTIALS 'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'\n\
             JSON 'auto'\n\
             REGION 'us-west-2';"
        );
    }

    #[test]
    fn test_placement_directives() {
        let statements = full_pass_statements(&sample(), Dialect::Redshift).unwrap();
        let create = |relation: Relation| {
            statements
                .iter()
                .find(|s| s.relation == relation && s.kind == StatementKind::Create)
                .map(|s| s.sql.clone())
                .unwrap()
        };

        assert!(create(Relation::Songplays).contains("DISTKEY (user_id)"));
        assert!(create(Relation::Songplays).contains("SORTKEY (start_time)"));
        assert!(create(Relation::Users).contains("DISTSTYLE ALL"));
        assert!(create(Relation::Songs).contains("DISTKEY (song_id)"));
        assert!(create(Relation::Artists).contains("DISTKEY (artist_id)"));
        assert!(create(Relation::Time).contains("DISTKEY (start_time)"));
        assert!(create(Relation::Time).contains("SORTKEY (start_time)"));
        assert!(!create(Relation::StagingSongs).contains("DIST"));
        assert!(create(Relation::Songs).contains("duration DECIMAL(10,5) NOT NULL"));
    }

    #[test]
    fn test_quoted_role_arn_is_stripped() {
        let mut config = sample();
        config.iam_role.arn = "'arn:aws:iam::123456789012:role/dwhRole'".to_string();
        assert!(config.validate().is_ok());

        let statements = full_pass_statements(&config, Dialect::Redshift).unwrap();
        assert!(
            statements
                .iter()
                .filter(|s| s.kind == StatementKind::Copy)
                .all(|s| s.sql.contains("'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'"))
        );
    }
}

mod embedded {
    use super::*;

    #[test]
    fn test_full_pass_has_sequence_statements() {
        let config = PipelineConfig::duckdb(":memory:", "logs/*.json", "songs/*.json");
        let statements = full_pass_statements(&config, Dialect::DuckDb).unwrap();

        assert_eq!(statements.len(), 23);
        assert!(statements.iter().all(|s| !s.sql.contains("DISTKEY")));
        assert!(statements.iter().all(|s| !s.sql.contains("CREDENTIALS")));
        assert!(
            statements
                .iter()
                .any(|s| s.sql.starts_with("CREATE SEQUENCE songplays_songplay_id_seq"))
        );
    }
}
