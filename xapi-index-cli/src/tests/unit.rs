//! Focused unit tests covering CLI configuration and argument parsing.

use super::*;
use camino::Utf8PathBuf;
use load::{ENV_LOAD_DATABASE, ENV_LOAD_INPUT, LoadArgs, LoadConfig};
use maintenance::{ENV_STATS_DATABASE, StatsArgs};
use query::{ENV_QUERY_DATABASE, ENV_QUERY_KEY, QueryArgs, QueryConfig, parse_bbox};
use rstest::rstest;
use xapi_index_core::{BoundingBox, ElementKind, XapiQuery};

#[rstest]
#[case(None, Some("index.db"), ARG_INPUT, ENV_LOAD_INPUT)]
#[case(Some("town.json"), None, ARG_DATABASE, ENV_LOAD_DATABASE)]
fn load_without_required_fields_errors(
    #[case] input: Option<&str>,
    #[case] database: Option<&str>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = LoadArgs {
        input: input.map(Utf8PathBuf::from),
        database: database.map(Utf8PathBuf::from),
        ..LoadArgs::default()
    };
    let err = LoadConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn load_defaults_the_record_limit() {
    let args = LoadArgs {
        input: Some(Utf8PathBuf::from("town.json")),
        database: Some(Utf8PathBuf::from("index.db")),
        max_records: None,
    };
    let config = LoadConfig::try_from(args).expect("config should build");
    assert_eq!(config.database.index, IndexConfig::default());
    assert_eq!(config.database.path, Utf8PathBuf::from("index.db"));
}

#[rstest]
#[case(None, Some("index.db"), ARG_KEY, ENV_QUERY_KEY)]
#[case(Some("amenity"), None, ARG_DATABASE, ENV_QUERY_DATABASE)]
fn query_without_required_fields_errors(
    #[case] key: Option<&str>,
    #[case] database: Option<&str>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = QueryArgs {
        key: key.map(str::to_owned),
        database: database.map(Utf8PathBuf::from),
        ..QueryArgs::default()
    };
    match QueryConfig::try_from(args).expect_err("missing field should error") {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn query_arguments_build_the_query() {
    let args = QueryArgs {
        key: Some("amenity|shop".to_owned()),
        value: Some("cafe".to_owned()),
        kind: Some("node".to_owned()),
        bbox: Some("-1.5, 50, 2, 52.25".to_owned()),
        database: Some(Utf8PathBuf::from("index.db")),
        max_records: Some(25),
    };
    let config = QueryConfig::try_from(args).expect("config should build");
    assert_eq!(
        config.query,
        XapiQuery::new("amenity|shop")
            .with_value("cafe")
            .with_kind(ElementKind::Node)
            .with_bbox(BoundingBox::new(-1.5, 50.0, 2.0, 52.25))
    );
    assert_eq!(config.database.index.max_records, 25);
}

#[rstest]
fn query_rejects_unknown_types() {
    let args = QueryArgs {
        key: Some("amenity".to_owned()),
        kind: Some("area".to_owned()),
        database: Some(Utf8PathBuf::from("index.db")),
        ..QueryArgs::default()
    };
    let err = QueryConfig::try_from(args).expect_err("unknown type");
    assert!(matches!(err, CliError::InvalidElementType(_)));
}

#[rstest]
#[case("1,2,3")]
#[case("1,2,3,4,5")]
#[case("a,2,3,4")]
#[case("")]
fn malformed_bboxes_are_rejected(#[case] value: &str) {
    match parse_bbox(value).expect_err("malformed bbox") {
        CliError::InvalidBbox { value: reported } => assert_eq!(reported, value),
        other => panic!("expected InvalidBbox, found {other:?}"),
    }
}

#[rstest]
fn stats_requires_a_database() {
    let args = StatsArgs::default();
    match DatabaseConfig::resolve(args.database, None, ENV_STATS_DATABASE) {
        Err(CliError::MissingArgument { field, env }) => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_STATS_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "max_records": "many" }));

    let err = query::config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "database": "from-file.db",
            "max_records": 10,
        }),
        None,
    );
    composer.push_environment(json!({
        "input": "from-env.json",
        "database": "from-env.db",
    }));
    composer.push_cli(json!({
        "database": "from-cli.db",
    }));

    let config =
        load::config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.input, Utf8PathBuf::from("from-env.json"));
    assert_eq!(config.database.path, Utf8PathBuf::from("from-cli.db"));
    assert_eq!(config.database.index.max_records, 10);
}
