#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end loads through real files.

use std::{collections::HashMap, path::Path};

use {
    configr_config::{ConfigRecord, Error, Loader, RecordSchema, TypeExpr, config_record},
    serde_json::{Value, json},
    tempfile::TempDir,
};

config_record! {
    /// Flat record used by most tests.
    pub struct TestConfig {
        pub name: String,
        pub value: i64,
        pub enabled: bool = true,
    }
}

config_record! {
    pub struct DatabaseConfig from "database" {
        pub host: String,
        pub port: i64 = 5432,
    }
}

config_record! {
    pub struct ChildConfig {
        pub name: String,
        pub value: i64,
    }
}

config_record! {
    pub struct DefaultInitChildConfig {
        pub name: String = "Default Name".into(),
        pub value: i64 = 0,
    }
}

config_record! {
    pub struct ParentConfig {
        pub title: String,
        pub child: ChildConfig,
    }
}

config_record! {
    pub struct DefaultParentConfig {
        pub title: String,
        pub child: DefaultInitChildConfig,
    }
}

config_record! {
    pub struct MiddleConfig {
        pub label: String,
        pub child: ChildConfig,
    }
}

config_record! {
    pub struct RootConfig {
        pub middle: MiddleConfig,
        pub version: i64,
    }
}

config_record! {
    pub struct ItemConfig {
        pub id: i64,
    }
}

config_record! {
    pub struct CollectionConfig {
        pub items: Vec<ItemConfig>,
    }
}

config_record! {
    pub struct SettingsConfig {
        pub name: String,
        pub settings: HashMap<String, Value>,
        pub labels: HashMap<String, String> = HashMap::new(),
    }
}

config_record! {
    pub struct LeafConfig {
        pub v: i64,
    }
}

config_record! {
    pub struct TwoLeavesConfig {
        pub title: String,
        pub a: LeafConfig,
        pub b: LeafConfig,
    }
}

config_record! {
    pub struct PortConfig {
        pub port: u16,
    }
}

config_record! {
    pub struct OptionalChildConfig {
        pub child: Option<DefaultInitChildConfig>,
    }
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn setup(files: &[(&str, &str)]) -> (TempDir, Loader) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        write(dir.path(), name, body);
    }
    let loader = Loader::with_base_dir(dir.path());
    (dir, loader)
}

fn validation(err: Error) -> configr_config::ValidationError {
    match err {
        Error::Validation(report) => report,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn loads_json() {
    let (_dir, loader) = setup(&[(
        "test_config.json",
        r#"{"name": "test", "value": 42, "enabled": false}"#,
    )]);
    let config: TestConfig = loader.load().unwrap();
    assert_eq!(config, TestConfig {
        name: "test".into(),
        value: 42,
        enabled: false,
    });
}

#[cfg(feature = "yaml")]
#[test]
fn loads_yaml_through_load_from() {
    let (_dir, loader) = setup(&[(
        "test_config.yaml",
        "name: yaml_test\nvalue: 100\nenabled: false\n",
    )]);
    let config: TestConfig = loader.load_from("test_config.yaml").unwrap();
    assert_eq!(config.name, "yaml_test");
    assert_eq!(config.value, 100);
    assert!(!config.enabled);
}

#[cfg(feature = "yaml")]
#[test]
fn bare_name_finds_yaml_file() {
    let (_dir, loader) = setup(&[("database.yml", "host: db.local\n")]);
    let config: DatabaseConfig = loader.load_from("database").unwrap();
    assert_eq!(config.host, "db.local");
    assert_eq!(config.port, 5432);
}

#[test]
fn explicit_file_name() {
    assert_eq!(DatabaseConfig::schema().file_name(), Some("database"));
    assert_eq!(
        Loader::default().file_name_for(&DatabaseConfig::schema()).unwrap(),
        "database.json"
    );
    let (_dir, loader) = setup(&[("database.json", r#"{"host": "h", "port": 1}"#)]);
    let config: DatabaseConfig = loader.load().unwrap();
    assert_eq!(config.port, 1);
}

#[test]
fn undeclared_keys_are_ignored() {
    let (_dir, loader) = setup(&[(
        "test_config.json",
        r#"{"name": "test", "value": 1, "extra_field": "ignored", "another": [1, 2]}"#,
    )]);
    let config: TestConfig = loader.load().unwrap();
    assert_eq!(config.name, "test");
}

#[test]
fn defaults_fill_absent_fields() {
    let (_dir, loader) = setup(&[("test_config.json", r#"{"name": "test", "value": 1}"#)]);
    let config: TestConfig = loader.load().unwrap();
    assert!(config.enabled);
}

#[test]
fn missing_required_field_fails_construction() {
    let (_dir, loader) = setup(&[("test_config.json", r#"{"name": "test"}"#)]);
    let err = loader.load::<TestConfig>().unwrap_err();
    match &err {
        Error::Construct { type_name, message } => {
            assert_eq!(type_name, "TestConfig");
            assert!(message.contains("`value`"), "{message}");
        },
        other => panic!("expected a construct error, got {other:?}"),
    }
}

#[test]
fn wrong_scalar_type_is_reported() {
    let (_dir, loader) = setup(&[(
        "test_config.json",
        r#"{"name": "test", "value": "not-a-number"}"#,
    )]);
    let report = validation(loader.load::<TestConfig>().unwrap_err());
    let violation = report.violation("value").unwrap();
    assert_eq!(violation.expected, "integer");
    assert_eq!(violation.actual, "text");
}

#[test]
fn every_violation_is_reported_together() {
    let (_dir, loader) = setup(&[(
        "test_config.json",
        r#"{"name": 5, "value": true, "enabled": 1}"#,
    )]);
    let report = validation(loader.load::<TestConfig>().unwrap_err());
    assert_eq!(report.record(), "TestConfig");
    assert_eq!(report.fields(), ["name", "value", "enabled"]);
}

#[test]
fn nested_record_is_resolved() {
    let (_dir, loader) = setup(&[(
        "parent_config.json",
        r#"{"title": "Parent", "child": {"name": "Child", "value": 42, "extra": 1}}"#,
    )]);
    let config: ParentConfig = loader.load().unwrap();
    assert_eq!(config.child, ChildConfig {
        name: "Child".into(),
        value: 42,
    });
}

#[test]
fn three_levels_of_nesting() {
    let (_dir, loader) = setup(&[(
        "root_config.json",
        r#"{"version": 3, "middle": {"label": "m", "child": {"name": "leaf", "value": 7}}}"#,
    )]);
    let config: RootConfig = loader.load().unwrap();
    assert_eq!(config.version, 3);
    assert_eq!(config.middle.label, "m");
    assert_eq!(config.middle.child.value, 7);
}

#[test]
fn deep_violation_carries_full_path() {
    let (_dir, loader) = setup(&[(
        "root_config.json",
        r#"{"version": 3, "middle": {"label": "m", "child": {"name": "leaf", "value": "x"}}}"#,
    )]);
    let report = validation(loader.load::<RootConfig>().unwrap_err());
    assert_eq!(report.record(), "RootConfig");
    assert_eq!(report.fields(), ["middle.child.value"]);
}

#[test]
fn sibling_nested_failures_are_reported_together() {
    let (_dir, loader) = setup(&[(
        "two_leaves_config.json",
        r#"{"title": 5, "a": {"v": "x"}, "b": {"v": "y"}}"#,
    )]);
    let report = validation(loader.load::<TwoLeavesConfig>().unwrap_err());
    assert_eq!(report.record(), "TwoLeavesConfig");
    assert_eq!(report.fields(), ["title", "a.v", "b.v"]);
}

#[test]
fn union_with_one_record_branch_resolves_mappings() {
    let child = DefaultInitChildConfig::schema();
    let holder = RecordSchema::builder("Holder")
        .field(
            "maybe",
            TypeExpr::parse_with("union[DefaultInitChildConfig, null]", |_| {
                Some(child.clone())
            })
            .unwrap(),
        )
        .field(
            "either",
            TypeExpr::parse_with("union[DefaultInitChildConfig, text]", |_| {
                Some(child.clone())
            })
            .unwrap(),
        )
        .build();
    let loader = Loader::with_base_dir("/nowhere");

    let data = configr_config::document_from_value(json!({
        "maybe": {"value": 4},
        "either": {"name": "E"},
    }))
    .unwrap();
    let record = loader.load_schema(&holder, Some(data)).unwrap();
    assert_eq!(record.record("maybe").unwrap().value("value"), Some(&json!(4)));
    assert_eq!(record.record("either").unwrap().value("name"), Some(&json!("E")));

    let data =
        configr_config::document_from_value(json!({"maybe": null, "either": "plain"})).unwrap();
    let record = loader.load_schema(&holder, Some(data)).unwrap();
    assert_eq!(record.to_value(), json!({"maybe": null, "either": "plain"}));
}

#[test]
fn integer_widths_are_range_checked() {
    let (_dir, loader) = setup(&[("port_config.json", r#"{"port": 70000}"#)]);
    let report = validation(loader.load::<PortConfig>().unwrap_err());
    let violation = report.violation("port").unwrap();
    assert_eq!(violation.expected, "integer[0..=65535]");
    assert_eq!(violation.actual, "70000");

    let (_dir, loader) = setup(&[("port_config.json", r#"{"port": -1}"#)]);
    let report = validation(loader.load::<PortConfig>().unwrap_err());
    assert_eq!(report.violation("port").unwrap().actual, "-1");

    let (_dir, loader) = setup(&[("port_config.json", r#"{"port": 65535}"#)]);
    assert_eq!(loader.load::<PortConfig>().unwrap().port, 65535);
}

#[test]
fn null_child_uses_its_defaults() {
    let (_dir, loader) = setup(&[(
        "default_parent_config.json",
        r#"{"title": "Parent", "child": null}"#,
    )]);
    let config: DefaultParentConfig = loader.load().unwrap();
    assert_eq!(config.child.name, "Default Name");
    assert_eq!(config.child.value, 0);
}

#[test]
fn absent_child_uses_its_defaults() {
    let (_dir, loader) = setup(&[("default_parent_config.json", r#"{"title": "Parent"}"#)]);
    let config: DefaultParentConfig = loader.load().unwrap();
    assert_eq!(config.child.name, "Default Name");
}

#[test]
fn null_child_without_defaults_is_a_type_error() {
    let (_dir, loader) = setup(&[(
        "parent_config.json",
        r#"{"title": "Parent", "child": null}"#,
    )]);
    let report = validation(loader.load::<ParentConfig>().unwrap_err());
    let violation = report.violation("child").unwrap();
    assert_eq!(violation.expected, "ChildConfig");
    assert_eq!(violation.actual, "null");
}

#[test]
fn optional_child_stays_none_on_null() {
    let (_dir, loader) = setup(&[("optional_child_config.json", r#"{"child": null}"#)]);
    let config: OptionalChildConfig = loader.load().unwrap();
    assert_eq!(config.child, None);

    let (_dir, loader) = setup(&[("optional_child_config.json", r#"{"child": {"value": 9}}"#)]);
    let config: OptionalChildConfig = loader.load().unwrap();
    assert_eq!(config.child.unwrap().value, 9);
}

#[test]
fn list_of_records_is_not_resolved() {
    let (_dir, loader) = setup(&[(
        "collection_config.json",
        r#"{"items": [{"id": 1}, {"id": 2}]}"#,
    )]);
    let report = validation(loader.load::<CollectionConfig>().unwrap_err());
    assert_eq!(report.fields(), ["items[0]", "items[1]"]);
    assert_eq!(report.violations()[0].actual, "mapping");

    let (_dir, loader) = setup(&[("collection_config.json", r#"{"items": []}"#)]);
    let config: CollectionConfig = loader.load().unwrap();
    assert!(config.items.is_empty());
}

#[test]
fn generic_mappings() {
    let (_dir, loader) = setup(&[(
        "settings_config.json",
        r#"{"name": "s", "settings": {"depth": 3, "mode": "fast", "nested": {"a": [1]}}}"#,
    )]);
    let config: SettingsConfig = loader.load().unwrap();
    assert_eq!(config.settings["depth"], json!(3));
    assert_eq!(config.settings["nested"], json!({"a": [1]}));
    assert!(config.labels.is_empty());
}

#[test]
fn typed_mapping_values_are_checked() {
    let (_dir, loader) = setup(&[(
        "settings_config.json",
        r#"{"name": "s", "settings": {}, "labels": {"team": "core", "tier": 2}}"#,
    )]);
    let report = validation(loader.load::<SettingsConfig>().unwrap_err());
    assert_eq!(report.fields(), ["labels.tier"]);
}

#[test]
fn boolean_is_not_an_integer() {
    let (_dir, loader) = setup(&[("test_config.json", r#"{"name": "t", "value": true}"#)]);
    let report = validation(loader.load::<TestConfig>().unwrap_err());
    assert_eq!(report.violation("value").unwrap().actual, "boolean");
}

#[test]
fn missing_file_lists_candidates() {
    let (dir, loader) = setup(&[]);
    let err = loader.load::<TestConfig>().unwrap_err();
    match &err {
        Error::FileNotFound { candidates, .. } => {
            assert_eq!(candidates, &[dir.path().join("test_config.json")]);
        },
        other => panic!("expected FileNotFound, got {other:?}"),
    }
    assert!(err.to_string().contains("test_config.json"));
}

#[test]
fn unregistered_format_is_unsupported() {
    let (_dir, mut loader) = setup(&[("test_config.json", r#"{"name": "t", "value": 1}"#)]);
    loader.unregister_format(".json");
    let err = loader.load_from::<TestConfig>("test_config.json").unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { ref extension, .. } if extension == ".json"));
}

#[test]
fn registered_file_follows_the_default_extension() {
    let (dir, mut loader) = setup(&[("test_config.json", r#"{"name": "t", "value": 1}"#)]);
    loader.unregister_format(".json");
    match loader.load::<TestConfig>().unwrap_err() {
        Error::FileNotFound { candidates, .. } => {
            assert_eq!(candidates, [dir.path().join("test_config.yaml")]);
        },
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_only_registry_loads_registered_records() {
    let (_dir, mut loader) = setup(&[
        ("test_config.yaml", "name: from_yaml\nvalue: 2\n"),
        ("test_config.json", r#"{"name": "from_json", "value": 1}"#),
    ]);
    loader.unregister_format(".json");
    loader.unregister_format(".yml");
    let config: TestConfig = loader.load().unwrap();
    assert_eq!(config.name, "from_yaml");
}

#[test]
fn base_dir_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "test_config.json", r#"{"name": "env", "value": 5}"#);
    let base = dir.path().to_string_lossy().into_owned();
    let loader = Loader::from_env_with(|name| (name == "CONFIG_DIR").then(|| base.clone()));
    let config: TestConfig = loader.load().unwrap();
    assert_eq!(config.name, "env");
}

#[test]
fn load_data_skips_the_filesystem() {
    let loader = Loader::with_base_dir("/does/not/exist");
    let data = configr_config::document_from_value(json!({
        "title": "inline",
        "child": {"name": "c", "value": 1},
    }))
    .unwrap();
    let config: ParentConfig = loader.load_data(data).unwrap();
    assert_eq!(config.title, "inline");
}

#[test]
fn dynamic_schema_round_trip() {
    let child = RecordSchema::builder("Endpoint")
        .field("url", TypeExpr::Text)
        .field_with_default("retries", TypeExpr::Int, json!(3))
        .build();
    let service = RecordSchema::builder("Service")
        .field("name", TypeExpr::Text)
        .field("endpoint", TypeExpr::Record(child))
        .config_file()
        .build();

    let (_dir, loader) = setup(&[(
        "service.json",
        r#"{"name": "api", "endpoint": {"url": "http://x"}}"#,
    )]);
    let record = loader.load_record(&TypeExpr::Record(service), None).unwrap();
    assert_eq!(
        record.to_value(),
        json!({"name": "api", "endpoint": {"url": "http://x", "retries": 3}})
    );
    assert_eq!(record.record("endpoint").unwrap().type_name(), "Endpoint");
}

#[test]
fn non_record_target_is_rejected() {
    let (_dir, loader) = setup(&[]);
    let err = loader.load_record(&TypeExpr::Int, None).unwrap_err();
    assert!(matches!(err, Error::NotARecordType { .. }));
}
