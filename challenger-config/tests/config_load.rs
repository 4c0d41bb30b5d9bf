use challenger_config::{ChallengerConfigLoader, ConfigError, ConfigOutcome};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_existing_output_config_verbatim() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
solver: hcaptcha
lang: en
retries: 2
sites:
  - epicgames
  - hcaptcha-demo
"#;
    let sample = write_yaml(&tmp, "config-sample.yaml", "solver: hcaptcha\n");
    let output = write_yaml(&tmp, "config.yaml", file_yaml);

    let outcome = ChallengerConfigLoader::new()
        .with_output(&output)
        .with_sample(&sample)
        .load()
        .expect("load user config");

    let ConfigOutcome::Loaded(map) = outcome else {
        panic!("expected a loaded mapping");
    };

    // The mapping mirrors the YAML document itself.
    let expected: serde_json::Value = serde_yaml::from_str(file_yaml).expect("valid yaml");
    assert_eq!(serde_json::Value::Object(map), expected);
}

#[test]
#[serial]
fn bootstraps_missing_output_config_byte_for_byte() {
    let tmp = TempDir::new().unwrap();

    let sample = write_yaml(&tmp, "config-sample.yaml", "solver: hcaptcha\nlang: zh_CN\n");
    let output = tmp.path().join("config.yaml");

    let outcome = ChallengerConfigLoader::new()
        .with_output(&output)
        .with_sample(&sample)
        .load()
        .expect("bootstrap");

    match outcome {
        ConfigOutcome::Bootstrapped { output: written } => {
            assert_eq!(written, output);
            assert_eq!(
                fs::read(&written).unwrap(),
                fs::read(&sample).unwrap(),
                "bootstrap must copy the sample verbatim"
            );
        }
        other => panic!("expected bootstrap, got {other:?}"),
    }
}

#[test]
#[serial]
fn missing_sample_is_reported_not_panicked() {
    let tmp = TempDir::new().unwrap();

    let result = ChallengerConfigLoader::new()
        .with_output(tmp.path().join("config.yaml"))
        .with_sample(tmp.path().join("config-sample.yaml"))
        .load();

    assert!(matches!(result, Err(ConfigError::MissingSample(_))));
    // The sample check runs first even when a user config exists.
    write_yaml(&tmp, "config.yaml", "solver: hcaptcha\n");
    let result = ChallengerConfigLoader::new()
        .with_output(tmp.path().join("config.yaml"))
        .with_sample(tmp.path().join("config-sample.yaml"))
        .load();
    assert!(matches!(result, Err(ConfigError::MissingSample(_))));
}

#[test]
#[serial]
fn environment_overrides_the_file() {
    let tmp = TempDir::new().unwrap();

    let sample = write_yaml(&tmp, "config-sample.yaml", "solver: hcaptcha\n");
    let output = write_yaml(&tmp, "config.yaml", "solver: hcaptcha\nlang: zh_CN\n");

    temp_env::with_var("CHALLENGER_LANG", Some("en"), || {
        let outcome = ChallengerConfigLoader::new()
            .with_output(&output)
            .with_sample(&sample)
            .load()
            .expect("load user config");

        let ConfigOutcome::Loaded(map) = outcome else {
            panic!("expected a loaded mapping");
        };
        assert_eq!(map.get("lang").and_then(|v| v.as_str()), Some("en"));
        assert_eq!(map.get("solver").and_then(|v| v.as_str()), Some("hcaptcha"));
    });
}

#[test]
#[serial]
fn placeholders_expand_from_the_environment() {
    let tmp = TempDir::new().unwrap();

    let sample = write_yaml(&tmp, "config-sample.yaml", "solver: hcaptcha\n");
    let output = write_yaml(&tmp, "config.yaml", "auth_token: \"${CHAL_TOKEN}\"\n");

    temp_env::with_var("CHAL_TOKEN", Some("injected-from-env"), || {
        let outcome = ChallengerConfigLoader::new()
            .with_output(&output)
            .with_sample(&sample)
            .load()
            .expect("load user config");

        let ConfigOutcome::Loaded(map) = outcome else {
            panic!("expected a loaded mapping");
        };
        assert_eq!(
            map.get("auth_token").and_then(|v| v.as_str()),
            Some("injected-from-env")
        );
    });
}
