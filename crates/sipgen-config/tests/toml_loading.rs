//! TOML configuration loading, sandboxed with `figment::Jail`.

use std::path::PathBuf;

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use sipgen_config::{ConfigError, SipgenConfig};

#[test]
fn loads_all_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[generator]
include_prefix = "KWidgets"
trace_rules = true
builtin_rules = false
fail_on_error = true
indent = 2

[rules]
files = ["rules/qt.toml", "rules/local.toml"]

[output]
dir = "sip"
extension = "sip5"
"#,
        )?;

        let config: SipgenConfig = Figment::from(Serialized::defaults(SipgenConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.generator.include_prefix.as_deref(), Some("KWidgets"));
        assert!(config.generator.trace_rules);
        assert!(!config.generator.builtin_rules);
        assert!(config.generator.fail_on_error);
        assert_eq!(config.generator.indent, 2);
        assert_eq!(
            config.rules.files,
            vec![PathBuf::from("rules/qt.toml"), PathBuf::from("rules/local.toml")]
        );
        assert_eq!(config.output.dir, Some(PathBuf::from("sip")));
        assert_eq!(config.output.extension, "sip5");
        Ok(())
    });
}

#[test]
fn partial_sections_keep_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[generator]\ntrace_rules = true\n")?;

        let config: SipgenConfig = Figment::from(Serialized::defaults(SipgenConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.generator.trace_rules);
        assert!(config.generator.builtin_rules);
        assert_eq!(config.generator.indent, 4);
        assert_eq!(config.output.extension, "sip");
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sipgen")?;
        jail.create_file(".sipgen/config.toml", "[output]\ndir = \"generated\"\n")?;

        let config = SipgenConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.output.dir, Some(PathBuf::from("generated")));
        Ok(())
    });
}

#[test]
fn explicit_file_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sipgen")?;
        jail.create_file(".sipgen/config.toml", "[generator]\nindent = 2\n")?;
        jail.create_file("custom.toml", "[generator]\nindent = 8\n")?;

        let config =
            SipgenConfig::load_from(&PathBuf::from("custom.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.generator.indent, 8);
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SipgenConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(_)));
}

#[test]
fn invalid_values_fail_validation() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[output]\nextension = \".sip\"\n")?;

        let figment = Figment::from(Serialized::defaults(SipgenConfig::default()))
            .merge(Toml::file("config.toml"));
        let err = SipgenConfig::from_figment(&figment).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "output.extension"));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[generator\nindent = ")?;

        let figment = Figment::from(Serialized::defaults(SipgenConfig::default()))
            .merge(Toml::file("config.toml"));
        let err = SipgenConfig::from_figment(&figment).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}
