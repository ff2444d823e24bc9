//! `SIPGEN_*` environment overrides, sandboxed with `figment::Jail`.

use std::path::PathBuf;

use figment::Jail;
use pretty_assertions::assert_eq;
use sipgen_config::SipgenConfig;

#[test]
fn env_sets_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("SIPGEN_GENERATOR__TRACE_RULES", "true");
        jail.set_env("SIPGEN_GENERATOR__INDENT", "2");
        jail.set_env("SIPGEN_OUTPUT__DIR", "out");

        let config = SipgenConfig::load().map_err(|e| e.to_string())?;
        assert!(config.generator.trace_rules);
        assert_eq!(config.generator.indent, 2);
        assert_eq!(config.output.dir, Some(PathBuf::from("out")));
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sipgen")?;
        jail.create_file(
            ".sipgen/config.toml",
            "[generator]\ninclude_prefix = \"FromFile\"\nfail_on_error = true\n",
        )?;
        jail.set_env("SIPGEN_GENERATOR__INCLUDE_PREFIX", "FromEnv");

        let config = SipgenConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.generator.include_prefix.as_deref(), Some("FromEnv"));
        assert!(config.generator.fail_on_error);
        Ok(())
    });
}

#[test]
fn env_beats_explicit_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[generator]\nbuiltin_rules = true\n")?;
        jail.set_env("SIPGEN_GENERATOR__BUILTIN_RULES", "false");

        let config =
            SipgenConfig::load_from(&PathBuf::from("custom.toml")).map_err(|e| e.to_string())?;
        assert!(!config.generator.builtin_rules);
        Ok(())
    });
}

#[test]
fn invalid_env_value_fails() {
    Jail::expect_with(|jail| {
        jail.set_env("SIPGEN_GENERATOR__INDENT", "0");
        assert!(SipgenConfig::load().is_err());
        Ok(())
    });
}
