use clap::Subcommand;
use std::path::Path;
use vellum_ledger::VellumPaths;
use vellum_store::config::{get_key, parse_value, read_config_map, set_key, write_config_map};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key, dotted for nested values (e.g. limits.code)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get { key: String },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, cwd: &Path) -> anyhow::Result<()> {
    let paths = VellumPaths::discover(crate::workspace_root(cwd)?);
    match cmd {
        ConfigCmd::Set { key, value } => set(&paths, &key, &value),
        ConfigCmd::Get { key } => get(&paths, &key),
        ConfigCmd::List => list(&paths),
    }
}

// ── Command Implementations ──

pub fn set(paths: &VellumPaths, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = read_config_map(&paths.config_json)?;
    set_key(&mut config, key, parse_value(value))?;
    write_config_map(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

pub fn get(paths: &VellumPaths, key: &str) -> anyhow::Result<()> {
    let config = read_config_map(&paths.config_json)?;
    match get_key(&config, key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

pub fn list(paths: &VellumPaths) -> anyhow::Result<()> {
    let config = read_config_map(&paths.config_json)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_store::config::load_config;

    #[test]
    fn set_nested_limit() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        run(
            ConfigCmd::Set {
                key: "limits.image".into(),
                value: "1024".into(),
            },
            tmp.path(),
        )
        .unwrap();
        run(
            ConfigCmd::Set {
                key: "verify_timeout_secs".into(),
                value: "30".into(),
            },
            tmp.path(),
        )
        .unwrap();

        let cfg = load_config(&VellumPaths::discover(tmp.path()).config_json).unwrap();
        assert_eq!(cfg.limits.image, 1024);
        assert_eq!(cfg.verify_timeout_secs, 30);
        assert!(cfg.audit_log);
    }

    #[test]
    fn config_requires_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run(ConfigCmd::List, tmp.path()).is_err());
    }
}
