//! `ragdocs config` command
//!
//! Get or set configuration values.
//!
//! # Usage
//! ```bash
//! ragdocs config                                  # Show config file
//! ragdocs config database.auto_update             # Get effective value
//! ragdocs config database.download_url "https://host/database/download"
//! ragdocs config --path                           # Show config file path
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config key (e.g., database.download_url, query.default_top_k)
    pub key: Option<String>,

    /// Value to set
    pub value: Option<String>,

    /// List all config values
    #[arg(long)]
    pub list: bool,

    /// Show config file path
    #[arg(long)]
    pub path: bool,
}

pub fn run(args: ConfigArgs, config_path: &Path) -> Result<()> {
    if args.path {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{} File does not exist yet", "⚠".yellow());
        }
        return Ok(());
    }

    let Some(key) = args.key.as_deref().filter(|_| !args.list) else {
        return list(config_path);
    };

    match &args.value {
        Some(value) => {
            set_config_value(config_path, key, value)?;
            println!(
                "{} Set {} = {} (in {})",
                "✓".green(),
                key,
                value,
                config_path.display()
            );
        }
        None => match get_config_value(config_path, key)? {
            Some(v) => println!("{}", v),
            None => println!("(not set)"),
        },
    }

    Ok(())
}

fn list(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        let content = fs::read_to_string(config_path)?;
        println!("{} ({}):\n", "Configuration".bold(), config_path.display());
        println!("{}", content);
    } else {
        println!("No config file at {}", config_path.display());
        println!();
        println!("Create one with:");
        println!("  ragdocs config database.download_url <url>");
    }
    Ok(())
}

/// Set a nested config value using dot notation (e.g., "database.auto_update")
///
/// The edited document must still deserialize as a [`Config`]; otherwise the
/// file is left untouched.
fn set_config_value(path: &Path, key: &str, val: &str) -> Result<()> {
    use toml_edit::{value, DocumentMut};

    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = content.parse().context("Failed to parse config.toml")?;

    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        [section, field] => {
            if doc.get(section).is_none() {
                doc[*section] = toml_edit::table();
            }
            doc[*section][*field] = value(parse_toml_value(val));
        }
        _ => bail!("Invalid key: {}. Use section.key (e.g. database.auto_update)", key),
    }

    let updated = doc.to_string();
    toml::from_str::<Config>(&updated)
        .with_context(|| format!("Invalid value for {}: {}", key, val))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, updated)?;
    Ok(())
}

/// Effective value of a key: the file's setting, else the built-in default
fn get_config_value(path: &Path, key: &str) -> Result<Option<String>> {
    let config = if path.exists() {
        Config::load_from(path)?
    } else {
        Config::default()
    };
    let doc = toml::Value::try_from(&config).context("Failed to serialize config")?;

    let val = key
        .split('.')
        .try_fold(&doc, |node, part| node.get(part));

    Ok(val.map(|v| match v {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

/// Parse string value to appropriate TOML type
fn parse_toml_value(s: &str) -> toml_edit::Value {
    if s == "true" {
        return true.into();
    }
    if s == "false" {
        return false.into();
    }

    if let Ok(i) = s.parse::<i64>() {
        return i.into();
    }

    if let Ok(f) = s.parse::<f64>() {
        return f.into();
    }

    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_then_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        set_config_value(&path, "database.download_url", "http://host/database/download").unwrap();
        set_config_value(&path, "database.auto_update", "false").unwrap();

        assert_eq!(
            get_config_value(&path, "database.download_url").unwrap().as_deref(),
            Some("http://host/database/download")
        );
        assert_eq!(
            get_config_value(&path, "database.auto_update").unwrap().as_deref(),
            Some("false")
        );

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.database.auto_update);
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(
            get_config_value(&path, "query.default_top_k").unwrap().as_deref(),
            Some("8")
        );
        assert!(get_config_value(&path, "query.nope").unwrap().is_none());
    }

    #[test]
    fn test_set_preserves_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# my settings\n[query]\ndefault_top_k = 4\n").unwrap();

        set_config_value(&path, "query.default_version", "2024").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# my settings"));
        assert!(content.contains("default_top_k = 4"));
        assert!(content.contains("default_version = \"2024\""));
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set_config_value(&path, "query.default_top_k", "many").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_set_rejects_flat_key() {
        let dir = tempdir().unwrap();
        assert!(set_config_value(&dir.path().join("c.toml"), "auto_update", "true").is_err());
    }
}
