//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::schema::StorageBackend;
use crate::config::{Config, ConfigManager};
use crate::error::{PrecacheError, PrecacheResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.journal",
    "general.journal_path",
    "origin.base_url",
    "origin.cache_bust_param",
    "origin.timeout_secs",
    "origin.max_concurrent_fetches",
    "build.manifest",
    "build.shell",
    "build.source_dir",
    "storage.backend",
    "storage.dir",
    "namespaces.content",
    "namespaces.staging",
    "namespaces.manifest",
    "lifecycle.force_takeover",
];

/// Execute the config command
///
/// Loads the file itself so `init` and `path` work when it is invalid.
pub async fn execute(args: ConfigArgs, manager: &ConfigManager) -> PrecacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            let config = manager.load().await?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = manager.load().await?;
            set_value(&mut config, &key, &value)?;
            if let Some(reason) = config.problems() {
                return Err(PrecacheError::User(format!("Not saved: {}", reason)));
            }
            manager.save(&config).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Apply one dot-separated key to the config
fn set_value(config: &mut Config, key: &str, value: &str) -> PrecacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = value.to_string(),
        ["general", "journal"] => config.general.journal = parse_bool(value)?,
        ["general", "journal_path"] => config.general.journal_path = optional_path(value),

        ["origin", "base_url"] => config.origin.base_url = value.to_string(),
        ["origin", "cache_bust_param"] => config.origin.cache_bust_param = value.to_string(),
        ["origin", "timeout_secs"] => config.origin.timeout_secs = parse_number(value)?,
        ["origin", "max_concurrent_fetches"] => {
            config.origin.max_concurrent_fetches = parse_number(value)?
        }

        ["build", "manifest"] => config.build.manifest = PathBuf::from(value),
        ["build", "shell"] => config.build.shell = PathBuf::from(value),
        ["build", "source_dir"] => config.build.source_dir = optional_path(value),

        ["storage", "backend"] => {
            config.storage.backend = match value {
                "disk" => StorageBackend::Disk,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(PrecacheError::User(format!(
                        "Invalid storage backend: {}. Use disk or memory",
                        value
                    )))
                }
            }
        }
        ["storage", "dir"] => config.storage.dir = optional_path(value),

        ["namespaces", "content"] => config.namespaces.content = value.to_string(),
        ["namespaces", "staging"] => config.namespaces.staging = value.to_string(),
        ["namespaces", "manifest"] => config.namespaces.manifest = value.to_string(),

        ["lifecycle", "force_takeover"] => config.lifecycle.force_takeover = parse_bool(value)?,

        _ => {
            let ctx = UiContext::detect();
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for valid in VALID_KEYS {
                eprintln!("  {}", valid);
            }
            return Err(PrecacheError::User(format!("Unknown config key: {}", key)));
        }
    }

    Ok(())
}

/// Empty string clears an optional path
fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn parse_bool(value: &str) -> PrecacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PrecacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> PrecacheResult<T> {
    value
        .parse()
        .map_err(|_| PrecacheError::User(format!("Invalid number: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_known_keys() {
        let mut config = Config::default();
        set_value(&mut config, "origin.base_url", "https://app.test/").unwrap();
        set_value(&mut config, "origin.max_concurrent_fetches", "4").unwrap();
        set_value(&mut config, "storage.backend", "memory").unwrap();
        set_value(&mut config, "build.source_dir", "dist").unwrap();
        set_value(&mut config, "lifecycle.force_takeover", "no").unwrap();

        assert_eq!(config.origin.base_url, "https://app.test/");
        assert_eq!(config.origin.max_concurrent_fetches, 4);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.build.source_dir, Some(PathBuf::from("dist")));
        assert!(!config.lifecycle.force_takeover);

        set_value(&mut config, "build.source_dir", "").unwrap();
        assert!(config.build.source_dir.is_none());
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(set_value(&mut config, "origin.timeout_secs", "soon").is_err());
        assert!(set_value(&mut config, "storage.backend", "s3").is_err());
        assert!(set_value(&mut config, "vm.name", "x").is_err());
    }
}
