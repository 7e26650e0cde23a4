//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// precache - offline asset cache manager
///
/// Keeps a local resource cache in sync with a published manifest across
/// releases, and serves requests from it online or offline.
#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRECACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install and activate the current release
    Upgrade(UpgradeArgs),

    /// Request one URL through the cache
    Get(GetArgs),

    /// Fetch every manifest resource not cached yet
    Prefetch,

    /// Show cache namespaces and how they match the current release
    Status,

    /// Delete the content cache, staging caches and manifest record
    Reset(ResetArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the upgrade command
#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Fill the rest of the manifest after activating
    #[arg(long)]
    pub prefetch: bool,
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// URL or path relative to the configured base URL
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., origin.base_url)
        key: String,
        /// Value to set
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_upgrade() {
        let cli = Cli::parse_from(["precache", "upgrade", "--prefetch"]);
        match cli.command {
            Commands::Upgrade(args) => assert!(args.prefetch),
            _ => panic!("expected Upgrade command"),
        }
    }

    #[test]
    fn cli_parses_get() {
        let cli = Cli::parse_from(["precache", "get", "main.js?v=3", "-o", "out.js"]);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.url, "main.js?v=3");
                assert_eq!(args.method, "GET");
                assert_eq!(args.output, Some(PathBuf::from("out.js")));
            }
            _ => panic!("expected Get command"),
        }
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["precache", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parses_reset() {
        let cli = Cli::parse_from(["precache", "reset", "--yes"]);
        match cli.command {
            Commands::Reset(args) => assert!(args.yes),
            _ => panic!("expected Reset command"),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["precache", "config", "set", "origin.timeout_secs", "10"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value }),
            }) => {
                assert_eq!(key, "origin.timeout_secs");
                assert_eq!(value, "10");
            }
            _ => panic!("expected Config Set command"),
        }
    }

    #[test]
    fn cli_verbose_and_config_are_global() {
        let cli = Cli::parse_from(["precache", "status", "-vv", "--config", "/tmp/p.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }
}
