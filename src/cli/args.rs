//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// genrepo - locate built package repositories by git ref
///
/// Resolves a branch, tag or commit prefix to the newest build that has
/// output for a platform and prints the repository URL.
#[derive(Parser, Debug)]
#[command(name = "genrepo")]
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
    #[arg(short, long, global = true, env = "GENREPO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the repository URL for a ref on one platform
    Resolve(ResolveArgs),

    /// Answer JSON-lines requests from stdin until EOF
    Serve(ServeArgs),

    /// Inspect or prune remembered results
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Distribution (rhel, centos, debian, ubuntu)
    #[arg(long)]
    pub distro: String,

    /// Release version (e.g. 6.5, wheezy)
    #[arg(long)]
    pub releasever: String,

    /// Architecture (i386 or x86_64)
    #[arg(long)]
    pub arch: String,

    /// Git remote URL
    #[arg(long)]
    pub url: String,

    /// Branch, tag or commit (prefix)
    #[arg(long = "ref", visible_aliases = ["commit", "branch"])]
    pub reference: String,

    /// Fall back to the last known result if the lookup fails
    #[arg(long, visible_alias = "allow-old")]
    pub allow_stale: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: ResponseFormat,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Override the sweep interval in seconds
    #[arg(long)]
    pub sweep_interval: Option<u64>,
}

/// How a resolve response is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponseFormat {
    /// Just the message
    Plain,
    /// `{"message": ..., "status": ...}`
    Json,
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
}

/// Output format for list command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List remembered results, most recently used first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove results not used recently
    Sweep {
        /// Remove results unused for more than N days (default: from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Remove every remembered result
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_resolve() {
        let cli = Cli::parse_from([
            "genrepo",
            "resolve",
            "--distro",
            "rhel",
            "--releasever",
            "6.5",
            "--arch",
            "x86_64",
            "--url",
            "git@example.com:proj.git",
            "--ref",
            "mybranch",
        ]);
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.reference, "mybranch");
                assert!(!args.allow_stale);
                assert_eq!(args.format, ResponseFormat::Plain);
            }
            _ => panic!("expected Resolve command"),
        }
    }

    #[test]
    fn cli_parses_resolve_aliases() {
        let cli = Cli::parse_from([
            "genrepo", "resolve", "--distro", "debian", "--releasever", "wheezy", "--arch",
            "i386", "--url", "u", "--commit", "abc", "--allow-old", "-f", "json",
        ]);
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.reference, "abc");
                assert!(args.allow_stale);
                assert_eq!(args.format, ResponseFormat::Json);
            }
            _ => panic!("expected Resolve command"),
        }
    }

    #[test]
    fn cli_parses_cache_sweep() {
        let cli = Cli::parse_from(["genrepo", "cache", "sweep", "--days", "3"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Sweep { days },
            }) => assert_eq!(days, Some(3)),
            _ => panic!("expected cache sweep"),
        }
    }

    #[test]
    fn cli_parses_cache_clear_yes() {
        let cli = Cli::parse_from(["genrepo", "cache", "clear", "-y"]);
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { yes: true }
            })
        ));
    }

    #[test]
    fn cli_parses_config_init_force() {
        let cli = Cli::parse_from(["genrepo", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(args) => {
                assert!(matches!(args.action, Some(ConfigAction::Init { force: true })))
            }
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["genrepo", "serve"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["genrepo", "-v", "serve"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["genrepo", "-vv", "serve"]);
        assert_eq!(cli.verbose, 2);
    }
}
