//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use dispatcher::FrontendSelector;

/// Revalidator - cache revalidation webhook dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "revalidator",
    author,
    version,
    about = "Cache revalidation webhook dispatcher",
    long_about = "Notifies decoupled frontends that cached content must be refreshed.\n\n\
                  Sends authenticated webhooks per tag or path, logs every attempt, \n\
                  tracks consecutive failures, alerts operators and drains the \n\
                  durable retry queue."
)]
pub struct Cli {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "revalidator.toml",
        global = true,
        env = "REVALIDATOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "REVALIDATOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "REVALIDATOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Revalidate a tag, a path or an entity
    #[command(subcommand)]
    Revalidate(RevalidateCommand),

    /// Send a test ping to one or all frontends
    Test(TestArgs),

    /// Show recent dispatch attempts
    Logs(LogsArgs),

    /// Success rate and p95 latency over recent attempts
    Stats(StatsArgs),

    /// List configured frontends with their recent health
    Frontends(FrontendsArgs),

    /// Drain the retry queue
    Worker(WorkerArgs),

    /// Run diagnostic query checks
    Check(CheckArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),
}

/// Frontend targeting shared by the dispatching commands
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Frontend id to dispatch to
    #[arg(short, long, default_value = contracts::DEFAULT_FRONTEND_ID)]
    pub frontend: String,

    /// Dispatch to every configured frontend
    #[arg(long, conflicts_with = "frontend")]
    pub all: bool,
}

impl TargetArgs {
    pub fn selector(&self) -> FrontendSelector {
        if self.all {
            FrontendSelector::All
        } else {
            FrontendSelector::one(self.frontend.clone())
        }
    }
}

/// Targets of the `revalidate` command
#[derive(Subcommand, Debug)]
pub enum RevalidateCommand {
    /// Revalidate a cache tag
    Tag {
        /// Cache tag, e.g. `node:42`
        tag: String,

        /// Domain recorded with the attempt
        #[arg(short, long, default_value = contracts::domains::CONTENT)]
        domain: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Enqueue for the worker instead of dispatching now
        #[arg(long)]
        queue: bool,
    },

    /// Revalidate a URL path
    Path {
        /// Path, e.g. `/blog/hello`
        path: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Enqueue for the worker instead of dispatching now
        #[arg(long)]
        queue: bool,
    },

    /// Revalidate every cache tag of a changed entity
    Entity {
        /// Entity kind: content, taxonomy_term or menu
        kind: String,

        /// Entity id
        id: String,

        /// Bundle or vocabulary
        #[arg(short, long)]
        bundle: Option<String>,

        #[command(flatten)]
        target: TargetArgs,

        /// Enqueue for the worker instead of dispatching now
        #[arg(long)]
        queue: bool,
    },
}

/// Arguments for the `test` command
#[derive(Parser, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Scope recorded with the ping
    #[arg(short, long, default_value = dispatcher::DEFAULT_TEST_SCOPE)]
    pub scope: String,
}

/// Arguments for the `logs` command
#[derive(Parser, Debug)]
pub struct LogsArgs {
    #[arg(short, long)]
    pub frontend: Option<String>,

    #[arg(short, long)]
    pub domain: Option<String>,

    #[arg(short, long)]
    pub scope: Option<String>,

    /// revalidate or test
    #[arg(short, long)]
    pub action: Option<String>,

    /// Maximum number of rows
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Output as CSV
    #[arg(long, conflicts_with = "json")]
    pub csv: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `stats` command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[arg(short, long, default_value = contracts::DEFAULT_FRONTEND_ID)]
    pub frontend: String,

    #[arg(short, long, default_value = contracts::domains::TEST)]
    pub domain: String,

    #[arg(short, long)]
    pub scope: Option<String>,

    /// Sample size
    #[arg(short = 'n', long, default_value_t = contracts::DEFAULT_STATS_SAMPLE)]
    pub sample: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `frontends` command
#[derive(Parser, Debug)]
pub struct FrontendsArgs {
    /// Number of recent attempts shown per frontend
    #[arg(long, default_value = "5")]
    pub recent: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `worker` command
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Stop after claiming this many items
    #[arg(long, env = "REVALIDATOR_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Time budget in seconds (defaults to queue.max_runtime_secs)
    #[arg(long, env = "REVALIDATOR_MAX_RUNTIME")]
    pub max_runtime: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "REVALIDATOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `check` command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Run only the check with this label
    #[arg(short, long)]
    pub label: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revalidate_tag_defaults() {
        let cli = Cli::parse_from(["revalidator", "revalidate", "tag", "node:42"]);
        match cli.command {
            Commands::Revalidate(RevalidateCommand::Tag {
                tag,
                domain,
                target,
                queue,
            }) => {
                assert_eq!(tag, "node:42");
                assert_eq!(domain, "content");
                assert_eq!(target.selector(), FrontendSelector::one("default"));
                assert!(!queue);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("revalidator.toml"));
    }

    #[test]
    fn test_all_selects_every_frontend() {
        let cli = Cli::parse_from(["revalidator", "test", "--all", "--scope", "smoke"]);
        match cli.command {
            Commands::Test(args) => {
                assert_eq!(args.target.selector(), FrontendSelector::All);
                assert_eq!(args.scope, "smoke");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_all_conflicts_with_frontend() {
        let res = Cli::try_parse_from([
            "revalidator",
            "revalidate",
            "path",
            "/blog",
            "--all",
            "--frontend",
            "site_b",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["revalidator", "logs", "-n", "5", "--config", "/etc/r.toml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/r.toml"));
        match cli.command {
            Commands::Logs(args) => assert_eq!(args.limit, 5),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
