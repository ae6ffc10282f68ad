use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "ghmon", version = VERSION, about = "Interactive GitHub Actions monitor")]
pub struct Cli {
    /// Repository in owner/name format (auto-detected from cwd)
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Comma-separated repositories to monitor together (owner/a,owner/b)
    #[arg(long)]
    pub repos: Option<String>,

    /// Branch to show runs for (defaults to the current git branch)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Start in watch mode
    #[arg(short, long)]
    pub watch: bool,

    /// Poll interval in seconds while watching
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll: u64,

    /// Send a desktop notification when a watched run completes
    #[arg(long)]
    pub notify: bool,

    /// Executable run with GHMON_* variables when a watched run completes
    #[arg(long, value_name = "PATH")]
    pub hook: Option<PathBuf>,

    /// YAML file listing repositories to monitor
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Print the latest run and its jobs as plain text and exit
    #[arg(long, conflicts_with = "json")]
    pub plain: bool,

    /// Print the latest run and its jobs as JSON and exit
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/ghmon/debug.log
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<RunCommand>,
}

impl Cli {
    /// One-shot reporting instead of the interactive session.
    pub fn is_one_shot(&self) -> bool {
        self.plain || self.json
    }
}

/// Non-interactive actions on a single run.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    /// Rerun a workflow run (the latest one by default)
    Retry {
        /// Run id to rerun
        #[arg(long)]
        run: Option<u64>,
        /// Rerun only the failed jobs
        #[arg(long)]
        failed: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Cancel an in-progress workflow run
    Cancel {
        /// Run id to cancel
        #[arg(long)]
        run: Option<u64>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Trigger a workflow_dispatch event
    Dispatch {
        /// Workflow file name, e.g. ci.yml
        workflow: String,
        /// Branch or tag to run on (defaults to the active branch)
        #[arg(long = "ref", value_name = "REF")]
        git_ref: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// True when the operator answered yes to a `[y/N]` prompt.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ghmon").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.poll, 5);
        assert_eq!(cli.config, PathBuf::from("ghmon.yml"));
        assert!(!cli.watch);
        assert!(!cli.is_one_shot());
        assert_eq!(cli.command, None);
    }

    #[test]
    fn zero_poll_is_rejected() {
        assert!(Cli::try_parse_from(["ghmon", "--poll", "0"]).is_err());
    }

    #[test]
    fn plain_and_json_conflict() {
        assert!(Cli::try_parse_from(["ghmon", "--plain", "--json"]).is_err());
    }

    #[test]
    fn retry_subcommand() {
        let cli = parse(&["-r", "o/r", "retry", "--run", "42", "--failed"]);
        assert_eq!(cli.repo.as_deref(), Some("o/r"));
        assert_eq!(
            cli.command,
            Some(RunCommand::Retry {
                run: Some(42),
                failed: true,
                yes: false
            })
        );
    }

    #[test]
    fn dispatch_subcommand() {
        let cli = parse(&["dispatch", "ci.yml", "--ref", "main", "--yes"]);
        assert_eq!(
            cli.command,
            Some(RunCommand::Dispatch {
                workflow: "ci.yml".to_string(),
                git_ref: Some("main".to_string()),
                yes: true
            })
        );
    }

    #[test]
    fn confirmation_answers() {
        assert!(is_confirmation("y\n"));
        assert!(is_confirmation(" YES "));
        assert!(!is_confirmation(""));
        assert!(!is_confirmation("n"));
    }
}
