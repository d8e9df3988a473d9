//! Command-line interface for cc98-filter.
//!
//! This module provides the CLI structure for the `cc98f` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, EntityArgs, ExportCommand, ImportCommand, LabelCommand, ListCommand,
    ReplayCommand, ScanCommand,
};

use crate::logging::Verbosity;

/// cc98f - Hide blocked users and boards on CC98 pages
///
/// Manages the block list and runs the filter engine over saved pages.
#[derive(Debug, Parser)]
#[command(name = "cc98f")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Filter a saved page once
    Scan(ScanCommand),

    /// Insert fragments into a page over time and let the engine keep up
    Replay(ReplayCommand),

    /// Add a user or board to the block list
    Block(EntityArgs),

    /// Remove a user or board from the block list
    Unblock(EntityArgs),

    /// Re-enable a listed user or board
    Enable(EntityArgs),

    /// Keep a user or board listed but stop filtering it
    Disable(EntityArgs),

    /// Set the text shown in place of a blocked user's content
    Label(LabelCommand),

    /// Show the block list
    List(ListCommand),

    /// Write a backup of the block list
    Export(ExportCommand),

    /// Load a backup into the block list
    Import(ImportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn list_cli(quiet: bool, verbose: u8) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::List(ListCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "cc98f");
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(list_cli(true, 2).verbosity(), Verbosity::Quiet);
        assert_eq!(list_cli(false, 0).verbosity(), Verbosity::Normal);
        assert_eq!(list_cli(false, 1).verbosity(), Verbosity::Verbose);
        assert_eq!(list_cli(false, 2).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "cc98f",
            "scan",
            "page.html",
            "--url",
            "https://www.cc98.org/topic/1",
            "-o",
            "out.html",
        ])
        .unwrap();
        match cli.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.page, PathBuf::from("page.html"));
                assert_eq!(cmd.url.as_deref(), Some("https://www.cc98.org/topic/1"));
                assert_eq!(cmd.output, Some(PathBuf::from("out.html")));
                assert!(!cmd.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_replay_defaults() {
        let cli = Cli::try_parse_from(["cc98f", "replay", "page.html", "a.html", "b.html"]).unwrap();
        match cli.command {
            Command::Replay(cmd) => {
                assert_eq!(cmd.fragments.len(), 2);
                assert_eq!(cmd.into, "body");
                assert_eq!(cmd.interval_ms, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_replay_needs_fragments() {
        assert!(Cli::try_parse_from(["cc98f", "replay", "page.html"]).is_err());
    }

    #[test]
    fn test_parse_block_board() {
        let cli = Cli::try_parse_from(["cc98f", "block", "--board", "Lounge"]).unwrap();
        match cli.command {
            Command::Block(args) => {
                assert_eq!(args.id, "Lounge");
                assert!(args.board);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_label_clear() {
        let cli = Cli::try_parse_from(["cc98f", "label", "alice"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Label(LabelCommand { label: None, .. })
        ));
    }

    #[test]
    fn test_parse_import() {
        let cli =
            Cli::try_parse_from(["cc98f", "import", "backup.json", "--replace", "--yes"]).unwrap();
        match cli.command {
            Command::Import(cmd) => {
                assert!(cmd.replace);
                assert!(cmd.yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["cc98f", "config", "show", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["cc98f", "list", "-vv", "-c", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
