//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::entity::EntityKind;

/// Arguments of `scan`.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Saved HTML page to filter
    pub page: PathBuf,

    /// URL the page was loaded from (enables message surfaces on message pages)
    #[arg(long)]
    pub url: Option<String>,

    /// Write the filtered HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the scan report as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments of `replay`.
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// Saved HTML page to start from
    pub page: PathBuf,

    /// HTML fragments inserted one after another
    #[arg(required = true, num_args = 1..)]
    pub fragments: Vec<PathBuf>,

    /// Selector of the element fragments are appended to
    #[arg(long, default_value = "body")]
    pub into: String,

    /// Pause between insertions, in milliseconds
    #[arg(long, default_value = "20")]
    pub interval_ms: u64,

    /// URL the page was loaded from
    #[arg(long)]
    pub url: Option<String>,

    /// Write the filtered HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the engine statistics as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// A user or board on the command line.
#[derive(Debug, Args)]
pub struct EntityArgs {
    /// Username, or board name with --board
    pub id: String,

    /// Treat the id as a board name
    #[arg(short, long)]
    pub board: bool,
}

impl EntityArgs {
    /// The entity kind selected by the flags.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        if self.board {
            EntityKind::Board
        } else {
            EntityKind::User
        }
    }
}

/// Arguments of `label`.
#[derive(Debug, Args)]
pub struct LabelCommand {
    /// Blocked username
    pub user: String,

    /// Replacement text; omit to restore the default
    pub label: Option<String>,
}

/// Arguments of `list`.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments of `export`.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Backup file to write (defaults to a timestamped name in the current directory)
    pub file: Option<PathBuf>,
}

/// Arguments of `import`.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Backup file to read
    pub file: PathBuf,

    /// Replace the current lists instead of merging into them
    #[arg(long)]
    pub replace: bool,

    /// Answer yes to the newer-version prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_args_kind() {
        let user = EntityArgs {
            id: "alice".to_string(),
            board: false,
        };
        assert_eq!(user.kind(), EntityKind::User);

        let board = EntityArgs {
            id: "Lounge".to_string(),
            board: true,
        };
        assert_eq!(board.kind(), EntityKind::Board);
    }
}
