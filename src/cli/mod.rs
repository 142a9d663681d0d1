use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "patchpick",
    about = "Hunk-by-hunk review of uncommitted changes: keep, reject, undo"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current diff with per-hunk review statuses (default).
    Status,
    /// Show one file's hunks with surrounding on-disk context.
    Show(FileArgs),
    /// Approve one hunk, or every pending hunk of a file.
    Approve(HunkArgs),
    /// Return one approved hunk to pending.
    Unapprove(IdArgs),
    /// Reject one hunk, or every pending hunk of a file, removing the
    /// change from the working tree.
    Reject(HunkArgs),
    /// Undo the most recent approve or reject.
    Undo,
    /// Manage the pre-commit review gate.
    Gate {
        #[command(subcommand)]
        action: GateAction,
    },
    /// Commit after the review gate passes.
    Commit {
        /// Additional arguments to pass to git commit (after --).
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        git_args: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// File path as it appears in the diff.
    pub file: String,
}

#[derive(Args, Debug)]
pub struct HunkArgs {
    /// File path as it appears in the diff.
    pub file: String,
    /// Hunk identity (from `status`). When omitted, the command applies to
    /// every pending hunk of the file.
    #[arg(short = 'H', long)]
    pub hunk: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// File path as it appears in the diff.
    pub file: String,
    /// Hunk identity (from `status`).
    #[arg(short = 'H', long)]
    pub hunk: String,
}

#[derive(Subcommand, Debug)]
pub enum GateAction {
    /// Check that every changed file is fully approved.
    Check,
    /// Install the pre-commit hook.
    Enable,
    /// Remove the pre-commit hook.
    Disable,
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
