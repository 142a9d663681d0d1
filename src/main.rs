use anyhow::{Context, Result, bail};
use std::process::{Command, Stdio};

use patchpick::cli::{self, Commands, GateAction};
use patchpick::engine::{ReviewEngine, UndoKind, UndoOutcome};
use patchpick::gate::{check_gate, disable_gate, enable_gate};
use patchpick::git::GitCli;
use patchpick::store::ReviewStore;
use patchpick::{DiffFile, HunkStatus};

fn main() -> Result<()> {
    let args = cli::parse_args();

    match args.command {
        None | Some(Commands::Status) => handle_status()?,
        Some(Commands::Show(args)) => handle_show(&args.file)?,
        Some(Commands::Approve(args)) => handle_approve(&args.file, args.hunk.as_deref())?,
        Some(Commands::Unapprove(args)) => handle_unapprove(&args.file, &args.hunk)?,
        Some(Commands::Reject(args)) => handle_reject(&args.file, args.hunk.as_deref())?,
        Some(Commands::Undo) => handle_undo()?,
        Some(Commands::Gate { action }) => match action {
            GateAction::Check => handle_gate_check()?,
            GateAction::Enable => {
                let git = GitCli::discover()?;
                enable_gate(git.repo_root())?;
                println!("✓ Review gate enabled (pre-commit hook installed)");
            }
            GateAction::Disable => {
                let git = GitCli::discover()?;
                disable_gate(git.repo_root())?;
                println!("✓ Review gate disabled");
            }
        },
        Some(Commands::Commit { git_args }) => handle_commit(&git_args)?,
    }

    Ok(())
}

/// Open the engine over the repository of the current directory.
fn open_engine() -> Result<ReviewEngine<GitCli>> {
    let git = GitCli::discover().context("Failed to locate git repository")?;

    let state_dir = git.repo_root().join(".git/patchpick");
    std::fs::create_dir_all(&state_dir).context("Failed to create state directory")?;
    let store = ReviewStore::open(&state_dir.join("review.db"))?;

    Ok(ReviewEngine::new(git, store)?)
}

fn status_symbol(status: HunkStatus) -> &'static str {
    match status {
        HunkStatus::Approved => "✓",
        HunkStatus::Pending => "○",
        HunkStatus::Rejected => "✗",
    }
}

/// Print the current diff with per-hunk statuses and a progress summary.
fn handle_status() -> Result<()> {
    let mut engine = open_engine()?;
    let files = engine.load()?;

    if files.is_empty() {
        println!("No changes to review");
        return Ok(());
    }

    let mut approved = 0;
    let mut pending = 0;

    for file in &files {
        if file.is_binary {
            println!("{} (binary, not reviewable)", file.path());
            continue;
        }
        println!("{}", file.path());
        for (hunk, status) in file.hunks.iter().zip(engine.statuses(file)) {
            match status {
                HunkStatus::Approved => approved += 1,
                _ => pending += 1,
            }
            println!(
                "  {} {:<12} {}",
                status_symbol(status),
                hunk.id.as_deref().unwrap_or("-"),
                hunk.header
            );
        }
    }

    println!("─────────────────────────────────────");
    println!("  Approved: {approved}   Pending: {pending}");
    if pending == 0 {
        println!("\n✓ All hunks approved!");
    }
    Ok(())
}

/// Print one file's hunks with surrounding on-disk context.
fn handle_show(path: &str) -> Result<()> {
    let mut engine = open_engine()?;
    let files = engine.load()?;
    let Some(file) = find_file(&files, path) else {
        println!("No changes in {path}");
        return Ok(());
    };

    let content = engine.file_content(path).unwrap_or_default();

    for (hunk, status) in file.hunks.iter().zip(engine.statuses(file)) {
        println!(
            "{} {} {}",
            status_symbol(status),
            hunk.id.as_deref().unwrap_or("-"),
            hunk.header
        );
        // Lead-in from the working copy: the line just before the change
        // point on the new side.
        if hunk.new_start > 1
            && let Some(line) = content.get(hunk.new_start as usize - 2)
        {
            println!("  {line}");
        }
        for raw in hunk.raw_lines.iter().skip(1) {
            println!("  {raw}");
        }
        println!();
    }
    Ok(())
}

fn handle_approve(path: &str, hunk_id: Option<&str>) -> Result<()> {
    let mut engine = open_engine()?;
    let files = engine.load()?;
    let Some(file) = find_file(&files, path) else {
        bail!("No changes in {path}");
    };

    match hunk_id {
        Some(id) => {
            engine.approve(path, id)?;
            println!("✓ Approved {id} in {path}");
        }
        None => {
            let count = engine.approve_all(path, file)?;
            println!("✓ Approved {count} hunks in {path}");
        }
    }
    Ok(())
}

fn handle_unapprove(path: &str, hunk_id: &str) -> Result<()> {
    let mut engine = open_engine()?;
    engine.load()?;
    engine.unapprove(path, hunk_id)?;
    println!("○ {hunk_id} in {path} back to pending");
    Ok(())
}

fn handle_reject(path: &str, hunk_id: Option<&str>) -> Result<()> {
    let mut engine = open_engine()?;
    let files = engine.load()?;
    let Some(file) = find_file(&files, path) else {
        bail!("No changes in {path}");
    };

    let remaining = match hunk_id {
        Some(id) => engine
            .reject(path, id, file)
            .with_context(|| format!("Failed to reject {id} in {path}"))?,
        None => engine
            .reject_all(path, file)
            .with_context(|| format!("Failed to reject hunks in {path}"))?,
    };

    match remaining {
        Some(file) => {
            let pending = engine
                .statuses(&file)
                .into_iter()
                .filter(|s| *s == HunkStatus::Pending)
                .count();
            println!("✗ Rejected; {pending} hunks still pending in {path}");
        }
        None => println!("✗ Rejected; {path} has no more differences"),
    }
    Ok(())
}

fn handle_undo() -> Result<()> {
    let mut engine = open_engine()?;
    engine.load()?;

    match engine.undo().context("Undo failed")? {
        UndoOutcome::Undone { file_path, kind } => {
            let verb = match kind {
                UndoKind::Approve => "approval",
                UndoKind::Reject => "rejection",
            };
            println!("↩ Undid {verb} in {file_path}");
        }
        UndoOutcome::Empty => println!("Nothing to undo"),
    }
    Ok(())
}

/// Gate check: exit 0 when every changed file is fully approved.
fn handle_gate_check() -> Result<()> {
    let mut engine = open_engine()?;

    if check_gate(&mut engine)? {
        println!("✓ Review gate passed");
        std::process::exit(0);
    } else {
        eprintln!("✗ Review gate: not every hunk is approved");
        eprintln!("  Run 'patchpick status' to see what is left");
        std::process::exit(1);
    }
}

/// Gate-checked `git commit` pass-through.
fn handle_commit(git_args: &[String]) -> Result<()> {
    let mut engine = open_engine()?;

    if !check_gate(&mut engine)? {
        bail!("Review gate failed: not every hunk is approved. Run 'patchpick status'");
    }

    println!("✓ Review gate passed, proceeding with commit");

    let status = Command::new("git")
        .arg("commit")
        .args(git_args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .context("Failed to execute git commit")?;

    if !status.success() {
        bail!("git commit failed");
    }

    Ok(())
}

fn find_file<'a>(files: &'a [DiffFile], path: &str) -> Option<&'a DiffFile> {
    files.iter().find(|f| f.path() == path && !f.is_binary)
}
