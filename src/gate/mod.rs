use crate::engine::ReviewEngine;
use crate::git::Vcs;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const HOOK_MARKER: &str = "# Installed by patchpick";
const HOOK_CONTENT: &str = "#!/bin/sh
# Installed by patchpick
exec patchpick gate check
";

/// Check whether every changed file is fully resolved (gate passes).
///
/// Binary files cannot be reviewed hunk-by-hunk and are ignored. An empty
/// diff passes trivially.
pub fn check_gate<V: Vcs>(engine: &mut ReviewEngine<V>) -> Result<bool> {
    let files = engine.load()?;
    Ok(files
        .iter()
        .filter(|f| !f.is_binary && !f.hunks.is_empty())
        .all(|f| engine.is_resolved(f.path())))
}

/// Install the pre-commit hook that enforces the review gate.
///
/// If a pre-commit hook already exists, it is backed up to
/// `.git/hooks/pre-commit.backup`.
pub fn enable_gate(repo_root: &Path) -> Result<()> {
    let hooks_dir = repo_root.join(".git/hooks");
    let hook_path = hooks_dir.join("pre-commit");
    let backup_path = hooks_dir.join("pre-commit.backup");

    fs::create_dir_all(&hooks_dir).context("Failed to create .git/hooks directory")?;

    if hook_path.exists() {
        fs::copy(&hook_path, &backup_path).context("Failed to backup existing pre-commit hook")?;
    }

    fs::write(&hook_path, HOOK_CONTENT).context("Failed to write pre-commit hook")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms).context("Failed to make hook executable")?;
    }

    Ok(())
}

/// Remove the pre-commit hook.
///
/// Only removes the hook if it contains the patchpick marker comment, so
/// user-created hooks are never deleted.
pub fn disable_gate(repo_root: &Path) -> Result<()> {
    let hook_path = repo_root.join(".git/hooks/pre-commit");

    if !hook_path.exists() {
        return Ok(());
    }

    let content = fs::read_to_string(&hook_path).context("Failed to read pre-commit hook")?;

    if content.contains(HOOK_MARKER) {
        fs::remove_file(&hook_path).context("Failed to remove pre-commit hook")?;
    }

    Ok(())
}
