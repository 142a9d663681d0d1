use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not in a git repository")]
    NotARepo,
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("patch does not apply: {0}")]
    ApplyFailed(String),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;

/// The version-control operations the review core depends on.
///
/// `read_diff`/`read_file_diff` compare the working tree (including staged
/// changes) against the last commit. `apply_forward`/`apply_reverse` take a
/// single-hunk zero-context patch and must fail loudly when it does not
/// apply; the engine relies on that to keep its status map honest.
pub trait Vcs {
    fn read_diff(&self) -> Result<String>;
    fn read_file_diff(&self, path: &str) -> Result<String>;
    fn read_file_content(&self, path: &str) -> Result<Vec<String>>;
    fn apply_forward(&mut self, patch: &str) -> Result<()>;
    fn apply_reverse(&mut self, patch: &str) -> Result<()>;
}

/// `Vcs` implementation that shells out to the `git` binary.
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }

    /// Locate the repository root of the current directory.
    pub fn discover() -> Result<Self> {
        let output = Command::new("git")
            .arg("rev-parse")
            .arg("--show-toplevel")
            .output()?;

        if !output.status.success() {
            return Err(GitError::NotARepo);
        }

        let root = String::from_utf8(output.stdout)?.trim().to_string();
        Ok(Self::new(PathBuf::from(root)))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn diff(&self, path: Option<&str>) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_root).arg("diff").arg("HEAD");
        if let Some(path) = path {
            cmd.arg("--").arg(path);
        }
        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed(format!(
                "git diff failed: {stderr}"
            )));
        }

        String::from_utf8(output.stdout).map_err(GitError::from)
    }

    fn apply(&self, patch: &str, reverse: bool) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_root)
            .arg("apply")
            .arg("--unidiff-zero");
        if reverse {
            cmd.arg("-R");
        }
        let mut child = cmd
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(patch.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::ApplyFailed(stderr.trim().to_string()));
        }
        Ok(())
    }
}

impl Vcs for GitCli {
    fn read_diff(&self) -> Result<String> {
        self.diff(None)
    }

    fn read_file_diff(&self, path: &str) -> Result<String> {
        self.diff(Some(path))
    }

    fn read_file_content(&self, path: &str) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(self.repo_root.join(path))?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn apply_forward(&mut self, patch: &str) -> Result<()> {
        self.apply(patch, false)
    }

    fn apply_reverse(&mut self, patch: &str) -> Result<()> {
        self.apply(patch, true)
    }
}
