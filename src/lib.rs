pub mod cli;
pub mod engine;
pub mod gate;
pub mod git;
pub mod identity;
pub mod parser;
pub mod patch;
pub mod splitter;
pub mod store;

/// Review status of a single hunk.
///
/// `Rejected` is transient: a rejected hunk has been reverse-applied out of
/// the working tree, so its identity is removed from the status map as soon
/// as the apply succeeds. Only the undo stack remembers it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkStatus {
    Pending,
    Approved,
    Rejected,
}

/// Classification of a single diff body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Add,
    Remove,
    Context,
}

/// One line of a hunk body, without its leading prefix character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

/// A contiguous change region belonging to one file.
///
/// `old_start`/`new_start` are 1-based; a count of 0 is legal (pure
/// insertion or deletion) and its paired start denotes the line *before*
/// the change point, per the unified-diff zero-context convention.
///
/// `raw_lines` holds the literal diff-format lines (header plus one
/// prefixed line per body line, including any `\ No newline at end of
/// file` markers), enough to reconstruct a patch byte-for-byte.
///
/// `id` is assigned after splitting; `None` until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub header: String,
    pub lines: Vec<DiffLine>,
    pub raw_lines: Vec<String>,
    pub id: Option<String>,
}

impl Hunk {
    /// Changed (add/remove) lines only, in original order.
    pub fn changed_lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(|l| l.kind != LineKind::Context)
    }
}

/// One file's worth of parsed diff.
///
/// A binary file has no hunks and is excluded from hunk-level review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<Hunk>,
    pub is_binary: bool,
    pub header_lines: Vec<String>,
}

impl DiffFile {
    /// The path this file is tracked under (the post-change path when it
    /// exists, otherwise the pre-change path of a deleted file).
    pub fn path(&self) -> &str {
        if self.new_path.is_empty() || self.new_path == "/dev/null" {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}
