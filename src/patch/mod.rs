use crate::{DiffFile, Hunk};

/// Build stand-alone unified-diff text for a single sub-hunk.
///
/// The result is a minimal zero-context patch: `---`/`+++` path headers
/// followed by the hunk's `raw_lines` verbatim, newline-terminated. It is
/// accepted by a zero-context-aware applier (`git apply --unidiff-zero`)
/// in both forward and reverse (`-R`) modes.
pub fn build_patch(file: &DiffFile, hunk: &Hunk) -> String {
    let old_path = pick(&file.old_path, &file.new_path);
    let new_path = pick(&file.new_path, &file.old_path);

    let mut patch = format!("--- a/{old_path}\n+++ b/{new_path}\n");
    for raw in &hunk.raw_lines {
        patch.push_str(raw);
        patch.push('\n');
    }
    patch
}

fn pick<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() || preferred == "/dev/null" {
        fallback
    } else {
        preferred
    }
}
