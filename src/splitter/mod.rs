use crate::identity::assign_ids;
use crate::parser::parse_diff;
use crate::{DiffFile, DiffLine, Hunk, LineKind};

/// Split a hunk into one sub-hunk per maximal contiguous run of
/// added/removed lines.
///
/// Context lines advance the old/new line cursors and are dropped;
/// sub-hunks carry no context. When a sub-hunk has no lines on one side,
/// the emitted start for that side is the line *before* the change point,
/// per the unified-diff zero-context header convention, so each sub-hunk
/// applies (and reverse-applies) on its own.
pub fn split_hunk(hunk: &Hunk) -> Vec<Hunk> {
    // A zero-count source header already names the line before the change
    // point; the cursor tracks the change position itself.
    let mut old_cursor = hunk.old_start + u32::from(hunk.old_count == 0);
    let mut new_cursor = hunk.new_start + u32::from(hunk.new_count == 0);

    let mut subs = Vec::new();
    let mut run: Vec<DiffLine> = Vec::new();
    let mut run_old_start = old_cursor;
    let mut run_new_start = new_cursor;

    let mut flush = |run: &mut Vec<DiffLine>, old_start: u32, new_start: u32| {
        if run.is_empty() {
            return;
        }
        subs.push(build_sub_hunk(std::mem::take(run), old_start, new_start));
    };

    for line in &hunk.lines {
        match line.kind {
            LineKind::Context => {
                flush(&mut run, run_old_start, run_new_start);
                old_cursor += 1;
                new_cursor += 1;
            }
            LineKind::Add => {
                if run.is_empty() {
                    run_old_start = old_cursor;
                    run_new_start = new_cursor;
                }
                run.push(line.clone());
                new_cursor += 1;
            }
            LineKind::Remove => {
                if run.is_empty() {
                    run_old_start = old_cursor;
                    run_new_start = new_cursor;
                }
                run.push(line.clone());
                old_cursor += 1;
            }
        }
    }
    flush(&mut run, run_old_start, run_new_start);

    subs
}

fn build_sub_hunk(run: Vec<DiffLine>, group_old_start: u32, group_new_start: u32) -> Hunk {
    let old_count = run.iter().filter(|l| l.kind == LineKind::Remove).count() as u32;
    let new_count = run.iter().filter(|l| l.kind == LineKind::Add).count() as u32;

    // A zero start with a nonzero count is malformed but parseable; the
    // line-before-change-point emission must not underflow on it.
    let old_start = if old_count == 0 {
        group_old_start.saturating_sub(1)
    } else {
        group_old_start
    };
    let new_start = if new_count == 0 {
        group_new_start.saturating_sub(1)
    } else {
        group_new_start
    };

    let header = format!("@@ -{old_start},{old_count} +{new_start},{new_count} @@");

    let mut raw_lines = Vec::with_capacity(run.len() + 1);
    raw_lines.push(header.clone());
    for line in &run {
        let prefix = match line.kind {
            LineKind::Add => '+',
            LineKind::Remove => '-',
            LineKind::Context => ' ',
        };
        raw_lines.push(format!("{prefix}{}", line.text));
    }

    Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        header,
        lines: run,
        raw_lines,
        id: None,
    }
}

/// Full pipeline entry point: parse diff text, split every non-binary
/// file's hunks into minimal sub-hunks, and assign content identities.
pub fn split_files(diff_text: &str) -> Vec<DiffFile> {
    let mut files = parse_diff(diff_text);
    for file in &mut files {
        if file.is_binary {
            continue;
        }
        file.hunks = file.hunks.iter().flat_map(split_hunk).collect();
        assign_ids(file);
    }
    files
}
