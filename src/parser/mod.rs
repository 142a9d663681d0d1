use crate::{DiffFile, DiffLine, Hunk, LineKind};

/// Parse raw `git diff` output into structured `DiffFile` entries.
///
/// Parses unified diff format, preserving file order and hunk order as they
/// appear in the text. Each hunk keeps its literal diff lines in
/// `raw_lines` so a patch can be reconstructed byte-for-byte. Binary files
/// are flagged and carry no hunks. Parsing is best-effort and never fails:
/// a malformed `@@` header degrades to a zero-span hunk holding only that
/// literal line.
pub fn parse_diff(input: &str) -> Vec<DiffFile> {
    let mut files = Vec::new();
    let mut lines: Vec<&str> = input.split('\n').collect();
    // A trailing newline produces one final empty element; it is not a
    // context line.
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        let Some(marker) = line.strip_prefix("diff --git ") else {
            i += 1;
            continue;
        };
        i += 1;

        let (old_path, new_path) = marker_paths(marker);
        let mut file = DiffFile {
            old_path,
            new_path,
            hunks: Vec::new(),
            is_binary: false,
            header_lines: Vec::new(),
        };

        // Extended headers (mode changes, index lines, rename/similarity)
        // are consumed but not modeled.
        while i < lines.len() {
            let current = lines[i];
            if current.starts_with("diff --git ")
                || current.starts_with("--- ")
                || current.starts_with("@@")
                || current.starts_with("Binary")
            {
                break;
            }
            i += 1;
        }

        if i < lines.len() && lines[i].starts_with("Binary") {
            // Paths stay as recovered from the marker line.
            file.is_binary = true;
            i += 1;
            files.push(file);
            continue;
        }

        if i < lines.len() && lines[i].starts_with("--- ") {
            file.header_lines.push(lines[i].to_string());
            file.old_path = header_path(lines[i]);
            i += 1;
        }
        if i < lines.len() && lines[i].starts_with("+++ ") {
            file.header_lines.push(lines[i].to_string());
            file.new_path = header_path(lines[i]);
            i += 1;
        }

        while i < lines.len() {
            let current = lines[i];
            if current.starts_with("diff --git ") {
                break;
            }
            if current.starts_with("@@") {
                file.hunks.push(parse_hunk(&lines, &mut i));
            } else {
                i += 1;
            }
        }

        files.push(file);
    }

    files
}

/// Parse a single hunk starting at the `@@` line. Always produces a hunk;
/// an unparseable header yields a zero-span pass-through hunk.
fn parse_hunk(lines: &[&str], i: &mut usize) -> Hunk {
    let header_line = lines[*i];
    *i += 1;

    let Some((old_start, old_count, new_start, new_count)) = parse_header(header_line) else {
        return Hunk {
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
            header: header_line.to_string(),
            lines: Vec::new(),
            raw_lines: vec![header_line.to_string()],
            id: None,
        };
    };

    let mut body = Vec::new();
    let mut raw_lines = vec![header_line.to_string()];

    while *i < lines.len() {
        let current = lines[*i];

        if current.starts_with("@@") || current.starts_with("diff --git ") {
            break;
        }

        if let Some(text) = current.strip_prefix('+') {
            body.push(DiffLine {
                kind: LineKind::Add,
                text: text.to_string(),
            });
        } else if let Some(text) = current.strip_prefix('-') {
            body.push(DiffLine {
                kind: LineKind::Remove,
                text: text.to_string(),
            });
        } else if current.starts_with('\\') {
            // "\ No newline at end of file" passes through to the raw
            // patch text only.
            raw_lines.push(current.to_string());
            *i += 1;
            continue;
        } else if current.is_empty() {
            body.push(DiffLine {
                kind: LineKind::Context,
                text: String::new(),
            });
        } else if let Some(text) = current.strip_prefix(' ') {
            body.push(DiffLine {
                kind: LineKind::Context,
                text: text.to_string(),
            });
        } else {
            break;
        }

        raw_lines.push(current.to_string());
        *i += 1;
    }

    Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        header: header_line.to_string(),
        lines: body,
        raw_lines,
        id: None,
    }
}

/// Parse `@@ -old_start[,old_count] +new_start[,new_count] @@ [context]`.
fn parse_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let inner = line.strip_prefix("@@ ")?;
    let inner = &inner[..inner.find(" @@")?];

    let mut parts = inner.split(' ');
    let (old_start, old_count) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(parts.next()?.strip_prefix('+')?)?;

    Some((old_start, old_count, new_start, new_count))
}

/// Parse "start,count" or just "start" (count defaults to 1).
fn parse_range(s: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

/// Extract (old, new) paths from a `diff --git a/<old> b/<new>` marker.
fn marker_paths(marker: &str) -> (String, String) {
    if let Some(rest) = marker.strip_prefix("a/")
        && let Some(at) = rest.rfind(" b/")
    {
        return (rest[..at].to_string(), rest[at + 3..].to_string());
    }
    (marker.to_string(), marker.to_string())
}

/// Extract the path from a `--- `/`+++ ` header line, stripping the `a/` or
/// `b/` prefix when present, otherwise just the fixed 4-character prefix.
fn header_path(line: &str) -> String {
    let rest = line.get(4..).unwrap_or("");
    rest.strip_prefix("a/")
        .or_else(|| rest.strip_prefix("b/"))
        .unwrap_or(rest)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_diff_returns_empty() {
        assert!(parse_diff("").is_empty());
    }

    #[test]
    fn parse_single_file_single_hunk() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    index 1234567..abcdefg 100644\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,3 +1,3 @@\n \
                    line1\n\
                    -line2\n\
                    +line2_modified\n \
                    line3\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].old_path, "file.txt");
        assert_eq!(files[0].new_path, "file.txt");
        assert_eq!(
            files[0].header_lines,
            vec!["--- a/file.txt", "+++ b/file.txt"]
        );
        assert_eq!(files[0].hunks.len(), 1);

        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.old_start, 1);
        assert_eq!(hunk.old_count, 3);
        assert_eq!(hunk.new_start, 1);
        assert_eq!(hunk.new_count, 3);
        assert_eq!(hunk.lines.len(), 4);
        assert_eq!(hunk.lines[0].kind, LineKind::Context);
        assert_eq!(hunk.lines[1].kind, LineKind::Remove);
        assert_eq!(hunk.lines[1].text, "line2");
        assert_eq!(hunk.lines[2].kind, LineKind::Add);
        assert_eq!(hunk.id, None);
    }

    #[test]
    fn raw_lines_reproduce_the_hunk_text() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,3 +1,3 @@ fn main()\n \
                    line1\n\
                    -line2\n\
                    +line2_modified\n \
                    line3\n";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(
            hunk.raw_lines,
            vec![
                "@@ -1,3 +1,3 @@ fn main()",
                " line1",
                "-line2",
                "+line2_modified",
                " line3",
            ]
        );
    }

    #[test]
    fn parse_round_trips_through_raw_lines() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -2,2 +2,3 @@\n \
                    keep\n\
                    -old\n\
                    +new\n\
                    +extra\n";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];

        let mut patch = String::from("--- a/file.txt\n+++ b/file.txt\n");
        for raw in &hunk.raw_lines {
            patch.push_str(raw);
            patch.push('\n');
        }
        // Reparse with a synthetic marker so the patch stands alone.
        let reparsed = parse_diff(&format!("diff --git a/file.txt b/file.txt\n{patch}"));
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].hunks.len(), 1);
        assert_eq!(reparsed[0].hunks[0].lines, hunk.lines);
    }

    #[test]
    fn parse_multiple_files_preserves_order() {
        let diff = "diff --git a/file1.txt b/file1.txt\n\
                    --- a/file1.txt\n\
                    +++ b/file1.txt\n\
                    @@ -1,2 +1,2 @@\n\
                    -old\n\
                    +new\n\
                    diff --git a/file2.txt b/file2.txt\n\
                    --- a/file2.txt\n\
                    +++ b/file2.txt\n\
                    @@ -1,2 +1,2 @@\n\
                    -old2\n\
                    +new2\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), "file1.txt");
        assert_eq!(files[1].path(), "file2.txt");
    }

    #[test]
    fn parse_binary_file_has_no_hunks() {
        let diff = "diff --git a/image.png b/image.png\n\
                    index 1234567..abcdefg 100644\n\
                    Binary files a/image.png and b/image.png differ\n\
                    diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,2 +1,2 @@\n\
                    -old\n\
                    +new\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 2);
        assert!(files[0].is_binary);
        assert_eq!(files[0].old_path, "image.png");
        assert_eq!(files[0].new_path, "image.png");
        assert!(files[0].hunks.is_empty());
        assert!(!files[1].is_binary);
        assert_eq!(files[1].hunks.len(), 1);
    }

    #[test]
    fn parse_new_and_deleted_files() {
        let diff = "diff --git a/new.txt b/new.txt\n\
                    new file mode 100644\n\
                    --- /dev/null\n\
                    +++ b/new.txt\n\
                    @@ -0,0 +1,2 @@\n\
                    +line1\n\
                    +line2\n\
                    diff --git a/gone.txt b/gone.txt\n\
                    deleted file mode 100644\n\
                    --- a/gone.txt\n\
                    +++ /dev/null\n\
                    @@ -1,2 +0,0 @@\n\
                    -line1\n\
                    -line2\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].old_path, "/dev/null");
        assert_eq!(files[0].path(), "new.txt");
        assert_eq!(files[1].new_path, "/dev/null");
        assert_eq!(files[1].path(), "gone.txt");
    }

    #[test]
    fn malformed_header_degrades_to_passthrough_hunk() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ not a real header @@\n\
                    +orphan\n\
                    @@ -1,1 +1,1 @@\n\
                    -old\n\
                    +new\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].hunks.len(), 2);

        let degenerate = &files[0].hunks[0];
        assert_eq!(degenerate.old_count, 0);
        assert_eq!(degenerate.new_count, 0);
        assert_eq!(degenerate.header, "@@ not a real header @@");
        assert_eq!(degenerate.raw_lines, vec!["@@ not a real header @@"]);
        assert!(degenerate.lines.is_empty());

        let real = &files[0].hunks[1];
        assert_eq!(real.lines.len(), 2);
    }

    #[test]
    fn no_newline_marker_goes_to_raw_lines_only() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,1 +1,1 @@\n\
                    -old\n\
                    +new\n\
                    \\ No newline at end of file\n";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.lines.len(), 2);
        assert_eq!(
            hunk.raw_lines,
            vec![
                "@@ -1,1 +1,1 @@",
                "-old",
                "+new",
                "\\ No newline at end of file",
            ]
        );
    }

    #[test]
    fn interior_empty_line_is_context() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,3 +1,3 @@\n \
                    a\n\
                    \n\
                    -b\n\
                    +c\n";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.lines.len(), 4);
        assert_eq!(hunk.lines[1].kind, LineKind::Context);
        assert_eq!(hunk.lines[1].text, "");
    }

    #[test]
    fn omitted_count_defaults_to_one() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -5 +5 @@\n\
                    -old\n\
                    +new\n";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (5, 1));
        assert_eq!((hunk.new_start, hunk.new_count), (5, 1));
    }

    #[test]
    fn parse_is_deterministic() {
        let diff = "diff --git a/file.txt b/file.txt\n\
                    --- a/file.txt\n\
                    +++ b/file.txt\n\
                    @@ -1,2 +1,2 @@\n\
                    -old\n\
                    +new\n";
        assert_eq!(parse_diff(diff), parse_diff(diff));
    }

    #[test]
    fn parse_never_panics_on_garbage() {
        for input in [
            "not a diff at all",
            "diff --git\n",
            "diff --git a/x b/x\n@@\n",
            "diff --git a/x b/x\n--- a/x\n",
            "@@ -1,2 +1,2 @@\n-floating hunk\n",
            "\n\n\n",
        ] {
            let _ = parse_diff(input);
        }
    }
}
