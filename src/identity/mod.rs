use crate::{DiffFile, Hunk, LineKind};
use std::collections::HashMap;

/// Assign a stable, content-based identity to every hunk in `file`.
///
/// The identity is a 32-bit FNV-1a hash of the file path and the ordered
/// (kind, text) pairs of the changed lines — context lines and line
/// numbers are excluded, so the identity survives hunks shifting position
/// as the file is edited around them.
///
/// Hunks with byte-identical changed content collide; every colliding
/// occurrence gets a `-1`, `-2`, … suffix in first-seen order so the IDs
/// stay distinguishable and order-stable. The whole file is processed in
/// one pass before any identity is exposed, so the first occurrence is
/// never visible without its suffix.
pub fn assign_ids(file: &mut DiffFile) {
    let path = file.path().to_string();

    let hashes: Vec<String> = file
        .hunks
        .iter()
        .map(|hunk| format!("{:08x}", content_hash(&path, hunk)))
        .collect();

    let mut totals: HashMap<&str, u32> = HashMap::new();
    for hash in &hashes {
        *totals.entry(hash.as_str()).or_insert(0) += 1;
    }

    let mut seen: HashMap<&str, u32> = HashMap::new();
    let ids: Vec<String> = hashes
        .iter()
        .map(|hash| {
            if totals[hash.as_str()] > 1 {
                let n = seen.entry(hash.as_str()).or_insert(0);
                *n += 1;
                format!("{hash}-{n}")
            } else {
                hash.clone()
            }
        })
        .collect();

    for (hunk, id) in file.hunks.iter_mut().zip(ids) {
        hunk.id = Some(id);
    }
}

/// FNV-1a 32 over the file path plus the changed lines.
fn content_hash(path: &str, hunk: &Hunk) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= u32::from(b);
            hash = hash.wrapping_mul(PRIME);
        }
    };

    feed(path.as_bytes());
    for line in hunk.changed_lines() {
        feed(match line.kind {
            LineKind::Add => b"+",
            LineKind::Remove => b"-",
            LineKind::Context => b" ",
        });
        feed(line.text.as_bytes());
        feed(b"\n");
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffLine;

    fn change_hunk(old_start: u32, body: &[(LineKind, &str)]) -> Hunk {
        let lines: Vec<DiffLine> = body
            .iter()
            .map(|(kind, text)| DiffLine {
                kind: *kind,
                text: text.to_string(),
            })
            .collect();
        Hunk {
            old_start,
            old_count: lines.iter().filter(|l| l.kind == LineKind::Remove).count() as u32,
            new_start: old_start,
            new_count: lines.iter().filter(|l| l.kind == LineKind::Add).count() as u32,
            header: String::new(),
            lines,
            raw_lines: Vec::new(),
            id: None,
        }
    }

    fn file(path: &str, hunks: Vec<Hunk>) -> DiffFile {
        DiffFile {
            old_path: path.to_string(),
            new_path: path.to_string(),
            hunks,
            is_binary: false,
            header_lines: Vec::new(),
        }
    }

    use LineKind::{Add, Remove};

    #[test]
    fn identity_ignores_line_numbers() {
        let mut early = file("x.txt", vec![change_hunk(3, &[(Add, "same change")])]);
        let mut late = file("x.txt", vec![change_hunk(90, &[(Add, "same change")])]);
        assign_ids(&mut early);
        assign_ids(&mut late);
        assert_eq!(early.hunks[0].id, late.hunks[0].id);
    }

    #[test]
    fn identity_depends_on_content_and_path() {
        let mut a = file("x.txt", vec![change_hunk(1, &[(Add, "one")])]);
        let mut b = file("x.txt", vec![change_hunk(1, &[(Add, "two")])]);
        let mut c = file("y.txt", vec![change_hunk(1, &[(Add, "one")])]);
        assign_ids(&mut a);
        assign_ids(&mut b);
        assign_ids(&mut c);
        assert_ne!(a.hunks[0].id, b.hunks[0].id);
        assert_ne!(a.hunks[0].id, c.hunks[0].id);
    }

    #[test]
    fn identity_is_order_sensitive() {
        let mut ab = file(
            "x.txt",
            vec![change_hunk(1, &[(Remove, "a"), (Add, "b")])],
        );
        let mut ba = file(
            "x.txt",
            vec![change_hunk(1, &[(Add, "b"), (Remove, "a")])],
        );
        assign_ids(&mut ab);
        assign_ids(&mut ba);
        assert_ne!(ab.hunks[0].id, ba.hunks[0].id);
    }

    #[test]
    fn duplicates_get_ordinal_suffixes_including_the_first() {
        let mut f = file(
            "x.txt",
            vec![
                change_hunk(1, &[(Add, "dup")]),
                change_hunk(10, &[(Add, "unique")]),
                change_hunk(20, &[(Add, "dup")]),
                change_hunk(30, &[(Add, "dup")]),
            ],
        );
        assign_ids(&mut f);

        let ids: Vec<&str> = f.hunks.iter().map(|h| h.id.as_deref().unwrap()).collect();
        assert!(ids[0].ends_with("-1"), "first duplicate gets -1: {}", ids[0]);
        assert!(ids[2].ends_with("-2"));
        assert!(ids[3].ends_with("-3"));
        assert!(
            !ids[1].contains('-'),
            "unique hunk keeps a bare hash: {}",
            ids[1]
        );
        let base = &ids[0][..ids[0].len() - 2];
        assert_eq!(base, &ids[2][..ids[2].len() - 2]);
    }

    #[test]
    fn assignment_is_deterministic() {
        let build = || {
            let mut f = file(
                "x.txt",
                vec![
                    change_hunk(1, &[(Add, "dup")]),
                    change_hunk(5, &[(Add, "dup")]),
                ],
            );
            assign_ids(&mut f);
            f.hunks
                .into_iter()
                .map(|h| h.id.unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
