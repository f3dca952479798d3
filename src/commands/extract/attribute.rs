use super::*;

const HEADING_LOOKAHEAD_LINES: usize = 4;
const STOP_LOOKAHEAD_LINES: usize = 3;

const CONCLUSIVE_KEYWORDS: [&str; 8] = [
    "appendix",
    "conclusion",
    "references",
    "bibliography",
    "index",
    "annex",
    "glossary",
    "acknowledgements",
];

#[derive(Debug, Clone, Default)]
pub struct AttributionStats {
    pub headings_total: usize,
    pub headings_matched: usize,
    pub headings_unmatched: usize,
    pub content_char_count: usize,
}

/// Walks the flattened outline against the line stream and writes each
/// section's body text into its node. Only numbered outlines are walked;
/// unnumbered outlines are returned untouched.
///
/// Each entry is searched for from wherever the previous successful match
/// left the cursor. A miss leaves the entry's content empty and the cursor
/// where it was, so later entries still get their chance; the walk assumes
/// the document body follows pre-order and cannot match backwards.
pub fn populate_content(
    tree: &mut HeadingTree,
    lines: &[String],
    headers_footers: &HashSet<String>,
    stop_heading: Option<&str>,
    boundary: &dyn BoundaryOracle,
) -> AttributionStats {
    let mut stats = AttributionStats::default();

    if !tree.numbered {
        info!("content attribution skipped: outline is not numbered");
        return stats;
    }

    let entries = flatten_headings(&tree.roots);
    stats.headings_total = entries.len();
    if entries.is_empty() {
        return stats;
    }

    let mut cursor = 0_usize;

    for (position, entry) in entries.iter().enumerate() {
        let mut matched_start = None;
        let mut scan = cursor;
        while scan < lines.len() {
            if let Some(content_start) = verify_heading(lines, scan, &entry.key, &entry.title) {
                matched_start = Some(content_start);
                break;
            }
            scan += 1;
        }

        let Some(content_start) = matched_start else {
            stats.headings_unmatched += 1;
            warn!(key = %entry.key, title = %entry.title, "heading not found in line stream");
            continue;
        };

        stats.headings_matched += 1;
        cursor = content_start;

        let next_entry = entries.get(position + 1);
        let mut collected = Vec::<&str>::new();

        while cursor < lines.len() {
            let at_boundary = match next_entry {
                Some(next) => verify_heading(lines, cursor, &next.key, &next.title).is_some(),
                None => is_final_boundary(lines, cursor, stop_heading, boundary),
            };
            if at_boundary {
                break;
            }

            let line = &lines[cursor];
            if !headers_footers.contains(line.trim()) {
                collected.push(line);
            }
            cursor += 1;
        }

        let content = collected.join("\n").trim().to_string();
        stats.content_char_count += content.chars().count();
        if let Some(node) = tree.node_mut(&entry.path) {
            node.content = content;
        }
    }

    stats
}

/// Verifies that the heading (key, title) starts at `start`. The line must
/// open with the key (case-insensitive); the title is then searched for in a
/// running aggregate of up to four lines with whitespace collapsed and case
/// folded, so wrapped or irregularly spaced headings still match. Returns the
/// index one past the line that completed the title.
pub fn verify_heading(lines: &[String], start: usize, key: &str, title: &str) -> Option<usize> {
    let first = lines.get(start)?;
    let key_lower = key.to_lowercase();
    if !first.trim().to_lowercase().starts_with(&key_lower) {
        return None;
    }

    let target = squash_text(title);
    let mut aggregated: Vec<String> = Vec::new();

    for offset in 0..HEADING_LOOKAHEAD_LINES {
        let index = start + offset;
        let Some(line) = lines.get(index) else {
            break;
        };
        let text = line.trim();

        if offset == 0 {
            // A line that is exactly the key contributes nothing yet; the
            // title is expected on the following lines.
            if text.to_lowercase() != key_lower {
                aggregated.push(strip_key_prefix(text, key));
            }
        } else {
            if text.is_empty() {
                continue;
            }
            aggregated.push(text.to_string());
        }

        if squash_text(&aggregated.join(" ")).contains(&target) {
            return Some(index + 1);
        }
    }

    None
}

/// Final-section stop test for one candidate line: the declared stop heading
/// first, then the conclusive-keyword fallback backed by the boundary oracle.
/// Oracle failures mean "keep collecting".
pub fn is_final_boundary(
    lines: &[String],
    index: usize,
    stop_heading: Option<&str>,
    boundary: &dyn BoundaryOracle,
) -> bool {
    if matches_stop_heading(lines, index, stop_heading) {
        return true;
    }

    let normalized = lines[index].trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    if !CONCLUSIVE_KEYWORDS
        .iter()
        .any(|keyword| normalized.contains(keyword))
    {
        return false;
    }

    match boundary.confirm_heading(&lines[index]) {
        Ok(confirmed) => confirmed,
        Err(error) => {
            warn!(error = %error, "boundary oracle failed; continuing collection");
            false
        }
    }
}

/// Multi-line containment match against the declared stop heading, same
/// aggregation as heading verification but without a key gate and with a
/// three-line window.
pub fn matches_stop_heading(lines: &[String], start: usize, stop_heading: Option<&str>) -> bool {
    let Some(stop_heading) = stop_heading else {
        return false;
    };
    let target = squash_text(stop_heading);
    if target.is_empty() {
        return false;
    }

    let mut aggregated: Vec<&str> = Vec::new();
    for offset in 0..STOP_LOOKAHEAD_LINES {
        let Some(line) = lines.get(start + offset) else {
            break;
        };
        let text = line.trim();
        if !text.is_empty() {
            aggregated.push(text);
        }
        if squash_text(&aggregated.join(" ")).contains(&target) {
            return true;
        }
    }

    false
}

fn squash_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect()
}

fn strip_key_prefix(text: &str, key: &str) -> String {
    match Regex::new(&format!(r"(?i)^\s*{}\s*[:.]?\s*", regex::escape(key))) {
        Ok(pattern) => pattern.replace(text, "").into_owned(),
        Err(_) => text.trim_start().to_string(),
    }
}
