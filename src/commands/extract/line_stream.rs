use super::*;

const SAMPLE_PAGE_LIMIT: usize = 5;
const MIN_SAMPLED_PAGE_LINES: usize = 6;
const EDGE_LINES_PER_PAGE: usize = 3;

/// Lines are kept verbatim; callers compare trimmed.
pub fn document_lines(pages: &[String], start_page: usize) -> Vec<String> {
    pages
        .iter()
        .skip(start_page)
        .flat_map(|page| page.split('\n').map(str::to_string))
        .collect()
}

/// Detects running headers/footers by sampling up to five pages from the
/// content start. A page contributes its top and bottom three trimmed lines
/// only when it has more than six non-empty lines; a line qualifies when it
/// shows up on more than one sampled page.
pub fn detect_headers_footers(pages: &[String], start_page: usize) -> HashSet<String> {
    let sample_len = pages
        .len()
        .saturating_sub(start_page)
        .min(SAMPLE_PAGE_LIMIT);
    if sample_len <= 1 {
        return HashSet::new();
    }

    let mut page_counts = HashMap::<String, usize>::new();

    for page in pages.iter().skip(start_page).take(sample_len) {
        let lines: Vec<&str> = page
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.len() <= MIN_SAMPLED_PAGE_LINES {
            continue;
        }

        let mut candidates = HashSet::<&str>::new();
        for line in lines.iter().take(EDGE_LINES_PER_PAGE) {
            candidates.insert(line);
        }
        for line in lines.iter().rev().take(EDGE_LINES_PER_PAGE) {
            candidates.insert(line);
        }

        for line in candidates {
            *page_counts.entry(line.to_string()).or_insert(0) += 1;
        }
    }

    page_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(line, _)| line)
        .collect()
}
