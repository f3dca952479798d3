use std::io::{self, Write};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::cli::LocateArgs;
use crate::commands::extract::extract_pages;
use crate::model::TocPageSet;

/// Keywords a page must mention (anywhere in its text, case-insensitive)
/// before it can open a TOC run.
const TOC_KEYWORDS: [&str; 7] = [
    "contents",
    "table of contents",
    "index",
    "list of contents",
    "detailed contents",
    "content page",
    "summary of contents",
];

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub fallback_pages: usize,
    pub min_matches_first_page: usize,
    pub min_matches_next_page: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            fallback_pages: 10,
            min_matches_first_page: 5,
            min_matches_next_page: 1,
        }
    }
}

pub fn run(args: LocateArgs) -> Result<()> {
    let pages = extract_pages(&args.pdf, None)?;
    let config = LocatorConfig {
        fallback_pages: args.fallback_pages,
        min_matches_first_page: args.min_matches_first_page,
        min_matches_next_page: args.min_matches_next_page,
    };

    let toc_pages = find_toc_pages(&pages, &config)?;
    if toc_pages.from_toc {
        info!(pages = ?toc_pages.pages, "located table of contents");
    } else {
        warn!(
            window = toc_pages.pages.len(),
            "no table of contents detected; reporting fallback window"
        );
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &toc_pages)
        .context("failed to serialize locate output")?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}

/// Scans page texts in order for a TOC run. A run opens on the first page
/// containing a TOC keyword with at least `min_matches_first_page` TOC-shaped
/// lines, continues while pages keep at least `min_matches_next_page`, and
/// ends at the first page that drops below that. No run at all degrades to
/// the first `min(fallback_pages, page count)` pages with `from_toc = false`.
pub fn find_toc_pages(pages: &[String], config: &LocatorConfig) -> Result<TocPageSet> {
    let patterns = toc_line_patterns()?;
    let mut toc_pages = Vec::new();
    let mut first_found = false;

    for (page_index, text) in pages.iter().enumerate() {
        let matches = text
            .trim()
            .split('\n')
            .filter(|line| patterns.iter().any(|pattern| pattern.is_match(line)))
            .count();

        if !first_found {
            let lowered = text.to_lowercase();
            let has_keyword = TOC_KEYWORDS.iter().any(|keyword| lowered.contains(keyword));
            if has_keyword && matches >= config.min_matches_first_page {
                first_found = true;
                toc_pages.push(page_index);
            }
        } else if matches >= config.min_matches_next_page {
            toc_pages.push(page_index);
        } else {
            break;
        }
    }

    if toc_pages.is_empty() {
        let window = config.fallback_pages.min(pages.len());
        return Ok(TocPageSet {
            pages: (0..window).collect(),
            from_toc: false,
        });
    }

    Ok(TocPageSet {
        pages: toc_pages,
        from_toc: true,
    })
}

/// The battery of "heading ... dots/spaces ... page number" line shapes that
/// mark a TOC entry.
fn toc_line_patterns() -> Result<Vec<Regex>> {
    let sources = [
        r"^\s*\d+(\.\d+)*\s+.+\.{2,}\s*\d+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\.{2,}\d+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\s*\.{2,}\s*\d+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\s\d+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\s{2,}\d+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+(?:\.\s*)+\d+\s*$",
        r"^\s*[A-Za-z].+\s*\.{2,}\s*[a-zA-Z0-9]+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\.{2,}\s*[ivxlcdmIVXLCDM]+\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\s*\(\s*\d+\s*\)\s*$",
        r"^\s*\d+(\.\d+)*\s+.+\.{2,}\s*\d+(?:[-–]\d+)\s*$",
        r"^\s*[•\-\*]\s*.+\.{2,}\s*\d+\s*$",
        r"^\s*[A-Z]\.\s+.+\.{2,}\s*\d+\s*$",
        r"^\s*[A-Za-z].+\s{2,}\d+\s*$",
    ];

    sources
        .iter()
        .map(|source| {
            Regex::new(source)
                .with_context(|| format!("failed to compile TOC line pattern: {source}"))
        })
        .collect()
}
