use serde_json::json;

use super::*;

struct CannedBoundary {
    confirm: Option<bool>,
}

impl BoundaryOracle for CannedBoundary {
    fn confirm_heading(&self, _line: &str) -> Result<bool> {
        match self.confirm {
            Some(flag) => Ok(flag),
            None => bail!("boundary oracle offline"),
        }
    }
}

fn lines(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn numbered_tree(wire: serde_json::Value) -> HeadingTree {
    HeadingTree::from_wire(&wire, true).unwrap()
}

fn no_headers() -> HashSet<String> {
    HashSet::new()
}

#[test]
fn document_lines_starts_at_the_requested_page() {
    let pages = lines(&["a1\na2", "b1\nb2", "c1"]);

    assert_eq!(document_lines(&pages, 1), lines(&["b1", "b2", "c1"]));
    assert!(document_lines(&pages, 5).is_empty());
}

#[test]
fn detect_headers_footers_flags_lines_repeated_across_pages() {
    let page = |index: usize| {
        format!(
            "ACME Annual Report\nunique-top-{index}\nbody1-{index}\nbody2-{index}\nbody3-{index}\nbody4-{index}\nunique-bottom-{index}\nConfidential"
        )
    };
    let pages = vec![page(0), page(1), page(2)];

    let detected = detect_headers_footers(&pages, 0);
    assert!(detected.contains("ACME Annual Report"));
    assert!(detected.contains("Confidential"));
    assert!(!detected.contains("unique-top-0"));
    assert!(!detected.contains("unique-bottom-1"));
}

#[test]
fn detect_headers_footers_needs_more_than_one_sampled_page() {
    let page = "Header\na\nb\nc\nd\ne\nf\nFooter".to_string();

    assert!(detect_headers_footers(&[page.clone()], 0).is_empty());
    assert!(detect_headers_footers(&[page.clone(), page], 5).is_empty());
}

#[test]
fn detect_headers_footers_skips_pages_with_too_few_lines() {
    // Identical headers, but neither page clears the six-line bar.
    let page = "Header\nshort\nbody\nFooter".to_string();
    let pages = vec![page.clone(), page];

    assert!(detect_headers_footers(&pages, 0).is_empty());
}

#[test]
fn flatten_is_preorder_parent_before_children() {
    let tree = numbered_tree(json!({
        "1": { "title": "One", "content": "", "subsections": {
            "1.1": { "title": "One One", "content": "", "subsections": {} },
            "1.2": { "title": "One Two", "content": "", "subsections": {} }
        }},
        "2": { "title": "Two", "content": "", "subsections": {} }
    }));

    let keys: Vec<String> = flatten_headings(&tree.roots)
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, vec!["1", "1.1", "1.2", "2"]);
}

#[test]
fn flatten_paths_resolve_back_to_their_nodes() {
    let tree = numbered_tree(json!({
        "1": { "title": "One", "content": "", "subsections": {
            "1.1": { "title": "One One", "content": "", "subsections": {
                "1.1.1": { "title": "Deep", "content": "", "subsections": {} }
            }}
        }},
        "2": { "title": "Two", "content": "", "subsections": {} }
    }));

    let entries = flatten_headings(&tree.roots);
    assert_eq!(entries.len(), 4);

    for entry in &entries {
        let node = tree.node(&entry.path).expect("path must resolve");
        assert_eq!(node.key, entry.key);
        assert_eq!(node.title, entry.title);
    }
}

#[test]
fn verify_heading_matches_verbatim_single_line() {
    let stream = lines(&["3.1 Background", "body text"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Background"), Some(1));
}

#[test]
fn verify_heading_matches_wrapped_heading() {
    let stream = lines(&["3.1", "Background", "body text"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Background"), Some(2));
}

#[test]
fn verify_heading_strips_separator_after_key() {
    let stream = lines(&["3.1: Background and Context"]);

    assert_eq!(
        verify_heading(&stream, 0, "3.1", "Background and Context"),
        Some(1)
    );
}

#[test]
fn verify_heading_is_whitespace_and_case_insensitive() {
    let stream = lines(&["3.1   BACK   GROUND"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Back Ground"), Some(1));
}

#[test]
fn verify_heading_requires_key_prefix() {
    let stream = lines(&["Background", "3.1 Background"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Background"), None);
}

#[test]
fn verify_heading_skips_blank_lines_inside_the_window() {
    let stream = lines(&["3.1", "", "Background"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Background"), Some(3));
}

#[test]
fn verify_heading_gives_up_after_four_lines() {
    let stream = lines(&["3.1", "alpha", "beta", "gamma", "Background"]);

    assert_eq!(verify_heading(&stream, 0, "3.1", "Background"), None);
}

#[test]
fn populate_content_attributes_lines_between_headings() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Intro", "content": "", "subsections": {} },
        "2": { "title": "Methods", "content": "", "subsections": {} }
    }));
    let stream = lines(&[
        "1 Intro",
        "intro body a",
        "intro body b",
        "2 Methods",
        "methods body",
    ]);

    let stats = populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert_eq!(stats.headings_matched, 2);
    assert_eq!(stats.headings_unmatched, 0);
    assert_eq!(tree.node(&[0]).unwrap().content, "intro body a\nintro body b");
    assert_eq!(tree.node(&[1]).unwrap().content, "methods body");
}

#[test]
fn populate_content_filters_header_footer_lines() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Intro", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Intro", "intro body", "  ACME Report  ", "more body"]);
    let mut headers = HashSet::new();
    headers.insert("ACME Report".to_string());

    populate_content(&mut tree, &stream, &headers, None, &NullBoundaryOracle);

    let content = &tree.node(&[0]).unwrap().content;
    assert_eq!(content, "intro body\nmore body");
    assert!(!content.contains("ACME"));
}

#[test]
fn populate_content_is_noop_for_unnumbered_outlines() {
    let wire = json!([
        { "title": "Intro", "content": "", "subsections": [] },
        { "title": "Methods", "content": "", "subsections": [] }
    ]);
    let mut tree = HeadingTree::from_wire(&wire, false).unwrap();
    let before = tree.clone();
    let stream = lines(&["1 Intro", "body"]);

    let stats = populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert_eq!(tree, before);
    assert_eq!(stats.headings_total, 0);
    assert_eq!(stats.headings_matched, 0);
}

#[test]
fn populate_content_handles_an_empty_tree() {
    let mut tree = HeadingTree::empty(true);
    let stream = lines(&["1 Intro", "body"]);

    let stats = populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert!(tree.is_empty());
    assert_eq!(stats.headings_total, 0);
}

#[test]
fn unmatched_heading_leaves_content_empty_and_later_entries_still_match() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Alpha", "content": "", "subsections": {} },
        "2": { "title": "Beta", "content": "", "subsections": {} },
        "3": { "title": "Gamma", "content": "", "subsections": {} }
    }));
    // "1 Alpha" never appears; the search for it must not starve "2" and "3".
    let stream = lines(&["2 Beta", "beta body", "3 Gamma", "gamma body"]);

    let stats = populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert_eq!(stats.headings_unmatched, 1);
    assert_eq!(stats.headings_matched, 2);
    assert_eq!(tree.node(&[0]).unwrap().content, "");
    assert_eq!(tree.node(&[1]).unwrap().content, "beta body");
    assert_eq!(tree.node(&[2]).unwrap().content, "gamma body");
}

#[test]
fn missing_successor_lets_a_section_collect_until_the_stream_ends() {
    // Collection only stops at the verified start of the immediate successor;
    // when that successor is absent from the body, the open section runs on.
    let mut tree = numbered_tree(json!({
        "1": { "title": "Alpha", "content": "", "subsections": {} },
        "2": { "title": "Beta", "content": "", "subsections": {} },
        "3": { "title": "Gamma", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Alpha", "alpha body", "3 Gamma", "gamma body"]);

    let stats = populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert_eq!(stats.headings_matched, 1);
    assert_eq!(stats.headings_unmatched, 2);
    assert!(tree.node(&[0]).unwrap().content.contains("3 Gamma"));
    assert_eq!(tree.node(&[1]).unwrap().content, "");
    assert_eq!(tree.node(&[2]).unwrap().content, "");
}

#[test]
fn last_section_stops_at_the_declared_stop_heading() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Final", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Final", "final body", "Appendix", "A", "appendix text"]);

    populate_content(
        &mut tree,
        &stream,
        &no_headers(),
        Some("Appendix A"),
        &NullBoundaryOracle,
    );

    assert_eq!(tree.node(&[0]).unwrap().content, "final body");
}

#[test]
fn last_section_runs_to_the_end_without_stop_or_keywords() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Final", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Final", "body one", "body two"]);

    populate_content(&mut tree, &stream, &no_headers(), None, &NullBoundaryOracle);

    assert_eq!(tree.node(&[0]).unwrap().content, "body one\nbody two");
}

#[test]
fn conclusive_keyword_stops_when_the_oracle_confirms() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Final", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Final", "body", "References", "ref list"]);

    populate_content(
        &mut tree,
        &stream,
        &no_headers(),
        None,
        &CannedBoundary {
            confirm: Some(true),
        },
    );

    assert_eq!(tree.node(&[0]).unwrap().content, "body");
}

#[test]
fn conclusive_keyword_is_ignored_when_the_oracle_declines() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Final", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Final", "body", "References", "ref list"]);

    populate_content(
        &mut tree,
        &stream,
        &no_headers(),
        None,
        &CannedBoundary {
            confirm: Some(false),
        },
    );

    assert_eq!(tree.node(&[0]).unwrap().content, "body\nReferences\nref list");
}

#[test]
fn boundary_oracle_failure_fails_open() {
    let mut tree = numbered_tree(json!({
        "1": { "title": "Final", "content": "", "subsections": {} }
    }));
    let stream = lines(&["1 Final", "body", "References", "ref list"]);

    populate_content(
        &mut tree,
        &stream,
        &no_headers(),
        None,
        &CannedBoundary { confirm: None },
    );

    assert_eq!(tree.node(&[0]).unwrap().content, "body\nReferences\nref list");
}

#[test]
fn matches_stop_heading_aggregates_across_blank_lines() {
    let stream = lines(&["Appendix", "", "A"]);

    assert!(matches_stop_heading(&stream, 0, Some("Appendix A")));
    assert!(!matches_stop_heading(&stream, 0, Some("Bibliography")));
    assert!(!matches_stop_heading(&stream, 0, None));
}

#[test]
fn start_page_follows_the_located_toc_position() {
    let toc_pages = TocPageSet {
        pages: vec![2, 3, 4],
        from_toc: true,
    };
    let mut warnings = Vec::new();

    assert_eq!(compute_start_page(&toc_pages, 2, &mut warnings), 5);
    assert!(warnings.is_empty());
}

#[test]
fn start_page_clamps_an_out_of_range_oracle_index() {
    let toc_pages = TocPageSet {
        pages: vec![2, 3, 4],
        from_toc: true,
    };
    let mut warnings = Vec::new();

    assert_eq!(compute_start_page(&toc_pages, 7, &mut warnings), 5);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn start_page_reads_the_index_directly_in_fallback_mode() {
    let toc_pages = TocPageSet {
        pages: (0..8).collect(),
        from_toc: false,
    };
    let mut warnings = Vec::new();

    assert_eq!(compute_start_page(&toc_pages, 3, &mut warnings), 4);
    assert_eq!(compute_start_page(&toc_pages, -1, &mut warnings), 0);
    assert!(warnings.is_empty());
}

#[test]
fn sanitize_key_for_id_collapses_punctuation() {
    assert_eq!(sanitize_key_for_id("3.1.2"), "3_1_2");
    assert_eq!(sanitize_key_for_id("A.1"), "a_1");
}
