use super::*;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "extract_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("docseg_index.sqlite"));

    info!(pdf = %args.pdf.display(), run_id = %run_id, "starting extraction");

    let sha256 = sha256_file(&args.pdf)?;
    let filename = args
        .pdf
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", args.pdf.display()))?;
    let doc_id = doc_id_for(&filename, &sha256);

    let tool_versions = collect_tool_versions()?;

    let pages = extract_pages(&args.pdf, args.max_pages)?;
    if pages.is_empty() {
        bail!("no text pages extracted from {}", args.pdf.display());
    }

    let mut warnings = Vec::new();

    let locator = LocatorConfig {
        fallback_pages: args.fallback_pages,
        min_matches_first_page: args.min_matches_first_page,
        min_matches_next_page: args.min_matches_next_page,
    };
    let toc_pages = find_toc_pages(&pages, &locator)?;
    if toc_pages.from_toc {
        info!(pages = ?toc_pages.pages, "located table of contents");
    } else {
        let message = format!(
            "no table of contents detected; sending first {} pages to the oracle",
            toc_pages.pages.len()
        );
        warn!("{message}");
        warnings.push(message);
    }

    let toc_pdf_path = resolve_artifact_path(
        &cache_root.join("toc_pages").join(format!("{doc_id}_toc.pdf")),
        args.overwrite,
    );
    assemble_toc_pdf(&args.pdf, &toc_pages.pages, &toc_pdf_path)?;
    info!(path = %toc_pdf_path.display(), "wrote TOC page artifact");

    let structuring = structuring_oracle(&args)?;
    let outline = match structuring.materialize(&toc_pdf_path, toc_pages.from_toc)? {
        OutlineMaterialization::Outline(response) => response,
        OutlineMaterialization::Denied { diagnostic } => {
            bail!("structuring oracle denied the table of contents: {diagnostic}");
        }
    };

    let start_page = compute_start_page(&toc_pages, outline.last_toc_page, &mut warnings);
    info!(
        start_page,
        is_numbered = outline.is_numbered(),
        stop_heading = outline.stop_heading.as_deref().unwrap_or_default(),
        "materialized outline"
    );

    let headers_footers = detect_headers_footers(&pages, start_page);
    if !headers_footers.is_empty() {
        info!(
            count = headers_footers.len(),
            "detected running header/footer lines"
        );
    }
    let lines = document_lines(&pages, start_page);

    let boundary: Box<dyn BoundaryOracle> = match &args.boundary_oracle {
        Some(program) => Box::new(CommandBoundaryOracle::new(program.clone())),
        None => Box::new(NullBoundaryOracle),
    };

    let mut tree = outline.tree.clone();
    let stats = populate_content(
        &mut tree,
        &lines,
        &headers_footers,
        outline.stop_heading.as_deref(),
        boundary.as_ref(),
    );
    info!(
        total = stats.headings_total,
        matched = stats.headings_matched,
        unmatched = stats.headings_unmatched,
        "content attribution finished"
    );
    if stats.headings_unmatched > 0 {
        warnings.push(format!(
            "{} of {} outline headings were not found in the line stream",
            stats.headings_unmatched, stats.headings_total
        ));
    }

    let artifact = SectionArtifact {
        artifact_version: 1,
        doc_id: doc_id.clone(),
        source_pdf: args.pdf.display().to_string(),
        generated_at: now_utc_string(),
        from_toc: toc_pages.from_toc,
        toc_pages: toc_pages.pages.clone(),
        is_numbered: tree.numbered,
        stop_heading: outline.stop_heading.clone(),
        tree: tree.to_wire(),
    };

    let artifact_path = resolve_artifact_path(
        &cache_root.join("sections").join(format!("{doc_id}.json")),
        args.overwrite,
    );
    write_json_pretty(&artifact_path, &artifact)?;
    info!(path = %artifact_path.display(), "wrote section artifact");

    let mut connection = open_database(&db_path)?;
    ensure_schema(&connection)?;
    let sections_inserted = persist_sections(
        &mut connection,
        &artifact,
        &tree,
        &filename,
        &sha256,
        pages.len(),
        &artifact_path,
    )?;
    info!(sections = sections_inserted, "indexed sections");

    let updated_at = now_utc_string();
    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at,
        command: render_extract_command(&args),
        tool_versions,
        paths: ExtractPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            toc_pdf_path: toc_pdf_path.display().to_string(),
            artifact_path: artifact_path.display().to_string(),
        },
        counts: ExtractCounts {
            page_count: pages.len(),
            toc_page_count: toc_pages.pages.len(),
            from_toc: toc_pages.from_toc,
            is_numbered: tree.numbered,
            start_page,
            document_line_count: lines.len(),
            header_footer_line_count: headers_footers.len(),
            headings_total: stats.headings_total,
            headings_matched: stats.headings_matched,
            headings_unmatched: stats.headings_unmatched,
            content_char_count: stats.content_char_count,
        },
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    Ok(())
}

fn structuring_oracle(args: &ExtractArgs) -> Result<Box<dyn StructuringOracle>> {
    if let Some(path) = &args.outline_json {
        return Ok(Box::new(FileStructuringOracle::new(path.clone())));
    }
    if let Some(program) = &args.structuring_oracle {
        return Ok(Box::new(CommandStructuringOracle::new(program.clone())));
    }
    bail!("either --outline-json or --structuring-oracle is required");
}

/// Content starts one page past the final TOC page. With a located TOC the
/// oracle's `last_toc_page` indexes into the located page list; without one
/// it is a document page index already.
pub fn compute_start_page(
    toc_pages: &TocPageSet,
    last_toc_page: i64,
    warnings: &mut Vec<String>,
) -> usize {
    if toc_pages.from_toc {
        if last_toc_page >= 0 {
            if let Some(page) = toc_pages.pages.get(last_toc_page as usize) {
                return page + 1;
            }
        }

        let fallback = toc_pages.pages.last().map(|page| page + 1).unwrap_or(0);
        let message = format!(
            "oracle last_toc_page {last_toc_page} is outside the located TOC pages; starting at page {fallback}"
        );
        warn!("{message}");
        warnings.push(message);
        fallback
    } else if last_toc_page >= 0 {
        last_toc_page as usize + 1
    } else {
        0
    }
}

fn resolve_artifact_path(candidate: &Path, overwrite: bool) -> PathBuf {
    if overwrite {
        candidate.to_path_buf()
    } else {
        let resolved = unique_artifact_path(candidate);
        if resolved != candidate {
            info!(
                requested = %candidate.display(),
                resolved = %resolved.display(),
                "artifact exists; writing under a copy name"
            );
        }
        resolved
    }
}

fn doc_id_for(filename: &str, sha256: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);

    let mut safe = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            safe.push(ch.to_ascii_lowercase());
        } else {
            safe.push('_');
        }
    }
    while safe.contains("__") {
        safe = safe.replace("__", "_");
    }
    let safe = safe.trim_matches('_');

    let digest = &sha256[..12.min(sha256.len())];
    if safe.is_empty() {
        format!("doc-{digest}")
    } else {
        format!("{safe}-{digest}")
    }
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "docseg".to_string(),
        "extract".to_string(),
        "--pdf".to_string(),
        args.pdf.display().to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.structuring_oracle {
        command.push("--structuring-oracle".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.outline_json {
        command.push("--outline-json".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.boundary_oracle {
        command.push("--boundary-oracle".to_string());
        command.push(path.display().to_string());
    }
    command.push("--fallback-pages".to_string());
    command.push(args.fallback_pages.to_string());
    command.push("--min-matches-first-page".to_string());
    command.push(args.min_matches_first_page.to_string());
    command.push("--min-matches-next-page".to_string());
    command.push(args.min_matches_next_page.to_string());
    if let Some(max_pages) = args.max_pages {
        command.push("--max-pages".to_string());
        command.push(max_pages.to_string());
    }
    if args.overwrite {
        command.push("--overwrite".to_string());
    }

    command.join(" ")
}
