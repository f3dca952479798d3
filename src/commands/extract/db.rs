use super::*;

pub fn open_database(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS docs (
          doc_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          page_count INTEGER NOT NULL,
          from_toc INTEGER NOT NULL,
          is_numbered INTEGER NOT NULL,
          stop_heading TEXT,
          toc_pages TEXT NOT NULL,
          artifact_path TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sections (
          section_id TEXT PRIMARY KEY,
          doc_id TEXT NOT NULL,
          ref TEXT NOT NULL,
          title TEXT,
          parent_ref TEXT,
          depth INTEGER NOT NULL,
          order_index INTEGER NOT NULL,
          content TEXT,
          char_count INTEGER NOT NULL,
          FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
        );

        CREATE INDEX IF NOT EXISTS idx_sections_doc_ref ON sections(doc_id, ref);
        CREATE INDEX IF NOT EXISTS idx_sections_doc_order ON sections(doc_id, order_index);
        ",
    )?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn persist_sections(
    connection: &mut Connection,
    artifact: &SectionArtifact,
    tree: &HeadingTree,
    filename: &str,
    sha256: &str,
    page_count: usize,
    artifact_path: &Path,
) -> Result<usize> {
    let tx = connection
        .transaction()
        .context("failed to begin transaction")?;

    let toc_pages_json =
        serde_json::to_string(&artifact.toc_pages).context("failed to serialize TOC page list")?;

    tx.execute(
        "
        INSERT OR REPLACE INTO docs
          (doc_id, filename, sha256, page_count, from_toc, is_numbered,
           stop_heading, toc_pages, artifact_path, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ",
        params![
            artifact.doc_id,
            filename,
            sha256,
            page_count as i64,
            artifact.from_toc,
            artifact.is_numbered,
            artifact.stop_heading,
            toc_pages_json,
            artifact_path.display().to_string(),
            artifact.generated_at,
        ],
    )
    .context("failed to upsert doc row")?;

    tx.execute(
        "DELETE FROM sections WHERE doc_id = ?1",
        params![artifact.doc_id],
    )
    .context("failed to clear previous section rows")?;

    let mut inserted = 0_usize;
    {
        let mut statement = tx.prepare(
            "
            INSERT OR REPLACE INTO sections
              (section_id, doc_id, ref, title, parent_ref, depth, order_index,
               content, char_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )?;

        let mut order_index = 0_i64;
        insert_section_rows(
            &mut statement,
            &artifact.doc_id,
            &tree.roots,
            None,
            1,
            &mut order_index,
            &mut inserted,
        )?;
    }

    tx.commit().context("failed to commit section rows")?;
    Ok(inserted)
}

fn insert_section_rows(
    statement: &mut rusqlite::Statement<'_>,
    doc_id: &str,
    nodes: &[HeadingNode],
    parent_ref: Option<&str>,
    depth: i64,
    order_index: &mut i64,
    inserted: &mut usize,
) -> Result<()> {
    for node in nodes {
        let section_id = format!("{}:{}", doc_id, sanitize_key_for_id(&node.key));

        statement.execute(params![
            section_id,
            doc_id,
            node.key,
            node.title,
            parent_ref,
            depth,
            *order_index,
            node.content,
            node.content.chars().count() as i64,
        ])?;

        *order_index += 1;
        *inserted += 1;

        insert_section_rows(
            statement,
            doc_id,
            &node.children,
            Some(&node.key),
            depth + 1,
            order_index,
            inserted,
        )?;
    }

    Ok(())
}

pub fn sanitize_key_for_id(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    out.trim_matches('_').to_string()
}
