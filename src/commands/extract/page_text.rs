use super::*;

pub fn extract_pages(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    Ok(pages)
}

/// Assembles the located TOC pages (0-based indices) into a standalone PDF
/// artifact for the structuring oracle.
pub fn assemble_toc_pdf(pdf_path: &Path, pages: &[usize], dest: &Path) -> Result<()> {
    if pages.is_empty() {
        bail!("no TOC pages to assemble for {}", pdf_path.display());
    }
    if let Some(parent) = dest.parent() {
        ensure_directory(parent)?;
    }

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let scratch = std::env::temp_dir().join(format!(
        "docseg_toc_{}_{}",
        std::process::id(),
        stamp
    ));
    ensure_directory(&scratch)?;

    let result = assemble_into(pdf_path, pages, dest, &scratch);
    let _ = fs::remove_dir_all(&scratch);
    result
}

fn assemble_into(pdf_path: &Path, pages: &[usize], dest: &Path, scratch: &Path) -> Result<()> {
    let mut parts = Vec::with_capacity(pages.len());

    for (sequence, page_index) in pages.iter().enumerate() {
        let page_number = page_index + 1;
        let part_path = scratch.join(format!("part_{sequence:04}.pdf"));

        let output = Command::new("pdfseparate")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf_path)
            .arg(&part_path)
            .output()
            .with_context(|| format!("failed to execute pdfseparate for {}", pdf_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdfseparate returned non-zero exit status for {} page {}: {}",
                pdf_path.display(),
                page_number,
                stderr.trim()
            );
        }

        parts.push(part_path);
    }

    if parts.len() == 1 {
        fs::copy(&parts[0], dest)
            .with_context(|| format!("failed to copy TOC page to {}", dest.display()))?;
        return Ok(());
    }

    let mut command = Command::new("pdfunite");
    for part in &parts {
        command.arg(part);
    }
    command.arg(dest);

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdfunite for {}", dest.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfunite returned non-zero exit status for {}: {}",
            dest.display(),
            stderr.trim()
        );
    }

    Ok(())
}

pub fn collect_tool_versions() -> Result<ToolVersions> {
    Ok(ToolVersions {
        pdftotext: command_version("pdftotext", &["-v"])?,
        pdfseparate: command_version_optional("pdfseparate", &["-v"]),
        pdfunite: command_version_optional("pdfunite", &["-v"]),
    })
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

fn command_version(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} {} failed: {}", program, args.join(" "), stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    let version_line = source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or("unknown");

    Ok(version_line.to_string())
}
