use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::warn;

use crate::model::{HeadingTree, OutlineResponse};

/// Literal prefix the structuring oracle uses to deny that a TOC exists.
const ORACLE_ERROR_PREFIX: &str = "Error :";

/// Outcome of a structuring-oracle call. `Denied` carries the oracle's raw
/// diagnostic and aborts processing for the document; unparsable payloads
/// never land here (they degrade to a safe-empty outline instead).
#[derive(Debug, Clone)]
pub enum OutlineMaterialization {
    Outline(OutlineResponse),
    Denied { diagnostic: String },
}

/// Turns extracted TOC pages into a structured outline. `from_toc` selects
/// the oracle's prompt mode: pages known to be the TOC, or an initial page
/// window the oracle must sift itself.
pub trait StructuringOracle {
    fn materialize(&self, toc_pdf: &Path, from_toc: bool) -> Result<OutlineMaterialization>;
}

/// Confirms whether a single line is a conclusive final-section heading.
/// Callers treat `Err` as "not a boundary" (fail-open).
pub trait BoundaryOracle {
    fn confirm_heading(&self, line: &str) -> Result<bool>;
}

/// Parses a raw oracle payload into an outline. Any shape problem short of
/// the explicit denial sentinel degrades to the safe-empty response with the
/// raw text logged for diagnosis.
pub fn parse_outline_payload(raw: &str) -> OutlineMaterialization {
    let trimmed = raw.trim();

    if trimmed.starts_with(ORACLE_ERROR_PREFIX) {
        return OutlineMaterialization::Denied {
            diagnostic: trimmed.to_string(),
        };
    }

    let parsed: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(error) => {
            warn!(error = %error, raw = trimmed, "oracle payload is not valid JSON");
            return OutlineMaterialization::Outline(OutlineResponse::safe_empty());
        }
    };

    let is_numbered = parsed
        .get("is_numbered")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let last_toc_page = parsed
        .get("last_toc_page")
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    let stop_heading = parsed
        .get("stop_heading")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tree = match parsed.get("toc_tree") {
        Some(tree_value) => match HeadingTree::from_wire(tree_value, is_numbered) {
            Ok(tree) => tree,
            Err(error) => {
                warn!(error = %error, raw = trimmed, "oracle payload carries a malformed tree");
                return OutlineMaterialization::Outline(OutlineResponse::safe_empty());
            }
        },
        None => HeadingTree::empty(is_numbered),
    };

    OutlineMaterialization::Outline(OutlineResponse {
        tree,
        last_toc_page,
        stop_heading,
    })
}

/// Structuring oracle backed by an external program. The program receives the
/// TOC PDF path and `--mode toc|window` and writes the payload to stdout.
pub struct CommandStructuringOracle {
    program: PathBuf,
}

impl CommandStructuringOracle {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl StructuringOracle for CommandStructuringOracle {
    fn materialize(&self, toc_pdf: &Path, from_toc: bool) -> Result<OutlineMaterialization> {
        let mode = if from_toc { "toc" } else { "window" };

        let output = Command::new(&self.program)
            .arg("--mode")
            .arg(mode)
            .arg(toc_pdf)
            .output()
            .with_context(|| {
                format!("failed to execute structuring oracle {}", self.program.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "structuring oracle {} returned non-zero exit status: {}",
                self.program.display(),
                stderr.trim()
            );
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        Ok(parse_outline_payload(&raw))
    }
}

/// Structuring oracle that reads a payload prepared out of band. Used for
/// deterministic runs and tests.
pub struct FileStructuringOracle {
    payload_path: PathBuf,
}

impl FileStructuringOracle {
    pub fn new(payload_path: PathBuf) -> Self {
        Self { payload_path }
    }
}

impl StructuringOracle for FileStructuringOracle {
    fn materialize(&self, _toc_pdf: &Path, _from_toc: bool) -> Result<OutlineMaterialization> {
        let raw = std::fs::read_to_string(&self.payload_path).with_context(|| {
            format!("failed to read outline payload {}", self.payload_path.display())
        })?;
        Ok(parse_outline_payload(&raw))
    }
}

/// Boundary oracle backed by an external program: the candidate line is the
/// single argument, a stdout of `true` (case-insensitive) confirms.
pub struct CommandBoundaryOracle {
    program: PathBuf,
}

impl CommandBoundaryOracle {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl BoundaryOracle for CommandBoundaryOracle {
    fn confirm_heading(&self, line: &str) -> Result<bool> {
        let output = Command::new(&self.program)
            .arg(line)
            .output()
            .with_context(|| {
                format!("failed to execute boundary oracle {}", self.program.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "boundary oracle {} returned non-zero exit status: {}",
                self.program.display(),
                stderr.trim()
            );
        }

        let reply = String::from_utf8_lossy(&output.stdout);
        Ok(reply.trim().eq_ignore_ascii_case("true"))
    }
}

/// Boundary oracle used when no program is configured: never confirms.
pub struct NullBoundaryOracle;

impl BoundaryOracle for NullBoundaryOracle {
    fn confirm_heading(&self, _line: &str) -> Result<bool> {
        Ok(false)
    }
}
