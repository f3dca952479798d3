use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::commands::locate::{LocatorConfig, find_toc_pages};
use crate::model::{
    ExtractCounts, ExtractPaths, ExtractRunManifest, HeadingNode, HeadingTree, SectionArtifact,
    TocPageSet, ToolVersions,
};
use crate::oracle::{
    BoundaryOracle, CommandBoundaryOracle, CommandStructuringOracle, FileStructuringOracle,
    NullBoundaryOracle, OutlineMaterialization, StructuringOracle,
};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, unique_artifact_path, utc_compact_string,
    write_json_pretty,
};

mod attribute;
mod db;
mod flatten;
mod line_stream;
mod page_text;
mod run;
#[cfg(test)]
mod tests;

pub use page_text::extract_pages;
pub use run::run;

use attribute::*;
use db::*;
use flatten::*;
use line_stream::*;
use page_text::*;
use run::*;
