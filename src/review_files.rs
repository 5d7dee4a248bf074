//! Human-editable markdown copies of documents.
//!
//! Each document has exactly one review file at
//! `{docs_dir}/review/{doc_type}_{id}_{YYYYMMDD_HHMMSS}.md`, derived from the
//! row. The file opens with a `---` delimited header naming the document id,
//! which is checked whenever the file is read back.
//!
//! Licensing bundles are written under `{docs_dir}/licensing_ready/`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::{DocError, Result};
use crate::models::{CostRecord, Document, LicensingPackage};

const DELIMITER: &str = "---";

const REVIEW_INSTRUCTIONS: &str = "# REVIEW INSTRUCTIONS
1. Check technical accuracy
2. Verify completeness for licensing
3. Mark sections needing clarification with [REVIEW]
4. Add licensing-specific details
5. Update any placeholder content
";

/// Filesystem area holding review files and licensing bundles.
#[derive(Debug, Clone)]
pub struct ReviewFiles {
    root: PathBuf,
}

/// A review file read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReviewFile {
    pub document_id: i64,
    pub body: String,
}

impl ReviewFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn review_dir(&self) -> PathBuf {
        self.root.join("review")
    }

    pub fn licensing_dir(&self) -> PathBuf {
        self.root.join("licensing_ready")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.review_dir())?;
        fs::create_dir_all(self.licensing_dir())?;
        Ok(())
    }

    /// Where the review file for `document` lives.
    pub fn path_for(&self, document: &Document) -> PathBuf {
        self.review_dir().join(document.review_file_name())
    }

    /// Write a freshly generated document for human review.
    pub fn write_for_review(&self, document: &Document, cost: &CostRecord) -> Result<PathBuf> {
        let path = self.path_for(document);
        let contents = format!(
            "{DELIMITER}
# DOCUMENT FOR REVIEW
# ID: {}
# Type: {}
# Generated: {}
# Cost: ${:.6}
# Tokens: {}
# Model: {}
{DELIMITER}
{REVIEW_INSTRUCTIONS}{DELIMITER}

{}",
            document.id,
            document.doc_type.as_str(),
            document.created_at.to_rfc3339(),
            cost.cost,
            cost.tokens,
            cost.model,
            document.content,
        );

        write_file(&path, &contents)?;
        tracing::debug!("Saved document {} for review at {}", document.id, path.display());
        Ok(path)
    }

    /// Locate and parse the review file for `document`.
    ///
    /// Fails with [`DocError::ReviewFile`] if the file is missing, has no
    /// header, or its header names a different document.
    pub fn read(&self, document: &Document) -> Result<ParsedReviewFile> {
        let path = self.path_for(document);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocError::review_file(path.display(), "file not found"));
            }
            Err(e) => return Err(DocError::review_file(path.display(), e.to_string())),
        };

        let parsed = parse_review_file(&raw)
            .map_err(|reason| DocError::review_file(path.display(), reason))?;

        if parsed.document_id != document.id {
            return Err(DocError::review_file(
                path.display(),
                format!(
                    "header names document {}, expected {}",
                    parsed.document_id, document.id
                ),
            ));
        }

        Ok(parsed)
    }

    /// Rewrite the review file after a review was submitted.
    pub fn write_reviewed(&self, document: &Document) -> Result<PathBuf> {
        let path = self.path_for(document);
        let reviewed_at = document.reviewed_at.unwrap_or_else(Utc::now);
        let contents = format!(
            "{DELIMITER}
# REVIEWED DOCUMENT
# ID: {}
# Type: {}
# Generated: {}
# Reviewed: {}
# Reviewer: {}
# Changes: {}
{DELIMITER}

{}",
            document.id,
            document.doc_type.as_str(),
            document.created_at.to_rfc3339(),
            reviewed_at.to_rfc3339(),
            single_line(document.reviewer_name.as_deref().unwrap_or("unknown")),
            single_line(document.changes_summary.as_deref().unwrap_or("")),
            document.content,
        );

        write_file(&path, &contents)?;
        Ok(path)
    }

    /// Write the licensing bundle for `package` and return its directory.
    ///
    /// Layout: one `licensing_{review file name}` per document, plus
    /// `manifest.json` and `README.md`.
    pub fn write_bundle(
        &self,
        package: &LicensingPackage,
        documents: &[Document],
    ) -> Result<PathBuf> {
        let dir = self.licensing_dir().join(format!(
            "{}_v{}_pkg{}",
            sanitize(&package.product_name),
            sanitize(&package.version),
            package.id
        ));
        // A rolled-back package leaves its id, and so this directory, to the next one
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        if let Err(e) = write_bundle_files(&dir, package, documents) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!("Failed to remove partial bundle {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }

        tracing::info!(
            "Wrote licensing bundle for package {} to {}",
            package.id,
            dir.display()
        );
        Ok(dir)
    }
}

fn write_bundle_files(
    dir: &Path,
    package: &LicensingPackage,
    documents: &[Document],
) -> Result<()> {
    let prepared_on = package.created_at.format("%Y-%m-%d").to_string();
    let mut entries = Vec::with_capacity(documents.len());

    for document in documents {
        let file = format!("licensing_{}", document.review_file_name());
        let contents = format!(
            "# SOFTWARE DOCUMENTATION FOR LICENSING
# Product: {} v{}
# Document: {} ({})
# Preparation Date: {prepared_on}
# Confidential - For Licensee Review Only

{}

{DELIMITER}
## LICENSING ACKNOWLEDGMENT

This document is part of the software licensing package.
All technical specifications are accurate as of the preparation date.

**Effective Date:** {prepared_on}
",
            package.product_name,
            package.version,
            document.doc_type.title(),
            document.id,
            document.content.trim_end(),
        );
        write_file(&dir.join(&file), &contents)?;
        entries.push(BundleEntry {
            document_id: document.id,
            doc_type: document.doc_type.as_str(),
            file,
        });
    }

    let manifest = BundleManifest {
        package_id: package.id,
        product_name: &package.product_name,
        version: &package.version,
        generated_date: package.created_at.to_rfc3339(),
        total_documents: entries.len(),
        documents: entries,
    };
    write_file(
        &dir.join("manifest.json"),
        &serde_json::to_string_pretty(&manifest)?,
    )?;

    let listing: Vec<String> = manifest
        .documents
        .iter()
        .map(|entry| format!("- {}", entry.file))
        .collect();
    let readme = format!(
        "# SOFTWARE LICENSING DOCUMENTATION PACKAGE

## Product: {}
## Version: {}
## Package Date: {prepared_on}

### INCLUDED DOCUMENTS:
{}

### CONFIDENTIALITY:
These documents contain proprietary information and are provided under
confidentiality agreement for the purpose of software licensing evaluation.
",
        package.product_name,
        package.version,
        listing.join("\n"),
    );
    write_file(&dir.join("README.md"), &readme)?;
    Ok(())
}

#[derive(Serialize)]
struct BundleManifest<'a> {
    package_id: i64,
    product_name: &'a str,
    version: &'a str,
    generated_date: String,
    documents: Vec<BundleEntry>,
    total_documents: usize,
}

#[derive(Serialize)]
struct BundleEntry {
    document_id: i64,
    doc_type: &'static str,
    file: String,
}

/// Extract the document id from a review file path such as
/// `docs/review/technical_spec_12_20240101_120000.md`.
///
/// `review_` and `reviewed_` prefixes are tolerated.
pub fn document_id_from_path(path: &Path) -> Result<i64> {
    let invalid = |reason: &str| DocError::review_file(path.display(), reason);

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("path has no file name"))?;
    let stem = name
        .strip_suffix(".md")
        .ok_or_else(|| invalid("expected a .md file"))?;
    let stem = stem
        .strip_prefix("reviewed_")
        .or_else(|| stem.strip_prefix("review_"))
        .unwrap_or(stem);

    // {doc_type}_{id}_{YYYYMMDD}_{HHMMSS}; doc_type itself contains underscores
    let mut parts = stem.rsplitn(4, '_');
    let time = parts.next().unwrap_or_default();
    let date = parts.next().unwrap_or_default();
    let id = parts.next().unwrap_or_default();
    let doc_type = parts.next().unwrap_or_default();

    let is_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if doc_type.is_empty() || !is_digits(date, 8) || !is_digits(time, 6) {
        return Err(invalid(
            "file name does not match {doc_type}_{id}_{YYYYMMDD_HHMMSS}.md",
        ));
    }

    id.parse()
        .map_err(|_| invalid("file name does not contain a numeric document id"))
}

/// Split a review file into its header id and body.
fn parse_review_file(raw: &str) -> std::result::Result<ParsedReviewFile, String> {
    let mut lines = raw.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => return Err("missing header".to_string()),
    }

    let mut document_id = None;
    let mut closed = false;
    for line in lines.by_ref() {
        let line = line.trim_end();
        if line == DELIMITER {
            closed = true;
            break;
        }
        if let Some(value) = line.strip_prefix("# ID:") {
            document_id = Some(
                value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("invalid document id {:?} in header", value.trim()))?,
            );
        }
    }

    if !closed {
        return Err("header is not terminated".to_string());
    }
    let document_id = document_id.ok_or_else(|| "header has no ID line".to_string())?;

    let mut rest: String = lines.collect();
    if rest.starts_with("# REVIEW INSTRUCTIONS") {
        let end = rest
            .split_inclusive('\n')
            .position(|line| line.trim_end() == DELIMITER)
            .ok_or_else(|| "review instructions are not terminated".to_string())?;
        rest = rest.split_inclusive('\n').skip(end + 1).collect();
    }

    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(&rest)
        .to_string();

    Ok(ParsedReviewFile { document_id, body })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep product names and versions safe as directory names.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
