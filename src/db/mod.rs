mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Duration, SecondsFormat, SubsecRound, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{DocError, Result};
use crate::models::*;

/// SQLite-backed store for documents, the cost ledger, and licensing packages.
///
/// Every status change is a guarded `UPDATE ... WHERE status = ?`, so the
/// database is the only synchronization point between requests.
#[derive(Debug)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Cost of the generation call that produced a document.
#[derive(Debug, Clone)]
pub struct GenerationCost {
    pub provider: String,
    pub model: String,
    pub tokens: i64,
    pub cost: f64,
}

const DOCUMENT_COLUMNS: &str = "id, doc_type, content, draft_content, status, licensing_focus, source,
     reviewer_name, quality_score, changes_summary, created_at, reviewed_at, licensed_at";

const COST_COLUMNS: &str = "id, document_id, provider, model, tokens, cost, created_at";

const FEEDBACK_COLUMNS: &str = "id, document_id, doc_type, draft_length, final_length, lines_added,
     lines_removed, change_ratio, quality_score, changes_summary, created_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path.parent().ok_or_else(|| {
            DocError::StorageUnavailable("Database path has no parent directory".to_string())
        })?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DocError::StorageUnavailable("database lock poisoned".to_string()))
    }

    /// Number of tables in the schema. Used by the health check to prove the store answers.
    pub fn table_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ============================================================
    // Document operations
    // ============================================================

    pub fn create_document(&self, input: CreateDocumentInput) -> Result<Document> {
        let conn = self.conn()?;
        insert_document(&conn, input, now())
    }

    /// Insert a generated document and its cost record in one transaction.
    ///
    /// `persist` runs before commit with the new rows; if it fails neither the
    /// document nor the cost record is kept.
    pub fn insert_generated<F>(
        &self,
        input: CreateDocumentInput,
        cost: GenerationCost,
        persist: F,
    ) -> Result<(Document, CostRecord)>
    where
        F: FnOnce(&Document, &CostRecord) -> Result<()>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at = now();

        let document = insert_document(&tx, input, created_at)?;
        let cost_record = insert_cost(
            &tx,
            RecordCostInput {
                document_id: Some(document.id),
                provider: cost.provider,
                model: cost.model,
                tokens: cost.tokens,
                cost: cost.cost,
            },
            created_at,
        )?;

        persist(&document, &cost_record)?;
        tx.commit()?;

        Ok((document, cost_record))
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.conn()?;
        find_document(&conn, id)
    }

    /// Documents in creation order, optionally restricted to one status.
    pub fn list_documents(&self, status: Option<DocumentStatus>) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        let documents = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents WHERE status = ? ORDER BY id",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([status.as_str()], row_to_document)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents ORDER BY id",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], row_to_document)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(documents)
    }

    /// Documents awaiting a human edit.
    pub fn review_queue(&self) -> Result<Vec<Document>> {
        self.list_documents(Some(DocumentStatus::Review))
    }

    /// Move a document from `review` to `completed` and record what the reviewer changed.
    ///
    /// The update only matches a row still in `review`, so of two concurrent
    /// calls exactly one wins and the other gets `InvalidTransition`. The
    /// feedback row commits with the status change or not at all.
    pub fn complete_review(&self, id: i64, completion: &ReviewCompletion) -> Result<Document> {
        completion.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let reviewed_at = now();
        let rows = tx.execute(
            "UPDATE documents
             SET content = ?, reviewer_name = ?, quality_score = ?, changes_summary = ?,
                 licensing_focus = (licensing_focus OR ?), status = 'completed', reviewed_at = ?
             WHERE id = ? AND status = 'review'",
            (
                &completion.reviewed_content,
                completion.reviewer_name.trim(),
                completion.quality_score,
                &completion.changes_summary,
                completion.prepare_for_licensing,
                format_ts(&reviewed_at),
                id,
            ),
        )?;

        if rows == 0 {
            return Err(match find_document(&tx, id)? {
                Some(existing) => DocError::InvalidTransition {
                    id,
                    from: existing.status,
                    to: DocumentStatus::Completed,
                },
                None => DocError::NotFound {
                    entity: "document",
                    id,
                },
            });
        }

        let document = find_document(&tx, id)?.ok_or(DocError::NotFound {
            entity: "document",
            id,
        })?;
        insert_feedback(&tx, &document, reviewed_at)?;
        tx.commit()?;

        Ok(document)
    }

    // ============================================================
    // Review feedback
    // ============================================================

    /// Feedback recorded over the last `days` days, oldest first.
    pub fn list_review_feedback(&self, days: u32) -> Result<Vec<ReviewFeedback>> {
        let since = format_ts(&window_start(days)?);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM review_feedback WHERE created_at >= ? ORDER BY created_at, id",
            FEEDBACK_COLUMNS
        ))?;
        let feedback = stmt
            .query_map([&since], row_to_feedback)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(feedback)
    }

    pub fn review_insights(&self, days: u32) -> Result<ReviewInsights> {
        let since = format_ts(&window_start(days)?);
        let conn = self.conn()?;

        let (avg_quality_score, lines_added, lines_removed): (Option<f64>, i64, i64) = conn
            .query_row(
                "SELECT AVG(quality_score), COALESCE(SUM(lines_added), 0),
                        COALESCE(SUM(lines_removed), 0)
                 FROM review_feedback WHERE created_at >= ?",
                [&since],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let mut stmt = conn.prepare(
            "SELECT doc_type, COUNT(*) AS reviews, AVG(change_ratio), AVG(quality_score)
             FROM review_feedback WHERE created_at >= ?
             GROUP BY doc_type ORDER BY reviews DESC, doc_type",
        )?;
        let by_doc_type = stmt
            .query_map([&since], |row| {
                let doc_type: String = row.get(0)?;
                Ok(DocTypeInsight {
                    doc_type: DocType::from_str(&doc_type)
                        .ok_or_else(|| invalid_column(0, &doc_type))?,
                    reviews: row.get(1)?,
                    avg_change_ratio: row.get(2)?,
                    avg_quality_score: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ReviewInsights::new(
            days,
            by_doc_type,
            avg_quality_score,
            lines_added,
            lines_removed,
        ))
    }

    // ============================================================
    // Cost ledger operations
    // ============================================================

    pub fn record_cost(&self, input: RecordCostInput) -> Result<CostRecord> {
        self.record_cost_at(input, now())
    }

    /// Append a cost record with an explicit timestamp (backfills and imports).
    pub fn record_cost_at(&self, input: RecordCostInput, at: DateTime<Utc>) -> Result<CostRecord> {
        let conn = self.conn()?;
        insert_cost(&conn, input, at.trunc_subsecs(6))
    }

    /// Records with `from <= created_at < to`, oldest first.
    pub fn list_costs_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CostRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cost_records WHERE created_at >= ? AND created_at < ? ORDER BY created_at, id",
            COST_COLUMNS
        ))?;
        let records = stmt
            .query_map((format_ts(&from), format_ts(&to)), row_to_cost)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Sum of `cost` for records with `from <= created_at < to`.
    pub fn total_cost_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<f64> {
        let conn = self.conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0) FROM cost_records WHERE created_at >= ? AND created_at < ?",
            (format_ts(&from), format_ts(&to)),
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Total spend over the last `days` days, up to now.
    pub fn total_cost_since(&self, days: u32) -> Result<f64> {
        let conn = self.conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0) FROM cost_records WHERE created_at >= ?",
            [format_ts(&window_start(days)?)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn cost_summary(&self, days: u32) -> Result<CostSummary> {
        let since = format_ts(&window_start(days)?);
        let conn = self.conn()?;

        let (total_cost, total_tokens, requests): (f64, i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0), COALESCE(SUM(tokens), 0), COUNT(*)
             FROM cost_records WHERE created_at >= ?",
            [&since],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, SUM(cost), SUM(tokens), COUNT(*)
             FROM cost_records WHERE created_at >= ?
             GROUP BY day ORDER BY day DESC",
        )?;
        let daily_breakdown = stmt
            .query_map([&since], |row| {
                Ok(DailyCost {
                    date: row.get(0)?,
                    cost: row.get(1)?,
                    tokens: row.get(2)?,
                    requests: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let avg_cost_per_document = if requests > 0 {
            total_cost / requests as f64
        } else {
            0.0
        };

        Ok(CostSummary {
            period_days: days,
            total_cost,
            total_tokens,
            requests,
            avg_cost_per_document,
            daily_breakdown,
        })
    }

    /// Spend since midnight UTC on the first of the current month.
    pub fn month_to_date_cost(&self) -> Result<f64> {
        let today = Utc::now();
        let month_start = Utc
            .with_ymd_and_hms(today.year(), today.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(today);
        let conn = self.conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0) FROM cost_records WHERE created_at >= ?",
            [format_ts(&month_start)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // ============================================================
    // Licensing package operations
    // ============================================================

    /// Package every completed document without writing a bundle to disk.
    pub fn create_package(&self, input: CreatePackageInput) -> Result<LicensingPackage> {
        self.create_package_with(input, |_, _| Ok(None))
    }

    /// Package every completed document and mark each one `licensed`.
    ///
    /// `write_artifact` receives the new package and its documents (already
    /// `licensed`) before commit and returns where the bundle was written. If it
    /// fails the whole package is rolled back and the documents stay `completed`.
    pub fn create_package_with<F>(
        &self,
        input: CreatePackageInput,
        write_artifact: F,
    ) -> Result<LicensingPackage>
    where
        F: FnOnce(&LicensingPackage, &[Document]) -> Result<Option<String>>,
    {
        let product_name = input.product_name.trim().to_string();
        let version = input.version.trim().to_string();
        if product_name.is_empty() {
            return Err(DocError::validation("product_name must not be empty"));
        }
        if version.is_empty() {
            return Err(DocError::validation("version must not be empty"));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let completed = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM documents WHERE status = 'completed' ORDER BY created_at, id",
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        if completed.is_empty() {
            return Err(DocError::EmptySelection);
        }

        let mut documents = order_by_manifest(completed, input.manifest.as_deref())?;
        let licensed_at = now();

        for document in &mut documents {
            let rows = tx.execute(
                "UPDATE documents SET status = 'licensed', licensed_at = ?
                 WHERE id = ? AND status = 'completed'",
                (format_ts(&licensed_at), document.id),
            )?;
            if rows == 0 {
                return Err(DocError::InvalidTransition {
                    id: document.id,
                    from: document.status,
                    to: DocumentStatus::Licensed,
                });
            }
            document.status = DocumentStatus::Licensed;
            document.licensed_at = Some(licensed_at);
        }

        tx.execute(
            "INSERT INTO licensing_packages (product_name, version, created_at) VALUES (?, ?, ?)",
            (&product_name, &version, format_ts(&licensed_at)),
        )?;
        let package_id = tx.last_insert_rowid();

        for (position, document) in documents.iter().enumerate() {
            tx.execute(
                "INSERT INTO package_documents (package_id, document_id, position) VALUES (?, ?, ?)",
                (package_id, document.id, position as i64),
            )?;
        }

        let mut package = LicensingPackage {
            id: package_id,
            product_name,
            version,
            document_ids: documents.iter().map(|d| d.id).collect(),
            artifact_path: None,
            created_at: licensed_at,
        };

        if let Some(path) = write_artifact(&package, &documents)? {
            tx.execute(
                "UPDATE licensing_packages SET artifact_path = ? WHERE id = ?",
                (&path, package_id),
            )?;
            package.artifact_path = Some(path);
        }

        tx.commit()?;

        tracing::info!(
            "Created licensing package {} ({} v{}) with {} documents",
            package.id,
            package.product_name,
            package.version,
            package.document_ids.len()
        );

        Ok(package)
    }

    pub fn get_package(&self, id: i64) -> Result<Option<LicensingPackage>> {
        let conn = self.conn()?;
        let package = conn
            .query_row(
                "SELECT id, product_name, version, artifact_path, created_at
                 FROM licensing_packages WHERE id = ?",
                [id],
                row_to_package,
            )
            .optional()?;

        match package {
            Some(mut package) => {
                package.document_ids = package_document_ids(&conn, package.id)?;
                Ok(Some(package))
            }
            None => Ok(None),
        }
    }

    pub fn list_packages(&self) -> Result<Vec<LicensingPackage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, product_name, version, artifact_path, created_at
             FROM licensing_packages ORDER BY id",
        )?;
        let mut packages = stmt
            .query_map([], row_to_package)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for package in &mut packages {
            package.document_ids = package_document_ids(&conn, package.id)?;
        }

        Ok(packages)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn insert_document(
    conn: &Connection,
    input: CreateDocumentInput,
    created_at: DateTime<Utc>,
) -> Result<Document> {
    if input.content.trim().is_empty() {
        return Err(DocError::validation("content must not be empty"));
    }
    let source = input.source.trim().to_string();
    if source.is_empty() {
        return Err(DocError::validation("source must not be empty"));
    }

    conn.execute(
        "INSERT INTO documents (doc_type, content, draft_content, status, licensing_focus, source, created_at)
         VALUES (?, ?, ?, 'review', ?, ?, ?)",
        (
            input.doc_type.as_str(),
            &input.content,
            &input.content,
            input.licensing_focus,
            &source,
            format_ts(&created_at),
        ),
    )?;

    Ok(Document {
        id: conn.last_insert_rowid(),
        doc_type: input.doc_type,
        draft_content: input.content.clone(),
        content: input.content,
        status: DocumentStatus::Review,
        licensing_focus: input.licensing_focus,
        source,
        reviewer_name: None,
        quality_score: None,
        changes_summary: None,
        created_at,
        reviewed_at: None,
        licensed_at: None,
    })
}

fn insert_cost(
    conn: &Connection,
    input: RecordCostInput,
    created_at: DateTime<Utc>,
) -> Result<CostRecord> {
    if input.tokens < 0 {
        return Err(DocError::validation("tokens must not be negative"));
    }
    if !input.cost.is_finite() || input.cost < 0.0 {
        return Err(DocError::validation("cost must be a non-negative number"));
    }

    conn.execute(
        "INSERT INTO cost_records (document_id, provider, model, tokens, cost, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            input.document_id,
            &input.provider,
            &input.model,
            input.tokens,
            input.cost,
            format_ts(&created_at),
        ),
    )?;

    Ok(CostRecord {
        id: conn.last_insert_rowid(),
        document_id: input.document_id,
        provider: input.provider,
        model: input.model,
        tokens: input.tokens,
        cost: input.cost,
        created_at,
    })
}

fn insert_feedback(
    conn: &Connection,
    document: &Document,
    created_at: DateTime<Utc>,
) -> Result<ReviewFeedback> {
    let stats = EditStats::between(&document.draft_content, &document.content);
    let changes_summary = document.changes_summary.clone().unwrap_or_default();

    conn.execute(
        "INSERT INTO review_feedback (document_id, doc_type, draft_length, final_length,
             lines_added, lines_removed, change_ratio, quality_score, changes_summary, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            document.id,
            document.doc_type.as_str(),
            stats.draft_length,
            stats.final_length,
            stats.lines_added,
            stats.lines_removed,
            stats.change_ratio,
            document.quality_score,
            &changes_summary,
            format_ts(&created_at),
        ),
    )?;

    Ok(ReviewFeedback {
        id: conn.last_insert_rowid(),
        document_id: document.id,
        doc_type: document.doc_type,
        draft_length: stats.draft_length,
        final_length: stats.final_length,
        lines_added: stats.lines_added,
        lines_removed: stats.lines_removed,
        change_ratio: stats.change_ratio,
        quality_score: document.quality_score,
        changes_summary,
        created_at,
    })
}

fn find_document(conn: &Connection, id: i64) -> Result<Option<Document>> {
    let document = conn
        .query_row(
            &format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS),
            [id],
            row_to_document,
        )
        .optional()?;
    Ok(document)
}

fn package_document_ids(conn: &Connection, package_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT document_id FROM package_documents WHERE package_id = ? ORDER BY position",
    )?;
    let ids = stmt
        .query_map([package_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Put manifest ids first, in manifest order; the rest keep creation order.
fn order_by_manifest(documents: Vec<Document>, manifest: Option<&[i64]>) -> Result<Vec<Document>> {
    let Some(manifest) = manifest else {
        return Ok(documents);
    };

    let mut seen = HashSet::new();
    if let Some(dup) = manifest.iter().find(|id| !seen.insert(**id)) {
        return Err(DocError::validation(format!(
            "manifest lists document {} more than once",
            dup
        )));
    }

    let available: HashSet<i64> = documents.iter().map(|d| d.id).collect();
    let missing: Vec<String> = manifest
        .iter()
        .filter(|id| !available.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DocError::validation(format!(
            "manifest references documents that are not completed: {}",
            missing.join(", ")
        )));
    }

    let (mut listed, rest): (Vec<_>, Vec<_>) =
        documents.into_iter().partition(|d| seen.contains(&d.id));
    listed.sort_by_key(|d| manifest.iter().position(|id| *id == d.id));
    listed.extend(rest);
    Ok(listed)
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let doc_type: String = row.get(1)?;
    let status: String = row.get(4)?;
    Ok(Document {
        id: row.get(0)?,
        doc_type: DocType::from_str(&doc_type).ok_or_else(|| invalid_column(1, &doc_type))?,
        content: row.get(2)?,
        draft_content: row.get(3)?,
        status: DocumentStatus::from_str(&status).ok_or_else(|| invalid_column(4, &status))?,
        licensing_focus: row.get(5)?,
        source: row.get(6)?,
        reviewer_name: row.get(7)?,
        quality_score: row.get(8)?,
        changes_summary: row.get(9)?,
        created_at: parse_ts(10, row.get(10)?)?,
        reviewed_at: row
            .get::<_, Option<String>>(11)?
            .map(|s| parse_ts(11, s))
            .transpose()?,
        licensed_at: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_ts(12, s))
            .transpose()?,
    })
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<ReviewFeedback> {
    let doc_type: String = row.get(2)?;
    Ok(ReviewFeedback {
        id: row.get(0)?,
        document_id: row.get(1)?,
        doc_type: DocType::from_str(&doc_type).ok_or_else(|| invalid_column(2, &doc_type))?,
        draft_length: row.get(3)?,
        final_length: row.get(4)?,
        lines_added: row.get(5)?,
        lines_removed: row.get(6)?,
        change_ratio: row.get(7)?,
        quality_score: row.get(8)?,
        changes_summary: row.get(9)?,
        created_at: parse_ts(10, row.get(10)?)?,
    })
}

fn row_to_cost(row: &Row<'_>) -> rusqlite::Result<CostRecord> {
    Ok(CostRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        provider: row.get(2)?,
        model: row.get(3)?,
        tokens: row.get(4)?,
        cost: row.get(5)?,
        created_at: parse_ts(6, row.get(6)?)?,
    })
}

fn row_to_package(row: &Row<'_>) -> rusqlite::Result<LicensingPackage> {
    Ok(LicensingPackage {
        id: row.get(0)?,
        product_name: row.get(1)?,
        version: row.get(2)?,
        document_ids: Vec::new(),
        artifact_path: row.get(3)?,
        created_at: parse_ts(4, row.get(4)?)?,
    })
}

/// Current time at the precision stored in the database.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Start of a trailing window of `days` days ending now.
fn window_start(days: u32) -> Result<DateTime<Utc>> {
    now()
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| DocError::validation(format!("days out of range: {}", days)))
}

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid_column(idx, &s))
}

fn invalid_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value {:?}", value).into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64) -> Document {
        Document {
            id,
            doc_type: DocType::Changelog,
            content: format!("doc {}", id),
            draft_content: format!("doc {}", id),
            status: DocumentStatus::Completed,
            licensing_focus: false,
            source: "test".to_string(),
            reviewer_name: None,
            quality_score: None,
            changes_summary: None,
            created_at: Utc::now(),
            reviewed_at: None,
            licensed_at: None,
        }
    }

    fn ids(docs: &[Document]) -> Vec<i64> {
        docs.iter().map(|d| d.id).collect()
    }

    #[test]
    fn manifest_moves_listed_documents_to_front() {
        let docs = vec![doc(1), doc(2), doc(3), doc(4)];
        let ordered = order_by_manifest(docs, Some(&[4, 2][..])).unwrap();
        assert_eq!(ids(&ordered), vec![4, 2, 1, 3]);
    }

    #[test]
    fn no_manifest_keeps_creation_order() {
        let ordered = order_by_manifest(vec![doc(1), doc(2)], None).unwrap();
        assert_eq!(ids(&ordered), vec![1, 2]);
    }

    #[test]
    fn manifest_rejects_unknown_and_duplicate_ids() {
        assert!(matches!(
            order_by_manifest(vec![doc(1)], Some(&[9][..])),
            Err(DocError::Validation(_))
        ));
        assert!(matches!(
            order_by_manifest(vec![doc(1), doc(2)], Some(&[1, 1][..])),
            Err(DocError::Validation(_))
        ));
    }

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let later = earlier + Duration::microseconds(1);
        assert!(format_ts(&earlier) < format_ts(&later));
        assert_eq!(format_ts(&earlier), "2024-01-01T09:00:00.000000Z");
    }
}
