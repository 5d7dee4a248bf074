//! Document lifecycle orchestration.
//!
//! [`Workflow`] is the application state shared by every HTTP handler. It
//! owns no state of its own beyond handles: every read and every transition
//! goes through [`Database`], and review files are derived from rows.

mod licensing;
mod review;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::{Database, GenerationCost};
use crate::error::{DocError, Result};
use crate::generator::{GenerationRequest, Generator};
use crate::models::*;
use crate::review_files::ReviewFiles;

pub use review::{ReviewSubmission, ReviewTarget};

/// Longest reporting window accepted by the cost and review summaries.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Clone)]
pub struct Workflow {
    db: Database,
    files: ReviewFiles,
    generator: Generator,
    monthly_budget: Option<f64>,
}

/// Parameters for generating one document.
#[derive(Debug, Clone)]
pub struct GenerateDocument {
    pub doc_type: DocType,
    pub context: String,
    pub features: Option<String>,
    pub licensing_focus: bool,
    pub source: String,
    /// Overrides the configured per-attempt timeout.
    pub timeout: Option<Duration>,
}

/// A freshly generated document waiting in the review queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedDocument {
    pub document_id: i64,
    pub doc_type: DocType,
    pub status: DocumentStatus,
    pub content: String,
    pub tokens: i64,
    pub cost: f64,
    pub model: String,
    pub provider: String,
    pub review_path: String,
}

/// Liveness report for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Health {
    pub status: String,
    pub tables: i64,
    pub generator: String,
    pub model: String,
    pub review_queue: usize,
}

impl Workflow {
    pub fn new(
        db: Database,
        files: ReviewFiles,
        generator: Generator,
        monthly_budget: Option<f64>,
    ) -> Self {
        Self {
            db,
            files,
            generator,
            monthly_budget,
        }
    }

    /// Open the database, apply migrations, and create the docs directories.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let db = Database::open(config.db_path.clone())?;
        db.migrate()?;

        let files = ReviewFiles::new(&config.docs_dir);
        files.ensure_dirs()?;

        Ok(Self::new(
            db,
            files,
            Generator::from_config(&config.generator),
            config.monthly_budget,
        ))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn files(&self) -> &ReviewFiles {
        &self.files
    }

    pub fn health(&self) -> Result<Health> {
        Ok(Health {
            status: "ok".to_string(),
            tables: self.db.table_count()?,
            generator: self.generator.provider().to_string(),
            model: self.generator.model().to_string(),
            review_queue: self.db.review_queue()?.len(),
        })
    }

    // ============================================================
    // Generation
    // ============================================================

    /// Generate a document, store it with its cost, and write its review file.
    ///
    /// The row, the cost record, and the file either all exist afterwards or
    /// none of them do.
    pub async fn generate(&self, params: GenerateDocument) -> Result<GeneratedDocument> {
        let context = params.context.trim();
        if context.is_empty() {
            return Err(DocError::validation("context must not be empty"));
        }
        if params.source.trim().is_empty() {
            return Err(DocError::validation("source must not be empty"));
        }
        if params.timeout == Some(Duration::ZERO) {
            return Err(DocError::validation("timeout must be greater than zero"));
        }

        let request = GenerationRequest {
            doc_type: params.doc_type,
            context: context.to_string(),
            features: params.features,
        };
        let generation = self.generator.generate(&request, params.timeout).await?;

        let input = CreateDocumentInput {
            doc_type: params.doc_type,
            content: generation.content,
            licensing_focus: params.licensing_focus,
            source: params.source.trim().to_string(),
        };
        let cost = GenerationCost {
            provider: generation.provider.clone(),
            model: generation.model.clone(),
            tokens: generation.tokens,
            cost: generation.cost,
        };

        let mut review_path = PathBuf::new();
        let (document, cost_record) = self
            .db
            .insert_generated(input, cost, |document, cost_record| {
                review_path = self.files.write_for_review(document, cost_record)?;
                Ok(())
            })
            .inspect_err(|_| {
                // commit failed after the file was written
                if !review_path.as_os_str().is_empty() {
                    let _ = std::fs::remove_file(&review_path);
                }
            })?;

        tracing::info!(
            "Document {} ({}) saved for review at {}",
            document.id,
            document.doc_type.as_str(),
            review_path.display()
        );

        Ok(GeneratedDocument {
            document_id: document.id,
            doc_type: document.doc_type,
            status: document.status,
            content: document.content,
            tokens: cost_record.tokens,
            cost: cost_record.cost,
            model: cost_record.model,
            provider: cost_record.provider,
            review_path: review_path.display().to_string(),
        })
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn review_queue(&self) -> Result<Vec<Document>> {
        self.db.review_queue()
    }

    pub fn list_documents(&self, status: Option<DocumentStatus>) -> Result<Vec<Document>> {
        self.db.list_documents(status)
    }

    pub fn document(&self, id: i64) -> Result<Document> {
        self.db.get_document(id)?.ok_or(DocError::NotFound {
            entity: "document",
            id,
        })
    }

    // ============================================================
    // Costs
    // ============================================================

    pub fn cost_summary(&self, days: u32) -> Result<CostSummary> {
        check_window(days)?;
        self.db.cost_summary(days)
    }

    /// Month-to-date spend against the configured monthly budget.
    pub fn budget_status(&self) -> Result<BudgetStatus> {
        let budget = self
            .monthly_budget
            .ok_or_else(|| DocError::validation("no monthly budget configured"))?;
        let status = BudgetStatus::new(budget, self.db.month_to_date_cost()?);
        if status.alert != BudgetAlert::Ok {
            tracing::warn!(
                "Monthly spend at {:.1}% of ${:.2} budget",
                status.utilization,
                budget
            );
        }
        Ok(status)
    }
}

/// Reporting windows are whole days, at least one and at most [`MAX_WINDOW_DAYS`].
fn check_window(days: u32) -> Result<()> {
    if days == 0 {
        return Err(DocError::validation("days must be at least 1"));
    }
    if days > MAX_WINDOW_DAYS {
        return Err(DocError::validation(format!(
            "days must be at most {}",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SimulatedGenerator;

    pub(super) fn workflow(dir: &std::path::Path) -> Workflow {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let files = ReviewFiles::new(dir);
        files.ensure_dirs().unwrap();
        Workflow::new(
            db,
            files,
            Generator::Simulated(SimulatedGenerator::new("gpt-3.5-turbo")),
            Some(1.0),
        )
    }

    pub(super) fn params(doc_type: DocType) -> GenerateDocument {
        GenerateDocument {
            doc_type,
            context: "Almond Milk Homogenization Control System".to_string(),
            features: None,
            licensing_focus: true,
            source: "test".to_string(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn generate_stores_row_cost_and_review_file() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(dir.path());

        let generated = workflow.generate(params(DocType::TechnicalSpec)).await.unwrap();

        assert_eq!(generated.status, DocumentStatus::Review);
        assert_eq!(generated.provider, "simulated");
        assert!(std::path::Path::new(&generated.review_path).exists());

        let document = workflow.document(generated.document_id).unwrap();
        assert!(document.licensing_focus);
        assert_eq!(document.content, generated.content);

        let parsed = workflow.files().read(&document).unwrap();
        assert_eq!(parsed.body, document.content);

        let summary = workflow.cost_summary(1).unwrap();
        assert_eq!(summary.requests, 1);
        assert!((summary.total_cost - generated.cost).abs() < 1e-12);
    }

    #[tokio::test]
    async fn blank_context_is_rejected_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(dir.path());

        let mut blank = params(DocType::Changelog);
        blank.context = "   ".to_string();
        let err = workflow.generate(blank).await.unwrap_err();

        assert_eq!(err.kind(), "validation_error");
        assert!(workflow.list_documents(None).unwrap().is_empty());
        assert_eq!(workflow.cost_summary(30).unwrap().requests, 0);
    }

    #[test]
    fn reporting_window_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(dir.path());

        assert!(workflow.cost_summary(MAX_WINDOW_DAYS).is_ok());
        for days in [0, MAX_WINDOW_DAYS + 1, 200_000_000, u32::MAX] {
            let err = workflow.cost_summary(days).unwrap_err();
            assert_eq!(err.kind(), "validation_error", "days = {}", days);
        }
    }

    #[test]
    fn budget_status_requires_configured_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut workflow = workflow(dir.path());
        assert_eq!(workflow.budget_status().unwrap().alert, BudgetAlert::Ok);

        workflow.monthly_budget = None;
        assert_eq!(workflow.budget_status().unwrap_err().kind(), "validation_error");
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(dir.path());
        assert!(matches!(
            workflow.document(42),
            Err(DocError::NotFound { id: 42, .. })
        ));
    }
}
