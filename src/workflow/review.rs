use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{check_window, Workflow};
use crate::error::{DocError, Result};
use crate::models::{Document, DocumentStatus, ReviewCompletion, ReviewFeedback, ReviewInsights};
use crate::review_files::document_id_from_path;

/// Which document a review is for.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewTarget {
    Document(i64),
    /// A review file path; the document id is read from its name.
    File(PathBuf),
}

/// A reviewer's verdict on a document in the review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Replacement content. When absent the review file body is used.
    pub reviewed_content: Option<String>,
    pub changes_summary: String,
    pub reviewer_name: String,
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub prepare_for_licensing: bool,
}

impl Workflow {
    /// Move a document from `review` to `completed`.
    ///
    /// The review file must exist and name the same document. Of two
    /// concurrent submissions for one document exactly one succeeds; the
    /// other gets [`DocError::InvalidTransition`].
    pub fn submit_review(
        &self,
        target: ReviewTarget,
        submission: ReviewSubmission,
    ) -> Result<Document> {
        let (id, file_name) = match &target {
            ReviewTarget::Document(id) => (*id, None),
            ReviewTarget::File(path) => (document_id_from_path(path)?, Some(path)),
        };

        let document = self.document(id)?;
        if !document.status.can_advance_to(DocumentStatus::Completed) {
            return Err(DocError::InvalidTransition {
                id,
                from: document.status,
                to: DocumentStatus::Completed,
            });
        }

        if let Some(path) = file_name {
            let expected = self.files.path_for(&document);
            if !names_same_file(path, &expected) {
                return Err(DocError::review_file(
                    path.display(),
                    format!("does not match review file {}", expected.display()),
                ));
            }
        }

        let review_file = self.files.read(&document)?;
        let completion = ReviewCompletion {
            reviewed_content: submission.reviewed_content.unwrap_or(review_file.body),
            changes_summary: submission.changes_summary,
            reviewer_name: submission.reviewer_name,
            quality_score: submission.quality_score,
            prepare_for_licensing: submission.prepare_for_licensing,
        };

        let reviewed = self.db.complete_review(id, &completion)?;

        // The row is authoritative from here on; a failed rewrite only leaves
        // the old header in place.
        if let Err(e) = self.files.write_reviewed(&reviewed) {
            tracing::warn!("Review of document {} recorded but file not rewritten: {}", id, e);
        }

        tracing::info!(
            "Document {} reviewed by {} and moved to completed",
            id,
            completion.reviewer_name.trim()
        );
        Ok(reviewed)
    }

    /// What reviewers changed over the last `days` days, by document type.
    pub fn review_insights(&self, days: u32) -> Result<ReviewInsights> {
        check_window(days)?;
        let insights = self.db.review_insights(days)?;
        for recommendation in &insights.recommendations {
            tracing::info!("Review insight: {}", recommendation);
        }
        Ok(insights)
    }

    pub fn review_feedback(&self, days: u32) -> Result<Vec<ReviewFeedback>> {
        check_window(days)?;
        self.db.list_review_feedback(days)
    }
}

/// Compare file names, ignoring the `review_`/`reviewed_` prefixes callers may add.
fn names_same_file(given: &std::path::Path, expected: &std::path::Path) -> bool {
    let strip = |name: &str| -> String {
        name.strip_prefix("reviewed_")
            .or_else(|| name.strip_prefix("review_"))
            .unwrap_or(name)
            .to_string()
    };
    match (
        given.file_name().and_then(|n| n.to_str()),
        expected.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(given), Some(expected)) => strip(given) == expected,
        _ => false,
    }
}
