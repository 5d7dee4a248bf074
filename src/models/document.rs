use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DocError;

/// A generated piece of documentation tracked through the review lifecycle.
///
/// The database row is the authoritative record. The markdown file a human
/// edits lives at a path derived from the row (see [`Document::review_file_name`]),
/// so the two can never be renamed independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub doc_type: DocType,
    /// Current text. Replaced once, when the review is submitted.
    pub content: String,
    /// Text as it came back from the generator.
    pub draft_content: String,
    pub status: DocumentStatus,
    pub licensing_focus: bool,
    /// Free-text tag naming who or what asked for the document (e.g. `api`, `git_monitor`).
    pub source: String,
    pub reviewer_name: Option<String>,
    /// Reviewer's quality rating in `0.0..=1.0`.
    pub quality_score: Option<f64>,
    pub changes_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub licensed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// File name of the human-editable copy: `{doc_type}_{id}_{YYYYMMDD_HHMMSS}.md`.
    pub fn review_file_name(&self) -> String {
        format!(
            "{}_{}_{}.md",
            self.doc_type.as_str(),
            self.id,
            self.created_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// The kind of document the generator was asked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    TechnicalSpec,
    ApiDoc,
    Changelog,
    Installation,
    ProjectSnapshot,
}

impl DocType {
    pub const ALL: [DocType; 5] = [
        Self::TechnicalSpec,
        Self::ApiDoc,
        Self::Changelog,
        Self::Installation,
        Self::ProjectSnapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalSpec => "technical_spec",
            Self::ApiDoc => "api_doc",
            Self::Changelog => "changelog",
            Self::Installation => "installation",
            Self::ProjectSnapshot => "project_snapshot",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "technical_spec" => Some(Self::TechnicalSpec),
            "api_doc" => Some(Self::ApiDoc),
            "changelog" => Some(Self::Changelog),
            "installation" => Some(Self::Installation),
            "project_snapshot" => Some(Self::ProjectSnapshot),
            _ => None,
        }
    }

    /// Human title, e.g. `Technical Spec`.
    pub fn title(&self) -> &'static str {
        match self {
            Self::TechnicalSpec => "Technical Spec",
            Self::ApiDoc => "API Documentation",
            Self::Changelog => "Changelog",
            Self::Installation => "Installation Guide",
            Self::ProjectSnapshot => "Project Snapshot",
        }
    }
}

/// Review lifecycle of a document.
///
/// - `Review`: generated, awaiting a human edit
/// - `Completed`: reviewer submitted final content
/// - `Licensed`: included in a licensing package
///
/// Status only ever moves forward, one step at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Review,
    Completed,
    Licensed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Licensed => "licensed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "review" => Some(Self::Review),
            "completed" => Some(Self::Completed),
            "licensed" => Some(Self::Licensed),
            _ => None,
        }
    }

    /// The only status this one may advance to.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Review => Some(Self::Completed),
            Self::Completed => Some(Self::Licensed),
            Self::Licensed => None,
        }
    }

    pub fn can_advance_to(&self, target: DocumentStatus) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for inserting a document. Status always starts at `Review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentInput {
    pub doc_type: DocType,
    pub content: String,
    #[serde(default)]
    pub licensing_focus: bool,
    pub source: String,
}

/// The fields a reviewer sets when moving a document from `Review` to `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCompletion {
    pub reviewed_content: String,
    pub changes_summary: String,
    pub reviewer_name: String,
    pub quality_score: Option<f64>,
    /// Flag the document for licensing even if it was generated without the focus.
    #[serde(default)]
    pub prepare_for_licensing: bool,
}

impl ReviewCompletion {
    /// Required-field checks applied before any state change.
    pub fn validate(&self) -> Result<(), DocError> {
        if self.reviewed_content.trim().is_empty() {
            return Err(DocError::validation("reviewed_content must not be empty"));
        }
        if self.changes_summary.trim().is_empty() {
            return Err(DocError::validation("changes_summary must not be empty"));
        }
        if self.reviewer_name.trim().is_empty() {
            return Err(DocError::validation("reviewer_name must not be empty"));
        }
        if let Some(score) = self.quality_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(DocError::validation(format!(
                    "quality_score must be between 0.0 and 1.0, got {}",
                    score
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn review_file_name_encodes_type_id_and_timestamp() {
        let doc = Document {
            id: 42,
            doc_type: DocType::ApiDoc,
            content: String::new(),
            draft_content: String::new(),
            status: DocumentStatus::Review,
            licensing_focus: false,
            source: "api".to_string(),
            reviewer_name: None,
            quality_score: None,
            changes_summary: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            reviewed_at: None,
            licensed_at: None,
        };

        assert_eq!(doc.review_file_name(), "api_doc_42_20240309_140507.md");
    }

    #[test]
    fn status_only_advances_one_step() {
        assert!(DocumentStatus::Review.can_advance_to(DocumentStatus::Completed));
        assert!(DocumentStatus::Completed.can_advance_to(DocumentStatus::Licensed));
        assert!(!DocumentStatus::Review.can_advance_to(DocumentStatus::Licensed));
        assert!(!DocumentStatus::Completed.can_advance_to(DocumentStatus::Review));
        assert!(!DocumentStatus::Licensed.can_advance_to(DocumentStatus::Completed));
        assert_eq!(DocumentStatus::Licensed.next(), None);
    }

    #[test]
    fn doc_type_round_trips_through_str() {
        for doc_type in DocType::ALL {
            assert_eq!(DocType::from_str(doc_type.as_str()), Some(doc_type));
        }
        assert_eq!(DocType::from_str("user_manual"), None);
    }

    fn completion() -> ReviewCompletion {
        ReviewCompletion {
            reviewed_content: "# Final".to_string(),
            changes_summary: "Tightened wording".to_string(),
            reviewer_name: "Dana".to_string(),
            quality_score: Some(0.9),
            prepare_for_licensing: false,
        }
    }

    #[test]
    fn completion_requires_reviewer_and_summary() {
        assert!(completion().validate().is_ok());

        let mut missing_reviewer = completion();
        missing_reviewer.reviewer_name = "  ".to_string();
        assert!(matches!(
            missing_reviewer.validate(),
            Err(DocError::Validation(_))
        ));

        let mut missing_summary = completion();
        missing_summary.changes_summary.clear();
        assert!(matches!(missing_summary.validate(), Err(DocError::Validation(_))));
    }

    #[test]
    fn completion_rejects_out_of_range_quality() {
        let mut c = completion();
        c.quality_score = Some(1.5);
        assert!(matches!(c.validate(), Err(DocError::Validation(_))));

        c.quality_score = Some(0.0);
        assert!(c.validate().is_ok());
    }
}
