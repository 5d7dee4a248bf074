use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocType;

/// Reviews of one type needed before its edit rate produces a recommendation.
pub const MIN_REVIEWS_FOR_RECOMMENDATION: i64 = 3;

/// Average change ratio above which a document type's drafts count as rewritten.
pub const REWRITE_THRESHOLD: f64 = 0.5;

/// What a reviewer changed between the generated draft and the final text.
///
/// Recorded once per completed review, in the same transaction as the
/// status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewFeedback {
    pub id: i64,
    pub document_id: i64,
    pub doc_type: DocType,
    pub draft_length: i64,
    pub final_length: i64,
    pub lines_added: i64,
    pub lines_removed: i64,
    /// Share of lines touched by the edit, from 0.0 (unchanged) to 1.0 (rewritten).
    pub change_ratio: f64,
    pub quality_score: Option<f64>,
    pub changes_summary: String,
    pub created_at: DateTime<Utc>,
}

/// Line-level comparison of a draft and its reviewed text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditStats {
    /// Characters, not bytes.
    pub draft_length: i64,
    pub final_length: i64,
    pub lines_added: i64,
    pub lines_removed: i64,
    pub change_ratio: f64,
}

impl EditStats {
    /// Lines are compared as multisets, so moving a line does not count as an edit.
    pub fn between(draft: &str, reviewed: &str) -> Self {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for line in draft.lines() {
            *counts.entry(line.trim_end()).or_default() += 1;
        }

        let mut lines_added = 0;
        for line in reviewed.lines() {
            match counts.get_mut(line.trim_end()) {
                Some(n) if *n > 0 => *n -= 1,
                _ => lines_added += 1,
            }
        }
        let lines_removed: i64 = counts.values().sum();

        let total_lines = (draft.lines().count() + reviewed.lines().count()) as i64;
        let change_ratio = if total_lines == 0 {
            0.0
        } else {
            (lines_added + lines_removed) as f64 / total_lines as f64
        };

        Self {
            draft_length: draft.chars().count() as i64,
            final_length: reviewed.chars().count() as i64,
            lines_added,
            lines_removed,
            change_ratio,
        }
    }
}

/// Edit statistics for one document type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocTypeInsight {
    pub doc_type: DocType,
    pub reviews: i64,
    pub avg_change_ratio: f64,
    pub avg_quality_score: Option<f64>,
}

/// What reviewers changed over the last `period_days` days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewInsights {
    pub period_days: u32,
    pub reviews: i64,
    pub avg_change_ratio: f64,
    /// `None` when no review in the window carried a score.
    pub avg_quality_score: Option<f64>,
    pub lines_added: i64,
    pub lines_removed: i64,
    /// Most reviewed type first.
    pub by_doc_type: Vec<DocTypeInsight>,
    pub recommendations: Vec<String>,
}

impl ReviewInsights {
    pub fn new(
        period_days: u32,
        by_doc_type: Vec<DocTypeInsight>,
        avg_quality_score: Option<f64>,
        lines_added: i64,
        lines_removed: i64,
    ) -> Self {
        let reviews: i64 = by_doc_type.iter().map(|t| t.reviews).sum();
        let avg_change_ratio = if reviews > 0 {
            by_doc_type
                .iter()
                .map(|t| t.avg_change_ratio * t.reviews as f64)
                .sum::<f64>()
                / reviews as f64
        } else {
            0.0
        };
        let recommendations = recommend(&by_doc_type, lines_added, lines_removed);

        Self {
            period_days,
            reviews,
            avg_change_ratio,
            avg_quality_score,
            lines_added,
            lines_removed,
            by_doc_type,
            recommendations,
        }
    }
}

fn recommend(by_doc_type: &[DocTypeInsight], lines_added: i64, lines_removed: i64) -> Vec<String> {
    let mut recommendations: Vec<String> = by_doc_type
        .iter()
        .filter(|t| {
            t.reviews >= MIN_REVIEWS_FOR_RECOMMENDATION && t.avg_change_ratio >= REWRITE_THRESHOLD
        })
        .map(|t| {
            format!(
                "Reviewers rewrite {:.0}% of {} drafts on average; revise its prompt template",
                t.avg_change_ratio * 100.0,
                t.doc_type.title()
            )
        })
        .collect();

    if lines_removed > 2 * lines_added && lines_removed >= MIN_REVIEWS_FOR_RECOMMENDATION {
        recommendations.push(format!(
            "Reviewers removed {} lines but added {}; ask for shorter drafts",
            lines_removed, lines_added
        ));
    } else if lines_added > 2 * lines_removed && lines_added >= MIN_REVIEWS_FOR_RECOMMENDATION {
        recommendations.push(format!(
            "Reviewers added {} lines but removed {}; ask for more detail in drafts",
            lines_added, lines_removed
        ));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_text_has_zero_ratio() {
        let stats = EditStats::between("# Title\n\nBody\n", "# Title\n\nBody\n");
        assert_eq!(stats.lines_added, 0);
        assert_eq!(stats.lines_removed, 0);
        assert_eq!(stats.change_ratio, 0.0);
        assert_eq!(stats.draft_length, stats.final_length);
    }

    #[test]
    fn full_rewrite_has_ratio_one() {
        let stats = EditStats::between("a\nb\n", "c\nd\ne\n");
        assert_eq!(stats.lines_added, 3);
        assert_eq!(stats.lines_removed, 2);
        assert_eq!(stats.change_ratio, 1.0);
    }

    #[test]
    fn moved_lines_are_not_edits() {
        let stats = EditStats::between("one\ntwo\nthree", "three\none\ntwo\nfour");
        assert_eq!(stats.lines_added, 1);
        assert_eq!(stats.lines_removed, 0);
        assert!((stats.change_ratio - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn lengths_count_characters() {
        let stats = EditStats::between("héllo", "");
        assert_eq!(stats.draft_length, 5);
        assert_eq!(stats.final_length, 0);
        assert_eq!(stats.lines_removed, 1);
    }

    fn insight(doc_type: DocType, reviews: i64, ratio: f64) -> DocTypeInsight {
        DocTypeInsight {
            doc_type,
            reviews,
            avg_change_ratio: ratio,
            avg_quality_score: None,
        }
    }

    #[test]
    fn averages_are_weighted_by_review_count() {
        let insights = ReviewInsights::new(
            7,
            vec![
                insight(DocType::ApiDoc, 3, 0.2),
                insight(DocType::Changelog, 1, 0.6),
            ],
            Some(0.8),
            0,
            0,
        );
        assert_eq!(insights.reviews, 4);
        assert!((insights.avg_change_ratio - 0.3).abs() < 1e-12);
    }

    #[test]
    fn heavily_rewritten_types_get_a_recommendation() {
        let insights = ReviewInsights::new(
            7,
            vec![
                insight(DocType::TechnicalSpec, 3, 0.75),
                insight(DocType::ApiDoc, 2, 0.9),
            ],
            None,
            10,
            10,
        );
        assert_eq!(insights.recommendations.len(), 1);
        assert!(insights.recommendations[0].contains("Technical Spec"));
    }

    #[test]
    fn removal_heavy_edits_suggest_shorter_drafts() {
        let insights = ReviewInsights::new(7, vec![insight(DocType::ApiDoc, 1, 0.1)], None, 1, 9);
        assert_eq!(insights.recommendations.len(), 1);
        assert!(insights.recommendations[0].contains("shorter"));
    }

    #[test]
    fn empty_window_has_no_recommendations() {
        let insights = ReviewInsights::new(30, Vec::new(), None, 0, 0);
        assert_eq!(insights.reviews, 0);
        assert_eq!(insights.avg_change_ratio, 0.0);
        assert!(insights.recommendations.is_empty());
    }
}
