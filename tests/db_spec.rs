use chrono::{Duration, TimeZone, Utc};
use documenter::db::{Database, GenerationCost};
use documenter::error::DocError;
use documenter::models::*;
use speculate2::speculate;

fn create_test_document(db: &Database, doc_type: DocType) -> Document {
    db.create_document(CreateDocumentInput {
        doc_type,
        content: "# Draft\n\nGenerated text.".to_string(),
        licensing_focus: false,
        source: "test".to_string(),
    })
    .expect("Failed to create document")
}

fn completion(content: &str) -> ReviewCompletion {
    ReviewCompletion {
        reviewed_content: content.to_string(),
        changes_summary: "Clarified requirements".to_string(),
        reviewer_name: "Reviewer".to_string(),
        quality_score: Some(0.8),
        prepare_for_licensing: false,
    }
}

fn complete(db: &Database, doc_type: DocType) -> Document {
    let document = create_test_document(db, doc_type);
    db.complete_review(document.id, &completion("# Final"))
        .expect("Failed to complete review")
}

fn package_input(manifest: Option<Vec<i64>>) -> CreatePackageInput {
    CreatePackageInput {
        product_name: "X".to_string(),
        version: "1.0".to_string(),
        manifest,
    }
}

fn cost(tokens: i64, amount: f64) -> RecordCostInput {
    RecordCostInput {
        document_id: None,
        provider: "openai".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        tokens,
        cost: amount,
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "documents" {
        describe "create_document" {
            it "starts every document in review" {
                let document = create_test_document(&db, DocType::TechnicalSpec);

                assert_eq!(document.status, DocumentStatus::Review);
                assert!(document.reviewed_at.is_none());
                assert!(document.licensed_at.is_none());
                assert_eq!(document.draft_content, document.content);
            }

            it "assigns increasing ids" {
                let first = create_test_document(&db, DocType::ApiDoc);
                let second = create_test_document(&db, DocType::ApiDoc);
                assert!(second.id > first.id);
            }

            it "rejects empty content" {
                let result = db.create_document(CreateDocumentInput {
                    doc_type: DocType::Changelog,
                    content: "  ".to_string(),
                    licensing_focus: false,
                    source: "test".to_string(),
                });
                assert!(matches!(result, Err(DocError::Validation(_))));
            }
        }

        describe "get_document" {
            it "returns None for an unknown id" {
                assert!(db.get_document(999).expect("Query failed").is_none());
            }

            it "round-trips every field" {
                let created = create_test_document(&db, DocType::Installation);
                let found = db.get_document(created.id).expect("Query failed");
                assert_eq!(found, Some(created));
            }
        }

        describe "list_documents" {
            it "filters by status in creation order" {
                let a = create_test_document(&db, DocType::TechnicalSpec);
                let b = complete(&db, DocType::ApiDoc);
                let c = create_test_document(&db, DocType::Changelog);

                let queue: Vec<i64> = db.review_queue().expect("Query failed").iter().map(|d| d.id).collect();
                assert_eq!(queue, vec![a.id, c.id]);

                let completed = db.list_documents(Some(DocumentStatus::Completed)).expect("Query failed");
                assert_eq!(completed.len(), 1);
                assert_eq!(completed[0].id, b.id);

                assert_eq!(db.list_documents(None).expect("Query failed").len(), 3);
            }
        }
    }

    describe "reviews" {
        it "moves a document to completed with the reviewed content" {
            let document = create_test_document(&db, DocType::TechnicalSpec);

            let reviewed = db.complete_review(document.id, &completion("# Reviewed\n")).expect("Review failed");

            assert_eq!(reviewed.status, DocumentStatus::Completed);
            assert_eq!(reviewed.content, "# Reviewed\n");
            assert_eq!(reviewed.draft_content, document.content);
            assert_eq!(reviewed.quality_score, Some(0.8));
            assert!(reviewed.reviewed_at.is_some());
        }

        it "sets licensing focus when asked" {
            let document = create_test_document(&db, DocType::TechnicalSpec);
            let mut input = completion("# Reviewed");
            input.prepare_for_licensing = true;

            let reviewed = db.complete_review(document.id, &input).expect("Review failed");
            assert!(reviewed.licensing_focus);
        }

        it "refuses to review a completed document and leaves it unchanged" {
            let document = complete(&db, DocType::ApiDoc);

            let err = db.complete_review(document.id, &completion("again")).unwrap_err();

            assert!(matches!(err, DocError::InvalidTransition { from: DocumentStatus::Completed, .. }));
            assert_eq!(db.get_document(document.id).unwrap(), Some(document));
        }

        it "reports unknown documents as not found" {
            let err = db.complete_review(41, &completion("x")).unwrap_err();
            assert!(matches!(err, DocError::NotFound { id: 41, .. }));
        }

        it "rejects out-of-range quality scores before touching the row" {
            let document = create_test_document(&db, DocType::Changelog);
            let mut input = completion("x");
            input.quality_score = Some(1.5);

            assert!(matches!(db.complete_review(document.id, &input), Err(DocError::Validation(_))));
            assert_eq!(db.get_document(document.id).unwrap().unwrap().status, DocumentStatus::Review);
        }

        it "lets exactly one of two concurrent reviews win" {
            let document = create_test_document(&db, DocType::TechnicalSpec);

            let results: Vec<_> = std::thread::scope(|scope| {
                let handles: Vec<_> = ["first", "second"]
                    .into_iter()
                    .map(|content| {
                        let db = db.clone();
                        let id = document.id;
                        scope.spawn(move || db.complete_review(id, &completion(content)))
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let wins = results.iter().filter(|r| r.is_ok()).count();
            let conflicts = results
                .iter()
                .filter(|r| matches!(r, Err(DocError::InvalidTransition { .. })))
                .count();
            assert_eq!(wins, 1);
            assert_eq!(conflicts, 1);
        }
    }

    describe "review feedback" {
        it "records what the reviewer changed with the review" {
            let document = create_test_document(&db, DocType::ApiDoc);

            db.complete_review(document.id, &completion("# Draft\n\nRewritten text.")).expect("Review failed");

            let feedback = db.list_review_feedback(1).expect("Query failed");
            assert_eq!(feedback.len(), 1);
            let entry = &feedback[0];
            assert_eq!(entry.document_id, document.id);
            assert_eq!(entry.doc_type, DocType::ApiDoc);
            assert_eq!(entry.draft_length, document.content.chars().count() as i64);
            assert_eq!(entry.lines_added, 1);
            assert_eq!(entry.lines_removed, 1);
            assert!((entry.change_ratio - 2.0 / 6.0).abs() < 1e-12);
            assert_eq!(entry.quality_score, Some(0.8));
            assert_eq!(entry.changes_summary, "Clarified requirements");
        }

        it "records nothing when the review is refused" {
            let document = complete(&db, DocType::Changelog);

            db.complete_review(document.id, &completion("again")).unwrap_err();
            db.complete_review(404, &completion("missing")).unwrap_err();

            assert_eq!(db.list_review_feedback(1).unwrap().len(), 1);
        }

        it "summarizes feedback by document type" {
            for _ in 0..3 {
                let document = create_test_document(&db, DocType::TechnicalSpec);
                db.complete_review(document.id, &completion("Nothing like the draft")).unwrap();
            }
            let kept = create_test_document(&db, DocType::Installation);
            db.complete_review(kept.id, &completion(&kept.content)).unwrap();

            let insights = db.review_insights(7).expect("Insights failed");

            assert_eq!(insights.reviews, 4);
            assert_eq!(insights.by_doc_type[0].doc_type, DocType::TechnicalSpec);
            assert_eq!(insights.by_doc_type[0].reviews, 3);
            assert!((insights.by_doc_type[0].avg_change_ratio - 1.0).abs() < 1e-12);
            assert_eq!(insights.by_doc_type[1].avg_change_ratio, 0.0);
            assert!((insights.avg_change_ratio - 0.75).abs() < 1e-12);
            assert!(insights.recommendations.iter().any(|r| r.contains("Technical Spec")));
        }

        it "reports an empty window" {
            let insights = db.review_insights(30).unwrap();
            assert_eq!(insights.reviews, 0);
            assert_eq!(insights.avg_quality_score, None);
            assert!(insights.by_doc_type.is_empty());
        }
    }

    describe "generation" {
        it "stores the document and its cost together" {
            let (document, record) = db.insert_generated(
                CreateDocumentInput {
                    doc_type: DocType::ProjectSnapshot,
                    content: "# Snapshot".to_string(),
                    licensing_focus: false,
                    source: "api".to_string(),
                },
                GenerationCost {
                    provider: "openai".to_string(),
                    model: "gpt-4".to_string(),
                    tokens: 1000,
                    cost: 0.03,
                },
                |_, _| Ok(()),
            ).expect("Insert failed");

            assert_eq!(record.document_id, Some(document.id));
            assert_eq!(record.created_at, document.created_at);
            assert!((db.total_cost_since(1).unwrap() - 0.03).abs() < 1e-12);
        }

        it "keeps neither row when persisting fails" {
            let result = db.insert_generated(
                CreateDocumentInput {
                    doc_type: DocType::ApiDoc,
                    content: "# Api".to_string(),
                    licensing_focus: false,
                    source: "api".to_string(),
                },
                GenerationCost {
                    provider: "openai".to_string(),
                    model: "gpt-4".to_string(),
                    tokens: 10,
                    cost: 0.01,
                },
                |_, _| Err(DocError::review_file("review/x.md", "disk full")),
            );

            assert!(matches!(result, Err(DocError::ReviewFile { .. })));
            assert!(db.list_documents(None).unwrap().is_empty());
            assert_eq!(db.cost_summary(30).unwrap().requests, 0);
        }
    }

    describe "licensing packages" {
        it "licenses every completed document" {
            let a = complete(&db, DocType::TechnicalSpec);
            let b = complete(&db, DocType::ApiDoc);
            let pending = create_test_document(&db, DocType::Changelog);

            let package = db.create_package(package_input(None)).expect("Package failed");

            assert_eq!(package.document_ids, vec![a.id, b.id]);
            assert!(package.artifact_path.is_none());
            for id in [a.id, b.id] {
                let document = db.get_document(id).unwrap().unwrap();
                assert_eq!(document.status, DocumentStatus::Licensed);
                assert_eq!(document.licensed_at, Some(package.created_at));
            }
            assert_eq!(db.get_document(pending.id).unwrap().unwrap().status, DocumentStatus::Review);
        }

        it "fails with an empty selection when nothing new is completed" {
            complete(&db, DocType::Installation);

            db.create_package(package_input(None)).expect("First package failed");
            let err = db.create_package(package_input(None)).unwrap_err();

            assert!(matches!(err, DocError::EmptySelection));
            assert_eq!(db.list_packages().unwrap().len(), 1);
        }

        it "orders documents by the caller manifest" {
            let a = complete(&db, DocType::TechnicalSpec);
            let b = complete(&db, DocType::ApiDoc);
            let c = complete(&db, DocType::Changelog);

            let package = db.create_package(package_input(Some(vec![c.id, a.id]))).expect("Package failed");

            assert_eq!(package.document_ids, vec![c.id, a.id, b.id]);
            assert_eq!(db.get_package(package.id).unwrap(), Some(package));
        }

        it "rejects manifest ids that are not completed" {
            let a = complete(&db, DocType::TechnicalSpec);
            let pending = create_test_document(&db, DocType::ApiDoc);

            let err = db.create_package(package_input(Some(vec![pending.id]))).unwrap_err();

            assert!(matches!(err, DocError::Validation(_)));
            assert_eq!(db.get_document(a.id).unwrap().unwrap().status, DocumentStatus::Completed);
        }

        it "rolls back when the artifact cannot be written" {
            let a = complete(&db, DocType::TechnicalSpec);

            let result = db.create_package_with(package_input(None), |_, _| {
                Err(DocError::StorageUnavailable("disk full".to_string()))
            });

            assert!(result.is_err());
            assert_eq!(db.get_document(a.id).unwrap().unwrap().status, DocumentStatus::Completed);
            assert!(db.list_packages().unwrap().is_empty());
        }

        it "rejects a blank product name" {
            complete(&db, DocType::TechnicalSpec);
            let mut input = package_input(None);
            input.product_name = " ".to_string();
            assert!(matches!(db.create_package(input), Err(DocError::Validation(_))));
        }
    }

    describe "cost ledger" {
        it "sums exactly the records inside a window" {
            let base = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
            db.record_cost_at(cost(100, 0.25), base - Duration::hours(1)).unwrap();
            db.record_cost_at(cost(200, 0.5), base).unwrap();
            db.record_cost_at(cost(300, 0.125), base + Duration::hours(5)).unwrap();
            db.record_cost_at(cost(400, 1.0), base + Duration::days(1)).unwrap();

            let from = base;
            let to = base + Duration::days(1);
            let in_window = db.list_costs_between(from, to).unwrap();
            let expected: f64 = in_window.iter().map(|r| r.cost).sum();

            assert_eq!(in_window.len(), 2);
            assert!((db.total_cost_between(from, to).unwrap() - expected).abs() < 1e-12);
            assert!((expected - 0.625).abs() < 1e-12);
        }

        it "summarizes recent spend by day" {
            db.record_cost(cost(800, 0.0016)).unwrap();
            db.record_cost(cost(1200, 0.0024)).unwrap();
            db.record_cost_at(cost(5000, 9.0), Utc::now() - Duration::days(60)).unwrap();

            let summary = db.cost_summary(30).unwrap();

            assert_eq!(summary.requests, 2);
            assert_eq!(summary.total_tokens, 2000);
            assert!((summary.total_cost - 0.004).abs() < 1e-12);
            assert!((summary.avg_cost_per_document - 0.002).abs() < 1e-12);
            assert_eq!(summary.daily_breakdown.iter().map(|d| d.requests).sum::<i64>(), 2);
        }

        it "reports an unrepresentable window as a validation error" {
            db.record_cost(cost(800, 0.0016)).unwrap();

            assert!(matches!(db.cost_summary(u32::MAX), Err(DocError::Validation(_))));
            assert!(matches!(db.total_cost_since(200_000_000), Err(DocError::Validation(_))));
            assert_eq!(db.cost_summary(36_500).unwrap().requests, 1);
        }

        it "rejects negative costs" {
            assert!(matches!(db.record_cost(cost(10, -1.0)), Err(DocError::Validation(_))));
            assert!(matches!(db.record_cost(cost(-5, 1.0)), Err(DocError::Validation(_))));
        }
    }
}
