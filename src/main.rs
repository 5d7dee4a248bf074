use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use documenter::api::{self, CreatePackageRequest, GenerateRequest, SubmitReviewRequest};
use documenter::client::DocumenterClient;
use documenter::config::{Config, DEFAULT_PORT};
use documenter::models::DocType;
use documenter::workflow::Workflow;

#[derive(Parser)]
#[command(name = "docr")]
#[command(about = "Generate, review, and license product documentation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQLite database path (overrides DOCUMENTER_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory for review files and licensing bundles (overrides DOCUMENTER_DOCS_DIR)
        #[arg(long)]
        docs_dir: Option<PathBuf>,
    },
    /// Check server status
    Status,
    /// Generate a document and place it in the review queue
    Generate {
        /// What the document is about
        context: String,

        #[arg(short = 't', long, default_value = "technical_spec")]
        doc_type: String,

        /// Key features, one per line
        #[arg(short, long)]
        features: Option<String>,

        #[arg(long)]
        licensing_focus: bool,
    },
    /// List documents waiting for review
    Queue,
    /// Submit a review from an edited review file
    Submit {
        /// Review file path
        filepath: PathBuf,

        #[arg(short, long)]
        summary: String,

        #[arg(short, long)]
        reviewer: String,

        /// Quality between 0.0 and 1.0
        #[arg(short, long)]
        quality: Option<f64>,

        #[arg(long)]
        prepare_for_licensing: bool,
    },
    /// Bundle every completed document into a licensing package
    Package {
        product_name: String,
        version: String,
    },
    /// Show spend over recent days
    Costs {
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Show what reviewers changed in recent drafts
    Insights {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "documenter=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, db: Option<PathBuf>, docs_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(db) = db {
        config.db_path = db;
    }
    if let Some(docs_dir) = docs_dir {
        config.docs_dir = docs_dir;
    }

    tracing::info!("Database at {}", config.db_path.display());
    tracing::info!("Documents under {}", config.docs_dir.display());

    let workflow = Workflow::open(&config)?;
    let app = api::create_router_with_security(workflow, config.security.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Documenter listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let client = DocumenterClient::from_env();

    match cli.command {
        Some(Commands::Serve {
            port,
            db,
            docs_dir,
        }) => serve(port, db, docs_dir).await?,
        None => serve(DEFAULT_PORT, None, None).await?,
        Some(Commands::Status) => match client.health().await {
            Ok(health) => {
                println!("Server at {} is up", client.base_url());
                print_json(&health)?;
            }
            Err(e) => {
                println!("Server at {} is not reachable: {}", client.base_url(), e);
                std::process::exit(1);
            }
        },
        Some(Commands::Generate {
            context,
            doc_type,
            features,
            licensing_focus,
        }) => {
            let doc_type = DocType::from_str(&doc_type)
                .ok_or_else(|| anyhow::anyhow!("Unknown document type: {}", doc_type))?;
            let generated = client
                .generate(&GenerateRequest {
                    context,
                    doc_type,
                    licensing_focus,
                    source: "cli".to_string(),
                    features,
                    timeout_secs: None,
                })
                .await?;
            println!(
                "Document {} ready for review at {} ({} tokens, ${:.4})",
                generated.document_id, generated.review_path, generated.tokens, generated.cost
            );
        }
        Some(Commands::Queue) => {
            let queue = client.review_queue().await?;
            if queue.is_empty() {
                println!("Review queue is empty");
            }
            for document in queue {
                println!(
                    "{:>5}  {:<16}  {}  {}",
                    document.id,
                    document.doc_type.as_str(),
                    document.created_at.format("%Y-%m-%d %H:%M"),
                    document.review_file_name()
                );
            }
        }
        Some(Commands::Submit {
            filepath,
            summary,
            reviewer,
            quality,
            prepare_for_licensing,
        }) => {
            let document = client
                .submit_review(&SubmitReviewRequest {
                    document_id: None,
                    filepath: Some(filepath.display().to_string()),
                    reviewed_content: None,
                    changes_summary: summary,
                    reviewer_name: reviewer,
                    quality_score: quality,
                    prepare_for_licensing,
                })
                .await?;
            println!("Document {} is now {}", document.id, document.status);
        }
        Some(Commands::Package {
            product_name,
            version,
        }) => {
            let package = client
                .create_package(&CreatePackageRequest {
                    product_name,
                    version,
                    manifest: None,
                })
                .await?;
            println!(
                "Package {} created with {} documents",
                package.id,
                package.document_ids.len()
            );
            if let Some(path) = package.artifact_path {
                println!("Bundle written to {}", path);
            }
        }
        Some(Commands::Costs { days }) => {
            print_json(&client.costs(days).await?)?;
        }
        Some(Commands::Insights { days }) => {
            let insights = client.review_insights(days).await?;
            for recommendation in &insights.recommendations {
                println!("- {}", recommendation);
            }
            print_json(&insights)?;
        }
    }

    Ok(())
}
