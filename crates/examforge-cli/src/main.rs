//! examforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "examforge", version, about = "Exam composition from a question bank")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and an example question bank
    Init,

    /// Show how quotas would be allocated, without drawing questions
    Plan {
        /// Automatic exam request (.toml)
        #[arg(long)]
        request: PathBuf,
    },

    /// Generate an exam from type and difficulty quotas
    Generate {
        /// Automatic exam request (.toml)
        #[arg(long)]
        request: PathBuf,

        /// Persist the generated exam instead of only previewing it
        #[arg(long)]
        commit: bool,

        /// Seed for reproducible draws and ordering
        #[arg(long)]
        seed: Option<u64>,

        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an exam from an explicit question list
    Create {
        /// Manual exam request (.toml)
        #[arg(long)]
        request: PathBuf,
    },

    /// Update an exam, optionally replacing its questions
    Update {
        /// Exam id
        #[arg(long)]
        id: Uuid,

        /// Update file (.toml)
        #[arg(long)]
        patch: PathBuf,
    },

    /// Delete an exam
    Delete {
        /// Exam id
        #[arg(long)]
        id: Uuid,
    },

    /// Show an exam with its questions
    Show {
        /// Exam id
        #[arg(long)]
        id: Uuid,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored exams
    List {
        /// Filter by subject
        #[arg(long)]
        subject: Option<String>,

        /// Filter by status (draft, pending-review, validated, rejected, archived)
        #[arg(long)]
        status: Option<String>,

        /// Filter by difficulty (easy, medium, hard)
        #[arg(long)]
        difficulty: Option<String>,

        /// Filter by author
        #[arg(long)]
        author: Option<String>,

        /// Case-insensitive title search
        #[arg(long)]
        title: Option<String>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Exams per page (defaults to the configured page size)
        #[arg(long)]
        per_page: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Plan { request } => commands::plan::execute(request, config),
        Commands::Generate {
            request,
            commit,
            seed,
            json,
        } => commands::generate::execute(request, commit, seed, json, config).await,
        Commands::Create { request } => commands::create::execute(request, config).await,
        Commands::Update { id, patch } => commands::update::execute(id, patch, config).await,
        Commands::Delete { id } => commands::delete::execute(id, config).await,
        Commands::Show { id, json } => commands::show::execute(id, json, config).await,
        Commands::List {
            subject,
            status,
            difficulty,
            author,
            title,
            page,
            per_page,
        } => {
            let filter = commands::list::ListFilter {
                subject,
                status,
                difficulty,
                author,
                title,
            };
            commands::list::execute(filter, page, per_page, config).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
