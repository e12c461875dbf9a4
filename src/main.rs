use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rehearsal::api::{self, AppState};
use rehearsal::config::{CacheConfig, CoachConfig, GeneratorConfig};
use rehearsal::generator::{OpenAiGenerator, PersonaGenerator, ScriptedGenerator};
use rehearsal::orchestrator::Coach;
use rehearsal::scoring::RubricScorer;
use rehearsal::{seed, Database};

#[derive(Parser)]
#[command(name = "rehearsal")]
#[command(about = "Sales-conversation practice against AI customer personas")]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "REHEARSAL_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Insert the demo personas, or the cases in a JSON file
    Seed {
        /// JSON array of cases to load instead of the demo set
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List cases in training order
    Cases,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "3000")]
    port: u16,

    #[command(flatten)]
    generator: GeneratorConfig,

    #[command(flatten)]
    cache: CacheConfig,
}

/// Serve settings when no subcommand is given, still honouring env vars.
#[derive(Parser)]
struct DefaultServe {
    #[command(flatten)]
    args: ServeArgs,
}

fn open_database(path: Option<&PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            Database::open(path).with_context(|| format!("opening {}", path.display()))?
        }
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn build_generator(config: &GeneratorConfig) -> anyhow::Result<Arc<dyn PersonaGenerator>> {
    match OpenAiGenerator::from_config(config) {
        Some(generator) => {
            let generator = generator.context("building the model client")?;
            tracing::info!(
                base_url = generator.base_url(),
                model = generator.model(),
                "Using chat-completions persona generator"
            );
            Ok(Arc::new(generator))
        }
        None => {
            tracing::warn!("No LLM API key configured; using the offline scripted persona");
            Ok(Arc::new(ScriptedGenerator::new(config.scripted_closing_turn)))
        }
    }
}

async fn serve(db: Database, args: ServeArgs) -> anyhow::Result<()> {
    let ServeArgs {
        host,
        port,
        generator,
        cache,
    } = args;
    if db.count_cases()? == 0 {
        tracing::warn!("No cases in the database; run `rehearsal seed` to add the demo personas");
    }

    let coach = Coach::new(
        db,
        build_generator(&generator)?,
        Arc::new(RubricScorer),
        CoachConfig::from_generator(&generator),
    );
    let app = api::create_router(AppState::new(coach, &cache));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Rehearsal server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rehearsal=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let db = open_database(cli.db.as_ref())?;

    match cli.command {
        Some(Commands::Serve(args)) => serve(db, args).await?,
        Some(Commands::Seed { file }) => {
            let inputs = match &file {
                Some(path) => seed::load_cases_file(path)?,
                None => seed::demo_cases(),
            };
            let report = seed::seed_cases(&db, inputs)?;
            println!(
                "Seeded {} case(s), skipped {} already present",
                report.inserted, report.skipped
            );
        }
        Some(Commands::Cases) => {
            let cases = db.list_cases()?;
            if cases.is_empty() {
                println!("No cases yet. Run `rehearsal seed` first.");
            }
            for case in cases {
                println!(
                    "{:>3}  {}  {} ({})",
                    case.order_index, case.id, case.customer_name, case.meta_data.decision_level
                );
            }
        }
        None => serve(db, DefaultServe::parse_from(["rehearsal"]).args).await?,
    }

    Ok(())
}
