mod notifier;
mod prompt;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use delfin::credentials::stored_api_key;
use delfin::sanitize::mask_secret;
use delfin::{
    load_config_or_default, CapturePipeline, CapturedImage, CommitOutcome, Config, Database,
    Notifier, OrderBook, PipelineConfig, PipelineError, Review, StatusFilter,
};

use notifier::TerminalNotifier;
use prompt::ConsoleDecision;

#[derive(Parser)]
#[command(name = "delfin")]
#[command(about = "Captura pedidos a partir de fotos y los guarda en local")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.delfin/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides `databasePath`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an order from a photo, review it and save it
    Capture {
        image: PathBuf,
        #[command(flatten)]
        review: ReviewArgs,
    },
    /// Review and save the built-in example order
    Example {
        #[command(flatten)]
        review: ReviewArgs,
    },
    /// List saved orders, newest first
    List {
        /// Case-insensitive text matched against number, client and reference
        #[arg(short, long, default_value = "")]
        query: String,
        /// `all`, `pendiente`, `procesando`, `completado`
        #[arg(short, long, default_value = "all")]
        status: String,
        #[arg(long)]
        json: bool,
    },
    /// Show order counters
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write every order to pedidos_<date>.json
    Export {
        /// Target directory, overrides `exportDirectory`
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Delete one order
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every order
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
    /// Inspect configuration or store the API key
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct ReviewArgs {
    /// Edit a field before saving, e.g. --set clientName="Acme S.A."
    #[arg(long = "set", value_name = "CAMPO=VALOR", value_parser = prompt::parse_edit)]
    edits: Vec<(String, String)>,

    /// Save without asking for review confirmation
    #[arg(short, long)]
    yes: bool,

    /// Replace an existing order with the same number without asking
    #[arg(long, conflicts_with = "keep")]
    replace: bool,

    /// Keep the existing order when the number is taken
    #[arg(long)]
    keep: bool,
}

impl ReviewArgs {
    fn decision(&self) -> ConsoleDecision {
        let preset = match (self.replace, self.keep) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ConsoleDecision::new(preset)
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Store the API key used for extraction
    SetKey { key: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;

    let config = load_config_or_default(cli.config.as_deref())?;
    let db_path = match cli.db.clone().or_else(|| config.database_path()) {
        Some(p) => p,
        None => bail!("No se pudo determinar la ruta de la base de datos; usa --db"),
    };
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier::from_env());

    debug!(db = %delfin::sanitize::redact_path(&db_path), "database ready");

    match cli.command {
        Commands::Capture { image, review } => {
            let pipeline = pipeline(&config, db, notifier)?;
            let image = CapturedImage::from_path(&image).await?;
            match pipeline.capture(image).await {
                Ok(candidate) => finish_review(&pipeline, candidate, &review),
                // Already reported through the notifier.
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Example { review } => {
            let pipeline = pipeline(&config, db, notifier)?;
            let candidate = pipeline.capture_example()?;
            finish_review(&pipeline, candidate, &review)
        }
        Commands::List { query, status, json } => {
            let book = OrderBook::new(db, notifier);
            let records = book.list(&query, &StatusFilter::parse(&status))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print!("{}", render::order_list(&records));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats { json } => {
            let stats = OrderBook::new(db, notifier).stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render::stats(&stats));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Export { out } => {
            let dir = out.unwrap_or_else(|| config.export_directory());
            match OrderBook::new(db, notifier).export_to(&dir) {
                Ok(path) => {
                    println!("{}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Delete { id, yes } => {
            let book = OrderBook::new(db, notifier);
            let Some(record) = book.get(id)? else {
                bail!("No existe el pedido {id}");
            };
            print!("{}", render::record_card(&record));
            if !yes && !prompt::confirm("¿Estás seguro de que quieres eliminar este pedido?")? {
                return Ok(ExitCode::SUCCESS);
            }
            book.delete(id)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear { yes } => {
            if !yes
                && !prompt::confirm(
                    "¿Estás seguro de que quieres borrar TODOS los datos? \
                     Esta acción no se puede deshacer.",
                )?
            {
                return Ok(ExitCode::SUCCESS);
            }
            let removed = OrderBook::new(db, notifier).clear()?;
            info!(removed, "database cleared");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                show_config(&config, &db, &db_path)?;
                Ok(ExitCode::SUCCESS)
            }
            ConfigAction::SetKey { key } => match OrderBook::new(db, notifier).save_api_key(&key) {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode::FAILURE),
            },
        },
    }
}

fn init_logging(json: bool) -> Result<()> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_env("DELFIN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn pipeline(
    config: &Config,
    db: Database,
    notifier: Arc<dyn Notifier>,
) -> Result<CapturePipeline, PipelineError> {
    CapturePipeline::from_config(&PipelineConfig::from_config(config), db, notifier)
}

/// Shows the candidate, applies edits, asks for confirmation and saves.
fn finish_review(
    pipeline: &CapturePipeline,
    review: Review,
    args: &ReviewArgs,
) -> Result<ExitCode> {
    let Review {
        token,
        mut candidate,
    } = review;

    if let Err(e) = prompt::apply_edits(&mut candidate, &args.edits) {
        pipeline.discard(token);
        bail!(e);
    }
    print!("{}", render::order_card(&candidate));

    if !args.yes && !prompt::confirm("¿Guardar este pedido?")? {
        pipeline.discard(token);
        println!("Captura descartada");
        return Ok(ExitCode::SUCCESS);
    }

    match pipeline.save(token, candidate, &args.decision()) {
        Ok(CommitOutcome::Inserted { id }) | Ok(CommitOutcome::Replaced { id, .. }) => {
            println!("{id}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(CommitOutcome::Rejected) => Ok(ExitCode::SUCCESS),
        Err(PipelineError::Storage(_)) => Ok(ExitCode::FAILURE),
        Err(e) => Err(e.into()),
    }
}

fn show_config(config: &Config, db: &Database, db_path: &Path) -> Result<()> {
    let mut shown = config.clone();
    shown.api_key = shown.api_key.as_deref().map(mask_secret);
    shown.database_path = Some(db_path.display().to_string());

    let stored = stored_api_key(db)?.map(|key| mask_secret(key.expose_secret()));

    let mut value = serde_json::to_value(&shown)?;
    value["storedApiKey"] = serde_json::json!(stored);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
