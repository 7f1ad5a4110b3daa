use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod board;
mod chat;
mod commands;
mod config;
mod crud;
mod dashboard;
mod format;
mod nav;
mod notify;
mod patient;
mod refresh;
mod resource;
mod tui;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Terminal front end for the clinic management backend")]
#[command(version = env!("CLINIC_VERSION"))]
struct Cli {
    /// Backend URL (overrides env and config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session cookie sent with every request (overrides env and config)
    #[arg(long, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Ask the chat assistant one question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Print the transcript as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Show one patient with history, appointments and invoices
    Patient {
        id: String,
    },
    /// Print one page of a record list
    #[command(visible_alias = "patients")]
    List {
        /// patients, appointments, invoices or services
        #[arg(default_value = "patients")]
        resource: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Print the dashboard charts
    Dashboard,
    /// Move a task on the board
    TaskMove {
        id: String,
        /// open, in_progress or done
        status: String,
        /// Zero-based position in the destination column
        position: usize,
    },
    /// Create a record from key=value pairs
    Create {
        resource: String,
        #[arg(required = true, num_args = 1..)]
        fields: Vec<String>,
    },
    /// Delete a record after confirmation
    Delete {
        resource: String,
        id: String,
        /// Name shown in the confirmation prompt
        #[arg(long)]
        name: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Mark an invoice as paid
    Pay {
        invoice_id: String,
    },
    /// Replace a patient's medical history (doctors only)
    History {
        patient_id: String,
        #[arg(long = "diagnosis")]
        diagnoses: Vec<String>,
        #[arg(long = "medication")]
        medications: Vec<String>,
        #[arg(long = "allergy")]
        allergies: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, session_cookie, timeout_secs, role)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

fn init_tracing(interactive: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clinic=info".into());

    if interactive {
        // Log lines would corrupt the alternate screen
        let path = config::Config::cache_dir()?.join("clinic.log");
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before tracing so RUST_LOG from .env applies; a missing file is fine
    let _ = dotenvy::dotenv();
    init_tracing(cli.command.is_none())?;

    let mut config = config::Config::load()?;
    config.apply_env();
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(cookie) = cli.cookie {
        config.api.session_cookie = Some(cookie);
    }

    let Some(command) = cli.command else {
        tracing::info!("Starting TUI against {}", config.api.base_url);
        let client = commands::connect(&config)?;
        let mut app = tui::App::new(client, config.is_doctor());
        tokio::task::block_in_place(|| app.run())?;
        return Ok(());
    };

    match command {
        Commands::Config { action } => handle_config_command(action),
        Commands::Ask { question, html } => commands::ask(&config, &question.join(" "), html).await,
        Commands::Patient { id } => commands::patient(&config, &id).await,
        Commands::List {
            resource,
            search,
            status,
            page,
        } => commands::list(&config, &resource, search, status, page).await,
        Commands::Dashboard => commands::dashboard(&config).await,
        Commands::TaskMove {
            id,
            status,
            position,
        } => commands::task_move(&config, &id, &status, position).await,
        Commands::Create { resource, fields } => commands::create(&config, &resource, &fields).await,
        Commands::Delete {
            resource,
            id,
            name,
            yes,
        } => commands::delete(&config, &resource, &id, name, yes).await,
        Commands::Pay { invoice_id } => commands::pay(&config, &invoice_id).await,
        Commands::History {
            patient_id,
            diagnoses,
            medications,
            allergies,
        } => {
            let history = shared::MedicalHistory {
                diagnoses,
                medications,
                allergies,
            };
            commands::history(&config, &patient_id, &history).await
        }
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = config::Config::load().unwrap_or_default();
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = config::Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = config::Config::load()?;
            for key in config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = config::Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
