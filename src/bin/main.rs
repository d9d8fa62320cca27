//! sqlmend CLI - repair and validate model-generated SQL
//!
//! Usage:
//!   sqlmend repair <question> --sql <raw sql> [--schema <text>] [--db-name <profile>]
//!   sqlmend translate <question> [--schema <text>] [--db-name <profile>]
//!   sqlmend inspect [--schema <text>]
//!   sqlmend serve            (feature "server")
//!
//! Examples:
//!   sqlmend repair "list all customers" --sql "SELECT T1.name FROM Customers AS T1" \
//!       --schema "Customers(id, name), Orders(id, customer_id)"
//!   sqlmend inspect --schema "Patients(patient_id), Appointments(appointment_id, patient_id)"

use clap::{Parser, Subcommand};
use sqlmend::config::Settings;
use sqlmend::generator::{FixedGenerator, SqlGenerator, WorkerGenerator};
use sqlmend::pipeline::{Pipeline, Request};
use sqlmend::profile::resolve_profile;
use sqlmend::schema::Schema;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlmend")]
#[command(about = "sqlmend - Repair and validate model-generated SQL against a schema")]
#[command(version)]
struct Cli {
    /// Config file (defaults to SQLMEND_CONFIG, ./sqlmend.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the repair pipeline over SQL produced elsewhere
    Repair {
        /// The natural-language question the SQL answers
        question: String,

        /// Raw generated SQL (reads stdin when omitted)
        #[arg(long)]
        sql: Option<String>,

        #[command(flatten)]
        target: Target,
    },

    /// Generate SQL with the configured worker, then repair it
    Translate {
        /// The natural-language question
        question: String,

        #[command(flatten)]
        target: Target,
    },

    /// Print the parsed schema and the relationship profile it selects
    Inspect {
        #[command(flatten)]
        target: Target,
    },

    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve,
}

#[derive(clap::Args)]
struct Target {
    /// Schema text, e.g. "Customers(id, name), Orders(id, customer_id)"
    #[arg(short, long)]
    schema: Option<String>,

    /// Read the schema text from a file
    #[arg(long, conflicts_with = "schema")]
    schema_file: Option<PathBuf>,

    /// Relationship profile hint (RetailDB, HospitalDB)
    #[arg(short, long)]
    db_name: Option<String>,
}

impl Target {
    fn schema_text(&self) -> Result<Option<String>, String> {
        match (&self.schema, &self.schema_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => fs::read_to_string(path)
                .map(Some)
                .map_err(|e| format!("Error reading file '{}': {}", path.display(), e)),
            (None, None) => Ok(None),
        }
    }

    fn request(&self, question: String) -> Result<Request, String> {
        Ok(Request {
            question,
            schema: self.schema_text()?,
            db_name: self.db_name.clone(),
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SQLMEND_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Repair {
            question,
            sql,
            target,
        } => cmd_repair(&settings, question, sql, &target),
        Commands::Translate { question, target } => cmd_translate(&settings, question, &target),
        Commands::Inspect { target } => cmd_inspect(&settings, &target),
        #[cfg(feature = "server")]
        Commands::Serve => cmd_serve(settings),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, sqlmend::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            eprintln!("Failed to start async runtime: {}", e);
            ExitCode::FAILURE
        })
}

fn run_translation(
    rt: &tokio::runtime::Runtime,
    settings: &Settings,
    request: &Request,
    generator: &dyn SqlGenerator,
) -> ExitCode {
    let pipeline = Pipeline::from_settings(&settings.pipeline);

    match rt.block_on(pipeline.translate(request, generator)) {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_repair(settings: &Settings, question: String, sql: Option<String>, target: &Target) -> ExitCode {
    let request = match target.request(question) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let raw = match sql {
        Some(sql) => sql,
        None => match std::io::read_to_string(std::io::stdin()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    run_translation(&rt, settings, &request, &FixedGenerator::new(raw))
}

fn cmd_translate(settings: &Settings, question: String, target: &Target) -> ExitCode {
    let request = match target.request(question) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    // The worker's reader task lives on this runtime.
    let generator = match rt.block_on(WorkerGenerator::spawn_with_settings(&settings.generator)) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Generator error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    run_translation(&rt, settings, &request, &generator)
}

fn cmd_inspect(settings: &Settings, target: &Target) -> ExitCode {
    let text = match target.schema_text() {
        Ok(text) => text.unwrap_or_else(|| settings.pipeline.default_schema.clone()),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let schema = match Schema::parse(&text) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Tables ({}):", schema.tables().len());
    for table in schema.tables() {
        println!("  {}({})", table.name, table.columns.join(", "));
    }
    println!();

    match resolve_profile(target.db_name.as_deref(), &schema) {
        Some(profile) => {
            println!("Profile: {} (primary table {})", profile.name, profile.primary_table);
            for rel in profile.relationships {
                println!("  {}", rel);
            }
        }
        None => println!("Profile: none"),
    }

    ExitCode::SUCCESS
}

#[cfg(feature = "server")]
fn cmd_serve(settings: Settings) -> ExitCode {
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    match rt.block_on(sqlmend::web::serve(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
