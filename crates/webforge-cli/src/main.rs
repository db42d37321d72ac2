//! Webforge CLI - chat-driven web page workbench

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde::Serialize;
use tracing::{debug, warn};
use webforge_core::Error;
use webforge_core::commands::{ChatMessage, FileType, MessageRole, SendOutcome};
use webforge_core::config::{Config, redact_api_key};
use webforge_core::preview::FileSurface;
use webforge_core::storage::{Database, KeyValueStore, SqliteStore};
use webforge_core::workbench::Workbench;

#[derive(Parser)]
#[command(name = "webforge")]
#[command(author, version, about = "Generate web pages by chatting with an AI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage the files of the active project
    Files {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Ask for code; starts an interactive session when no prompt is given
    Chat {
        /// Prompt to send
        prompt: Option<String>,
    },

    /// Show the chat history
    History {
        /// Remove every message
        #[arg(long)]
        clear: bool,
    },

    /// Render the preview of the active project
    Preview {
        /// Print the document instead of writing it
        #[arg(long)]
        print: bool,
    },

    /// User settings (API key, theme, font size, auto save)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List all projects
    List,
    /// Show project details (defaults to the active project)
    Show { id: Option<String> },
    /// Create a project and make it active
    Create { name: String },
    /// Make a project active
    Select { id: String },
    /// Rename a project
    Rename { id: String, name: String },
    /// Delete a project
    Delete { id: String },
}

#[derive(Subcommand)]
enum FileAction {
    /// List the files of the active project
    List,
    /// Print a file's content (defaults to the active file)
    Show { id: Option<String> },
    /// Add a file; without options the next missing type is added
    Create {
        /// html, css, javascript or typescript
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,
        /// File name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Make a file active
    Select { id: String },
    /// Replace a file's content from --content, --from or stdin
    Write {
        id: String,
        #[arg(short, long, conflicts_with = "from")]
        content: Option<String>,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Delete a file
    Delete { id: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show all settings
    Show,
    /// Change a setting
    Set { key: String, value: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "webforge_core=warn"
    } else {
        "webforge_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Projects { action } => cmd_projects(action, out).await,
        Commands::Files { action } => cmd_files(action, out).await,
        Commands::Chat { prompt } => cmd_chat(prompt, out).await,
        Commands::History { clear } => cmd_history(clear, out).await,
        Commands::Preview { print } => cmd_preview(print, out).await,
        Commands::Settings { action } => cmd_settings(action, out).await,
        Commands::Config { action } => cmd_config(action, out),
        Commands::Doctor => cmd_doctor(out).await,
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<Error>() {
        Some(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            if let Some(hint) = e.suggestion() {
                eprintln!("  Try: {}", hint);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print a status line unless quiet or emitting JSON
    fn note(&self, message: impl std::fmt::Display) {
        if !self.quiet && !self.json() {
            println!("{}", message);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_workbench() -> anyhow::Result<Workbench<SqliteStore>> {
    let config = Config::load()?;
    let db = Database::open_default().await?;
    debug!(path = %db.path().display(), "Database opened");
    Ok(Workbench::load(SqliteStore::new(db), config).await?)
}

/// Open the workbench with the on-disk preview attached
async fn open_with_preview() -> anyhow::Result<Workbench<SqliteStore>> {
    let mut workbench = open_workbench().await?;
    let dir = workbench.config().preview_dir()?;
    if let Err(e) = workbench.attach_surface(Box::new(FileSurface::new(dir))) {
        warn!(error = %e, "Preview could not be written");
    }
    Ok(workbench)
}

/// Find a project by id, then by name
fn resolve_project<S: KeyValueStore>(workbench: &Workbench<S>, key: &str) -> Result<String, Error> {
    workbench
        .projects()
        .iter()
        .find(|p| p.id == key)
        .or_else(|| workbench.projects().iter().find(|p| p.name == key))
        .map(|p| p.id.clone())
        .ok_or_else(|| Error::ProjectNotFound(key.to_string()))
}

/// Find a file of the active project by id, then by name
fn resolve_file<S: KeyValueStore>(workbench: &Workbench<S>, key: &str) -> Result<String, Error> {
    let project = workbench.active_project();
    project
        .file(key)
        .or_else(|| project.files.iter().find(|f| f.name == key))
        .map(|f| f.id.clone())
        .ok_or_else(|| Error::FileNotFound(key.to_string()))
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_projects(action: ProjectAction, out: Output) -> anyhow::Result<()> {
    match action {
        ProjectAction::List => {
            let workbench = open_workbench().await?;
            if out.json() {
                return print_json(workbench.projects());
            }
            if !out.quiet {
                println!("Projects:");
            }
            let active = &workbench.active_project().id;
            for p in workbench.projects() {
                let marker = if &p.id == active { "*" } else { " " };
                println!("{} {} - {} ({} files)", marker, p.id, p.name, p.files.len());
            }
        }
        ProjectAction::Show { id } => {
            let workbench = open_workbench().await?;
            let id = match id {
                Some(key) => resolve_project(&workbench, &key)?,
                None => workbench.active_project().id.clone(),
            };
            let Some(p) = workbench.project(&id) else {
                return Err(Error::ProjectNotFound(id).into());
            };
            if out.json() {
                return print_json(p);
            }
            println!("Project: {}", p.name);
            println!("  ID: {}", p.id);
            println!("  Files: {}", p.file_names().collect::<Vec<_>>().join(", "));
            println!("  Created: {}", p.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("  Updated: {}", p.updated_at.format("%Y-%m-%d %H:%M:%S"));
        }
        ProjectAction::Create { name } => {
            let mut workbench = open_with_preview().await?;
            let id = workbench.create_project(&name).await?;
            if out.json() {
                return print_json(workbench.active_project());
            }
            out.note(format!("Project created: {}", name.trim()));
            out.note(format!("  ID: {}", id));
        }
        ProjectAction::Select { id } => {
            let mut workbench = open_with_preview().await?;
            let id = resolve_project(&workbench, &id)?;
            workbench.select_project(&id).await?;
            out.note(format!("Active project: {}", workbench.active_project().name));
        }
        ProjectAction::Rename { id, name } => {
            let mut workbench = open_workbench().await?;
            let id = resolve_project(&workbench, &id)?;
            workbench.rename_project(&id, &name).await?;
            out.note(format!("Project '{}' renamed to '{}'.", id, name.trim()));
        }
        ProjectAction::Delete { id } => {
            let mut workbench = open_with_preview().await?;
            let id = resolve_project(&workbench, &id)?;
            let removed = workbench.delete_project(&id).await?;
            out.note(format!("Project '{}' deleted.", removed.name));
        }
    }
    Ok(())
}

async fn cmd_files(action: FileAction, out: Output) -> anyhow::Result<()> {
    match action {
        FileAction::List => {
            let workbench = open_workbench().await?;
            let project = workbench.active_project();
            if out.json() {
                return print_json(&project.files);
            }
            if !out.quiet {
                println!("Files of '{}':", project.name);
            }
            let active = workbench.active_file().map(|f| f.id.as_str());
            for f in &project.files {
                let marker = if Some(f.id.as_str()) == active { "*" } else { " " };
                println!(
                    "{} {} - {} [{}] ({} bytes)",
                    marker,
                    f.id,
                    f.name,
                    f.file_type,
                    f.content.len()
                );
            }
        }
        FileAction::Show { id } => {
            let workbench = open_workbench().await?;
            let file = match id {
                Some(key) => {
                    let id = resolve_file(&workbench, &key)?;
                    workbench.active_project().file(&id).cloned()
                }
                None => workbench.active_file().cloned(),
            };
            let Some(file) = file else {
                return Err(Error::FileNotFound("(active file)".to_string()).into());
            };
            if out.json() {
                return print_json(&file);
            }
            println!("{}", file.content);
        }
        FileAction::Create { file_type, name } => {
            let mut workbench = open_with_preview().await?;
            let file_type = match (&file_type, &name) {
                (Some(t), _) => Some(FileType::parse(t).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Unknown file type '{}'. Use html, css, javascript or typescript.",
                        t
                    ))
                })?),
                (None, Some(n)) => Some(FileType::from_file_name(n).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Cannot infer the type of '{}'. Pass --type.",
                        n
                    ))
                })?),
                (None, None) => None,
            };

            let id = match file_type {
                Some(t) => {
                    let name = name.unwrap_or_else(|| format!("new.{}", t.extension()));
                    workbench.create_file_of(t, &name).await?
                }
                None => workbench.create_file().await?,
            };

            let Some(file) = workbench.active_project().file(&id) else {
                return Err(Error::FileNotFound(id).into());
            };
            if out.json() {
                return print_json(file);
            }
            out.note(format!("File created: {} [{}]", file.name, file.file_type));
            out.note(format!("  ID: {}", file.id));
        }
        FileAction::Select { id } => {
            let mut workbench = open_workbench().await?;
            let id = resolve_file(&workbench, &id)?;
            workbench.select_file(&id).await?;
            out.note(format!("Active file: {}", id));
        }
        FileAction::Write { id, content, from } => {
            let mut workbench = open_with_preview().await?;
            let id = resolve_file(&workbench, &id)?;
            let content = match (content, from) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            workbench.update_file(&id, &content).await?;
            out.note(format!("Wrote {} bytes to {}", content.len(), id));
        }
        FileAction::Delete { id } => {
            let mut workbench = open_with_preview().await?;
            let id = resolve_file(&workbench, &id)?;
            let removed = workbench.delete_file(&id).await?;
            out.note(format!("File '{}' deleted.", removed.name));
        }
    }
    Ok(())
}

async fn cmd_chat(prompt: Option<String>, out: Output) -> anyhow::Result<()> {
    let mut workbench = open_with_preview().await?;

    if let Some(prompt) = prompt {
        return send_prompt(&mut workbench, &prompt, out).await;
    }

    if workbench.client().is_none() {
        return Err(Error::MissingApiKey.into());
    }

    out.note(format!(
        "Chatting in '{}'. Type 'exit' to leave.",
        workbench.active_project().name
    ));

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("webforge> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                if let Err(e) = editor.add_history_entry(line) {
                    debug!(error = %e, "Could not record REPL history");
                }
                if let Err(e) = send_prompt(&mut workbench, line, out).await {
                    report_error(&e);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ChatReport<'a> {
    status: &'static str,
    message: Option<&'a ChatMessage>,
    routed_to: Option<&'a str>,
}

async fn send_prompt(
    workbench: &mut Workbench<SqliteStore>,
    prompt: &str,
    out: Output,
) -> anyhow::Result<()> {
    let outcome = workbench.send_message(prompt).await?;
    let message = outcome
        .message_id()
        .and_then(|id| workbench.messages().iter().find(|m| m.id == id));

    match &outcome {
        SendOutcome::NeedsCredential => Err(Error::MissingApiKey.into()),
        SendOutcome::Completed { routed_to, .. } => {
            if out.json() {
                return print_json(&ChatReport {
                    status: "completed",
                    message,
                    routed_to: routed_to.as_deref(),
                });
            }
            if let Some(message) = message {
                println!("{}", message.content);
            }
            match routed_to
                .as_deref()
                .and_then(|id| workbench.active_project().file(id))
            {
                Some(file) => out.note(format!("-> applied to {}", file.name)),
                None => out.note("-> not applied: no matching file"),
            }
            Ok(())
        }
        SendOutcome::Failed {
            message: text,
            reopen_settings_after,
            ..
        } => {
            if out.json() {
                print_json(&ChatReport {
                    status: "failed",
                    message,
                    routed_to: None,
                })?;
            } else {
                eprintln!("{}", message.map(|m| m.content.as_str()).unwrap_or(text));
            }

            if let Some(delay) = reopen_settings_after {
                tokio::time::sleep(*delay).await;
                if !out.json() {
                    eprintln!();
                    eprintln!("Settings:");
                    for (key, value) in workbench.settings().list() {
                        eprintln!("  {} = {}", key, value);
                    }
                    eprintln!("Change the key with `webforge settings set api_key <KEY>`.");
                }
            }
            Err(anyhow::anyhow!("Generation failed"))
        }
    }
}

async fn cmd_history(clear: bool, out: Output) -> anyhow::Result<()> {
    let mut workbench = open_workbench().await?;

    if clear {
        workbench.clear_history().await;
        out.note("Chat history cleared.");
        return Ok(());
    }

    if out.json() {
        return print_json(workbench.messages());
    }
    if workbench.messages().is_empty() {
        out.note("No messages yet. Start with `webforge chat \"<prompt>\"`.");
        return Ok(());
    }
    for m in workbench.messages() {
        let who = match m.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "assistant",
        };
        println!("[{}] {}:", m.timestamp.format("%Y-%m-%d %H:%M:%S"), who);
        println!("{}", m.content);
        println!();
    }
    Ok(())
}

async fn cmd_preview(print: bool, out: Output) -> anyhow::Result<()> {
    if print {
        let workbench = open_workbench().await?;
        println!("{}", workbench.preview_document());
        return Ok(());
    }

    let mut workbench = open_workbench().await?;
    let surface = FileSurface::new(workbench.config().preview_dir()?);
    let host = surface.host_path();
    workbench.attach_surface(Box::new(surface))?;

    if out.json() {
        return print_json(&serde_json::json!({ "host": host }));
    }
    out.note("Preview written. Open this file in a browser:");
    println!("{}", host.display());
    Ok(())
}

async fn cmd_settings(action: SettingsAction, out: Output) -> anyhow::Result<()> {
    let mut workbench = open_workbench().await?;
    match action {
        SettingsAction::Show => {
            let items = workbench.settings().list();
            if out.json() {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                return print_json(&map);
            }
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        SettingsAction::Set { key, value } => {
            let mut settings = workbench.settings().clone();
            settings.set(&key, &value)?;
            let update = workbench.save_settings(settings).await?;

            let shown = if key == "api_key" {
                redact_api_key(value.trim())
            } else {
                value
            };
            out.note(format!("Set {} = {}", key, shown));
            if update.client_reinitialized {
                out.note("Generation client reinitialised.");
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, out: Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            out.note(format!("Set {} = {}", key, value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            if out.json() {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                return print_json(&map);
            }
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            out.note("Configuration reset to defaults.");
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(out: Output) -> anyhow::Result<()> {
    let quiet = out.quiet;
    if !quiet {
        println!("Webforge Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
                println!("     Model: {} at {}", config.llm.model, config.llm.base_url);
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
            None
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    match Database::open_default().await {
        Ok(db) => {
            match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: Connected");
                        println!("     Path: {}", db.path().display());
                    }
                    match db.migration_status().await {
                        Ok(status) if status.needs_migration => {
                            all_ok = false;
                            if !quiet {
                                println!(
                                    "[!!] Database: Migrations pending (v{} -> v{})",
                                    status.current_version, status.target_version
                                );
                            }
                        }
                        Ok(status) => {
                            if !quiet {
                                println!("[OK] Database: Schema v{}", status.current_version);
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            if !quiet {
                                println!("[!!] Database: Migration check failed - {:#}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Health check failed - {:#}", e);
                    }
                }
            }

            if let Some(config) = config {
                match Workbench::load(SqliteStore::new(db), config).await {
                    Ok(workbench) => {
                        if !quiet {
                            println!(
                                "     Projects: {}, messages: {}",
                                workbench.projects().len(),
                                workbench.messages().len()
                            );
                        }
                        match workbench.client() {
                            Some(client) => {
                                if !quiet {
                                    println!(
                                        "[OK] API Key: Configured ({})",
                                        client.redacted_key()
                                    );
                                }
                            }
                            None => {
                                all_ok = false;
                                if !quiet {
                                    println!("[!!] API Key: Not configured");
                                    println!(
                                        "     Run `webforge settings set api_key <KEY>` or set WEBFORGE_API_KEY"
                                    );
                                }
                            }
                        }
                        if !quiet && let Ok(dir) = workbench.config().preview_dir() {
                            println!("[--] Preview directory: {}", dir.display());
                        }
                    }
                    Err(e) => {
                        all_ok = false;
                        if !quiet {
                            println!("[!!] Stored state: Error - {}", e);
                        }
                    }
                }
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {:#}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
