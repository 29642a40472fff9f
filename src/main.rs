//! Nexa IDE: backend file service and terminal front-end
//!
//! Usage:
//!   nexa-ide serve --bucket nexa                  # Provision storage, serve the REST API
//!   nexa-ide provision --bucket nexa              # Only create the bucket and folders
//!   nexa-ide shell                                # Edit files against a running server
//!   nexa-ide shell --offline                      # Edit files held in memory

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nexa_server::{HttpConfig, HttpServer, NexaServer, PathGuard, RequestLog, StorageConfig};
use nexa_services::{provision, ObjectStore, ProjectFileService, REQUIRED_FOLDERS};
use nexa_workspace::snapshot::{spawn_autosave, AUTOSAVE_INTERVAL};
use nexa_workspace::{
    AlwaysConfirm, Confirm, EditorSession, FileSlot, Flow, HttpRemote, MemoryRemote, Prompt, RemoteSync,
    SnapshotStore, Terminal,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nexa-ide", about = "Nexa IDE: project file service and editor shell")]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Write logs to a file (defaults to ~/.nexa/logs/nexa.log if no path given)
    #[arg(long, global = true, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision storage and serve the project file API
    Serve {
        #[command(flatten)]
        storage: StorageArgs,

        /// Port to listen on (0 for OS-assigned)
        #[arg(long, env = "NEXA_PORT", default_value = "5000")]
        port: u16,

        /// Hostname to bind to
        #[arg(long, default_value = "127.0.0.1")]
        hostname: String,

        /// Answer cross-origin requests (for a browser front-end on another origin)
        #[arg(long)]
        cors: bool,
    },

    /// Create the bucket and required folders, then exit
    Provision {
        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Interactive editor session in the terminal
    Shell {
        /// Base URL of the file service
        #[arg(long, env = "NEXA_SERVER_URL", default_value = "http://127.0.0.1:5000")]
        server: String,

        /// Ask the service to switch to this project on load
        #[arg(long)]
        project: Option<String>,

        /// Keep files in memory instead of talking to a server
        #[arg(long)]
        offline: bool,

        /// Answer yes to every confirmation
        #[arg(long, short = 'y')]
        yes: bool,

        /// Directory of the session snapshot (defaults to ~/.nexa)
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Ignore any saved snapshot and load the workspace from the server
        #[arg(long)]
        fresh: bool,
    },
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Bucket holding all project files
    #[arg(long, env = "BUCKET_NAME")]
    bucket: Option<String>,

    /// Store directory (path or file:// URL)
    #[arg(long, env = "NEXA_STORE_ROOT")]
    store_root: Option<String>,

    /// Store endpoint; used when --store-root is not given
    #[arg(long, env = "S3_URL", hide_env_values = true)]
    s3_url: Option<String>,

    /// User whose projects are served
    #[arg(long, env = "NEXA_USER_ID")]
    user: Option<String>,

    /// Project served until a client switches it
    #[arg(long, env = "NEXA_PROJECT_ID")]
    project: Option<String>,
}

impl StorageArgs {
    fn resolve(self) -> anyhow::Result<StorageConfig> {
        let url = self.store_root.or(self.s3_url);
        Ok(StorageConfig::resolve(self.bucket, url, self.user, self.project)?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_deref());

    let result = match cli.command {
        Command::Serve {
            storage,
            port,
            hostname,
            cors,
        } => serve(storage, HttpConfig { port, hostname, enable_cors: cors }).await,
        Command::Provision { storage } => provision_only(storage).await,
        Command::Shell {
            server,
            project,
            offline,
            yes,
            session_dir,
            fresh,
        } => {
            let opts = ShellOptions {
                session_dir,
                fresh,
                yes,
            };
            if offline {
                shell(MemoryRemote::new(), opts).await
            } else {
                let mut remote = HttpRemote::new(server);
                if let Some(project) = project {
                    remote = remote.with_project(project);
                }
                shell(remote, opts).await
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, log_file: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let Some(log_file_arg) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    };

    let log_path = if log_file_arg == "DEFAULT" {
        nexa_home().join("logs/nexa.log")
    } else {
        PathBuf::from(log_file_arg)
    };
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
            eprintln!("Logging to {}", log_path.display());
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            warn!("Failed to open log file {}: {e}; logging to stderr", log_path.display());
        }
    }
}

fn nexa_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".nexa")
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

async fn provision_storage(config: &StorageConfig) -> anyhow::Result<Arc<ObjectStore>> {
    let store = Arc::new(ObjectStore::new(&config.store_root));
    let report = provision(&store, &config.bucket, REQUIRED_FOLDERS)
        .await
        .with_context(|| format!("provisioning bucket {}", config.bucket))?;
    info!(
        "Storage ready at {} (bucket created: {}, folders created: {:?})",
        config.store_root.display(),
        report.bucket_created,
        report.folders_created
    );
    Ok(store)
}

async fn provision_only(storage: StorageArgs) -> anyhow::Result<()> {
    let config = storage.resolve()?;
    provision_storage(&config).await?;
    println!("Storage initialization completed");
    Ok(())
}

async fn serve(storage: StorageArgs, http: HttpConfig) -> anyhow::Result<()> {
    let config = storage.resolve()?;
    let store = provision_storage(&config).await?;

    let mut server = NexaServer::new();
    server.register_service(ProjectFileService::new(
        store,
        config.bucket.clone(),
        config.user_id.clone(),
        config.project_id.clone(),
    ));
    server.add_middleware(PathGuard);
    server.add_middleware(RequestLog);
    server.initialize().await?;

    let server = Arc::new(server);
    let mut transport = HttpServer::start(http.clone(), server.clone()).await?;

    println!();
    println!("  Nexa file service");
    println!("  URL:      http://{}:{}", http.hostname, transport.port());
    println!("  Project:  {}/{}", config.user_id, config.project_id);
    println!("  Store:    {} (bucket {})", config.store_root.display(), config.bucket);
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;

    println!("  Shutting down...");
    transport.stop().await;
    server.shutdown().await;
    println!("  Server stopped.");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Shell
// ─────────────────────────────────────────────────────────────────────────────

type InputLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

struct ShellOptions {
    session_dir: Option<PathBuf>,
    fresh: bool,
    yes: bool,
}

/// Asks on the terminal, reading the answer from the shared stdin reader.
struct StdinConfirm {
    input: InputLines,
}

impl Confirm for StdinConfirm {
    async fn confirm(&mut self, prompt: &Prompt) -> bool {
        print!("{} [y/N] ", prompt.message());
        let _ = std::io::stdout().flush();
        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

async fn shell<R: RemoteSync + 'static>(remote: R, opts: ShellOptions) -> anyhow::Result<()> {
    let input: InputLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    if opts.yes {
        run_shell(EditorSession::new(remote, AlwaysConfirm), input, opts).await
    } else {
        let confirm = StdinConfirm { input: input.clone() };
        run_shell(EditorSession::new(remote, confirm), input, opts).await
    }
}

async fn run_shell<R, C>(mut editor: EditorSession<R, C>, input: InputLines, opts: ShellOptions) -> anyhow::Result<()>
where
    R: RemoteSync + 'static,
    C: Confirm + 'static,
{
    let dir = opts.session_dir.unwrap_or_else(nexa_home);
    let store = Arc::new(SnapshotStore::new(FileSlot::in_dir(&dir)));
    let mut terminal = Terminal::new();

    let restored = if opts.fresh { None } else { store.restore().await };
    match restored {
        Some(snapshot) => {
            let dropped = editor.restore(snapshot);
            terminal.push(format!("Restored session ({} files)", editor.registry().len()));
            if !dropped.is_empty() {
                terminal.push(format!("Dropped missing: {}", dropped.join(", ")));
            }
        }
        None => match editor.load_workspace().await {
            Ok(count) => terminal.push(format!("Loaded {count} files")),
            Err(e) => terminal.push(format!("error: {e}")),
        },
    }
    terminal.push("Type 'help' for commands.");
    for line in terminal.lines() {
        println!("{line}");
    }

    let editor = Arc::new(Mutex::new(editor));
    let autosave = {
        let editor = editor.clone();
        spawn_autosave(store.clone(), AUTOSAVE_INTERVAL, move || {
            let editor = editor.clone();
            async move { editor.lock().await.snapshot() }
        })
    };

    let mut saved_revision = None;
    loop {
        print!("nexa> ");
        let _ = std::io::stdout().flush();
        let line = match input.lock().await.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin error: {e}");
                break;
            }
        };

        let mut editor = editor.lock().await;
        let mark = terminal.mark();
        let flow = terminal.execute(&mut *editor, &line).await;
        // The first new line echoes the command the user just typed.
        for out in terminal.since(mark).skip(1) {
            println!("{out}");
        }

        if saved_revision != Some(editor.revision()) {
            if let Err(e) = store.save(&editor.snapshot()).await {
                println!("error: {e}");
            }
            saved_revision = Some(editor.revision());
        }
        if flow == Flow::Exit {
            break;
        }
    }

    autosave.abort();
    let editor = editor.lock().await;
    store.save(&editor.snapshot()).await?;
    let unsaved = editor.registry().dirty_paths().count();
    if unsaved > 0 {
        println!("{unsaved} file(s) have unsaved changes; they are kept in the session snapshot.");
    }
    Ok(())
}
