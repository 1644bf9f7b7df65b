//! Sandpool CLI
//!
//! Command-line interface for running code in sandboxes and managing configuration.

use clap::{Parser, Subcommand};
use console::style;
use sandpool::config::{
    config_path, load_config_with, read_config_snapshot, save_config,
    validate_config, Config,
};
use sandpool::sandbox::SandboxManager;
use sandpool::{Error, ExecutionBridge, ExecutionKind, Result, SandboxType, VERSION};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sandpool",
    author = "Sandpool Contributors",
    version = VERSION,
    about = "Sandpool - per-type container sandboxes with an execution bridge",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $SANDPOOL_CONFIG or the user config dir)
    #[arg(long, global = true, env = "SANDPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Python code in a sandbox's IPython kernel
    Run {
        /// Sandbox type (base, python, node, java, browser, filesystem)
        sandbox_type: String,
        /// Code to execute
        code: String,
        /// Leave the sandbox running afterwards
        #[arg(long)]
        keep: bool,
    },

    /// Run a shell command in a sandbox
    Shell {
        /// Sandbox type (base, python, node, java, browser, filesystem)
        sandbox_type: String,
        /// Command to execute
        command: String,
        /// Leave the sandbox running afterwards
        #[arg(long)]
        keep: bool,
    },

    /// Interactive loop against one sandbox
    Repl {
        /// Sandbox type
        sandbox_type: String,
        /// Send lines as shell commands instead of IPython cells
        #[arg(long)]
        shell: bool,
    },

    /// Show the image each sandbox type resolves to
    Images,

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check the configuration for errors and warnings
    Validate,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config_file = cli.config.clone();

    match cli.command {
        Commands::Run {
            sandbox_type,
            code,
            keep,
        } => {
            let config = load(config_file.as_deref())?;
            let status =
                run_once(config, &sandbox_type, ExecutionKind::IpythonCell, &code, keep).await?;
            exit_with(status);
            Ok(())
        }
        Commands::Shell {
            sandbox_type,
            command,
            keep,
        } => {
            let config = load(config_file.as_deref())?;
            let status =
                run_once(config, &sandbox_type, ExecutionKind::ShellCommand, &command, keep).await?;
            exit_with(status);
            Ok(())
        }
        Commands::Repl {
            sandbox_type,
            shell,
        } => {
            let config = load(config_file.as_deref())?;
            let kind = if shell {
                ExecutionKind::ShellCommand
            } else {
                ExecutionKind::IpythonCell
            };
            repl(config, &sandbox_type, kind).await
        }
        Commands::Images => {
            let config = load(config_file.as_deref())?;
            show_images(&config);
            Ok(())
        }
        Commands::Config { action } => {
            let path = config_file.unwrap_or_else(config_path);
            match action {
                ConfigAction::Show => show_config(&path),
                ConfigAction::Validate => check_config(&path),
                ConfigAction::Init { force } => init_config(&path, force),
            }
        }
    }
}

/// Logs go to stderr so stdout carries only sandbox output
fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sandpool=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config_with(path),
        None => Config::from_env(),
    }
}

/// Failures were already printed; only the exit code is left to report
fn exit_with(code: i32) {
    if code != 0 {
        std::process::exit(code);
    }
}

fn exit_code<T, E>(outcome: &std::result::Result<T, E>) -> i32 {
    if outcome.is_ok() {
        0
    } else {
        1
    }
}

// ============================================================================
// Execution
// ============================================================================

async fn connect(config: Config) -> Result<ExecutionBridge> {
    let manager = SandboxManager::connect(config.sandbox).await?;
    ExecutionBridge::new(Arc::new(manager), config.bridge)
}

/// Tear down every sandbox, reporting but not failing on errors
async fn teardown(bridge: &ExecutionBridge) {
    if let Err(e) = bridge.manager().release_all().await {
        eprintln!("   {} Cleanup incomplete: {}", style("⚠").yellow(), e);
    }
}

/// Execute once and print the outcome; returns the process exit code
async fn run_once(
    config: Config,
    sandbox_type: &str,
    kind: ExecutionKind,
    payload: &str,
    keep: bool,
) -> Result<i32> {
    let sandbox_type: SandboxType = sandbox_type.parse()?;
    let bridge = connect(config).await?;

    let outcome = bridge.try_execute(sandbox_type, kind, payload).await;

    match &outcome {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
        Err(e) => eprintln!("{} {}", style("✗").red(), e.to_failure().message),
    }

    if keep {
        if let Some(session) = bridge.manager().peek_sandbox(sandbox_type).await {
            eprintln!();
            eprintln!("   {} Kept {} sandbox", style("ℹ").blue(), sandbox_type);
            eprintln!("      └─ Container: {}", style(&session.container_name).cyan());
            eprintln!("      └─ API:       {}", style(session.base_url()).cyan());
            eprintln!("      └─ MCP:       {}", style(session.mcp_url()).cyan());
            eprintln!("      └─ Mount:     {}", session.mount_dir.display());
        }
    } else {
        teardown(&bridge).await;
    }

    Ok(exit_code(&outcome))
}

async fn repl(config: Config, sandbox_type: &str, kind: ExecutionKind) -> Result<()> {
    let sandbox_type: SandboxType = sandbox_type.parse()?;
    let bridge = connect(config).await?;

    println!();
    println!("{}", style("╔══════════════════════════════════════════════════╗").cyan());
    println!("{}", style("║              📦 Sandpool Interactive             ║").cyan());
    println!("{}", style("╚══════════════════════════════════════════════════╝").cyan());
    println!();
    println!(
        "   {} {} sandbox, sending lines to {}",
        style("✓").green(),
        style(sandbox_type).cyan(),
        style(kind).cyan()
    );
    println!("   {}  - Exit (also Ctrl-D / Ctrl-C)", style("/quit").yellow());
    println!("   {} - Show sandbox status", style("/status").yellow());
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style(">>>").green().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => break,
            "/status" => {
                let status = bridge.manager().get_sandbox_status(sandbox_type).await;
                println!("   {} {}", style("●").dim(), status);
                continue;
            }
            _ => {}
        }

        match bridge.try_execute(sandbox_type, kind, input).await {
            Ok(output) => println!("{}", output.trim_end()),
            Err(e) => {
                warn!("{} failed: {}", kind, e);
                println!("{} {}", style("✗").red(), e.to_failure().message);
            }
        }
    }

    info!("Leaving REPL, removing sandboxes");
    teardown(&bridge).await;
    println!("{} Goodbye!\n", style("👋").bold());
    Ok(())
}

// ============================================================================
// Images and Configuration
// ============================================================================

fn show_images(config: &Config) {
    println!("{}", style("Sandbox images").cyan().bold());
    for sandbox_type in SandboxType::ALL {
        let source = if config.sandbox.images.contains_key(&sandbox_type) {
            "override"
        } else if sandbox_type.builtin_image().is_some() {
            "built-in"
        } else {
            "default"
        };
        println!(
            "   {:<11} {} {}",
            sandbox_type.as_str(),
            style(config.sandbox.image_for(sandbox_type)).cyan(),
            style(format!("({})", source)).dim()
        );
    }
    if let Some(runtime) = config.sandbox.runtime.runtime_name() {
        println!("   {} runtime: {}", style("ℹ").blue(), runtime);
    }
}

fn show_config(path: &Path) -> Result<()> {
    let snapshot = read_config_snapshot(path);

    if snapshot.exists {
        println!("{} {}", style("Config file:").dim(), path.display());
        for issue in &snapshot.issues {
            println!("   {} {}", style("⚠").yellow(), issue);
        }
    } else {
        println!(
            "{} {} (not found, using defaults)",
            style("Config file:").dim(),
            path.display()
        );
    }

    let config = load_config_with(path)?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| Error::Config(format!("Failed to render config: {}", e)))?;
    println!("\n{}", rendered);
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config_with(path)?;
    let result = validate_config(&config);

    for issue in &result.errors {
        println!("   {} {}", style("✗").red(), issue);
    }
    for issue in &result.warnings {
        println!("   {} {}", style("⚠").yellow(), issue);
    }

    if result.valid {
        println!("   {} Configuration is valid", style("✓").green());
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} configuration error(s)",
            result.errors.len()
        )))
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!(
            "   {} {} already exists, use --force to overwrite",
            style("ℹ").blue(),
            path.display()
        );
        return Ok(());
    }

    save_config(&Config::default(), path)?;
    println!("   {} Wrote {}", style("✓").green(), path.display());
    Ok(())
}
