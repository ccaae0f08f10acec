mod commands;
pub mod core;

use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::Action;
use crate::core::downloader::Downloader;
use crate::core::error::{McdexError, McdexResult};
use crate::core::loaders::{ForgeInstaller, JavaProcessRunner};
use crate::core::pack::PackContext;
use crate::core::progress::ConsoleReporter;
use crate::core::state::{Env, Settings};

/// Minecraft modpack manager for CurseForge packs and Forge.
#[derive(Debug, Parser)]
#[command(name = "mcdex", version, disable_help_subcommand = true)]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Parallel mod downloads (1-8).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Command to run; `help` lists them.
    command: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Entry point of the `mcdex` binary. Returns the process exit code.
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => McdexError::Usage(String::new()).exit_code(),
            };
        }
    };

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(dispatch(cli))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn,mcdex_lib=info",
        1 => "warn,mcdex_lib=debug",
        _ => "info,mcdex_lib=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> i32 {
    let Some(name) = cli.command.as_deref() else {
        commands::print_usage();
        return McdexError::Usage(String::new()).exit_code();
    };

    let Some(command) = commands::find(name) else {
        eprintln!("error: unknown command '{}'", name);
        commands::print_usage();
        return McdexError::Usage(name.to_string()).exit_code();
    };

    if let Err(e) = command.check_arity(&cli.args) {
        eprintln!("{}", e);
        return e.exit_code();
    }

    let handler = match command.action {
        Action::Help => {
            commands::print_usage();
            return 0;
        }
        Action::Run(handler) => handler,
    };

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let result = async {
        let env = Env::init()?;
        let settings_path = env.settings_path();
        let mut settings = Settings::load(&settings_path);
        if !settings_path.exists() {
            if let Err(e) = settings.save(&settings_path) {
                warn!("Could not write default settings: {}", e);
            }
        }
        if let Some(jobs) = cli.jobs {
            settings.download_workers = jobs;
        }

        let downloader = Downloader::new(cancel.clone())?;
        let runner = Arc::new(JavaProcessRunner::new(settings.java_binary(), cancel.clone()));
        let forge = ForgeInstaller::new(&settings.forge_maven_url, env.forge_cache_dir(), runner);
        let reporter = ConsoleReporter;
        let ctx = PackContext {
            env: &env,
            settings: &settings,
            downloader: &downloader,
            forge: &forge,
            reporter: &reporter,
        };

        handler(&ctx, &cli.args).await
    }
    .await;

    report_outcome(name, result)
}

fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling");
            cancel.cancel();
        }
    });
}

fn report_outcome(command: &str, result: McdexResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{} failed: {}", command, e);
            if matches!(e, McdexError::IndexMissing(_)) {
                eprintln!("hint: run 'mcdex update' to download the mod index");
            }
            e.exit_code()
        }
    }
}
