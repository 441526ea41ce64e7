use crate::{
    classify::{self, SourceKind},
    config::Config,
    engine::{ConverterDiag, PresentationConverter, soffice::{SofficeConverter, install_hint}},
    interactive,
    pipeline::{Pipeline, RunRequest},
    progress::LogProgress,
    util::{ensure_dir, program_dir},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "pdf-stitch.toml";

#[derive(Parser, Debug)]
#[command(name = "pdf-stitch")]
#[command(about = "Merge presentations, images and PDFs from a folder into one PDF")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Merge the configured input folder without prompting.
    #[arg(long)]
    pub cli: bool,

    /// Path to config TOML. If omitted, uses ./pdf-stitch.toml or one next to the binary.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether an office converter is available.
    Doctor {},
    /// Show how the files of a folder would be treated.
    Classify {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Merge a folder, with optional overrides of the configured paths.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        output_name: Option<String>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    match &args.cmd {
        Some(Command::Doctor {}) => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref(), true)?;
            doctor(&cfg)
        }
        Some(Command::Classify { input }) => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref(), true)?;
            let input = input.clone().unwrap_or_else(|| cfg.input_dir());
            classify(&input)
        }
        Some(Command::Run {
            input,
            out_dir,
            output_name,
        }) => {
            let mut req = RunRequest::from_config(&cfg);
            if let Some(input) = input {
                req.input_dir = input.clone();
            }
            if let Some(out_dir) = out_dir {
                req.output_dir = out_dir.clone();
            }
            if let Some(name) = output_name {
                req.set_output_name(name);
            }
            run(&args, &cfg, req)
        }
        None if args.cli => run(&args, &cfg, RunRequest::from_config(&cfg)),
        None => {
            let log_path = resolve_log_path(&cfg, None);
            // Prompts own the terminal; logs only go to the file, if any.
            let _guard = init_logging(&args, &cfg, log_path.as_deref(), false)?;
            interactive::run(&cfg)
        }
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Config::load(&local);
    }
    Config::load_or_default(&program_dir().join(CONFIG_FILE))
}

fn init_logging(
    args: &Args,
    cfg: &Config,
    file_path: Option<&Path>,
    console: bool,
) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = match (console, cfg.logging.json) {
        (false, _) => None,
        (true, true) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .boxed(),
        ),
        (true, false) => Some(tracing_subscriber::fmt::layer().with_target(false).boxed()),
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let diag = match SofficeConverter::locate(cfg) {
        Some(conv) => conv.doctor().unwrap_or_else(|e| ConverterDiag {
            converter_path: Some(conv.exe().display().to_string()),
            version: None,
            ok: false,
            error: Some(format!("{e:#}")),
        }),
        None => ConverterDiag::missing(install_hint()),
    };
    let input_dir = cfg.input_dir();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "converter": diag,
            "input_dir": input_dir,
            "input_dir_exists": input_dir.is_dir(),
            "output_dir": cfg.output_dir(),
        }))?
    );
    Ok(())
}

fn classify(input: &Path) -> Result<()> {
    let inventory = classify::scan_dir(input)?;
    let mut ignored: Vec<String> = std::fs::read_dir(input)
        .with_context(|| format!("listing {}", input.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && SourceKind::from_path(p) == SourceKind::Unsupported)
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    ignored.sort();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "total": inventory.total(),
            "inventory": inventory,
            "ignored": ignored,
        }))?
    );
    Ok(())
}

fn run(args: &Args, cfg: &Config, req: RunRequest) -> Result<()> {
    let log_path = resolve_log_path(cfg, Some(&req.output_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref(), true)?;
    debug!(?cfg, "effective config");

    let converter = SofficeConverter::locate(cfg);
    if let Some(conv) = &converter {
        info!("using office converter {}", conv.exe().display());
    }

    let pipeline = Pipeline::new(cfg, converter);
    let report = pipeline
        .run(&req, &LogProgress)
        .with_context(|| format!("merging {}", req.input_dir.display()))?;

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "output": report.output,
                "pages": report.page_count,
                "merged": report.merged_count(),
                "failed": report.failed_count(),
                "skipped": report.skipped_count(),
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, out_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(cfg.paths.resolve(&cfg.logging.file_path));
    }

    let out_dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cfg.output_dir());
    Some(out_dir.join("pdf-stitch.log"))
}
