//! Argument parsing, policy loading and dispatch for the `sluice` binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sluice_config::{ConfigError, PostProcessPolicy};
use sluice_postproc::{
    CatalogStore, Collaborators, EpisodePostProcessor, FailedDownloadProcessor, InMemoryCatalog,
    PostProcessService, ProcessRequest, SceneNameParser,
};
use sluice_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::hooks::{CommandFailedProcessor, CommandHook, CommandPostProcessor, UnconfiguredHook};

/// Exit code when the pass ran but at least one unit failed.
const EXIT_UNITS_FAILED: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "sluice", about = "Post-process completed TV downloads")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "SLUICE_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log output format (pretty or json)"
    )]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, env = "SLUICE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one pass over a download directory.
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Directory to process; a bare leaf name is looked up under the download root.
    dir: PathBuf,
    /// Release name reported by the download client.
    #[arg(long)]
    nzb_name: Option<String>,
    /// Accepted for download-client compatibility.
    #[arg(long)]
    recurse: bool,
    /// The download client reported this download as failed.
    #[arg(long)]
    failed: bool,
    /// JSON catalog snapshot used for duplicate detection.
    #[arg(long, env = "SLUICE_CATALOG")]
    catalog: Option<PathBuf>,
    /// Command run for every media file.
    #[arg(long, env = "SLUICE_HOOK")]
    hook: Option<String>,
    /// Command run for failed downloads.
    #[arg(long, env = "SLUICE_FAILED_HOOK")]
    failed_hook: Option<String>,
    /// JSON policy document; `SLUICE_*` variables override it.
    #[arg(long, env = "SLUICE_CONFIG")]
    config: Option<PathBuf>,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|_| format!("unknown log format '{value}'"))
}

/// Parses CLI arguments, runs the requested command and prints the pass
/// report. Returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("SLUICE_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }
    info!(build_sha = build_sha(), "sluice starting");

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn dispatch(command: Command) -> CliResult<i32> {
    match command {
        Command::Process(args) => handle_process(args),
    }
}

fn handle_process(args: ProcessArgs) -> CliResult<i32> {
    let policy = load_policy(args.config.as_ref())?;
    let service = build_service(&args, policy)?;

    let mut request = ProcessRequest::new(&args.dir);
    request.name_hint = args.nzb_name;
    request.recurse = args.recurse;
    request.failed_download = args.failed;

    let report = service.run(&request);
    println!("{}", report.render());

    let failed_units = report
        .units
        .iter()
        .filter(|unit| unit.outcome.is_failed())
        .count();
    info!(units = report.units.len(), failed_units, "pass finished");
    Ok(if failed_units == 0 { 0 } else { EXIT_UNITS_FAILED })
}

fn load_policy(config: Option<&PathBuf>) -> CliResult<PostProcessPolicy> {
    let Some(path) = config else {
        return PostProcessPolicy::from_env()
            .map_err(|err| CliError::validation(describe_config_error(&err)));
    };
    let mut policy = PostProcessPolicy::from_json_file(path)
        .map_err(|err| anyhow::anyhow!(describe_config_error(&err)))
        .with_context(|| format!("failed to load policy from {}", path.display()))
        .map_err(CliError::failure)?;
    policy
        .apply_lookup(|name| std::env::var(name).ok())
        .map_err(|err| CliError::validation(describe_config_error(&err)))?;
    Ok(policy)
}

fn describe_config_error(err: &ConfigError) -> String {
    match err {
        ConfigError::InvalidField {
            section,
            field,
            value,
            reason,
        } => format!(
            "invalid setting {section}.{field}={}: {reason}",
            value.as_deref().unwrap_or_default()
        ),
        ConfigError::Io {
            operation,
            path,
            source,
        } => format!("{operation} ({}): {source}", path.display()),
        ConfigError::Json {
            operation,
            path,
            source,
        } => format!("{operation} ({}): {source}", path.display()),
    }
}

fn build_service(args: &ProcessArgs, policy: PostProcessPolicy) -> CliResult<PostProcessService> {
    let post_processor: Arc<dyn EpisodePostProcessor> = match (&args.hook, args.failed) {
        (Some(program), _) => Arc::new(CommandPostProcessor::new(
            CommandHook::new(program.as_str()),
            policy.keep_processed_dir,
        )),
        (None, true) => Arc::new(UnconfiguredHook::new("--hook")),
        (None, false) => {
            return Err(CliError::validation(
                "--hook (or SLUICE_HOOK) is required to process downloads",
            ));
        }
    };
    let failed_processor: Arc<dyn FailedDownloadProcessor> = match (&args.failed_hook, args.failed)
    {
        (Some(program), _) => Arc::new(CommandFailedProcessor::new(CommandHook::new(
            program.as_str(),
        ))),
        (None, false) => Arc::new(UnconfiguredHook::new("--failed-hook")),
        (None, true) => {
            return Err(CliError::validation(
                "--failed-hook (or SLUICE_FAILED_HOOK) is required with --failed",
            ));
        }
    };

    let catalog: Arc<dyn CatalogStore> = match &args.catalog {
        Some(path) => Arc::new(
            InMemoryCatalog::from_json_file(path)
                .map_err(|err| CliError::failure(anyhow::anyhow!(err.describe())))?,
        ),
        None => Arc::new(InMemoryCatalog::new()),
    };
    let parser = SceneNameParser::new()
        .map_err(|err| CliError::failure(anyhow::anyhow!(err.describe())))?;

    Ok(PostProcessService::new(
        policy,
        Collaborators {
            catalog,
            parser: Arc::new(parser),
            post_processor,
            failed_processor,
        },
    ))
}
