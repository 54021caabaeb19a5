//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, then runs the
//! requested subcommand and prints its report.

use anyhow::{Context, Result};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use photo_sort::cli::{Args, Command};
use photo_sort::config::{load_or_init, LoadResult, CONFIG_ENV};
use photo_sort::output as out;
use photo_sort::{default_config_path, scan_folder, shutdown, Config, EngineError};

use crate::logging::init_tracing;

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default photo_sort config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run any command to create a template.",
                );
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

fn log_engine_error(e: &EngineError) {
    let code = e.code();
    let kind = e.kind();
    match e {
        EngineError::InputNotFound(path) | EngineError::InputNotDirectory(path) => {
            error!(code, kind, path = %path.display(), "{e}")
        }
        EngineError::InputUnreadable { path, context } => {
            error!(code, kind, path = %path.display(), %context, "Cannot read folder")
        }
        EngineError::GatewayStartup(msg) | EngineError::GatewayUnavailable(msg) => {
            error!(code, kind, error = %msg, "Metadata reader unavailable")
        }
    }
    out::print_error(&e.to_string());
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize report")?;
    out::print_user(&text);
    Ok(())
}

fn run_command(cmd: &Command, cfg: &Config, report_json: bool) -> Result<ExitCode> {
    let folder = cmd.folder();
    let outcome = match cmd {
        Command::List { .. } => scan_folder(&folder).map(|scan| -> Result<ExitCode> {
            if report_json {
                let names: Vec<_> = scan
                    .images
                    .iter()
                    .map(|f| serde_json::json!({ "name": f.name, "size": f.size }))
                    .collect();
                print_json(&names).map(|_| ExitCode::SUCCESS)
            } else {
                out::print_listing(&scan);
                Ok(ExitCode::SUCCESS)
            }
        }),
        Command::Analyze { .. } => {
            photo_sort::analyze(&folder, cfg).map(|report| -> Result<ExitCode> {
                if report_json {
                    print_json(&report)?;
                } else {
                    out::print_analysis(&report);
                }
                Ok(ExitCode::SUCCESS)
            })
        }
        Command::Organize { .. } => {
            photo_sort::organize(&folder, cfg).map(|report| -> Result<ExitCode> {
                if report_json {
                    print_json(&report)?;
                } else {
                    out::print_organize(&report);
                }
                Ok(if report.error_count == 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            })
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            log_engine_error(&e);
            Ok(ExitCode::from(u8::try_from(e.code()).unwrap_or(1)))
        }
    }
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<ExitCode> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(ExitCode::SUCCESS);
    }

    let Some(cmd) = args.command.clone() else {
        out::print_error("No command given. Try `photo_sort --help`.");
        return Ok(ExitCode::from(2));
    };

    let mut cfg = match load_or_init()? {
        LoadResult::Loaded(_, cfg) => cfg,
        LoadResult::CreatedTemplate(path, cfg) => {
            out::print_info(&format!(
                "A template photo_sort config was written to: {}",
                path.display()
            ));
            cfg
        }
        LoadResult::Defaults(cfg) => cfg,
    };
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {}", e));
        e
    })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing in-flight files and stopping...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("failed to install signal handler")?;
    }

    debug!(?args, "starting photo_sort");
    let result = run_command(&cmd, &cfg, args.report_json);

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}
