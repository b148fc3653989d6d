// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{Backend, Config};
use europharm_app::{AppState, Session};
use europharm_db::Store;
use runtime::DbRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `europharm --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging(&config)?;
    info!(db = %db_path.display(), backend = ?config.backend(), "starting europharm");

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [store].db_path or EUROPHARM_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    store.set_max_brochure_size(config.max_brochure_size())?;
    if options.demo {
        store.seed_demo_data()?;
    }

    let cache_dir = europharm_db::brochure_cache_dir()?;
    let removed = europharm_db::evict_stale_cache(&cache_dir, config.cache_ttl_days())?;
    if removed > 0 {
        info!(removed, "evicted stale brochure cache entries");
    }

    let remote_client = match config.backend() {
        Backend::Sqlite => None,
        Backend::Remote => Some(build_remote_client(&config, &options)?),
    };
    let session = resolve_session(
        options.user.as_deref(),
        env::var("EUROPHARM_PASSWORD").ok(),
    )?;
    if options.check_only {
        if let Some(client) = &remote_client {
            client.ping()?;
        }
        info!(items = store.count_items()?, "check passed");
        return Ok(());
    }

    let mut state = AppState::with_section(config.start_section());
    let mut runtime = match remote_client {
        Some(client) => DbRuntime::with_remote(&store, client),
        None => DbRuntime::new(&store),
    };
    europharm_tui::run_app(&mut state, session, &mut runtime)
}

fn build_remote_client(config: &Config, options: &CliOptions) -> Result<europharm_remote::Client> {
    let base_url = config.remote_base_url().ok_or_else(|| {
        anyhow!("[remote].base_url is required when [store].backend = \"remote\"")
    })?;
    let api_key = config.remote_api_key().ok_or_else(|| {
        anyhow!("[remote].api_key is missing -- set it in the config or export EUROPHARM_API_KEY")
    })?;
    europharm_remote::Client::new(base_url, &api_key, config.remote_timeout()?).with_context(|| {
        format!(
            "invalid [remote] config in {}; fix base_url/api_key/timeout values",
            options.config_path.display()
        )
    })
}

/// `--user` skips the login screen; the password comes from the environment
/// so it never lands in shell history.
fn resolve_session(user: Option<&str>, password: Option<String>) -> Result<Option<Session>> {
    let Some(user) = user else {
        return Ok(None);
    };
    let password = password
        .ok_or_else(|| anyhow!("--user requires EUROPHARM_PASSWORD to be set"))?;
    Session::login(user, &password).map(Some)
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].path to a writable location and retry",
                path.display()
            )
        })?;

    let filter = match env::var("EUROPHARM_LOG") {
        Ok(raw) if !raw.trim().is_empty() => EnvFilter::try_new(raw.trim())
            .with_context(|| format!("EUROPHARM_LOG={raw:?} is not a valid filter"))?,
        _ => EnvFilter::try_new(config.log_filter())?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|error| anyhow!("initialize logging: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    user: Option<String>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        user: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--user" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--user requires a username"))?;
                options.user = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("europharm back office");
    println!("  --config <path>          Use a specific config path");
    println!("  --user <name>            Sign in as <name> (password from EUROPHARM_PASSWORD)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB + remote endpoint");
    println!("  --help                   Show this help");
}
