// src/main.rs

//! The command-line entry point: runs one admin call against a cluster, or an
//! admin node with `--node`.

use anyhow::{Context, Result};
use serde_json::Value;
use spineldb_admin::config::{ClientConfig, NodeConfig};
use spineldb_admin::connection::Connection;
use spineldb_admin::core::acl::Role;
use spineldb_admin::core::commands::command_spec::FUNCTIONS;
use spineldb_admin::core::commands::{Arg, Bindings};
use spineldb_admin::core::{AdminClient, LogConfig, LogLevel};
use spineldb_admin::server;
use std::env;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--version") {
        println!("spineldb-admin version {VERSION}");
        return Ok(());
    }
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    if args.iter().any(|a| a == "--node") {
        // --- Node Mode ---
        let config = match config_path {
            Some(path) => NodeConfig::from_file(path),
            None => Ok(NodeConfig::default()),
        };
        let config = match config {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load node configuration: {e:#}");
                std::process::exit(1);
            }
        };
        let log = init_logging(&config.log_level);
        info!("Starting spineldb-admin node (log level {})...", log.level());

        if let Err(e) = server::run(config).await {
            error!("Node runtime error: {:#}", e);
            return Err(e);
        }
        return Ok(());
    }

    // --- Client Mode ---
    let config = match config_path {
        Some(path) => ClientConfig::from_file(path),
        None => Ok(ClientConfig::default()),
    };
    let config = match config {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load client configuration: {e:#}");
            std::process::exit(1);
        }
    };

    let positional = positional_args(&args);
    let Some((function, raw_args)) = positional.split_first() else {
        print_usage();
        std::process::exit(1);
    };
    let call_args: Vec<Arg> = raw_args.iter().map(|raw| Arg::Json(parse_arg(raw))).collect();

    let log = init_logging(&config.log_level);

    let conn = if function.starts_with("admin_") {
        match Connection::connect(config, None).await {
            Ok(conn) => Some(Arc::new(conn)),
            Err(e) => {
                eprintln!("error {}: {}", e.code(), e.msg());
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let bindings = Bindings::new(conn.clone().map(AdminClient::new), log);
    let result = bindings.invoke(function, call_args).await;
    if let Some(conn) = conn {
        conn.close().await;
    }

    match result {
        Ok(value) => {
            let out = serde_json::to_string_pretty(&value).context("Failed to render result")?;
            println!("{out}");
            Ok(())
        }
        Err(e) => {
            match e.code() {
                Some(code) => eprintln!("error {code}: {e}"),
                None => eprintln!("error: {e}"),
            }
            std::process::exit(1);
        }
    }
}

/// Installs the global subscriber with a reloadable filter and returns the log facade.
fn init_logging(configured_level: &str) -> LogConfig {
    let initial = env::var("RUST_LOG").unwrap_or_else(|_| configured_level.to_string());
    let log = LogConfig::new(LogLevel::from_name(&initial).unwrap_or(LogLevel::Info));

    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(log.layer())
        .init();

    log.attach_reload_handle(Arc::new(reload_handle));
    log
}

/// Arguments that are neither flags nor the value of `--config`.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "--config" => skip_next = true,
            "--node" => {}
            other => out.push(other),
        }
    }
    out
}

/// Parses a JSON argument; anything that is not valid JSON is taken as a string.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_usage() {
    println!("Usage:");
    println!("  spineldb-admin [--config admin.toml] <function> [json-arg ...]");
    println!("  spineldb-admin --node [--config node.toml]");
    println!("  spineldb-admin --version");
    println!();
    println!("Functions:");
    for spec in FUNCTIONS {
        println!("  {spec}");
    }
    println!();
    let roles: Vec<String> = Role::iter().map(|r| r.to_string()).collect();
    println!("Roles: {}", roles.join(", "));
}
