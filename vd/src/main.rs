//! vd - view driver CLI
//!
//! Resolve, inspect and render an application's templates from the shell.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use viewdriver::cli::{Cli, Command};
use viewdriver::{App, HandlebarsDriver, TemplateHandler, ViewConfig, ViewData};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > WARN (stdout carries rendered output)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") | None => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn build_app(cli: &Cli) -> Result<App> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let mut app = App::new(root).with_modules(cli.modules.iter().cloned());
    if let Some(app_path) = &cli.app_path {
        app = app.with_app_path(app_path);
    }
    if let Some(runtime_path) = &cli.runtime_path {
        app = app.with_runtime_path(runtime_path);
    }
    if let Some(token) = &cli.csrf_token {
        app = app.with_csrf_token(token);
    }
    Ok(app)
}

fn into_object(value: Value, source: &str) -> Result<ViewData> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(eyre!("Template data from {} must be an object", source)),
    }
}

fn load_data(data: Option<&str>, data_file: Option<&Path>) -> Result<ViewData> {
    let mut merged = ViewData::new();

    if let Some(path) = data_file {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read data file {}", path.display()))?;
        let value: Value =
            serde_yaml::from_str(&content).context(format!("Failed to parse data file {}", path.display()))?;
        merged.extend(into_object(value, &path.display().to_string())?);
    }

    if let Some(raw) = data {
        let value: Value = serde_json::from_str(raw).context("Failed to parse --data as JSON")?;
        merged.extend(into_object(value, "--data")?);
    }

    Ok(merged)
}

fn read_content(content: String) -> Result<String> {
    if content != "-" {
        return Ok(content);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read template content from stdin")?;
    Ok(buf)
}

/// Every template file under the search paths as (view name, path)
fn list_templates(search_paths: &[PathBuf], extensions: &[String]) -> Vec<(String, PathBuf)> {
    let mut found = Vec::new();
    for root in search_paths {
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
            let name = extensions
                .iter()
                .find_map(|ext| relative.strip_suffix(&format!(".{}", ext)));
            if let Some(name) = name {
                found.push((name.to_string(), entry.path().to_path_buf()));
            }
        }
    }
    found
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ViewConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level()).context("Failed to setup logging")?;

    let app = build_app(&cli)?;
    let mut driver = HandlebarsDriver::new(Arc::new(app), config.options().clone());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Paths => {
            if driver.search_paths().is_empty() {
                println!("{}", "No view directories found".dimmed());
            }
            for path in driver.search_paths() {
                println!("{}", path.display());
            }
        }
        Command::Name { template } => {
            println!("{}", driver.transform_template_name(&template));
        }
        Command::Exists { template } => {
            if driver.exists(&template) {
                println!("{}", "true".green());
            } else {
                println!("{}", "false".red());
                std::process::exit(1);
            }
        }
        Command::Render {
            template,
            data,
            data_file,
        } => {
            let data = load_data(data.as_deref(), data_file.as_deref())?;
            driver
                .fetch(&template, &data)
                .context(format!("Failed to render {}", template))?;
        }
        Command::Inline { content, data } => {
            let content = read_content(content)?;
            let data = load_data(data.as_deref(), None)?;
            driver.display(&content, &data).context("Failed to render inline content")?;
        }
        Command::List => {
            let extensions = driver.view_config().view_suffixes();
            let mut seen = HashSet::new();
            for (name, path) in list_templates(driver.search_paths(), &extensions) {
                if seen.insert(name.clone()) {
                    println!("{} {}", name.cyan(), path.display().to_string().dimmed());
                } else {
                    println!("{} {} {}", name, path.display().to_string().dimmed(), "(shadowed)".yellow());
                }
            }
        }
    }

    Ok(())
}
