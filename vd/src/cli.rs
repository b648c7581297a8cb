//! CLI argument parsing for vd

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vd")]
#[command(author, version, about = "Render controller/action views through handlebars", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Application root (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Application code directory (default: {root}/app)
    #[arg(long)]
    pub app_path: Option<PathBuf>,

    /// Runtime directory (default: {root}/runtime)
    #[arg(long)]
    pub runtime_path: Option<PathBuf>,

    /// Declared module; repeat for a multi-module layout
    #[arg(short, long = "module")]
    pub modules: Vec<String>,

    /// Token emitted by `{{csrf_field}}` when the view data carries none
    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the view search paths
    Paths,

    /// Show how a template name is rewritten before lookup
    Name {
        /// Template identifier, e.g. user/getUserInfo
        #[arg(required = true)]
        template: String,
    },

    /// Check whether a template resolves (exit status 1 when it does not)
    Exists {
        /// Template identifier
        #[arg(required = true)]
        template: String,
    },

    /// Render a named template
    Render {
        /// Template identifier
        #[arg(required = true)]
        template: String,

        /// Template variables as a JSON object
        #[arg(short, long)]
        data: Option<String>,

        /// Read template variables from a JSON or YAML file
        #[arg(short = 'f', long)]
        data_file: Option<PathBuf>,
    },

    /// Render literal template content ("-" reads stdin)
    Inline {
        /// Template content
        #[arg(required = true)]
        content: String,

        /// Template variables as a JSON object
        #[arg(short, long)]
        data: Option<String>,
    },

    /// List templates reachable from the search paths
    List,
}
