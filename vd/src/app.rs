//! Host application context
//!
//! The paths and module list a view layer needs from the application it
//! runs inside.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

/// What the driver needs to know about the host application
pub trait HostApp {
    /// Project root (contains the top-level view directory)
    fn root_path(&self) -> &Path;

    /// Application code directory (contains module directories)
    fn app_path(&self) -> &Path;

    /// Writable directory for caches and scratch files
    fn runtime_path(&self) -> &Path;

    /// Declared module names; empty for a single-module layout
    fn modules(&self) -> &[String];

    /// Token the host will accept back from forms rendered with `csrf_field`
    ///
    /// The host owns the token (typically stored in the session). `None`
    /// leaves it to the caller to pass `csrf_token` in the view data.
    fn csrf_token(&self) -> Option<String> {
        None
    }

    /// Value shared with every template as `app`
    fn to_shared(&self) -> Value {
        serde_json::json!({
            "root_path": self.root_path().display().to_string(),
            "app_path": self.app_path().display().to_string(),
            "runtime_path": self.runtime_path().display().to_string(),
            "modules": self.modules(),
        })
    }
}

/// Plain host context built from a project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    root_path: PathBuf,
    app_path: PathBuf,
    runtime_path: PathBuf,
    modules: Vec<String>,
    csrf_token: Option<String>,
}

impl App {
    /// Context for `root` with `app/` and `runtime/` beneath it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root_path = root.into();
        debug!(?root_path, "App::new: called");
        Self {
            app_path: root_path.join("app"),
            runtime_path: root_path.join("runtime"),
            root_path,
            modules: Vec::new(),
            csrf_token: None,
        }
    }

    pub fn with_app_path(mut self, app_path: impl Into<PathBuf>) -> Self {
        self.app_path = app_path.into();
        self
    }

    pub fn with_runtime_path(mut self, runtime_path: impl Into<PathBuf>) -> Self {
        self.runtime_path = runtime_path.into();
        self
    }

    /// Declare the modules of a multi-module layout
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Fix the token handed to `csrf_field`
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }
}

impl HostApp for App {
    fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn app_path(&self) -> &Path {
        &self.app_path
    }

    fn runtime_path(&self) -> &Path {
        &self.runtime_path
    }

    fn modules(&self) -> &[String] {
        &self.modules
    }

    fn csrf_token(&self) -> Option<String> {
        self.csrf_token.clone()
    }
}
