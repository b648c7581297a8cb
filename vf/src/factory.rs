//! View Factory
//!
//! Ties a finder to the engines: resolves a name, picks an engine by file
//! extension and renders with shared plus per-call data.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::{EngineResolver, FILE_ENGINE, HANDLEBARS_ENGINE};
use crate::error::{Result, ViewError};
use crate::finder::ViewFinder;

/// Variables passed to a view
pub type ViewData = Map<String, Value>;

/// Resolves and renders views
pub struct Factory {
    resolver: EngineResolver,
    finder: Box<dyn ViewFinder>,
    /// Extension to engine name, highest priority first
    extensions: Vec<(String, String)>,
    shared: ViewData,
}

impl Factory {
    /// Create a factory with the default extension map
    pub fn new(resolver: EngineResolver, finder: Box<dyn ViewFinder>) -> Self {
        debug!("Factory::new: called");
        let extensions = [
            ("hbs", HANDLEBARS_ENGINE),
            ("html", FILE_ENGINE),
            ("css", FILE_ENGINE),
            ("txt", FILE_ENGINE),
        ]
        .into_iter()
        .map(|(ext, engine)| (ext.to_string(), engine.to_string()))
        .collect();

        Self {
            resolver,
            finder,
            extensions,
            shared: ViewData::new(),
        }
    }

    /// Resolve a view name to its file
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        self.finder.find(name)
    }

    /// Check whether a view resolves to a file
    pub fn exists(&self, name: &str) -> bool {
        self.finder.find(name).is_ok()
    }

    /// Render a named view
    pub fn render(&mut self, name: &str, data: &ViewData) -> Result<String> {
        debug!(%name, "Factory::render: called");
        let path = self.finder.find(name)?;
        self.file(&path, data)
    }

    /// Render the view file at `path`, bypassing the finder
    pub fn file(&mut self, path: &Path, data: &ViewData) -> Result<String> {
        debug!(?path, "Factory::file: called");
        let engine_name = self.engine_name_for(path)?.to_string();
        let data = Value::Object(self.gather_data(data));
        let engine = self.resolver.resolve(&engine_name)?;
        let rendered = engine.get(path, &data, self.finder.as_ref())?;
        debug!(?path, engine = %engine_name, "Factory::file: rendered");
        Ok(rendered)
    }

    /// Make a value available to every view
    pub fn share(&mut self, key: &str, value: Value) {
        debug!(%key, "Factory::share: called");
        self.shared.insert(key.to_string(), value);
    }

    pub fn shared(&self) -> &ViewData {
        &self.shared
    }

    /// Map an extension to an engine, giving it the highest priority
    pub fn add_extension(&mut self, extension: &str, engine: &str) {
        debug!(%extension, %engine, "Factory::add_extension: called");
        self.finder.add_extension(extension);
        self.extensions.retain(|(ext, _)| ext != extension);
        self.extensions.insert(0, (extension.to_string(), engine.to_string()));
    }

    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    pub fn add_namespace(&mut self, namespace: &str, hints: Vec<PathBuf>) {
        self.finder.add_namespace(namespace, hints);
    }

    pub fn add_location(&mut self, location: PathBuf) {
        self.finder.add_location(location);
    }

    pub fn finder(&self) -> &dyn ViewFinder {
        self.finder.as_ref()
    }

    /// Replace the finder, keeping engines and shared data
    pub fn set_finder(&mut self, finder: Box<dyn ViewFinder>) {
        debug!("Factory::set_finder: called");
        self.finder = finder;
    }

    /// Drop engine state held for `path`
    pub fn forget(&mut self, path: &Path) {
        self.resolver.forget(path);
    }

    fn engine_name_for(&self, path: &Path) -> Result<&str> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.extensions
            .iter()
            .find(|(ext, _)| file_name.ends_with(&format!(".{}", ext)))
            .map(|(_, engine)| engine.as_str())
            .ok_or_else(|| ViewError::NoEngine {
                path: path.to_path_buf(),
            })
    }

    /// Shared data overlaid with per-call data
    fn gather_data(&self, data: &ViewData) -> ViewData {
        let mut merged = self.shared.clone();
        merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}
