//! View Finder
//!
//! Resolves a view name to a file on disk by scanning search paths in order.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, ViewError};

/// Delimiter between a namespace and the view name (`admin::user/list`)
pub const HINT_PATH_DELIMITER: &str = "::";

/// Looks up view files by name
pub trait ViewFinder {
    /// Get the full path to a view
    fn find(&self, name: &str) -> Result<PathBuf>;

    /// Append a search location
    fn add_location(&mut self, location: PathBuf);

    /// Add hint paths for a namespace, merging with any already registered
    fn add_namespace(&mut self, namespace: &str, hints: Vec<PathBuf>);

    /// Register an extension, giving it the highest priority
    fn add_extension(&mut self, extension: &str);

    /// Search locations in priority order
    fn paths(&self) -> &[PathBuf];

    /// Recognized extensions in priority order
    fn extensions(&self) -> &[String];
}

/// Filesystem-backed view finder
#[derive(Debug, Clone, Default)]
pub struct FileViewFinder {
    paths: Vec<PathBuf>,
    extensions: Vec<String>,
    hints: HashMap<String, Vec<PathBuf>>,
}

impl FileViewFinder {
    /// Create a finder over the given search paths and extensions
    pub fn new(paths: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        debug!(?paths, ?extensions, "FileViewFinder::new: called");
        Self {
            paths,
            extensions,
            hints: HashMap::new(),
        }
    }

    /// Hint paths registered for a namespace
    pub fn hints(&self, namespace: &str) -> Option<&[PathBuf]> {
        self.hints.get(namespace).map(Vec::as_slice)
    }

    fn find_namespaced_view(&self, name: &str) -> Result<PathBuf> {
        let (namespace, view) = parse_namespace_segments(name)?;
        let hints = self.hints.get(namespace).ok_or_else(|| ViewError::NoHintPath {
            namespace: namespace.to_string(),
        })?;
        debug!(%namespace, %view, "FileViewFinder::find_namespaced_view: resolving");
        self.find_in_paths(view, hints)
    }

    fn find_in_paths(&self, name: &str, paths: &[PathBuf]) -> Result<PathBuf> {
        for path in paths {
            for file in self.possible_view_files(name) {
                let candidate = path.join(&file);
                if candidate.is_file() {
                    debug!(?candidate, "FileViewFinder::find_in_paths: found");
                    return Ok(candidate);
                }
            }
        }

        debug!(%name, "FileViewFinder::find_in_paths: not found");
        Err(ViewError::NotFound {
            name: name.to_string(),
            searched: paths.to_vec(),
        })
    }

    /// Relative file names a view may live under, one per extension
    pub fn possible_view_files(&self, name: &str) -> Vec<String> {
        let base = name.trim_start_matches('/').replace('.', "/");
        self.extensions.iter().map(|ext| format!("{}.{}", base, ext)).collect()
    }
}

impl ViewFinder for FileViewFinder {
    fn find(&self, name: &str) -> Result<PathBuf> {
        debug!(%name, "FileViewFinder::find: called");
        if name.contains(HINT_PATH_DELIMITER) {
            return self.find_namespaced_view(name);
        }
        self.find_in_paths(name, &self.paths)
    }

    fn add_location(&mut self, location: PathBuf) {
        debug!(?location, "FileViewFinder::add_location: called");
        self.paths.push(location);
    }

    fn add_namespace(&mut self, namespace: &str, hints: Vec<PathBuf>) {
        debug!(%namespace, ?hints, "FileViewFinder::add_namespace: called");
        self.hints.entry(namespace.to_string()).or_default().extend(hints);
    }

    fn add_extension(&mut self, extension: &str) {
        debug!(%extension, "FileViewFinder::add_extension: called");
        self.extensions.retain(|e| e != extension);
        self.extensions.insert(0, extension.to_string());
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

/// Split `namespace::view` into its two segments
fn parse_namespace_segments(name: &str) -> Result<(&str, &str)> {
    let segments: Vec<&str> = name.split(HINT_PATH_DELIMITER).collect();
    match segments.as_slice() {
        [namespace, view] if !namespace.is_empty() && !view.is_empty() => Ok((namespace, view)),
        _ => Err(ViewError::InvalidName { name: name.to_string() }),
    }
}
