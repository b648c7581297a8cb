//! Render Engines
//!
//! An engine turns a resolved view file plus data into output text.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::compiler::Compiler;
use crate::error::{Result, ViewError};
use crate::finder::ViewFinder;

/// Engine name for compile-and-cache rendering
pub const HANDLEBARS_ENGINE: &str = "handlebars";

/// Engine name for pass-through rendering
pub const FILE_ENGINE: &str = "file";

/// Renders a view file
pub trait Engine {
    /// Get the evaluated contents of the view at `path`
    ///
    /// `finder` resolves any other views the template pulls in by name.
    fn get(&mut self, path: &Path, data: &Value, finder: &dyn ViewFinder) -> Result<String>;

    /// Drop any state held for `path`
    fn forget(&mut self, _path: &Path) {}
}

/// Returns file contents untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct FileEngine;

impl Engine for FileEngine {
    fn get(&mut self, path: &Path, _data: &Value, _finder: &dyn ViewFinder) -> Result<String> {
        debug!(?path, "FileEngine::get: called");
        Ok(fs::read_to_string(path)?)
    }
}

/// Compiles through a [`Compiler`] when the source changed, then renders
pub struct CompilerEngine {
    compiler: Compiler,
}

impl CompilerEngine {
    pub fn new(compiler: Compiler) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut Compiler {
        &mut self.compiler
    }

    /// Compile `path` if needed, then every view it includes by name
    fn prepare(&mut self, path: &Path, finder: &dyn ViewFinder, seen: &mut HashSet<PathBuf>) -> Result<()> {
        if !seen.insert(path.to_path_buf()) {
            return Ok(());
        }
        if self.compiler.is_expired(path)? {
            self.compiler.compile(path)?;
        } else if !self.compiler.is_loaded(path) {
            self.compiler.load(path)?;
        }

        for name in self.compiler.partials(path) {
            match finder.find(&name) {
                Ok(partial) => {
                    self.prepare(&partial, finder, seen)?;
                    self.compiler.alias(&name, &partial);
                }
                // inline partials and block fallbacks are not files
                Err(e) => debug!(%name, error = %e, "CompilerEngine::prepare: partial not resolved"),
            }
        }
        Ok(())
    }
}

impl Engine for CompilerEngine {
    fn get(&mut self, path: &Path, data: &Value, finder: &dyn ViewFinder) -> Result<String> {
        debug!(?path, "CompilerEngine::get: called");
        self.prepare(path, finder, &mut HashSet::new())?;
        self.compiler.render(path, data)
    }

    fn forget(&mut self, path: &Path) {
        self.compiler.forget(path);
    }
}

/// Registry of engines by name
#[derive(Default)]
pub struct EngineResolver {
    engines: HashMap<String, Box<dyn Engine>>,
}

impl EngineResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine, replacing any engine with the same name
    pub fn register(&mut self, name: &str, engine: Box<dyn Engine>) {
        debug!(%name, "EngineResolver::register: called");
        self.engines.insert(name.to_string(), engine);
    }

    /// Look up an engine by name
    pub fn resolve(&mut self, name: &str) -> Result<&mut dyn Engine> {
        let Some(engine) = self.engines.get_mut(name) else {
            return Err(ViewError::UnknownEngine { name: name.to_string() });
        };
        let engine: &mut dyn Engine = engine.as_mut();
        Ok(engine)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// Drop state held for `path` in every engine
    pub fn forget(&mut self, path: &Path) {
        for engine in self.engines.values_mut() {
            engine.forget(path);
        }
    }
}
