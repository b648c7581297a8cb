//! Template Compiler
//!
//! Compiles handlebars sources into a registry and writes each compiled
//! template under the cache directory. A template stays compiled until its
//! source changes on disk; a fresh compiler picks up earlier artifacts
//! without reparsing stale sources.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use handlebars::template::{Template, TemplateElement};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;

/// File extension of compiled artifacts in the cache directory
pub const COMPILED_EXTENSION: &str = "compiled";

/// Compiles template files and caches the compiled form
pub struct Compiler {
    /// Handlebars registry holding every compiled template, keyed by source path
    registry: Handlebars<'static>,
    /// Directory compiled artifacts are written to
    cache_path: PathBuf,
    /// When false every render recompiles
    cache_enabled: bool,
    /// Source paths currently registered
    loaded: HashSet<PathBuf>,
}

impl Compiler {
    /// Create a compiler rooted at the given cache directory
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        debug!(?cache_path, "Compiler::new: called");
        Self {
            registry: Handlebars::new(),
            cache_path,
            cache_enabled: true,
            loaded: HashSet::new(),
        }
    }

    /// Enable or disable reuse of compiled templates
    pub fn with_cache(mut self, enabled: bool) -> Self {
        debug!(%enabled, "Compiler::with_cache: called");
        self.cache_enabled = enabled;
        self
    }

    /// Fail rendering on missing variables instead of printing nothing
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        debug!(%strict, "Compiler::with_strict_mode: called");
        self.registry.set_strict_mode(strict);
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Registry access for registering helpers and partials
    pub fn registry_mut(&mut self) -> &mut Handlebars<'static> {
        &mut self.registry
    }

    pub fn registry(&self) -> &Handlebars<'static> {
        &self.registry
    }

    /// Number of templates currently held compiled
    pub fn compiled_count(&self) -> usize {
        self.loaded.len()
    }

    /// Path of the compiled artifact for the source at `path`
    pub fn compiled_path(&self, path: &Path) -> PathBuf {
        let digest = md5::compute(template_key(path).as_bytes());
        self.cache_path.join(format!("{:x}.{}", digest, COMPILED_EXTENSION))
    }

    /// Whether `path` is registered in memory
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains(path)
    }

    /// Check whether the template at `path` needs compiling
    ///
    /// Expired when caching is off, when no artifact exists, or when the
    /// source is newer than or differs in size from its artifact.
    pub fn is_expired(&self, path: &Path) -> Result<bool> {
        if !self.cache_enabled {
            return Ok(true);
        }
        let compiled = match fs::metadata(self.compiled_path(path)) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let source = fs::metadata(path)?;

        let newer = match (source.modified(), compiled.modified()) {
            (Ok(source), Ok(compiled)) => source > compiled,
            _ => true,
        };
        Ok(newer || source.len() != compiled.len())
    }

    /// Compile the template at `path` and write its artifact
    pub fn compile(&mut self, path: &Path) -> Result<()> {
        debug!(?path, "Compiler::compile: called");
        let source = fs::read_to_string(path)?;
        self.registry.register_template_string(&template_key(path), &source)?;
        self.loaded.insert(path.to_path_buf());

        fs::create_dir_all(&self.cache_path)?;
        fs::write(self.compiled_path(path), &source)?;
        info!("Compiled template {}", path.display());
        Ok(())
    }

    /// Register the artifact of an unexpired template without touching its source
    pub fn load(&mut self, path: &Path) -> Result<()> {
        debug!(?path, "Compiler::load: called");
        let compiled = fs::read_to_string(self.compiled_path(path))?;
        self.registry.register_template_string(&template_key(path), compiled)?;
        self.loaded.insert(path.to_path_buf());
        Ok(())
    }

    /// Make the compiled template at `path` reachable as `{{> name}}`
    pub fn alias(&mut self, name: &str, path: &Path) {
        if let Some(template) = self.registry.get_template(&template_key(path)).cloned() {
            debug!(%name, ?path, "Compiler::alias: registered");
            self.registry.register_template(name, template);
        }
    }

    /// Partial names referenced by the compiled template at `path`
    pub fn partials(&self, path: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(template) = self.registry.get_template(&template_key(path)) {
            collect_partials(template, &mut names);
        }
        names
    }

    /// Render a compiled template
    pub fn render(&self, path: &Path, data: &Value) -> Result<String> {
        debug!(?path, "Compiler::render: called");
        Ok(self.registry.render(&template_key(path), data)?)
    }

    /// Drop the compiled form of `path` and its artifact
    pub fn forget(&mut self, path: &Path) {
        if self.loaded.remove(path) {
            debug!(?path, "Compiler::forget: evicted");
            self.registry.unregister_template(&template_key(path));
        }
        let compiled = self.compiled_path(path);
        match fs::remove_file(&compiled) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(?compiled, error = %e, "Failed to remove compiled template"),
        }
    }
}

fn template_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Walk a template tree collecting `{{> name}}` and `{{#> name}}` targets
fn collect_partials(template: &Template, names: &mut Vec<String>) {
    for element in &template.elements {
        match element {
            TemplateElement::PartialExpression(partial) | TemplateElement::PartialBlock(partial) => {
                if let Some(name) = partial.name.as_name() {
                    if !name.starts_with('@') && !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
                if let Some(inner) = &partial.template {
                    collect_partials(inner, names);
                }
            }
            TemplateElement::HelperBlock(helper) => {
                for inner in [&helper.template, &helper.inverse].into_iter().flatten() {
                    collect_partials(inner, names);
                }
            }
            TemplateElement::DecoratorBlock(decorator) => {
                if let Some(inner) = &decorator.template {
                    collect_partials(inner, names);
                }
            }
            _ => {}
        }
    }
}
