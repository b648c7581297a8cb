//! Handlebars Template Driver
//!
//! Implements the view layer's template-handler contract on top of a
//! [`Factory`]: names are normalized per `auto_rule`, resolved against the
//! application's view directories and rendered to the output sink.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use viewfactory::{
    Compiler, CompilerEngine, EngineResolver, FILE_ENGINE, Factory, FileEngine, FileViewFinder, HANDLEBARS_ENGINE,
    Result, ViewData,
};

use crate::app::HostApp;
use crate::config::{DEFAULT_CACHE_DIR_NAME, ViewConfig};
use crate::helpers;
use crate::naming::transform_template_name;

/// The contract a view layer drives its template engine through
pub trait TemplateHandler {
    /// Check whether a template resolves to a file; never fails
    fn exists(&self, template: &str) -> bool;

    /// Render a named template to the output
    fn fetch(&mut self, template: &str, data: &ViewData) -> Result<()>;

    /// Render literal template content to the output
    fn display(&mut self, content: &str, data: &ViewData) -> Result<()>;

    /// Merge options and rebuild the engine
    fn config(&mut self, options: Map<String, Value>);

    /// Look up a single option
    fn get_config(&self, name: &str) -> Option<&Value>;
}

/// Template handler backed by handlebars
pub struct HandlebarsDriver<W: Write = Stdout> {
    app: Arc<dyn HostApp>,
    config: ViewConfig,
    factory: Factory,
    search_paths: Vec<PathBuf>,
    output: W,
}

impl HandlebarsDriver<Stdout> {
    /// Create a driver that writes to stdout
    pub fn new(app: Arc<dyn HostApp>, options: Map<String, Value>) -> Self {
        Self::with_output(app, options, io::stdout())
    }
}

impl<W: Write> HandlebarsDriver<W> {
    /// Create a driver that writes rendered output to `output`
    pub fn with_output(app: Arc<dyn HostApp>, options: Map<String, Value>, output: W) -> Self {
        debug!(root = ?app.root_path(), "HandlebarsDriver::with_output: called");
        let config = ViewConfig::from_map(options);
        let (factory, search_paths) = build_factory(app.as_ref(), &config);
        Self {
            app,
            config,
            factory,
            search_paths,
            output,
        }
    }

    /// Rebuild the factory and search paths from the current options
    fn initialize(&mut self) {
        debug!("HandlebarsDriver::initialize: called");
        let (factory, search_paths) = build_factory(self.app.as_ref(), &self.config);
        self.factory = factory;
        self.search_paths = search_paths;
    }

    /// Apply the configured `auto_rule` to a template identifier
    pub fn transform_template_name(&self, template: &str) -> String {
        transform_template_name(template, self.config.auto_rule())
    }

    /// Register hint paths for `name::view` identifiers
    pub fn add_namespace(&mut self, name: &str, path: impl Into<PathBuf>) {
        debug!(%name, "HandlebarsDriver::add_namespace: called");
        self.factory.add_namespace(name, vec![path.into()]);
    }

    /// Directory for compiled templates and inline scratch files
    pub fn cache_path(&self) -> PathBuf {
        cache_path(self.app.as_ref(), &self.config)
    }

    /// View directories in lookup order
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn view_config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Per-call data plus the host's CSRF token when the caller gave none
    fn request_data<'a>(&self, data: &'a ViewData) -> Cow<'a, ViewData> {
        if data.contains_key(helpers::CSRF_CONTEXT_KEY) {
            return Cow::Borrowed(data);
        }
        match self.app.csrf_token() {
            Some(token) => {
                let mut data = data.clone();
                data.insert(helpers::CSRF_CONTEXT_KEY.to_string(), Value::String(token));
                Cow::Owned(data)
            }
            None => Cow::Borrowed(data),
        }
    }

    fn write(&mut self, rendered: &str) -> Result<()> {
        self.output.write_all(rendered.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }
}

impl<W: Write> TemplateHandler for HandlebarsDriver<W> {
    fn exists(&self, template: &str) -> bool {
        let name = self.transform_template_name(template);
        match self.factory.find(&name) {
            Ok(path) => {
                debug!(%name, ?path, "HandlebarsDriver::exists: found");
                true
            }
            Err(e) => {
                debug!(%name, error = %e, "HandlebarsDriver::exists: lookup failed");
                false
            }
        }
    }

    fn fetch(&mut self, template: &str, data: &ViewData) -> Result<()> {
        debug!(%template, "HandlebarsDriver::fetch: called");
        let name = self.transform_template_name(template);
        let data = self.request_data(data);
        let rendered = self.factory.render(&name, &data)?;
        self.write(&rendered)
    }

    fn display(&mut self, content: &str, data: &ViewData) -> Result<()> {
        debug!(content_len = content.len(), "HandlebarsDriver::display: called");
        let cache_path = self.cache_path();
        fs::create_dir_all(&cache_path)?;

        let extension = self
            .config
            .view_suffixes()
            .into_iter()
            .next()
            .unwrap_or_else(|| "hbs".to_string());
        let temp = InlineView::create(&cache_path, content, &extension)?;

        let data = self.request_data(data);
        let rendered = self.factory.file(temp.path(), &data);
        self.factory.forget(temp.path());
        drop(temp);

        self.write(&rendered?)
    }

    fn config(&mut self, options: Map<String, Value>) {
        self.config.merge(options);
        self.initialize();
    }

    fn get_config(&self, name: &str) -> Option<&Value> {
        self.config.get(name)
    }
}

/// File name used for inline content: `md5(content).extension`
pub fn inline_view_name(content: &str, extension: &str) -> String {
    format!("{:x}.{}", md5::compute(content.as_bytes()), extension)
}

/// Inline template content materialized on disk; removed on drop
struct InlineView {
    path: PathBuf,
}

impl InlineView {
    fn create(dir: &Path, content: &str, extension: &str) -> io::Result<Self> {
        let view = Self {
            path: dir.join(inline_view_name(content, extension)),
        };
        debug!(path = ?view.path, "InlineView::create: writing");
        fs::write(&view.path, content)?;
        Ok(view)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InlineView {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "InlineView::drop: removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove inline view"),
        }
    }
}

/// Cache directory: `cache_path` option, else `{runtime}/view`
fn cache_path(app: &dyn HostApp, config: &ViewConfig) -> PathBuf {
    config
        .cache_path()
        .unwrap_or_else(|| app.runtime_path().join(DEFAULT_CACHE_DIR_NAME))
}

/// View directories that exist, in lookup order
///
/// `{root}/{view_dir}` first, then `{app}/{module}/{view_dir}` for each
/// declared module, or `{app}/{view_dir}` when no modules are declared.
pub fn search_paths(app: &dyn HostApp, view_dir_name: &str) -> Vec<PathBuf> {
    let mut candidates = vec![app.root_path().join(view_dir_name)];

    if app.modules().is_empty() {
        candidates.push(app.app_path().join(view_dir_name));
    } else {
        candidates.extend(
            app.modules()
                .iter()
                .map(|module| app.app_path().join(module).join(view_dir_name)),
        );
    }

    candidates
        .into_iter()
        .filter(|path| {
            let found = path.is_dir();
            debug!(?path, %found, "search_paths: candidate");
            found
        })
        .collect()
}

fn build_factory(app: &dyn HostApp, config: &ViewConfig) -> (Factory, Vec<PathBuf>) {
    let cache_path = cache_path(app, config);
    let mut compiler = Compiler::new(cache_path.clone())
        .with_cache(config.tpl_cache())
        .with_strict_mode(config.strict_variables());
    helpers::register_helpers(compiler.registry_mut());

    let mut resolver = EngineResolver::new();
    resolver.register(FILE_ENGINE, Box::new(FileEngine));
    resolver.register(HANDLEBARS_ENGINE, Box::new(CompilerEngine::new(compiler)));

    let paths = search_paths(app, config.view_dir_name());
    let extensions = config.view_suffixes();
    let finder = FileViewFinder::new(paths.clone(), extensions.clone());
    let mut factory = Factory::new(resolver, Box::new(finder));

    // add_extension prepends, so walk backwards to keep configured priority
    for extension in extensions.iter().rev() {
        factory.add_extension(extension, HANDLEBARS_ENGINE);
    }
    factory.share("app", app.to_shared());

    info!(
        "View driver initialized: {} search path(s), extensions [{}], cache {}",
        paths.len(),
        extensions.join(","),
        cache_path.display()
    );
    (factory, paths)
}
