//! ViewFactory - file-based views rendered through handlebars
//!
//! A view name resolves to a file through a [`ViewFinder`]; the file's
//! extension selects an [`Engine`] that turns it into output text.
//!
//! # Architecture
//!
//! ```text
//! Factory
//! ├── ViewFinder      # name -> path (search paths, namespaces, extensions)
//! └── EngineResolver
//!     ├── file        # pass-through
//!     └── handlebars  # CompilerEngine -> Compiler (compiled-template cache)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use viewfactory::{Compiler, CompilerEngine, EngineResolver, Factory, FileViewFinder};
//!
//! let mut resolver = EngineResolver::new();
//! resolver.register("handlebars", Box::new(CompilerEngine::new(Compiler::new("runtime/view"))));
//! let finder = FileViewFinder::new(vec!["view".into()], vec!["hbs".into()]);
//! let mut factory = Factory::new(resolver, Box::new(finder));
//! let html = factory.render("index/index", &Default::default())?;
//! ```

mod compiler;
mod engine;
mod error;
mod factory;
mod finder;

pub use compiler::{COMPILED_EXTENSION, Compiler};
pub use engine::{CompilerEngine, Engine, EngineResolver, FILE_ENGINE, FileEngine, HANDLEBARS_ENGINE};
pub use error::{Result, ViewError};
pub use factory::{Factory, ViewData};
pub use finder::{FileViewFinder, HINT_PATH_DELIMITER, ViewFinder};
