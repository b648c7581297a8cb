//! ViewDriver - handlebars templates behind a controller/action view layer
//!
//! A web application's view layer asks its template handler four things:
//! does a template exist, render a named template, render literal template
//! content, and reconfigure. [`HandlebarsDriver`] answers them by
//! normalizing `group/action` names, searching the application's view
//! directories and rendering through a [`viewfactory::Factory`].
//!
//! # Layout
//!
//! ```text
//! {root}/view/                 # searched first
//! {app}/{module}/view/         # one per declared module, or
//! {app}/view/                  # single-module layout
//! {runtime}/view/              # compiled cache + inline scratch files
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use viewdriver::{App, HandlebarsDriver, TemplateHandler};
//!
//! let app = Arc::new(App::new("/srv/site").with_modules(["index", "admin"]));
//! let mut driver = HandlebarsDriver::new(app, Default::default());
//! if driver.exists("user/getUserInfo") {
//!     driver.fetch("user/getUserInfo", &Default::default())?;
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod driver;
pub mod helpers;
pub mod naming;

pub use app::{App, HostApp};
pub use config::ViewConfig;
pub use driver::{HandlebarsDriver, TemplateHandler, inline_view_name, search_paths};
pub use naming::{AutoRule, camel_to_snake, transform_template_name};
pub use viewfactory::{Result, ViewData, ViewError};
