//! # nextgisweb-cli
//!
//! Management commands for nextgisweb.
//!
//! ```rust
//! use nextgisweb_cli::commands::register_builtin_commands;
//! use nextgisweb_cli::CommandRegistry;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//! assert_eq!(registry.list_commands(), vec!["initialize_db", "routes", "serve"]);
//! ```

#![allow(clippy::result_large_err)]

pub mod app;
pub mod command;
pub mod commands;

pub use app::{initialize_db, Application, ComponentFactory};
pub use command::{load_settings, CommandRegistry, ManagementCommand, CONFIG_ARG};

use std::ffi::OsString;

use nextgisweb_core::{logging, ComponentRegistry, NgwResult};
use nextgisweb_web::WebComponent;

/// Parses `args`, loads settings and logging, then runs the chosen command.
///
/// Invalid arguments and `--help` print and exit the process, as clap does.
pub async fn execute_from_args<I, T, F>(args: I, components: F) -> NgwResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: Fn() -> NgwResult<ComponentRegistry<dyn WebComponent>> + Send + Sync + 'static,
{
    let mut registry = CommandRegistry::new();
    commands::register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches_from(args);
    let settings = load_settings(&matches)?;
    logging::setup_logging(&settings);

    registry
        .execute(&matches, &Application::new(settings, components))
        .await
}
