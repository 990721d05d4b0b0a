//! The `routes` command.

use std::fmt::Write as _;

use async_trait::async_trait;

use nextgisweb_core::NgwResult;
use nextgisweb_web::Configurator;

use crate::app::Application;
use crate::command::ManagementCommand;

/// Prints the routes registered by the components.
pub struct RoutesCommand;

#[async_trait]
impl ManagementCommand for RoutesCommand {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn help(&self) -> &'static str {
        "List configured routes"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, app: &Application) -> NgwResult<()> {
        let (_, config) = app.configurator()?;
        print!("{}", route_table(&config));
        Ok(())
    }
}

/// One line per route in registration order, then one per static view.
///
/// Routes without a view are marked, since they are not served.
pub fn route_table(config: &Configurator) -> String {
    let width = config
        .routes()
        .iter()
        .map(|r| r.name.len())
        .chain(config.static_views().iter().map(|s| s.prefix.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for route in config.routes() {
        let marker = if config.has_view(&route.name) { "" } else { " (no view)" };
        let _ = writeln!(out, "{:width$}  {}{marker}", route.name, route.pattern);
    }
    for view in config.static_views() {
        let _ = writeln!(
            out,
            "{:width$}  {} (static)",
            view.prefix,
            view.path.display()
        );
    }
    out
}
