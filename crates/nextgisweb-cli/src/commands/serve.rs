//! The `serve` command.

use async_trait::async_trait;

use nextgisweb_core::NgwResult;

use crate::app::{initialize_db, Application};
use crate::command::ManagementCommand;

/// Bootstraps the application and serves it over HTTP.
pub struct ServeCommand;

#[async_trait]
impl ManagementCommand for ServeCommand {
    fn name(&self) -> &'static str {
        "serve"
    }

    fn help(&self) -> &'static str {
        "Serve the web application"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("host")
                .long("host")
                .default_value("127.0.0.1")
                .help("Host to bind to"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .default_value("8080")
                .value_parser(clap::value_parser!(u16))
                .help("Port to bind to"),
        )
        .arg(
            clap::Arg::new("initialize-db")
                .long("initialize-db")
                .action(clap::ArgAction::SetTrue)
                .help("Create missing tables before serving"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, app: &Application) -> NgwResult<()> {
        let host = matches
            .get_one::<String>("host")
            .map_or("127.0.0.1", String::as_str);
        let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

        let (env, config) = app.configurator()?;
        if matches.get_flag("initialize-db") {
            initialize_db(&env).await?;
        }
        tracing::info!(
            routes = config.routes().len(),
            debug = app.settings().debug,
            "Application configured"
        );

        nextgisweb_web::server::serve(config.into_router(), &format!("{host}:{port}")).await
    }
}
