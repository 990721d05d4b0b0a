//! The `initialize_db` command.

use async_trait::async_trait;

use nextgisweb_core::NgwResult;

use crate::app::{initialize_db, Application};
use crate::command::ManagementCommand;

/// Creates the tables of every component. Existing tables are kept.
pub struct InitializeDbCommand;

#[async_trait]
impl ManagementCommand for InitializeDbCommand {
    fn name(&self) -> &'static str {
        "initialize_db"
    }

    fn help(&self) -> &'static str {
        "Create database tables"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, app: &Application) -> NgwResult<()> {
        let (env, _) = app.env()?;
        let tables = initialize_db(&env).await?;
        tracing::info!(
            database = %app.settings().database.path.display(),
            tables = tables.len(),
            "Database initialized"
        );
        Ok(())
    }
}
