//! Management command framework.
//!
//! A [`ManagementCommand`] contributes a clap subcommand and an async
//! handler. The [`CommandRegistry`] assembles them into the `nextgisweb`
//! command line and dispatches parsed arguments.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use nextgisweb_cli::{Application, ManagementCommand};
//! use nextgisweb_core::NgwResult;
//!
//! struct Components;
//!
//! #[async_trait]
//! impl ManagementCommand for Components {
//!     fn name(&self) -> &'static str { "components" }
//!     fn help(&self) -> &'static str { "List components" }
//!
//!     async fn handle(&self, _matches: &clap::ArgMatches, app: &Application) -> NgwResult<()> {
//!         let (_, registry) = app.env()?;
//!         for identity in registry.identities() {
//!             println!("{identity}");
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use nextgisweb_core::{settings_loader, NgwError, NgwResult, Settings};

use crate::app::Application;

/// Name of the global option pointing at the settings file.
pub const CONFIG_ARG: &str = "config";

#[async_trait]
pub trait ManagementCommand: Send + Sync {
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    /// Adds custom arguments to the clap subcommand.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    async fn handle(&self, matches: &clap::ArgMatches, app: &Application) -> NgwResult<()>;
}

/// Commands by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing one with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Sorted command names.
    pub fn list_commands(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level command with every registered subcommand.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("nextgisweb")
            .about("nextgisweb management utility")
            .subcommand_required(true)
            .arg(
                clap::Arg::new(CONFIG_ARG)
                    .long(CONFIG_ARG)
                    .global(true)
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Settings file (TOML, or JSON with a .json extension)"),
            );

        for (name, cmd) in &self.commands {
            let subcmd = clap::Command::new(*name).about(cmd.help());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }
        app
    }

    /// Dispatches to the subcommand named in `matches`.
    pub async fn execute(&self, matches: &clap::ArgMatches, app: &Application) -> NgwResult<()> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| NgwError::ConfigurationError("No subcommand specified".to_string()))?;

        let cmd = self
            .get(name)
            .ok_or_else(|| NgwError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "Running management command");
        cmd.handle(sub_matches, app).await
    }
}

/// Reads settings from `--config` when given, otherwise from the
/// environment alone.
pub fn load_settings(matches: &clap::ArgMatches) -> NgwResult<Settings> {
    matches.get_one::<PathBuf>(CONFIG_ARG).map_or_else(
        || Ok(settings_loader::from_env()),
        settings_loader::from_file_with_env,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use nextgisweb_core::ComponentRegistry;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ManagementCommand for Counting {
        fn name(&self) -> &'static str {
            "count"
        }

        fn help(&self) -> &'static str {
            "Counts invocations"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(
                clap::Arg::new("verbose")
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue),
            )
        }

        async fn handle(&self, matches: &clap::ArgMatches, _app: &Application) -> NgwResult<()> {
            let step = if matches.get_flag("verbose") { 10 } else { 1 };
            self.calls.fetch_add(step, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl ManagementCommand for Failing {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn help(&self) -> &'static str {
            "Always fails"
        }

        async fn handle(&self, _matches: &clap::ArgMatches, _app: &Application) -> NgwResult<()> {
            Err(NgwError::ConfigurationError("deliberate failure".to_string()))
        }
    }

    fn app() -> Application {
        Application::new(Settings::default(), || Ok(ComponentRegistry::new()))
    }

    #[test]
    fn test_list_commands_sorted() {
        let mut registry = CommandRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(Failing));
        registry.register(Box::new(Counting {
            calls: Arc::default(),
        }));
        registry.register(Box::new(Failing));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list_commands(), vec!["count", "fail"]);
        assert_eq!(registry.get("fail").unwrap().help(), "Always fails");
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_execute_dispatches_with_arguments() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Counting {
            calls: calls.clone(),
        }));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["nextgisweb", "count", "--verbose"])
            .unwrap();
        registry.execute(&matches, &app()).await.unwrap();

        let matches = registry
            .build_cli()
            .try_get_matches_from(["nextgisweb", "count"])
            .unwrap();
        registry.execute(&matches, &app()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_execute_propagates_failure() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Failing));
        let matches = registry
            .build_cli()
            .try_get_matches_from(["nextgisweb", "fail"])
            .unwrap();
        assert!(matches!(
            registry.execute(&matches, &app()).await,
            Err(NgwError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_subcommand_is_required() {
        let registry = CommandRegistry::new();
        assert!(registry.build_cli().try_get_matches_from(["nextgisweb"]).is_err());
    }

    #[test]
    fn test_load_settings_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n[components.pyramid]\nsecret = \"abc\"\n",
        )
        .unwrap();

        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Failing));
        let matches = registry
            .build_cli()
            .try_get_matches_from(["nextgisweb", "fail", "--config", path.to_str().unwrap()])
            .unwrap();
        let settings = load_settings(&matches).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.components["pyramid"]["secret"], "abc");
    }

    #[test]
    fn test_load_settings_missing_file() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Failing));
        let matches = registry
            .build_cli()
            .try_get_matches_from(["nextgisweb", "--config", "/nonexistent/ngw.toml", "fail"])
            .unwrap();
        assert!(load_settings(&matches).is_err());
    }
}
