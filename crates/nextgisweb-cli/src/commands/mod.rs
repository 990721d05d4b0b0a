//! Built-in management commands.

mod initialize_db;
mod routes;
mod serve;

pub use initialize_db::InitializeDbCommand;
pub use routes::{route_table, RoutesCommand};
pub use serve::ServeCommand;

use crate::command::CommandRegistry;

/// Registers `serve`, `routes` and `initialize_db`.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(ServeCommand));
    registry.register(Box::new(RoutesCommand));
    registry.register(Box::new(InitializeDbCommand));
}
