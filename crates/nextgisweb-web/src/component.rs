//! Web hooks of components.

use nextgisweb_core::{Component, NgwResult};
use nextgisweb_db::DbComponent;

use crate::config::Configurator;

/// A component that takes part in building the web application.
///
/// During bootstrap every component's [`setup_pyramid`](Self::setup_pyramid)
/// runs first, in registration order, followed by every component's
/// [`setup_routes`](Self::setup_routes), again in registration order. A
/// route registered in `setup_pyramid` is therefore visible to all
/// `setup_routes` hooks.
pub trait WebComponent: Component {
    /// Adjusts the configurator: policies, request properties, static views.
    fn setup_pyramid(&self, _config: &mut Configurator) -> NgwResult<()> {
        Ok(())
    }

    /// Registers routes and views.
    fn setup_routes(&self, _config: &mut Configurator) -> NgwResult<()> {
        Ok(())
    }
}

impl WebComponent for DbComponent {}
