//! The `resource` component.

use std::sync::Arc;

use nextgisweb_core::{Component, Env, NgwResult};
use nextgisweb_db::Metadata;
use nextgisweb_web::WebComponent;

use crate::model::{RESOURCE_ACL_META, RESOURCE_META};
use crate::registry::ResourceRegistry;

/// Owns the resource tables and the [`ResourceRegistry`].
///
/// Must be registered after the database component and before any
/// component that registers resource classes.
#[derive(Debug, Default)]
pub struct ResourceComponent;

impl Component for ResourceComponent {
    fn identity(&self) -> &'static str {
        "resource"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn initialize(&self, env: &mut Env) -> NgwResult<()> {
        let metadata = env.service::<Metadata>()?;
        metadata.add(&RESOURCE_META)?;
        metadata.add(&RESOURCE_ACL_META)?;
        env.provide(Arc::new(ResourceRegistry::new()));
        Ok(())
    }
}

impl WebComponent for ResourceComponent {}

#[cfg(test)]
mod tests {
    use super::*;
    use nextgisweb_core::{NgwError, Settings};

    #[test]
    fn test_requires_metadata() {
        let mut env = Env::new(Settings::default());
        assert!(matches!(
            ResourceComponent.initialize(&mut env),
            Err(NgwError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_registers_tables_and_registry() {
        let mut env = Env::new(Settings::default());
        env.provide(Arc::new(Metadata::new()));
        ResourceComponent.initialize(&mut env).unwrap();

        let tables = env.service::<Metadata>().unwrap().table_names().unwrap();
        assert_eq!(tables, vec!["resource", "resource_acl"]);
        assert!(env
            .service::<ResourceRegistry>()
            .unwrap()
            .get("resource_group")
            .is_ok());
    }
}
