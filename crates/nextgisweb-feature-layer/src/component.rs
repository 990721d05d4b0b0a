//! The `feature_layer` component.

use nextgisweb_core::{Component, Env, NgwResult};
use nextgisweb_db::Metadata;
use nextgisweb_resource::ResourceRegistry;
use nextgisweb_web::{Configurator, WebComponent};

use crate::api;
use crate::field::LAYER_FIELD_META;
use crate::layer::{FEATURE_LAYER, FEATURE_LAYER_META};
use crate::style::{FEATURE_LAYER_STYLE, FEATURE_LAYER_STYLE_META};

/// Registers the layer tables and resource classes and serves the API.
///
/// Requires the database, resource and file storage components to be
/// registered before it.
#[derive(Debug, Default)]
pub struct FeatureLayerComponent;

impl Component for FeatureLayerComponent {
    fn identity(&self) -> &'static str {
        "feature_layer"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn initialize(&self, env: &mut Env) -> NgwResult<()> {
        let metadata = env.service::<Metadata>()?;
        metadata.add(&LAYER_FIELD_META)?;
        metadata.add(&FEATURE_LAYER_META)?;
        metadata.add(&FEATURE_LAYER_STYLE_META)?;

        let registry = env.service::<ResourceRegistry>()?;
        registry.register(FEATURE_LAYER)?;
        registry.register(FEATURE_LAYER_STYLE)?;
        Ok(())
    }
}

impl WebComponent for FeatureLayerComponent {
    fn setup_routes(&self, config: &mut Configurator) -> NgwResult<()> {
        api::setup_routes(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextgisweb_core::Settings;
    use std::sync::Arc;

    #[test]
    fn test_registers_tables_and_classes() {
        let mut env = Env::new(Settings::default());
        env.provide(Arc::new(Metadata::new()));
        env.provide(Arc::new(ResourceRegistry::new()));
        FeatureLayerComponent.initialize(&mut env).unwrap();

        assert_eq!(
            env.service::<Metadata>().unwrap().table_names().unwrap(),
            vec!["layer_field", "feature_layer", "feature_layer_style"]
        );
        let registry = env.service::<ResourceRegistry>().unwrap();
        assert_eq!(
            registry.get("feature_layer_style").unwrap().display_name,
            "Feature layer style"
        );
    }

    #[test]
    fn test_routes() {
        let mut config = Configurator::new(serde_json::Map::new());
        FeatureLayerComponent.setup_routes(&mut config).unwrap();
        assert_eq!(
            config
                .route_path("feature_layer.fields", &[("id", "7")])
                .unwrap(),
            "/api/resource/7/feature_layer"
        );
        assert!(config.has_view("feature_layer_style.file"));
    }
}
