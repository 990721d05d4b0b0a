//! # nextgisweb-feature-layer
//!
//! Field schemas of vector layers and layer styles.
//!
//! ## Modules
//!
//! - [`interface`] - [`FieldType`] and the feature layer interfaces
//! - [`field`] - [`LayerField`] and the ordered [`LayerFields`] collection
//! - [`layer`] - The [`LayerFieldsMixin`] contract and [`FeatureLayer`]
//! - [`style`] - [`FeatureLayerStyle`]
//! - [`serializer`] - The `feature_layer` and `feature_layer_style` serializers
//! - [`api`] - HTTP endpoints
//! - [`component`] - The `feature_layer` component

#![allow(clippy::result_large_err)]

pub mod api;
pub mod component;
pub mod field;
pub mod interface;
pub mod layer;
pub mod serializer;
pub mod style;

pub use component::FeatureLayerComponent;
pub use field::{LayerField, LayerFields, LAYER_FIELD};
pub use interface::{FieldType, IFEATURE_LAYER, IFEATURE_LAYER_STYLE};
pub use layer::{FeatureLayer, LayerFieldsMixin, FEATURE_LAYER};
pub use serializer::{
    apply_fields, feature_layer_serializer, feature_layer_style_serializer, FieldsAttr,
    FileUploadAttr,
};
pub use style::{FeatureLayerStyle, FEATURE_LAYER_STYLE};
