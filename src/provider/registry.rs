//! Provider registry
//!
//! Built once at startup and passed by reference to whatever needs to select
//! a provider. Enumeration order is registration order.

use crate::detector::config::ParamValue;
use crate::error::{TpodError, TpodResult};
use crate::provider::tfod::{TfodFasterRcnnResnet101, TfodSsdMobilenetV2};
use crate::provider::DetectorProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Constructs a provider implementation
pub type ProviderFactory = fn() -> Arc<dyn DetectorProvider>;

/// A registered detector type
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Identifier stored by callers (e.g. in database records)
    pub type_id: String,
    /// Human-readable name
    pub display_name: String,
    pub factory: ProviderFactory,
}

/// Training parameters a detector type accepts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderParameters {
    pub required: Vec<String>,
    pub optional: BTreeMap<String, ParamValue>,
}

/// Registry of detector types
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in detector type
    pub fn builtin() -> TpodResult<Self> {
        let mut registry = Self::new();
        registry.register(
            "tensorflow_faster_rcnn_resnet101",
            "Tensorflow Faster-RCNN ResNet 101",
            || Arc::new(TfodFasterRcnnResnet101),
        )?;
        registry.register(
            "tensorflow_ssd_mobilenet_v2",
            "Tensorflow SSD MobileNet V2",
            || Arc::new(TfodSsdMobilenetV2),
        )?;
        Ok(registry)
    }

    /// Add a detector type; duplicate ids are rejected
    pub fn register(
        &mut self,
        type_id: &str,
        display_name: &str,
        factory: ProviderFactory,
    ) -> TpodResult<()> {
        if self.descriptors.iter().any(|d| d.type_id == type_id) {
            return Err(TpodError::RegistrationConflict(type_id.to_string()));
        }

        debug!("Registered detector type {}", type_id);
        self.descriptors.push(ProviderDescriptor {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            factory,
        });
        Ok(())
    }

    /// Find the descriptor for a type id
    pub fn lookup(&self, type_id: &str) -> TpodResult<&ProviderDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.type_id == type_id)
            .ok_or_else(|| TpodError::UnknownProviderType(type_id.to_string()))
    }

    /// Instantiate the provider for a type id
    pub fn create(&self, type_id: &str) -> TpodResult<Arc<dyn DetectorProvider>> {
        self.lookup(type_id).map(|d| (d.factory)())
    }

    /// `(type_id, display_name)` pairs in registration order
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.descriptors
            .iter()
            .map(|d| (d.type_id.as_str(), d.display_name.as_str()))
            .collect()
    }

    /// Required and optional parameters of a type
    pub fn describe(&self, type_id: &str) -> TpodResult<ProviderParameters> {
        let provider = self.create(type_id)?;
        Ok(ProviderParameters {
            required: provider
                .required_parameters()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            optional: provider
                .optional_parameters()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl DetectorProvider for Bare {
        fn name(&self) -> &'static str {
            "Bare"
        }

        fn pretrained_model_url(&self) -> &str {
            "http://models.example/bare.tar.gz"
        }

        fn pipeline_config_template(&self) -> &str {
            ""
        }
    }

    fn bare() -> Arc<dyn DetectorProvider> {
        Arc::new(Bare)
    }

    #[test]
    fn builtin_lists_in_registration_order() {
        let registry = ProviderRegistry::builtin().unwrap();
        let types = registry.list();
        assert_eq!(
            types,
            vec![
                (
                    "tensorflow_faster_rcnn_resnet101",
                    "Tensorflow Faster-RCNN ResNet 101"
                ),
                ("tensorflow_ssd_mobilenet_v2", "Tensorflow SSD MobileNet V2"),
            ]
        );
        assert_eq!(registry.list(), types);
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = ProviderRegistry::new();
        registry.register("bare", "Bare", bare).unwrap();

        let err = registry.register("bare", "Bare again", bare).unwrap_err();
        assert!(matches!(err, TpodError::RegistrationConflict(id) if id == "bare"));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn unknown_type_is_client_error() {
        let registry = ProviderRegistry::builtin().unwrap();
        let err = registry.lookup("yolo_v9").unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, TpodError::UnknownProviderType(_)));
        assert!(registry.describe("yolo_v9").is_err());
    }

    #[test]
    fn create_uses_factory() {
        let registry = ProviderRegistry::builtin().unwrap();
        let provider = registry.create("tensorflow_ssd_mobilenet_v2").unwrap();
        assert_eq!(provider.name(), "TFODSSDMobileNetV2");
    }

    #[test]
    fn describe_reports_parameters() {
        let registry = ProviderRegistry::builtin().unwrap();
        let params = registry.describe("tensorflow_faster_rcnn_resnet101").unwrap();
        assert_eq!(params.required, vec!["batch_size"]);
        assert_eq!(params.optional.get("num_steps"), Some(&ParamValue::Int(20000)));

        let mut registry = ProviderRegistry::new();
        registry.register("bare", "Bare", bare).unwrap();
        let params = registry.describe("bare").unwrap();
        assert!(params.required.is_empty());
        assert!(params.optional.is_empty());
    }
}
