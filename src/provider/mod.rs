//! Detector providers
//!
//! A provider is one trainable model family. Every provider supplies the same
//! capability set: where its pretrained model lives, the pipeline config
//! template it renders, and the training parameters it requires or defaults.
//! Providers are selected by type id through a [`ProviderRegistry`].

pub mod registry;
pub mod template;
pub mod tfod;

pub use registry::{ProviderDescriptor, ProviderFactory, ProviderParameters, ProviderRegistry};
pub use template::PipelineTemplate;
pub use tfod::{TfodFasterRcnnResnet101, TfodSsdMobilenetV2};

use crate::detector::config::{ParamKind, ParamValue};

/// Capability contract every detector type implements
pub trait DetectorProvider: Send + Sync {
    /// Implementation identity, stable across releases (used for cache keys)
    fn name(&self) -> &'static str;

    /// URL of the pretrained model archive to fine-tune from
    fn pretrained_model_url(&self) -> &str;

    /// Pipeline config template text with `${name}` placeholders
    fn pipeline_config_template(&self) -> &str;

    /// Parameters the caller must supply
    fn required_parameters(&self) -> &[&'static str] {
        &[]
    }

    /// Kind a required parameter must have; `None` accepts any value
    fn required_parameter_kind(&self, _name: &str) -> Option<ParamKind> {
        None
    }

    /// Parameters with defaults, applied only when the caller left them out
    fn optional_parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![]
    }

    /// Cache key of this provider's pretrained model
    fn pretrained_model_cache_key(&self) -> String {
        format!("{}-pretrained-model", self.name())
    }
}
