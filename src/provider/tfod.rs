//! TensorFlow Object Detection API providers
//!
//! Pretrained checkpoints come from the TF1 detection model zoo.

use crate::detector::config::{ParamKind, ParamValue};
use crate::provider::DetectorProvider;

const FASTER_RCNN_RESNET101_URL: &str =
    "http://download.tensorflow.org/models/object_detection/faster_rcnn_resnet101_coco_2018_01_28.tar.gz";

const SSD_MOBILENET_V2_URL: &str =
    "http://download.tensorflow.org/models/object_detection/ssd_mobilenet_v2_coco_2018_03_29.tar.gz";

/// Faster R-CNN with a ResNet-101 backbone, COCO-pretrained
#[derive(Debug, Clone, Copy, Default)]
pub struct TfodFasterRcnnResnet101;

impl DetectorProvider for TfodFasterRcnnResnet101 {
    fn name(&self) -> &'static str {
        "TFODFasterRCNNResNet101"
    }

    fn pretrained_model_url(&self) -> &str {
        FASTER_RCNN_RESNET101_URL
    }

    fn pipeline_config_template(&self) -> &str {
        include_str!("templates/faster_rcnn_resnet101.config")
    }

    fn required_parameters(&self) -> &[&'static str] {
        &["batch_size"]
    }

    fn required_parameter_kind(&self, name: &str) -> Option<ParamKind> {
        batch_size_kind(name)
    }

    fn optional_parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("num_steps", ParamValue::Int(20000)),
            ("learning_rate", ParamValue::Float(0.0003)),
            ("min_dimension", ParamValue::Int(600)),
            ("max_dimension", ParamValue::Int(1024)),
            ("num_eval_examples", ParamValue::Int(500)),
        ]
    }
}

/// SSD with a MobileNet V2 backbone, COCO-pretrained; fast enough for edge devices
#[derive(Debug, Clone, Copy, Default)]
pub struct TfodSsdMobilenetV2;

impl DetectorProvider for TfodSsdMobilenetV2 {
    fn name(&self) -> &'static str {
        "TFODSSDMobileNetV2"
    }

    fn pretrained_model_url(&self) -> &str {
        SSD_MOBILENET_V2_URL
    }

    fn pipeline_config_template(&self) -> &str {
        include_str!("templates/ssd_mobilenet_v2.config")
    }

    fn required_parameters(&self) -> &[&'static str] {
        &["batch_size"]
    }

    fn required_parameter_kind(&self, name: &str) -> Option<ParamKind> {
        batch_size_kind(name)
    }

    fn optional_parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("num_steps", ParamValue::Int(20000)),
            ("learning_rate", ParamValue::Float(0.004)),
            ("image_size", ParamValue::Int(300)),
            ("num_eval_examples", ParamValue::Int(500)),
        ]
    }
}

fn batch_size_kind(name: &str) -> Option<ParamKind> {
    (name == "batch_size").then_some(ParamKind::Int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PipelineTemplate;

    fn declared(provider: &dyn DetectorProvider) -> Vec<String> {
        let mut keys: Vec<String> = provider
            .required_parameters()
            .iter()
            .map(|k| k.to_string())
            .chain(provider.optional_parameters().into_iter().map(|(k, _)| k.to_string()))
            .collect();
        keys.extend(
            [
                "num_classes",
                "fine_tune_checkpoint",
                "train_input_path",
                "eval_input_path",
                "label_map_path",
            ]
            .map(String::from),
        );
        keys
    }

    #[test]
    fn templates_only_reference_declared_parameters() {
        let providers: [&dyn DetectorProvider; 2] = [&TfodFasterRcnnResnet101, &TfodSsdMobilenetV2];
        for provider in providers {
            let template = PipelineTemplate::parse(provider.pipeline_config_template()).unwrap();
            let declared = declared(provider);
            for placeholder in template.placeholders() {
                assert!(
                    declared.iter().any(|d| d == placeholder),
                    "{} template uses undeclared {}",
                    provider.name(),
                    placeholder
                );
            }
        }
    }

    #[test]
    fn cache_keys_are_per_implementation() {
        assert_eq!(
            TfodFasterRcnnResnet101.pretrained_model_cache_key(),
            "TFODFasterRCNNResNet101-pretrained-model"
        );
        assert_ne!(
            TfodFasterRcnnResnet101.pretrained_model_cache_key(),
            TfodSsdMobilenetV2.pretrained_model_cache_key()
        );
    }

    #[test]
    fn batch_size_must_be_an_integer() {
        let providers: [&dyn DetectorProvider; 2] = [&TfodFasterRcnnResnet101, &TfodSsdMobilenetV2];
        for provider in providers {
            assert_eq!(provider.required_parameter_kind("batch_size"), Some(ParamKind::Int));
            assert_eq!(provider.required_parameter_kind("num_steps"), None);
        }
    }

    #[test]
    fn urls_are_tarballs() {
        assert!(TfodFasterRcnnResnet101.pretrained_model_url().ends_with(".tar.gz"));
        assert!(TfodSsdMobilenetV2.pretrained_model_url().ends_with(".tar.gz"));
    }
}
