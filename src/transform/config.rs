// Transform configuration surface
//
// Each transform kind is identified by a stable discriminator string so a
// chain can live outside the process: a JSON file next to the archive, a
// column in some store, a management API payload. Reconstitution is a switch
// on the discriminator; an unknown discriminator is a configuration error.

use super::{
    BodyToHeaderTransform, ConstantTransform, HeaderInjectionTransform, HeaderToHeaderTransform,
    RequestTransform,
};
use crate::error::ReplayError;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Serializable description of one transform. The `type` field carries the
/// discriminator; the remaining fields are the kind's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformConfig {
    ConstantTransform {
        search: String,
        replace: String,
    },
    HeaderInjectionTransform {
        key: String,
        value: String,
    },
    BodyToHeaderTransform {
        pattern: String,
        header_name: String,
        #[serde(default)]
        before: String,
        #[serde(default)]
        after: String,
    },
    HeaderToHeaderTransform {
        /// Blank means every response header is checked for the pattern.
        #[serde(default)]
        response_key: String,
        pattern: String,
        request_key: String,
        #[serde(default)]
        before: String,
        #[serde(default)]
        after: String,
    },
}

const KNOWN_TYPES: &[&str] = &[
    "ConstantTransform",
    "HeaderInjectionTransform",
    "BodyToHeaderTransform",
    "HeaderToHeaderTransform",
];

impl TransformConfig {
    /// Parse one `{ "type": ..., ... }` object, distinguishing "we don't know
    /// this discriminator" from "the payload is malformed".
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(|tag| tag.as_str())
            .unwrap_or_default();
        if !KNOWN_TYPES.contains(&tag) {
            return Err(ReplayError::UnknownTransformType(tag.to_string()).into());
        }
        serde_json::from_value(value.clone())
            .with_context(|| format!("Malformed {} payload", tag))
    }

    /// Reconstitute the runnable transform. Patterns compile here, so a bad
    /// regex surfaces before any replay starts.
    pub fn build(&self) -> Result<Arc<dyn RequestTransform>, ReplayError> {
        Ok(match self {
            TransformConfig::ConstantTransform { search, replace } => {
                Arc::new(ConstantTransform::new(search, replace.clone())?) as Arc<dyn RequestTransform>
            }
            TransformConfig::HeaderInjectionTransform { key, value } => {
                Arc::new(HeaderInjectionTransform::new(key.clone(), value.clone()))
            }
            TransformConfig::BodyToHeaderTransform {
                pattern,
                header_name,
                before,
                after,
            } => Arc::new(BodyToHeaderTransform::new(
                pattern,
                header_name.clone(),
                before.clone(),
                after.clone(),
            )?),
            TransformConfig::HeaderToHeaderTransform {
                response_key,
                pattern,
                request_key,
                before,
                after,
            } => Arc::new(HeaderToHeaderTransform::new(
                (!response_key.is_empty()).then(|| response_key.clone()),
                pattern,
                request_key.clone(),
                before.clone(),
                after.clone(),
            )?),
        })
    }
}

/// Load a transform chain description from a JSON file holding an array of
/// `{ "type": ..., ... }` objects.
pub fn load_transforms(path: impl AsRef<Path>) -> Result<Vec<TransformConfig>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&json).context("Transform file must be a JSON array")?;
    values.iter().map(TransformConfig::from_value).collect()
}

/// Build a fresh chain from the configs. Every runner needs its own chain:
/// transform state is per-replay and must not be shared between workers.
pub fn build_chain(
    configs: &[TransformConfig],
) -> Result<Vec<Arc<dyn RequestTransform>>, ReplayError> {
    configs.iter().map(TransformConfig::build).collect()
}
