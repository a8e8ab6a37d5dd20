use crate::{
    error::{FieldError, FieldResult},
    model::Scene,
};

/// Boundary to the byte-level container decoder.
///
/// Parsing the binary field-file container (section headers, geometry
/// tables, script extraction) lives outside this crate; anything that can
/// turn raw bytes into a validated [`Scene`] can sit behind the scene cache.
pub trait SceneDecoder {
    fn decode(&self, bytes: &[u8]) -> FieldResult<Scene>;
}

/// Decoder for the serde scene representation.
///
/// Stands in for the binary container decoder at the same seam; used by the
/// CLI and the test suites so the cache and session layers are exercised
/// against the real boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSceneDecoder;

impl SceneDecoder for JsonSceneDecoder {
    fn decode(&self, bytes: &[u8]) -> FieldResult<Scene> {
        let scene: Scene = serde_json::from_slice(bytes)
            .map_err(|e| FieldError::decode(format!("parse scene JSON: {e}")))?;
        scene.validate()?;
        Ok(scene)
    }
}
