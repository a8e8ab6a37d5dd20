use std::collections::{BTreeMap, BTreeSet};

use crate::error::{FieldError, FieldResult};

/// Number of background layers in a field scene. Fixed by the format.
pub const LAYER_COUNT: usize = 4;

/// Texture atlases are always 256x256 pixels.
pub const ATLAS_SIZE: u32 = 256;

/// Tile edge length in pixels for a given layer index.
///
/// 16 for layers 0-1, 32 for layers 2-3. Derived from the layer, never read
/// from tile data.
pub fn tile_size_for_layer(layer_index: u8) -> u32 {
    if layer_index < 2 { 16 } else { 32 }
}

/// Normalized canvas extents of a scene, in scene coordinates.
///
/// Tile destinations are given in scene coordinates; subtracting
/// `(min_x, min_y)` maps them into the `width x height` raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub min_x: i32,
    pub min_y: i32,
    pub width: u32,
    pub height: u32,
}

/// Pixel-combination formula applied when a tile's `blending` flag is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendType {
    /// `out = (bg + fg) >> 1` per channel.
    Average,
    /// `out = min(255, bg + fg)` per channel.
    Additive,
    /// `out = max(0, bg - fg)` per channel.
    Subtractive,
    /// `out = min(255, bg + (fg >> 2))` per channel.
    QuarterAdd,
    /// Unrecognized raw value; passes the foreground through unchanged.
    ///
    /// A defined fallback, not an error.
    Other(u8),
}

impl BlendType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Average,
            1 => Self::Additive,
            2 => Self::Subtractive,
            3 => Self::QuarterAdd,
            other => Self::Other(other),
        }
    }
}

/// One fixed-size block copied or blended from a texture atlas into the
/// output raster.
///
/// Layer 0 ignores `param`, `state`, and `blending` unconditionally: its
/// tiles are always visible and never blended.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    pub layer_index: u8,
    /// Destination in scene coordinates.
    pub dst_x: i32,
    pub dst_y: i32,
    /// Primary source block origin within the atlas.
    pub src_x: u32,
    pub src_y: u32,
    /// Secondary source block origin, used when blending.
    pub src_x2: u32,
    pub src_y2: u32,
    pub texture_id: u8,
    pub texture_id2: u8,
    pub palette_id: u8,
    /// Conditional-visibility group; 0 means unconditional.
    pub param: u8,
    /// Bits of the param's active mask that make this tile visible.
    pub state: u8,
    pub blending: bool,
    pub blend_type: BlendType,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub exists: bool,
    /// Draw order within the layer is the original tile order.
    pub tiles: Vec<Tile>,
}

impl Layer {
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

/// 256-entry straight-alpha RGBA palette.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    pub entries: Vec<[u8; 4]>,
}

/// One 256x256 page of 8-bit palette indices plus its candidate palettes.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TexturePage {
    /// Row-major palette indices, `ATLAS_SIZE * ATLAS_SIZE` entries.
    pub indices: Vec<u8>,
    /// Palettes addressable by `palette_id`.
    pub palettes: Vec<Palette>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TextureTable {
    pub pages: BTreeMap<u8, TexturePage>,
}

impl TextureTable {
    pub fn page(&self, texture_id: u8) -> Option<&TexturePage> {
        self.pages.get(&texture_id)
    }
}

/// Raw opcode stream embedded in the scene file.
///
/// Consumed only by the conditional-state resolver; anything other than the
/// recognized BGON initializer is ignored.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScriptBytecode(pub Vec<u8>);

/// A decoded field scene. Immutable once decoded.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub layers: [Layer; LAYER_COUNT],
    pub dimensions: Dimensions,
    pub textures: TextureTable,
    pub script: Option<ScriptBytecode>,
}

impl Scene {
    pub fn validate(&self) -> FieldResult<()> {
        if self.dimensions.width == 0 || self.dimensions.height == 0 {
            return Err(FieldError::validation(
                "scene dimensions width/height must be > 0",
            ));
        }

        for (layer_index, layer) in self.layers.iter().enumerate() {
            if !layer.exists && !layer.tiles.is_empty() {
                return Err(FieldError::validation(format!(
                    "layer {layer_index} carries tiles but is flagged as absent"
                )));
            }
            for (tile_index, tile) in layer.tiles.iter().enumerate() {
                if usize::from(tile.layer_index) != layer_index {
                    return Err(FieldError::validation(format!(
                        "layer {layer_index} tile {tile_index} has layer_index {}",
                        tile.layer_index
                    )));
                }
            }
        }

        for (&texture_id, page) in &self.textures.pages {
            let expected = (ATLAS_SIZE * ATLAS_SIZE) as usize;
            if page.indices.len() != expected {
                return Err(FieldError::validation(format!(
                    "texture page {texture_id} has {} indices, expected {expected}",
                    page.indices.len()
                )));
            }
            for (palette_id, palette) in page.palettes.iter().enumerate() {
                if palette.entries.len() != 256 {
                    return Err(FieldError::validation(format!(
                        "texture page {texture_id} palette {palette_id} has {} entries, expected 256",
                        palette.entries.len()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Per-layer tile counts, distinct texture/palette pairs, and discovered
    /// params with their used bits. Consumed by the `info` subcommand and by
    /// UI layers building toggle affordances.
    pub fn stats(&self) -> SceneStats {
        let mut pairs = BTreeSet::new();
        for layer in &self.layers {
            for tile in &layer.tiles {
                pairs.insert((tile.texture_id, tile.palette_id));
                if tile.blending {
                    pairs.insert((tile.texture_id2, tile.palette_id));
                }
            }
        }

        let mut params = BTreeMap::new();
        for layer in &self.layers[1..] {
            for tile in &layer.tiles {
                if tile.param != 0 {
                    *params.entry(tile.param).or_insert(0u8) |= tile.state;
                }
            }
        }

        SceneStats {
            tile_counts: std::array::from_fn(|i| self.layers[i].tile_count()),
            texture_pairs: pairs.len(),
            params,
        }
    }
}

/// Summary of a decoded scene.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SceneStats {
    pub tile_counts: [usize; LAYER_COUNT],
    /// Distinct `(texture_id, palette_id)` pairs referenced by tiles.
    pub texture_pairs: usize,
    /// Conditional params mapped to the union of `state` bits that
    /// reference them (layers 1-3 only; layer 0 ignores params).
    pub params: BTreeMap<u8, u8>,
}
