//! Field scene compositor: renders layered tile backgrounds from a legacy
//! RPG location format into RGBA rasters.
//!
//! The pipeline is session-oriented:
//!
//! - Decode raw scene bytes through a content-addressed [`SceneCache`]
//!   (the byte-level container parser sits behind [`SceneDecoder`])
//! - Resolve conditional tile visibility from embedded script bytecode
//!   ([`ParamStates`]) and hold interactive state in a [`ViewState`]
//! - Composite tiles with four integer blend modes into a [`RasterBuffer`]
//!   via the [`TileCompositor`], with per-scene atlas decode caching
#![forbid(unsafe_code)]

pub mod atlas_cache;
pub mod blend;
pub mod compositor;
pub mod conditional;
pub mod decode;
pub mod error;
pub mod model;
pub mod raster;
pub mod scene_cache;
pub mod session;
pub mod view_state;

pub use atlas_cache::{AtlasImage, TextureAtlasCache};
pub use blend::{Rgba8, blend_rgb};
pub use compositor::TileCompositor;
pub use conditional::{OPCODE_BGON, ParamStates};
pub use decode::{JsonSceneDecoder, SceneDecoder};
pub use error::{FieldError, FieldResult};
pub use model::{
    ATLAS_SIZE, BlendType, Dimensions, LAYER_COUNT, Layer, Palette, Scene, SceneStats,
    ScriptBytecode, TexturePage, TextureTable, Tile, tile_size_for_layer,
};
pub use raster::{RasterBuffer, RenderStats, RenderedFrame};
pub use scene_cache::{SCENE_CACHE_CAPACITY, SceneCache, SceneFingerprint, SceneId};
pub use session::ViewerSession;
pub use view_state::ViewState;
