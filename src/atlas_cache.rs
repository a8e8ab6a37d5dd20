use std::collections::BTreeMap;

use crate::{
    blend::Rgba8,
    model::{ATLAS_SIZE, Palette, Scene, TexturePage},
    scene_cache::SceneId,
};

/// Renderer-ready 256x256 RGBA surface decoded from one
/// `(texture_id, palette_id)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasImage {
    data: Vec<u8>,
}

impl AtlasImage {
    fn decode(page: &TexturePage, palette: &Palette) -> Self {
        let mut data = Vec::with_capacity(page.indices.len() * 4);
        for &index in &page.indices {
            let px = palette
                .entries
                .get(usize::from(index))
                .copied()
                .unwrap_or([0, 0, 0, 0]);
            data.extend_from_slice(&px);
        }
        Self { data }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = ((y * ATLAS_SIZE + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct AtlasKey {
    texture_id: u8,
    palette_id: u8,
}

/// Per-scene cache of decoded texture atlases.
///
/// Owned by one compositor; unbounded within a scene's lifetime (implicitly
/// bounded by the distinct texture/palette pairs a scene references) and
/// cleared wholesale on scene change rather than evicting per entry.
#[derive(Default)]
pub struct TextureAtlasCache {
    owner: Option<SceneId>,
    atlases: BTreeMap<AtlasKey, AtlasImage>,
}

impl TextureAtlasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (decoding on first use) the atlas for a texture/palette pair.
    ///
    /// The owner check runs before any lookup: when `scene_id` differs from
    /// the cached identity the whole map is discarded first, so a single
    /// frame can never mix atlases of two different scenes. Returns `None`
    /// when the scene's table has no such page or palette; the caller skips
    /// the tile rather than failing the render.
    pub fn get_atlas(
        &mut self,
        scene_id: SceneId,
        scene: &Scene,
        texture_id: u8,
        palette_id: u8,
    ) -> Option<&AtlasImage> {
        if self.owner != Some(scene_id) {
            tracing::debug!(?scene_id, dropped = self.atlases.len(), "scene changed, atlas cache cleared");
            self.atlases.clear();
            self.owner = Some(scene_id);
        }

        let key = AtlasKey {
            texture_id,
            palette_id,
        };
        if !self.atlases.contains_key(&key) {
            let page = scene.textures.page(texture_id)?;
            let palette = page.palettes.get(usize::from(palette_id))?;
            self.atlases.insert(key, AtlasImage::decode(page, palette));
        }
        self.atlases.get(&key)
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }
}
