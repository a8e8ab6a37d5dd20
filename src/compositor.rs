use crate::{
    atlas_cache::{AtlasImage, TextureAtlasCache},
    blend::blend_rgb,
    model::{ATLAS_SIZE, BlendType, Scene, tile_size_for_layer},
    raster::{RasterBuffer, RenderStats, RenderedFrame},
    scene_cache::SceneId,
    view_state::ViewState,
};

/// Grid overlay pitch in pixels.
const GRID_STEP: u32 = 16;
/// Grid overlay line alpha (translucent white).
const GRID_ALPHA: u16 = 96;

/// Deterministic tile compositor.
///
/// Owns the per-scene atlas cache and the render generation counter.
/// Construct one per viewer/session; the atlas cache invalidates itself
/// when the scene identity changes between renders.
#[derive(Default)]
pub struct TileCompositor {
    atlases: TextureAtlasCache,
    generation: u64,
}

impl TileCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation stamp of the most recent render.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Composite a full frame.
    ///
    /// One uninterruptible pass: layers 0 through 3 in order, original tile
    /// order within each layer, so later layers and later tiles draw on
    /// top. Source-data inconsistencies (missing atlas, out-of-bounds
    /// geometry) degrade to skipping the affected tile or pixels; drawing
    /// itself has no error path.
    #[tracing::instrument(skip(self, scene, view))]
    pub fn render(&mut self, scene_id: SceneId, scene: &Scene, view: &ViewState) -> RenderedFrame {
        let dims = scene.dimensions;
        let mut raster = RasterBuffer::opaque_black(dims.width, dims.height);
        let mut stats = RenderStats::default();

        for (layer_index, layer) in scene.layers.iter().enumerate() {
            if !layer.exists {
                continue;
            }
            let visible = view.layer_visibility[layer_index];
            let size = tile_size_for_layer(layer_index as u8);

            for tile in &layer.tiles {
                stats.tiles_total += 1;

                if !visible {
                    stats.tiles_hidden += 1;
                    continue;
                }
                if layer_index != 0 && !view.params().tile_visible(tile) {
                    stats.tiles_hidden += 1;
                    continue;
                }

                // Layer 0 never blends, even when flagged.
                let use_blending = tile.blending && layer_index != 0;
                let (texture_id, src_x, src_y) = if use_blending {
                    (tile.texture_id2, tile.src_x2, tile.src_y2)
                } else {
                    (tile.texture_id, tile.src_x, tile.src_y)
                };

                let Some(atlas) =
                    self.atlases
                        .get_atlas(scene_id, scene, texture_id, tile.palette_id)
                else {
                    tracing::debug!(
                        texture_id,
                        palette_id = tile.palette_id,
                        "tile references missing atlas, skipping"
                    );
                    stats.tiles_missing_texture += 1;
                    continue;
                };

                let dst_x = tile.dst_x - dims.min_x;
                let dst_y = tile.dst_y - dims.min_y;
                if use_blending {
                    blit_blend(
                        &mut raster,
                        atlas,
                        src_x,
                        src_y,
                        dst_x,
                        dst_y,
                        size,
                        tile.blend_type,
                    );
                } else {
                    blit_copy(&mut raster, atlas, src_x, src_y, dst_x, dst_y, size);
                }
                stats.tiles_drawn += 1;
            }
        }

        if view.show_grid {
            overlay_grid(&mut raster);
        }

        self.generation += 1;
        RenderedFrame {
            raster,
            generation: self.generation,
            stats,
        }
    }
}

/// Copy a `size x size` atlas block, overwriting destination pixels
/// (including alpha) unconditionally. Out-of-bounds pixels clip.
fn blit_copy(
    raster: &mut RasterBuffer,
    atlas: &AtlasImage,
    src_x: u32,
    src_y: u32,
    dst_x: i32,
    dst_y: i32,
    size: u32,
) {
    for dy in 0..size {
        for dx in 0..size {
            let Some((sx, sy, tx, ty)) = clip(raster, src_x, src_y, dst_x, dst_y, dx, dy) else {
                continue;
            };
            raster.set_pixel(tx, ty, atlas.pixel(sx, sy));
        }
    }
}

/// Blend a `size x size` atlas block over the destination.
///
/// Pixels with zero source alpha are left untouched; the rest are written
/// fully opaque with the blended RGB.
#[allow(clippy::too_many_arguments)]
fn blit_blend(
    raster: &mut RasterBuffer,
    atlas: &AtlasImage,
    src_x: u32,
    src_y: u32,
    dst_x: i32,
    dst_y: i32,
    size: u32,
    blend_type: BlendType,
) {
    for dy in 0..size {
        for dx in 0..size {
            let Some((sx, sy, tx, ty)) = clip(raster, src_x, src_y, dst_x, dst_y, dx, dy) else {
                continue;
            };
            let fg = atlas.pixel(sx, sy);
            if fg[3] == 0 {
                continue;
            }
            let bg = raster.pixel(tx, ty);
            raster.set_pixel(tx, ty, blend_rgb(blend_type, bg, fg));
        }
    }
}

/// Resolve one block-relative pixel to (source, destination) coordinates,
/// or `None` when either side falls outside its surface.
fn clip(
    raster: &RasterBuffer,
    src_x: u32,
    src_y: u32,
    dst_x: i32,
    dst_y: i32,
    dx: u32,
    dy: u32,
) -> Option<(u32, u32, u32, u32)> {
    let sx = src_x.checked_add(dx)?;
    let sy = src_y.checked_add(dy)?;
    if sx >= ATLAS_SIZE || sy >= ATLAS_SIZE {
        return None;
    }
    let tx = dst_x.checked_add(dx as i32)?;
    let ty = dst_y.checked_add(dy as i32)?;
    if tx < 0 || ty < 0 {
        return None;
    }
    let (tx, ty) = (tx as u32, ty as u32);
    if tx >= raster.width() || ty >= raster.height() {
        return None;
    }
    Some((sx, sy, tx, ty))
}

/// Translucent white 1px lines every `GRID_STEP` pixels. Cosmetic overlay,
/// not part of the scene's own data.
fn overlay_grid(raster: &mut RasterBuffer) {
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            if x % GRID_STEP != 0 && y % GRID_STEP != 0 {
                continue;
            }
            let bg = raster.pixel(x, y);
            let mut px = [0u8; 4];
            for i in 0..3 {
                let c = u16::from(bg[i]);
                px[i] = (c + ((255 - c) * GRID_ALPHA) / 255) as u8;
            }
            px[3] = bg[3];
            raster.set_pixel(x, y, px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dimensions, Layer, Palette, TexturePage, TextureTable, Tile};

    fn gradient_page() -> TexturePage {
        // Palette index i maps to (i, i, i, 255) except index 0, which is
        // transparent. Atlas pixel (x, y) carries index ((x + y) % 256).
        let mut entries: Vec<[u8; 4]> = (0..=255u8).map(|i| [i, i, i, 255]).collect();
        entries[0] = [0, 0, 0, 0];
        let mut indices = vec![0u8; (ATLAS_SIZE * ATLAS_SIZE) as usize];
        for y in 0..ATLAS_SIZE {
            for x in 0..ATLAS_SIZE {
                indices[(y * ATLAS_SIZE + x) as usize] = ((x + y) % 256) as u8;
            }
        }
        TexturePage {
            indices,
            palettes: vec![Palette { entries }],
        }
    }

    fn tile(layer_index: u8) -> Tile {
        Tile {
            layer_index,
            dst_x: 0,
            dst_y: 0,
            src_x: 0,
            src_y: 0,
            src_x2: 0,
            src_y2: 0,
            texture_id: 0,
            texture_id2: 0,
            palette_id: 0,
            param: 0,
            state: 0,
            blending: false,
            blend_type: BlendType::Average,
        }
    }

    fn scene(tiles: Vec<Tile>, width: u32, height: u32) -> Scene {
        let mut layers: [Layer; 4] = Default::default();
        for t in tiles {
            let layer = &mut layers[usize::from(t.layer_index)];
            layer.exists = true;
            layer.tiles.push(t);
        }
        let mut textures = TextureTable::default();
        textures.pages.insert(0, gradient_page());
        Scene {
            layers,
            dimensions: Dimensions {
                min_x: 0,
                min_y: 0,
                width,
                height,
            },
            textures,
            script: None,
        }
    }

    #[test]
    fn out_of_bounds_destination_clips_instead_of_failing() {
        let mut t = tile(0);
        t.dst_x = -8;
        t.dst_y = 8;
        t.src_x = 16;
        let scene = scene(vec![t], 16, 16);
        let view = ViewState::for_scene(&scene);
        let frame = TileCompositor::new().render(SceneId(0), &scene, &view);

        // Columns 0..8 come from the right half of the source block; the
        // rest of the raster stays opaque black.
        assert_eq!(frame.raster.pixel(0, 8), [24, 24, 24, 255]);
        assert_eq!(frame.raster.pixel(8, 8), [0, 0, 0, 255]);
        assert_eq!(frame.stats.tiles_drawn, 1);
    }

    #[test]
    fn out_of_bounds_source_draws_nothing() {
        let mut t = tile(0);
        t.src_x = ATLAS_SIZE; // degenerate, clips every pixel
        let scene = scene(vec![t], 16, 16);
        let view = ViewState::for_scene(&scene);
        let frame = TileCompositor::new().render(SceneId(0), &scene, &view);
        assert_eq!(frame.raster.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn missing_atlas_skips_tile_and_counts_it() {
        let mut t = tile(0);
        t.texture_id = 7;
        let scene = scene(vec![t], 16, 16);
        let view = ViewState::for_scene(&scene);
        let frame = TileCompositor::new().render(SceneId(0), &scene, &view);
        assert_eq!(frame.stats.tiles_missing_texture, 1);
        assert_eq!(frame.stats.tiles_drawn, 0);
    }

    #[test]
    fn grid_overlay_lightens_grid_lines_only() {
        let scene = scene(vec![], 20, 20);
        let mut view = ViewState::for_scene(&scene);
        view.show_grid = true;
        let frame = TileCompositor::new().render(SceneId(0), &scene, &view);

        let lit = ((255 * GRID_ALPHA) / 255) as u8;
        assert_eq!(frame.raster.pixel(0, 5), [lit, lit, lit, 255]);
        assert_eq!(frame.raster.pixel(16, 3), [lit, lit, lit, 255]);
        assert_eq!(frame.raster.pixel(5, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn generation_increments_per_render() {
        let scene = scene(vec![], 16, 16);
        let view = ViewState::for_scene(&scene);
        let mut comp = TileCompositor::new();
        let a = comp.render(SceneId(0), &scene, &view);
        let b = comp.render(SceneId(0), &scene, &view);
        assert!(b.generation > a.generation);
        assert_eq!(comp.generation(), b.generation);
    }
}
