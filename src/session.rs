use crate::{
    compositor::TileCompositor,
    decode::SceneDecoder,
    error::{FieldError, FieldResult},
    model::SceneStats,
    raster::RenderedFrame,
    scene_cache::SceneCache,
    view_state::ViewState,
};

/// Per-opened-file aggregate owning the caches and interactive view state.
///
/// One session corresponds to one viewer: construct it fresh per opened
/// file context, never share it as process-wide state. Everything here is
/// single-threaded and synchronous; a render runs to completion before any
/// other operation touches the same caches.
pub struct ViewerSession {
    scenes: SceneCache,
    compositor: TileCompositor,
    view: ViewState,
    current_bytes: Option<Vec<u8>>,
}

impl ViewerSession {
    pub fn new(decoder: Box<dyn SceneDecoder>) -> Self {
        Self {
            scenes: SceneCache::new(decoder),
            compositor: TileCompositor::new(),
            view: ViewState::default(),
            current_bytes: None,
        }
    }

    /// Open a scene from raw bytes, decoding through the cache.
    ///
    /// On success the view state resets in one transition: all layers
    /// visible and param masks re-derived from the new scene's script. A
    /// failed decode leaves the previous scene and view untouched.
    pub fn open(&mut self, bytes: Vec<u8>) -> FieldResult<()> {
        let (id, scene) = self.scenes.get_or_decode(&bytes)?;
        tracing::debug!(?id, "opened scene");
        self.view.reset_for_scene(scene);
        self.current_bytes = Some(bytes);
        Ok(())
    }

    /// Render the current scene under the current view state.
    ///
    /// Always recomputes the full raster; there is no incremental diffing.
    pub fn render(&mut self) -> FieldResult<RenderedFrame> {
        let bytes = self
            .current_bytes
            .as_ref()
            .ok_or_else(|| FieldError::validation("no scene is open"))?;
        let (id, scene) = self.scenes.get_or_decode(bytes)?;
        Ok(self.compositor.render(id, scene, &self.view))
    }

    /// Atomically restore the current scene's defaults (layers all visible,
    /// BGON-derived masks), discarding user overrides.
    pub fn reset_view(&mut self) -> FieldResult<()> {
        let bytes = self
            .current_bytes
            .as_ref()
            .ok_or_else(|| FieldError::validation("no scene is open"))?;
        let (_, scene) = self.scenes.get_or_decode(bytes)?;
        self.view.reset_for_scene(scene);
        Ok(())
    }

    pub fn stats(&mut self) -> FieldResult<SceneStats> {
        let bytes = self
            .current_bytes
            .as_ref()
            .ok_or_else(|| FieldError::validation("no scene is open"))?;
        let (_, scene) = self.scenes.get_or_decode(bytes)?;
        Ok(scene.stats())
    }

    pub fn toggle_layer(&mut self, layer_index: usize) {
        self.view.toggle_layer(layer_index);
    }

    pub fn toggle_param_bit(&mut self, param: u8, bit: u8) {
        self.view.params_mut().toggle_bit(param, bit);
    }

    pub fn cycle_param(&mut self, param: u8) {
        self.view.params_mut().cycle_bit(param);
    }

    pub fn set_param_mask(&mut self, param: u8, mask: u8) {
        self.view.params_mut().set_mask(param, mask);
    }

    pub fn set_grid(&mut self, on: bool) {
        self.view.show_grid = on;
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Decoder invocations so far; cache hits do not decode.
    pub fn decode_calls(&self) -> u64 {
        self.scenes.decode_calls()
    }
}
