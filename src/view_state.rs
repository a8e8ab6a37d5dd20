use crate::{
    conditional::ParamStates,
    model::{LAYER_COUNT, Scene},
};

/// Interactive view configuration for one opened scene.
///
/// Layer visibility, param bitmasks, and the cosmetic grid toggle live in
/// one aggregate so resetting is a single state transition; callers can
/// never observe a half-reset intermediate (layers restored but masks not,
/// or vice versa).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ViewState {
    /// Per-layer visibility, all true by default and on reset.
    pub layer_visibility: [bool; LAYER_COUNT],
    params: ParamStates,
    /// Cosmetic 16-pixel grid overlay; not part of the scene's own data.
    pub show_grid: bool,
}

impl Default for ViewState {
    /// Empty view for a session with no scene open yet: all layers visible,
    /// no params, grid off.
    fn default() -> Self {
        Self {
            layer_visibility: [true; LAYER_COUNT],
            params: ParamStates::default(),
            show_grid: false,
        }
    }
}

impl ViewState {
    /// Fresh view for a newly opened scene: all layers visible, BGON-derived
    /// param masks, grid off.
    pub fn for_scene(scene: &Scene) -> Self {
        Self {
            layer_visibility: [true; LAYER_COUNT],
            params: ParamStates::resolve(scene),
            show_grid: false,
        }
    }

    /// Atomically restore scene defaults: all layers visible and param masks
    /// re-resolved from the script section, discarding prior overrides.
    ///
    /// The grid toggle is a viewer preference, not scene-derived state, and
    /// is left alone.
    pub fn reset_for_scene(&mut self, scene: &Scene) {
        self.layer_visibility = [true; LAYER_COUNT];
        self.params = ParamStates::resolve(scene);
    }

    pub fn toggle_layer(&mut self, layer_index: usize) {
        if let Some(v) = self.layer_visibility.get_mut(layer_index) {
            *v = !*v;
        }
    }

    pub fn params(&self) -> &ParamStates {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamStates {
        &mut self.params
    }
}
