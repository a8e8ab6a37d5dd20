use fieldscene::{
    ATLAS_SIZE, BlendType, Dimensions, JsonSceneDecoder, Layer, OPCODE_BGON, Palette, Scene,
    ScriptBytecode, TexturePage, TextureTable, Tile, ViewerSession,
};

fn solid_scene_bytes(color: [u8; 4], script: Option<Vec<u8>>, param: u8, state: u8) -> Vec<u8> {
    let mut entries = vec![[0u8; 4]; 256];
    entries[1] = color;
    let mut textures = TextureTable::default();
    textures.pages.insert(
        0,
        TexturePage {
            indices: vec![1; (ATLAS_SIZE * ATLAS_SIZE) as usize],
            palettes: vec![Palette { entries }],
        },
    );

    let layer_index = if param == 0 { 0 } else { 1 };
    let mut layers: [Layer; 4] = Default::default();
    layers[usize::from(layer_index)].exists = true;
    layers[usize::from(layer_index)].tiles.push(Tile {
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
        param,
        state,
        blending: false,
        blend_type: BlendType::Average,
    });

    let scene = Scene {
        layers,
        dimensions: Dimensions {
            min_x: 0,
            min_y: 0,
            width: 16,
            height: 16,
        },
        textures,
        script: script.map(ScriptBytecode),
    };
    serde_json::to_vec(&scene).unwrap()
}

fn session() -> ViewerSession {
    ViewerSession::new(Box::new(JsonSceneDecoder))
}

#[test]
fn render_without_open_scene_is_an_error() {
    let mut s = session();
    assert!(s.render().is_err());
    assert!(s.reset_view().is_err());
}

#[test]
fn bgon_initial_state_shows_the_tile() {
    let mut s = session();
    s.open(solid_scene_bytes(
        [10, 20, 30, 255],
        Some(vec![OPCODE_BGON, 2, 0b0001, 0x00]),
        2,
        0b0001,
    ))
    .unwrap();

    let frame = s.render().unwrap();
    assert_eq!(frame.stats.tiles_drawn, 1);
    assert_eq!(frame.raster.pixel(3, 3), [10, 20, 30, 255]);
}

#[test]
fn params_without_bgon_start_hidden_and_toggle_on() {
    let mut s = session();
    s.open(solid_scene_bytes([10, 20, 30, 255], None, 2, 0b0001))
        .unwrap();

    let frame = s.render().unwrap();
    assert_eq!(frame.stats.tiles_hidden, 1);
    assert_eq!(frame.raster.pixel(3, 3), [0, 0, 0, 255]);

    s.toggle_param_bit(2, 0);
    let frame = s.render().unwrap();
    assert_eq!(frame.stats.tiles_drawn, 1);
    assert_eq!(frame.raster.pixel(3, 3), [10, 20, 30, 255]);
}

#[test]
fn reset_discards_overrides_atomically() {
    let mut s = session();
    s.open(solid_scene_bytes([10, 20, 30, 255], None, 2, 0b0001))
        .unwrap();

    s.toggle_param_bit(2, 0);
    s.toggle_layer(3);
    assert!(!s.view().layer_visibility[3]);
    assert_eq!(s.view().params().active_mask(2), 0b0001);

    s.reset_view().unwrap();
    assert_eq!(s.view().layer_visibility, [true; 4]);
    assert_eq!(s.view().params().active_mask(2), 0x00);
}

#[test]
fn opening_a_new_scene_resets_view_and_never_leaks_old_atlases() {
    let red = solid_scene_bytes([200, 0, 0, 255], None, 0, 0);
    let blue = solid_scene_bytes([0, 0, 200, 255], None, 0, 0);

    let mut s = session();
    s.open(red.clone()).unwrap();
    s.toggle_layer(2);
    assert_eq!(s.render().unwrap().raster.pixel(0, 0), [200, 0, 0, 255]);

    // Same (texture_id, palette_id) key, different scene: the atlas cache
    // must be rebuilt, and the view must reset.
    s.open(blue).unwrap();
    assert_eq!(s.view().layer_visibility, [true; 4]);
    assert_eq!(s.render().unwrap().raster.pixel(0, 0), [0, 0, 200, 255]);

    // Re-opening the first scene serves the cached decode.
    let calls = s.decode_calls();
    s.open(red).unwrap();
    assert_eq!(s.decode_calls(), calls);
    assert_eq!(s.render().unwrap().raster.pixel(0, 0), [200, 0, 0, 255]);
}

#[test]
fn cycle_param_through_session_walks_used_bits() {
    // Two tiles on the same param, visible under bits 0 and 2 respectively.
    let mut s = session();
    let mut bytes = solid_scene_bytes([10, 20, 30, 255], None, 4, 0b0001);
    // Splice in a second tile with state bit 2 by decoding and re-encoding.
    let mut scene: Scene = serde_json::from_slice(&bytes).unwrap();
    let mut second = scene.layers[1].tiles[0].clone();
    second.state = 0b0100;
    second.dst_x = 0;
    scene.layers[1].tiles.push(second);
    bytes = serde_json::to_vec(&scene).unwrap();

    s.open(bytes).unwrap();
    assert_eq!(s.view().params().used_bits(4), 0b0101);

    s.cycle_param(4);
    assert_eq!(s.view().params().active_mask(4), 0b0001);
    s.cycle_param(4);
    assert_eq!(s.view().params().active_mask(4), 0b0100);
    s.cycle_param(4);
    assert_eq!(s.view().params().active_mask(4), 0b0001);
}
