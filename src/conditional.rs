use std::collections::BTreeMap;

use crate::model::{Scene, Tile};

/// Script opcode that assigns a background param's initial bitmask when the
/// scene loads. Every other opcode in the stream is ignored.
pub const OPCODE_BGON: u8 = 0xE0;

/// Per-parameter conditional-visibility state.
///
/// `active` maps each param to its current 8-bit mask; `used_bits` maps it
/// to the union of every tile `state` referencing it, which gates which
/// toggle/cycle bits are meaningful. Both maps are exposed read-only so UI
/// layers can build toggle affordances without reimplementing the bit logic.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParamStates {
    active: BTreeMap<u8, u8>,
    used_bits: BTreeMap<u8, u8>,
}

impl ParamStates {
    /// Derive initial state from a scene: used bits from the tile scan over
    /// layers 1-3 (layer 0 ignores params), active masks from BGON opcodes
    /// in the script section, defaulting to fully hidden.
    pub fn resolve(scene: &Scene) -> Self {
        let mut used_bits: BTreeMap<u8, u8> = BTreeMap::new();
        for layer in &scene.layers[1..] {
            for tile in &layer.tiles {
                if tile.param != 0 {
                    *used_bits.entry(tile.param).or_insert(0) |= tile.state;
                }
            }
        }

        // Params never touched by a BGON opcode stay 0x00 until the user
        // overrides them.
        let mut active: BTreeMap<u8, u8> = used_bits.keys().map(|&p| (p, 0x00)).collect();
        if let Some(script) = &scene.script {
            for (param, mask) in scan_bgon(&script.0) {
                active.insert(param, mask);
            }
        }

        Self { active, used_bits }
    }

    /// Current mask for `param`.
    ///
    /// Defaults to 0xFF (all on) for a param the resolver never assigned.
    /// Unreachable for scenes whose params come from the same tile scan
    /// that fills `used_bits`, but the format does not promise that, so the
    /// fallback stays.
    pub fn active_mask(&self, param: u8) -> u8 {
        self.active.get(&param).copied().unwrap_or(0xFF)
    }

    pub fn used_bits(&self, param: u8) -> u8 {
        self.used_bits.get(&param).copied().unwrap_or(0)
    }

    pub fn active_map(&self) -> &BTreeMap<u8, u8> {
        &self.active
    }

    pub fn used_map(&self) -> &BTreeMap<u8, u8> {
        &self.used_bits
    }

    /// Replace a param's mask wholesale (user override).
    pub fn set_mask(&mut self, param: u8, mask: u8) {
        self.active.insert(param, mask);
    }

    /// XOR bit `bit` (0-7) into the param's current mask.
    pub fn toggle_bit(&mut self, param: u8, bit: u8) {
        if bit >= 8 {
            return;
        }
        let cur = self.active_mask(param);
        self.active.insert(param, cur ^ (1 << bit));
    }

    /// Advance the param to the next single used bit.
    ///
    /// Over the sorted bit positions of `used_bits`: when the current mask
    /// is not exactly one used bit, cycling starts at the first; otherwise
    /// it advances to the next, wrapping around. No-op when no bits are
    /// used.
    pub fn cycle_bit(&mut self, param: u8) {
        let used = self.used_bits(param);
        if used == 0 {
            return;
        }
        let bits: Vec<u8> = (0..8).filter(|b| used & (1 << b) != 0).collect();
        let cur = self.active_mask(param);
        let next = match bits.iter().position(|&b| cur == 1 << b) {
            Some(pos) => bits[(pos + 1) % bits.len()],
            None => bits[0],
        };
        self.active.insert(param, 1 << next);
    }

    /// Effective visibility of a tile under the current masks.
    ///
    /// Layer 0 is always visible; `param == 0` is always visible; otherwise
    /// the tile shows iff its state bits intersect the active mask.
    pub fn tile_visible(&self, tile: &Tile) -> bool {
        if tile.layer_index == 0 || tile.param == 0 {
            return true;
        }
        tile.state & self.active_mask(tile.param) != 0
    }
}

/// Collect `(param, mask)` pairs from every BGON occurrence in the stream.
///
/// The stream is scanned at every byte offset since foreign opcode lengths
/// are unknown at this boundary; a trailing BGON without both operand bytes
/// is ignored.
fn scan_bgon(code: &[u8]) -> Vec<(u8, u8)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 3 <= code.len() {
        if code[i] == OPCODE_BGON {
            out.push((code[i + 1], code[i + 2]));
        }
        i += 1;
    }
    out
}
