use crate::model::BlendType;

pub type Rgba8 = [u8; 4];

/// Combine a destination and a source pixel per the tile's blend type.
///
/// Integer 0-255 channel arithmetic on RGB; the result is always fully
/// opaque. Alpha gating (skipping zero-alpha source pixels) is the caller's
/// job, since it decides whether to write at all.
pub fn blend_rgb(blend: BlendType, bg: Rgba8, fg: Rgba8) -> Rgba8 {
    let mut out = [0u8, 0, 0, 255];
    for i in 0..3 {
        out[i] = match blend {
            BlendType::Average => ((u16::from(bg[i]) + u16::from(fg[i])) >> 1) as u8,
            BlendType::Additive => bg[i].saturating_add(fg[i]),
            BlendType::Subtractive => bg[i].saturating_sub(fg[i]),
            BlendType::QuarterAdd => bg[i].saturating_add(fg[i] >> 2),
            BlendType::Other(_) => fg[i],
        };
    }
    out
}
