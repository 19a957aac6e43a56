use layers::ColorLut;
use scene::picking::{PickTable, id_to_rgba};
use scene::selection::Highlight;

use crate::raster::FragmentInput;

/// Default highlight for picked objects (`#FFDD00`).
pub const DEFAULT_HIGHLIGHT: [u8; 3] = [0xFF, 0xDD, 0x00];

/// Per-primitive fragment stage.
///
/// `object` comes from the primitive's first (provoking) vertex and is
/// constant across the primitive.
pub trait FragmentShader {
    fn shade(&self, object: u32, input: FragmentInput) -> [u8; 4];
}

/// Display pass: color-map lookup, overridden by the highlight color for
/// highlighted objects.
#[derive(Debug)]
pub struct DisplayShader<'a> {
    pub knot: &'a str,
    pub lut: &'a ColorLut,
    pub highlight: &'a Highlight,
    pub highlight_color: [u8; 3],
}

impl FragmentShader for DisplayShader<'_> {
    fn shade(&self, object: u32, input: FragmentInput) -> [u8; 4] {
        if self.highlight.contains(self.knot, object) {
            let [r, g, b] = self.highlight_color;
            return [r, g, b, 255];
        }
        let rgb = self.lut.lookup(input.value).unwrap_or([0.0; 3]);
        [to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), 255]
    }
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Picking pass: the packed pick id of the object, no blending.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PickingShader {
    pub base: u32,
}

impl FragmentShader for PickingShader {
    fn shade(&self, object: u32, _input: FragmentInput) -> [u8; 4] {
        id_to_rgba(PickTable::encode(self.base, object))
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayShader, FragmentShader, PickingShader};
    use crate::raster::FragmentInput;
    use layers::ColorLut;
    use scene::picking::{PickTable, rgba_to_id};
    use scene::selection::Highlight;

    const FRAG: FragmentInput = FragmentInput {
        value: 1.0,
        depth: 1.0,
    };

    #[test]
    fn display_uses_lut_and_highlight() {
        let lut = ColorLut::build("interpolateViridis", 256).unwrap();
        let mut highlight = Highlight::new();
        let shader = DisplayShader {
            knot: "a",
            lut: &lut,
            highlight: &highlight,
            highlight_color: [255, 221, 0],
        };
        assert_eq!(shader.shade(0, FRAG), [253, 231, 37, 255]);

        highlight.set_picked("a", 4);
        let shader = DisplayShader {
            knot: "a",
            lut: &lut,
            highlight: &highlight,
            highlight_color: [255, 221, 0],
        };
        assert_eq!(shader.shade(4, FRAG), [255, 221, 0, 255]);
        assert_eq!(shader.shade(3, FRAG), [253, 231, 37, 255]);
    }

    #[test]
    fn picking_writes_encoded_ids() {
        let mut table = PickTable::new();
        table.register("a", 10);
        let base = table.register("b", 3).unwrap();
        let shader = PickingShader { base };
        let id = rgba_to_id(shader.shade(2, FRAG));
        assert_eq!(table.decode(id).unwrap().knot, "b");
        assert_eq!(table.decode(id).unwrap().object, Some(2));
    }
}
