pub mod colormap;
pub mod layer;
pub mod simplify;
pub mod symbology;

pub use colormap::{
    ColorError, ColorLut, ColorScale, ColorSource, Rgb, get_color, get_color_map,
    parse_color,
};
pub use layer::*;
pub use simplify::{
    PlanarPoint, Ranking, SimplifyError, simplify, simplify_seeded, simplify_to_budget,
};
pub use symbology::*;
