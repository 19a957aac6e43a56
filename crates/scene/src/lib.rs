pub mod camera;
pub mod knot;
pub mod knot_manager;
pub mod picking;
pub mod resolution;
pub mod selection;

pub use camera::*;
pub use knot::*;
pub use knot_manager::*;
pub use picking::*;
pub use resolution::*;
pub use selection::*;
