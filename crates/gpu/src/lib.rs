//! Software reference renderer for knots.
//!
//! Mirrors the two passes a GPU backend runs: a display pass that colors
//! fragments through each knot's color lookup table, and a picking pass
//! that writes packed object ids into an offscreen buffer.

pub mod raster;
pub mod renderer;
pub mod resources;
pub mod shader;
pub mod targets;

pub use renderer::*;
pub use resources::{GpuResources, GpuVertex, LayerBuffers};
pub use shader::{DEFAULT_HIGHLIGHT, DisplayShader, FragmentShader, PickingShader};
pub use targets::{PickBuffer, RenderTarget};
