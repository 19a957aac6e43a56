pub mod arena;
pub mod bounds;
pub mod math;
pub mod time;

// Geometry and time primitives shared by every crate.
pub use arena::*;
pub use bounds::*;
pub use time::*;
