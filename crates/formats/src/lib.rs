//! On-disk formats and the session context built from them.

pub mod config;
pub mod history;
pub mod layer_data;
pub mod scene_spec;
pub mod session;

pub use config::{ConfigError, SessionConfig, Viewport};
pub use history::{HistoryEntry, SpecHistory};
pub use layer_data::{Crs, GeometryData, LayerData, LayerDataError, Position};
pub use scene_spec::{
    CameraSpec, DirectionSpec, KnotSpec, LayerOrigin, LayerSource, SceneSpec, SpecLoadError,
};
pub use session::{ApplyReport, Session};
