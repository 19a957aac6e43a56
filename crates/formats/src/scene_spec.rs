//! Scene specification: the JSON document that declares layers, knots and
//! an optional initial camera.
//!
//! ```json
//! {
//!   "camera": {"lat": 40.75, "lng": -73.98, "altitude": 3000},
//!   "layers": [{"id": "roads", "path": "roads.json"}],
//!   "knots": [{
//!     "id": "roadsByTraffic",
//!     "layerRef": "roads",
//!     "styleSpec": {"color": {"type": "byAttribute", "attribute": "traffic"}},
//!     "resolutionRange": {"end": 10000}
//!   }]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use foundation::math::{Vec3, to_world};
use layers::{Layer, LayerError, LayerId, StyleError, StyleSpec};
use scene::{Camera, KnotError, ResolutionRange};
use serde::{Deserialize, Serialize};

use crate::layer_data::{LayerData, LayerDataError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraSpec>,
    #[serde(default)]
    pub layers: Vec<LayerSource>,
    #[serde(default)]
    pub knots: Vec<KnotSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnotSpec {
    pub id: String,
    #[serde(rename = "layerRef", alias = "layer")]
    pub layer: LayerId,
    #[serde(rename = "styleSpec", alias = "style")]
    pub style: StyleSpec,
    #[serde(default, rename = "resolutionRange", alias = "resolution")]
    pub resolution: ResolutionRange,
    #[serde(default = "default_view_id")]
    pub view_id: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_view_id() -> String {
    "main".to_string()
}

fn default_visible() -> bool {
    true
}

/// Initial camera. Variants are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraSpec {
    /// Explicit orthonormal frame in world units.
    #[serde(rename_all = "camelCase")]
    Frame {
        position: [f64; 3],
        direction: DirectionSpec,
    },
    /// Eye and target in world units; screen-up is north.
    LookAt { position: [f64; 3], target: [f64; 3] },
    /// Straight down over a geodesic point.
    Geodesic { lat: f64, lng: f64, altitude: f64 },
    /// Straight down over a world point.
    TopDown { x: f64, y: f64, altitude: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionSpec {
    pub right: [f64; 3],
    pub look_at: [f64; 3],
    pub up: [f64; 3],
}

fn vec3([x, y, z]: [f64; 3]) -> Vec3 {
    Vec3::new(x, y, z)
}

impl CameraSpec {
    pub fn to_camera(&self) -> Result<Camera, SpecLoadError> {
        let degenerate = || SpecLoadError::Camera(format!("degenerate camera frame: {self:?}"));
        match self {
            CameraSpec::Frame {
                position,
                direction,
            } => {
                let unit = |v: [f64; 3]| vec3(v).normalize().ok_or_else(degenerate);
                Ok(Camera {
                    position: vec3(*position),
                    right: unit(direction.right)?,
                    look_at: unit(direction.look_at)?,
                    up: unit(direction.up)?,
                })
            }
            CameraSpec::LookAt { position, target } => {
                Camera::looking_at(vec3(*position), vec3(*target), Vec3::new(0.0, -1.0, 0.0))
                    .ok_or_else(degenerate)
            }
            CameraSpec::Geodesic { lat, lng, altitude } => {
                let w = to_world(*lat, *lng)
                    .map_err(|err| SpecLoadError::Camera(err.to_string()))?;
                Ok(Camera::top_down(w.x, w.y, *altitude))
            }
            CameraSpec::TopDown { x, y, altitude } => Ok(Camera::top_down(*x, *y, *altitude)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSource {
    pub id: LayerId,
    #[serde(flatten)]
    pub origin: LayerOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerOrigin {
    /// Layer data file, relative to the scene file's directory.
    File { path: PathBuf },
    Inline { data: LayerData },
}

impl LayerSource {
    pub fn load(&self, base_dir: Option<&Path>, seed: u64) -> Result<Layer, SpecLoadError> {
        let data = match &self.origin {
            LayerOrigin::Inline { data } => data.clone(),
            LayerOrigin::File { path } => {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                let text = fs::read_to_string(&path).map_err(|source| SpecLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                LayerData::from_json_str(&text).map_err(SpecLoadError::Json)?
            }
        };
        Ok(data.into_layer(self.id.clone(), seed)?)
    }
}

#[derive(Debug)]
pub enum SpecLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Layer(LayerDataError),
    Style {
        knot: String,
        source: StyleError,
    },
    Knot(KnotError),
    Camera(String),
}

impl std::fmt::Display for SpecLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecLoadError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            SpecLoadError::Json(err) => write!(f, "invalid scene json: {err}"),
            SpecLoadError::Layer(err) => write!(f, "{err}"),
            SpecLoadError::Style { knot, source } => write!(f, "knot {knot}: {source}"),
            SpecLoadError::Knot(err) => write!(f, "{err}"),
            SpecLoadError::Camera(msg) => write!(f, "camera: {msg}"),
        }
    }
}

impl std::error::Error for SpecLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpecLoadError::Io { source, .. } => Some(source),
            SpecLoadError::Json(err) => Some(err),
            SpecLoadError::Layer(err) => Some(err),
            SpecLoadError::Style { source, .. } => Some(source),
            SpecLoadError::Knot(err) => Some(err),
            SpecLoadError::Camera(_) => None,
        }
    }
}

impl From<LayerDataError> for SpecLoadError {
    fn from(err: LayerDataError) -> Self {
        SpecLoadError::Layer(err)
    }
}

impl From<LayerError> for SpecLoadError {
    fn from(err: LayerError) -> Self {
        SpecLoadError::Layer(LayerDataError::Layer(err))
    }
}

impl From<KnotError> for SpecLoadError {
    fn from(err: KnotError) -> Self {
        SpecLoadError::Knot(err)
    }
}

impl SceneSpec {
    pub fn from_json_str(s: &str) -> Result<Self, SpecLoadError> {
        serde_json::from_str(s).map_err(SpecLoadError::Json)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, SpecLoadError> {
        serde_json::to_value(self).map_err(SpecLoadError::Json)
    }
}
