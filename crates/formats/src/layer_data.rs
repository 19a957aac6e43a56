//! Layer data files: geometry plus attribute channels as JSON.
//!
//! ```json
//! {
//!   "crs": "geodesic",
//!   "geometry": {"type": "polylines", "lines": [[[-73.98, 40.75], [-73.97, 40.76]]]},
//!   "objectAttributes": {"traffic": [0.4]},
//!   "vertexBudget": 500
//! }
//! ```
//!
//! Geodesic positions are `[lng, lat]` or `[lng, lat, height]` in degrees
//! and are projected to world coordinates on load.

use std::collections::BTreeMap;

use foundation::math::{Vec3, to_world};
use layers::simplify::{SimplifyError, simplify_to_budget};
use layers::{AttributeChannel, Layer, LayerError, LayerId, Primitive};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Crs {
    /// Already in world units.
    #[default]
    World,
    /// `[lng, lat(, height)]` degrees.
    Geodesic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Xy([f64; 2]),
    Xyz([f64; 3]),
}

impl Position {
    fn xyz(&self) -> [f64; 3] {
        match *self {
            Position::Xy([x, y]) => [x, y, 0.0],
            Position::Xyz(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GeometryData {
    #[serde(rename_all = "camelCase")]
    Mesh {
        primitive: Primitive,
        positions: Vec<Position>,
        indices: Vec<u32>,
        /// Defaults to one object per vertex.
        #[serde(default)]
        object_ids: Option<Vec<u32>>,
    },
    Points {
        points: Vec<Position>,
    },
    Polylines {
        lines: Vec<Vec<Position>>,
    },
    /// Each polygon is an outer ring followed by its holes.
    Polygons {
        polygons: Vec<Vec<Vec<Position>>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerData {
    #[serde(default)]
    pub crs: Crs,
    pub geometry: GeometryData,
    /// One value per vertex.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeChannel>,
    /// One value per object, spread to the object's vertices on load.
    #[serde(default)]
    pub object_attributes: BTreeMap<String, AttributeChannel>,
    /// Total vertex budget for polyline geometry.
    #[serde(default)]
    pub vertex_budget: Option<usize>,
}

#[derive(Debug)]
pub enum LayerDataError {
    Projection {
        layer: String,
        source: foundation::math::ProjectionError,
    },
    Simplify {
        layer: String,
        source: SimplifyError,
    },
    Layer(LayerError),
    ObjectAttributeLength {
        layer: String,
        attribute: String,
        expected: u32,
        got: usize,
    },
}

impl std::fmt::Display for LayerDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerDataError::Projection { layer, source } => {
                write!(f, "layer {layer}: {source}")
            }
            LayerDataError::Simplify { layer, source } => write!(f, "layer {layer}: {source}"),
            LayerDataError::Layer(err) => write!(f, "{err}"),
            LayerDataError::ObjectAttributeLength {
                layer,
                attribute,
                expected,
                got,
            } => write!(
                f,
                "layer {layer}: object attribute {attribute} has {got} values for {expected} objects"
            ),
        }
    }
}

impl std::error::Error for LayerDataError {}

impl From<LayerError> for LayerDataError {
    fn from(err: LayerError) -> Self {
        LayerDataError::Layer(err)
    }
}

impl LayerData {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build the layer. `seed` drives tie-breaking when a vertex budget
    /// forces simplification.
    pub fn into_layer(self, id: LayerId, seed: u64) -> Result<Layer, LayerDataError> {
        let project = |p: &Position| -> Result<Vec3, LayerDataError> {
            let [a, b, c] = p.xyz();
            match self.crs {
                Crs::World => Ok(Vec3::new(a, b, c)),
                Crs::Geodesic => {
                    let w = to_world(b, a).map_err(|source| LayerDataError::Projection {
                        layer: id.to_string(),
                        source,
                    })?;
                    Ok(Vec3::new(w.x, w.y, c))
                }
            }
        };
        let ring = |pts: &[Position]| pts.iter().map(&project).collect::<Result<Vec<_>, _>>();

        let mut layer = match &self.geometry {
            GeometryData::Mesh {
                primitive,
                positions,
                indices,
                object_ids,
            } => {
                let positions = ring(positions)?;
                let object_ids = object_ids
                    .clone()
                    .unwrap_or_else(|| (0..positions.len() as u32).collect());
                Layer::new(id.clone(), *primitive, positions, indices.clone(), object_ids)?
            }
            GeometryData::Points { points } => Layer::from_points(id.clone(), &ring(points)?)?,
            GeometryData::Polylines { lines } => {
                let mut projected = lines
                    .iter()
                    .map(|l| ring(l))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(budget) = self.vertex_budget {
                    let mut rng = StdRng::seed_from_u64(seed);
                    projected = simplify_to_budget(&projected, budget, &mut rng).map_err(
                        |source| LayerDataError::Simplify {
                            layer: id.to_string(),
                            source,
                        },
                    )?;
                }
                Layer::from_polylines(id.clone(), &projected)?
            }
            GeometryData::Polygons { polygons } => {
                let projected = polygons
                    .iter()
                    .map(|rings| rings.iter().map(|r| ring(r)).collect::<Result<Vec<_>, _>>())
                    .collect::<Result<Vec<_>, _>>()?;
                Layer::from_polygons(id.clone(), &projected)?
            }
        };

        for (name, channel) in self.attributes {
            layer.set_attribute(name, channel)?;
        }
        for (name, channel) in self.object_attributes {
            let spread = spread_to_vertices(&layer, &name, channel)?;
            layer.set_attribute(name, spread)?;
        }
        Ok(layer)
    }
}

fn spread_to_vertices(
    layer: &Layer,
    name: &str,
    channel: AttributeChannel,
) -> Result<AttributeChannel, LayerDataError> {
    let expected = layer.object_count();
    if channel.len() != expected as usize {
        return Err(LayerDataError::ObjectAttributeLength {
            layer: layer.id().to_string(),
            attribute: name.to_string(),
            expected,
            got: channel.len(),
        });
    }
    let objects = layer.object_ids().iter().map(|&o| o as usize);
    Ok(match channel {
        AttributeChannel::Scalar(v) => AttributeChannel::Scalar(objects.map(|o| v[o]).collect()),
        AttributeChannel::Categorical(v) => {
            AttributeChannel::Categorical(objects.map(|o| v[o].clone()).collect())
        }
    })
}
