use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use earcutr::earcut;
use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the index sequence of a layer is read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    /// One index per point.
    Points,
    /// Index pairs, one segment each.
    Lines,
    /// Index triples, one triangle each.
    Triangles,
}

impl Primitive {
    pub fn arity(self) -> usize {
        match self {
            Primitive::Points => 1,
            Primitive::Lines => 2,
            Primitive::Triangles => 3,
        }
    }
}

/// Per-vertex values used for styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeChannel {
    Scalar(Vec<f64>),
    Categorical(Vec<String>),
}

impl AttributeChannel {
    pub fn len(&self) -> usize {
        match self {
            AttributeChannel::Scalar(v) => v.len(),
            AttributeChannel::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Option<&[f64]> {
        match self {
            AttributeChannel::Scalar(v) => Some(v),
            AttributeChannel::Categorical(_) => None,
        }
    }

    pub fn as_categories(&self) -> Option<&[String]> {
        match self {
            AttributeChannel::Categorical(v) => Some(v),
            AttributeChannel::Scalar(_) => None,
        }
    }

    /// `(min, max)` over the finite values of a scalar channel.
    pub fn scalar_range(&self) -> Option<(f64, f64)> {
        let values = self.as_scalar()?;
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Scalar value `i` mapped into `[0, 1]` by the channel's min/max.
    ///
    /// A constant channel maps to `0`. Non-finite values yield `None`.
    pub fn normalized(&self, i: usize) -> Option<f64> {
        let (lo, hi) = self.scalar_range()?;
        self.normalized_with(i, lo, hi)
    }

    pub fn normalized_with(&self, i: usize, lo: f64, hi: f64) -> Option<f64> {
        let v = *self.as_scalar()?.get(i)?;
        if !v.is_finite() {
            return None;
        }
        if hi > lo {
            Some(((v - lo) / (hi - lo)).clamp(0.0, 1.0))
        } else {
            Some(0.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    MalformedIndices {
        layer: LayerId,
        primitive: Primitive,
        len: usize,
    },
    IndexOutOfRange {
        layer: LayerId,
        index: u32,
        vertex_count: usize,
    },
    ObjectIdsLength {
        layer: LayerId,
        expected: usize,
        got: usize,
    },
    AttributeLength {
        layer: LayerId,
        attribute: String,
        expected: usize,
        got: usize,
    },
    Triangulation {
        layer: LayerId,
        polygon: usize,
    },
    DuplicateLayerId(LayerId),
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::MalformedIndices {
                layer,
                primitive,
                len,
            } => write!(
                f,
                "layer {layer}: {len} indices is not a multiple of {} for {primitive:?}",
                primitive.arity()
            ),
            LayerError::IndexOutOfRange {
                layer,
                index,
                vertex_count,
            } => write!(
                f,
                "layer {layer}: index {index} out of range for {vertex_count} vertices"
            ),
            LayerError::ObjectIdsLength {
                layer,
                expected,
                got,
            } => write!(
                f,
                "layer {layer}: expected {expected} object ids, got {got}"
            ),
            LayerError::AttributeLength {
                layer,
                attribute,
                expected,
                got,
            } => write!(
                f,
                "layer {layer}: attribute {attribute} has {got} values, expected {expected}"
            ),
            LayerError::Triangulation { layer, polygon } => {
                write!(f, "layer {layer}: failed to triangulate polygon {polygon}")
            }
            LayerError::DuplicateLayerId(id) => write!(f, "layer {id} already registered"),
        }
    }
}

impl std::error::Error for LayerError {}

/// Geometry and attribute channels for one physical dataset.
///
/// Geometry is fixed at construction; only attribute channels may be
/// replaced afterwards. Every vertex carries the index of the logical
/// object (building, road, cell) it belongs to, which is what picking
/// reports as the sub-object index.
///
/// Each constructed layer takes a fresh [`Layer::generation`]; clones share
/// it. Caches keyed by [`LayerId`] compare generations to notice that a
/// layer was rebuilt under the same id.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    generation: u64,
    primitive: Primitive,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    object_ids: Vec<u32>,
    object_count: u32,
    attributes: BTreeMap<String, AttributeChannel>,
    bounds: Option<Aabb3>,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Content equality; generations are ignored.
impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.primitive == other.primitive
            && self.positions == other.positions
            && self.indices == other.indices
            && self.object_ids == other.object_ids
            && self.attributes == other.attributes
    }
}

impl Layer {
    pub fn new(
        id: LayerId,
        primitive: Primitive,
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        object_ids: Vec<u32>,
    ) -> Result<Self, LayerError> {
        if indices.len() % primitive.arity() != 0 {
            return Err(LayerError::MalformedIndices {
                layer: id,
                primitive,
                len: indices.len(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(LayerError::IndexOutOfRange {
                layer: id,
                index: bad,
                vertex_count: positions.len(),
            });
        }
        if object_ids.len() != positions.len() {
            return Err(LayerError::ObjectIdsLength {
                layer: id,
                expected: positions.len(),
                got: object_ids.len(),
            });
        }

        let object_count = object_ids.iter().max().map(|m| m + 1).unwrap_or(0);
        let bounds = Aabb3::from_points(positions.iter().map(|p| [p.x, p.y, p.z]));

        Ok(Self {
            id,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            primitive,
            positions,
            indices,
            object_ids,
            object_count,
            attributes: BTreeMap::new(),
            bounds,
        })
    }

    /// One object per point.
    pub fn from_points(id: LayerId, points: &[Vec3]) -> Result<Self, LayerError> {
        let n = points.len() as u32;
        Self::new(
            id,
            Primitive::Points,
            points.to_vec(),
            (0..n).collect(),
            (0..n).collect(),
        )
    }

    /// One object per polyline; consecutive vertices become segments.
    pub fn from_polylines(id: LayerId, lines: &[Vec<Vec3>]) -> Result<Self, LayerError> {
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let mut object_ids = Vec::new();

        for (object, line) in lines.iter().enumerate() {
            let base = positions.len() as u32;
            for (i, p) in line.iter().enumerate() {
                positions.push(*p);
                object_ids.push(object as u32);
                if i > 0 {
                    indices.push(base + i as u32 - 1);
                    indices.push(base + i as u32);
                }
            }
        }

        Self::new(id, Primitive::Lines, positions, indices, object_ids)
    }

    /// One object per polygon. Each polygon is an outer ring followed by
    /// holes; rings are triangulated in the xy plane.
    pub fn from_polygons(id: LayerId, polygons: &[Vec<Vec<Vec3>>]) -> Result<Self, LayerError> {
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let mut object_ids = Vec::new();

        for (object, rings) in polygons.iter().enumerate() {
            let base = positions.len();
            let mut coords_2d: Vec<f64> = Vec::new();
            let mut hole_indices: Vec<usize> = Vec::new();
            let mut local = 0usize;

            for (ring_i, ring) in rings.iter().enumerate() {
                let mut ring_pts = ring.clone();
                drop_closing_duplicate(&mut ring_pts);
                if ring_pts.len() < 3 {
                    continue;
                }
                if ring_i > 0 {
                    hole_indices.push(local);
                }
                for p in ring_pts {
                    coords_2d.push(p.x);
                    coords_2d.push(p.y);
                    positions.push(p);
                    object_ids.push(object as u32);
                    local += 1;
                }
            }

            if local < 3 {
                continue;
            }

            let tris = earcut(&coords_2d, &hole_indices, 2).map_err(|_| {
                LayerError::Triangulation {
                    layer: id.clone(),
                    polygon: object,
                }
            })?;
            indices.extend(tris.into_iter().map(|i| (base + i) as u32));
        }

        Self::new(id, Primitive::Triangles, positions, indices, object_ids)
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn object_ids(&self) -> &[u32] {
        &self.object_ids
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of logical objects (highest object id + 1).
    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        self.bounds
    }

    /// Primitives as index slices of length [`Primitive::arity`].
    pub fn primitives(&self) -> impl Iterator<Item = &[u32]> {
        self.indices.chunks_exact(self.primitive.arity())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeChannel> {
        self.attributes.get(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Replace (or add) a per-vertex attribute channel. Returns the previous channel.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        channel: AttributeChannel,
    ) -> Result<Option<AttributeChannel>, LayerError> {
        let name = name.into();
        if channel.len() != self.positions.len() {
            return Err(LayerError::AttributeLength {
                layer: self.id.clone(),
                attribute: name,
                expected: self.positions.len(),
                got: channel.len(),
            });
        }
        Ok(self.attributes.insert(name, channel))
    }
}

fn drop_closing_duplicate(points: &mut Vec<Vec3>) {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied())
        && points.len() >= 2
        && (first.x - last.x).abs() < 1e-9
        && (first.y - last.y).abs() < 1e-9
        && (first.z - last.z).abs() < 1e-9
    {
        points.pop();
    }
}

/// Sole owner of loaded layers. Knots refer to layers by [`LayerId`].
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<LayerId, Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: Layer) -> Result<&Layer, LayerError> {
        let id = layer.id().clone();
        if self.layers.contains_key(&id) {
            return Err(LayerError::DuplicateLayerId(id));
        }
        Ok(self.layers.entry(id).or_insert(layer))
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn get_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        self.layers.remove(id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeChannel, Layer, LayerError, LayerId, LayerRegistry, Primitive};
    use foundation::math::Vec3;

    fn v(x: f64, y: f64) -> Vec3 {
        Vec3::new(x, y, 0.0)
    }

    #[test]
    fn rejects_indices_out_of_range() {
        let err = Layer::new(
            LayerId::new("a"),
            Primitive::Triangles,
            vec![v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)],
            vec![0, 1, 3],
            vec![0, 0, 0],
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::IndexOutOfRange { index: 3, .. }));
    }

    #[test]
    fn rejects_partial_primitives() {
        let err = Layer::new(
            LayerId::new("a"),
            Primitive::Lines,
            vec![v(0.0, 0.0), v(1.0, 0.0)],
            vec![0, 1, 1],
            vec![0, 0],
        )
        .unwrap_err();
        assert!(matches!(err, LayerError::MalformedIndices { len: 3, .. }));
    }

    #[test]
    fn polylines_become_segments_per_object() {
        let layer = Layer::from_polylines(
            LayerId::new("roads"),
            &[
                vec![v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)],
                vec![v(0.0, 5.0), v(0.0, 6.0)],
            ],
        )
        .unwrap();
        assert_eq!(layer.primitive(), Primitive::Lines);
        assert_eq!(layer.indices(), &[0, 1, 1, 2, 3, 4]);
        assert_eq!(layer.object_ids(), &[0, 0, 0, 1, 1]);
        assert_eq!(layer.object_count(), 2);
        assert_eq!(layer.primitives().count(), 3);
    }

    #[test]
    fn polygons_are_triangulated() {
        let square = vec![vec![
            v(0.0, 0.0),
            v(10.0, 0.0),
            v(10.0, 10.0),
            v(0.0, 10.0),
            v(0.0, 0.0),
        ]];
        let layer = Layer::from_polygons(LayerId::new("parks"), &[square]).unwrap();
        assert_eq!(layer.vertex_count(), 4);
        assert_eq!(layer.primitives().count(), 2);
        assert!(layer.object_ids().iter().all(|&o| o == 0));
    }

    #[test]
    fn attribute_length_must_match_vertices() {
        let mut layer = Layer::from_points(LayerId::new("p"), &[v(0.0, 0.0), v(1.0, 1.0)]).unwrap();
        let err = layer
            .set_attribute("temp", AttributeChannel::Scalar(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, LayerError::AttributeLength { expected: 2, got: 1, .. }));

        let prev = layer
            .set_attribute("temp", AttributeChannel::Scalar(vec![1.0, 3.0]))
            .unwrap();
        assert!(prev.is_none());
        assert_eq!(layer.attribute("temp").unwrap().normalized(1), Some(1.0));
    }

    #[test]
    fn normalization_handles_constant_and_nan() {
        let c = AttributeChannel::Scalar(vec![2.0, 2.0, f64::NAN]);
        assert_eq!(c.scalar_range(), Some((2.0, 2.0)));
        assert_eq!(c.normalized(0), Some(0.0));
        assert_eq!(c.normalized(2), None);
        assert_eq!(
            AttributeChannel::Categorical(vec!["a".into()]).normalized(0),
            None
        );
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let mut reg = LayerRegistry::new();
        reg.insert(Layer::from_points(LayerId::new("p"), &[v(0.0, 0.0)]).unwrap())
            .unwrap();
        let err = reg
            .insert(Layer::from_points(LayerId::new("p"), &[v(1.0, 0.0)]).unwrap())
            .unwrap_err();
        assert_eq!(err, LayerError::DuplicateLayerId(LayerId::new("p")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn rebuilding_a_layer_bumps_its_generation() {
        let points = [Vec3::new(0.0, 0.0, 0.0)];
        let a = Layer::from_points(LayerId::new("p"), &points).unwrap();
        let b = Layer::from_points(LayerId::new("p"), &points).unwrap();
        assert_ne!(a.generation(), b.generation());
        assert_eq!(a, b);
        assert_eq!(a.clone().generation(), a.generation());
    }
}
