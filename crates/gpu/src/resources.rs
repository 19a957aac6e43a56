//! Layer-scoped GPU resources.
//!
//! Geometry is uploaded once per layer and shared by every knot drawing
//! it. Positions are stored as `f32` offsets from a per-layer `f64` origin
//! so that world coordinates near `2^30` keep sub-unit precision.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use bytemuck::{Pod, Zeroable};
use foundation::math::{CameraRelative, Vec3};
use layers::{ColorError, ColorLut, Layer, LayerId, Primitive, StyleSpec};
use tracing::{debug, info};

/// Entries in every uploaded color lookup table.
pub const LUT_RESOLUTION: usize = layers::colormap::DEFAULT_LUT_RESOLUTION;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    /// Offset from the owning buffer's origin.
    pub position: [f32; 3],
    pub object: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerBuffers {
    /// [`Layer::generation`] the buffers were built from.
    pub generation: u64,
    pub origin: Vec3,
    pub primitive: Primitive,
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
}

impl LayerBuffers {
    pub fn upload(layer: &Layer) -> Self {
        let origin = layer
            .bounds()
            .map(|b| {
                let c = b.center();
                Vec3::new(c[0], c[1], c[2])
            })
            .unwrap_or_default();
        let rel = CameraRelative::new(origin);
        let vertices = layer
            .positions()
            .iter()
            .zip(layer.object_ids())
            .map(|(p, &object)| GpuVertex {
                position: rel.to_f32(*p),
                object,
            })
            .collect();
        Self {
            generation: layer.generation(),
            origin,
            primitive: layer.primitive(),
            vertices,
            indices: layer.indices().to_vec(),
        }
    }

    /// World position of vertex `i` reconstructed in `f64`.
    pub fn world_position(&self, i: usize) -> Option<Vec3> {
        let v = self.vertices.get(i)?;
        Some(CameraRelative::new(self.origin).to_world(v.position))
    }

    pub fn byte_size(&self) -> usize {
        bytemuck::cast_slice::<GpuVertex, u8>(&self.vertices).len()
            + bytemuck::cast_slice::<u32, u8>(&self.indices).len()
    }
}

fn lut_bytes(lut: &ColorLut) -> usize {
    lut.len() * std::mem::size_of::<[f32; 3]>()
}

/// Cache of uploaded layer buffers and color lookup tables.
///
/// The byte ledger counts everything resident; it returns to zero after
/// [`GpuResources::release_all`], which also runs on drop.
#[derive(Debug, Default)]
pub struct GpuResources {
    layers: HashMap<LayerId, LayerBuffers>,
    luts: HashMap<String, ColorLut>,
    allocated_bytes: usize,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers for `layer`, uploading them on first use and again whenever
    /// the layer was rebuilt since the last upload.
    pub fn layer_buffers(&mut self, layer: &Layer) -> &LayerBuffers {
        let allocated = &mut self.allocated_bytes;
        match self.layers.entry(layer.id().clone()) {
            Entry::Occupied(entry) if entry.get().generation == layer.generation() => {
                entry.into_mut()
            }
            Entry::Occupied(mut entry) => {
                let fresh = LayerBuffers::upload(layer);
                *allocated = *allocated - entry.get().byte_size() + fresh.byte_size();
                debug!(
                    layer = %layer.id(),
                    generation = layer.generation(),
                    bytes = fresh.byte_size(),
                    "layer re-uploaded"
                );
                entry.insert(fresh);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let fresh = LayerBuffers::upload(layer);
                *allocated += fresh.byte_size();
                debug!(layer = %layer.id(), bytes = fresh.byte_size(), "layer uploaded");
                entry.insert(fresh)
            }
        }
    }

    /// Lookup table for the color channel of `style`, cached under
    /// [`StyleSpec::lut_key`].
    pub fn style_lut(&mut self, style: &StyleSpec) -> Result<&ColorLut, ColorError> {
        let key = style.lut_key();
        if !self.luts.contains_key(&key) {
            let lut = style.build_lut(LUT_RESOLUTION)?;
            self.allocated_bytes += lut_bytes(&lut);
            self.luts.insert(key.clone(), lut);
        }
        self.luts
            .get(&key)
            .ok_or(ColorError::UnknownColorScale(key))
    }

    /// Lookup table for the color scale or literal color `name`.
    pub fn color_lut(&mut self, name: &str) -> Result<&ColorLut, ColorError> {
        if !self.luts.contains_key(name) {
            let lut = ColorLut::build(name, LUT_RESOLUTION)?;
            self.allocated_bytes += lut_bytes(&lut);
            self.luts.insert(name.to_string(), lut);
        }
        self.luts
            .get(name)
            .ok_or_else(|| ColorError::UnknownColorScale(name.to_string()))
    }

    pub fn cached_layer(&self, layer: &LayerId) -> Option<&LayerBuffers> {
        self.layers.get(layer)
    }

    pub fn cached_lut(&self, name: &str) -> Option<&ColorLut> {
        self.luts.get(name)
    }

    pub fn is_resident(&self, layer: &LayerId) -> bool {
        self.layers.contains_key(layer)
    }

    pub fn release_layer(&mut self, layer: &LayerId) -> bool {
        let Some(buffers) = self.layers.remove(layer) else {
            return false;
        };
        self.allocated_bytes -= buffers.byte_size();
        debug!(layer = %layer, "layer released");
        true
    }

    pub fn release_all(&mut self) {
        if self.layers.is_empty() && self.luts.is_empty() {
            return;
        }
        info!(
            layers = self.layers.len(),
            luts = self.luts.len(),
            bytes = self.allocated_bytes,
            "releasing gpu resources"
        );
        self.layers.clear();
        self.luts.clear();
        self.allocated_bytes = 0;
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }
}

impl Drop for GpuResources {
    fn drop(&mut self) {
        self.release_all();
    }
}
