//! Style specifications: which attribute drives which visual channel.
//!
//! Each channel is a closed set of variants, so a style is checked against
//! its layer once at load time and the draw path never sees an unresolvable
//! attribute or color scale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::colormap::{ColorError, ColorLut, ColorSource, normalize_u8, parse_color};
use crate::layer::{AttributeChannel, Layer};

/// Reduction of per-vertex values to one value per object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    Max,
    Min,
    Avg,
    Sum,
    /// Number of vertices in the object.
    Count,
    /// Value of the object's first vertex.
    Discard,
}

impl Aggregation {
    /// Reduce `values` (one per vertex) per object and write each object's
    /// result back to all of its vertices.
    ///
    /// Non-finite values are ignored by `max`, `min`, `avg` and `sum`; an
    /// object with no finite value yields NaN.
    pub fn apply(self, values: &[f64], object_ids: &[u32], object_count: u32) -> Vec<f64> {
        #[derive(Clone, Copy)]
        struct Acc {
            first: Option<f64>,
            count: usize,
            finite: usize,
            sum: f64,
            min: f64,
            max: f64,
        }
        let mut accs = vec![
            Acc {
                first: None,
                count: 0,
                finite: 0,
                sum: 0.0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            };
            object_count as usize
        ];
        for (&v, &o) in values.iter().zip(object_ids) {
            let Some(acc) = accs.get_mut(o as usize) else {
                continue;
            };
            acc.first.get_or_insert(v);
            acc.count += 1;
            if v.is_finite() {
                acc.finite += 1;
                acc.sum += v;
                acc.min = acc.min.min(v);
                acc.max = acc.max.max(v);
            }
        }
        let reduced: Vec<f64> = accs
            .iter()
            .map(|acc| match self {
                Aggregation::Count => acc.count as f64,
                Aggregation::Discard => acc.first.unwrap_or(f64::NAN),
                _ if acc.finite == 0 => f64::NAN,
                Aggregation::Max => acc.max,
                Aggregation::Min => acc.min,
                Aggregation::Sum => acc.sum,
                Aggregation::Avg => acc.sum / acc.finite as f64,
            })
            .collect();
        object_ids
            .iter()
            .map(|&o| reduced.get(o as usize).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColorChannel {
    /// Color each vertex by a scalar attribute normalized to `[0, 1]`.
    #[serde(rename_all = "camelCase")]
    ByAttribute {
        attribute: String,
        /// Empty until resolved against the session's default color map.
        #[serde(default)]
        color_map: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aggregation: Option<Aggregation>,
    },
    /// Color each vertex by the literal color of its category.
    ByCategory {
        attribute: String,
        colors: BTreeMap<String, String>,
        /// Color of categories missing from `colors`.
        #[serde(default = "default_other_color")]
        other: String,
    },
    Fixed {
        color: String,
    },
}

fn default_other_color() -> String {
    "gray".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HeightChannel {
    /// Extrude by `attribute * scale` world units.
    ByAttribute {
        attribute: String,
        #[serde(default = "unit_scale")]
        scale: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aggregation: Option<Aggregation>,
    },
    Fixed {
        height: f64,
    },
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SizeChannel {
    Fixed { pixels: u32 },
}

impl SizeChannel {
    pub fn pixels(&self) -> u32 {
        match self {
            SizeChannel::Fixed { pixels } => *pixels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    pub color: ColorChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<HeightChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeChannel>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleError {
    MissingAttribute { layer: String, attribute: String },
    NotScalar { layer: String, attribute: String },
    NotCategorical { layer: String, attribute: String },
    Color(ColorError),
}

impl std::fmt::Display for StyleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleError::MissingAttribute { layer, attribute } => {
                write!(f, "layer {layer} has no attribute {attribute}")
            }
            StyleError::NotScalar { layer, attribute } => {
                write!(f, "attribute {attribute} of layer {layer} is not scalar")
            }
            StyleError::NotCategorical { layer, attribute } => {
                write!(f, "attribute {attribute} of layer {layer} is not categorical")
            }
            StyleError::Color(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StyleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StyleError::Color(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ColorError> for StyleError {
    fn from(err: ColorError) -> Self {
        StyleError::Color(err)
    }
}

impl StyleSpec {
    pub fn fixed(color: impl Into<String>) -> Self {
        Self {
            color: ColorChannel::Fixed {
                color: color.into(),
            },
            height: None,
            size: None,
        }
    }

    pub fn by_attribute(attribute: impl Into<String>, color_map: impl Into<String>) -> Self {
        Self {
            color: ColorChannel::ByAttribute {
                attribute: attribute.into(),
                color_map: color_map.into(),
                aggregation: None,
            },
            height: None,
            size: None,
        }
    }

    pub fn by_category<K, V>(
        attribute: impl Into<String>,
        colors: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            color: ColorChannel::ByCategory {
                attribute: attribute.into(),
                colors: colors
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
                other: default_other_color(),
            },
            height: None,
            size: None,
        }
    }

    /// Aggregate the color attribute per object before normalizing. No-op
    /// for channels without a scalar attribute.
    pub fn aggregated(mut self, by: Aggregation) -> Self {
        if let ColorChannel::ByAttribute { aggregation, .. } = &mut self.color {
            *aggregation = Some(by);
        }
        self
    }

    pub fn with_height(mut self, height: HeightChannel) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_size(mut self, pixels: u32) -> Self {
        self.size = Some(SizeChannel::Fixed { pixels });
        self
    }

    /// Fill an unnamed attribute color map with `default`.
    pub fn with_default_color_map(mut self, default: &str) -> Self {
        if let ColorChannel::ByAttribute { color_map, .. } = &mut self.color
            && color_map.is_empty()
        {
            *color_map = default.to_string();
        }
        self
    }

    /// Name of the scale or literal color the color channel resolves
    /// through. For category colors this is the fallback color.
    pub fn color_name(&self) -> &str {
        match &self.color {
            ColorChannel::ByAttribute { color_map, .. } => color_map,
            ColorChannel::ByCategory { other, .. } => other,
            ColorChannel::Fixed { color } => color,
        }
    }

    pub fn color_source(&self) -> Result<ColorSource, ColorError> {
        ColorSource::resolve(self.color_name())
    }

    /// Cache key of the lookup table [`StyleSpec::build_lut`] produces.
    pub fn lut_key(&self) -> String {
        match &self.color {
            ColorChannel::ByCategory { colors, other, .. } => {
                let mut key = format!("categories[{other}");
                for (category, color) in colors {
                    key.push_str(&format!(";{category}={color}"));
                }
                key.push(']');
                key
            }
            _ => self.color_name().to_string(),
        }
    }

    /// Lookup table for the color channel. Scales and literal colors are
    /// sampled at `resolution` points; category colors become a palette
    /// with the fallback first and one entry per category in key order.
    pub fn build_lut(&self, resolution: usize) -> Result<ColorLut, ColorError> {
        match &self.color {
            ColorChannel::ByCategory { colors, other, .. } => {
                let resolve = |name: &String| {
                    parse_color(name)
                        .map(normalize_u8)
                        .ok_or_else(|| ColorError::UnknownColorScale(name.clone()))
                };
                let mut entries = vec![resolve(other)?];
                for color in colors.values() {
                    entries.push(resolve(color)?);
                }
                Ok(ColorLut::from_entries(entries))
            }
            _ => ColorLut::build(self.color_name(), resolution),
        }
    }

    /// Point size in pixels; 1 when unset.
    pub fn point_size(&self) -> u32 {
        self.size.as_ref().map(SizeChannel::pixels).unwrap_or(1).max(1)
    }

    /// Check every channel against `layer`.
    pub fn validate(&self, layer: &Layer) -> Result<(), StyleError> {
        match &self.color {
            ColorChannel::ByAttribute { attribute, .. } => {
                self.color_source()?;
                require_scalar(layer, attribute)?;
            }
            ColorChannel::ByCategory { attribute, .. } => {
                self.build_lut(1)?;
                require_categorical(layer, attribute)?;
            }
            ColorChannel::Fixed { .. } => {
                self.color_source()?;
            }
        }
        if let Some(HeightChannel::ByAttribute { attribute, .. }) = &self.height {
            require_scalar(layer, attribute)?;
        }
        Ok(())
    }

    /// Color-channel input per vertex, in `[0, 1]`. Fixed colors sample at
    /// 0; category colors land exactly on their palette entry.
    ///
    /// Vertices with a non-finite attribute value also map to 0.
    pub fn color_values(&self, layer: &Layer) -> Result<Vec<f64>, StyleError> {
        match &self.color {
            ColorChannel::Fixed { .. } => Ok(vec![0.0; layer.vertex_count()]),
            ColorChannel::ByAttribute {
                attribute,
                aggregation,
                ..
            } => {
                let values = scalar_values(layer, attribute, *aggregation)?;
                let channel = AttributeChannel::Scalar(values);
                let (lo, hi) = channel.scalar_range().unwrap_or((0.0, 0.0));
                Ok((0..layer.vertex_count())
                    .map(|i| channel.normalized_with(i, lo, hi).unwrap_or(0.0))
                    .collect())
            }
            ColorChannel::ByCategory {
                attribute, colors, ..
            } => {
                let categories = require_categorical(layer, attribute)?;
                let last = colors.len().max(1) as f64;
                Ok(categories
                    .iter()
                    .map(|c| match colors.keys().position(|k| k == c) {
                        Some(i) => (i + 1) as f64 / last,
                        None => 0.0,
                    })
                    .collect())
            }
        }
    }

    /// Height offset per vertex in world units.
    pub fn heights(&self, layer: &Layer) -> Result<Vec<f64>, StyleError> {
        match &self.height {
            None => Ok(vec![0.0; layer.vertex_count()]),
            Some(HeightChannel::Fixed { height }) => Ok(vec![*height; layer.vertex_count()]),
            Some(HeightChannel::ByAttribute {
                attribute,
                scale,
                aggregation,
            }) => {
                let values = scalar_values(layer, attribute, *aggregation)?;
                Ok(values
                    .iter()
                    .map(|v| if v.is_finite() { v * scale } else { 0.0 })
                    .collect())
            }
        }
    }
}

fn lookup<'a>(layer: &'a Layer, attribute: &str) -> Result<&'a AttributeChannel, StyleError> {
    layer
        .attribute(attribute)
        .ok_or_else(|| StyleError::MissingAttribute {
            layer: layer.id().to_string(),
            attribute: attribute.to_string(),
        })
}

fn require_scalar<'a>(layer: &'a Layer, attribute: &str) -> Result<&'a [f64], StyleError> {
    lookup(layer, attribute)?
        .as_scalar()
        .ok_or_else(|| StyleError::NotScalar {
            layer: layer.id().to_string(),
            attribute: attribute.to_string(),
        })
}

fn require_categorical<'a>(layer: &'a Layer, attribute: &str) -> Result<&'a [String], StyleError> {
    lookup(layer, attribute)?
        .as_categories()
        .ok_or_else(|| StyleError::NotCategorical {
            layer: layer.id().to_string(),
            attribute: attribute.to_string(),
        })
}

/// Per-vertex values of a scalar attribute, reduced per object first when
/// `aggregation` is set.
fn scalar_values(
    layer: &Layer,
    attribute: &str,
    aggregation: Option<Aggregation>,
) -> Result<Vec<f64>, StyleError> {
    let values = require_scalar(layer, attribute)?;
    Ok(match aggregation {
        Some(by) => by.apply(values, layer.object_ids(), layer.object_count()),
        None => values.to_vec(),
    })
}
