use foundation::math::Vec3;
use layers::{ColorError, LayerId, LayerRegistry, Primitive, StyleError};
use scene::{Camera, Highlight, Knot, KnotManager, PickResult, PickTable, Projection};
use tracing::{debug, warn};

use crate::raster::{FragmentInput, ScreenVertex, draw_line, draw_point, fill_triangle};
use crate::resources::{GpuResources, LayerBuffers};
use crate::shader::{DEFAULT_HIGHLIGHT, DisplayShader, FragmentShader, PickingShader};
use crate::targets::{PickBuffer, RenderTarget};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    UnknownLayer { knot: String, layer: LayerId },
    Color(ColorError),
    Style(StyleError),
    PickIdsExhausted { knot: String },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::UnknownLayer { knot, layer } => {
                write!(f, "knot {knot} references unknown layer {layer}")
            }
            RenderError::Color(err) => write!(f, "{err}"),
            RenderError::Style(err) => write!(f, "{err}"),
            RenderError::PickIdsExhausted { knot } => {
                write!(f, "no pick ids left for knot {knot}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Color(err) => Some(err),
            RenderError::Style(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ColorError> for RenderError {
    fn from(err: ColorError) -> Self {
        RenderError::Color(err)
    }
}

impl From<StyleError> for RenderError {
    fn from(err: StyleError) -> Self {
        RenderError::Style(err)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub fov_y_deg: f64,
    pub near: f64,
    pub background: [u8; 4],
    pub highlight_color: [u8; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fov_y_deg: 45.0,
            near: 1.0,
            background: [0, 0, 0, 255],
            highlight_color: DEFAULT_HIGHLIGHT,
        }
    }
}

/// Outcome of one display pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Knots drawn, in draw order.
    pub drawn: Vec<String>,
    /// Knots skipped and why; the rest of the frame is unaffected.
    pub skipped: Vec<(String, RenderError)>,
    pub fragments: usize,
}

/// Everything a pass reads, captured once so the display and picking
/// passes of an interaction see the same state.
#[derive(Clone, Copy)]
pub struct FrameInput<'a> {
    pub camera: &'a Camera,
    pub knots: &'a KnotManager,
    pub layers: &'a LayerRegistry,
}

/// Software renderer for knots: a display pass into an RGBA target and a
/// picking pass into an id buffer.
///
/// Ordering contract:
/// - Knots draw in [`KnotManager::visible_knots`] order; depth decides
///   overlap, with the earlier knot winning exact ties.
/// - A pick renders its own picking pass from the given [`FrameInput`]
///   before reading back, so it never observes a different camera or
///   knot set than the one passed in.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    projection: Projection,
    resources: GpuResources,
    color: RenderTarget,
    pick: PickBuffer,
    pick_table: PickTable,
    highlight: Highlight,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            projection: Projection::new(config.fov_y_deg, config.near, config.width, config.height),
            resources: GpuResources::new(),
            color: RenderTarget::new(config.width, config.height, config.background),
            pick: PickBuffer::new(config.width, config.height),
            pick_table: PickTable::new(),
            highlight: Highlight::new(),
            config,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn color_target(&self) -> &RenderTarget {
        &self.color
    }

    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    pub fn highlight(&self) -> &Highlight {
        &self.highlight
    }

    /// Draw every visible knot into the color target.
    pub fn render_frame(&mut self, input: FrameInput<'_>) -> FrameReport {
        self.color.clear(self.config.background);
        let mut report = FrameReport::default();

        for knot in input.knots.visible_knots() {
            match self.draw_display(&input, knot) {
                Ok(fragments) => {
                    report.fragments += fragments;
                    report.drawn.push(knot.id().to_string());
                }
                Err(err) => {
                    warn!(knot = knot.id(), error = %err, "knot skipped");
                    report.skipped.push((knot.id().to_string(), err));
                }
            }
        }
        report
    }

    fn draw_display(&mut self, input: &FrameInput<'_>, knot: &Knot) -> Result<usize, RenderError> {
        let layer = input
            .layers
            .get(knot.layer())
            .ok_or_else(|| RenderError::UnknownLayer {
                knot: knot.id().to_string(),
                layer: knot.layer().clone(),
            })?;
        let style = knot.style();
        let values = style.color_values(layer)?;
        let heights = style.heights(layer)?;
        // Upload first; the draw below borrows the caches immutably.
        let lut_key = style.lut_key();
        self.resources.style_lut(style)?;
        self.resources.layer_buffers(layer);

        let (Some(lut), Some(buffers)) = (
            self.resources.cached_lut(&lut_key),
            self.resources.cached_layer(layer.id()),
        ) else {
            return Ok(0);
        };
        let shader = DisplayShader {
            knot: knot.id(),
            lut,
            highlight: &self.highlight,
            highlight_color: self.config.highlight_color,
        };
        Ok(draw_buffers(
            &mut self.color,
            &self.projection,
            input.camera,
            buffers,
            &values,
            &heights,
            style.point_size(),
            &shader,
        ))
    }

    /// Render the picking pass for `input`. Returns the number of knots drawn.
    pub fn render_picking(&mut self, input: FrameInput<'_>) -> usize {
        self.pick.clear();
        self.pick_table = PickTable::new();
        let mut drawn = 0;

        for knot in input.knots.visible_knots() {
            match self.draw_picking(&input, knot) {
                Ok(()) => drawn += 1,
                Err(err) => warn!(knot = knot.id(), error = %err, "knot skipped in picking pass"),
            }
        }
        drawn
    }

    fn draw_picking(&mut self, input: &FrameInput<'_>, knot: &Knot) -> Result<(), RenderError> {
        let layer = input
            .layers
            .get(knot.layer())
            .ok_or_else(|| RenderError::UnknownLayer {
                knot: knot.id().to_string(),
                layer: knot.layer().clone(),
            })?;
        // Knots the display pass would skip are not pickable either.
        self.resources.style_lut(knot.style())?;
        let heights = knot.style().heights(layer)?;
        let base = self
            .pick_table
            .register(knot.id(), layer.object_count())
            .ok_or_else(|| RenderError::PickIdsExhausted {
                knot: knot.id().to_string(),
            })?;
        self.resources.layer_buffers(layer);
        let Some(buffers) = self.resources.cached_layer(layer.id()) else {
            return Ok(());
        };
        let values = vec![0.0; layer.vertex_count()];
        draw_buffers(
            self.pick.target_mut(),
            &self.projection,
            input.camera,
            buffers,
            &values,
            &heights,
            knot.style().point_size(),
            &PickingShader { base },
        );
        Ok(())
    }

    /// Resolve the object under pixel `(sx, sy)`.
    ///
    /// `None` means nothing was hit there, which is not an error.
    pub fn pick(&mut self, input: FrameInput<'_>, sx: u32, sy: u32) -> Option<PickResult> {
        self.render_picking(input);
        let id = self.pick.read_pixel(sx, sy);
        let hit = self.pick_table.decode(id);
        match &hit {
            Some(h) => debug!(sx, sy, knot = %h.knot, object = ?h.object, "pick hit"),
            None => debug!(sx, sy, "pick miss"),
        }
        hit
    }

    /// Every distinct object inside the screen rectangle, in id order.
    pub fn pick_rect(
        &mut self,
        input: FrameInput<'_>,
        (x0, y0): (u32, u32),
        (x1, y1): (u32, u32),
    ) -> Vec<PickResult> {
        self.render_picking(input);
        self.pick
            .read_rect(x0, y0, x1, y1)
            .into_iter()
            .filter_map(|id| self.pick_table.decode(id))
            .collect()
    }

    /// Highlight one object on the next display pass. Idempotent.
    pub fn set_picked_object(&mut self, knot: &str, object: u32) {
        self.highlight.set_picked(knot, object);
    }

    /// Remove every highlight. Idempotent.
    pub fn clear_picking(&mut self) {
        self.highlight.clear();
    }

    /// Add brushed objects to the highlight.
    pub fn apply_brush(&mut self, hits: &[PickResult]) {
        self.highlight.brush(hits);
    }

    /// Drop a layer's resident buffers, e.g. after its last knot is removed.
    pub fn release_layer(&mut self, layer: &LayerId) -> bool {
        self.resources.release_layer(layer)
    }

    pub fn teardown(&mut self) {
        self.resources.release_all();
        self.highlight.clear();
    }
}

fn project_vertex(
    projection: &Projection,
    camera: &Camera,
    buffers: &LayerBuffers,
    i: usize,
    value: f64,
    height: f64,
) -> Option<ScreenVertex> {
    let p = buffers.world_position(i)?;
    let world = Vec3::new(p.x, p.y, p.z + height);
    let s = projection.project(camera, world)?;
    Some(ScreenVertex {
        x: s.x,
        y: s.y,
        depth: s.depth,
        value,
    })
}

/// Rasterize every primitive of `buffers`. Primitives with a vertex behind
/// the near plane are dropped whole.
#[allow(clippy::too_many_arguments)]
fn draw_buffers(
    target: &mut RenderTarget,
    projection: &Projection,
    camera: &Camera,
    buffers: &LayerBuffers,
    values: &[f64],
    heights: &[f64],
    point_size: u32,
    shader: &impl FragmentShader,
) -> usize {
    let screen: Vec<Option<ScreenVertex>> = (0..buffers.vertices.len())
        .map(|i| {
            let value = values.get(i).copied().unwrap_or(0.0);
            let height = heights.get(i).copied().unwrap_or(0.0);
            project_vertex(projection, camera, buffers, i, value, height)
        })
        .collect();

    let mut fragments = 0;
    for prim in buffers.indices.chunks_exact(buffers.primitive.arity()) {
        let object = buffers.vertices[prim[0] as usize].object;
        let shade = |f: FragmentInput| shader.shade(object, f);
        match (buffers.primitive, prim) {
            (Primitive::Points, &[a]) => {
                if let Some(a) = screen[a as usize] {
                    fragments += draw_point(target, a, point_size, shade);
                }
            }
            (Primitive::Lines, &[a, b]) => {
                if let (Some(a), Some(b)) = (screen[a as usize], screen[b as usize]) {
                    fragments += draw_line(target, a, b, shade);
                }
            }
            (Primitive::Triangles, &[a, b, c]) => {
                if let (Some(a), Some(b), Some(c)) =
                    (screen[a as usize], screen[b as usize], screen[c as usize])
                {
                    fragments += fill_triangle(target, [a, b, c], shade);
                }
            }
            _ => {}
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::{FrameInput, RenderError, Renderer, RendererConfig};
    use foundation::math::Vec3;
    use layers::{
        AttributeChannel, ColorError, Layer, LayerId, LayerRegistry, StyleSpec,
    };
    use scene::{Camera, KnotManager, ResolutionRange};

    fn square(x: f64, y: f64, half: f64) -> Vec<Vec<Vec3>> {
        vec![vec![
            Vec3::new(x - half, y - half, 0.0),
            Vec3::new(x + half, y - half, 0.0),
            Vec3::new(x + half, y + half, 0.0),
            Vec3::new(x - half, y + half, 0.0),
        ]]
    }

    fn setup() -> (LayerRegistry, KnotManager) {
        let mut layers = LayerRegistry::new();
        let mut layer =
            Layer::from_polygons(LayerId::new("blocks"), &[square(-20.0, 0.0, 5.0)]).unwrap();
        layer
            .set_attribute("v", AttributeChannel::Scalar(vec![0.0, 1.0, 2.0, 3.0]))
            .unwrap();
        layers.insert(layer).unwrap();

        let mut knots = KnotManager::new();
        knots
            .create_knot(
                "blocks",
                LayerId::new("blocks"),
                StyleSpec::by_attribute("v", "interpolateViridis"),
                ResolutionRange::UNBOUNDED,
                "main",
                true,
            )
            .unwrap();
        (layers, knots)
    }

    fn config() -> RendererConfig {
        RendererConfig {
            width: 64,
            height: 64,
            fov_y_deg: 90.0,
            ..RendererConfig::default()
        }
    }

    #[test]
    fn unknown_color_scale_skips_only_that_knot() {
        let (layers, mut knots) = setup();
        knots
            .create_knot(
                "broken",
                LayerId::new("blocks"),
                StyleSpec::by_attribute("v", "interpolateNope"),
                ResolutionRange::UNBOUNDED,
                "main",
                true,
            )
            .unwrap();
        let camera = Camera::top_down(0.0, 0.0, 50.0);
        let mut r = Renderer::new(config());
        let report = r.render_frame(FrameInput {
            camera: &camera,
            knots: &knots,
            layers: &layers,
        });
        assert_eq!(report.drawn, vec!["blocks".to_string()]);
        assert_eq!(
            report.skipped,
            vec![(
                "broken".to_string(),
                RenderError::Color(ColorError::UnknownColorScale("interpolateNope".into()))
            )]
        );
        assert!(report.fragments > 0);
    }

    #[test]
    fn highlight_changes_next_display_pass_only() {
        let (layers, knots) = setup();
        let camera = Camera::top_down(-20.0, 0.0, 50.0);
        let input = FrameInput {
            camera: &camera,
            knots: &knots,
            layers: &layers,
        };
        let mut r = Renderer::new(config());
        r.render_frame(input);
        let before = r.color_target().pixel(32, 32).unwrap();

        r.set_picked_object("blocks", 0);
        r.set_picked_object("blocks", 0);
        assert_eq!(r.color_target().pixel(32, 32).unwrap(), before);
        r.render_frame(input);
        assert_eq!(r.color_target().pixel(32, 32).unwrap(), [255, 221, 0, 255]);

        r.clear_picking();
        r.clear_picking();
        r.render_frame(input);
        assert_eq!(r.color_target().pixel(32, 32).unwrap(), before);
        assert_eq!(layers.get(&LayerId::new("blocks")).unwrap().vertex_count(), 4);
    }

    #[test]
    fn teardown_releases_everything() {
        let (layers, knots) = setup();
        let camera = Camera::top_down(0.0, 0.0, 50.0);
        let mut r = Renderer::new(config());
        r.render_frame(FrameInput {
            camera: &camera,
            knots: &knots,
            layers: &layers,
        });
        assert!(r.resources().allocated_bytes() > 0);
        r.teardown();
        assert_eq!(r.resources().allocated_bytes(), 0);
    }

    #[test]
    fn category_colors_reach_the_display_pass() {
        let (mut layers, mut knots) = setup();
        layers
            .get_mut(&LayerId::new("blocks"))
            .unwrap()
            .set_attribute("zone", AttributeChannel::Categorical(vec!["park".into(); 4]))
            .unwrap();
        knots.remove_knot("blocks");
        knots
            .create_knot(
                "zones",
                LayerId::new("blocks"),
                StyleSpec::by_category("zone", [("park", "lime"), ("lot", "gray")]),
                ResolutionRange::UNBOUNDED,
                "main",
                true,
            )
            .unwrap();
        let camera = Camera::top_down(-20.0, 0.0, 50.0);
        let mut r = Renderer::new(config());
        let report = r.render_frame(FrameInput {
            camera: &camera,
            knots: &knots,
            layers: &layers,
        });
        assert_eq!(report.drawn, vec!["zones".to_string()]);
        assert_eq!(r.color_target().pixel(32, 32), Some([0, 255, 0, 255]));
    }
}
