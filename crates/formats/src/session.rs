//! Session context: everything a running view owns, created when a scene
//! is loaded and dropped when the view closes.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use gpu::FrameInput;
use layers::{Layer, LayerId, LayerRegistry, StyleSpec};
use runtime::{EventBus, Frame};
use scene::{Camera, KnotError, KnotEvent, KnotManager, ResolutionMonitor};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::history::SpecHistory;
use crate::scene_spec::{KnotSpec, SceneSpec, SpecLoadError};

/// What one [`Session::apply_spec`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub restyled: Vec<String>,
    pub removed: Vec<String>,
    /// Layers whose previous geometry is gone; cached GPU buffers for them
    /// must be released.
    pub stale_layers: Vec<LayerId>,
    /// Camera declared by the document, if any.
    pub camera: Option<Camera>,
}

/// Ordering contract:
/// - `apply_spec` validates the whole document before touching any state;
///   a failed apply leaves the session as it was.
/// - Knot notifications reach [`Session::events`] on the next
///   [`Session::tick`], tagged with that tick's frame, in emission order.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    layers: LayerRegistry,
    knots: KnotManager,
    monitor: ResolutionMonitor,
    history: SpecHistory,
    events: EventBus<KnotEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            monitor: ResolutionMonitor::new(config.monitor_interval_s()),
            events: EventBus::bounded(config.event_log_limit),
            config,
            layers: LayerRegistry::new(),
            knots: KnotManager::with_event_queue(),
            history: SpecHistory::new(),
        }
    }

    /// Build a session from a scene file. Relative layer paths resolve
    /// against the file's directory.
    pub fn load(config: SessionConfig, path: impl AsRef<Path>) -> Result<(Self, ApplyReport), SpecLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SpecLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = SceneSpec::from_json_str(&text)?;
        let mut session = Self::new(config);
        let report = session.apply_spec(&spec, path.parent())?;
        info!(
            path = %path.display(),
            layers = session.layers.len(),
            knots = session.knots.len(),
            "session loaded"
        );
        Ok((session, report))
    }

    pub fn from_json_str(config: SessionConfig, s: &str) -> Result<(Self, ApplyReport), SpecLoadError> {
        let spec = SceneSpec::from_json_str(s)?;
        let mut session = Self::new(config);
        let report = session.apply_spec(&spec, None)?;
        Ok((session, report))
    }

    /// Reconcile the session with `spec`.
    ///
    /// Every layer is reloaded. Knots absent from `spec` are removed,
    /// knots whose layer, range or view changed are rebuilt, knots whose
    /// style alone changed are restyled in place (keeping their manual
    /// flag), and new knots are created.
    pub fn apply_spec(
        &mut self,
        spec: &SceneSpec,
        base_dir: Option<&Path>,
    ) -> Result<ApplyReport, SpecLoadError> {
        let camera = spec.camera.as_ref().map(|c| c.to_camera()).transpose()?;

        let mut staged: Vec<Layer> = Vec::with_capacity(spec.layers.len());
        for source in &spec.layers {
            let layer = source.load(base_dir, self.config.seed())?;
            if staged.iter().any(|l| l.id() == layer.id()) {
                return Err(layers::LayerError::DuplicateLayerId(layer.id().clone()).into());
            }
            staged.push(layer);
        }

        let mut seen = HashSet::new();
        let mut knot_specs: Vec<KnotSpec> = Vec::with_capacity(spec.knots.len());
        for knot in &spec.knots {
            if !seen.insert(knot.id.as_str()) {
                return Err(KnotError::DuplicateKnotId(knot.id.clone()).into());
            }
            let Some(layer) = staged.iter().find(|l| *l.id() == knot.layer) else {
                return Err(KnotError::UnknownLayer {
                    knot: knot.id.clone(),
                    layer: knot.layer.clone(),
                }
                .into());
            };
            let style = knot
                .style
                .clone()
                .with_default_color_map(&self.config.default_color_map);
            style.validate(layer).map_err(|source| SpecLoadError::Style {
                knot: knot.id.clone(),
                source,
            })?;
            knot_specs.push(KnotSpec {
                style,
                ..knot.clone()
            });
        }

        // Validated; commit.
        let mut report = ApplyReport {
            camera,
            ..ApplyReport::default()
        };
        let previous: Vec<LayerId> = self.layers.iter().map(|l| l.id().clone()).collect();
        for id in previous {
            self.layers.remove(&id);
            report.stale_layers.push(id);
        }
        for layer in staged {
            self.layers.insert(layer)?;
        }

        let existing: Vec<String> = self.knots.knots().map(|k| k.id().to_string()).collect();
        for id in existing {
            let keep = knot_specs.iter().find(|k| k.id == id).is_some_and(|k| {
                self.knots.get_knot_by_id(&id).is_some_and(|cur| {
                    *cur.layer() == k.layer
                        && cur.resolution() == k.resolution
                        && cur.view_id() == k.view_id
                })
            });
            if !keep {
                self.knots.remove_knot(&id);
                report.removed.push(id);
            }
        }

        for knot in knot_specs {
            if let Some(current) = self.knots.get_knot_by_id(&knot.id) {
                if *current.style() != knot.style {
                    self.knots.set_style(&knot.id, knot.style);
                    report.restyled.push(knot.id);
                }
                continue;
            }
            self.knots.create_knot(
                knot.id.clone(),
                knot.layer,
                knot.style,
                knot.resolution,
                knot.view_id,
                knot.visible,
            )?;
            report.created.push(knot.id);
        }
        // A rebuilt knot shows up both as removed and created.

        match spec.to_json_value() {
            Ok(doc) => {
                self.history.push(&doc);
            }
            Err(err) => debug!(%err, "scene document not recorded in history"),
        }
        info!(
            created = report.created.len(),
            restyled = report.restyled.len(),
            removed = report.removed.len(),
            "scene applied"
        );
        Ok(report)
    }

    /// Advance one frame: run the resolution guard if due and forward
    /// knot notifications into the event log. Returns whether the guard ran.
    pub fn tick(&mut self, frame: Frame, camera: &Camera) -> bool {
        let ran = self.monitor.tick(frame.time, camera, &mut self.knots);
        for event in self.knots.drain_events() {
            let kind = event.kind();
            self.events.emit(frame, kind, event);
        }
        ran
    }

    pub fn toggle_knot(&mut self, id: &str, value: Option<bool>) -> Option<bool> {
        self.knots.toggle_knot(id, value)
    }

    pub fn restyle_knot(&mut self, id: &str, style: StyleSpec) -> Result<bool, SpecLoadError> {
        let Some(knot) = self.knots.get_knot_by_id(id) else {
            return Ok(false);
        };
        let style = style.with_default_color_map(&self.config.default_color_map);
        if let Some(layer) = self.layers.get(knot.layer()) {
            style.validate(layer).map_err(|source| SpecLoadError::Style {
                knot: id.to_string(),
                source,
            })?;
        }
        Ok(self.knots.set_style(id, style))
    }

    /// Inputs for one render pass at `camera`.
    pub fn frame_input<'a>(&'a self, camera: &'a Camera) -> FrameInput<'a> {
        FrameInput {
            camera,
            knots: &self.knots,
            layers: &self.layers,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    pub fn knots(&self) -> &KnotManager {
        &self.knots
    }

    pub fn knots_mut(&mut self) -> &mut KnotManager {
        &mut self.knots
    }

    pub fn history(&self) -> &SpecHistory {
        &self.history
    }

    pub fn events(&self) -> &EventBus<KnotEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<KnotEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::config::{SessionConfig, Viewport};
    use gpu::Renderer;
    use crate::scene_spec::{SceneSpec, SpecLoadError};
    use layers::StyleSpec;
    use pretty_assertions::assert_eq;
    use runtime::Frame;
    use scene::{Camera, KnotError, KnotEvent, PickResult};

    const SCENE: &str = r##"{
        "camera": {"x": 0, "y": 0, "altitude": 100},
        "layers": [{"id": "pts", "data": {
            "geometry": {"type": "points", "points": [[0, 0], [5, 5]]},
            "attributes": {"v": [1.0, 2.0]}
        }}],
        "knots": [
            {"id": "near", "layer": "pts", "style": {"color": {"type": "byAttribute", "attribute": "v"}},
             "resolution": {"end": 50}},
            {"id": "always", "layer": "pts", "style": {"color": {"type": "fixed", "color": "#00f"}}}
        ]
    }"##;

    fn session() -> Session {
        Session::from_json_str(SessionConfig::default(), SCENE).unwrap().0
    }

    #[test]
    fn loading_creates_knots_and_resolves_default_color_map() {
        let (session, report) = Session::from_json_str(SessionConfig::default(), SCENE).unwrap();
        assert_eq!(report.created, ["near", "always"]);
        assert_eq!(report.camera.unwrap().altitude(), 100.0);
        let near = session.knots().get_knot_by_id("near").unwrap();
        assert_eq!(near.style().color_name(), "interpolateReds");
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn tick_runs_guard_and_logs_frame_tagged_events() {
        let mut s = session();
        // Creation notifications are forwarded on the first tick.
        let camera = Camera::top_down(0.0, 0.0, 100.0);
        assert!(s.tick(Frame::new(0, 1.0 / 60.0), &camera));
        assert!(!s.knots().get_knot_by_id("near").unwrap().is_visible());

        let low = Camera::top_down(0.0, 0.0, 10.0);
        assert!(!s.tick(Frame::new(1, 1.0 / 60.0), &low));
        assert!(s.tick(Frame::new(6, 1.0 / 60.0), &low));
        assert!(s.knots().get_knot_by_id("near").unwrap().is_visible());

        let last = s.events().events().last().unwrap();
        assert_eq!(last.frame_index, 6);
        let KnotEvent::KnotVisibility(map) = &last.payload;
        assert_eq!(map.get("near"), Some(&true));
        assert!(s.events().events_of_kind("knotVisibility").count() >= 3);
    }

    #[test]
    fn reapply_reconciles_knots() {
        let mut s = session();
        s.toggle_knot("always", Some(false));

        let next = SCENE
            .replace(r##""#00f""##, r##""#0f0""##)
            .replace(r#""end": 50"#, r#""end": 80"#);
        let spec = SceneSpec::from_json_str(&next).unwrap();
        let report = s.apply_spec(&spec, None).unwrap();
        assert_eq!(report.restyled, ["always"]);
        assert_eq!(report.removed, ["near"]);
        assert_eq!(report.created, ["near"]);
        assert_eq!(report.stale_layers.len(), 1);
        // Restyling keeps the manual flag.
        assert!(!s.knots().get_knot_by_id("always").unwrap().is_toggled_on());
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn failed_apply_leaves_session_untouched() {
        let mut s = session();
        let bad = SCENE.replace(r#""attribute": "v""#, r#""attribute": "missing""#);
        let spec = SceneSpec::from_json_str(&bad).unwrap();
        assert!(matches!(
            s.apply_spec(&spec, None),
            Err(SpecLoadError::Style { .. })
        ));
        assert_eq!(s.knots().len(), 2);
        assert_eq!(s.history().len(), 1);

        let dangling = SCENE.replace(r#""layer": "pts", "style": {"color": {"type": "fixed""#, r#""layer": "nope", "style": {"color": {"type": "fixed""#);
        let spec = SceneSpec::from_json_str(&dangling).unwrap();
        assert!(matches!(
            s.apply_spec(&spec, None),
            Err(SpecLoadError::Knot(KnotError::UnknownLayer { .. }))
        ));
    }

    #[test]
    fn restyle_validates_against_the_layer() {
        let mut s = session();
        assert!(s.restyle_knot("always", StyleSpec::by_attribute("v", "")).unwrap());
        assert_eq!(
            s.knots().get_knot_by_id("always").unwrap().style().color_name(),
            "interpolateReds"
        );
        assert!(s.restyle_knot("always", StyleSpec::by_attribute("nope", "")).is_err());
        assert!(!s.restyle_knot("ghost", StyleSpec::fixed("red")).unwrap());
    }

    #[test]
    fn load_resolves_layer_paths_next_to_the_scene() {
        let dir = std::env::temp_dir().join(format!("knotmap-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("pts.json"),
            r#"{"geometry": {"type": "points", "points": [[1, 1]]}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("scene.json"),
            r#"{"layers": [{"id": "pts", "path": "pts.json"}],
                "knots": [{"id": "k", "layer": "pts", "style": {"color": {"type": "fixed", "color": "red"}}}]}"#,
        )
        .unwrap();
        let (session, _) = Session::load(SessionConfig::default(), dir.join("scene.json")).unwrap();
        assert_eq!(session.layers().len(), 1);
        assert_eq!(session.knots().len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn event_log_keeps_only_the_newest_events() {
        let config = SessionConfig {
            event_log_limit: 4,
            ..SessionConfig::default()
        };
        let (mut s, _) = Session::from_json_str(config, SCENE).unwrap();
        let camera = Camera::top_down(0.0, 0.0, 100.0);
        for i in 0..20 {
            s.toggle_knot("always", None);
            s.tick(Frame::new(i, 1.0 / 60.0), &camera);
        }
        assert_eq!(s.events().len(), 4);
        assert!(s.events().dropped() > 0);
        assert_eq!(s.knots().pending_events(), 0);
        assert_eq!(s.events().events().last().unwrap().frame_index, 19);
    }

    fn square_scene(cx: f64) -> String {
        let (lo, hi) = (cx - 10.0, cx + 10.0);
        format!(
            r#"{{"layers": [{{"id": "blocks", "data": {{"geometry": {{"type": "polygons",
                 "polygons": [[[[{lo}, -10], [{hi}, -10], [{hi}, 10], [{lo}, 10]]]]}}}}}}],
               "knots": [{{"id": "k", "layer": "blocks", "style": {{"color": {{"type": "fixed", "color": "red"}}}}}}]}}"#
        )
    }

    #[test]
    fn picking_follows_geometry_after_reapply() {
        let config = SessionConfig {
            viewport: Viewport {
                width: 100,
                height: 100,
            },
            field_of_view_deg: 90.0,
            ..SessionConfig::default()
        };
        let mut renderer = Renderer::new(config.renderer_config().unwrap());
        let (mut s, _) = Session::from_json_str(config, &square_scene(-40.0)).unwrap();
        // 100 units up with a 90 degree fov: 0.5 px per world unit.
        let camera = Camera::top_down(0.0, 0.0, 100.0);
        let hit = Some(PickResult {
            knot: "k".to_string(),
            object: Some(0),
        });
        assert_eq!(renderer.pick(s.frame_input(&camera), 30, 50), hit);

        let moved = SceneSpec::from_json_str(&square_scene(40.0)).unwrap();
        s.apply_spec(&moved, None).unwrap();
        assert_eq!(renderer.pick(s.frame_input(&camera), 30, 50), None);
        assert_eq!(renderer.pick(s.frame_input(&camera), 70, 50), hit);
    }
}
