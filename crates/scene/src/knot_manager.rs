use std::collections::{BTreeMap, HashMap};

use layers::{LayerId, StyleSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::knot::Knot;
use crate::resolution::ResolutionRange;

/// Effective visibility of every knot, keyed by knot id.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Notifications produced by [`KnotManager`].
///
/// Serializes as `{"event": "knotVisibility", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum KnotEvent {
    KnotVisibility(VisibilityMap),
}

impl KnotEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            KnotEvent::KnotVisibility(_) => "knotVisibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnotError {
    DuplicateKnotId(String),
    UnknownLayer { knot: String, layer: LayerId },
}

impl std::fmt::Display for KnotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KnotError::DuplicateKnotId(id) => write!(f, "knot {id} already exists"),
            KnotError::UnknownLayer { knot, layer } => {
                write!(f, "knot {knot} references unknown layer {layer}")
            }
        }
    }
}

impl std::error::Error for KnotError {}

type Observer = Box<dyn FnMut(&KnotEvent)>;

/// Owner of every knot of a view and single writer of their visibility.
///
/// Ordering contract:
/// - Every mutation that can change visibility is followed by exactly one
///   notification carrying the full [`VisibilityMap`], emitted after the
///   mutation is applied.
/// - Knots iterate in creation order, which is also draw order.
/// - Observers run in subscription order.
/// - Notifications are queued for [`KnotManager::drain_events`] only when
///   the manager was built with [`KnotManager::with_event_queue`].
///
/// Visibility composes the manual flag with the resolution guard by AND.
/// Neither overwrites the other: toggling a knot that is out of range sets
/// the manual flag and leaves it hidden until the camera brings it back
/// into range.
#[derive(Default)]
pub struct KnotManager {
    knots: Vec<Knot>,
    by_id: HashMap<String, usize>,
    altitude: Option<f64>,
    observers: Vec<Observer>,
    outbox: Option<Vec<KnotEvent>>,
}

impl std::fmt::Debug for KnotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnotManager")
            .field("knots", &self.knots)
            .field("altitude", &self.altitude)
            .field("observers", &self.observers.len())
            .field("pending", &self.outbox.as_ref().map(Vec::len))
            .finish()
    }
}

impl KnotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager that also queues every notification until drained.
    pub fn with_event_queue() -> Self {
        Self {
            outbox: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Register an observer for every future notification.
    pub fn subscribe(&mut self, observer: impl FnMut(&KnotEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn create_knot(
        &mut self,
        id: impl Into<String>,
        layer: LayerId,
        style: StyleSpec,
        resolution: ResolutionRange,
        view_id: impl Into<String>,
        visible: bool,
    ) -> Result<&Knot, KnotError> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(KnotError::DuplicateKnotId(id));
        }

        let mut knot = Knot::new(id.clone(), layer, style, resolution, view_id, visible);
        if let Some(altitude) = self.altitude {
            knot.update_range(altitude);
        }
        info!(knot = %id, layer = %knot.layer(), visible = knot.is_visible(), "knot created");

        let index = self.knots.len();
        self.knots.push(knot);
        self.by_id.insert(id, index);
        self.notify();
        Ok(&self.knots[index])
    }

    /// Set the manual flag to `value`, or flip it when `None`.
    ///
    /// Returns the new manual flag, or `None` for an unknown id (no
    /// notification is emitted in that case).
    pub fn toggle_knot(&mut self, id: &str, value: Option<bool>) -> Option<bool> {
        let index = *self.by_id.get(id)?;
        let knot = &mut self.knots[index];
        let next = value.unwrap_or(!knot.is_toggled_on());
        knot.set_toggled(next);
        debug!(knot = id, manual = next, effective = knot.is_visible(), "knot toggled");
        self.notify();
        Some(next)
    }

    pub fn get_knot_by_id(&self, id: &str) -> Option<&Knot> {
        self.by_id.get(id).map(|&i| &self.knots[i])
    }

    /// Destroy a knot. Returns it, or `None` for an unknown id.
    pub fn remove_knot(&mut self, id: &str) -> Option<Knot> {
        let index = self.by_id.remove(id)?;
        let knot = self.knots.remove(index);
        for slot in self.by_id.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        info!(knot = id, "knot removed");
        self.notify();
        Some(knot)
    }

    /// Re-bind the style of a knot. Returns `false` for an unknown id.
    pub fn set_style(&mut self, id: &str, style: StyleSpec) -> bool {
        let Some(&index) = self.by_id.get(id) else {
            return false;
        };
        self.knots[index].set_style(style);
        debug!(knot = id, "knot style replaced");
        true
    }

    /// Re-evaluate every resolution guard at `altitude`.
    ///
    /// Emits a notification only when some knot's effective visibility
    /// changed. Returns whether it did.
    pub fn apply_resolution(&mut self, altitude: f64) -> bool {
        self.altitude = Some(altitude);
        let mut changed = false;
        for knot in &mut self.knots {
            let was = knot.is_visible();
            if knot.update_range(altitude) {
                debug!(
                    knot = knot.id(),
                    altitude,
                    in_range = knot.in_range(),
                    "resolution guard flipped"
                );
            }
            changed |= was != knot.is_visible();
        }
        if changed {
            self.notify();
        }
        changed
    }

    /// Last altitude the resolution guards were evaluated at.
    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// All knots in creation order.
    pub fn knots(&self) -> impl Iterator<Item = &Knot> {
        self.knots.iter()
    }

    /// Knots shown this frame, in creation order.
    pub fn visible_knots(&self) -> impl Iterator<Item = &Knot> {
        self.knots.iter().filter(|k| k.is_visible())
    }

    pub fn visibility_map(&self) -> VisibilityMap {
        self.knots
            .iter()
            .map(|k| (k.id().to_string(), k.is_visible()))
            .collect()
    }

    /// Take the notifications queued since the last call. Always empty
    /// without an event queue.
    pub fn drain_events(&mut self) -> Vec<KnotEvent> {
        self.outbox.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn pending_events(&self) -> usize {
        self.outbox.as_ref().map_or(0, Vec::len)
    }

    fn notify(&mut self) {
        let event = KnotEvent::KnotVisibility(self.visibility_map());
        for observer in &mut self.observers {
            observer(&event);
        }
        if let Some(outbox) = &mut self.outbox {
            outbox.push(event);
        }
    }
}
