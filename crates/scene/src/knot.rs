use layers::{LayerId, StyleSpec};

use crate::resolution::ResolutionRange;

/// A layer bound to a style, a resolution range and a visibility flag.
///
/// Several knots may reference the same layer; geometry is never copied
/// into a knot. Only [`KnotManager`](crate::KnotManager) mutates the
/// visibility state.
#[derive(Debug, Clone, PartialEq)]
pub struct Knot {
    id: String,
    layer: LayerId,
    style: StyleSpec,
    resolution: ResolutionRange,
    view_id: String,
    /// Manual flag, as last set by the user.
    visible: bool,
    /// Resolution guard result for the last known camera altitude.
    in_range: bool,
}

impl Knot {
    pub fn new(
        id: impl Into<String>,
        layer: LayerId,
        style: StyleSpec,
        resolution: ResolutionRange,
        view_id: impl Into<String>,
        visible: bool,
    ) -> Self {
        Self {
            id: id.into(),
            layer,
            style,
            resolution,
            view_id: view_id.into(),
            visible,
            in_range: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    pub fn style(&self) -> &StyleSpec {
        &self.style
    }

    pub fn resolution(&self) -> ResolutionRange {
        self.resolution
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// The manual visibility flag.
    pub fn is_toggled_on(&self) -> bool {
        self.visible
    }

    pub fn in_range(&self) -> bool {
        self.in_range
    }

    /// Shown this frame: toggled on and within its resolution range.
    pub fn is_visible(&self) -> bool {
        self.visible && self.in_range
    }

    pub(crate) fn set_toggled(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns whether the guard result changed.
    pub(crate) fn update_range(&mut self, altitude: f64) -> bool {
        let in_range = self.resolution.contains(altitude);
        let changed = in_range != self.in_range;
        self.in_range = in_range;
        changed
    }

    pub(crate) fn set_style(&mut self, style: StyleSpec) {
        self.style = style;
    }
}

#[cfg(test)]
mod tests {
    use super::Knot;
    use crate::resolution::ResolutionRange;
    use layers::{LayerId, StyleSpec};

    #[test]
    fn visibility_is_manual_and_range() {
        let mut k = Knot::new(
            "roads",
            LayerId::new("roads"),
            StyleSpec::fixed("grey"),
            ResolutionRange::between(10.0, 50.0),
            "main",
            true,
        );
        assert!(k.is_visible());

        assert!(k.update_range(60.0));
        assert!(!k.is_visible());
        assert!(k.is_toggled_on());

        assert!(!k.update_range(70.0));
        assert!(k.update_range(20.0));
        k.set_toggled(false);
        assert!(!k.is_visible());
        assert!(k.in_range());
    }
}
