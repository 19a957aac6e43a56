use foundation::math::Vec3;

/// Camera pose: eye position plus an orthonormal frame.
///
/// The renderer and the resolution monitor only read it; the embedding
/// loop owns and moves it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub right: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Camera {
    /// Build a frame looking from `position` toward `target`.
    ///
    /// Returns `None` when the view direction is degenerate or parallel to
    /// `up_hint`.
    pub fn looking_at(position: Vec3, target: Vec3, up_hint: Vec3) -> Option<Self> {
        let look_at = (target - position).normalize()?;
        let right = up_hint.cross(look_at).normalize()?;
        let up = look_at.cross(right);
        Some(Self {
            position,
            right,
            look_at,
            up,
        })
    }

    /// Straight-down view over the world point `(x, y)` from `altitude`.
    ///
    /// Screen-up is world `-y` (north, since world `y` grows southward).
    pub fn top_down(x: f64, y: f64, altitude: f64) -> Self {
        Self {
            position: Vec3::new(x, y, altitude),
            right: Vec3::new(1.0, 0.0, 0.0),
            look_at: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, -1.0, 0.0),
        }
    }

    /// Camera altitude used for resolution ranges.
    pub fn altitude(&self) -> f64 {
        self.position.z
    }

    /// View-space coordinates of a world point: `(right, up, forward)`.
    pub fn to_view(&self, world: Vec3) -> Vec3 {
        let d = world - self.position;
        Vec3::new(d.dot(self.right), d.dot(self.up), d.dot(self.look_at))
    }
}

/// Perspective parameters of a viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub fov_y_deg: f64,
    pub near: f64,
    pub width: u32,
    pub height: u32,
}

/// A projected point in pixel coordinates; `depth` is view-space distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl Projection {
    pub fn new(fov_y_deg: f64, near: f64, width: u32, height: u32) -> Self {
        Self {
            fov_y_deg,
            near,
            width,
            height,
        }
    }

    /// Pixels per unit of `view / depth` (the focal length in pixels).
    pub fn focal_px(&self) -> f64 {
        0.5 * self.height as f64 / (0.5 * self.fov_y_deg.to_radians()).tan()
    }

    /// Project a view-space point. Points in front of the near plane yield `None`.
    pub fn project_view(&self, view: Vec3) -> Option<ScreenPoint> {
        if view.z < self.near || !view.z.is_finite() {
            return None;
        }
        let f = self.focal_px();
        Some(ScreenPoint {
            x: 0.5 * self.width as f64 + f * view.x / view.z,
            y: 0.5 * self.height as f64 - f * view.y / view.z,
            depth: view.z,
        })
    }

    pub fn project(&self, camera: &Camera, world: Vec3) -> Option<ScreenPoint> {
        self.project_view(camera.to_view(world))
    }
}
