use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foundation::bounds::Aabb3;
use foundation::math::{to_geo, to_world};
use formats::{Session, SessionConfig};
use gpu::Renderer;
use layers::{ColorLut, simplify_seeded};
use runtime::{Frame, Job, Scheduler};
use scene::Camera;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME_RATE_HZ: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Layered map scenes: projection, simplification, rendering and picking")]
struct Args {
    /// Session configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Geodesic degrees to world units
    Project {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// World units to geodesic degrees
    Unproject {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },

    /// Simplify a polyline read as a JSON array of [x, y] points
    Simplify {
        input: PathBuf,

        /// Points to keep, endpoints included
        #[arg(long)]
        keep: usize,

        /// Tie-breaking seed; falls back to the config's simplifySeed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the lookup table of a color scale or literal color
    Colormap {
        name: String,

        #[arg(long, default_value_t = 256)]
        resolution: usize,
    },

    /// Run a scene for a number of frames and write the last one as PPM
    Render {
        scene: PathBuf,

        #[arg(long, default_value_t = 1)]
        frames: u64,

        /// Override the camera altitude
        #[arg(long)]
        altitude: Option<f64>,

        #[arg(long, default_value = "frame.ppm")]
        out: PathBuf,
    },

    /// Resolve the object under a pixel; prints {knot, object} or null
    Pick {
        scene: PathBuf,

        #[arg(long)]
        x: u32,

        #[arg(long)]
        y: u32,

        #[arg(long)]
        altitude: Option<f64>,
    },
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Project { lat, lng } => {
            let w = to_world(lat, lng)?;
            println!("{}", json!({"x": w.x, "y": w.y}));
        }
        Command::Unproject { x, y } => {
            let g = to_geo(x, y)?;
            println!("{}", json!({"lat": g.lat_deg, "lng": g.lng_deg}));
        }
        Command::Simplify { input, keep, seed } => {
            let text = fs::read_to_string(&input)?;
            let points: Vec<[f64; 2]> = serde_json::from_str(&text)?;
            let seed = seed.unwrap_or(config.seed());
            let kept = simplify_seeded(&points, keep, seed)?;
            info!(input = points.len(), kept = kept.len(), seed, "polyline simplified");
            println!("{}", serde_json::to_string(&kept)?);
        }
        Command::Colormap { name, resolution } => {
            let lut = ColorLut::build(&name, resolution)?;
            println!("{}", serde_json::to_string(lut.entries())?);
        }
        Command::Render {
            scene,
            frames,
            altitude,
            out,
        } => cmd_render(config, &scene, frames, altitude, &out)?,
        Command::Pick {
            scene,
            x,
            y,
            altitude,
        } => cmd_pick(config, &scene, x, y, altitude)?,
    }
    Ok(())
}

/// Frame-loop context driven by the scheduler.
struct Viewer {
    session: Session,
    camera: Camera,
}

fn open_scene(
    config: SessionConfig,
    path: &Path,
    altitude: Option<f64>,
) -> Result<Viewer, Box<dyn std::error::Error>> {
    let fov = config.field_of_view_deg;
    let (session, report) = Session::load(config, path)?;
    let mut camera = report
        .camera
        .unwrap_or_else(|| fit_camera(&session, fov));
    if let Some(altitude) = altitude {
        camera.position.z = altitude;
    }
    Ok(Viewer { session, camera })
}

/// Top-down camera framing every loaded layer.
fn fit_camera(session: &Session, fov_y_deg: f64) -> Camera {
    let corners = session
        .layers()
        .iter()
        .filter_map(|l| l.bounds())
        .flat_map(|b| [b.min, b.max]);
    let Some(bounds) = Aabb3::from_points(corners) else {
        return Camera::top_down(0.0, 0.0, 1000.0);
    };
    let [cx, cy, _] = bounds.center();
    let fp = bounds.footprint();
    let half_span = (fp.max[0] - fp.min[0]).max(fp.max[1] - fp.min[1]) / 2.0;
    let altitude = bounds.max[2] + 1.1 * half_span / (fov_y_deg.to_radians() / 2.0).tan();
    Camera::top_down(cx, cy, altitude.max(1.0))
}

fn run_frames(viewer: &mut Viewer, frames: u64) {
    let mut scheduler = Scheduler::new();
    scheduler.add_job(Job::new("session.tick", |frame, v: &mut Viewer| {
        v.session.tick(frame, &v.camera);
    }));
    let mut frame = Frame::first_at_rate(FRAME_RATE_HZ);
    for _ in 0..frames.max(1) {
        scheduler.run_frame(frame, viewer);
        frame = frame.next();
    }
}

fn cmd_render(
    config: SessionConfig,
    scene: &Path,
    frames: u64,
    altitude: Option<f64>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer_config = config.renderer_config()?;
    let mut viewer = open_scene(config, scene, altitude)?;
    run_frames(&mut viewer, frames);

    let mut renderer = Renderer::new(renderer_config);
    let report = renderer.render_frame(viewer.session.frame_input(&viewer.camera));
    fs::write(out, renderer.color_target().to_ppm())?;
    renderer.teardown();

    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|(knot, err)| json!({"knot": knot, "error": err.to_string()}))
        .collect();
    let events = viewer.session.events().len();
    println!(
        "{}",
        json!({
            "out": out.display().to_string(),
            "drawn": report.drawn,
            "skipped": skipped,
            "fragments": report.fragments,
            "visibility": viewer.session.knots().visibility_map(),
            "events": events,
        })
    );
    Ok(())
}

fn cmd_pick(
    config: SessionConfig,
    scene: &Path,
    x: u32,
    y: u32,
    altitude: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer_config = config.renderer_config()?;
    let mut viewer = open_scene(config, scene, altitude)?;
    run_frames(&mut viewer, 1);

    let mut renderer = Renderer::new(renderer_config);
    let hit = renderer.pick(viewer.session.frame_input(&viewer.camera), x, y);
    println!("{}", serde_json::to_string(&hit)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_negative_coordinates() {
        let args = Args::parse_from(["knotmap", "project", "--lat", "-33.9", "--lng", "151.2"]);
        assert!(matches!(args.command, Command::Project { lat, .. } if lat == -33.9));
    }

    #[test]
    fn render_defaults() {
        let args = Args::parse_from(["knotmap", "render", "scene.json", "--config", "cfg.json"]);
        assert!(args.config.is_some());
        let Command::Render { frames, out, altitude, .. } = args.command else {
            panic!("expected render");
        };
        assert_eq!(frames, 1);
        assert_eq!(out.to_str(), Some("frame.ppm"));
        assert!(altitude.is_none());
    }
}
