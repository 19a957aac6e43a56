use layers::{LayerId, StyleSpec};
use runtime::{Frame, Job, Scheduler};
use scene::{Camera, KnotEvent, KnotManager, ResolutionMonitor, ResolutionRange};

struct Loop {
    camera: Camera,
    knots: KnotManager,
    monitor: ResolutionMonitor,
}

fn resolution_job(frame: Frame, ctx: &mut Loop) {
    ctx.monitor.tick(frame.time, &ctx.camera, &mut ctx.knots);
}

fn manager_with(id: &str, range: ResolutionRange) -> KnotManager {
    let mut knots = KnotManager::with_event_queue();
    knots
        .create_knot(
            id,
            LayerId::new("parcels"),
            StyleSpec::by_attribute("value", "interpolateViridis"),
            range,
            "main",
            true,
        )
        .unwrap();
    knots
}

#[test]
fn double_toggle_restores_visibility_and_always_reports_every_knot() {
    let mut knots = manager_with("a", ResolutionRange::UNBOUNDED);
    knots
        .create_knot(
            "b",
            LayerId::new("parcels"),
            StyleSpec::fixed("red"),
            ResolutionRange::UNBOUNDED,
            "main",
            false,
        )
        .unwrap();
    knots.drain_events();

    let before = knots.get_knot_by_id("a").unwrap().is_visible();
    knots.toggle_knot("a", None);
    knots.toggle_knot("a", None);
    assert_eq!(knots.get_knot_by_id("a").unwrap().is_visible(), before);

    let events = knots.drain_events();
    assert_eq!(events.len(), 2);
    for event in events {
        let KnotEvent::KnotVisibility(map) = event;
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}

#[test]
fn monitor_follows_camera_altitude_within_one_tick() {
    let dt = 1.0 / 60.0;
    let interval = 0.1;

    let mut ctx = Loop {
        camera: Camera::top_down(0.0, 0.0, 30.0),
        knots: manager_with("k", ResolutionRange::between(10.0, 50.0)),
        monitor: ResolutionMonitor::new(interval),
    };
    let mut scheduler = Scheduler::new();
    scheduler.add_job(Job::new("resolution", resolution_job));

    let mut frame = Frame::first_at_rate(60.0);
    let mut run_until = |ctx: &mut Loop, frame: &mut Frame, seconds: f64| {
        for _ in 0..frame.frames_in(seconds) {
            scheduler.run_frame(*frame, ctx);
            *frame = frame.next();
        }
    };

    run_until(&mut ctx, &mut frame, 0.2);
    assert!(ctx.knots.get_knot_by_id("k").unwrap().is_visible());

    for altitude in [5.0, 60.0] {
        ctx.camera = Camera::top_down(0.0, 0.0, altitude);
        run_until(&mut ctx, &mut frame, interval + dt);
        assert!(
            !ctx.knots.get_knot_by_id("k").unwrap().is_visible(),
            "altitude {altitude}"
        );
    }

    ctx.camera = Camera::top_down(0.0, 0.0, 30.0);
    run_until(&mut ctx, &mut frame, interval + dt);
    assert!(ctx.knots.get_knot_by_id("k").unwrap().is_visible());
}
