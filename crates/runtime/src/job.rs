use crate::frame::Frame;

/// A deterministic unit of work executed by the [`Scheduler`](crate::Scheduler).
///
/// Jobs are run in a stable order based on their `(priority, id)`. `C` is the
/// render-loop context handed to every job.
pub struct Job<C> {
    pub id: &'static str,
    /// Smaller values run earlier.
    pub priority: i32,
    /// Minimum engine time between two runs; `None` runs every frame.
    pub interval_s: Option<f64>,
    pub run: fn(frame: Frame, ctx: &mut C),
}

impl<C> Job<C> {
    pub fn new(id: &'static str, run: fn(frame: Frame, ctx: &mut C)) -> Self {
        Self {
            id,
            priority: 0,
            interval_s: None,
            run,
        }
    }

    pub fn with_priority(id: &'static str, priority: i32, run: fn(frame: Frame, ctx: &mut C)) -> Self {
        Self {
            id,
            priority,
            interval_s: None,
            run,
        }
    }

    /// A job that runs at most once per `interval_s` of engine time.
    pub fn every(id: &'static str, interval_s: f64, run: fn(frame: Frame, ctx: &mut C)) -> Self {
        Self {
            id,
            priority: 0,
            interval_s: Some(interval_s),
            run,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
