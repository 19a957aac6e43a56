use foundation::time::Time;

use crate::frame::Frame;
use crate::job::Job;

/// Slack for comparing accumulated frame times against job intervals.
const INTERVAL_EPS_S: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRunSummary {
    pub ran_jobs: usize,
    pub skipped_jobs: usize,
}

struct Slot<C> {
    order: u64,
    last_run: Option<Time>,
    job: Job<C>,
}

/// Cooperative, single-threaded job scheduler ticked once per frame.
///
/// Interval jobs replace recurring timers: a job with `interval_s = Some(t)`
/// runs on the first frame and then on the first frame whose time is at
/// least `t` after its previous run.
pub struct Scheduler<C> {
    next_order: u64,
    jobs: Vec<Slot<C>>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            next_order: 0,
            jobs: Vec::new(),
        }
    }

    pub fn add_job(&mut self, job: Job<C>) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.jobs.push(Slot {
            order,
            last_run: None,
            job,
        });
        // Total ordering: (priority, id, insertion_order). This stays deterministic even if
        // callers accidentally register duplicate job ids.
        self.jobs.sort_by(|a, b| {
            a.job
                .priority
                .cmp(&b.job.priority)
                .then_with(|| a.job.id.cmp(b.job.id))
                .then_with(|| a.order.cmp(&b.order))
        });
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Run every job that is due for `frame`, in `(priority, id, insertion_order)` order.
    pub fn run_frame(&mut self, frame: Frame, ctx: &mut C) -> FrameRunSummary {
        let mut ran = 0usize;
        for slot in &mut self.jobs {
            let due = match (slot.job.interval_s, slot.last_run) {
                (None, _) | (_, None) => true,
                (Some(interval), Some(last)) => {
                    frame.time.seconds_since(last) + INTERVAL_EPS_S >= interval
                }
            };
            if !due {
                continue;
            }
            (slot.job.run)(frame, ctx);
            slot.last_run = Some(frame.time);
            ran += 1;
        }

        FrameRunSummary {
            ran_jobs: ran,
            skipped_jobs: self.jobs.len() - ran,
        }
    }
}
