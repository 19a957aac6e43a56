use foundation::time::Time;

/// One tick of the render loop.
///
/// Time is derived from the index and a fixed step, so a run of frames is
/// reproducible: the resolution monitor and every interval job see the
/// same timestamps on every replay.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    /// Fixed step in seconds.
    pub dt_s: f64,
    /// Loop time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    /// Frame 0 of a loop running at `hz` frames per second.
    pub fn first_at_rate(hz: f64) -> Self {
        Self::new(0, 1.0 / hz)
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }

    /// Frames needed to cover `seconds`, rounded up.
    pub fn frames_in(&self, seconds: f64) -> u64 {
        if self.dt_s <= 0.0 || seconds <= 0.0 {
            return 0;
        }
        (seconds / self.dt_s - 1e-9).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn sixty_hertz_loop() {
        let f0 = Frame::first_at_rate(60.0);
        let f6 = (0..6).fold(f0, |f, _| f.next());
        assert_eq!(f6.index, 6);
        assert!((f6.time.seconds_since(f0.time) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn time_follows_index_only() {
        assert_eq!(Frame::new(10, 0.5).time, Time(5.0));
        assert_eq!(Frame::new(3, 0.25).next(), Frame::new(4, 0.25));
    }

    #[test]
    fn frames_in_rounds_up() {
        let f = Frame::first_at_rate(60.0);
        assert_eq!(f.frames_in(0.1), 6);
        assert_eq!(f.frames_in(0.11), 7);
        assert_eq!(f.frames_in(0.0), 0);
    }
}
