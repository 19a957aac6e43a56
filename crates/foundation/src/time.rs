/// Loop time in seconds since the first frame.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    /// Negative when `earlier` is actually later.
    pub fn seconds_since(self, earlier: Time) -> f64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn elapsed_is_signed() {
        assert_eq!(Time(0.3).seconds_since(Time(0.1)), 0.3 - 0.1);
        assert!(Time(0.1).seconds_since(Time(0.3)) < 0.0);
        assert!(Time(0.1) < Time(0.2));
    }
}
