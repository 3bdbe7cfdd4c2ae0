//! Rational frame rates and frame/time conversion.
//!
//! Frame rates are kept as reduced fractions (e.g. `24000/1001`) so segment
//! boundaries computed from frame numbers stay exact to the microsecond.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame rate as a reduced fraction of frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    num: u32,
    den: u32,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl FrameRate {
    /// Builds a frame rate; zero numerator or denominator is rejected.
    #[must_use]
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let g = gcd(u64::from(num), u64::from(den)) as u32;
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Parses ffprobe's `r_frame_rate` form (`"24000/1001"`, `"25/1"` or `"25"`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.split_once('/') {
            Some((num, den)) => Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => Self::new(text.parse().ok()?, 1),
        }
    }

    #[must_use]
    pub fn numerator(self) -> u32 {
        self.num
    }

    #[must_use]
    pub fn denominator(self) -> u32 {
        self.den
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Start time of `frame` in seconds.
    #[must_use]
    pub fn frame_to_seconds(self, frame: u64) -> f64 {
        // Multiply before dividing so 1001-based rates do not accumulate error.
        (frame as f64 * f64::from(self.den)) / f64::from(self.num)
    }

    /// Frame whose start time is nearest to `seconds`.
    #[must_use]
    pub fn seconds_to_frame(self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * f64::from(self.num) / f64::from(self.den)).round() as u64
    }

    /// Duration of one frame in seconds.
    #[must_use]
    pub fn frame_duration(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_ntsc_precision() {
        let rate = FrameRate::parse("24000/1001").unwrap();
        assert_eq!((rate.numerator(), rate.denominator()), (24000, 1001));
        assert_eq!(rate.to_string(), "24000/1001");
    }

    #[test]
    fn parse_reduces_fraction() {
        let rate = FrameRate::parse("50/2").unwrap();
        assert_eq!((rate.numerator(), rate.denominator()), (25, 1));
        assert_eq!(FrameRate::parse("30").unwrap().to_string(), "30");
    }

    #[test]
    fn parse_rejects_degenerate_rates() {
        assert!(FrameRate::parse("0/0").is_none());
        assert!(FrameRate::parse("25/0").is_none());
        assert!(FrameRate::parse("abc").is_none());
    }

    #[test]
    fn frame_time_round_trip() {
        for text in ["24000/1001", "30000/1001", "25/1", "60000/1001", "24/1"] {
            let rate = FrameRate::parse(text).unwrap();
            for frame in [0_u64, 1, 2, 23, 24, 1001, 86_399, 1_000_000] {
                let secs = rate.frame_to_seconds(frame);
                assert_eq!(rate.seconds_to_frame(secs), frame, "rate {text}, frame {frame}");
            }
        }
    }

    #[test]
    fn ntsc_frame_times_are_exact() {
        let rate = FrameRate::parse("24000/1001").unwrap();
        assert!((rate.frame_to_seconds(24_000) - 1001.0).abs() < 1e-9);
    }
}
