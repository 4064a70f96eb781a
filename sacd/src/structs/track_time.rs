//! Disc time codes (minutes, seconds, frames at 75 frames per second).

use std::fmt::{Display, Formatter};
use std::ops::Add;

use anyhow::{Result, bail};

use crate::structs::scarlet_book::SACD_FRAME_RATE;
use crate::utils::byte_cursor::ByteCursor;

const FRAMES_PER_MINUTE: u32 = 60 * SACD_FRAME_RATE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackTime {
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl TrackTime {
    pub const ZERO: TrackTime = TrackTime {
        minutes: 0,
        seconds: 0,
        frames: 0,
    };

    pub fn new(minutes: u8, seconds: u8, frames: u8) -> Self {
        Self {
            minutes,
            seconds,
            frames,
        }
    }

    /// Reads the three time code bytes. Stored fields are not normalised.
    pub fn read(cursor: &mut ByteCursor) -> Self {
        Self::new(cursor.read_u8(), cursor.read_u8(), cursor.read_u8())
    }

    pub fn frame_count(&self) -> u32 {
        self.minutes as u32 * FRAMES_PER_MINUTE
            + self.seconds as u32 * SACD_FRAME_RATE
            + self.frames as u32
    }

    /// Normalised time code for a frame count. Minutes saturate at 255.
    pub fn from_frame_count(frames: u32) -> Self {
        let minutes = (frames / FRAMES_PER_MINUTE).min(u8::MAX as u32);
        let rest = frames - minutes * FRAMES_PER_MINUTE;
        let seconds = (rest / SACD_FRAME_RATE).min(59);
        let frames = rest - seconds * SACD_FRAME_RATE;

        Self::new(minutes as u8, seconds as u8, frames.min(u8::MAX as u32) as u8)
    }

    /// Whole seconds, ignoring frames.
    pub fn duration(&self) -> u32 {
        self.minutes as u32 * 60 + self.seconds as u32
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.frame_count() as f64 / SACD_FRAME_RATE as f64
    }

    pub fn checked_sub(&self, other: &TrackTime) -> Result<TrackTime> {
        let lhs = self.frame_count();
        let rhs = other.frame_count();
        if rhs > lhs {
            bail!("Negative track time: {self} - {other}");
        }
        Ok(Self::from_frame_count(lhs - rhs))
    }
}

impl Add for TrackTime {
    type Output = TrackTime;

    fn add(self, rhs: TrackTime) -> TrackTime {
        TrackTime::from_frame_count(self.frame_count() + rhs.frame_count())
    }
}

impl Display for TrackTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.minutes, self.seconds, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_normalises() {
        let a = TrackTime::new(1, 59, 74);
        let b = TrackTime::new(0, 0, 1);
        assert_eq!(a + b, TrackTime::new(2, 0, 0));

        let c = TrackTime::new(0, 30, 40) + TrackTime::new(0, 30, 40);
        assert_eq!(c, TrackTime::new(1, 1, 5));
    }

    #[test]
    fn test_sub() -> Result<()> {
        let end = TrackTime::new(3, 0, 0);
        let start = TrackTime::new(1, 30, 10);
        assert_eq!(end.checked_sub(&start)?, TrackTime::new(1, 29, 65));
        assert!(start.checked_sub(&end).is_err());
        assert_eq!(start.checked_sub(&start)?, TrackTime::ZERO);

        Ok(())
    }

    #[test]
    fn test_duration_and_display() {
        let t = TrackTime::new(4, 33, 12);
        assert_eq!(t.duration(), 273);
        assert_eq!(t.frame_count(), 273 * 75 + 12);
        assert_eq!(t.to_string(), "04:33:12");
        assert_eq!(TrackTime::from_frame_count(t.frame_count()), t);
    }
}
