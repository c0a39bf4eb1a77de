//! Keyframe rate limiting.
//!
//! Two independent policies bound the output: a minimum spacing, in frames,
//! between consecutive keyframes, and a global cap proportional to the
//! video's duration.

/// Maximum number of keyframes a video may produce.
///
/// Equal to `floor(duration_minutes × per_minute)` where
/// `duration_minutes = total_frames / fps / 60`. The product is formed
/// before dividing so that integral frame rates give exact results.
///
/// Returns `0` for a non-positive or non-finite frame rate.
///
/// # Example
///
/// ```
/// use sceneshot::max_allowed_keyframes;
///
/// // One minute at 30 fps, five keyframes per minute.
/// assert_eq!(max_allowed_keyframes(1_800, 30.0, 5), 5);
/// ```
pub fn max_allowed_keyframes(total_frames: u64, frames_per_second: f64, per_minute: u32) -> u64 {
    if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
        return 0;
    }
    let allowed = (total_frames as f64 * f64::from(per_minute)) / (frames_per_second * 60.0);
    allowed.floor() as u64
}

/// What the rate limiter allows for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateGate {
    /// The global cap has been reached; nothing more may be emitted.
    CapReached,
    /// Too few frames have passed since the last emission.
    TooSoon,
    /// The frame may be considered for emission.
    Open,
}

/// Stateful spacing and cap policy for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    max_allowed: u64,
    min_frames_between: u64,
    frames_since_last: u64,
    emitted: u64,
}

impl RateLimiter {
    /// Create a limiter allowing at most `max_allowed` emissions spaced at
    /// least `min_frames_between` frames apart.
    pub fn new(max_allowed: u64, min_frames_between: u64) -> Self {
        Self {
            max_allowed,
            min_frames_between,
            frames_since_last: 0,
            emitted: 0,
        }
    }

    /// Count one more frame since the last emission.
    pub fn tick(&mut self) {
        self.frames_since_last += 1;
    }

    /// Decide whether the current frame may be emitted.
    ///
    /// The cap is checked before the spacing.
    pub fn gate(&self) -> RateGate {
        if self.cap_reached() {
            RateGate::CapReached
        } else if self.frames_since_last < self.min_frames_between {
            RateGate::TooSoon
        } else {
            RateGate::Open
        }
    }

    /// Record an emission, resetting the spacing counter.
    pub fn record_emission(&mut self) {
        self.emitted += 1;
        self.frames_since_last = 0;
    }

    /// Returns `true` once no further emissions are allowed.
    pub fn cap_reached(&self) -> bool {
        self.emitted >= self.max_allowed
    }

    pub fn max_allowed(&self) -> u64 {
        self.max_allowed
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn frames_since_last(&self) -> u64 {
        self.frames_since_last
    }
}
