use thiserror::Error;

/// Error returned by a media element refusing an operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Position report of a media element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackSample {
    /// Seconds from the start
    pub current_time: f64,
    /// Total length in seconds; zero, NaN or infinite when unknown
    pub duration: f64,
    pub paused: bool,
}

impl PlaybackSample {
    pub fn new(current_time: f64, duration: f64, paused: bool) -> Self {
        Self {
            current_time,
            duration,
            paused,
        }
    }

    /// `current_time / duration`, or `None` for a degenerate duration
    pub fn completion_ratio(&self) -> Option<f64> {
        if self.duration.is_finite() && self.duration > 0.0 {
            Some(self.current_time / self.duration)
        } else {
            None
        }
    }

    /// True once the ratio reaches `threshold`. Degenerate durations never complete.
    pub fn is_completed(&self, threshold: f64) -> bool {
        self.completion_ratio().map_or(false, |ratio| ratio >= threshold)
    }
}

/// A page's media element
pub trait MediaElement: Send + Sync + 'static {
    fn sample(&self) -> PlaybackSample;

    fn pause(&self);

    fn play(&self) -> Result<(), MediaError>;

    /// Optional: turn off native looping
    fn disable_loop(&self) {}
}
