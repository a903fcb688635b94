//! Fix tracking with hold-last-good

use super::GpsFix;
use crate::config::GpsSettings;

/// Outcome of feeding one sentence to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixStatus {
    /// Expected tag with an active fix; position and speed updated
    Accepted,
    /// Expected tag but void fix; previous position held
    HeldInvalid,
    /// Some other sentence; previous position held
    HeldOtherSentence,
}

/// Position and speed carried over from the last accepted fix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CarriedFix {
    latitude: String,
    longitude: String,
    speed: String,
}

/// Tracks the current fix and the last known-good one
#[derive(Debug, Clone)]
pub struct FixTracker {
    expected_tag: String,
    valid_flag: String,
    current: GpsFix,
    carried: CarriedFix,
}

impl Default for FixTracker {
    fn default() -> Self {
        Self::new(&GpsSettings::default())
    }
}

impl FixTracker {
    /// Create a tracker with no fix yet
    pub fn new(settings: &GpsSettings) -> Self {
        Self {
            expected_tag: settings.expected_tag.clone(),
            valid_flag: settings.valid_flag.clone(),
            current: GpsFix::default(),
            carried: CarriedFix::default(),
        }
    }

    /// Process a freshly received sentence.
    ///
    /// The current fix is rebuilt from scratch; when the sentence is not an
    /// active fix of the expected type, its position and speed are replaced by
    /// the carried-over values.
    pub fn update(&mut self, sentence: &str) -> FixStatus {
        self.current = GpsFix::parse(sentence);

        let status = if self.current.tag != self.expected_tag {
            FixStatus::HeldOtherSentence
        } else if self.current.validity != self.valid_flag {
            FixStatus::HeldInvalid
        } else {
            FixStatus::Accepted
        };

        match status {
            FixStatus::Accepted => {
                self.carried = CarriedFix {
                    latitude: self.current.latitude.clone(),
                    longitude: self.current.longitude.clone(),
                    speed: self.current.speed.clone(),
                };
            }
            FixStatus::HeldInvalid | FixStatus::HeldOtherSentence => {
                tracing::trace!(?status, tag = %self.current.tag, "Holding last good fix");
                self.current.latitude = self.carried.latitude.clone();
                self.current.longitude = self.carried.longitude.clone();
                self.current.speed = self.carried.speed.clone();
            }
        }

        status
    }

    /// Fix as of the most recent sentence
    pub fn current(&self) -> &GpsFix {
        &self.current
    }

    /// Latitude to log
    pub fn latitude(&self) -> &str {
        &self.current.latitude
    }

    /// Longitude to log
    pub fn longitude(&self) -> &str {
        &self.current.longitude
    }

    /// Speed to log
    pub fn speed(&self) -> &str {
        &self.current.speed
    }

    /// Whether any fix has been accepted yet
    pub fn has_fix(&self) -> bool {
        self.carried != CarriedFix::default()
    }
}
