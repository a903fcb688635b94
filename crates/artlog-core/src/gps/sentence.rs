//! Recommended-minimum sentence fields
//!
//! Field layout after splitting on commas (1-based):
//!
//! | # | field            | # | field         |
//! |---|------------------|---|---------------|
//! | 1 | tag (`$GPRMC`)   | 7 | lon hemisphere|
//! | 2 | UTC time         | 8 | speed (knots) |
//! | 3 | validity         | 9 | true course   |
//! | 4 | latitude         | 10| date          |
//! | 5 | lat hemisphere   | 11| variation     |
//! | 6 | longitude        | 12| east/west     |

use serde::Serialize;

/// Character capacity of each fix field, in field order
const FIELD_CAPACITY: [usize; FIELD_COUNT] = [9, 10, 1, 9, 1, 10, 1, 6, 10, 10, 6, 6];

/// Number of mapped fields
pub const FIELD_COUNT: usize = 12;

/// One parsed fix, each field held as bounded text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpsFix {
    /// Sentence tag, e.g. `$GPRMC`
    pub tag: String,
    /// UTC time of fix
    pub timestamp: String,
    /// `A` active, `V` void
    pub validity: String,
    /// Latitude `ddmm.mmmm`
    pub latitude: String,
    /// `N` or `S`
    pub lat_hemisphere: String,
    /// Longitude `dddmm.mmmm`
    pub longitude: String,
    /// `E` or `W`
    pub lon_hemisphere: String,
    /// Speed over ground in knots
    pub speed: String,
    /// Track angle in degrees true
    pub true_course: String,
    /// Date `ddmmyy`
    pub date: String,
    /// Magnetic variation
    pub variation: String,
    /// Variation direction (may carry the checksum)
    pub east_west: String,
}

impl GpsFix {
    /// Tokenize a sentence into a fresh fix.
    ///
    /// Empty fields stay empty, fields past the twelfth are discarded and
    /// overlong fields are cut to their capacity. Never fails.
    pub fn parse(sentence: &str) -> Self {
        let mut fix = GpsFix::default();
        let line = sentence.trim_end_matches(['\r', '\n']);

        for (idx, token) in line.split(',').enumerate().take(FIELD_COUNT) {
            if token.is_empty() {
                continue;
            }
            let bounded: String = token.chars().take(FIELD_CAPACITY[idx]).collect();
            *fix.field_mut(idx) = bounded;
        }

        fix
    }

    fn field_mut(&mut self, idx: usize) -> &mut String {
        match idx {
            0 => &mut self.tag,
            1 => &mut self.timestamp,
            2 => &mut self.validity,
            3 => &mut self.latitude,
            4 => &mut self.lat_hemisphere,
            5 => &mut self.longitude,
            6 => &mut self.lon_hemisphere,
            7 => &mut self.speed,
            8 => &mut self.true_course,
            9 => &mut self.date,
            10 => &mut self.variation,
            _ => &mut self.east_west,
        }
    }
}
