//! Change detection against the last transmitted value
//!
//! A reading is only worth sending when it moved away from the reference.
//! Percentages are relative to the reference itself, so a non-finite or
//! negative reference makes every reading critical.

/// Readings within this percentage of the reference are not sent
pub const TOLERANCE_PERCENT: f32 = 5.0;

/// Readings outside this percentage trigger an immediate transmission
pub const CRITICAL_TOLERANCE_PERCENT: f32 = 15.0;

/// How far a reading moved from the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Stable,
    Significant,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub percent: f32,
    pub critical_percent: f32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            percent: TOLERANCE_PERCENT,
            critical_percent: CRITICAL_TOLERANCE_PERCENT,
        }
    }
}

impl Tolerance {
    pub fn classify(&self, value: f32, reference: f32) -> Change {
        if within(value, reference, self.percent) {
            Change::Stable
        } else if within(value, reference, self.critical_percent) {
            Change::Significant
        } else {
            Change::Critical
        }
    }
}

fn within(value: f32, reference: f32, percent: f32) -> bool {
    let margin = percent * reference / 100.0;
    value >= reference - margin && value <= reference + margin
}
