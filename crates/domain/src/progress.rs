//! Completion roll-ups, computed bottom-up from exercise instances.
//!
//! All functions are pure. Percentages are whole numbers, rounded half up;
//! fractional percentages never leave this module.

use derive_more::{Display, Into};

use crate::{InstanceStatus, WeeklyExerciseInstance};

/// Whole-number completion percentage (0–100).
#[derive(Debug, Default, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(100);

    pub fn new(value: u8) -> Result<Self, PercentError> {
        if value > 100 {
            return Err(PercentError::OutOfRange);
        }

        Ok(Self(value))
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PercentError {
    #[error("Percentage must be in the range 0 to 100")]
    OutOfRange,
}

/// Share of `completed` in `total` as a percentage, rounded half up.
/// An empty total yields 0%.
#[must_use]
pub fn ratio(completed: usize, total: usize) -> Percent {
    if total == 0 {
        return Percent::ZERO;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    #[allow(clippy::cast_possible_truncation)]
    Percent(((200 * completed + total) / (2 * total)) as u8)
}

/// Mean of percentages, rounded half up. An empty sequence yields 0%.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = Percent>) -> Percent {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for value in values {
        sum += u64::from(u8::from(value));
        count += 1;
    }
    if count == 0 {
        return Percent::ZERO;
    }
    #[allow(clippy::cast_possible_truncation)]
    Percent(((2 * sum + count) / (2 * count)) as u8)
}

/// Mean of the completion percentages of one day's instances.
/// A day without instances counts as 0%.
#[must_use]
pub fn day_completion(instances: &[WeeklyExerciseInstance]) -> Percent {
    mean(instances.iter().map(|i| i.completion_percentage))
}

#[must_use]
pub fn completed_count(instances: &[WeeklyExerciseInstance]) -> usize {
    instances
        .iter()
        .filter(|i| i.status == InstanceStatus::Completed)
        .count()
}

/// Week-level percentage: completed over total instances.
#[must_use]
pub fn week_completion(instances: &[WeeklyExerciseInstance]) -> Percent {
    ratio(completed_count(instances), instances.len())
}

/// Assignment-level percentage: mean over all materialized instances,
/// across all weeks. Recomputed after every instance mutation, so it may
/// decrease when a completed instance is reverted.
#[must_use]
pub fn assignment_completion(instances: &[WeeklyExerciseInstance]) -> Percent {
    mean(instances.iter().map(|i| i.completion_percentage))
}
