#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod assignment;
mod error;
mod exercise;
mod name;
mod notification;
mod program;
mod progress;
mod schedule;
mod service;

pub use assignment::{
    AssignmentID, AssignmentRepository, AssignmentService, AssignmentStatus, ProgramAssignment,
};
pub use error::{CreateError, ReadError, StorageError, UpdateError, ValidationError};
pub use exercise::{Exercise, ExerciseCatalogService, ExerciseID, ExerciseRepository};
pub use name::{Name, NameError};
pub use notification::{
    Notification, NotificationID, NotificationRepository, NotificationService, TriggerKind,
    day_completed, overdue_already_recorded,
};
pub use program::{
    ExercisePrescription, Program, ProgramID, ProgramRepository, ProgramService, Sets, SetsError,
    WorkoutDay,
};
pub use progress::{
    Percent, PercentError, assignment_completion, completed_count, day_completion, mean, ratio,
    week_completion,
};
pub use schedule::{
    InstanceID, InstanceRepository, InstanceStatus, ScheduleService, StatusUpdate,
    WeeklyExerciseInstance, WeeklySchedule, materialize_week, week_number, week_start,
};
pub use service::Service;

use derive_more::Deref;
use uuid::Uuid;

/// The authenticated caller identity and its counterpart are passed in
/// explicitly; this crate holds no ambient session state.
#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrainerID(Uuid);

impl TrainerID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for TrainerID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for TrainerID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientID(Uuid);

impl ClientID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ClientID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ClientID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}
