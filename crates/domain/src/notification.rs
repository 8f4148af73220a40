use std::fmt;

use chrono::NaiveDate;
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    AssignmentID, ClientID, CreateError, InstanceID, InstanceStatus, ReadError,
    WeeklyExerciseInstance,
};

#[allow(async_fn_in_trait)]
pub trait NotificationService {
    async fn get_notifications(
        &self,
        client_id: Option<ClientID>,
    ) -> Result<Vec<Notification>, ReadError>;
}

/// Append-only log of trigger events, drained by an external delivery
/// system. Delivery channels are not this subsystem's concern.
#[allow(async_fn_in_trait)]
pub trait NotificationRepository {
    async fn read_notifications(&self) -> Result<Vec<Notification>, ReadError>;
    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, CreateError>;
}

/// A single trigger event. Emission is best-effort: a failure to record a
/// notification never propagates to the operation that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationID,
    pub kind: TriggerKind,
    pub client_id: ClientID,
    pub assignment_id: Option<AssignmentID>,
    pub instance_id: Option<InstanceID>,
    pub date: NaiveDate,
}

impl Notification {
    #[must_use]
    pub fn new_assignment(client_id: ClientID, assignment_id: AssignmentID, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().into(),
            kind: TriggerKind::NewAssignment,
            client_id,
            assignment_id: Some(assignment_id),
            instance_id: None,
            date,
        }
    }

    #[must_use]
    pub fn workout_completed(instance: &WeeklyExerciseInstance, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().into(),
            kind: TriggerKind::WorkoutCompleted,
            client_id: instance.client_id,
            assignment_id: Some(instance.assignment_id),
            instance_id: Some(instance.id),
            date,
        }
    }

    #[must_use]
    pub fn day_completed(instance: &WeeklyExerciseInstance, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().into(),
            kind: TriggerKind::DayCompleted,
            client_id: instance.client_id,
            assignment_id: Some(instance.assignment_id),
            instance_id: None,
            date,
        }
    }

    #[must_use]
    pub fn exercise_not_completed(instance: &WeeklyExerciseInstance, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().into(),
            kind: TriggerKind::ExerciseNotCompleted,
            client_id: instance.client_id,
            assignment_id: Some(instance.assignment_id),
            instance_id: Some(instance.id),
            date,
        }
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NotificationID(Uuid);

impl NotificationID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for NotificationID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for NotificationID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TriggerKind {
    WorkoutCompleted,
    DayCompleted,
    ExerciseNotCompleted,
    NewAssignment,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TriggerKind::WorkoutCompleted => "workout_completed",
                TriggerKind::DayCompleted => "day_completed",
                TriggerKind::ExerciseNotCompleted => "exercise_not_completed",
                TriggerKind::NewAssignment => "new_assignment",
            }
        )
    }
}

/// Whether a day's instance group counts as fully completed: at least one
/// instance, every one of them completed.
#[must_use]
pub fn day_completed(instances: &[&WeeklyExerciseInstance]) -> bool {
    !instances.is_empty()
        && instances
            .iter()
            .all(|i| i.status == InstanceStatus::Completed)
}

/// Whether an overdue trigger for this instance was already recorded on
/// `date`. Keeps repeated reads of the same overdue week from flooding the
/// notification log: one trigger per instance per day.
#[must_use]
pub fn overdue_already_recorded(
    notifications: &[Notification],
    instance_id: InstanceID,
    date: NaiveDate,
) -> bool {
    notifications.iter().any(|n| {
        n.kind == TriggerKind::ExerciseNotCompleted
            && n.instance_id == Some(instance_id)
            && n.date == date
    })
}
