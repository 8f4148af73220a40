use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Days, Duration, NaiveDate};
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    AssignmentID, ClientID, CreateError, Exercise, ExerciseID, Percent, ProgramAssignment,
    ReadError, Sets, UpdateError, ValidationError, progress,
};

#[allow(async_fn_in_trait)]
pub trait ScheduleService {
    /// Returns the schedule for the week containing `week_start`,
    /// materializing its exercise instances on first access.
    ///
    /// `week_start` is normalized to the Monday of its week.
    /// Materialization is idempotent: if instances for the week already
    /// exist they are returned unmodified. A week that has not been
    /// materialized yet can only be created while the assignment is active;
    /// otherwise the call fails with `CreateError::WindowClosed`.
    ///
    /// Reading a week also checks for overdue instances and emits
    /// `exercise_not_completed` triggers, at most once per instance per
    /// day, best-effort.
    async fn get_or_create_week(
        &self,
        assignment_id: AssignmentID,
        week_start: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeeklySchedule, CreateError>;

    /// Applies a status update to a single exercise instance and recomputes
    /// the owning assignment's completion percentage.
    async fn update_instance_status(
        &self,
        id: InstanceID,
        update: StatusUpdate,
        today: NaiveDate,
    ) -> Result<WeeklyExerciseInstance, UpdateError>;

    /// Catalog entries for all exercises referenced by a schedule. Missing
    /// catalog entries are omitted, never an error.
    async fn get_week_exercises(
        &self,
        schedule: &WeeklySchedule,
    ) -> Result<BTreeMap<ExerciseID, Exercise>, ReadError>;
}

#[allow(async_fn_in_trait)]
pub trait InstanceRepository {
    async fn read_instances(
        &self,
        assignment_id: AssignmentID,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError>;
    async fn read_week_instances(
        &self,
        assignment_id: AssignmentID,
        week_number: u32,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError>;
    async fn read_instance(&self, id: InstanceID) -> Result<WeeklyExerciseInstance, ReadError>;
    /// Persists a freshly materialized week. Fails with
    /// `CreateError::Conflict` if instances for the same
    /// (assignment, week number) already exist.
    async fn create_instances(
        &self,
        instances: Vec<WeeklyExerciseInstance>,
    ) -> Result<Vec<WeeklyExerciseInstance>, CreateError>;
    async fn replace_instance(
        &self,
        instance: WeeklyExerciseInstance,
    ) -> Result<WeeklyExerciseInstance, UpdateError>;
}

/// One trackable exercise occurrence within a specific week and day of an
/// assignment. Owned by the assignment; prescription fields are copies.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyExerciseInstance {
    pub id: InstanceID,
    pub assignment_id: AssignmentID,
    pub client_id: ClientID,
    pub exercise_id: ExerciseID,
    pub week_number: u32,
    pub day_number: u32,
    pub exercise_order: u32,
    pub sets: Sets,
    pub reps: String,
    pub weight: String,
    pub rest_seconds: u32,
    pub notes: Option<String>,
    pub status: InstanceStatus,
    pub completion_percentage: Percent,
    pub assigned_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub client_feedback: Option<String>,
    pub trainer_feedback: Option<String>,
}

impl WeeklyExerciseInstance {
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InstanceStatus::Pending
            && self.due_date.is_some_and(|due_date| due_date < today)
    }

    /// Returns a copy with the update applied.
    ///
    /// An explicit completion percentage always wins. Without one,
    /// completed forces 100%, skipped and pending force 0% and in-progress
    /// keeps the current value. `completed_date` is set when the instance
    /// first reaches completed and cleared again when it leaves it; staying
    /// completed keeps the original date.
    #[must_use]
    pub fn with_update(&self, update: StatusUpdate, today: NaiveDate) -> Self {
        let mut updated = self.clone();
        updated.status = update.status;
        updated.completion_percentage = match (update.status, update.completion_percentage) {
            (_, Some(percentage)) => percentage,
            (InstanceStatus::Completed, None) => Percent::FULL,
            (InstanceStatus::Skipped | InstanceStatus::Pending, None) => Percent::ZERO,
            (InstanceStatus::InProgress, None) => self.completion_percentage,
        };
        updated.completed_date = if update.status == InstanceStatus::Completed {
            self.completed_date.or(Some(today))
        } else {
            None
        };
        if update.client_feedback.is_some() {
            updated.client_feedback = update.client_feedback;
        }
        updated
    }
}

/// Payload of a status update, as received from the client or trainer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: InstanceStatus,
    pub completion_percentage: Option<Percent>,
    pub client_feedback: Option<String>,
}

impl StatusUpdate {
    #[must_use]
    pub fn status(status: InstanceStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstanceID(Uuid);

impl InstanceID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for InstanceID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for InstanceID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstanceStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InstanceStatus::Pending => "pending",
                InstanceStatus::InProgress => "in_progress",
                InstanceStatus::Completed => "completed",
                InstanceStatus::Skipped => "skipped",
            }
        )
    }
}

impl TryFrom<&str> for InstanceStatus {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(InstanceStatus::Pending),
            "in_progress" => Ok(InstanceStatus::InProgress),
            "completed" => Ok(InstanceStatus::Completed),
            "skipped" => Ok(InstanceStatus::Skipped),
            _ => Err(ValidationError::UnknownStatus(value.to_string())),
        }
    }
}

/// One calendar week of an assignment, grouped by day number.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySchedule {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub completion_percentage: Percent,
    pub days: BTreeMap<u32, Vec<WeeklyExerciseInstance>>,
}

impl WeeklySchedule {
    #[must_use]
    pub fn new(week_start: NaiveDate, mut instances: Vec<WeeklyExerciseInstance>) -> Self {
        instances.sort_by_key(|i| (i.day_number, i.exercise_order));
        let total_exercises = instances.len();
        let completed_exercises = progress::completed_count(&instances);
        let completion_percentage = progress::week_completion(&instances);
        let mut days: BTreeMap<u32, Vec<WeeklyExerciseInstance>> = BTreeMap::new();
        for instance in instances {
            days.entry(instance.day_number).or_default().push(instance);
        }
        Self {
            week_start,
            week_end: week_start + Duration::days(6),
            total_exercises,
            completed_exercises,
            completion_percentage,
            days,
        }
    }

    /// Mean completion of one day's instances, 0% for an absent day.
    #[must_use]
    pub fn day_completion(&self, day_number: u32) -> Percent {
        self.days
            .get(&day_number)
            .map_or(Percent::ZERO, |instances| {
                progress::day_completion(instances)
            })
    }

    pub fn instances(&self) -> impl Iterator<Item = &WeeklyExerciseInstance> {
        self.days.values().flatten()
    }
}

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// One-based week number of the week starting at `start`, counted in whole
/// weeks from the week of the assignment's anchor date.
pub fn week_number(anchor: NaiveDate, start: NaiveDate) -> Result<u32, ValidationError> {
    let elapsed = (start - week_start(anchor)).num_days();
    if elapsed < 0 {
        return Err(ValidationError::WeekBeforeAssignment);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((elapsed / 7) as u32 + 1)
}

/// Expands an assignment's frozen workout structure into pending instances
/// for one week. Pure; persistence and uniqueness are the store's concern.
#[must_use]
pub fn materialize_week(
    assignment: &ProgramAssignment,
    week_start: NaiveDate,
    week_number: u32,
) -> Vec<WeeklyExerciseInstance> {
    let mut instances = Vec::with_capacity(
        assignment
            .days
            .iter()
            .map(|day| day.exercises.len())
            .sum::<usize>(),
    );
    for (day_index, day) in assignment.days.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let day_number = day_index as u32 + 1;
        let date = week_start + Days::new(day_index as u64);
        for (exercise_index, prescription) in day.exercises.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            instances.push(WeeklyExerciseInstance {
                id: Uuid::new_v4().into(),
                assignment_id: assignment.id,
                client_id: assignment.client_id,
                exercise_id: prescription.exercise_id,
                week_number,
                day_number,
                exercise_order: exercise_index as u32 + 1,
                sets: prescription.sets,
                reps: prescription.reps.clone(),
                weight: prescription.weight.clone(),
                rest_seconds: prescription.rest_seconds,
                notes: prescription.notes.clone(),
                status: InstanceStatus::Pending,
                completion_percentage: Percent::ZERO,
                assigned_date: date,
                due_date: Some(date),
                completed_date: None,
                client_feedback: None,
                trainer_feedback: None,
            });
        }
    }
    instances
}
