use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::{debug, error, warn};
use uuid::Uuid;

use crate::{
    AssignmentID, AssignmentRepository, AssignmentService, AssignmentStatus, ClientID, CreateError,
    Exercise, ExerciseCatalogService, ExerciseID, ExerciseRepository, InstanceID,
    InstanceRepository, InstanceStatus, Notification, NotificationRepository, NotificationService,
    Percent, Program, ProgramAssignment, ProgramID, ProgramRepository, ProgramService, ReadError,
    ScheduleService, StatusUpdate, UpdateError, ValidationError, WeeklyExerciseInstance,
    WeeklySchedule, notification, progress, schedule,
};

pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func.await;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(crate::StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

impl<R: NotificationRepository> Service<R> {
    /// Best-effort trigger emission. A failure to record a notification is
    /// logged and swallowed; it never fails the operation that caused it.
    async fn emit(&self, notification: Notification) {
        if let Err(err) = self.repository.create_notification(notification).await {
            warn!("failed to record notification: {err}");
        }
    }

    async fn emit_overdue(&self, instances: &[WeeklyExerciseInstance], today: NaiveDate) {
        let overdue = instances
            .iter()
            .filter(|i| i.is_overdue(today))
            .collect::<Vec<_>>();
        if overdue.is_empty() {
            return;
        }
        let recorded = match self.repository.read_notifications().await {
            Ok(notifications) => notifications,
            Err(err) => {
                warn!("failed to read notifications: {err}");
                return;
            }
        };
        for instance in overdue {
            if !notification::overdue_already_recorded(&recorded, instance.id, today) {
                self.emit(Notification::exercise_not_completed(instance, today))
                    .await;
            }
        }
    }
}

impl<R: ProgramRepository> ProgramService for Service<R> {
    async fn get_programs(&self) -> Result<Vec<Program>, ReadError> {
        log_on_error!(self.repository.read_programs(), ReadError, "get", "programs")
    }

    async fn get_program(&self, id: ProgramID) -> Result<Program, ReadError> {
        log_on_error!(
            self.repository.read_program(id),
            ReadError,
            "get",
            "program"
        )
    }
}

impl<R: ExerciseRepository> ExerciseCatalogService for Service<R> {
    async fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            self.repository.read_exercises(),
            ReadError,
            "get",
            "exercises"
        )
    }

    async fn get_exercise(&self, id: ExerciseID) -> Result<Exercise, ReadError> {
        log_on_error!(
            self.repository.read_exercise(id),
            ReadError,
            "get",
            "exercise"
        )
    }
}

impl<R: NotificationRepository> NotificationService for Service<R> {
    async fn get_notifications(
        &self,
        client_id: Option<ClientID>,
    ) -> Result<Vec<Notification>, ReadError> {
        let notifications = log_on_error!(
            self.repository.read_notifications(),
            ReadError,
            "get",
            "notifications"
        )?;
        Ok(notifications
            .into_iter()
            .filter(|n| client_id.is_none_or(|id| n.client_id == id))
            .collect())
    }
}

impl<R> AssignmentService for Service<R>
where
    R: ProgramRepository + AssignmentRepository + NotificationRepository,
{
    async fn assign_program(
        &self,
        program_id: ProgramID,
        client_ids: &BTreeSet<ClientID>,
        assigned_date: NaiveDate,
        start_date: Option<NaiveDate>,
        custom_notes: Option<String>,
    ) -> Result<Vec<ProgramAssignment>, CreateError> {
        let program = self
            .repository
            .read_program(program_id)
            .await
            .map_err(CreateError::from)?;
        let assignments = self
            .repository
            .read_assignments()
            .await
            .map_err(CreateError::from)?;
        let mut created = Vec::new();
        for &client_id in client_ids {
            if assignments
                .iter()
                .any(|a| a.client_id == client_id && a.is_active())
            {
                debug!("skipping client {client_id:?}: active assignment exists");
                continue;
            }
            let assignment = ProgramAssignment {
                id: Uuid::new_v4().into(),
                program_id,
                client_id,
                trainer_id: program.trainer_id,
                status: AssignmentStatus::Active,
                assigned_date,
                start_date,
                completion_percentage: Percent::ZERO,
                custom_notes: custom_notes.clone(),
                days: program.days.clone(),
            };
            match self.repository.create_assignment(assignment).await {
                Ok(assignment) => {
                    self.emit(Notification::new_assignment(
                        assignment.client_id,
                        assignment.id,
                        assigned_date,
                    ))
                    .await;
                    created.push(assignment);
                }
                Err(CreateError::Conflict) => {
                    debug!("skipping client {client_id:?}: assignment created concurrently");
                }
                Err(err) => {
                    error!("failed to create assignment: {err}");
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    async fn get_assignments(
        &self,
        client_id: Option<ClientID>,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<ProgramAssignment>, ReadError> {
        let assignments = log_on_error!(
            self.repository.read_assignments(),
            ReadError,
            "get",
            "assignments"
        )?;
        Ok(assignments
            .into_iter()
            .filter(|a| client_id.is_none_or(|id| a.client_id == id))
            .filter(|a| status.is_none_or(|s| a.status == s))
            .collect())
    }

    async fn get_assignment(&self, id: AssignmentID) -> Result<ProgramAssignment, ReadError> {
        log_on_error!(
            self.repository.read_assignment(id),
            ReadError,
            "get",
            "assignment"
        )
    }

    async fn get_active_assignment(
        &self,
        client_id: ClientID,
    ) -> Result<Option<ProgramAssignment>, ReadError> {
        let assignments = self.get_assignments(Some(client_id), None).await?;
        Ok(assignments.into_iter().find(ProgramAssignment::is_active))
    }

    async fn update_assignment_status(
        &self,
        id: AssignmentID,
        status: AssignmentStatus,
    ) -> Result<ProgramAssignment, UpdateError> {
        let assignment = self
            .repository
            .read_assignment(id)
            .await
            .map_err(UpdateError::from)?;
        if !assignment.status.may_become(status) {
            return Err(ValidationError::InvalidTransition {
                from: assignment.status,
                to: status,
            }
            .into());
        }
        // resuming must not produce a second active assignment
        if status == AssignmentStatus::Active {
            let assignments = self
                .repository
                .read_assignments()
                .await
                .map_err(UpdateError::from)?;
            if assignments
                .iter()
                .any(|a| a.id != id && a.client_id == assignment.client_id && a.is_active())
            {
                debug!(
                    "skipping resume of assignment {id:?}: active assignment exists for client"
                );
                return Err(UpdateError::Conflict);
            }
        }
        log_on_error!(
            self.repository.modify_assignment(id, Some(status), None),
            UpdateError,
            "modify",
            "assignment"
        )
    }

    async fn cancel_assignment(&self, id: AssignmentID) -> Result<(), UpdateError> {
        let assignment = self
            .repository
            .read_assignment(id)
            .await
            .map_err(UpdateError::from)?;
        if assignment.status == AssignmentStatus::Cancelled {
            debug!("assignment already cancelled");
            return Ok(());
        }
        self.update_assignment_status(id, AssignmentStatus::Cancelled)
            .await
            .map(|_| ())
    }
}

impl<R> ScheduleService for Service<R>
where
    R: AssignmentRepository + InstanceRepository + NotificationRepository + ExerciseRepository,
{
    async fn get_or_create_week(
        &self,
        assignment_id: AssignmentID,
        week_start: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeeklySchedule, CreateError> {
        let assignment = self
            .repository
            .read_assignment(assignment_id)
            .await
            .map_err(CreateError::from)?;
        let start = schedule::week_start(week_start);
        let number = schedule::week_number(assignment.anchor_date(), start)?;
        let existing = self
            .repository
            .read_week_instances(assignment_id, number)
            .await
            .map_err(CreateError::from)?;
        let instances = if existing.is_empty() {
            if !assignment.is_active() {
                return Err(CreateError::WindowClosed);
            }
            let fresh = schedule::materialize_week(&assignment, start, number);
            match self.repository.create_instances(fresh).await {
                Ok(instances) => instances,
                Err(CreateError::Conflict) => {
                    // lost the materialization race, the winner's rows are
                    // authoritative
                    debug!("week {number} already materialized concurrently");
                    self.repository
                        .read_week_instances(assignment_id, number)
                        .await
                        .map_err(CreateError::from)?
                }
                Err(err) => {
                    error!("failed to materialize week {number}: {err}");
                    return Err(err);
                }
            }
        } else {
            existing
        };
        self.emit_overdue(&instances, today).await;
        Ok(WeeklySchedule::new(start, instances))
    }

    async fn update_instance_status(
        &self,
        id: InstanceID,
        update: StatusUpdate,
        today: NaiveDate,
    ) -> Result<WeeklyExerciseInstance, UpdateError> {
        let instance = self
            .repository
            .read_instance(id)
            .await
            .map_err(UpdateError::from)?;
        let assignment = self
            .repository
            .read_assignment(instance.assignment_id)
            .await
            .map_err(UpdateError::from)?;
        if assignment.is_frozen() {
            return Err(UpdateError::WindowClosed);
        }
        let updated = log_on_error!(
            self.repository
                .replace_instance(instance.with_update(update, today)),
            UpdateError,
            "modify",
            "exercise instance"
        )?;
        let all = self
            .repository
            .read_instances(assignment.id)
            .await
            .map_err(UpdateError::from)?;
        self.repository
            .modify_assignment(
                assignment.id,
                None,
                Some(progress::assignment_completion(&all)),
            )
            .await?;
        if instance.status != InstanceStatus::Completed
            && updated.status == InstanceStatus::Completed
        {
            self.emit(Notification::workout_completed(&updated, today))
                .await;
            let day_group = all
                .iter()
                .filter(|i| {
                    i.week_number == updated.week_number && i.day_number == updated.day_number
                })
                .collect::<Vec<_>>();
            if notification::day_completed(&day_group) {
                self.emit(Notification::day_completed(&updated, today)).await;
            }
        }
        Ok(updated)
    }

    async fn get_week_exercises(
        &self,
        schedule: &WeeklySchedule,
    ) -> Result<BTreeMap<ExerciseID, Exercise>, ReadError> {
        let ids = schedule
            .instances()
            .map(|i| i.exercise_id)
            .collect::<BTreeSet<_>>();
        let mut exercises = BTreeMap::new();
        for id in ids {
            match self.repository.read_exercise(id).await {
                Ok(exercise) => {
                    exercises.insert(id, exercise);
                }
                Err(ReadError::NotFound) => {
                    debug!("exercise {id:?} missing from catalog");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(exercises)
    }
}
