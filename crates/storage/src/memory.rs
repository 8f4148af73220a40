use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use fitcoach_domain as domain;

use domain::{
    AssignmentID, AssignmentRepository, AssignmentStatus, CreateError, Exercise, ExerciseID,
    ExerciseRepository, InstanceID, InstanceRepository, Notification, NotificationRepository,
    Percent, Program, ProgramAssignment, ProgramID, ProgramRepository, ReadError, StorageError,
    UpdateError, WeeklyExerciseInstance,
};

/// In-memory stand-in for the shared durable store.
///
/// Enforces the uniqueness constraints the service relies on: at most one
/// active assignment per client and one instance set per
/// (assignment, week number).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    exercises: BTreeMap<ExerciseID, Exercise>,
    programs: BTreeMap<ProgramID, Program>,
    assignments: BTreeMap<AssignmentID, ProgramAssignment>,
    instances: BTreeMap<InstanceID, WeeklyExerciseInstance>,
    notifications: Vec<Notification>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog exercise. Catalog authoring is not part of this
    /// subsystem; this exists for embedding and tests.
    pub fn put_exercise(&self, exercise: Exercise) -> Result<(), StorageError> {
        self.write()?.exercises.insert(exercise.id, exercise);
        Ok(())
    }

    /// Seeds a program template, see [`Self::put_exercise`].
    pub fn put_program(&self, program: Program) -> Result<(), StorageError> {
        self.write()?.programs.insert(program.id, program);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StorageError> {
        self.state
            .read()
            .map_err(|_| StorageError::Other("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StorageError> {
        self.state
            .write()
            .map_err(|_| StorageError::Other("store lock poisoned".into()))
    }
}

impl ExerciseRepository for InMemoryStore {
    async fn read_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
        Ok(self.read()?.exercises.values().cloned().collect())
    }

    async fn read_exercise(&self, id: ExerciseID) -> Result<Exercise, ReadError> {
        self.read()?
            .exercises
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound)
    }
}

impl ProgramRepository for InMemoryStore {
    async fn read_programs(&self) -> Result<Vec<Program>, ReadError> {
        Ok(self.read()?.programs.values().cloned().collect())
    }

    async fn read_program(&self, id: ProgramID) -> Result<Program, ReadError> {
        self.read()?
            .programs
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound)
    }
}

impl AssignmentRepository for InMemoryStore {
    async fn read_assignments(&self) -> Result<Vec<ProgramAssignment>, ReadError> {
        Ok(self.read()?.assignments.values().cloned().collect())
    }

    async fn read_assignment(&self, id: AssignmentID) -> Result<ProgramAssignment, ReadError> {
        self.read()?
            .assignments
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound)
    }

    async fn create_assignment(
        &self,
        assignment: ProgramAssignment,
    ) -> Result<ProgramAssignment, CreateError> {
        let mut state = self.write().map_err(CreateError::Storage)?;
        // partial unique index: at most one active assignment per client
        if assignment.status == AssignmentStatus::Active
            && state
                .assignments
                .values()
                .any(|a| a.client_id == assignment.client_id && a.is_active())
        {
            debug!("client already has an active assignment");
            return Err(CreateError::Conflict);
        }
        if state.assignments.contains_key(&assignment.id) {
            return Err(CreateError::Conflict);
        }
        state.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn modify_assignment(
        &self,
        id: AssignmentID,
        status: Option<AssignmentStatus>,
        completion_percentage: Option<Percent>,
    ) -> Result<ProgramAssignment, UpdateError> {
        let mut state = self.write().map_err(UpdateError::Storage)?;
        let client_id = state
            .assignments
            .get(&id)
            .ok_or(UpdateError::NotFound)?
            .client_id;
        // partial unique index also guards status changes back to active
        if status == Some(AssignmentStatus::Active)
            && state
                .assignments
                .values()
                .any(|a| a.id != id && a.client_id == client_id && a.is_active())
        {
            debug!("client already has an active assignment");
            return Err(UpdateError::Conflict);
        }
        let assignment = state.assignments.get_mut(&id).ok_or(UpdateError::NotFound)?;
        if let Some(status) = status {
            assignment.status = status;
        }
        if let Some(completion_percentage) = completion_percentage {
            assignment.completion_percentage = completion_percentage;
        }
        Ok(assignment.clone())
    }
}

impl InstanceRepository for InMemoryStore {
    async fn read_instances(
        &self,
        assignment_id: AssignmentID,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError> {
        Ok(self
            .read()?
            .instances
            .values()
            .filter(|i| i.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn read_week_instances(
        &self,
        assignment_id: AssignmentID,
        week_number: u32,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError> {
        Ok(self
            .read()?
            .instances
            .values()
            .filter(|i| i.assignment_id == assignment_id && i.week_number == week_number)
            .cloned()
            .collect())
    }

    async fn read_instance(&self, id: InstanceID) -> Result<WeeklyExerciseInstance, ReadError> {
        self.read()?
            .instances
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound)
    }

    async fn create_instances(
        &self,
        instances: Vec<WeeklyExerciseInstance>,
    ) -> Result<Vec<WeeklyExerciseInstance>, CreateError> {
        let mut state = self.write().map_err(CreateError::Storage)?;
        if instances.iter().any(|instance| {
            state.instances.values().any(|existing| {
                existing.assignment_id == instance.assignment_id
                    && existing.week_number == instance.week_number
            })
        }) {
            debug!("week already materialized");
            return Err(CreateError::Conflict);
        }
        for instance in &instances {
            state.instances.insert(instance.id, instance.clone());
        }
        Ok(instances)
    }

    async fn replace_instance(
        &self,
        instance: WeeklyExerciseInstance,
    ) -> Result<WeeklyExerciseInstance, UpdateError> {
        let mut state = self.write().map_err(UpdateError::Storage)?;
        if !state.instances.contains_key(&instance.id) {
            return Err(UpdateError::NotFound);
        }
        state.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }
}

impl NotificationRepository for InMemoryStore {
    async fn read_notifications(&self) -> Result<Vec<Notification>, ReadError> {
        Ok(self.read()?.notifications.clone())
    }

    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, CreateError> {
        self.write()
            .map_err(CreateError::Storage)?
            .notifications
            .push(notification.clone());
        Ok(notification)
    }
}
