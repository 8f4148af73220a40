use std::collections::BTreeSet;
use std::sync::Mutex;

use pretty_assertions::assert_eq;

use fitcoach_domain as domain;

use domain::{
    AssignmentID, AssignmentRepository, AssignmentService, AssignmentStatus, ClientID, CreateError,
    Exercise, ExerciseCatalogService, ExerciseID, ExerciseRepository, InstanceID,
    InstanceRepository, InstanceStatus, Notification, NotificationRepository, NotificationService,
    ProgramService, ReadError, ScheduleService, Service, StatusUpdate, TriggerKind, UpdateError,
    ValidationError, WeeklyExerciseInstance, materialize_week,
};

use crate::InMemoryStore;


use data::date;

fn clients(ids: &[u128]) -> BTreeSet<ClientID> {
    ids.iter().map(|&id| ClientID::from(id)).collect()
}

async fn service_with_assignment() -> (Service<InMemoryStore>, AssignmentID) {
    let service = data::service();
    let created = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    (service, created[0].id)
}

#[tokio::test]
async fn test_assign_program_creates_assignment_per_client() {
    let service = data::service();
    let created = service
        .assign_program(
            1.into(),
            &clients(&[1, 2]),
            date(2024, 1, 1),
            None,
            Some(String::from("start light")),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    for assignment in &created {
        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(assignment.assigned_date, date(2024, 1, 1));
        assert_eq!(assignment.start_date, None);
        assert_eq!(u8::from(assignment.completion_percentage), 0);
        assert_eq!(assignment.custom_notes, Some(String::from("start light")));
        // the workout structure is a snapshot of the program
        assert_eq!(assignment.days, data::PROGRAM.days);
    }
    let notifications = service.get_notifications(None).await.unwrap();
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::NewAssignment)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_assignment_snapshot_matches_program() {
    let (service, id) = service_with_assignment().await;
    let assignment = service.get_assignment(id).await.unwrap();
    let program = service.get_program(1.into()).await.unwrap();
    assert_eq!(assignment.days, program.days);
    assert_eq!(assignment.days.len(), 2);
}

#[tokio::test]
async fn test_assign_program_skips_clients_with_active_assignment() {
    let service = data::service();
    service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    let created = service
        .assign_program(1.into(), &clients(&[1, 2]), date(2024, 1, 8), None, None)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].client_id, 2.into());
}

#[tokio::test]
async fn test_assign_program_with_no_eligible_clients_returns_empty_list() {
    let service = data::service();
    service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    let created = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 8), None, None)
        .await
        .unwrap();
    assert_eq!(created, vec![]);
}

#[tokio::test]
async fn test_assign_program_unknown_program() {
    let service = data::service();
    assert!(matches!(
        service
            .assign_program(99.into(), &clients(&[1]), date(2024, 1, 1), None, None)
            .await,
        Err(CreateError::NotFound)
    ));
}

#[tokio::test]
async fn test_get_active_assignment() {
    let (service, id) = service_with_assignment().await;
    let active = service.get_active_assignment(1.into()).await.unwrap();
    assert_eq!(active.map(|a| a.id), Some(id));
    assert_eq!(service.get_active_assignment(2.into()).await.unwrap(), None);
    service.cancel_assignment(id).await.unwrap();
    assert_eq!(service.get_active_assignment(1.into()).await.unwrap(), None);
}

#[tokio::test]
async fn test_get_assignments_filters() {
    let service = data::service();
    service
        .assign_program(1.into(), &clients(&[1, 2]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    let all = service.get_assignments(None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let for_client = service
        .get_assignments(Some(1.into()), None)
        .await
        .unwrap();
    assert_eq!(for_client.len(), 1);
    let cancelled = service
        .get_assignments(None, Some(AssignmentStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled, vec![]);
}

#[tokio::test]
async fn test_update_assignment_status_transitions() {
    let (service, id) = service_with_assignment().await;
    let paused = service
        .update_assignment_status(id, AssignmentStatus::Paused)
        .await
        .unwrap();
    assert_eq!(paused.status, AssignmentStatus::Paused);
    let resumed = service
        .update_assignment_status(id, AssignmentStatus::Active)
        .await
        .unwrap();
    assert_eq!(resumed.status, AssignmentStatus::Active);
    service
        .update_assignment_status(id, AssignmentStatus::Paused)
        .await
        .unwrap();
    assert!(matches!(
        service
            .update_assignment_status(id, AssignmentStatus::Completed)
            .await,
        Err(UpdateError::Validation(ValidationError::InvalidTransition {
            from: AssignmentStatus::Paused,
            to: AssignmentStatus::Completed,
        }))
    ));
}

#[tokio::test]
async fn test_resume_rejected_while_other_assignment_active() {
    let service = data::service();
    let first = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 1), None, None)
        .await
        .unwrap()[0]
        .id;
    service
        .update_assignment_status(first, AssignmentStatus::Paused)
        .await
        .unwrap();
    let second = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 8), None, None)
        .await
        .unwrap()[0]
        .id;
    assert!(matches!(
        service
            .update_assignment_status(first, AssignmentStatus::Active)
            .await,
        Err(UpdateError::Conflict)
    ));
    // the paused assignment is untouched and the newer one stays active
    let paused = service.get_assignment(first).await.unwrap();
    assert_eq!(paused.status, AssignmentStatus::Paused);
    let active = service.get_active_assignment(1.into()).await.unwrap();
    assert_eq!(active.map(|a| a.id), Some(second));
}

#[tokio::test]
async fn test_cancel_assignment_is_idempotent() {
    let (service, id) = service_with_assignment().await;
    service.cancel_assignment(id).await.unwrap();
    service.cancel_assignment(id).await.unwrap();
    let assignment = service.get_assignment(id).await.unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Cancelled);
}

#[tokio::test]
async fn test_get_or_create_week_materializes_instances() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(schedule.week_start, date(2024, 1, 1));
    assert_eq!(schedule.week_end, date(2024, 1, 7));
    assert_eq!(schedule.total_exercises, 5);
    assert_eq!(schedule.completed_exercises, 0);
    assert_eq!(u8::from(schedule.completion_percentage), 0);
    assert_eq!(schedule.days.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(schedule.days[&1].len(), 3);
    assert_eq!(schedule.days[&2].len(), 2);
    assert!(schedule.instances().all(|i| i.week_number == 1));
}

#[tokio::test]
async fn test_get_or_create_week_is_idempotent() {
    let (service, id) = service_with_assignment().await;
    let first = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let second = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let ids = |schedule: &domain::WeeklySchedule| {
        schedule.instances().map(|i| i.id).collect::<BTreeSet<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&first).len(), 5);
}

#[tokio::test]
async fn test_get_or_create_week_normalizes_week_start() {
    let (service, id) = service_with_assignment().await;
    let monday = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let wednesday = service
        .get_or_create_week(id, date(2024, 1, 3), date(2024, 1, 3))
        .await
        .unwrap();
    assert_eq!(wednesday.week_start, date(2024, 1, 1));
    assert_eq!(
        monday.instances().map(|i| i.id).collect::<BTreeSet<_>>(),
        wednesday.instances().map(|i| i.id).collect::<BTreeSet<_>>()
    );
}

#[tokio::test]
async fn test_get_or_create_week_second_week_numbering() {
    let (service, id) = service_with_assignment().await;
    let week = service
        .get_or_create_week(id, date(2024, 1, 8), date(2024, 1, 8))
        .await
        .unwrap();
    assert!(week.instances().all(|i| i.week_number == 2));
    assert_eq!(week.days[&1][0].assigned_date, date(2024, 1, 8));
    assert_eq!(week.days[&2][0].assigned_date, date(2024, 1, 9));
}

#[tokio::test]
async fn test_get_or_create_week_before_assignment_fails() {
    let service = data::service();
    let created = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 8), None, None)
        .await
        .unwrap();
    assert!(matches!(
        service
            .get_or_create_week(created[0].id, date(2024, 1, 1), date(2024, 1, 8))
            .await,
        Err(CreateError::Validation(
            ValidationError::WeekBeforeAssignment
        ))
    ));
}

#[tokio::test]
async fn test_get_or_create_week_uses_start_date_anchor() {
    let service = data::service();
    let created = service
        .assign_program(
            1.into(),
            &clients(&[1]),
            date(2024, 1, 1),
            Some(date(2024, 1, 15)),
            None,
        )
        .await
        .unwrap();
    let week = service
        .get_or_create_week(created[0].id, date(2024, 1, 22), date(2024, 1, 22))
        .await
        .unwrap();
    assert!(week.instances().all(|i| i.week_number == 2));
}

#[tokio::test]
async fn test_non_active_assignment_returns_materialized_weeks_only() {
    let (service, id) = service_with_assignment().await;
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    service
        .update_assignment_status(id, AssignmentStatus::Paused)
        .await
        .unwrap();
    // the already materialized week stays readable
    let week = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(week.total_exercises, 5);
    // a new week must not come into existence
    assert!(matches!(
        service
            .get_or_create_week(id, date(2024, 1, 8), date(2024, 1, 8))
            .await,
        Err(CreateError::WindowClosed)
    ));
}

#[tokio::test]
async fn test_completing_day_one_yields_sixty_percent() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    for instance in &schedule.days[&1] {
        service
            .update_instance_status(
                instance.id,
                StatusUpdate::status(InstanceStatus::Completed),
                date(2024, 1, 1),
            )
            .await
            .unwrap();
    }
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(schedule.total_exercises, 5);
    assert_eq!(schedule.completed_exercises, 3);
    assert_eq!(u8::from(schedule.completion_percentage), 60);
    assert_eq!(u8::from(schedule.day_completion(1)), 100);
    assert_eq!(u8::from(schedule.day_completion(2)), 0);
    // the assignment-level roll-up covers all materialized instances
    let assignment = service.get_assignment(id).await.unwrap();
    assert_eq!(u8::from(assignment.completion_percentage), 60);
    let notifications = service.get_notifications(None).await.unwrap();
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::WorkoutCompleted)
            .count(),
        3
    );
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::DayCompleted)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_skipped_instance_blocks_day_completed_trigger() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let day_one = &schedule.days[&1];
    service
        .update_instance_status(
            day_one[0].id,
            StatusUpdate::status(InstanceStatus::Skipped),
            date(2024, 1, 1),
        )
        .await
        .unwrap();
    for instance in &day_one[1..] {
        service
            .update_instance_status(
                instance.id,
                StatusUpdate::status(InstanceStatus::Completed),
                date(2024, 1, 1),
            )
            .await
            .unwrap();
    }
    let notifications = service.get_notifications(None).await.unwrap();
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::DayCompleted)
            .count(),
        0
    );
}

#[tokio::test]
async fn test_completed_date_set_and_cleared() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let instance_id = schedule.days[&1][0].id;
    let completed = service
        .update_instance_status(
            instance_id,
            StatusUpdate::status(InstanceStatus::Completed),
            date(2024, 1, 2),
        )
        .await
        .unwrap();
    assert_eq!(completed.completed_date, Some(date(2024, 1, 2)));
    assert_eq!(u8::from(completed.completion_percentage), 100);
    let week = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    assert_eq!(week.completed_exercises, 1);

    let reverted = service
        .update_instance_status(
            instance_id,
            StatusUpdate::status(InstanceStatus::Pending),
            date(2024, 1, 3),
        )
        .await
        .unwrap();
    assert_eq!(reverted.completed_date, None);
    assert_eq!(u8::from(reverted.completion_percentage), 0);
    let week = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    assert_eq!(week.completed_exercises, 0);
}

#[tokio::test]
async fn test_update_instance_with_explicit_percentage() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let updated = service
        .update_instance_status(
            schedule.days[&1][0].id,
            StatusUpdate {
                status: InstanceStatus::InProgress,
                completion_percentage: Some(domain::Percent::new(50).unwrap()),
                client_feedback: Some(String::from("two sets left")),
            },
            date(2024, 1, 1),
        )
        .await
        .unwrap();
    assert_eq!(u8::from(updated.completion_percentage), 50);
    assert_eq!(updated.client_feedback, Some(String::from("two sets left")));
    // 50 / 5 instances
    let assignment = service.get_assignment(id).await.unwrap();
    assert_eq!(u8::from(assignment.completion_percentage), 10);
}

#[tokio::test]
async fn test_frozen_assignment_rejects_instance_mutation() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let instance_id = schedule.days[&1][0].id;
    service.cancel_assignment(id).await.unwrap();
    assert!(matches!(
        service
            .update_instance_status(
                instance_id,
                StatusUpdate::status(InstanceStatus::Completed),
                date(2024, 1, 2),
            )
            .await,
        Err(UpdateError::WindowClosed)
    ));
}

#[tokio::test]
async fn test_update_unknown_instance() {
    let (service, _) = service_with_assignment().await;
    assert!(matches!(
        service
            .update_instance_status(
                99.into(),
                StatusUpdate::status(InstanceStatus::Completed),
                date(2024, 1, 1),
            )
            .await,
        Err(UpdateError::NotFound)
    ));
}

#[tokio::test]
async fn test_overdue_trigger_once_per_instance_per_day() {
    let (service, id) = service_with_assignment().await;
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    let overdue_count = |notifications: &[domain::Notification]| {
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::ExerciseNotCompleted)
            .count()
    };
    // nothing is overdue on the day it is due
    assert_eq!(
        overdue_count(&service.get_notifications(None).await.unwrap()),
        0
    );
    // the next day, day 1 is overdue
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    assert_eq!(
        overdue_count(&service.get_notifications(None).await.unwrap()),
        3
    );
    // re-reading on the same day does not duplicate the triggers
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    assert_eq!(
        overdue_count(&service.get_notifications(None).await.unwrap()),
        3
    );
    // a later day re-arms the triggers, now including day 2
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 3))
        .await
        .unwrap();
    assert_eq!(
        overdue_count(&service.get_notifications(None).await.unwrap()),
        8
    );
}

#[tokio::test]
async fn test_completed_instance_is_not_overdue() {
    let (service, id) = service_with_assignment().await;
    let schedule = service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    for instance in &schedule.days[&1] {
        service
            .update_instance_status(
                instance.id,
                StatusUpdate::status(InstanceStatus::Completed),
                date(2024, 1, 1),
            )
            .await
            .unwrap();
    }
    service
        .get_or_create_week(id, date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    let notifications = service.get_notifications(None).await.unwrap();
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == TriggerKind::ExerciseNotCompleted)
            .count(),
        0
    );
}

#[tokio::test]
async fn test_get_notifications_filters_by_client() {
    let service = data::service();
    service
        .assign_program(1.into(), &clients(&[1, 2]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    let for_client = service.get_notifications(Some(1.into())).await.unwrap();
    assert_eq!(for_client.len(), 1);
    assert_eq!(for_client[0].client_id, 1.into());
}

#[tokio::test]
async fn test_get_week_exercises_omits_missing_catalog_entries() {
    let store = InMemoryStore::new();
    for exercise in data::EXERCISES.iter().take(2) {
        store.put_exercise(exercise.clone()).unwrap();
    }
    let mut program = data::PROGRAM.clone();
    program.days.truncate(1);
    store.put_program(program).unwrap();
    let service = Service::new(store);
    let created = service
        .assign_program(1.into(), &clients(&[1]), date(2024, 1, 1), None, None)
        .await
        .unwrap();
    let schedule = service
        .get_or_create_week(created[0].id, date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    // day 1 references exercises 1-3, only 1 and 2 are in the catalog
    let exercises = service.get_week_exercises(&schedule).await.unwrap();
    assert_eq!(
        exercises.keys().copied().collect::<Vec<domain::ExerciseID>>(),
        vec![1.into(), 2.into()]
    );
    assert_eq!(service.get_exercises().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_store_rejects_duplicate_week_materialization() {
    let store = data::store();
    let created = store
        .create_assignment(domain::ProgramAssignment {
            id: 1.into(),
            program_id: 1.into(),
            client_id: 1.into(),
            trainer_id: 1.into(),
            status: AssignmentStatus::Active,
            assigned_date: date(2024, 1, 1),
            start_date: None,
            completion_percentage: domain::Percent::ZERO,
            custom_notes: None,
            days: data::PROGRAM.days.clone(),
        })
        .await
        .unwrap();
    let first = materialize_week(&created, date(2024, 1, 1), 1);
    store.create_instances(first).await.unwrap();
    let second = materialize_week(&created, date(2024, 1, 1), 1);
    assert!(matches!(
        store.create_instances(second).await,
        Err(CreateError::Conflict)
    ));
}

#[tokio::test]
async fn test_store_rejects_second_active_assignment_per_client() {
    let store = data::store();
    let assignment = domain::ProgramAssignment {
        id: 1.into(),
        program_id: 1.into(),
        client_id: 1.into(),
        trainer_id: 1.into(),
        status: AssignmentStatus::Active,
        assigned_date: date(2024, 1, 1),
        start_date: None,
        completion_percentage: domain::Percent::ZERO,
        custom_notes: None,
        days: data::PROGRAM.days.clone(),
    };
    store.create_assignment(assignment.clone()).await.unwrap();
    let mut duplicate = assignment;
    duplicate.id = 2.into();
    assert!(matches!(
        store.create_assignment(duplicate).await,
        Err(CreateError::Conflict)
    ));
}

#[tokio::test]
async fn test_store_rejects_reactivation_next_to_active_assignment() {
    let store = data::store();
    let mut assignment = domain::ProgramAssignment {
        id: 1.into(),
        program_id: 1.into(),
        client_id: 1.into(),
        trainer_id: 1.into(),
        status: AssignmentStatus::Active,
        assigned_date: date(2024, 1, 1),
        start_date: None,
        completion_percentage: domain::Percent::ZERO,
        custom_notes: None,
        days: data::PROGRAM.days.clone(),
    };
    store.create_assignment(assignment.clone()).await.unwrap();
    assignment.id = 2.into();
    assignment.status = AssignmentStatus::Paused;
    store.create_assignment(assignment).await.unwrap();
    assert!(matches!(
        store
            .modify_assignment(2.into(), Some(AssignmentStatus::Active), None)
            .await,
        Err(UpdateError::Conflict)
    ));
    // without a competing active assignment the same change goes through
    store
        .modify_assignment(1.into(), Some(AssignmentStatus::Paused), None)
        .await
        .unwrap();
    let resumed = store
        .modify_assignment(2.into(), Some(AssignmentStatus::Active), None)
        .await
        .unwrap();
    assert_eq!(resumed.status, AssignmentStatus::Active);
}

/// Store where another writer always materializes the requested week first:
/// the week reads empty before creation, creation conflicts, and afterwards
/// the winner's rows are visible.
struct ContestedStore {
    assignment: domain::ProgramAssignment,
    winner: Vec<WeeklyExerciseInstance>,
    week_reads: Mutex<usize>,
}

impl AssignmentRepository for ContestedStore {
    async fn read_assignments(&self) -> Result<Vec<domain::ProgramAssignment>, ReadError> {
        Ok(vec![self.assignment.clone()])
    }

    async fn read_assignment(
        &self,
        _: AssignmentID,
    ) -> Result<domain::ProgramAssignment, ReadError> {
        Ok(self.assignment.clone())
    }

    async fn create_assignment(
        &self,
        _: domain::ProgramAssignment,
    ) -> Result<domain::ProgramAssignment, CreateError> {
        Err(CreateError::Conflict)
    }

    async fn modify_assignment(
        &self,
        _: AssignmentID,
        _: Option<AssignmentStatus>,
        _: Option<domain::Percent>,
    ) -> Result<domain::ProgramAssignment, UpdateError> {
        Ok(self.assignment.clone())
    }
}

impl InstanceRepository for ContestedStore {
    async fn read_instances(
        &self,
        _: AssignmentID,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError> {
        Ok(self.winner.clone())
    }

    async fn read_week_instances(
        &self,
        _: AssignmentID,
        _: u32,
    ) -> Result<Vec<WeeklyExerciseInstance>, ReadError> {
        let mut reads = self.week_reads.lock().unwrap();
        *reads += 1;
        Ok(if *reads == 1 {
            vec![]
        } else {
            self.winner.clone()
        })
    }

    async fn read_instance(&self, _: InstanceID) -> Result<WeeklyExerciseInstance, ReadError> {
        Err(ReadError::NotFound)
    }

    async fn create_instances(
        &self,
        _: Vec<WeeklyExerciseInstance>,
    ) -> Result<Vec<WeeklyExerciseInstance>, CreateError> {
        Err(CreateError::Conflict)
    }

    async fn replace_instance(
        &self,
        _: WeeklyExerciseInstance,
    ) -> Result<WeeklyExerciseInstance, UpdateError> {
        Err(UpdateError::NotFound)
    }
}

impl NotificationRepository for ContestedStore {
    async fn read_notifications(&self) -> Result<Vec<Notification>, ReadError> {
        Ok(vec![])
    }

    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, CreateError> {
        Ok(notification)
    }
}

impl ExerciseRepository for ContestedStore {
    async fn read_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
        Ok(vec![])
    }

    async fn read_exercise(&self, _: ExerciseID) -> Result<Exercise, ReadError> {
        Err(ReadError::NotFound)
    }
}

#[tokio::test]
async fn test_lost_materialization_race_returns_winner_rows() {
    let assignment = domain::ProgramAssignment {
        id: 1.into(),
        program_id: 1.into(),
        client_id: 1.into(),
        trainer_id: 1.into(),
        status: AssignmentStatus::Active,
        assigned_date: date(2024, 1, 1),
        start_date: None,
        completion_percentage: domain::Percent::ZERO,
        custom_notes: None,
        days: data::PROGRAM.days.clone(),
    };
    let winner = materialize_week(&assignment, date(2024, 1, 1), 1);
    let winner_ids = winner.iter().map(|i| i.id).collect::<BTreeSet<_>>();
    let service = Service::new(ContestedStore {
        assignment,
        winner,
        week_reads: Mutex::new(0),
    });
    let schedule = service
        .get_or_create_week(1.into(), date(2024, 1, 1), date(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(
        schedule.instances().map(|i| i.id).collect::<BTreeSet<_>>(),
        winner_ids
    );
    assert_eq!(schedule.total_exercises, 5);
}
