use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    ClientID, CreateError, Percent, ProgramID, ReadError, TrainerID, UpdateError, ValidationError,
    WorkoutDay,
};

#[allow(async_fn_in_trait)]
pub trait AssignmentService {
    /// Assigns a program to a set of clients.
    ///
    /// Clients that already have an active assignment are skipped; only the
    /// assignments actually created are returned. An empty result therefore
    /// means "no eligible clients", not an error. Each created assignment
    /// holds a deep copy of the program's workout days taken now; later
    /// changes to the program do not affect it.
    async fn assign_program(
        &self,
        program_id: ProgramID,
        client_ids: &BTreeSet<ClientID>,
        assigned_date: NaiveDate,
        start_date: Option<NaiveDate>,
        custom_notes: Option<String>,
    ) -> Result<Vec<ProgramAssignment>, CreateError>;
    async fn get_assignments(
        &self,
        client_id: Option<ClientID>,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<ProgramAssignment>, ReadError>;
    async fn get_assignment(&self, id: AssignmentID) -> Result<ProgramAssignment, ReadError>;
    /// At most one active assignment exists per client.
    async fn get_active_assignment(
        &self,
        client_id: ClientID,
    ) -> Result<Option<ProgramAssignment>, ReadError>;
    async fn update_assignment_status(
        &self,
        id: AssignmentID,
        status: AssignmentStatus,
    ) -> Result<ProgramAssignment, UpdateError>;
    /// Idempotent: cancelling an already cancelled assignment is a no-op.
    async fn cancel_assignment(&self, id: AssignmentID) -> Result<(), UpdateError>;
}

#[allow(async_fn_in_trait)]
pub trait AssignmentRepository {
    async fn read_assignments(&self) -> Result<Vec<ProgramAssignment>, ReadError>;
    async fn read_assignment(&self, id: AssignmentID) -> Result<ProgramAssignment, ReadError>;
    async fn create_assignment(
        &self,
        assignment: ProgramAssignment,
    ) -> Result<ProgramAssignment, CreateError>;
    async fn modify_assignment(
        &self,
        id: AssignmentID,
        status: Option<AssignmentStatus>,
        completion_percentage: Option<Percent>,
    ) -> Result<ProgramAssignment, UpdateError>;
}

/// Stateful binding of a program snapshot to one client.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramAssignment {
    pub id: AssignmentID,
    pub program_id: ProgramID,
    pub client_id: ClientID,
    pub trainer_id: TrainerID,
    pub status: AssignmentStatus,
    pub assigned_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub completion_percentage: Percent,
    pub custom_notes: Option<String>,
    /// Snapshot of the program's workout days at assignment time.
    pub days: Vec<WorkoutDay>,
}

impl ProgramAssignment {
    /// Date the week numbering is anchored to.
    #[must_use]
    pub fn anchor_date(&self) -> NaiveDate {
        self.start_date.unwrap_or(self.assigned_date)
    }

    /// Whether the descendant exercise instances accept no further mutation.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Completed | AssignmentStatus::Cancelled
        )
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AssignmentID(Uuid);

impl AssignmentID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for AssignmentID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for AssignmentID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssignmentStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Legal transitions: active↔paused, active→completed,
    /// active→cancelled, paused→cancelled.
    #[must_use]
    pub fn may_become(self, new: AssignmentStatus) -> bool {
        matches!(
            (self, new),
            (AssignmentStatus::Active, AssignmentStatus::Paused)
                | (AssignmentStatus::Paused, AssignmentStatus::Active)
                | (AssignmentStatus::Active, AssignmentStatus::Completed)
                | (AssignmentStatus::Active, AssignmentStatus::Cancelled)
                | (AssignmentStatus::Paused, AssignmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AssignmentStatus::Active => "active",
                AssignmentStatus::Paused => "paused",
                AssignmentStatus::Completed => "completed",
                AssignmentStatus::Cancelled => "cancelled",
            }
        )
    }
}

impl TryFrom<&str> for AssignmentStatus {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(AssignmentStatus::Active),
            "paused" => Ok(AssignmentStatus::Paused),
            "completed" => Ok(AssignmentStatus::Completed),
            "cancelled" => Ok(AssignmentStatus::Cancelled),
            _ => Err(ValidationError::UnknownStatus(value.to_string())),
        }
    }
}
