use derive_more::{Deref, Display, Into};
use uuid::Uuid;

use crate::{ExerciseID, Name, ReadError, TrainerID};

#[allow(async_fn_in_trait)]
pub trait ProgramService {
    async fn get_programs(&self) -> Result<Vec<Program>, ReadError>;
    async fn get_program(&self, id: ProgramID) -> Result<Program, ReadError>;
}

#[allow(async_fn_in_trait)]
pub trait ProgramRepository {
    async fn read_programs(&self) -> Result<Vec<Program>, ReadError>;
    async fn read_program(&self, id: ProgramID) -> Result<Program, ReadError>;
}

/// Reusable workout template authored by a trainer.
///
/// Day order is the vector order. The day number of a workout day is its
/// index plus one, so day numbers are contiguous by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub id: ProgramID,
    pub trainer_id: TrainerID,
    pub name: Name,
    pub description: Option<String>,
    pub days: Vec<WorkoutDay>,
}

impl Program {
    /// Number of exercise prescriptions across all days.
    #[must_use]
    pub fn num_exercises(&self) -> usize {
        self.days.iter().map(|d| d.exercises.len()).sum()
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgramID(Uuid);

impl ProgramID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ProgramID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ProgramID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDay {
    pub name: Name,
    pub exercises: Vec<ExercisePrescription>,
}

/// A single exercise within a workout day.
///
/// `reps` and `weight` are deliberately free-form ("8-12", "bodyweight",
/// "60 kg"). Prescriptions vary too much for strict typing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExercisePrescription {
    pub exercise_id: ExerciseID,
    pub sets: Sets,
    pub reps: String,
    pub weight: String,
    pub rest_seconds: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sets(u32);

impl Sets {
    pub fn new(value: u32) -> Result<Self, SetsError> {
        if !(1..1000).contains(&value) {
            return Err(SetsError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Sets {
    type Error = SetsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.parse::<u32>() {
            Ok(parsed_value) => Sets::new(parsed_value),
            Err(_) => Err(SetsError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SetsError {
    #[error("Sets must be in the range 1 to 999")]
    OutOfRange,
    #[error("Sets must be an integer")]
    ParseError,
}
