use derive_more::{AsRef, Display};

const MAX_LEN: usize = 64;

/// Display name of a program, workout day or catalog exercise.
#[derive(AsRef, Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    pub fn new(name: &str) -> Result<Self, NameError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }

        let len = trimmed.len();

        if len > MAX_LEN {
            return Err(NameError::TooLong(len));
        }

        Ok(Name(trimmed.to_string()))
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("Name must not be empty")]
    Empty,
    #[error("Name must be 64 characters or fewer ({0} > 64)")]
    TooLong(usize),
}
