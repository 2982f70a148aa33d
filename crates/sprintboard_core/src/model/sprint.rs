use crate::error::AppError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Sprint {
    pub fn reference(&self) -> SprintRef {
        SprintRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// The `{id, name}` pair attached to task records for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSprint {
    pub name: String,
}

impl NewSprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validated(&self) -> Result<NewSprint, AppError> {
        Ok(NewSprint {
            name: validate_name(&self.name)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SprintPatch {
    pub name: Option<String>,
}

impl SprintPatch {
    pub fn validated(&self) -> Result<SprintPatch, AppError> {
        match self.name.as_deref() {
            Some(name) => Ok(SprintPatch {
                name: Some(validate_name(name)?),
            }),
            None => Err(AppError::validation("no fields to update")),
        }
    }

    pub fn apply_to(&self, sprint: &mut Sprint) {
        if let Some(name) = &self.name {
            sprint.name = name.clone();
        }
    }
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("sprint name is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{NewSprint, SprintPatch};

    #[test]
    fn sprint_name_is_required() {
        assert!(NewSprint::new(" ").validated().is_err());
        assert_eq!(NewSprint::new(" Sprint 4 ").validated().unwrap().name, "Sprint 4");
    }

    #[test]
    fn sprint_patch_needs_a_name() {
        let err = SprintPatch::default().validated().unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }
}
