//! Domain DTOs for the todo API.
//!
//! # Design
//! These types mirror the server schema but are defined independently of the
//! mock-server crate; integration tests catch any drift. Nullable fields are
//! always serialized (as `null`) so the wire shape stays fixed. `due_date`
//! travels as the server's opaque string; [`Todo::due_on`] reads it as a date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub completed: bool,
    #[serde(default)]
    pub image_key: Option<String>,
}

/// Request payload for creating a new todo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
}

impl Todo {
    /// Calendar date of `due_date`, if it starts with `YYYY-MM-DD`.
    ///
    /// Blank values and anything unparseable yield `None`; a datetime yields
    /// its date part.
    pub fn due_on(&self) -> Option<NaiveDate> {
        let text = self.due_date.as_deref()?.trim();
        let date = text.get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

impl TodoCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Trims the title and optional text fields, dropping blank ones.
    ///
    /// Fails with [`ApiError::Validation`] when the trimmed title is empty.
    pub fn normalized(self) -> Result<Self, ApiError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        Ok(Self {
            title,
            description: non_blank(self.description),
            due_date: non_blank(self.due_date),
            image_key: non_blank(self.image_key),
        })
    }
}

/// Response of `POST /api/files/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub key: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
