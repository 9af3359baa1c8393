//! Client entity model

use crate::entities::blank_as_none;
use crate::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A customer company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    /// Tax id (CNPJ/CPF)
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Client, "clients", "client");

/// Create and update payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientInput {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 32))]
    pub document: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 50))]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl Client {
    pub fn new(input: ClientInput, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        let mut client = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            document: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            notes: None,
            created_by,
            created_at: now,
            updated_at: now,
        };
        client.apply(input);
        client
    }

    /// Replace the editable fields
    pub fn apply(&mut self, input: ClientInput) {
        self.name = input.name.trim().to_string();
        self.document = non_empty(input.document);
        self.email = non_empty(input.email);
        self.phone = non_empty(input.phone);
        self.address = non_empty(input.address);
        self.city = non_empty(input.city);
        self.state = non_empty(input.state);
        self.notes = non_empty(input.notes);
    }
}

/// Blank strings from form fields are stored as null
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
