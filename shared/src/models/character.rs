use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A character extracted from an imported card file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCharacter {
    pub name: String,
    /// Persona text, later used as part of the system prompt
    pub description: String,
    /// Data-URL of the uploaded image, or a placeholder URL for JSON cards
    pub avatar: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(character: ParsedCharacter) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: character.name,
            description: character.description,
            avatar: character.avatar,
            created_at: Utc::now(),
        }
    }
}
