use super::CardError;
use serde_json::Value;
use shared::models::ParsedCharacter;

/// Avatar used for JSON cards, which carry no image of their own.
pub const DEFAULT_AVATAR: &str = "https://placehold.co/256x256/png?text=%3F";
pub const UNKNOWN_NAME: &str = "Unknown";

/// Text fields of a character card after alias and nesting resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterFields {
    pub name: String,
    pub description: String,
}

impl CharacterFields {
    /// Resolve card fields in precedence order:
    /// - fields are read from `data` when it is an object, else from the root
    /// - `name`, else `"Unknown"`
    /// - `description`, else `persona`, else `""`
    ///
    /// Empty strings and non-string values count as missing.
    pub fn from_value(value: &Value) -> Self {
        let fields = match value.get("data") {
            Some(data @ Value::Object(_)) => data,
            _ => value,
        };

        let name = non_empty_str(fields, "name").unwrap_or(UNKNOWN_NAME);
        let description = non_empty_str(fields, "description")
            .or_else(|| non_empty_str(fields, "persona"))
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    pub fn into_character(self, avatar: String) -> ParsedCharacter {
        ParsedCharacter {
            name: self.name,
            description: self.description,
            avatar,
        }
    }
}

fn non_empty_str<'a>(fields: &'a Value, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub fn parse_json_card(text: &str) -> Result<ParsedCharacter, CardError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(CharacterFields::from_value(&value).into_character(DEFAULT_AVATAR.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_fields_round_trip() {
        let text = json!({"name": "Rin", "description": "Quiet librarian"}).to_string();
        let character = parse_json_card(&text).unwrap();
        assert_eq!(character.name, "Rin");
        assert_eq!(character.description, "Quiet librarian");
        assert_eq!(character.avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn persona_backs_up_description() {
        let character = parse_json_card(r#"{"name":"Rin","persona":"Loves rain"}"#).unwrap();
        assert_eq!(character.description, "Loves rain");

        let character =
            parse_json_card(r#"{"name":"Rin","description":"","persona":"Loves rain"}"#).unwrap();
        assert_eq!(character.description, "Loves rain");
    }

    #[test]
    fn description_wins_over_persona() {
        let character =
            parse_json_card(r#"{"description":"Librarian","persona":"Loves rain"}"#).unwrap();
        assert_eq!(character.description, "Librarian");
    }

    #[test]
    fn missing_name_defaults_to_unknown() {
        let character = parse_json_card(r#"{"description":"Someone"}"#).unwrap();
        assert_eq!(character.name, UNKNOWN_NAME);

        let character = parse_json_card(r#"{"data":{"persona":"Someone"}}"#).unwrap();
        assert_eq!(character.name, UNKNOWN_NAME);
        assert_eq!(character.description, "Someone");
    }

    #[test]
    fn missing_description_is_empty() {
        let character = parse_json_card(r#"{"name":"Rin"}"#).unwrap();
        assert_eq!(character.description, "");
    }

    #[test]
    fn nested_data_is_preferred_over_root() {
        let text = json!({
            "name": "Root",
            "description": "root text",
            "data": {"name": "Nested", "description": "nested text"}
        })
        .to_string();
        let character = parse_json_card(&text).unwrap();
        assert_eq!(character.name, "Nested");
        assert_eq!(character.description, "nested text");
    }

    #[test]
    fn non_object_data_falls_back_to_root() {
        let character = parse_json_card(r#"{"name":"Rin","data":"v2"}"#).unwrap();
        assert_eq!(character.name, "Rin");
    }

    #[test]
    fn non_object_documents_use_defaults() {
        let character = parse_json_card("[1, 2, 3]").unwrap();
        assert_eq!(character.name, UNKNOWN_NAME);
        assert_eq!(character.description, "");
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            parse_json_card("not json at all"),
            Err(CardError::MalformedJson(_))
        ));
    }
}
