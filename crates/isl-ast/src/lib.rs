//! AST model for ISL domain specifications.
//!
//! The parser lives outside this workspace; it hands over a JSON document
//! shaped like the types in [`ast`]. [`load_domain`] performs the caller-side
//! validity check before a domain is handed to the analyzer.

pub mod ast;
pub mod error;

pub use ast::*;
pub use error::AstError;

use serde_json::Value;

/// Array members every well-formed domain must carry, possibly empty.
const REQUIRED_ARRAYS: [&str; 5] = ["imports", "types", "entities", "behaviors", "invariants"];

/// Parse a domain from JSON, rejecting malformed input
pub fn load_domain(json: &str) -> Result<Domain, AstError> {
    let value: Value = serde_json::from_str(json)?;
    validate_domain_shape(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Load a domain from a JSON file
pub fn load_domain_from_file(path: &std::path::Path) -> Result<Domain, AstError> {
    let content = std::fs::read_to_string(path).map_err(|source| AstError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_domain(&content)
}

/// Check the top-level shape of a serialized domain.
///
/// Only the root is inspected; nested nodes are checked by deserialization.
pub fn validate_domain_shape(value: &Value) -> Result<(), AstError> {
    let Some(object) = value.as_object() else {
        return Err(AstError::Malformed("expected a JSON object".to_string()));
    };

    match object.get("kind").and_then(Value::as_str) {
        Some("Domain") => {}
        Some(other) => {
            return Err(AstError::Malformed(format!(
                "expected kind 'Domain', found '{other}'"
            )))
        }
        None => return Err(AstError::Malformed("missing 'kind'".to_string())),
    }

    for key in ["name", "version"] {
        if !object.get(key).is_some_and(Value::is_string) {
            return Err(AstError::Malformed(format!("missing or non-string '{key}'")));
        }
    }

    for key in REQUIRED_ARRAYS {
        if !object.get(key).is_some_and(Value::is_array) {
            return Err(AstError::Malformed(format!("missing array '{key}'")));
        }
    }

    Ok(())
}

impl Domain {
    /// See [`load_domain`]
    pub fn from_json(json: &str) -> Result<Self, AstError> {
        load_domain(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "kind": "Domain",
        "name": "Auth",
        "version": "1.0.0",
        "imports": [],
        "types": [],
        "entities": [
            { "name": { "name": "User" }, "fields": [
                { "name": { "name": "id" }, "type": { "kind": "Named", "name": "UUID" } }
            ] }
        ],
        "behaviors": [],
        "invariants": []
    }"#;

    #[test]
    fn test_load_minimal_domain() {
        let domain = load_domain(MINIMAL).expect("should load");
        assert_eq!(domain.name, "Auth");
        assert_eq!(domain.entities.len(), 1);
        assert_eq!(domain.entities[0].fields[0].ty.name(), "UUID");
    }

    #[test]
    fn test_missing_array_rejected() {
        let json = r#"{"kind":"Domain","name":"Auth","version":"1","imports":[],"types":[],"behaviors":[],"invariants":[]}"#;
        let err = load_domain(json).expect_err("missing entities");
        assert!(err.to_string().contains("entities"), "{err}");
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let json = r#"{"kind":"Entity","name":"Auth","version":"1","imports":[],"types":[],"entities":[],"behaviors":[],"invariants":[]}"#;
        let err = load_domain(json).expect_err("wrong kind");
        assert!(matches!(err, AstError::Malformed(_)));
        assert!(err.to_string().contains("Entity"));
    }

    #[test]
    fn test_missing_version_rejected() {
        let json = r#"{"kind":"Domain","name":"Auth","imports":[],"types":[],"entities":[],"behaviors":[],"invariants":[]}"#;
        let err = load_domain(json).expect_err("missing version");
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load_domain("{not json"), Err(AstError::Json(_))));
    }

    #[test]
    fn test_round_trip_through_builder() {
        let domain = Domain::new("Auth", "1.0.0").with_entity(Entity::new("User").field("id", "UUID"));
        let json = serde_json::to_string(&domain).expect("serialize");
        let loaded = Domain::from_json(&json).expect("reload");
        assert_eq!(loaded.entities[0].name.name, "User");
    }
}
