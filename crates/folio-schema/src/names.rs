//! Type and property id validation.
//!
//! Valid ids:
//! - Must be non-empty
//! - Must not contain whitespace, `,`, `'`, `"`, `\`, or `/`
//! - Must not start or end with `:`
//! - Custom type ids must not use the reserved `cmis:` namespace

use crate::error::{SchemaError, SchemaResult};

/// Characters that are forbidden anywhere in an id.
const FORBIDDEN_CHARS: &[char] = &[',', '\'', '"', '\\', '/'];

/// Namespace owned by the base types and the standard catalog.
const RESERVED_PREFIX: &str = "cmis:";

fn check_common(kind: &str, id: &str, owner: &str) -> SchemaResult<()> {
    if id.is_empty() {
        return Err(SchemaError::invalid(owner, format!("{kind} id must not be empty")));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(SchemaError::invalid(
            owner,
            format!("{kind} id {id:?} contains whitespace"),
        ));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| id.contains(**ch)) {
        return Err(SchemaError::invalid(
            owner,
            format!("{kind} id {id:?} contains forbidden character {ch:?}"),
        ));
    }
    if id.starts_with(':') || id.ends_with(':') {
        return Err(SchemaError::invalid(
            owner,
            format!("{kind} id {id:?} must not start or end with ':'"),
        ));
    }
    Ok(())
}

/// Validate the id of a custom type.
///
/// ```
/// use folio_schema::names::validate_type_id;
///
/// assert!(validate_type_id("acme:invoice").is_ok());
/// assert!(validate_type_id("").is_err());
/// assert!(validate_type_id("cmis:document").is_err());
/// ```
pub fn validate_type_id(id: &str) -> SchemaResult<()> {
    check_common("type", id, id)?;
    if id.starts_with(RESERVED_PREFIX) {
        return Err(SchemaError::invalid(
            id,
            format!("the {RESERVED_PREFIX} namespace is reserved"),
        ));
    }
    Ok(())
}

/// Validate a property id declared by type `owner`.
pub fn validate_property_id(owner: &str, id: &str) -> SchemaResult<()> {
    check_common("property", id, owner)
}
