//! Field-name validation.
//!
//! Commands and payload documents carry caller-supplied field names; each
//! command supplies a validator for its own fields and optionally a
//! different one for its payload items (update documents, for example, obey
//! different rules than insert documents). [`MappedFieldNameValidator`]
//! composes the two, routing by top-level field name.

use std::collections::HashMap;

use bson::Document;

use crate::error::EncodeError;

/// Validates the field names of caller-supplied documents.
pub trait FieldNameValidator {
    /// Whether the field name is acceptable.
    fn is_valid(&self, field_name: &str) -> bool;
}

/// A validator that accepts every field name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpFieldNameValidator;

impl FieldNameValidator for NoOpFieldNameValidator {
    fn is_valid(&self, _field_name: &str) -> bool {
        true
    }
}

/// A validator composed from a default validator plus per-field overrides.
///
/// Used by the legacy layout, where payload documents are embedded as an
/// array field of the command: the payload field routes to the payload
/// validator, everything else to the command validator.
pub struct MappedFieldNameValidator<'a> {
    default: &'a dyn FieldNameValidator,
    overrides: HashMap<String, &'a dyn FieldNameValidator>,
}

impl<'a> MappedFieldNameValidator<'a> {
    /// Create a mapped validator from a default and named overrides.
    pub fn new(
        default: &'a dyn FieldNameValidator,
        overrides: HashMap<String, &'a dyn FieldNameValidator>,
    ) -> Self {
        Self { default, overrides }
    }

    /// The validator scoped to the contents of the named field.
    pub fn validator_for(&self, field_name: &str) -> &'a dyn FieldNameValidator {
        self.overrides
            .get(field_name)
            .copied()
            .unwrap_or(self.default)
    }
}

impl FieldNameValidator for MappedFieldNameValidator<'_> {
    fn is_valid(&self, field_name: &str) -> bool {
        self.default.is_valid(field_name)
    }
}

/// Check every top-level field name of a document against a validator.
pub(crate) fn validate_document(
    document: &Document,
    validator: &dyn FieldNameValidator,
    scope: &str,
) -> Result<(), EncodeError> {
    for field_name in document.keys() {
        if !validator.is_valid(field_name) {
            return Err(EncodeError::InvalidFieldName {
                field_name: field_name.clone(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    struct RejectDollarPrefixed;

    impl FieldNameValidator for RejectDollarPrefixed {
        fn is_valid(&self, field_name: &str) -> bool {
            !field_name.starts_with('$')
        }
    }

    #[test]
    fn test_noop_accepts_everything() {
        let validator = NoOpFieldNameValidator;
        assert!(validator.is_valid("$set"));
        assert!(validator.is_valid("plain"));
    }

    #[test]
    fn test_validate_document_reports_offending_field() {
        let document = doc! { "ok": 1, "$bad": 2 };
        let err = validate_document(&document, &RejectDollarPrefixed, "command document")
            .unwrap_err();
        assert!(err.to_string().contains("$bad"));
    }

    #[test]
    fn test_mapped_validator_routes_by_field() {
        let command_validator = RejectDollarPrefixed;
        let payload_validator = NoOpFieldNameValidator;
        let mut overrides: HashMap<String, &dyn FieldNameValidator> = HashMap::new();
        overrides.insert("documents".to_string(), &payload_validator);

        let mapped = MappedFieldNameValidator::new(&command_validator, overrides);

        assert!(mapped.validator_for("documents").is_valid("$set"));
        assert!(!mapped.validator_for("filter").is_valid("$set"));
        assert!(!mapped.is_valid("$top"));
    }
}
