//! Input validation for identity entities

/// Maximum length of a role identifier or user name
pub const NAME_MAX: usize = 256;

/// Maximum length of a single permission string
pub const PERMISSION_MAX: usize = 256;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    Field { field: String, message: String },
}

impl ValidationError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validator for role identifiers and user names
///
/// Identifiers are case-sensitive and compared verbatim, so leading or
/// trailing whitespace is rejected rather than silently stripped.
pub struct NameValidator {
    field: &'static str,
}

impl NameValidator {
    #[must_use]
    pub const fn new(field: &'static str) -> Self {
        Self { field }
    }

    pub fn validate(&self, value: &str) -> ValidationResult<()> {
        if value.trim().is_empty() {
            return Err(ValidationError::field(self.field, "must not be empty"));
        }

        if value.chars().count() > NAME_MAX {
            return Err(ValidationError::field(
                self.field,
                format!("must be at most {NAME_MAX} characters"),
            ));
        }

        if value.trim() != value {
            return Err(ValidationError::field(
                self.field,
                "must not start or end with whitespace",
            ));
        }

        if value.chars().any(char::is_control) {
            return Err(ValidationError::field(
                self.field,
                "must not contain control characters",
            ));
        }

        Ok(())
    }
}

/// Validate a permission list. An empty list is allowed (a role with no grants).
pub fn validate_permissions(permissions: &[String]) -> ValidationResult<()> {
    for permission in permissions {
        if permission.trim().is_empty() {
            return Err(ValidationError::field("permission", "must not be blank"));
        }
        if permission.len() > PERMISSION_MAX {
            return Err(ValidationError::field(
                "permission",
                format!("must be at most {PERMISSION_MAX} characters"),
            ));
        }
        if permission.chars().any(char::is_control) {
            return Err(ValidationError::field(
                "permission",
                "must not contain control characters",
            ));
        }
    }
    Ok(())
}

/// Validate a credential before hashing. Strength and length rules belong
/// to the interactive sign-up path, not to seeded accounts.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::field("password", "must not be empty"));
    }
    Ok(())
}
