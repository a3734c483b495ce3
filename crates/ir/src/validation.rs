//! Validation rules for a finished model
//!
//! The builders keep the graph internally consistent while it is being
//! configured. These rules check what a consumer of the model needs on
//! top of that: every hierarchy has a key, foreign keys line up with their
//! principal keys, and navigation names are usable.

use crate::arena::EntityTypeId;
use crate::model::Model;
use keystone_core::{DeleteBehavior, MetadataError, MetadataResult, Validatable};

// ============================================================================
// ValidationResult
// ============================================================================

/// Result of a validation operation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub valid: bool,

    /// List of errors (empty if valid)
    pub errors: Vec<ValidationError>,

    /// List of warnings (non-fatal issues)
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Fails with every error message joined when any error was found
    pub fn to_result(self) -> MetadataResult<()> {
        if self.valid {
            Ok(())
        } else {
            let msg = self
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Err(MetadataError::validation(msg))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

// ============================================================================
// ValidationError
// ============================================================================

/// A validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Path to the offending element (e.g. "Order.foreign_keys.CustomerId")
    pub path: Option<String>,

    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            suggestion: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] {}", path, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Error codes for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    // Keys
    NoPrimaryKey,

    // Foreign keys
    MissingPrincipalKey,
    PrincipalKeyOutsideHierarchy,
    ForeignKeyCountMismatch,
    ForeignKeyTypeMismatch,
    SetNullOnRequired,

    // Navigations
    NavigationPropertyConflict,
    DuplicateNavigationName,

    Custom,
}

// ============================================================================
// ValidationWarning
// ============================================================================

/// A validation warning (non-fatal issue)
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub code: ValidationWarningCode,
    pub message: String,
    pub path: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: ValidationWarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] Warning: {}", path, self.message)
        } else {
            write!(f, "Warning: {}", self.message)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationWarningCode {
    ShadowPrincipalKey,
    Custom,
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// A single check over a finished model
pub trait ValidationRule {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn validate(&self, model: &Model) -> ValidationResult;
}

// ============================================================================
// Validator
// ============================================================================

/// Runs a list of rules and merges their results
#[derive(Default)]
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a validator with the built-in rules
    pub fn with_default_rules() -> Self {
        let mut validator = Self::new();
        validator.add_rule(Box::new(PrimaryKeyRule));
        validator.add_rule(Box::new(ForeignKeyShapeRule));
        validator.add_rule(Box::new(NavigationNameRule));
        validator.add_rule(Box::new(DeleteBehaviorRule));
        validator.add_rule(Box::new(ShadowKeyRule));
        validator
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for rule in &self.rules {
            result.merge(rule.validate(model));
        }

        result
    }

    pub fn validate_result(&self, model: &Model) -> MetadataResult<()> {
        self.validate(model).to_result()
    }
}

impl Validatable for Model {
    fn validate(&self) -> MetadataResult<()> {
        Validator::with_default_rules().validate_result(self)
    }

    fn validation_errors(&self) -> Vec<String> {
        Validator::with_default_rules()
            .validate(self)
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect()
    }
}

// ============================================================================
// Built-in Validation Rules
// ============================================================================

/// Rule: every hierarchy root has a primary key
pub struct PrimaryKeyRule;

impl ValidationRule for PrimaryKeyRule {
    fn name(&self) -> &'static str {
        "primary_key"
    }

    fn description(&self) -> &'static str {
        "Validates that every root entity type has a primary key"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (id, entity) in model.entity_types() {
            if entity.base_type().is_some() || model.primary_key(id).is_some() {
                continue;
            }
            result.add_error(
                ValidationError::new(
                    ValidationErrorCode::NoPrimaryKey,
                    format!("Entity type '{}' has no primary key", entity.name()),
                )
                .with_path(entity.name())
                .with_suggestion("Configure a primary key on the root of the hierarchy"),
            );
        }

        result
    }
}

/// Rule: foreign key properties line up with the principal key
pub struct ForeignKeyShapeRule;

impl ValidationRule for ForeignKeyShapeRule {
    fn name(&self) -> &'static str {
        "foreign_key_shape"
    }

    fn description(&self) -> &'static str {
        "Validates that foreign keys match their principal keys in count and type"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (_, entity) in model.entity_types() {
            for fk_id in entity.declared_foreign_keys() {
                let Some(fk) = model.foreign_key(*fk_id) else {
                    continue;
                };
                let path = format!(
                    "{}.foreign_keys.{}",
                    entity.name(),
                    model.property_names(fk.properties()).join(",")
                );
                let principal = model.entity_type_name(fk.principal_entity_type());

                let Some(key) = model.key(fk.principal_key()) else {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::MissingPrincipalKey,
                            format!("Principal key on '{}' no longer exists", principal),
                        )
                        .with_path(path),
                    );
                    continue;
                };

                if !model.is_same_or_derived(fk.principal_entity_type(), key.declaring_entity_type()) {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::PrincipalKeyOutsideHierarchy,
                            format!(
                                "Principal key is declared on '{}', outside the hierarchy of '{}'",
                                model.entity_type_name(key.declaring_entity_type()),
                                principal
                            ),
                        )
                        .with_path(path),
                    );
                    continue;
                }

                if fk.properties().len() != key.properties().len() {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::ForeignKeyCountMismatch,
                            format!(
                                "{} foreign key properties for a principal key of {} on '{}'",
                                fk.properties().len(),
                                key.properties().len(),
                                principal
                            ),
                        )
                        .with_path(path),
                    );
                } else if !model.are_compatible(fk.properties(), fk.principal_key()) {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::ForeignKeyTypeMismatch,
                            format!(
                                "Foreign key types do not match the principal key ({}) on '{}'",
                                model.property_names(key.properties()).join(", "),
                                principal
                            ),
                        )
                        .with_path(path)
                        .with_suggestion("Use the principal key types or their nullable forms"),
                    );
                }
            }
        }

        result
    }
}

/// Rule: navigation names are unique in the hierarchy and do not shadow
/// properties
pub struct NavigationNameRule;

impl ValidationRule for NavigationNameRule {
    fn name(&self) -> &'static str {
        "navigation_names"
    }

    fn description(&self) -> &'static str {
        "Validates that navigation names collide with neither properties nor other navigations"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (id, entity) in model.entity_types() {
            for nav_id in entity.declared_navigations() {
                let Some(navigation) = model.navigation(*nav_id) else {
                    continue;
                };
                let name = navigation.name();
                let path = format!("{}.navigations.{}", entity.name(), name);

                if model.find_property(id, name).is_some() {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::NavigationPropertyConflict,
                            format!("Navigation '{}' has the same name as a property", name),
                        )
                        .with_path(path.clone()),
                    );
                }

                if let Some(owner) = inherited_navigation_owner(model, id, name) {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::DuplicateNavigationName,
                            format!(
                                "Navigation '{}' is already declared on base type '{}'",
                                name,
                                model.entity_type_name(owner)
                            ),
                        )
                        .with_path(path),
                    );
                }
            }
        }

        result
    }
}

fn inherited_navigation_owner(model: &Model, entity: EntityTypeId, name: &str) -> Option<EntityTypeId> {
    model
        .ancestors(entity)
        .into_iter()
        .find(|ancestor| model.find_declared_navigation(*ancestor, name).is_some())
}

/// Rule: `SetNull` needs a foreign key that can hold null
pub struct DeleteBehaviorRule;

impl ValidationRule for DeleteBehaviorRule {
    fn name(&self) -> &'static str {
        "delete_behavior"
    }

    fn description(&self) -> &'static str {
        "Validates that SetNull is only used on optional relationships"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (_, entity) in model.entity_types() {
            for fk_id in entity.declared_foreign_keys() {
                let Some(fk) = model.foreign_key(*fk_id) else {
                    continue;
                };
                if fk.delete_behavior() != DeleteBehavior::SetNull || !model.is_required(*fk_id) {
                    continue;
                }
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::SetNullOnRequired,
                        format!(
                            "Required relationship to '{}' cannot use SetNull",
                            model.entity_type_name(fk.principal_entity_type())
                        ),
                    )
                    .with_path(format!(
                        "{}.foreign_keys.{}",
                        entity.name(),
                        model.property_names(fk.properties()).join(",")
                    ))
                    .with_suggestion("Make the relationship optional or use Cascade or Restrict"),
                );
            }
        }

        result
    }
}

/// Rule: warn about principal keys made only of shadow properties
pub struct ShadowKeyRule;

impl ValidationRule for ShadowKeyRule {
    fn name(&self) -> &'static str {
        "shadow_keys"
    }

    fn description(&self) -> &'static str {
        "Warns about principal keys that exist only in the model"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (_, entity) in model.entity_types() {
            for key_id in entity.declared_keys() {
                let Some(key) = model.key(*key_id) else {
                    continue;
                };
                let all_shadow = key
                    .properties()
                    .iter()
                    .all(|p| model.property(*p).is_some_and(|p| p.is_shadow()));
                if !all_shadow || model.referencing_foreign_keys(*key_id).is_empty() {
                    continue;
                }
                let names = model.property_names(key.properties()).join(", ");
                result.add_warning(
                    ValidationWarning::new(
                        ValidationWarningCode::ShadowPrincipalKey,
                        format!("Principal key ({}) has no CLR properties", names),
                    )
                    .with_path(format!("{}.keys.{}", entity.name(), names)),
                );
            }
        }

        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign_key::ForeignKey;
    use crate::fixtures::{model_builder, CUSTOMER, ORDER, SPECIAL_ORDER};
    use keystone_core::ClrType;
    use keystone_core::ConfigurationSource::*;
    use pretty_assertions::assert_eq;

    fn codes(result: &ValidationResult) -> Vec<ValidationErrorCode> {
        result.errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_validation_result_merge() {
        let mut result = ValidationResult::ok();
        assert!(result.valid);
        assert!(result.errors.is_empty());

        let mut warned = ValidationResult::ok();
        warned.add_warning(ValidationWarning::new(ValidationWarningCode::Custom, "just a warning"));
        result.merge(warned);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);

        let mut failed = ValidationResult::ok();
        failed.add_error(ValidationError::new(ValidationErrorCode::Custom, "broken"));
        result.merge(failed);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_to_result_joins_messages() {
        let mut result = ValidationResult::ok();
        result.add_error(ValidationError::new(ValidationErrorCode::Custom, "first").with_path("Order"));
        result.add_error(ValidationError::new(ValidationErrorCode::Custom, "second"));

        let err = result.to_result().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: [Order] first; second");
    }

    #[test]
    fn test_default_rules() {
        assert_eq!(
            Validator::with_default_rules().rule_names(),
            vec![
                "primary_key",
                "foreign_key_shape",
                "navigation_names",
                "delete_behavior",
                "shadow_keys"
            ]
        );
    }

    #[test]
    fn test_missing_primary_key() {
        let mut mb = model_builder();
        mb.entity(ORDER, Explicit).unwrap();
        mb.entity(SPECIAL_ORDER, Explicit)
            .unwrap()
            .has_base_type(Some(ORDER), Explicit)
            .unwrap()
            .unwrap();

        let result = PrimaryKeyRule.validate(mb.model());
        assert_eq!(codes(&result), vec![ValidationErrorCode::NoPrimaryKey]);
        assert_eq!(result.errors[0].path.as_deref(), Some(ORDER));
        assert!(mb.snapshot().is_err());
        assert!(!mb.model().is_valid());
    }

    #[test]
    fn test_valid_model_passes() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(order)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        mb.entity_type_builder(order)
            .unwrap()
            .has_foreign_key(customer, &["CustomerId"], Explicit)
            .unwrap()
            .unwrap();

        let result = Validator::with_default_rules().validate(mb.model());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert!(mb.model().validate().is_ok());
        assert!(mb.snapshot().is_ok());
    }

    #[test]
    fn test_shadow_principal_key_warns() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(order)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        mb.entity_type_builder(order)
            .unwrap()
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap();

        let result = ShadowKeyRule.validate(mb.model());
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, ValidationWarningCode::ShadowPrincipalKey);
        assert_eq!(result.warnings[0].path.as_deref(), Some("Customer.keys.TempId"));
    }

    #[test]
    fn test_set_null_on_required_relationship() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .has_foreign_key(customer, &["CustomerId"], Explicit)
            .unwrap()
            .unwrap()
            .delete_behavior(DeleteBehavior::SetNull, Explicit)
            .unwrap()
            .id();
        assert!(mb.model().is_required(fk));

        let result = DeleteBehaviorRule.validate(mb.model());
        assert_eq!(codes(&result), vec![ValidationErrorCode::SetNullOnRequired]);
        assert_eq!(
            result.errors[0].path.as_deref(),
            Some("Order.foreign_keys.CustomerId")
        );
    }

    #[test]
    fn test_foreign_key_shape_mismatch() {
        let mut model = Model::new();
        let customer = model.add_entity_type(CUSTOMER, true, Explicit);
        let id = model.add_property(customer, "Id", ClrType::Int32, false, Explicit);
        let name = model.add_property(customer, "Name", ClrType::String, false, Explicit);
        let key = model.add_key(customer, vec![id], Explicit);
        let composite = model.add_key(customer, vec![id, name], Explicit);

        let order = model.add_entity_type(ORDER, true, Explicit);
        let unique = model.add_property(order, "Unique", ClrType::Guid, false, Explicit);
        let customer_id = model.add_property(order, "CustomerId", ClrType::Int32, false, Explicit);
        model.add_foreign_key(ForeignKey::new(order, vec![unique], customer, key, Explicit));
        model.add_foreign_key(ForeignKey::new(order, vec![customer_id], customer, composite, Explicit));

        let result = ForeignKeyShapeRule.validate(&model);
        assert_eq!(
            codes(&result),
            vec![
                ValidationErrorCode::ForeignKeyTypeMismatch,
                ValidationErrorCode::ForeignKeyCountMismatch
            ]
        );
    }

    #[test]
    fn test_navigation_name_conflicts() {
        let mut model = Model::new();
        let customer = model.add_entity_type(CUSTOMER, true, Explicit);
        let id = model.add_property(customer, "Id", ClrType::Int32, false, Explicit);
        let key = model.add_key(customer, vec![id], Explicit);

        let order = model.add_entity_type(ORDER, true, Explicit);
        model.add_property(order, "Customer", ClrType::Int32, false, Explicit);
        let customer_id = model.add_property(order, "CustomerId", ClrType::Int32, false, Explicit);
        let fk = model.add_foreign_key(ForeignKey::new(order, vec![customer_id], customer, key, Explicit));
        model.add_navigation(order, "Customer", fk, true, false, Explicit);

        let special = model.add_entity_type(SPECIAL_ORDER, true, Explicit);
        if let Some(entity) = model.entity_type_mut(special) {
            entity.base_type = Some(order);
        }
        let other = model.add_foreign_key(ForeignKey::new(special, vec![customer_id], customer, key, Explicit));
        model.add_navigation(special, "Customer", other, true, false, Explicit);

        let result = NavigationNameRule.validate(&model);
        assert_eq!(
            codes(&result),
            vec![
                ValidationErrorCode::NavigationPropertyConflict,
                ValidationErrorCode::NavigationPropertyConflict,
                ValidationErrorCode::DuplicateNavigationName
            ]
        );
    }
}
