//! Configuration sources
//!
//! Every structural fact in a model is tagged with the source that asked for
//! it. Sources form a total order, `Convention < DataAnnotation < Explicit`,
//! and a request only replaces an existing fact when its source is at least
//! as strong as the one already recorded.

use serde::{Deserialize, Serialize};

// ============================================================================
// ConfigurationSource
// ============================================================================

/// Provenance tag attached to every builder request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationSource {
    /// Inferred by a convention
    #[default]
    Convention,
    /// Read from an attribute or annotation
    DataAnnotation,
    /// Requested through the fluent API
    Explicit,
}

impl ConfigurationSource {
    /// Whether a request at `self` may replace a fact recorded at `existing`.
    ///
    /// A missing source never blocks.
    pub fn overrides(self, existing: Option<ConfigurationSource>) -> bool {
        existing.is_none_or(|existing| self >= existing)
    }

    /// Whether a request at `self` may replace a fact recorded at `existing`
    /// when ties must lose.
    pub fn strictly_overrides(self, existing: Option<ConfigurationSource>) -> bool {
        existing.is_none_or(|existing| self > existing)
    }

    /// Whether a request at `self` may use a name that was ignored at `ignored`.
    ///
    /// An ignore blocks requests at the same or a lower source; explicit
    /// requests always get through.
    pub fn overrides_ignore(self, ignored: ConfigurationSource) -> bool {
        self == ConfigurationSource::Explicit || self > ignored
    }

    /// The stronger of `self` and an optional existing source
    pub fn merge(self, existing: Option<ConfigurationSource>) -> ConfigurationSource {
        match existing {
            Some(existing) if existing > self => existing,
            _ => self,
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ConfigurationSource::Convention => "Convention",
            ConfigurationSource::DataAnnotation => "DataAnnotation",
            ConfigurationSource::Explicit => "Explicit",
        }
    }

    /// Get all sources, weakest first
    pub fn all() -> &'static [ConfigurationSource] {
        &[
            ConfigurationSource::Convention,
            ConfigurationSource::DataAnnotation,
            ConfigurationSource::Explicit,
        ]
    }
}

impl std::fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Sourced facets
// ============================================================================

/// A configured value together with the source that configured it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigurationSource,
}

impl<T> Sourced<T> {
    /// Create a new sourced value
    pub fn new(value: T, source: ConfigurationSource) -> Self {
        Self { value, source }
    }
}

/// Source-gated access to an optional facet such as `IsUnique` or `MaxLength`.
///
/// Setting the value it already holds only raises the recorded source.
/// Setting a different value needs a source at least as strong as the
/// recorded one.
pub trait Configurable<T> {
    /// The configured value, if any
    fn configured_value(&self) -> Option<&T>;

    /// The source of the configured value, if any
    fn configured_source(&self) -> Option<ConfigurationSource>;

    /// Whether `value` could be set at `source`
    fn can_configure(&self, value: &T, source: ConfigurationSource) -> bool;

    /// Set `value` at `source`; returns false when rejected
    fn configure(&mut self, value: T, source: ConfigurationSource) -> bool;

    /// Clear the facet when `source` is strong enough; returns false when rejected
    fn reset(&mut self, source: ConfigurationSource) -> bool;
}

impl<T: PartialEq> Configurable<T> for Option<Sourced<T>> {
    fn configured_value(&self) -> Option<&T> {
        self.as_ref().map(|facet| &facet.value)
    }

    fn configured_source(&self) -> Option<ConfigurationSource> {
        self.as_ref().map(|facet| facet.source)
    }

    fn can_configure(&self, value: &T, source: ConfigurationSource) -> bool {
        match self {
            Some(existing) => existing.value == *value || source >= existing.source,
            None => true,
        }
    }

    fn configure(&mut self, value: T, source: ConfigurationSource) -> bool {
        match self {
            Some(existing) if existing.value == value => {
                existing.source = source.merge(Some(existing.source));
                true
            }
            Some(existing) if source < existing.source => false,
            _ => {
                *self = Some(Sourced::new(value, source));
                true
            }
        }
    }

    fn reset(&mut self, source: ConfigurationSource) -> bool {
        if source.overrides(self.configured_source()) {
            *self = None;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigurationSource::*;

    #[test]
    fn test_source_ordering() {
        assert!(Convention < DataAnnotation);
        assert!(DataAnnotation < Explicit);
        assert_eq!(ConfigurationSource::default(), Convention);
        assert_eq!(ConfigurationSource::all().len(), 3);
    }

    #[test]
    fn test_overrides() {
        assert!(Convention.overrides(None));
        assert!(Convention.overrides(Some(Convention)));
        assert!(!Convention.overrides(Some(DataAnnotation)));
        assert!(Explicit.overrides(Some(Explicit)));
        assert!(!DataAnnotation.strictly_overrides(Some(DataAnnotation)));
        assert!(Explicit.strictly_overrides(Some(DataAnnotation)));
    }

    #[test]
    fn test_overrides_ignore() {
        assert!(!Convention.overrides_ignore(Convention));
        assert!(DataAnnotation.overrides_ignore(Convention));
        assert!(!DataAnnotation.overrides_ignore(DataAnnotation));
        assert!(!DataAnnotation.overrides_ignore(Explicit));
        assert!(Explicit.overrides_ignore(Explicit));
    }

    #[test]
    fn test_merge_keeps_stronger() {
        assert_eq!(Convention.merge(Some(Explicit)), Explicit);
        assert_eq!(Explicit.merge(Some(Convention)), Explicit);
        assert_eq!(DataAnnotation.merge(None), DataAnnotation);
    }

    #[test]
    fn test_facet_same_value_promotes_source() {
        let mut facet: Option<Sourced<bool>> = None;
        assert!(facet.configure(true, Convention));
        assert!(facet.configure(true, DataAnnotation));
        assert_eq!(facet.configured_source(), Some(DataAnnotation));

        // Re-stating the value at a weaker source keeps the stronger one.
        assert!(facet.configure(true, Convention));
        assert_eq!(facet.configured_source(), Some(DataAnnotation));
    }

    #[test]
    fn test_facet_rejects_weaker_change() {
        let mut facet = Some(Sourced::new(8usize, DataAnnotation));
        assert!(!facet.can_configure(&16, Convention));
        assert!(!facet.configure(16, Convention));
        assert_eq!(facet.configured_value(), Some(&8));

        assert!(facet.configure(16, DataAnnotation));
        assert_eq!(facet.configured_value(), Some(&16));
    }

    #[test]
    fn test_facet_reset() {
        let mut facet = Some(Sourced::new(false, Explicit));
        assert!(!facet.reset(DataAnnotation));
        assert!(facet.reset(Explicit));
        assert!(facet.is_none());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(DataAnnotation.to_string(), "DataAnnotation");
        let json = serde_json::to_string(&DataAnnotation).unwrap();
        assert_eq!(json, "\"data_annotation\"");
    }
}
