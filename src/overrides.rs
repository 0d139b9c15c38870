//! Per-deployment resource-type configuration overrides.
//!
//! The override bag holds per-resource-kind tuning knobs supplied by the
//! operator once per deployment invocation. It is validated eagerly at
//! construction, before any classification or apply work begins, and is
//! read-only thereafter; it is safely shared by reference across all
//! concurrently running apply actions.

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Optional per-resource-kind overrides for one deployment run.
#[derive(Debug, Clone, Default)]
pub struct HotswapOverrides {
    /// Healthy-percentage bounds for rolling service updates.
    rolling_update: Option<RollingUpdateOverride>,
}

/// Minimum/maximum healthy-instance percentages during a rolling update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingUpdateOverride {
    /// Lower bound; `0` preserves prior unconfigured behavior.
    minimum_healthy_percent: i64,
    /// Upper bound; absent means "use the platform default".
    maximum_healthy_percent: Option<i64>,
}

impl HotswapOverrides {
    /// Creates an empty override bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rolling_update: None,
        }
    }

    /// Sets the rolling-update healthy-percentage bounds.
    #[must_use]
    pub const fn with_rolling_update(mut self, rolling_update: RollingUpdateOverride) -> Self {
        self.rolling_update = Some(rolling_update);
        self
    }

    /// The rolling-update bounds, if configured.
    #[must_use]
    pub const fn rolling_update(&self) -> Option<&RollingUpdateOverride> {
        self.rolling_update.as_ref()
    }
}

impl RollingUpdateOverride {
    /// Creates validated rolling-update bounds.
    ///
    /// An omitted minimum defaults to `0`; an omitted maximum stays absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either supplied bound is negative, or if
    /// both are supplied and the minimum exceeds the maximum.
    pub fn new(minimum: Option<i64>, maximum: Option<i64>) -> Result<Self> {
        if let Some(value) = minimum
            && value < 0
        {
            return Err(ConfigError::negative_bound("minimum_healthy_percent", value).into());
        }
        if let Some(value) = maximum
            && value < 0
        {
            return Err(ConfigError::negative_bound("maximum_healthy_percent", value).into());
        }
        let minimum_healthy_percent = minimum.unwrap_or(0);
        if let Some(max) = maximum
            && minimum_healthy_percent > max
        {
            return Err(ConfigError::InvertedBounds {
                minimum: minimum_healthy_percent,
                maximum: max,
            }
            .into());
        }

        debug!(
            minimum = minimum_healthy_percent,
            maximum = ?maximum,
            "Validated rolling-update override"
        );

        Ok(Self {
            minimum_healthy_percent,
            maximum_healthy_percent: maximum,
        })
    }

    /// The effective minimum healthy percentage.
    #[must_use]
    pub const fn minimum_healthy_percent(&self) -> i64 {
        self.minimum_healthy_percent
    }

    /// The configured maximum healthy percentage, if any.
    #[must_use]
    pub const fn maximum_healthy_percent(&self) -> Option<i64> {
        self.maximum_healthy_percent
    }

    /// Returns true only when no override was effectively requested: the
    /// minimum is at its default `0` and the maximum is absent.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.minimum_healthy_percent == 0 && self.maximum_healthy_percent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwapstackError;

    #[test]
    fn negative_minimum_is_rejected_at_construction() {
        let result = RollingUpdateOverride::new(Some(-1), None);
        assert!(matches!(
            result,
            Err(SwapstackError::Config(ConfigError::NegativeBound { ref field, value: -1 }))
                if field == "minimum_healthy_percent"
        ));
    }

    #[test]
    fn negative_maximum_is_rejected_at_construction() {
        let result = RollingUpdateOverride::new(None, Some(-5));
        assert!(matches!(
            result,
            Err(SwapstackError::Config(ConfigError::NegativeBound { value: -5, .. }))
        ));
    }

    #[test]
    fn omitted_minimum_defaults_to_zero() {
        let bounds = RollingUpdateOverride::new(None, Some(150)).expect("valid bounds");
        assert_eq!(bounds.minimum_healthy_percent(), 0);
        assert_eq!(bounds.maximum_healthy_percent(), Some(150));
    }

    #[test]
    fn is_empty_only_for_effective_defaults() {
        assert!(RollingUpdateOverride::new(None, None)
            .expect("valid bounds")
            .is_empty());
        assert!(RollingUpdateOverride::new(Some(0), None)
            .expect("valid bounds")
            .is_empty());
        assert!(!RollingUpdateOverride::new(Some(50), None)
            .expect("valid bounds")
            .is_empty());
        assert!(!RollingUpdateOverride::new(None, Some(200))
            .expect("valid bounds")
            .is_empty());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let result = RollingUpdateOverride::new(Some(120), Some(80));
        assert!(matches!(
            result,
            Err(SwapstackError::Config(ConfigError::InvertedBounds { .. }))
        ));
    }

    #[test]
    fn bag_defaults_to_no_overrides() {
        let overrides = HotswapOverrides::new();
        assert!(overrides.rolling_update().is_none());

        let bounds = RollingUpdateOverride::new(Some(50), Some(200)).expect("valid bounds");
        let overrides = overrides.with_rolling_update(bounds);
        assert_eq!(
            overrides.rolling_update().map(RollingUpdateOverride::minimum_healthy_percent),
            Some(50)
        );
    }
}
