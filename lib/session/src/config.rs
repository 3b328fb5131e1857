//! Session configuration.

use serde::{Deserialize, Serialize};

/// Onboarding settings.
///
/// When onboarding is disabled every session counts as onboarded,
/// whatever the stored flag says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Whether the application has an onboarding step.
    #[serde(default)]
    pub enabled: bool,
}

impl OnboardingConfig {
    /// Onboarding enabled.
    #[must_use]
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Resolves the effective onboarding status from the stored flag.
    #[must_use]
    pub fn effective(&self, stored: bool) -> bool {
        stored || !self.enabled
    }
}
