//! `WorkflowSettings`: the single JSON document keyed by a fixed, known set
//! of options. Unknown keys are rejected by `serde`'s default (missing-field)
//! behavior at the call site; this module only owns range coercion.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub style_package_count: u32,
    pub parallel_designer_count: u32,
    pub enable_style_competition: bool,
    pub max_style_rejections: u32,
    pub provider_timeout_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            style_package_count: 1,
            parallel_designer_count: 1,
            enable_style_competition: false,
            max_style_rejections: 5,
            provider_timeout_ms: 900_000,
        }
    }
}

impl WorkflowSettings {
    /// Clamps every field into its documented range and, when style
    /// competition is disabled, coerces the two competition-only counts
    /// down to 1.
    pub fn normalize(mut self) -> Self {
        self.style_package_count = self.style_package_count.clamp(1, 10);
        self.parallel_designer_count = self.parallel_designer_count.clamp(1, 15);
        self.max_style_rejections = self.max_style_rejections.clamp(1, 10);
        self.provider_timeout_ms = self.provider_timeout_ms.clamp(60_000, 1_800_000);
        if !self.enable_style_competition {
            self.style_package_count = 1;
            self.parallel_designer_count = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.style_package_count, 1);
        assert_eq!(settings.parallel_designer_count, 1);
        assert!(!settings.enable_style_competition);
        assert_eq!(settings.max_style_rejections, 5);
        assert_eq!(settings.provider_timeout_ms, 900_000);
    }

    #[test]
    fn disabled_competition_coerces_counts_to_one() {
        let settings = WorkflowSettings {
            style_package_count: 7,
            parallel_designer_count: 9,
            enable_style_competition: false,
            max_style_rejections: 5,
            provider_timeout_ms: 900_000,
        }
        .normalize();
        assert_eq!(settings.style_package_count, 1);
        assert_eq!(settings.parallel_designer_count, 1);
    }

    #[test]
    fn enabled_competition_keeps_counts_within_range() {
        let settings = WorkflowSettings {
            style_package_count: 20,
            parallel_designer_count: 20,
            enable_style_competition: true,
            max_style_rejections: 0,
            provider_timeout_ms: 1,
        }
        .normalize();
        assert_eq!(settings.style_package_count, 10);
        assert_eq!(settings.parallel_designer_count, 15);
        assert_eq!(settings.max_style_rejections, 1);
        assert_eq!(settings.provider_timeout_ms, 60_000);
    }
}
