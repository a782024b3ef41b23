use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_WIDTH: DimensionRange = DimensionRange {
    ideal: 640,
    min: 320,
    max: 1280,
};
const DEFAULT_HEIGHT: DimensionRange = DimensionRange {
    ideal: 480,
    min: 240,
    max: 720,
};

/// Which camera to prefer on hosts with several.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front-facing (selfie) camera.
    #[default]
    User,
    Environment,
}

/// Requested size along one axis, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub ideal: u32,
    pub min: u32,
    pub max: u32,
}

impl DimensionRange {
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, axis: &str) -> Result<()> {
        if self.min == 0 {
            return Err(anyhow!("{} min must be greater than zero", axis));
        }
        if !(self.min <= self.ideal && self.ideal <= self.max) {
            return Err(anyhow!(
                "{} must satisfy min <= ideal <= max (got {} <= {} <= {})",
                axis,
                self.min,
                self.ideal,
                self.max
            ));
        }
        Ok(())
    }
}

/// Capability profile requested when acquiring a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureProfile {
    pub width: DimensionRange,
    pub height: DimensionRange,
    pub facing: FacingMode,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            facing: FacingMode::User,
        }
    }
}

impl CaptureProfile {
    pub fn validate(&self) -> Result<()> {
        self.width.validate("width")?;
        self.height.validate("height")
    }

    pub fn accepts(&self, width: u32, height: u32) -> bool {
        self.width.contains(width) && self.height.contains(height)
    }

    pub fn ideal_resolution(&self) -> (u32, u32) {
        (self.width.ideal, self.height.ideal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_front_camera_request() {
        let profile = CaptureProfile::default();
        assert_eq!(profile.ideal_resolution(), (640, 480));
        assert!(profile.accepts(320, 240));
        assert!(profile.accepts(1280, 720));
        assert!(!profile.accepts(1920, 1080));
        assert_eq!(profile.facing, FacingMode::User);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut profile = CaptureProfile::default();
        profile.height.min = 800;
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("height"));
    }
}
