use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::{CaptureProfile, DimensionRange, FacingMode};
use crate::detect::{Delegate, LandmarkerOptions, RunningMode};

pub const DEFAULT_CAMERA_DEVICE: &str = "stub://front_camera";
pub const DEFAULT_MODEL_ASSET_PATH: &str = "stub://pose_landmarker_lite";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_NUM_POSES: u32 = 2;
const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_HZ: u32 = 60;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    profile: Option<ProfileConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ProfileConfigFile {
    width: Option<RangeConfigFile>,
    height: Option<RangeConfigFile>,
    facing: Option<FacingMode>,
}

#[derive(Debug, Deserialize, Default)]
struct RangeConfigFile {
    ideal: Option<u32>,
    min: Option<u32>,
    max: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    asset_path: Option<String>,
    delegate: Option<Delegate>,
    num_poses: Option<u32>,
    load_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    refresh_hz: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera: CameraSettings,
    pub model: ModelSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    /// Frame rate for synthetic and V4L2 cameras.
    pub target_fps: u32,
    pub profile: CaptureProfile,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub asset_path: String,
    pub delegate: Delegate,
    pub num_poses: u32,
    pub load_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub refresh_hz: u32,
}

impl ModelSettings {
    /// Options the landmark source is created with. Sources start in image
    /// mode; the session loop switches them to video mode.
    pub fn landmarker_options(&self) -> LandmarkerOptions {
        LandmarkerOptions {
            model_asset_path: self.asset_path.clone(),
            delegate: self.delegate,
            running_mode: RunningMode::Image,
            num_poses: self.num_poses,
        }
    }
}

impl DisplaySettings {
    /// Interval between display refreshes.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh_hz.max(1)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TECHNECK_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let profile_file = camera_file.profile.unwrap_or_default();
        let defaults = CaptureProfile::default();
        let camera = CameraSettings {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            profile: CaptureProfile {
                width: merge_range(profile_file.width, defaults.width),
                height: merge_range(profile_file.height, defaults.height),
                facing: profile_file.facing.unwrap_or(defaults.facing),
            },
        };

        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            asset_path: model_file
                .asset_path
                .unwrap_or_else(|| DEFAULT_MODEL_ASSET_PATH.to_string()),
            delegate: model_file.delegate.unwrap_or_default(),
            num_poses: model_file.num_poses.unwrap_or(DEFAULT_NUM_POSES),
            load_timeout: Duration::from_secs(
                model_file
                    .load_timeout_secs
                    .unwrap_or(DEFAULT_LOAD_TIMEOUT_SECS),
            ),
        };

        let display = DisplaySettings {
            refresh_hz: file
                .display
                .and_then(|display| display.refresh_hz)
                .unwrap_or(DEFAULT_REFRESH_HZ),
        };

        Self {
            camera,
            model,
            display,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("TECHNECK_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(fps) = std::env::var("TECHNECK_CAMERA_FPS") {
            self.camera.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("TECHNECK_CAMERA_FPS must be an integer frame rate"))?;
        }
        if let Ok(path) = std::env::var("TECHNECK_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.asset_path = path;
            }
        }
        if let Ok(delegate) = std::env::var("TECHNECK_DELEGATE") {
            self.model.delegate = parse_delegate(&delegate)?;
        }
        if let Ok(num_poses) = std::env::var("TECHNECK_NUM_POSES") {
            self.model.num_poses = num_poses
                .parse()
                .map_err(|_| anyhow!("TECHNECK_NUM_POSES must be an integer"))?;
        }
        if let Ok(timeout) = std::env::var("TECHNECK_MODEL_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("TECHNECK_MODEL_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.model.load_timeout = Duration::from_secs(seconds);
        }
        if let Ok(refresh_hz) = std::env::var("TECHNECK_REFRESH_HZ") {
            self.display.refresh_hz = refresh_hz
                .parse()
                .map_err(|_| anyhow!("TECHNECK_REFRESH_HZ must be an integer rate in Hz"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.camera
            .profile
            .validate()
            .map_err(|e| anyhow!("invalid camera profile: {}", e))?;
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.model.num_poses == 0 {
            return Err(anyhow!("num_poses must be at least 1"));
        }
        if self.model.load_timeout.as_secs() == 0 {
            return Err(anyhow!("model load timeout must be greater than zero"));
        }
        if self.display.refresh_hz == 0 {
            return Err(anyhow!("refresh_hz must be at least 1"));
        }
        Ok(())
    }
}

fn merge_range(file: Option<RangeConfigFile>, defaults: DimensionRange) -> DimensionRange {
    let file = file.unwrap_or_default();
    DimensionRange {
        ideal: file.ideal.unwrap_or(defaults.ideal),
        min: file.min.unwrap_or(defaults.min),
        max: file.max.unwrap_or(defaults.max),
    }
}

fn parse_delegate(value: &str) -> Result<Delegate> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gpu" => Ok(Delegate::Gpu),
        "cpu" => Ok(Delegate::Cpu),
        other => Err(anyhow!("TECHNECK_DELEGATE must be gpu or cpu (got {})", other)),
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_front_camera_setup() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.camera.device, DEFAULT_CAMERA_DEVICE);
        assert_eq!(cfg.camera.profile, CaptureProfile::default());
        assert_eq!(cfg.model.asset_path, DEFAULT_MODEL_ASSET_PATH);
        assert_eq!(cfg.model.delegate, Delegate::Gpu);
        assert_eq!(cfg.model.num_poses, 2);
        assert_eq!(cfg.model.load_timeout, Duration::from_secs(30));
        assert_eq!(cfg.display.refresh_hz, 60);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_profile_keeps_remaining_defaults() {
        let file: AppConfigFile = serde_json::from_str(
            r#"{ "camera": { "profile": { "width": { "max": 1920 }, "facing": "environment" } } }"#,
        )
        .expect("parse");
        let cfg = AppConfig::from_file(file);
        assert_eq!(cfg.camera.profile.width.max, 1920);
        assert_eq!(cfg.camera.profile.width.ideal, 640);
        assert_eq!(cfg.camera.profile.height, CaptureProfile::default().height);
        assert_eq!(cfg.camera.profile.facing, FacingMode::Environment);
    }

    #[test]
    fn landmarker_options_start_in_image_mode() {
        let cfg = AppConfig::default();
        let options = cfg.model.landmarker_options();
        assert_eq!(options.running_mode, RunningMode::Image);
        assert_eq!(options, LandmarkerOptions::default());
    }

    #[test]
    fn delegate_names_are_case_insensitive() {
        assert_eq!(parse_delegate("CPU").expect("cpu"), Delegate::Cpu);
        assert_eq!(parse_delegate(" gpu ").expect("gpu"), Delegate::Gpu);
        assert!(parse_delegate("npu").is_err());
    }

    #[test]
    fn frame_interval_follows_refresh_rate() {
        let display = DisplaySettings { refresh_hz: 50 };
        assert!((display.frame_interval().as_secs_f64() - 0.02).abs() < 1e-9);
    }
}
