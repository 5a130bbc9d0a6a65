//! Container configuration presets.

use serde::{Deserialize, Serialize};
use teleport_animation::AnimationCurve;
use teleport_core::{CornerStyle, Result, TeleportError};

use crate::record::{AnimationSpec, CompletionMode};

/// Highest frame rate the scheduler accepts
const MAX_TARGET_FPS: u32 = 480;

/// What happens to a record once its reverse leg completes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Replace the record with a fresh default for the same key
    #[default]
    Reset,
    /// Remove the record from the registry
    Remove,
}

/// Configuration for a teleport container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    /// Animation used by transitions that don't supply their own.
    pub animation: AnimationSpec,
    /// Corner style used by corner specs built from this config.
    pub corner_style: CornerStyle,
    /// Whether the host should hide its status bar while a proxy is visible.
    pub hide_status_bar: bool,
    /// Record lifetime after a completed round trip.
    pub retention: RetentionPolicy,
    /// Frame rate used for fixed-step scheduling.
    pub target_fps: u32,
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl TeleportConfig {
    /// Standard configuration for general use.
    pub fn standard() -> Self {
        Self {
            animation: AnimationSpec::default(),
            corner_style: CornerStyle::Circular,
            hide_status_bar: false,
            retention: RetentionPolicy::Reset,
            target_fps: 120,
        }
    }

    /// Testing configuration with short linear legs for deterministic runs.
    pub fn testing() -> Self {
        Self {
            animation: AnimationSpec::new(AnimationCurve::linear(100)),
            corner_style: CornerStyle::Circular,
            hide_status_bar: false,
            retention: RetentionPolicy::Reset,
            target_fps: 60,
        }
    }

    /// Parse a configuration from TOML. Missing fields take standard values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: TeleportConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Set the default animation spec.
    pub fn with_animation(mut self, animation: AnimationSpec) -> Self {
        self.animation = animation;
        self
    }

    /// Set the default animation curve, keeping delay and completion.
    pub fn with_curve(mut self, curve: AnimationCurve) -> Self {
        self.animation.curve = curve;
        self
    }

    /// Set the default start delay.
    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.animation.delay_ms = delay_ms;
        self
    }

    /// Set how leg completion is detected.
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.animation.completion = completion;
        self
    }

    pub fn with_corner_style(mut self, style: CornerStyle) -> Self {
        self.corner_style = style;
        self
    }

    /// Enable or disable status bar hiding while proxies are visible.
    pub fn with_hide_status_bar(mut self, hide: bool) -> Self {
        self.hide_status_bar = hide;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.animation.validate()?;
        if self.target_fps == 0 || self.target_fps > MAX_TARGET_FPS {
            return Err(TeleportError::InvalidFrameRate(self.target_fps));
        }
        Ok(())
    }
}
