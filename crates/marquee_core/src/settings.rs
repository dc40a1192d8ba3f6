//! Overlay tuning knobs, loaded from `settings.json` at the asset root.
//!
//! Every field has a default, so a missing or partial file still yields a
//! fully usable configuration. A missing file is informational, not an error.

use crate::jsonc::strip_comment_lines;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between transition spawns. Values below 3 are rejected and
    /// reset to the default (a too-fast loop thrashes texture selection).
    pub switch_interval_secs: f64,
    /// Per-frame position lerp factor toward the current target.
    pub lerp_amount: f32,

    /// Final multiplier on the background fit-to-viewport scale.
    pub background_scale: f32,
    /// Multiplier on the per-frame perspective-skew corner delta.
    pub perspective_speed: f32,
    /// Per-frame decrement of the background zoom factor.
    pub zoom_out_amount: f32,

    /// Final multiplier on the character fit-to-viewport scale.
    pub character_scale: f32,
    /// Per-frame horizontal drift of the character, signed by entry side.
    pub character_move_amount: f32,

    pub show_logo: bool,
    /// Per-frame lerp rate of the logo alpha toward full opacity.
    pub logo_fade_speed: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            switch_interval_secs: 7.0,
            lerp_amount: 0.06,
            background_scale: 0.78,
            perspective_speed: 2.5,
            zoom_out_amount: 0.00002,
            character_scale: 0.85,
            character_move_amount: 0.1,
            show_logo: true,
            logo_fade_speed: 0.1,
        }
    }
}

impl Settings {
    fn sanitize(mut self) -> Self {
        if self.switch_interval_secs < 3.0 {
            log::warn!(
                "switch_interval_secs {} is below the 3s floor; using default",
                self.switch_interval_secs
            );
            self.switch_interval_secs = Settings::default().switch_interval_secs;
        }
        self
    }
}

/// Load settings from `path`, falling back to defaults when the file is
/// missing. A present-but-broken file is an error the caller may still
/// choose to shrug off.
pub fn load_settings(path: &Path) -> Result<Settings, String> {
    if !path.exists() {
        log::info!("Settings file {} not found, using defaults", path.display());
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings file {}: {e}", path.display()))?;
    let settings: Settings = serde_json::from_str(&strip_comment_lines(&raw))
        .map_err(|e| format!("Failed to parse settings file {}: {e}", path.display()))?;
    Ok(settings.sanitize())
}
