//! Playback and movement configuration resource.
//!
//! Holds every tunable the playback state machine and the path solver read,
//! loaded from an INI file. Defaults are safe to run with when no file is
//! present.
//!
//! # Configuration File Format
//!
//! ```ini
//! [movement]
//! walk_speed = 4
//! run_speed = 8
//! run_distance = 5
//!
//! [idle]
//! play_idle_animations = false
//! idle_anim_time = 600
//!
//! [collision]
//! token_collision = true
//! token_collision_allied = false
//! token_collision_hidden = false
//!
//! [playback]
//! frames_per_square = 2.0
//! diagonal_discount = 0.5
//! separate_idle_offset = 1
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

const DEFAULT_WALK_SPEED: f32 = 4.0;
const DEFAULT_RUN_SPEED: f32 = 8.0;
const DEFAULT_RUN_DISTANCE: f32 = 5.0;
const DEFAULT_IDLE_ANIM_TIME_MS: u32 = 600;
const DEFAULT_PLAY_IDLE_ANIMATIONS: bool = false;
const DEFAULT_TOKEN_COLLISION: bool = true;
const DEFAULT_TOKEN_COLLISION_ALLIED: bool = false;
const DEFAULT_TOKEN_COLLISION_HIDDEN: bool = false;
const DEFAULT_FRAMES_PER_SQUARE: f32 = 2.0;
const DEFAULT_DIAGONAL_DISCOUNT: f32 = 0.5;
const DEFAULT_SEPARATE_IDLE_OFFSET: usize = 1;
const DEFAULT_CONFIG_PATH: &str = "./sheetwalk.ini";

/// Playback and movement configuration.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    /// Walking speed in grid spaces per second.
    pub walk_speed: f32,
    /// Running speed in grid spaces per second.
    pub run_speed: f32,
    /// Manhattan grid distance from which a move is played as a run.
    pub run_distance: f32,
    /// Milliseconds each idle frame is shown.
    pub idle_anim_time_ms: u32,
    pub play_idle_animations: bool,
    /// Occupied cells block movement.
    pub token_collision: bool,
    /// Allied occupants block too.
    pub token_collision_allied: bool,
    /// Hidden occupants block too.
    pub token_collision_hidden: bool,
    /// Walking frames advanced per grid space travelled.
    pub frames_per_square: f32,
    /// Share of the shorter axis subtracted from diagonal travel.
    pub diagonal_discount: f32,
    /// Frames reserved for the idle pose on sheets with a separate idle.
    pub separate_idle_offset: usize,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationConfig {
    pub fn new() -> Self {
        Self {
            walk_speed: DEFAULT_WALK_SPEED,
            run_speed: DEFAULT_RUN_SPEED,
            run_distance: DEFAULT_RUN_DISTANCE,
            idle_anim_time_ms: DEFAULT_IDLE_ANIM_TIME_MS,
            play_idle_animations: DEFAULT_PLAY_IDLE_ANIMATIONS,
            token_collision: DEFAULT_TOKEN_COLLISION,
            token_collision_allied: DEFAULT_TOKEN_COLLISION_ALLIED,
            token_collision_hidden: DEFAULT_TOKEN_COLLISION_HIDDEN,
            frames_per_square: DEFAULT_FRAMES_PER_SQUARE,
            diagonal_discount: DEFAULT_DIAGONAL_DISCOUNT,
            separate_idle_offset: DEFAULT_SEPARATE_IDLE_OFFSET,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Idle frame duration in seconds.
    pub fn idle_frame_seconds(&self) -> f32 {
        self.idle_anim_time_ms as f32 / 1000.0
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply_ini(&config);

        info!(
            "Loaded config: walk={} run={} run_distance={} idle={} ({}ms) collision={}",
            self.walk_speed,
            self.run_speed,
            self.run_distance,
            self.play_idle_animations,
            self.idle_anim_time_ms,
            self.token_collision
        );

        Ok(())
    }

    /// Parse configuration from an INI string. Missing values retain their
    /// current values.
    pub fn load_from_str(&mut self, contents: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(contents.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply_ini(&config);
        Ok(())
    }

    fn apply_ini(&mut self, config: &Ini) {
        // [movement]
        if let Some(v) = config.getfloat("movement", "walk_speed").ok().flatten() {
            self.walk_speed = v as f32;
        }
        if let Some(v) = config.getfloat("movement", "run_speed").ok().flatten() {
            self.run_speed = v as f32;
        }
        if let Some(v) = config.getfloat("movement", "run_distance").ok().flatten() {
            self.run_distance = v as f32;
        }

        // [idle]
        if let Some(v) = config.getbool("idle", "play_idle_animations").ok().flatten() {
            self.play_idle_animations = v;
        }
        if let Some(v) = config.getuint("idle", "idle_anim_time").ok().flatten() {
            self.idle_anim_time_ms = v as u32;
        }

        // [collision]
        if let Some(v) = config.getbool("collision", "token_collision").ok().flatten() {
            self.token_collision = v;
        }
        if let Some(v) = config.getbool("collision", "token_collision_allied").ok().flatten() {
            self.token_collision_allied = v;
        }
        if let Some(v) = config.getbool("collision", "token_collision_hidden").ok().flatten() {
            self.token_collision_hidden = v;
        }

        // [playback]
        if let Some(v) = config.getfloat("playback", "frames_per_square").ok().flatten() {
            self.frames_per_square = v as f32;
        }
        if let Some(v) = config.getfloat("playback", "diagonal_discount").ok().flatten() {
            self.diagonal_discount = v as f32;
        }
        if let Some(v) = config.getuint("playback", "separate_idle_offset").ok().flatten() {
            self.separate_idle_offset = v as usize;
        }
    }

    fn to_ini(&self) -> Ini {
        let mut config = Ini::new();

        config.set("movement", "walk_speed", Some(self.walk_speed.to_string()));
        config.set("movement", "run_speed", Some(self.run_speed.to_string()));
        config.set("movement", "run_distance", Some(self.run_distance.to_string()));

        config.set(
            "idle",
            "play_idle_animations",
            Some(self.play_idle_animations.to_string()),
        );
        config.set("idle", "idle_anim_time", Some(self.idle_anim_time_ms.to_string()));

        config.set("collision", "token_collision", Some(self.token_collision.to_string()));
        config.set(
            "collision",
            "token_collision_allied",
            Some(self.token_collision_allied.to_string()),
        );
        config.set(
            "collision",
            "token_collision_hidden",
            Some(self.token_collision_hidden.to_string()),
        );

        config.set(
            "playback",
            "frames_per_square",
            Some(self.frames_per_square.to_string()),
        );
        config.set(
            "playback",
            "diagonal_discount",
            Some(self.diagonal_discount.to_string()),
        );
        config.set(
            "playback",
            "separate_idle_offset",
            Some(self.separate_idle_offset.to_string()),
        );
        config
    }

    /// Save configuration to the INI file, creating it if needed.
    pub fn save_to_file(&self) -> Result<(), String> {
        self.to_ini()
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Render the configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        self.to_ini().writes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = AnimationConfig::default();
        assert_eq!(c.walk_speed, 4.0);
        assert_eq!(c.run_speed, 8.0);
        assert_eq!(c.run_distance, 5.0);
        assert_eq!(c.idle_anim_time_ms, 600);
        assert!(!c.play_idle_animations);
        assert!(c.token_collision);
        assert!(!c.token_collision_allied);
        assert!(!c.token_collision_hidden);
    }

    #[test]
    fn test_partial_ini_keeps_defaults() {
        let mut c = AnimationConfig::default();
        c.load_from_str("[movement]\nrun_distance = 3\n[idle]\nplay_idle_animations = true\n")
            .unwrap();
        assert_eq!(c.run_distance, 3.0);
        assert!(c.play_idle_animations);
        assert_eq!(c.walk_speed, 4.0);
        assert_eq!(c.frames_per_square, 2.0);
    }

    #[test]
    fn test_ini_string_round_trips() {
        let mut c = AnimationConfig::default();
        c.run_speed = 12.0;
        c.token_collision_hidden = true;
        c.separate_idle_offset = 2;
        let text = c.to_ini_string();
        let mut back = AnimationConfig::default();
        back.load_from_str(&text).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut c = AnimationConfig::with_path("/nonexistent/dir/sheetwalk.ini");
        assert!(c.load_from_file().is_err());
        assert_eq!(c.walk_speed, 4.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("sheetwalk-{}.ini", std::process::id()));
        let mut c = AnimationConfig::with_path(&path);
        c.idle_anim_time_ms = 250;
        c.save_to_file().unwrap();
        let mut back = AnimationConfig::with_path(&path);
        back.load_from_file().unwrap();
        assert_eq!(back.idle_anim_time_ms, 250);
        let _ = std::fs::remove_file(&path);
    }
}
