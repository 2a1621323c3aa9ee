//! Per-session game settings.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::progression::ProgressionConfig;

pub const DEFAULT_SCENES_PER_CHAPTER: usize = 3;
pub const DEFAULT_CHAPTERS_PER_ARC: usize = 3;

/// Settings the host picks when starting a game.
///
/// These are host-side configuration: the session layer never reads them,
/// the host's story loop does. The narrative thresholds feed the
/// progression rules through [`GameSettings::progression`], which rejects
/// zero values instead of clamping them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub player_count: usize,
    #[serde(default)]
    pub enable_images: bool,
    #[serde(default)]
    pub enable_tts: bool,
    #[serde(default)]
    pub enable_music: bool,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
    #[serde(default = "default_scenes_per_chapter")]
    pub scenes_per_chapter: usize,
    #[serde(default = "default_chapters_per_arc")]
    pub chapters_per_arc: usize,
}

fn default_ai_model() -> String {
    "llama3".to_string()
}

fn default_scenes_per_chapter() -> usize {
    DEFAULT_SCENES_PER_CHAPTER
}

fn default_chapters_per_arc() -> usize {
    DEFAULT_CHAPTERS_PER_ARC
}

impl GameSettings {
    /// Build the progression config, failing fast on zero thresholds.
    pub fn progression(&self) -> Result<ProgressionConfig, DomainError> {
        ProgressionConfig::new(self.scenes_per_chapter, self.chapters_per_arc)
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            player_count: 1,
            enable_images: false,
            enable_tts: false,
            enable_music: false,
            ai_model: default_ai_model(),
            scenes_per_chapter: DEFAULT_SCENES_PER_CHAPTER,
            chapters_per_arc: DEFAULT_CHAPTERS_PER_ARC,
        }
    }
}
