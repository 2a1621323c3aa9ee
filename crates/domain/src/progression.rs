//! Chapter and arc progression rules.
//!
//! Pure decisions over scene/chapter counters: whether the current chapter
//! is wrapping up, and where a chapter sits inside its arc. The host uses
//! these to steer the story generator toward a chapter conclusion or an
//! arc finale; nothing here does I/O.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::settings::{DEFAULT_CHAPTERS_PER_ARC, DEFAULT_SCENES_PER_CHAPTER};

/// Validated narrative thresholds for one session.
///
/// Deserialization goes through the same validation as `new`, so a zero
/// threshold can never enter through the wire either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedProgressionConfig")]
pub struct ProgressionConfig {
    scenes_per_chapter: usize,
    chapters_per_arc: usize,
}

/// Raw wire shape, validated on conversion.
#[derive(Deserialize)]
struct UncheckedProgressionConfig {
    scenes_per_chapter: usize,
    chapters_per_arc: usize,
}

impl TryFrom<UncheckedProgressionConfig> for ProgressionConfig {
    type Error = DomainError;

    fn try_from(raw: UncheckedProgressionConfig) -> Result<Self, Self::Error> {
        Self::new(raw.scenes_per_chapter, raw.chapters_per_arc)
    }
}

impl ProgressionConfig {
    /// Both thresholds must be at least 1; zero is a configuration error,
    /// not something to clamp.
    pub fn new(scenes_per_chapter: usize, chapters_per_arc: usize) -> Result<Self, DomainError> {
        if scenes_per_chapter == 0 {
            return Err(DomainError::InvalidConfiguration(
                "scenes_per_chapter must be at least 1".to_string(),
            ));
        }
        if chapters_per_arc == 0 {
            return Err(DomainError::InvalidConfiguration(
                "chapters_per_arc must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            scenes_per_chapter,
            chapters_per_arc,
        })
    }

    pub fn scenes_per_chapter(&self) -> usize {
        self.scenes_per_chapter
    }

    pub fn chapters_per_arc(&self) -> usize {
        self.chapters_per_arc
    }

    /// A chapter ends once it has used up its scene budget.
    pub fn is_chapter_ending(&self, completed_scenes: usize) -> bool {
        completed_scenes >= self.scenes_per_chapter
    }

    /// Position of a chapter within its arc, counting from 0.
    pub fn arc_position(&self, chapter_index: usize) -> usize {
        chapter_index % self.chapters_per_arc
    }

    /// The last chapter of each arc closes out the current storyline.
    pub fn is_arc_ending(&self, chapter_index: usize) -> bool {
        self.arc_position(chapter_index) == self.chapters_per_arc - 1
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            scenes_per_chapter: DEFAULT_SCENES_PER_CHAPTER,
            chapters_per_arc: DEFAULT_CHAPTERS_PER_ARC,
        }
    }
}
