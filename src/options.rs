use crate::error::AutoPlaceError;
use crate::position::LoopPattern;
use crate::types::Px;

/// What happens to images still waiting when the last chunk has been placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingImages {
    /// Leave them unplaced.
    #[default]
    Drop,
    /// Append them to the end of the container, continuing the pattern.
    Append,
}

impl TrailingImages {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrailingImages::Drop => "drop",
            TrailingImages::Append => "append",
        }
    }
}

/// Options for one placement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOptions {
    /// Image padding on the three non-leading sides.
    pub padding: Px,
    /// Minimum vertical space between two images.
    pub offset: Px,
    /// Minimum vertical space before the first image.
    pub initial_offset: Px,
    /// Selector for the images to redistribute, scoped to the container.
    pub img_selector: String,
    /// Selector for the chunks images are placed between. Empty means the
    /// container text is flattened and every word becomes a chunk.
    pub chunk_selector: String,
    pub loop_pattern: LoopPattern,
    pub trailing_images: TrailingImages,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            padding: Px::from_i32(10),
            offset: Px::from_i32(200),
            initial_offset: Px::ZERO,
            img_selector: "img".to_string(),
            chunk_selector: String::new(),
            loop_pattern: LoopPattern::default(),
            trailing_images: TrailingImages::Drop,
        }
    }
}

impl PlacementOptions {
    pub fn uses_chunk_selector(&self) -> bool {
        !self.chunk_selector.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), AutoPlaceError> {
        for (name, value) in [
            ("padding", self.padding),
            ("offset", self.offset),
            ("initial_offset", self.initial_offset),
        ] {
            if value.is_negative() {
                return Err(AutoPlaceError::InvalidConfiguration(format!(
                    "{name} must not be negative (got {})",
                    value.css()
                )));
            }
        }
        if self.loop_pattern.is_empty() {
            return Err(AutoPlaceError::InvalidConfiguration(
                "loop pattern must contain at least one position".to_string(),
            ));
        }
        Ok(())
    }
}

/// Convert a caller-supplied pixel amount, rejecting NaN and infinities instead
/// of silently mapping them to zero.
pub(crate) fn px_option(name: &str, value: f32) -> Result<Px, AutoPlaceError> {
    if !value.is_finite() {
        return Err(AutoPlaceError::InvalidConfiguration(format!(
            "{name} must be a finite number of pixels"
        )));
    }
    Ok(Px::from_f32(value))
}
