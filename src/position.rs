use crate::error::AutoPlaceError;
use crate::types::{Edges, Px};
use std::fmt;
use std::str::FromStr;

/// Where a placed image sits relative to the surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Center,
    Left,
    Right,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Left => "left",
            Position::Right => "right",
        }
    }

    /// Value for the `float` property, `None` when the image is not floated.
    pub fn float_value(&self) -> Option<&'static str> {
        match self {
            Position::Center => None,
            Position::Left => Some("left"),
            Position::Right => Some("right"),
        }
    }

    /// Padding for an image at this position.
    ///
    /// The side touching the column edge gets no padding. A centered image only
    /// pads vertically, and skips the top unless something precedes it.
    pub fn padding(&self, pad: Px, first_chunk: bool) -> Edges {
        let edges = match self {
            Position::Center => Edges::new(pad, Px::ZERO, pad, Px::ZERO),
            Position::Left => Edges::new(pad, pad, pad, Px::ZERO),
            Position::Right => Edges::new(pad, Px::ZERO, pad, pad),
        };
        if first_chunk {
            Edges {
                top: Px::ZERO,
                ..edges
            }
        } else {
            edges
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = AutoPlaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Position::Center),
            "left" => Ok(Position::Left),
            "right" => Ok(Position::Right),
            other => Err(AutoPlaceError::InvalidConfiguration(format!(
                "unknown image position {other:?} (expected center, left or right)"
            ))),
        }
    }
}

/// Ordered, repeating list of positions applied round-robin to successive images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPattern(Vec<Position>);

impl LoopPattern {
    pub fn new(positions: Vec<Position>) -> Result<Self, AutoPlaceError> {
        if positions.is_empty() {
            return Err(AutoPlaceError::InvalidConfiguration(
                "loop pattern must contain at least one position".to_string(),
            ));
        }
        Ok(Self(positions))
    }

    /// Strict left/right alternation.
    pub fn alternating() -> Self {
        Self(vec![Position::Left, Position::Right])
    }

    /// Parse a comma or whitespace separated list such as `"left, right"`.
    pub fn parse(raw: &str) -> Result<Self, AutoPlaceError> {
        let positions = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(Position::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(positions)
    }

    pub fn at(&self, index: usize) -> Position {
        self.0[index % self.0.len()]
    }

    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LoopPattern {
    fn default() -> Self {
        Self(vec![Position::Center, Position::Left, Position::Right])
    }
}

impl fmt::Display for LoopPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, position) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            f.write_str(position.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_cycles_round_robin() {
        let pattern = LoopPattern::default();
        let seen: Vec<Position> = (0..5).map(|i| pattern.at(i)).collect();
        assert_eq!(
            seen,
            vec![
                Position::Center,
                Position::Left,
                Position::Right,
                Position::Center,
                Position::Left
            ]
        );
        assert_eq!(LoopPattern::alternating().at(3), Position::Right);
    }

    #[test]
    fn parse_accepts_mixed_separators_and_case() {
        let pattern = LoopPattern::parse(" Left,right  CENTER ").expect("pattern");
        assert_eq!(
            pattern.positions(),
            &[Position::Left, Position::Right, Position::Center]
        );
        assert_eq!(pattern.to_string(), "left,right,center");
    }

    #[test]
    fn parse_rejects_unknown_and_empty() {
        assert!(matches!(
            LoopPattern::parse("left, top"),
            Err(AutoPlaceError::InvalidConfiguration(_))
        ));
        assert!(LoopPattern::parse("  ").is_err());
    }

    #[test]
    fn padding_zeroes_the_leading_side() {
        let pad = Px::from_i32(10);
        assert_eq!(
            Position::Left.padding(pad, false),
            Edges::new(pad, pad, pad, Px::ZERO)
        );
        assert_eq!(
            Position::Right.padding(pad, false),
            Edges::new(pad, Px::ZERO, pad, pad)
        );
        assert_eq!(
            Position::Center.padding(pad, false),
            Edges::new(pad, Px::ZERO, pad, Px::ZERO)
        );
    }

    #[test]
    fn first_chunk_never_gets_top_padding() {
        let pad = Px::from_i32(10);
        for position in [Position::Center, Position::Left, Position::Right] {
            assert_eq!(
                position.padding(pad, true).top,
                Px::ZERO,
                "{position} placed before the first chunk must not pad its top"
            );
        }
    }
}
