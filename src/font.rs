use crate::error::AutoPlaceError;
use crate::types::Px;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

/// Average advance used when no font is registered, in thousandths of an em.
const FALLBACK_ADVANCE_1000: u16 = 600;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct WordWidthKey {
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct WordWidthCache {
    map: HashMap<WordWidthKey, Px>,
    order: VecDeque<WordWidthKey>,
    max_entries: usize,
}

impl WordWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &WordWidthKey) -> Option<Px> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: WordWidthKey, value: Px) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

/// Horizontal advances of one font face, scaled to 1000 units per em.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    name: String,
    first_char: u32,
    widths: Vec<u16>,
    missing_width: u16,
    /// Ascent minus descent plus line gap, per 1000 em.
    line_height_1000: i32,
}

impl FontMetrics {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AutoPlaceError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| {
            AutoPlaceError::Asset(format!("cannot read font {}: {err}", path.display()))
        })?;
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("font");
        Self::from_bytes(&data, source)
    }

    pub fn from_bytes(data: &[u8], source: &str) -> Result<Self, AutoPlaceError> {
        let Ok(face) = ttf_parser::Face::parse(data, 0) else {
            return Err(AutoPlaceError::Asset(format!(
                "invalid font data for {source}"
            )));
        };
        let units_per_em = face.units_per_em().max(1) as i64;
        let scale = |value: i64| -> i64 { (value * 1000 + units_per_em / 2) / units_per_em };

        let first_char = 32u32;
        let last_char = 255u32;
        let widths: Vec<u16> = (first_char..=last_char)
            .map(|code| {
                char::from_u32(code)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| scale(adv as i64).clamp(0, u16::MAX as i64) as u16)
                    .unwrap_or(0)
            })
            .collect();
        let missing_width = widths
            .first()
            .copied()
            .filter(|w| *w > 0)
            .unwrap_or(FALLBACK_ADVANCE_1000);
        let line_height_1000 = scale(
            face.ascender() as i64 - face.descender() as i64 + face.line_gap() as i64,
        ) as i32;

        Ok(Self {
            name: source.to_string(),
            first_char,
            widths,
            missing_width,
            line_height_1000,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn advance_for_char(&self, ch: char) -> u16 {
        let code = ch as u32;
        if code < self.first_char {
            return self.missing_width;
        }
        let idx = (code - self.first_char) as usize;
        match self.widths.get(idx).copied() {
            Some(width) if width > 0 => width,
            _ => self.missing_width,
        }
    }

    fn measure(&self, font_size: Px, text: &str) -> Px {
        let units: i64 = text.chars().map(|ch| self.advance_for_char(ch) as i64).sum();
        font_size.mul_ratio(units, 1000)
    }

    /// Natural line height for `font_size`, if the face declares one.
    pub fn line_height(&self, font_size: Px) -> Option<Px> {
        if self.line_height_1000 <= 0 {
            return None;
        }
        Some(font_size.mul_ratio(self.line_height_1000 as i64, 1000))
    }
}

/// Word width measurement with an optional font and a bounded cache.
#[derive(Debug)]
pub struct TextMeasurer {
    font: Option<FontMetrics>,
    cache: WordWidthCache,
}

impl TextMeasurer {
    pub fn new(font: Option<FontMetrics>) -> Self {
        Self {
            font,
            cache: WordWidthCache::new(20_000),
        }
    }

    pub fn font(&self) -> Option<&FontMetrics> {
        self.font.as_ref()
    }

    pub fn word_width(&mut self, font_size: Px, word: &str) -> Px {
        let key = WordWidthKey {
            size_milli: font_size.to_milli_i64(),
            text: word.to_string(),
        };
        if let Some(width) = self.cache.get(&key) {
            return width;
        }
        let width = match self.font.as_ref() {
            Some(font) => font.measure(font_size, word),
            None => {
                let count = word.chars().count() as i64;
                font_size.mul_ratio(count * FALLBACK_ADVANCE_1000 as i64, 1000)
            }
        };
        self.cache.insert(key, width);
        width
    }

    pub fn space_width(&mut self, font_size: Px) -> Px {
        self.word_width(font_size, " ")
    }
}
