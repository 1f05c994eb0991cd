use crate::types::{Edges, Px};
use kuchiki::NodeRef;
use lightningcss::properties::Property;
use lightningcss::properties::size::Size as CssSize;
use lightningcss::stylesheet::{ParserOptions, StyleAttribute};
use lightningcss::values::length::LengthPercentage;

/// Ordered view over an element's `style` attribute.
///
/// Declarations keep their source order and their original value text; setting
/// a property replaces it in place, so untouched declarations survive a round
/// trip byte for byte (modulo whitespace around `:` and `;`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(raw: &str) -> Self {
        let mut style = InlineStyle::default();
        for part in split_declarations(raw) {
            let Some((name, value)) = part.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            style.set(&name, value);
        }
        style
    }

    pub fn of(node: &NodeRef) -> Self {
        node.as_element()
            .and_then(|el| el.attributes.borrow().get("style").map(InlineStyle::parse))
            .unwrap_or_default()
    }

    /// Write back to `node`, dropping the attribute entirely when empty.
    pub fn write_to(&self, node: &NodeRef) {
        let Some(element) = node.as_element() else {
            return;
        };
        let mut attrs = element.attributes.borrow_mut();
        if self.declarations.is_empty() {
            attrs.remove("style");
        } else {
            attrs.insert("style", self.to_attr());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.declarations.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
        } else {
            self.declarations.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.declarations.iter().position(|(n, _)| n == name)?;
        Some(self.declarations.remove(idx).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn to_attr(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_hidden(&self) -> bool {
        self.get("display")
            .map(|v| v.trim().eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }

    pub fn float_side(&self) -> Option<FloatSide> {
        match self.get("float")?.trim().to_ascii_lowercase().as_str() {
            "left" => Some(FloatSide::Left),
            "right" => Some(FloatSide::Right),
            _ => None,
        }
    }

    /// Resolved padding, applying the shorthand and longhands in source order.
    pub fn padding(&self, font_size: Px) -> Edges {
        let mut edges = Edges::zero();
        for (name, value) in &self.declarations {
            match name.as_str() {
                "padding" => {
                    let values: Vec<Px> = value
                        .split_whitespace()
                        .filter_map(|part| parse_length(part, font_size))
                        .collect();
                    if let Some(parsed) = Edges::from_shorthand(&values) {
                        edges = parsed;
                    }
                }
                "padding-top" => {
                    if let Some(v) = parse_length(value, font_size) {
                        edges.top = v;
                    }
                }
                "padding-right" => {
                    if let Some(v) = parse_length(value, font_size) {
                        edges.right = v;
                    }
                }
                "padding-bottom" => {
                    if let Some(v) = parse_length(value, font_size) {
                        edges.bottom = v;
                    }
                }
                "padding-left" => {
                    if let Some(v) = parse_length(value, font_size) {
                        edges.left = v;
                    }
                }
                _ => {}
            }
        }
        edges
    }
}

/// Split on `;` outside parentheses and quoted strings, so values such as
/// `url(data:image/png;base64,...)` stay whole.
fn split_declarations(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;
    for (idx, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(open) if open == ch => quote = None,
                None => quote = Some(ch),
                Some(_) => {}
            },
            _ if quote.is_some() => {}
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatSide {
    Left,
    Right,
}

/// Parse an absolute or font-relative CSS length into pixels. Percentages and
/// keywords yield `None`.
pub fn parse_length(raw: &str, font_size: Px) -> Option<Px> {
    let raw = raw.trim().to_ascii_lowercase();
    if raw.is_empty() {
        return None;
    }
    // `rem` before `em`, otherwise "2rem" would parse as "2r" + "em".
    let units = ["px", "pt", "rem", "em", "in", "cm", "mm"];
    for unit in &units {
        if let Some(value) = raw.strip_suffix(unit) {
            let v = value.trim().parse::<f32>().ok()?;
            return Some(match *unit {
                "px" => Px::from_f32(v),
                "pt" => Px::from_pt(v),
                "em" | "rem" => font_size * v,
                "in" => Px::from_f32(v * 96.0),
                "cm" => Px::from_f32(v * 96.0 / 2.54),
                "mm" => Px::from_f32(v * 96.0 / 25.4),
                _ => return None,
            });
        }
    }
    raw.parse::<f32>().ok().map(Px::from_f32)
}

/// Box dimensions declared in a `style` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeclaredSize {
    pub width: Option<Px>,
    pub height: Option<Px>,
    pub min_height: Option<Px>,
}

/// Read `width`, `height` and `min-height` through the CSS parser so that
/// invalid declarations are ignored the way a browser would.
pub fn declared_size(style: &str) -> DeclaredSize {
    let mut size = DeclaredSize::default();
    let Ok(attr) = StyleAttribute::parse(style, ParserOptions::default()) else {
        return size;
    };
    let normal = attr.declarations.declarations.iter();
    let important = attr.declarations.important_declarations.iter();
    for prop in normal.chain(important) {
        match prop {
            Property::Width(value) => size.width = css_size_to_px(value),
            Property::Height(value) => size.height = css_size_to_px(value),
            Property::MinHeight(value) => size.min_height = css_size_to_px(value),
            _ => {}
        }
    }
    size
}

fn css_size_to_px(size: &CssSize) -> Option<Px> {
    match size {
        CssSize::LengthPercentage(LengthPercentage::Dimension(length)) => {
            length.to_px().map(Px::from_f32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order_and_last_value_wins() {
        let style = InlineStyle::parse("width: 200px; FLOAT: left;; bogus; float: right");
        assert_eq!(style.get("float"), Some("right"));
        assert_eq!(style.to_attr(), "width: 200px; float: right");
    }

    #[test]
    fn semicolons_inside_urls_and_strings_do_not_split() {
        let raw = "background: url(data:image/png;base64,AAAA) no-repeat; \
                   content: 'a;b'; background-image: url(\"x;y.png\"); float: left";
        let style = InlineStyle::parse(raw);
        assert_eq!(
            style.get("background"),
            Some("url(data:image/png;base64,AAAA) no-repeat")
        );
        assert_eq!(style.get("content"), Some("'a;b'"));
        assert_eq!(style.get("background-image"), Some("url(\"x;y.png\")"));
        assert_eq!(style.float_side(), Some(FloatSide::Left));
        assert_eq!(
            style.to_attr(),
            "background: url(data:image/png;base64,AAAA) no-repeat; content: 'a;b'; \
             background-image: url(\"x;y.png\"); float: left"
        );
    }

    #[test]
    fn set_replaces_in_place_and_remove_drops() {
        let mut style = InlineStyle::parse("display: none; border: 1px");
        style.set("display", "inline");
        style.set("padding", "0 0 10px 0");
        assert_eq!(
            style.to_attr(),
            "display: inline; border: 1px; padding: 0 0 10px 0"
        );
        assert_eq!(style.remove("border").as_deref(), Some("1px"));
        assert_eq!(style.remove("border"), None);
        assert!(!style.is_hidden());
    }

    #[test]
    fn padding_longhand_overrides_shorthand() {
        let font = Px::from_i32(16);
        let style = InlineStyle::parse("padding: 10px 10px 10px 0; padding-top: 0");
        assert_eq!(
            style.padding(font),
            Edges::new(Px::ZERO, Px::from_i32(10), Px::from_i32(10), Px::ZERO)
        );
        let em = InlineStyle::parse("padding: 1em");
        assert_eq!(em.padding(font), Edges::all(font));
    }

    #[test]
    fn lengths_cover_common_units() {
        let font = Px::from_i32(16);
        assert_eq!(parse_length("12", font), Some(Px::from_i32(12)));
        assert_eq!(parse_length("12pt", font), Some(Px::from_i32(16)));
        assert_eq!(parse_length("2rem", font), Some(Px::from_i32(32)));
        assert_eq!(parse_length("1in", font), Some(Px::from_i32(96)));
        assert_eq!(parse_length("50%", font), None);
        assert_eq!(parse_length("auto", font), None);
    }

    #[test]
    fn declared_size_reads_dimensions() {
        let size = declared_size("width: 200px; height: 100px; border: 1px solid");
        assert_eq!(size.width, Some(Px::from_i32(200)));
        assert_eq!(size.height, Some(Px::from_i32(100)));
        assert_eq!(size.min_height, None);

        let min = declared_size("min-height: 40px; height: auto");
        assert_eq!(min.min_height, Some(Px::from_i32(40)));
        assert_eq!(min.height, None);
    }
}
