use crate::assets::ImageSizer;
use crate::font::TextMeasurer;
use crate::inline_style::{FloatSide, InlineStyle, declared_size, parse_length};
use crate::types::{Edges, Px};
use kuchiki::NodeRef;

/// Size used for images whose dimensions cannot be resolved.
const DEFAULT_IMAGE_SIZE: i32 = 150;

/// Reports the rendered outer height (content, padding and border) of a node
/// as it stands after the latest mutation.
pub trait HeightProvider {
    fn outer_height(&mut self, node: &NodeRef) -> Px;
}

/// Adapter turning any closure into a [`HeightProvider`].
pub struct FnHeight<F>(pub F);

impl<F> HeightProvider for FnHeight<F>
where
    F: FnMut(&NodeRef) -> Px,
{
    fn outer_height(&mut self, node: &NodeRef) -> Px {
        (self.0)(node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Content width used when the container declares none.
    pub container_width: Px,
    pub font_size: Px,
    /// Line height as a multiple of the font size; `None` is `normal`.
    pub line_height: Option<f32>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            container_width: Px::from_i32(600),
            font_size: Px::from_i32(16),
            line_height: None,
        }
    }
}

/// Line-box height estimator standing in for a browser layout engine.
///
/// Text is broken greedily into lines, floated images narrow the lines they
/// overlap, and everything else stacks as blocks. Floats do not contribute to
/// the container height.
pub struct FlowEstimator {
    config: EstimatorConfig,
    text: TextMeasurer,
    images: ImageSizer,
}

impl FlowEstimator {
    pub fn new(config: EstimatorConfig, text: TextMeasurer, images: ImageSizer) -> Self {
        Self {
            config,
            text,
            images,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    fn line_height(&self) -> Px {
        let font_size = self.config.font_size;
        match self.config.line_height {
            Some(factor) => font_size * factor,
            None => self
                .text
                .font()
                .and_then(|font| font.line_height(font_size))
                .unwrap_or(font_size * 1.2),
        }
    }

    /// Outer width and height of an image, padding included.
    pub fn image_box(&mut self, node: &NodeRef) -> (Px, Px) {
        let style = InlineStyle::of(node);
        let font_size = self.config.font_size;
        let (attr_w, attr_h, src) = match node.as_element() {
            Some(el) => {
                let attrs = el.attributes.borrow();
                (
                    attrs.get("width").and_then(|v| parse_length(v, font_size)),
                    attrs.get("height").and_then(|v| parse_length(v, font_size)),
                    attrs.get("src").map(str::to_string),
                )
            }
            None => (None, None, None),
        };
        let declared = declared_size(&style.to_attr());
        let width = declared.width.or(attr_w);
        let height = declared.height.or(attr_h);
        let intrinsic = src
            .as_deref()
            .and_then(|src| self.images.intrinsic_size(src));

        let (width, height) = match (width, height, intrinsic) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((iw, ih))) => (w, w.mul_ratio(ih as i64, iw as i64)),
            (None, Some(h), Some((iw, ih))) => (h.mul_ratio(iw as i64, ih as i64), h),
            (None, None, Some((iw, ih))) => (Px::from_i32(iw as i32), Px::from_i32(ih as i32)),
            (Some(w), None, None) => (w, w),
            (None, Some(h), None) => (h, h),
            (None, None, None) => (
                Px::from_i32(DEFAULT_IMAGE_SIZE),
                Px::from_i32(DEFAULT_IMAGE_SIZE),
            ),
        };
        let padding = style.padding(font_size);
        (width + padding.horizontal(), height + padding.vertical())
    }

    fn block_height(&mut self, node: &NodeRef) -> Px {
        let style = InlineStyle::of(node);
        let font_size = self.config.font_size;
        let declared = declared_size(&style.to_attr());
        let padding: Edges = style.padding(font_size);
        let width = declared.width.unwrap_or(self.config.container_width);

        let space = self.text.space_width(font_size);
        let mut flow = Flow::new(width, self.line_height(), space);
        self.walk(node, &mut flow);
        let content = flow.finish();

        let content = match declared.height {
            Some(height) => height,
            None => content,
        };
        let content = match declared.min_height {
            Some(min) => content.max(min),
            None => content,
        };
        content + padding.vertical()
    }

    fn walk(&mut self, node: &NodeRef, flow: &mut Flow) {
        let font_size = self.config.font_size;
        for child in node.children() {
            if let Some(text) = child.as_text() {
                let text = text.borrow();
                for word in text.split_whitespace() {
                    let width = self.text.word_width(font_size, word);
                    flow.push_word(width);
                }
                continue;
            }
            let Some(element) = child.as_element() else {
                continue;
            };
            let style = InlineStyle::of(&child);
            if style.is_hidden() {
                continue;
            }
            let tag = element.name.local.as_ref().to_ascii_lowercase();
            match tag.as_str() {
                "script" | "style" | "template" | "head" | "noscript" => {}
                "img" => {
                    let (width, height) = self.image_box(&child);
                    match style.float_side() {
                        Some(side) => flow.place_float(side, width, height),
                        None => flow.place_block(height),
                    }
                }
                "br" => flow.hard_break(),
                _ if is_block_tag(&tag) => {
                    let margin = if tag == "p" { font_size } else { Px::ZERO };
                    let padding = style.padding(font_size);
                    flow.break_line();
                    flow.margin(margin);
                    flow.advance(padding.top);
                    self.walk(&child, flow);
                    flow.break_line();
                    flow.advance(padding.bottom);
                    flow.margin(margin);
                }
                _ => self.walk(&child, flow),
            }
        }
    }
}

impl HeightProvider for FlowEstimator {
    fn outer_height(&mut self, node: &NodeRef) -> Px {
        let is_img = node
            .as_element()
            .map(|el| el.name.local.as_ref().eq_ignore_ascii_case("img"))
            .unwrap_or(false);
        if is_img {
            return self.image_box(node).1;
        }
        self.block_height(node)
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "aside"
            | "header"
            | "footer"
            | "main"
            | "nav"
            | "blockquote"
            | "figure"
            | "figcaption"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "table"
            | "hr"
            | "body"
    )
}

#[derive(Debug, Clone, Copy)]
struct FloatBox {
    side: FloatSide,
    top: Px,
    bottom: Px,
    width: Px,
}

/// Cursor state of one block formatting context.
struct Flow {
    width: Px,
    line_height: Px,
    space: Px,
    /// Top of the current line box.
    y: Px,
    line_used: Px,
    line_has_content: bool,
    floats: Vec<FloatBox>,
    /// Last margin added and the `y` it ended at, for collapsing.
    last_margin: Px,
    margin_mark: Option<Px>,
}

impl Flow {
    fn new(width: Px, line_height: Px, space: Px) -> Self {
        Self {
            width,
            line_height,
            space,
            y: Px::ZERO,
            line_used: Px::ZERO,
            line_has_content: false,
            floats: Vec::new(),
            last_margin: Px::ZERO,
            margin_mark: None,
        }
    }

    fn float_intrusion(&self, top: Px, bottom: Px) -> (Px, Px) {
        let mut left = Px::ZERO;
        let mut right = Px::ZERO;
        for float in &self.floats {
            if float.top < bottom && float.bottom > top {
                match float.side {
                    FloatSide::Left => left += float.width,
                    FloatSide::Right => right += float.width,
                }
            }
        }
        (left, right)
    }

    fn available_at(&self, y: Px) -> Px {
        let (left, right) = self.float_intrusion(y, y + self.line_height);
        (self.width - left - right).max(Px::ZERO)
    }

    /// Lowest float bottom below `y` among floats overlapping the line at `y`.
    fn next_float_bottom(&self, y: Px) -> Option<Px> {
        let line_bottom = y + self.line_height;
        self.floats
            .iter()
            .filter(|f| f.top < line_bottom && f.bottom > y)
            .map(|f| f.bottom)
            .fold(None, |acc: Option<Px>, b| Some(acc.map_or(b, |a| a.min(b))))
    }

    fn push_word(&mut self, width: Px) {
        if self.line_has_content
            && self.line_used + self.space + width > self.available_at(self.y)
        {
            self.break_line();
        }
        if !self.line_has_content {
            // Slide below floats until the word fits or nothing intrudes.
            while self.available_at(self.y) < width {
                match self.next_float_bottom(self.y) {
                    Some(bottom) if bottom > self.y => self.y = bottom,
                    _ => break,
                }
            }
            self.line_used = width;
        } else {
            self.line_used += self.space + width;
        }
        self.line_has_content = true;
        self.margin_mark = None;
    }

    fn break_line(&mut self) {
        if self.line_has_content {
            self.y += self.line_height;
            self.line_used = Px::ZERO;
            self.line_has_content = false;
        }
    }

    fn hard_break(&mut self) {
        if self.line_has_content {
            self.break_line();
        } else {
            self.y += self.line_height;
            self.margin_mark = None;
        }
    }

    fn advance(&mut self, amount: Px) {
        if amount > Px::ZERO {
            self.y += amount;
            self.margin_mark = None;
        }
    }

    /// Adjacent vertical margins collapse to the larger one.
    fn margin(&mut self, amount: Px) {
        if amount <= Px::ZERO {
            return;
        }
        match self.margin_mark {
            Some(mark) if mark == self.y => {
                if amount > self.last_margin {
                    self.y += amount - self.last_margin;
                    self.last_margin = amount;
                }
            }
            _ => {
                self.y += amount;
                self.last_margin = amount;
            }
        }
        self.margin_mark = Some(self.y);
    }

    fn place_block(&mut self, height: Px) {
        self.break_line();
        self.y += height;
        self.margin_mark = None;
    }

    fn place_float(&mut self, side: FloatSide, width: Px, height: Px) {
        let remaining = self.available_at(self.y) - self.line_used;
        let top = if !self.line_has_content || remaining >= width {
            self.y
        } else {
            self.y + self.line_height
        };
        self.floats.push(FloatBox {
            side,
            top,
            bottom: top + height,
            width,
        });
        self.margin_mark = None;
    }

    fn finish(mut self) -> Px {
        self.break_line();
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    fn estimator(width: i32) -> FlowEstimator {
        FlowEstimator::new(
            EstimatorConfig {
                container_width: Px::from_i32(width),
                font_size: Px::from_i32(10),
                line_height: Some(1.2),
            },
            TextMeasurer::new(None),
            ImageSizer::new(None),
        )
    }

    fn node(html: &str) -> NodeRef {
        let doc = kuchiki::parse_html().one(html);
        doc.select_first("#c").expect("container").as_node().clone()
    }

    #[test]
    fn empty_container_has_zero_height() {
        let mut est = estimator(100);
        assert_eq!(est.outer_height(&node(r#"<div id="c"></div>"#)), Px::ZERO);
    }

    #[test]
    fn words_wrap_greedily() {
        // "aaaa" is 24px wide with a 6px space: three words per 100px line.
        let mut est = estimator(100);
        let words = vec!["aaaa"; 10].join(" ");
        let html = format!(r#"<div id="c">{words}</div>"#);
        assert_eq!(est.outer_height(&node(&html)), Px::from_i32(48));
    }

    #[test]
    fn floats_narrow_lines_without_adding_height() {
        let mut est = estimator(100);
        let html = r#"<div id="c"><img style="width: 60px; height: 24px; float: left">aaaa aaaa aaaa aaaa aaaa</div>"#;
        // Two one-word lines beside the float, then three words at full width.
        assert_eq!(est.outer_height(&node(html)), Px::from_i32(36));

        let only_float =
            r#"<div id="c"><img style="width: 60px; height: 24px; float: right"></div>"#;
        assert_eq!(est.outer_height(&node(only_float)), Px::ZERO);
    }

    #[test]
    fn unfloated_images_stack_and_hidden_nodes_are_skipped() {
        let mut est = estimator(100);
        let html = r#"<div id="c"><img width="50" height="40" style="padding: 0 0 10px 0"><p style="display: none">hidden words here</p>aaaa</div>"#;
        assert_eq!(est.outer_height(&node(html)), Px::from_i32(62));
    }

    #[test]
    fn paragraph_margins_collapse() {
        let mut est = estimator(100);
        let html = r#"<div id="c"><p>aaaa</p><p>aaaa</p></div>"#;
        // 10 + 12 + 10 (collapsed) + 12 + 10
        assert_eq!(est.outer_height(&node(html)), Px::from_i32(54));
    }

    #[test]
    fn min_height_and_padding_apply_to_container() {
        let mut est = estimator(100);
        let html = r#"<div id="c" style="min-height: 80px; padding: 5px">aaaa</div>"#;
        assert_eq!(est.outer_height(&node(html)), Px::from_i32(90));
        let reset = r#"<div id="c" style="min-height: 0">aaaa</div>"#;
        assert_eq!(est.outer_height(&node(reset)), Px::from_i32(12));
    }

    #[test]
    fn image_box_resolves_attributes_and_padding() {
        let mut est = estimator(100);
        let html = r#"<div><img id="c" width="200" height="100" style="padding: 10px 10px 10px 0"></div>"#;
        let img = node(html);
        assert_eq!(est.image_box(&img), (Px::from_i32(210), Px::from_i32(120)));
        assert_eq!(est.outer_height(&img), Px::from_i32(120));

        let bare = node(r#"<div><img id="c"></div>"#);
        assert_eq!(est.outer_height(&bare), Px::from_i32(DEFAULT_IMAGE_SIZE));
    }

    #[test]
    fn closure_provider_is_called_per_query() {
        let mut calls = 0;
        {
            let mut provider = FnHeight(|_: &NodeRef| {
                calls += 1;
                Px::from_i32(5)
            });
            let n = node(r#"<div id="c"></div>"#);
            assert_eq!(provider.outer_height(&n), Px::from_i32(5));
            assert_eq!(provider.outer_height(&n), Px::from_i32(5));
        }
        assert_eq!(calls, 2);
    }
}
