mod assets;
mod container;
mod debug;
mod error;
mod font;
mod html;
mod inline_style;
mod measure;
mod metrics;
mod options;
mod perf;
mod placer;
mod position;
#[cfg(feature = "python")]
mod python;
mod types;

pub use assets::ImageSizer;
pub use container::Chunk;
use debug::{DebugLogger, Field};
pub use error::AutoPlaceError;
pub use font::{FontMetrics, TextMeasurer};
pub use html::{HtmlLayoutWarning, scan_layout_warnings};
pub use inline_style::{FloatSide, InlineStyle, parse_length};
pub use measure::{EstimatorConfig, FlowEstimator, FnHeight, HeightProvider};
pub use metrics::{DocumentMetrics, PlacementMetrics};
pub use options::{PlacementOptions, TrailingImages};
use perf::PerfLogger;
pub use placer::{Placement, PlacementReport, collect_chunks, place_images};
pub use position::{LoopPattern, Position};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
pub use types::{Edges, Px};

/// Rewrites containers so their images sit between chunks of text at
/// regular vertical intervals.
#[derive(Clone)]
pub struct ImageAutoPlace {
    options: PlacementOptions,
    estimator: EstimatorConfig,
    font: Option<FontMetrics>,
    asset_base_dir: Option<PathBuf>,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
    next_container_id: Arc<AtomicUsize>,
}

/// Result of rewriting an HTML document.
#[derive(Debug, Clone)]
pub struct HtmlPlacement {
    pub html: String,
    pub reports: Vec<PlacementReport>,
    pub metrics: DocumentMetrics,
}

#[derive(Clone)]
pub struct ImageAutoPlaceBuilder {
    options: PlacementOptions,
    padding: Option<f32>,
    offset: Option<f32>,
    initial_offset: Option<f32>,
    loop_pattern_names: Option<String>,
    container_width: f32,
    font_size: f32,
    line_height: Option<f32>,
    font_file: Option<PathBuf>,
    asset_base_dir: Option<PathBuf>,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl ImageAutoPlace {
    pub fn builder() -> ImageAutoPlaceBuilder {
        ImageAutoPlaceBuilder::new()
    }

    pub fn options(&self) -> &PlacementOptions {
        &self.options
    }

    /// A fresh built-in height estimator with this engine's metrics.
    pub fn estimator(&self) -> FlowEstimator {
        FlowEstimator::new(
            self.estimator,
            TextMeasurer::new(self.font.clone()),
            ImageSizer::new(self.asset_base_dir.clone()),
        )
    }

    /// Lay out `container` using the built-in estimator.
    pub fn place(&self, container: &kuchiki::NodeRef) -> Result<PlacementReport, AutoPlaceError> {
        let mut estimator = self.estimator();
        self.place_with(container, &mut estimator)
    }

    /// Lay out `container` with heights reported by `heights`.
    pub fn place_with(
        &self,
        container: &kuchiki::NodeRef,
        heights: &mut dyn HeightProvider,
    ) -> Result<PlacementReport, AutoPlaceError> {
        let container_id = self.next_container_id.fetch_add(1, Ordering::Relaxed);
        placer::run_pass(
            container,
            &self.options,
            heights,
            placer::PassLog {
                debug: self.debug.as_deref(),
                perf: self.perf.as_deref(),
                container_id,
            },
        )
    }

    /// Rewrite every element matching `container_selector` and return the
    /// serialized document.
    pub fn place_html(&self, html: &str, container_selector: &str) -> Result<String, AutoPlaceError> {
        self.place_html_report(html, container_selector)
            .map(|placement| placement.html)
    }

    pub fn place_html_report(
        &self,
        html: &str,
        container_selector: &str,
    ) -> Result<HtmlPlacement, AutoPlaceError> {
        let started = Instant::now();
        let document = html::parse_document(html);
        let parse_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(perf) = self.perf.as_deref() {
            perf.log_span_ms("place_html.parse", 0, parse_ms);
        }
        let containers = html::select_containers(&document, container_selector)?;
        let result = self.place_all(&containers);
        self.emit_debug_summary("place_html");
        let (reports, metrics) = result?;
        Ok(HtmlPlacement {
            html: html::serialize(&document)?,
            reports,
            metrics,
        })
    }

    /// Treat the whole fragment as one container and return the rewritten
    /// fragment markup.
    pub fn place_fragment(&self, fragment: &str) -> Result<String, AutoPlaceError> {
        let document = html::parse_document(fragment);
        let body = document
            .select_first("body")
            .map_err(|()| AutoPlaceError::ContainerNotFound("body".to_string()))?;
        let body = body.as_node().clone();
        let result = self.place_all(std::slice::from_ref(&body));
        self.emit_debug_summary("place_fragment");
        result?;
        html::serialize_children(&body)
    }

    fn place_all(
        &self,
        containers: &[kuchiki::NodeRef],
    ) -> Result<(Vec<PlacementReport>, DocumentMetrics), AutoPlaceError> {
        let mut reports = Vec::with_capacity(containers.len());
        let mut metrics = DocumentMetrics::default();
        for container in containers {
            self.emit_layout_warnings(container);
            let report = self.place(container)?;
            metrics.push(report.metrics.clone());
            reports.push(report);
        }
        Ok((reports, metrics))
    }

    fn emit_layout_warnings(&self, container: &kuchiki::NodeRef) {
        let warnings = html::scan_layout_warnings(container, &self.options.img_selector);
        for warning in warnings {
            let detail_preview = if warning.details.is_empty() {
                String::new()
            } else {
                let mut preview = warning.details.clone();
                if preview.len() > 3 {
                    preview.truncate(3);
                    preview.push("...".to_string());
                }
                format!(" ({})", preview.join(", "))
            };
            if debug::trace_enabled() {
                eprintln!("[autoplace][layout] {}{}", warning.message, detail_preview);
            }
            if let Some(logger) = self.debug.as_deref() {
                logger.event(
                    "layout.warning",
                    &[
                        ("kind", Field::Str(&warning.kind)),
                        ("message", Field::Str(&warning.message)),
                        ("details", Field::Int(warning.details.len() as i64)),
                    ],
                );
            }
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }
}

impl Default for ImageAutoPlaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageAutoPlaceBuilder {
    pub fn new() -> Self {
        Self {
            options: PlacementOptions::default(),
            padding: None,
            offset: None,
            initial_offset: None,
            loop_pattern_names: None,
            container_width: 600.0,
            font_size: 16.0,
            line_height: None,
            font_file: None,
            asset_base_dir: None,
            debug_path: None,
            perf_path: None,
        }
    }

    /// Start from a complete option set; later setters still override it.
    pub fn options(mut self, options: PlacementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn padding(mut self, px: f32) -> Self {
        self.padding = Some(px);
        self
    }

    pub fn offset(mut self, px: f32) -> Self {
        self.offset = Some(px);
        self
    }

    pub fn initial_offset(mut self, px: f32) -> Self {
        self.initial_offset = Some(px);
        self
    }

    pub fn img_selector(mut self, selector: impl Into<String>) -> Self {
        self.options.img_selector = selector.into();
        self
    }

    pub fn chunk_selector(mut self, selector: impl Into<String>) -> Self {
        self.options.chunk_selector = selector.into();
        self
    }

    pub fn loop_pattern(mut self, pattern: LoopPattern) -> Self {
        self.options.loop_pattern = pattern;
        self.loop_pattern_names = None;
        self
    }

    // Names such as "left, right"; parsed in build().
    pub fn loop_pattern_names(mut self, names: impl Into<String>) -> Self {
        self.loop_pattern_names = Some(names.into());
        self
    }

    pub fn trailing_images(mut self, policy: TrailingImages) -> Self {
        self.options.trailing_images = policy;
        self
    }

    pub fn container_width(mut self, px: f32) -> Self {
        self.container_width = px;
        self
    }

    pub fn font_size(mut self, px: f32) -> Self {
        self.font_size = px;
        self
    }

    pub fn line_height(mut self, factor: f32) -> Self {
        self.line_height = Some(factor);
        self
    }

    // TrueType/OpenType file whose advances drive word widths.
    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    // Directory relative image paths are resolved against.
    pub fn asset_base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.asset_base_dir = Some(path.into());
        self
    }

    // Enable debug logging to a JSONL file of placement decisions.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    // Enable performance logging to a JSONL file of pass timings and counts.
    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ImageAutoPlace, AutoPlaceError> {
        let mut options = self.options;
        if let Some(px) = self.padding {
            options.padding = options::px_option("padding", px)?;
        }
        if let Some(px) = self.offset {
            options.offset = options::px_option("offset", px)?;
        }
        if let Some(px) = self.initial_offset {
            options.initial_offset = options::px_option("initial_offset", px)?;
        }
        if let Some(names) = self.loop_pattern_names.as_deref() {
            options.loop_pattern = LoopPattern::parse(names)?;
        }
        options.validate()?;

        for (name, value) in [
            ("container_width", self.container_width),
            ("font_size", self.font_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AutoPlaceError::InvalidConfiguration(format!(
                    "{name} must be a positive number of pixels"
                )));
            }
        }
        if let Some(factor) = self.line_height {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(AutoPlaceError::InvalidConfiguration(
                    "line_height must be a positive multiple of the font size".to_string(),
                ));
            }
        }

        let font = match self.font_file.as_ref() {
            Some(path) => Some(FontMetrics::from_file(path)?),
            None => None,
        };
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let perf = if let Some(path) = self.perf_path {
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(ImageAutoPlace {
            options,
            estimator: EstimatorConfig {
                container_width: Px::from_f32(self.container_width),
                font_size: Px::from_f32(self.font_size),
                line_height: self.line_height,
            },
            font,
            asset_base_dir: self.asset_base_dir,
            debug,
            perf,
            next_container_id: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::tests::temp_log_path;
    use kuchiki::traits::TendrilSink;

    const ARTICLE: &str = r#"<html><body>
        <div id="content" style="width: 300px">
          <img id="a" style="width: 100px; height: 60px" src="">
          <img id="b" style="width: 100px; height: 60px" src="">
          <img id="c" style="width: 100px; height: 60px" src="">
          Lorem ipsum dolor sit amet, consectetur adipiscing elit. Aenean volutpat
          mi eget nisi sagittis ac auctor ligula feugiat. Nam congue molestie arcu
          at ornare. Aliquam dictum viverra eros, in laoreet ligula venenatis id.
          Maecenas quis lectus ac nibh mattis cursus. Duis iaculis scelerisque.
          Lorem ipsum dolor sit amet, consectetur adipiscing elit. Aenean volutpat
          mi eget nisi sagittis ac auctor ligula feugiat. Nam congue molestie arcu
          at ornare. Aliquam dictum viverra eros, in laoreet ligula venenatis id.
        </div>
    </body></html>"#;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn builder_rejects_invalid_numbers() {
        let err = ImageAutoPlace::builder()
            .padding(-1.0)
            .build()
            .err()
            .expect("negative padding");
        assert!(matches!(err, AutoPlaceError::InvalidConfiguration(_)));
        assert!(ImageAutoPlace::builder().offset(f32::NAN).build().is_err());
        assert!(ImageAutoPlace::builder().container_width(0.0).build().is_err());
        assert!(ImageAutoPlace::builder().line_height(-1.2).build().is_err());
        assert!(
            ImageAutoPlace::builder()
                .loop_pattern_names("left, diagonal")
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_setters_override_options() {
        let engine = ImageAutoPlace::builder()
            .options(PlacementOptions {
                chunk_selector: "p".to_string(),
                ..PlacementOptions::default()
            })
            .padding(4.0)
            .offset(50.0)
            .initial_offset(20.0)
            .loop_pattern_names("left right")
            .build()
            .expect("engine");
        let options = engine.options();
        assert_eq!(options.padding, Px::from_i32(4));
        assert_eq!(options.offset, Px::from_i32(50));
        assert_eq!(options.initial_offset, Px::from_i32(20));
        assert_eq!(options.chunk_selector, "p");
        assert_eq!(options.loop_pattern, LoopPattern::alternating());
    }

    #[test]
    fn missing_font_file_is_an_asset_error() {
        let err = ImageAutoPlace::builder()
            .font_file("/nonexistent/font.ttf")
            .build()
            .err()
            .expect("missing font");
        assert!(matches!(err, AutoPlaceError::Asset(_)), "{err}");
    }

    #[test]
    fn place_html_spreads_images_through_the_text() {
        let engine = ImageAutoPlace::builder()
            .offset(40.0)
            .container_width(300.0)
            .loop_pattern_names("left,right")
            .build()
            .expect("engine");
        let placed = engine
            .place_html_report(ARTICLE, "#content")
            .expect("placement");
        assert_eq!(placed.reports.len(), 1);
        let report = &placed.reports[0];
        assert_eq!(report.metrics.image_count, 3);
        assert!(report.placed() >= 2, "expected at least two placements: {report:?}");
        let chunks: Vec<usize> = report.placements.iter().filter_map(|p| p.chunk_index).collect();
        assert_eq!(chunks[0], 0);
        assert!(chunks.windows(2).all(|w| w[0] < w[1]));

        let doc = kuchiki::parse_html().one(placed.html.as_str());
        let content = doc.select_first("#content").expect("content");
        let original = kuchiki::parse_html().one(ARTICLE);
        let original_words = words(&original.select_first("#content").expect("content").text_contents());
        assert_eq!(words(&content.text_contents()), original_words);
        assert_eq!(
            InlineStyle::of(doc.select_first("#a").expect("a").as_node()).get("float"),
            Some("left")
        );
        assert_eq!(
            InlineStyle::of(content.as_node()).get("min-height"),
            None,
            "temporary min-height must not leak into the output"
        );
    }

    #[test]
    fn place_html_requires_a_container() {
        let engine = ImageAutoPlace::builder().build().expect("engine");
        assert!(matches!(
            engine.place_html("<p>x</p>", "#content"),
            Err(AutoPlaceError::ContainerNotFound(_))
        ));
    }

    #[test]
    fn place_fragment_uses_body_as_container() {
        let engine = ImageAutoPlace::builder()
            .loop_pattern(LoopPattern::alternating())
            .build()
            .expect("engine");
        let out = engine
            .place_fragment(r#"<img width="10" height="10">one two three"#)
            .expect("fragment");
        assert!(out.starts_with("<img "), "unexpected fragment: {out}");
        assert!(
            out.contains(r#"style="padding: 0 10px 10px 0; float: left""#),
            "unexpected fragment: {out}"
        );
        assert!(out.ends_with("one two three "), "unexpected fragment: {out}");
    }

    #[test]
    fn place_with_accepts_injected_heights() {
        let engine = ImageAutoPlace::builder().offset(0.0).build().expect("engine");
        let doc = kuchiki::parse_html().one(
            r#"<div id="c"><img id="x"><img id="y">a b c d</div>"#,
        );
        let container = doc.select_first("#c").expect("c").as_node().clone();
        let mut step = 0;
        let mut heights = FnHeight(|_: &kuchiki::NodeRef| {
            step += 1;
            Px::from_i32(step)
        });
        let report = engine.place_with(&container, &mut heights).expect("pass");
        // x at chunk 0 moves the threshold to 2 + 3; the height reaches 5 at chunk 2.
        let chunks: Vec<Option<usize>> = report.placements.iter().map(|p| p.chunk_index).collect();
        assert_eq!(chunks, vec![Some(0), Some(2)]);
    }

    #[test]
    fn debug_and_perf_logs_record_each_placement() {
        let debug_path = temp_log_path("engine_debug");
        let perf_path = temp_log_path("engine_perf");
        {
            let engine = ImageAutoPlace::builder()
                .offset(0.0)
                .debug_log(&debug_path)
                .perf_log(&perf_path)
                .build()
                .expect("engine");
            let placed = engine
                .place_html_report(ARTICLE, "#content")
                .expect("placement");
            let debug_text = std::fs::read_to_string(&debug_path).expect("debug log");
            let placements = debug_text
                .lines()
                .filter(|line| line.contains(r#""type":"place.image""#))
                .count();
            assert_eq!(placements, placed.reports[0].placed());
            assert!(debug_text.contains(r#""type":"debug.summary","context":"place_html""#));
            let begin = debug_text
                .lines()
                .find(|line| line.contains(r#""type":"place.begin""#))
                .expect("place.begin event");
            assert!(begin.contains(r#""trailing":"drop""#), "{begin}");
            let perf_text = std::fs::read_to_string(&perf_path).expect("perf log");
            assert!(perf_text.contains(r#""name":"place.pass""#), "{perf_text}");
        }
        let hot = perf_path.with_file_name(format!(
            "{}_hot.log",
            perf_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
        ));
        let _ = std::fs::remove_file(&debug_path);
        let _ = std::fs::remove_file(&perf_path);
        let _ = std::fs::remove_file(&hot);
    }
}
