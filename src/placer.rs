//! The placement pass.
//!
//! Images are hidden, chunks are replayed in document order, and before each
//! chunk the container height is compared against a running threshold. When
//! the threshold is reached the next image is styled for its pattern position
//! and spliced in, and the threshold moves to the new height plus the image
//! height plus the configured offset.

use crate::container::{Chunk, Container, Hidden, SelectOutcome, style_image};
use crate::debug::{DebugLogger, Field, trace_enabled};
use crate::error::AutoPlaceError;
use crate::measure::HeightProvider;
use crate::metrics::PlacementMetrics;
use crate::options::{PlacementOptions, TrailingImages};
use crate::perf::PerfLogger;
use crate::position::Position;
use crate::types::{Edges, Px};
use kuchiki::NodeRef;
use std::time::Instant;

/// One image spliced into the container.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Index among the images matched by the image selector.
    pub image_index: usize,
    /// Chunk the image was placed before; `None` for images appended after the
    /// last chunk.
    pub chunk_index: Option<usize>,
    pub position: Position,
    pub padding: Edges,
    /// Container height that triggered the placement.
    pub height_before: Px,
    pub image_height: Px,
    /// Height the container must reach before the next image.
    pub next_threshold: Px,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementReport {
    pub placements: Vec<Placement>,
    /// Images that were matched but never placed.
    pub unplaced: Vec<usize>,
    pub metrics: PlacementMetrics,
}

impl PlacementReport {
    pub fn placed(&self) -> usize {
        self.placements.len()
    }

    pub fn position_of(&self, image_index: usize) -> Option<Position> {
        self.placements
            .iter()
            .find(|p| p.image_index == image_index)
            .map(|p| p.position)
    }
}

/// Optional sinks for one pass.
#[derive(Clone, Copy, Default)]
pub(crate) struct PassLog<'a> {
    pub debug: Option<&'a DebugLogger>,
    pub perf: Option<&'a PerfLogger>,
    pub container_id: usize,
}

/// Counts height queries on the way through.
struct Counting<'a> {
    inner: &'a mut dyn HeightProvider,
    queries: usize,
}

impl Counting<'_> {
    fn height(&mut self, node: &NodeRef) -> Px {
        self.queries += 1;
        self.inner.outer_height(node)
    }
}

enum ChunkSource {
    Words(Vec<String>),
    Nodes(Vec<Hidden>),
}

impl ChunkSource {
    fn len(&self) -> usize {
        match self {
            ChunkSource::Words(words) => words.len(),
            ChunkSource::Nodes(nodes) => nodes.len(),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            ChunkSource::Words(_) => "words",
            ChunkSource::Nodes(_) => "selector",
        }
    }
}

/// Redistribute the images of `container` between its chunks.
///
/// The container is mutated in place. `heights` is queried after every
/// mutation that can influence a placement decision.
pub fn place_images(
    container: &NodeRef,
    options: &PlacementOptions,
    heights: &mut dyn HeightProvider,
) -> Result<PlacementReport, AutoPlaceError> {
    run_pass(container, options, heights, PassLog::default())
}

/// The chunks a pass over `container` would iterate, without mutating it.
pub fn collect_chunks(container: &NodeRef, options: &PlacementOptions) -> Vec<Chunk> {
    let container = Container::new(container.clone());
    if options.uses_chunk_selector() {
        container
            .select(&options.chunk_selector)
            .into_nodes()
            .into_iter()
            .map(Chunk::Node)
            .collect()
    } else {
        container.words().into_iter().map(Chunk::Word).collect()
    }
}

pub(crate) fn run_pass(
    node: &NodeRef,
    options: &PlacementOptions,
    heights: &mut dyn HeightProvider,
    log: PassLog<'_>,
) -> Result<PlacementReport, AutoPlaceError> {
    options.validate()?;
    let started = Instant::now();
    let container = Container::new(node.clone());
    let mut heights = Counting {
        inner: heights,
        queries: 0,
    };

    let images: Vec<Hidden> = selected(&container, &options.img_selector, "img_selector", log)
        .into_iter()
        .map(Hidden::hide)
        .collect();
    let previous_min_height = container.suspend_min_height();

    let chunks = if options.uses_chunk_selector() {
        let nodes = selected(&container, &options.chunk_selector, "chunk_selector", log)
            .into_iter()
            .filter(|chunk| !images.iter().any(|img| img.node == *chunk))
            .map(Hidden::hide)
            .collect();
        ChunkSource::Nodes(nodes)
    } else {
        ChunkSource::Words(container.words())
    };
    let chunk_count = chunks.len();

    if let Some(debug) = log.debug {
        debug.event(
            "place.begin",
            &[
                ("container", Field::Int(log.container_id as i64)),
                ("mode", Field::Str(chunks.mode())),
                ("chunks", Field::Int(chunk_count as i64)),
                ("images", Field::Int(images.len() as i64)),
                ("initial_offset", Field::Px(options.initial_offset)),
                ("trailing", Field::Str(options.trailing_images.as_str())),
            ],
        );
    }

    let mut report = PlacementReport::default();

    if chunk_count == 0 {
        // Nothing to interleave with: undo the hiding and leave the content be.
        for image in &images {
            image.reveal();
        }
        container.restore_min_height(previous_min_height.as_deref());
        report.unplaced = (0..images.len()).collect();
        finish(&mut report, &heights, started, 0, images.len(), log);
        return Ok(report);
    }

    if let ChunkSource::Words(_) = chunks {
        container.clear();
    }

    let mut threshold = options.initial_offset;
    let mut next = 0usize;
    for chunk_index in 0..chunk_count {
        if next < images.len() {
            let height = heights.height(container.node());
            if height >= threshold {
                let image = &images[next];
                let position = options.loop_pattern.at(next);
                let padding = style_image(&image.node, position, options.padding, chunk_index == 0);
                image.reveal();
                match &chunks {
                    ChunkSource::Nodes(nodes) => {
                        container.insert_before(&nodes[chunk_index].node, &image.node)
                    }
                    ChunkSource::Words(_) => container.append(&image.node),
                }
                let after = heights.height(container.node());
                let image_height = heights.height(&image.node);
                threshold = after + image_height + options.offset;
                record(
                    &mut report,
                    Placement {
                        image_index: next,
                        chunk_index: Some(chunk_index),
                        position,
                        padding,
                        height_before: height,
                        image_height,
                        next_threshold: threshold,
                    },
                    log,
                );
                next += 1;
            }
        }

        match &chunks {
            ChunkSource::Nodes(nodes) => nodes[chunk_index].reveal(),
            ChunkSource::Words(words) => container.append_word(&words[chunk_index]),
        }
    }

    match options.trailing_images {
        TrailingImages::Append => {
            while next < images.len() {
                let image = &images[next];
                let position = options.loop_pattern.at(next);
                let height = heights.height(container.node());
                let padding = style_image(&image.node, position, options.padding, false);
                image.reveal();
                container.append(&image.node);
                let image_height = heights.height(&image.node);
                threshold = heights.height(container.node()) + image_height + options.offset;
                record(
                    &mut report,
                    Placement {
                        image_index: next,
                        chunk_index: None,
                        position,
                        padding,
                        height_before: height,
                        image_height,
                        next_threshold: threshold,
                    },
                    log,
                );
                next += 1;
            }
        }
        TrailingImages::Drop => {
            report.unplaced = (next..images.len()).collect();
            if let Some(debug) = log.debug {
                for index in &report.unplaced {
                    debug.event(
                        "place.unplaced",
                        &[
                            ("container", Field::Int(log.container_id as i64)),
                            ("image", Field::Int(*index as i64)),
                        ],
                    );
                }
            }
        }
    }

    container.restore_min_height(previous_min_height.as_deref());
    finish(&mut report, &heights, started, chunk_count, images.len(), log);
    Ok(report)
}

fn selected(container: &Container, selector: &str, option: &str, log: PassLog<'_>) -> Vec<NodeRef> {
    match container.select(selector) {
        SelectOutcome::Matched(nodes) => nodes,
        SelectOutcome::Invalid => {
            if let Some(debug) = log.debug {
                debug.event(
                    "selector.invalid",
                    &[
                        ("container", Field::Int(log.container_id as i64)),
                        ("option", Field::Str(option)),
                        ("selector", Field::Str(selector)),
                    ],
                );
                debug.increment("selector.invalid", 1);
            }
            if trace_enabled() {
                eprintln!("[autoplace.debug.selector] {option}={selector:?} is not a valid selector; matching nothing");
            }
            Vec::new()
        }
    }
}

fn record(report: &mut PlacementReport, placement: Placement, log: PassLog<'_>) {
    if let Some(debug) = log.debug {
        let chunk = placement.chunk_index.map(|c| c as i64).unwrap_or(-1);
        debug.event(
            "place.image",
            &[
                ("container", Field::Int(log.container_id as i64)),
                ("image", Field::Int(placement.image_index as i64)),
                ("chunk", Field::Int(chunk)),
                ("position", Field::Str(placement.position.as_str())),
                ("height", Field::Px(placement.height_before)),
                ("image_height", Field::Px(placement.image_height)),
                ("next_threshold", Field::Px(placement.next_threshold)),
                ("trailing", Field::Bool(placement.chunk_index.is_none())),
            ],
        );
        debug.increment("place.image", 1);
    }
    if trace_enabled() {
        eprintln!(
            "[autoplace.debug.place] container={} image={} chunk={:?} position={} height={:.3} next_threshold={:.3}",
            log.container_id,
            placement.image_index,
            placement.chunk_index,
            placement.position,
            placement.height_before.to_f32(),
            placement.next_threshold.to_f32()
        );
    }
    report.placements.push(placement);
}

fn finish(
    report: &mut PlacementReport,
    heights: &Counting<'_>,
    started: Instant,
    chunk_count: usize,
    image_count: usize,
    log: PassLog<'_>,
) {
    let trailing = report
        .placements
        .iter()
        .filter(|p| p.chunk_index.is_none())
        .count();
    report.metrics = PlacementMetrics {
        chunk_count,
        image_count,
        placed: report.placements.len(),
        trailing,
        dropped: report.unplaced.len(),
        height_queries: heights.queries,
        pass_ms: started.elapsed().as_secs_f64() * 1000.0,
    };
    if let Some(debug) = log.debug {
        debug.increment("place.chunks", chunk_count as u64);
        debug.increment("place.height_queries", heights.queries as u64);
    }
    if let Some(perf) = log.perf {
        perf.log_span_ms("place.pass", log.container_id, report.metrics.pass_ms);
        perf.log_counts(
            "place.counts",
            log.container_id,
            &[
                ("chunks", chunk_count as u64),
                ("images", image_count as u64),
                ("placed", report.metrics.placed as u64),
                ("unplaced", report.metrics.dropped as u64),
                ("height_queries", heights.queries as u64),
            ],
        );
    }
}
