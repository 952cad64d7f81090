//! Greedy first-fit pagination driven by measured heights.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::MeasureError;
use crate::stats::StatsCollector;
use crate::types::{ChapterContent, ChapterKey, Typography, Viewport};

use super::measure::LayoutMeasurementProvider;
use super::nodes::{ContentNode, join_markup, parse_nodes};

/// Pages of one chapter laid out for one typography/viewport combination.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSet {
    pub source_key: ChapterKey,
    pub typography_signature: String,
    pub pages: Vec<String>,
}

impl PageSet {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    /// Whether this set was computed for `key` under `signature`.
    pub fn matches(&self, key: &ChapterKey, signature: &str) -> bool {
        &self.source_key == key && self.typography_signature == signature
    }
}

/// Parsed nodes together with the node ranges that make up each page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub nodes: Vec<ContentNode>,
    pub pages: Vec<Range<usize>>,
}

impl PagePlan {
    pub fn page_markup(&self, page: usize) -> Option<String> {
        self.pages.get(page).map(|range| join_markup(&self.nodes[range.clone()]))
    }
}

/// Splits chapter bodies into viewport-sized pages.
#[derive(Debug, Clone)]
pub struct Paginator<M> {
    measurer: M,
    page_height_ratio: f32,
    stats: Option<Arc<StatsCollector>>,
}

impl<M: LayoutMeasurementProvider> Paginator<M> {
    pub fn new(measurer: M, page_height_ratio: f32) -> Self {
        Self { measurer, page_height_ratio, stats: None }
    }

    pub fn with_stats(mut self, stats: Arc<StatsCollector>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Height a page may fill for the given viewport.
    pub fn target_height(&self, viewport: Viewport) -> f32 {
        viewport.height * self.page_height_ratio
    }

    /// Lay out `content` and wrap the pages with their provenance.
    pub fn paginate_chapter(&self, content: &ChapterContent, typography: &Typography, viewport: Viewport) -> PageSet {
        PageSet {
            source_key: content.key.clone(),
            typography_signature: typography.signature(viewport),
            pages: self.paginate(&content.resolved_body(), typography, viewport),
        }
    }

    /// Split `body` into page fragments. Never returns an empty list: whenever no page break
    /// is found, or measuring fails, the single page is `body` verbatim.
    pub fn paginate(&self, body: &str, typography: &Typography, viewport: Viewport) -> Vec<String> {
        let started = Instant::now();
        let pages = match self.plan(body, typography, viewport) {
            Ok(plan) if plan.pages.len() > 1 => {
                (0..plan.pages.len()).filter_map(|page| plan.page_markup(page)).collect()
            }
            Ok(_) => vec![body.to_string()],
            Err(err) => {
                warn!(error = %err, "measurement failed; showing chapter as a single page");
                vec![body.to_string()]
            }
        };
        if let Some(stats) = &self.stats {
            stats.record_pagination(started.elapsed());
        }
        debug!(pages = pages.len(), "pagination finished");
        pages
    }

    /// Compute page boundaries over the parsed nodes of `body`.
    pub fn plan(&self, body: &str, typography: &Typography, viewport: Viewport) -> Result<PagePlan, MeasureError> {
        let nodes = parse_nodes(body);
        let target = self.target_height(viewport);
        let width = typography.content_width(viewport.width);

        let mut pages = Vec::new();
        let mut start = 0;
        for index in 0..nodes.len() {
            let height = self.measure(&nodes[start..=index], typography, width)?;
            if height <= target {
                continue;
            }
            if index > start {
                debug!(page = pages.len(), nodes = index - start, height, target, "page break");
                pages.push(start..index);
                start = index;
            } else if nodes[index].is_large() {
                debug!(node = index, height, target, "oversized node kept whole on its own page");
            }
        }
        if start < nodes.len() {
            pages.push(start..nodes.len());
        }

        Ok(PagePlan { nodes, pages })
    }

    fn measure(&self, nodes: &[ContentNode], typography: &Typography, width: f32) -> Result<f32, MeasureError> {
        let height = self.measurer.measure_height(&join_markup(nodes), typography, width)?;
        if height.is_finite() && height >= 0.0 { Ok(height) } else { Err(MeasureError::InvalidHeight(height)) }
    }
}
