//! Reading session: ties content, layout, positions, settings and input together for one reader.

use std::sync::Arc;

use chrono::NaiveTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ContentCache;
use crate::config::EngineConfig;
use crate::error::{FetchError, ImportError, InvalidSetting};
use crate::input::{Action, InputEvent, NavContext, dispatch};
use crate::layout::{Debouncer, LayoutMeasurementProvider, PageSet, Paginator, PendingRun, repagination_delay};
use crate::night;
use crate::settings::{ReaderSettings, SettingsStore};
use crate::stats::StatsSnapshot;
use crate::store::PositionStore;
use crate::types::{ChapterContent, ChapterKey, PageCursor, Position, ScrollMetrics, UiMode, Viewport};

pub type Result<T> = std::result::Result<T, FetchError>;

/// Host-side scrollable view of the rendered chapter.
pub trait ScrollSurface: Send {
    fn metrics(&self) -> ScrollMetrics;
    fn scroll_to(&mut self, offset: f64);
}

/// What the host has to do after the session handled an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// Scroll the continuous view by this many pixels.
    ScrollBy(f32),
    /// Show page `index` of `count`.
    PageChanged { index: usize, count: usize },
    /// A different chapter is now current; render it from the start.
    ChapterOpened(ChapterKey),
    ControlsVisible(bool),
}

#[derive(Debug)]
pub struct ReadingSession<M> {
    cache: Arc<ContentCache>,
    settings: SettingsStore,
    positions: PositionStore,
    paginator: Paginator<M>,
    config: EngineConfig,
    viewport: Viewport,
    current: Option<Arc<ChapterContent>>,
    pages: Option<PageSet>,
    page_index: usize,
    scroll: ScrollMetrics,
    controls_visible: bool,
    debouncer: Debouncer,
    background: Vec<JoinHandle<()>>,
}

impl<M: LayoutMeasurementProvider> ReadingSession<M> {
    pub fn new(
        cache: Arc<ContentCache>,
        settings: SettingsStore,
        positions: PositionStore,
        measurer: M,
        config: EngineConfig,
    ) -> Self {
        let paginator = Paginator::new(measurer, config.page_height_ratio).with_stats(cache.stats());
        Self {
            cache,
            settings,
            positions,
            paginator,
            config,
            viewport: Viewport::default(),
            current: None,
            pages: None,
            page_index: 0,
            scroll: ScrollMetrics::default(),
            controls_visible: false,
            debouncer: Debouncer::new(),
            background: Vec::new(),
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn settings(&self) -> &ReaderSettings {
        self.settings.get()
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn current(&self) -> Option<&Arc<ChapterContent>> {
        self.current.as_ref()
    }

    pub fn pages(&self) -> Option<&PageSet> {
        self.pages.as_ref()
    }

    pub fn current_page(&self) -> Option<&str> {
        self.pages.as_ref().and_then(|pages| pages.page(self.page_index))
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn ui_mode(&self) -> UiMode {
        match &self.pages {
            Some(pages) if self.settings.get().page_mode => {
                UiMode::Paged(PageCursor { index: self.page_index, count: pages.len() })
            }
            _ => UiMode::Continuous,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.cache.stats().snapshot()
    }

    /// Make `key` the current chapter: fetch it, lay it out in page mode, restore the saved page
    /// and start prefetching the next chapter.
    ///
    /// On failure the previously open chapter stays current.
    pub async fn open(&mut self, key: &ChapterKey) -> Result<Arc<ChapterContent>> {
        let content = self.cache.get(key).await?;
        info!(chapter = %key, title = %content.title, "chapter opened");

        self.debouncer.cancel();
        self.current = Some(Arc::clone(&content));
        self.pages = None;
        self.page_index = 0;
        self.scroll = ScrollMetrics::default();

        if self.settings.get().page_mode {
            self.repaginate_now();
            if self.settings.get().save_position {
                if let Some(Position::Page { page }) = self.positions.restore(key) {
                    let count = self.pages.as_ref().map_or(1, PageSet::len);
                    self.page_index = (page as usize).min(count.saturating_sub(1));
                    debug!(chapter = %key, page = self.page_index, "restored page");
                }
            }
        }

        if let Some(next) = content.next_key() {
            let handle = self.cache.spawn_prefetch(next);
            self.track(handle);
        }
        Ok(content)
    }

    /// Resolve an input event against the current state and apply it.
    pub async fn handle(&mut self, event: &InputEvent, scroll: ScrollMetrics) -> Result<Effect> {
        self.scroll = scroll;
        let ctx = self.nav_context();
        let action = dispatch(self.settings.get(), &self.config, &ctx, event);
        debug!(?event, ?action, "input dispatched");

        let effect = match action {
            Action::None => Effect::None,
            Action::ScrollBy(delta) => Effect::ScrollBy(delta),
            Action::PrevPage => self.turn_page(-1),
            Action::NextPage => self.turn_page(1),
            Action::PrevChapter => self.navigate(|content| content.prev_key()).await?,
            Action::NextChapter => self.navigate(|content| content.next_key()).await?,
            Action::ToggleControls => {
                self.controls_visible = !self.controls_visible;
                Effect::ControlsVisible(self.controls_visible)
            }
            Action::HideControls => {
                self.controls_visible = false;
                Effect::ControlsVisible(false)
            }
        };
        Ok(effect)
    }

    /// Jump straight to a page, as from a page slider.
    pub fn go_to_page(&mut self, index: usize) -> Effect {
        let Some(count) = self.pages.as_ref().map(PageSet::len) else {
            return Effect::None;
        };
        let index = index.min(count.saturating_sub(1));
        if index == self.page_index {
            return Effect::None;
        }
        self.page_index = index;
        self.save_page();
        Effect::PageChanged { index, count }
    }

    /// Record the continuous-mode scroll position. Saves are throttled.
    pub fn record_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        self.scroll = metrics;
        let (Some(content), UiMode::Continuous) = (&self.current, self.ui_mode()) else {
            return false;
        };
        if !self.settings.get().save_position {
            return false;
        }
        self.positions.save(&content.key, Position::percent(metrics.percent()))
    }

    /// Scroll the surface back to the saved percentage once the chapter has been laid out.
    ///
    /// Yields once, then polls the surface with exponential backoff while nothing is scrollable.
    /// Returns `false` when there was nothing to restore or layout never materialized.
    pub async fn restore_scroll(&mut self, surface: &mut dyn ScrollSurface) -> bool {
        if !self.settings.get().save_position || self.ui_mode() != UiMode::Continuous {
            return false;
        }
        let Some(key) = self.current.as_ref().map(|content| content.key.clone()) else {
            return false;
        };
        let Some(Position::Percent(percent)) = self.positions.restore(&key) else {
            return false;
        };

        tokio::task::yield_now().await;
        let mut backoff = self.config.restore_backoff();
        for attempt in 0..self.config.restore_attempts {
            let metrics = surface.metrics();
            if metrics.scrollable_height() > 0.0 {
                let offset = metrics.offset_for(percent);
                surface.scroll_to(offset);
                self.scroll = ScrollMetrics { scroll_top: offset, ..metrics };
                debug!(chapter = %key, percent, attempt, "scroll position restored");
                return true;
            }
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
        warn!(chapter = %key, attempts = self.config.restore_attempts, "layout never became scrollable; leaving reader at the top");
        false
    }

    /// Change settings. Returns a pending repagination when the layout is affected.
    pub fn update_settings(
        &mut self,
        change: impl FnOnce(&mut ReaderSettings),
    ) -> std::result::Result<Option<PendingRun>, InvalidSetting> {
        let before = self.settings.get().clone();
        self.settings.update(change)?;
        Ok(self.layout_changed(&before))
    }

    pub fn import_settings(&mut self, raw: &str) -> std::result::Result<Option<PendingRun>, ImportError> {
        let before = self.settings.get().clone();
        self.settings.import_json(raw)?;
        Ok(self.layout_changed(&before))
    }

    /// The viewport changed size. Returns a pending repagination in page mode.
    pub fn resize(&mut self, viewport: Viewport) -> Option<PendingRun> {
        if viewport == self.viewport {
            return None;
        }
        self.viewport = viewport;
        self.settings.get().page_mode.then(|| self.schedule_repagination())
    }

    /// Debounced repagination; only the newest scheduled run is applied.
    pub fn schedule_repagination(&self) -> PendingRun {
        let delay = repagination_delay(self.config.repaginate_debounce(), self.page_index);
        self.debouncer.schedule(delay)
    }

    /// Apply a repagination run after its delay. Superseded runs are ignored.
    pub fn finish_repagination(&mut self, run: &PendingRun) -> bool {
        if !run.is_current() {
            debug!("repagination superseded");
            return false;
        }
        self.repaginate_now();
        true
    }

    /// Lay the current chapter out again and return to its first page.
    pub fn repaginate_now(&mut self) {
        let Some(content) = self.current.clone() else {
            return;
        };
        if !self.settings.get().page_mode {
            self.pages = None;
            return;
        }
        let typography = self.settings.get().typography();
        let signature = typography.signature(self.viewport);
        if self.pages.as_ref().is_some_and(|pages| pages.matches(&content.key, &signature)) {
            return;
        }
        let pages = self.paginator.paginate_chapter(&content, &typography, self.viewport);
        info!(chapter = %content.key, pages = pages.len(), "chapter paginated");
        self.pages = Some(pages);
        self.page_index = 0;
    }

    /// Report the current chapter as read.
    pub async fn mark_read(&self) -> Result<()> {
        let Some(content) = &self.current else {
            return Ok(());
        };
        self.cache.service().report_chapter_read(&content.key).await?;
        info!(chapter = %content.key, "chapter marked as read");
        Ok(())
    }

    /// Night overlay strength to apply at `now`, if any.
    pub fn night_overlay(&self, now: NaiveTime) -> Option<u8> {
        night::overlay_strength(self.settings.get(), now)
    }

    /// Wait for prefetches and read reports started by this session.
    pub async fn wait_for_background(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "background task failed");
            }
        }
    }

    /// Background tasks still tracked by the session. Finished ones are reaped as new ones start.
    pub fn background_tasks(&self) -> usize {
        self.background.len()
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.background.retain(|task| !task.is_finished());
        self.background.push(handle);
    }

    fn nav_context(&self) -> NavContext {
        NavContext {
            mode: self.ui_mode(),
            has_prev_chapter: self.current.as_ref().is_some_and(|content| content.prev_chapter.is_some()),
            has_next_chapter: self.current.as_ref().is_some_and(|content| content.next_chapter.is_some()),
            scroll: self.scroll.extremes(),
            controls_visible: self.controls_visible,
            viewport_height: self.viewport.height,
        }
    }

    fn turn_page(&mut self, step: isize) -> Effect {
        let Some(count) = self.pages.as_ref().map(PageSet::len) else {
            return Effect::None;
        };
        let Some(index) = self.page_index.checked_add_signed(step).filter(|index| *index < count) else {
            return Effect::None;
        };
        self.page_index = index;
        self.save_page();
        Effect::PageChanged { index, count }
    }

    /// Throttled like scroll saves; leaving the chapter flushes the final page.
    fn save_page(&mut self) {
        if let (Some(content), true) = (&self.current, self.settings.get().save_position) {
            self.positions.save(&content.key, Position::page(self.page_index as u32));
        }
    }

    async fn navigate(&mut self, target: impl FnOnce(&ChapterContent) -> Option<ChapterKey>) -> Result<Effect> {
        let Some(content) = self.current.clone() else {
            return Ok(Effect::None);
        };
        let Some(target) = target(&content) else {
            return Ok(Effect::None);
        };

        let settings = self.settings.get();
        if settings.save_position {
            let position = match self.ui_mode() {
                UiMode::Paged(cursor) => Position::page(cursor.index as u32),
                UiMode::Continuous => Position::percent(self.scroll.percent()),
            };
            self.positions.save_now(&content.key, position);
        }
        let report_read = settings.mark_read_behavior.on_navigation();
        if report_read {
            let handle = self.spawn_read_report(content.key.clone());
            self.track(handle);
        }

        self.open(&target).await?;
        Ok(Effect::ChapterOpened(target))
    }

    fn spawn_read_report(&self, key: ChapterKey) -> JoinHandle<()> {
        let service = self.cache.service();
        tokio::spawn(async move {
            match service.report_chapter_read(&key).await {
                Ok(()) => debug!(chapter = %key, "chapter reported as read"),
                Err(err) => warn!(chapter = %key, error = %err, "failed to report chapter as read"),
            }
        })
    }

    fn layout_changed(&mut self, before: &ReaderSettings) -> Option<PendingRun> {
        let after = self.settings.get();
        if before.page_mode != after.page_mode && !after.page_mode {
            self.debouncer.cancel();
            self.pages = None;
            self.page_index = 0;
            return None;
        }
        let affected = before.page_mode != after.page_mode || before.typography() != after.typography();
        (after.page_mode && affected).then(|| self.schedule_repagination())
    }
}
