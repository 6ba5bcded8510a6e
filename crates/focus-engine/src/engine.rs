//! Per-sample orchestration.
//!
//! One raw sample flows through the whole pipeline before the handler
//! returns: smoothing, outbound gaze message, hit-test and dwell update,
//! then style and marker mutations. Nothing is queued; if the host cannot
//! keep up it simply delivers fewer samples.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use gazelens_common::clock::TimestampMs;
use gazelens_common::config::EngineTuning;
use gazelens_page_model::config::ExtensionConfig;
use gazelens_page_model::element::{ElementId, ElementState, MarkerClass};
use gazelens_page_model::message::OutboundMessage;
use gazelens_page_model::sample::{RawGazeSample, StabilizedSample};
use gazelens_page_model::style::ElementStyle;
use gazelens_platform_core::{normalize_coords, MessageSink, Page, Scheduler, TimerTask};
use serde::Serialize;

use crate::config_store::{ConfigSubscription, SettingsChange};
use crate::dwell::{DwellSnapshot, DwellTracker, DwellUpdate, FocusTransition, UnfocusReason};
use crate::gaze_smooth::GazeSmoother;
use crate::style_ledger::StyleLedger;

/// Running counters for one session.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineStats {
    /// Raw samples handed to the engine.
    pub samples: u64,
    /// Samples that produced a stabilized coordinate.
    pub emitted: u64,
    pub blinks: u64,
    pub focused: u64,
    pub unfocused: u64,
    pub config_requests: u64,
    /// Outbound messages nobody received.
    pub undelivered: u64,
    /// Samples ignored because the page context was gone.
    pub ignored_inactive: u64,
}

/// What one emitted sample did.
#[derive(Debug, Clone, Serialize)]
pub struct SampleOutcome {
    pub timestamp_ms: TimestampMs,
    pub stabilized: StabilizedSample,
    pub message: OutboundMessage,
    pub hit: Option<ElementId>,
    pub focused: Vec<ElementId>,
    pub unfocused: Vec<(ElementId, UnfocusReason)>,
    pub overloaded: bool,
}

/// The gaze-driven focus engine for one content session.
pub struct FocusEngine<P, S, M>
where
    P: Page,
    S: Scheduler,
    M: MessageSink,
{
    page: P,
    scheduler: S,
    sink: M,
    smoother: GazeSmoother,
    tracker: DwellTracker,
    ledger: StyleLedger,
    settings: ConfigSubscription,
    config: Option<Arc<ExtensionConfig>>,
    debug: bool,
    unfocus_transition_ms: u64,
    /// Elements showing the `unfocusing` marker, with the generation of
    /// the timer that will clear it.
    unfocusing: HashMap<ElementId, u64>,
    next_generation: u64,
    requested_tags: HashSet<String>,
    missing_config_warned: bool,
    invalidated: bool,
    stats: EngineStats,
}

impl<P, S, M> FocusEngine<P, S, M>
where
    P: Page,
    S: Scheduler,
    M: MessageSink,
{
    /// Create an engine bound to a page and its capabilities.
    pub fn new(
        page: P,
        scheduler: S,
        sink: M,
        settings: ConfigSubscription,
        tuning: &EngineTuning,
    ) -> Self {
        let config = settings.config();
        let debug = settings.debug();
        let mut engine = Self {
            page,
            scheduler,
            sink,
            smoother: GazeSmoother::new(tuning.into()),
            tracker: DwellTracker::new(tuning.into()),
            ledger: StyleLedger::new(),
            settings,
            config,
            debug,
            unfocus_transition_ms: tuning.unfocus_transition_ms,
            unfocusing: HashMap::new(),
            next_generation: 0,
            requested_tags: HashSet::new(),
            missing_config_warned: false,
            invalidated: false,
            stats: EngineStats::default(),
        };
        if engine.page.is_live() {
            engine.page.set_diagnostics_visible(debug);
        }
        engine
    }

    /// Create an engine with default tuning.
    pub fn with_defaults(page: P, scheduler: S, sink: M, settings: ConfigSubscription) -> Self {
        Self::new(page, scheduler, sink, settings, &EngineTuning::default())
    }

    /// Run one raw sample through the pipeline.
    ///
    /// Returns `None` while the smoothing window fills, for dropped samples,
    /// and once the page context is gone.
    pub fn handle_sample(
        &mut self,
        sample: &RawGazeSample,
        now_ms: TimestampMs,
    ) -> Option<SampleOutcome> {
        self.stats.samples += 1;
        if !self.ensure_active() {
            self.stats.ignored_inactive += 1;
            return None;
        }
        let change = self.settings.poll();
        self.apply_settings(change);

        let stabilized = self.smoother.feed(sample)?;
        self.stats.emitted += 1;
        if stabilized.blink {
            self.stats.blinks += 1;
        }

        self.page.place_gaze_marker(stabilized.x, stabilized.y);
        let (x, y) = normalize_coords(stabilized.x, stabilized.y, self.page.viewport());
        let message = OutboundMessage::gaze(x, y, stabilized.blink);
        self.deliver(&message);

        let config = self.config.clone();
        if config.is_none() && !self.missing_config_warned {
            tracing::warn!("No extension config, dwell tracking continues without styling");
            self.missing_config_warned = true;
        }

        let update = self
            .tracker
            .update(&self.page, &stabilized, config.as_deref(), now_ms);
        let mut outcome = SampleOutcome {
            timestamp_ms: now_ms,
            stabilized,
            message,
            hit: update.hit,
            focused: Vec::new(),
            unfocused: Vec::new(),
            overloaded: update.overloaded,
        };
        self.apply_update(update, &mut outcome);
        Some(outcome)
    }

    /// Handle a timer scheduled earlier through the [`Scheduler`].
    pub fn on_timer(&mut self, task: TimerTask) {
        if !self.ensure_active() {
            return;
        }
        match task {
            TimerTask::ClearUnfocusing {
                element,
                generation,
            } => {
                if self.unfocusing.get(&element) == Some(&generation) {
                    self.unfocusing.remove(&element);
                    self.page
                        .remove_class(element, MarkerClass::Unfocusing.as_str());
                }
            }
        }
    }

    /// Toggle debug markers and diagnostic overlays.
    pub fn set_debug(&mut self, enabled: bool) {
        if self.debug == enabled || !self.ensure_active() {
            self.debug = enabled;
            return;
        }
        self.debug = enabled;
        self.page.set_diagnostics_visible(enabled);
        let class = MarkerClass::Dwelling.as_str();
        for record in self.tracker.records() {
            if enabled {
                self.page.add_class(record.element, class);
            } else {
                self.page.remove_class(record.element, class);
            }
        }
        tracing::debug!(enabled, "Debug markers toggled");
    }

    /// Removal hook for elements that left the page.
    ///
    /// Drops every piece of state for the element without touching it.
    pub fn element_removed(&mut self, element: ElementId) {
        self.tracker.remove(element);
        self.ledger.forget(element);
        self.unfocusing.remove(&element);
    }

    /// Stop for good after the page context became invalid.
    ///
    /// No page call is made; pending timers become no-ops.
    pub fn teardown(&mut self) {
        if !self.invalidated {
            tracing::debug!("Focus engine torn down");
        }
        self.invalidated = true;
        self.tracker.clear();
        self.ledger.clear();
        self.unfocusing.clear();
    }

    /// Stop for good, first putting every touched element back the way it was.
    pub fn teardown_restoring(&mut self) {
        if self.ensure_active() {
            if self.debug {
                let dwelling = MarkerClass::Dwelling.as_str();
                for record in self.tracker.records() {
                    self.page.remove_class(record.element, dwelling);
                }
            }
            for focused in self.tracker.clear() {
                self.page
                    .remove_class(focused.element, MarkerClass::Focused.as_str());
            }
            for element in self.ledger.tracked_elements() {
                self.ledger.reset(&mut self.page, element);
            }
            let unfocusing: Vec<_> = self.unfocusing.drain().map(|(element, _)| element).collect();
            for element in unfocusing {
                self.page
                    .remove_class(element, MarkerClass::Unfocusing.as_str());
            }
            if self.debug {
                self.page.set_diagnostics_visible(false);
            }
        }
        self.teardown();
    }

    /// Lifecycle state of an element.
    pub fn state(&self, element: ElementId) -> ElementState {
        match self.tracker.state(element) {
            ElementState::Unseen if self.unfocusing.contains_key(&element) => {
                ElementState::Unfocusing
            }
            state => state,
        }
    }

    /// Whether the engine still reacts to samples and timers.
    pub fn is_active(&self) -> bool {
        !self.invalidated && self.page.is_live()
    }

    pub fn snapshot(&self) -> DwellSnapshot {
        self.tracker.snapshot()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn config(&self) -> Option<&ExtensionConfig> {
        self.config.as_deref()
    }

    pub fn smoother(&self) -> &GazeSmoother {
        &self.smoother
    }

    pub fn ledger(&self) -> &StyleLedger {
        &self.ledger
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut M {
        &mut self.sink
    }

    /// Check liveness, tearing down on the first sign of an invalid context.
    fn ensure_active(&mut self) -> bool {
        if self.invalidated {
            return false;
        }
        if !self.page.is_live() {
            tracing::warn!("Page context invalidated, ignoring further gaze data");
            self.teardown();
            return false;
        }
        true
    }

    fn apply_settings(&mut self, change: SettingsChange) {
        if let Some(config) = change.config {
            match &config {
                Some(config) => tracing::info!(tags = config.len(), "Using updated extension config"),
                None => tracing::info!("Extension config removed"),
            }
            self.config = config;
            self.missing_config_warned = false;
        }
        if let Some(debug) = change.debug {
            self.set_debug(debug);
        }
    }

    fn apply_update(&mut self, update: DwellUpdate, outcome: &mut SampleOutcome) {
        let dwelling = MarkerClass::Dwelling.as_str();
        for element in &update.expired {
            if !self.page.is_connected(*element) {
                self.ledger.forget(*element);
                self.unfocusing.remove(element);
            } else if self.debug {
                self.page.remove_class(*element, dwelling);
            }
        }
        if let (Some(element), true) = (update.entered, self.debug) {
            self.page.add_class(element, dwelling);
        }

        for transition in update.transitions {
            match transition {
                FocusTransition::Focus { element, style } => {
                    self.focus(element, &style);
                    outcome.focused.push(element);
                }
                FocusTransition::Unfocus {
                    element,
                    style,
                    reason,
                } => {
                    self.unfocus(element, &style, reason);
                    outcome.unfocused.push((element, reason));
                }
            }
        }

        for (element, tag) in update.unconfigured {
            self.request_config(element, tag);
        }
    }

    fn focus(&mut self, element: ElementId, style: &ElementStyle) {
        if self.unfocusing.remove(&element).is_some() {
            self.page
                .remove_class(element, MarkerClass::Unfocusing.as_str());
        }
        self.ledger.apply(&mut self.page, element, style);
        self.page.add_class(element, MarkerClass::Focused.as_str());
        self.stats.focused += 1;
        tracing::debug!(element = %element, properties = style.len(), "Element focused");
    }

    fn unfocus(&mut self, element: ElementId, style: &ElementStyle, reason: UnfocusReason) {
        self.stats.unfocused += 1;
        if !self.page.is_connected(element) {
            self.ledger.forget(element);
            self.unfocusing.remove(&element);
            tracing::debug!(element = %element, "Focused element left the page");
            return;
        }
        self.ledger.restore(&mut self.page, element, style);
        self.page.remove_class(element, MarkerClass::Focused.as_str());
        self.page
            .add_class(element, MarkerClass::Unfocusing.as_str());

        let generation = self.next_generation;
        self.next_generation += 1;
        self.unfocusing.insert(element, generation);
        self.scheduler.schedule_after(
            self.unfocus_transition_ms,
            TimerTask::ClearUnfocusing {
                element,
                generation,
            },
        );
        tracing::debug!(element = %element, ?reason, "Element unfocused");
    }

    fn request_config(&mut self, element: ElementId, tag: String) {
        if self.requested_tags.contains(&tag) {
            return;
        }
        tracing::info!(element = %element, tag = %tag, "No config for tag, requesting one");
        let message = OutboundMessage::config_request(tag.clone());
        self.requested_tags.insert(tag);
        self.deliver(&message);
        self.stats.config_requests += 1;
    }

    fn deliver(&mut self, message: &OutboundMessage) {
        if let Err(e) = self.sink.send(message) {
            self.stats.undelivered += 1;
            tracing::trace!(error = %e, "Outbound message dropped");
        }
    }
}
