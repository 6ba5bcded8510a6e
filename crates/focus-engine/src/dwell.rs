//! Dwell tracking and focus policy.
//!
//! Every stabilized sample is hit-tested against the page. Elements that get
//! hit join a rolling dwell set and age out 2 seconds after they were first
//! seen (re-hits do not refresh the age). While the set is small (at most 4
//! elements) any element dwelled longer than its tag's activation time gains
//! focus; a larger set means the gaze is wandering, and every focused
//! element is released.

use gazelens_common::clock::TimestampMs;
use gazelens_common::config::EngineTuning;
use gazelens_page_model::config::ExtensionConfig;
use gazelens_page_model::element::{ElementId, ElementState};
use gazelens_page_model::sample::StabilizedSample;
use gazelens_page_model::style::ElementStyle;
use gazelens_platform_core::Page;
use serde::Serialize;

/// Dwell tuning.
#[derive(Debug, Clone, Copy)]
pub struct DwellConfig {
    /// Records older than this are evicted (milliseconds).
    pub expiry_ms: u64,
    /// Largest dwell set that still grants focus.
    pub max_targets: usize,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            expiry_ms: 2000,
            max_targets: 4,
        }
    }
}

impl From<&EngineTuning> for DwellConfig {
    fn from(tuning: &EngineTuning) -> Self {
        Self {
            expiry_ms: tuning.dwell_expiry_ms,
            max_targets: tuning.max_dwell_targets,
        }
    }
}

/// An element in the active dwell set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DwellRecord {
    pub element: ElementId,
    pub first_seen_ms: TimestampMs,
}

impl DwellRecord {
    pub fn age_ms(&self, now_ms: TimestampMs) -> u64 {
        now_ms.saturating_sub(self.first_seen_ms)
    }
}

/// A focused element and the exact style applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusedElement {
    pub element: ElementId,
    pub applied_style: ElementStyle,
}

/// Why an element lost focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfocusReason {
    /// Aged out of the dwell set.
    Expired,
    /// Too many dwell targets at once.
    Overload,
    /// Detached from the page.
    Removed,
}

/// A focus lifecycle change produced by one update.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusTransition {
    Focus {
        element: ElementId,
        style: ElementStyle,
    },
    Unfocus {
        element: ElementId,
        style: ElementStyle,
        reason: UnfocusReason,
    },
}

/// Everything one update changed.
#[derive(Debug, Clone, Default)]
pub struct DwellUpdate {
    /// Element under the stabilized gaze point.
    pub hit: Option<ElementId>,
    /// Element newly added to the dwell set.
    pub entered: Option<ElementId>,
    /// Elements evicted by age or detachment.
    pub expired: Vec<ElementId>,
    /// Focus changes, in the order they must be applied.
    pub transitions: Vec<FocusTransition>,
    /// Dwelled elements whose tag has no config entry, with that tag.
    pub unconfigured: Vec<(ElementId, String)>,
    /// Whether the dwell set exceeded the focus threshold.
    pub overloaded: bool,
}

/// Active dwell set and focused set, for UI/debug consumers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DwellSnapshot {
    pub dwelling: Vec<DwellRecord>,
    pub focused: Vec<ElementId>,
}

/// Rolling set of recently gazed elements and their focus state.
#[derive(Debug, Clone, Default)]
pub struct DwellTracker {
    config: DwellConfig,
    records: Vec<DwellRecord>,
    focused: Vec<FocusedElement>,
}

impl DwellTracker {
    pub fn new(config: DwellConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            focused: Vec::new(),
        }
    }

    /// Hit-test the page at the stabilized point and advance every record.
    ///
    /// With no `config`, elements are still tracked but none gain focus.
    pub fn update<P: Page + ?Sized>(
        &mut self,
        page: &P,
        sample: &StabilizedSample,
        config: Option<&ExtensionConfig>,
        now_ms: TimestampMs,
    ) -> DwellUpdate {
        let mut update = DwellUpdate {
            hit: page.element_at(sample.x, sample.y),
            ..Default::default()
        };

        let expiry_ms = self.config.expiry_ms;
        let mut expired = Vec::new();
        self.records.retain(|record| {
            let reason = if !page.is_connected(record.element) {
                UnfocusReason::Removed
            } else if record.age_ms(now_ms) > expiry_ms {
                UnfocusReason::Expired
            } else {
                return true;
            };
            expired.push((record.element, reason));
            false
        });
        for (element, reason) in expired {
            if let Some(focused) = self.take_focused(element) {
                update.transitions.push(FocusTransition::Unfocus {
                    element: focused.element,
                    style: focused.applied_style,
                    reason,
                });
            }
            update.expired.push(element);
        }

        if let Some(element) = update.hit {
            if !self.contains(element) {
                self.records.push(DwellRecord {
                    element,
                    first_seen_ms: now_ms,
                });
                update.entered = Some(element);
            }
        }

        if self.records.len() > self.config.max_targets {
            update.overloaded = true;
            if !self.focused.is_empty() {
                tracing::debug!(
                    dwelling = self.records.len(),
                    focused = self.focused.len(),
                    "Dwell set overloaded, releasing focus"
                );
            }
            for focused in self.focused.drain(..) {
                update.transitions.push(FocusTransition::Unfocus {
                    element: focused.element,
                    style: focused.applied_style,
                    reason: UnfocusReason::Overload,
                });
            }
            return update;
        }

        let Some(config) = config else {
            return update;
        };

        let mut granted = Vec::new();
        for record in &self.records {
            if self.is_focused(record.element) {
                continue;
            }
            let Some(tag) = page.tag_name(record.element) else {
                continue;
            };
            let tag = tag.to_ascii_lowercase();
            match config.get(&tag) {
                Some(entry) => {
                    if record.age_ms(now_ms) >= entry.activation_ms() {
                        granted.push(FocusedElement {
                            element: record.element,
                            applied_style: entry.style.clone(),
                        });
                    }
                }
                None => update.unconfigured.push((record.element, tag)),
            }
        }
        for focused in granted {
            update.transitions.push(FocusTransition::Focus {
                element: focused.element,
                style: focused.applied_style.clone(),
            });
            self.focused.push(focused);
        }

        update
    }

    /// Forget an element entirely, returning its focus record if it had one.
    pub fn remove(&mut self, element: ElementId) -> Option<FocusedElement> {
        self.records.retain(|r| r.element != element);
        self.take_focused(element)
    }

    /// Drop all state, returning the elements that were focused.
    pub fn clear(&mut self) -> Vec<FocusedElement> {
        self.records.clear();
        std::mem::take(&mut self.focused)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.records.iter().any(|r| r.element == element)
    }

    pub fn is_focused(&self, element: ElementId) -> bool {
        self.focused.iter().any(|f| f.element == element)
    }

    /// Dwell-level state; `Unfocusing` is tracked by the engine, not here.
    pub fn state(&self, element: ElementId) -> ElementState {
        if self.is_focused(element) {
            ElementState::Focused
        } else if self.contains(element) {
            ElementState::Dwelling
        } else {
            ElementState::Unseen
        }
    }

    pub fn records(&self) -> &[DwellRecord] {
        &self.records
    }

    pub fn focused(&self) -> &[FocusedElement] {
        &self.focused
    }

    pub fn snapshot(&self) -> DwellSnapshot {
        DwellSnapshot {
            dwelling: self.records.clone(),
            focused: self.focused.iter().map(|f| f.element).collect(),
        }
    }

    fn take_focused(&mut self, element: ElementId) -> Option<FocusedElement> {
        let idx = self.focused.iter().position(|f| f.element == element)?;
        Some(self.focused.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelens_page_model::config::ConfigElement;
    use gazelens_page_sim::MemoryPage;
    use gazelens_platform_core::ViewportSize;

    fn at(x: f64, y: f64) -> StabilizedSample {
        StabilizedSample {
            x,
            y,
            eye_ratio: Some(2.0),
            blink: false,
        }
    }

    /// A paragraph at (0,0) and five divs in a row below it.
    fn page() -> (MemoryPage, ElementId, Vec<ElementId>) {
        let mut page = MemoryPage::new(ViewportSize::new(1000.0, 1000.0));
        let para = page.add_element("p", 0.0, 0.0, 100.0, 100.0);
        let divs = (0..5)
            .map(|i| page.add_element("div", i as f64 * 100.0, 200.0, 100.0, 100.0))
            .collect();
        (page, para, divs)
    }

    fn config(activation_secs: f64) -> ExtensionConfig {
        ExtensionConfig::new().with_tag(
            "p",
            ConfigElement::new(activation_secs, ElementStyle::new().with("color", "red")),
        )
    }

    const NOWHERE: (f64, f64) = (5000.0, 5000.0);

    #[test]
    fn test_record_expires_after_two_seconds() {
        let (page, para, _) = page();
        let mut tracker = DwellTracker::default();

        let update = tracker.update(&page, &at(10.0, 10.0), None, 0);
        assert_eq!(update.entered, Some(para));

        tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), None, 1999);
        assert!(tracker.contains(para));
        tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), None, 2000);
        assert!(tracker.contains(para));

        let update = tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), None, 2001);
        assert!(!tracker.contains(para));
        assert_eq!(update.expired, vec![para]);
    }

    #[test]
    fn test_rehit_does_not_refresh_age() {
        let (page, _, _) = page();
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), None, 0);
        let update = tracker.update(&page, &at(20.0, 20.0), None, 1500);
        assert_eq!(update.entered, None);
        assert_eq!(tracker.records()[0].first_seen_ms, 0);
    }

    #[test]
    fn test_focus_waits_for_activation_time() {
        let (page, para, _) = page();
        let config = config(1.0);
        let mut tracker = DwellTracker::default();

        for t in (0..1000).step_by(100) {
            let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), t);
            assert!(update.transitions.is_empty(), "focused too early at {t}");
        }
        let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), 1000);
        assert_eq!(
            update.transitions,
            vec![FocusTransition::Focus {
                element: para,
                style: ElementStyle::new().with("color", "red"),
            }]
        );
        assert_eq!(tracker.state(para), ElementState::Focused);

        let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), 1100);
        assert!(update.transitions.is_empty());
    }

    #[test]
    fn test_no_config_tracks_but_never_focuses() {
        let (page, para, _) = page();
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), None, 0);
        let update = tracker.update(&page, &at(10.0, 10.0), None, 1500);
        assert!(update.transitions.is_empty());
        assert_eq!(tracker.state(para), ElementState::Dwelling);
    }

    #[test]
    fn test_unconfigured_tag_is_reported() {
        let (page, _, divs) = page();
        let mut tracker = DwellTracker::default();
        let update = tracker.update(&page, &at(50.0, 250.0), Some(&config(0.0)), 0);
        assert_eq!(update.unconfigured, vec![(divs[0], "div".to_string())]);
        assert!(update.transitions.is_empty());
    }

    #[test]
    fn test_overload_releases_focus_even_when_still_dwelled() {
        let (page, para, divs) = page();
        let config = config(0.0);
        let mut tracker = DwellTracker::default();

        let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), 0);
        assert!(matches!(update.transitions[..], [FocusTransition::Focus { .. }]));

        for (i, _) in divs.iter().enumerate().take(3) {
            let update = tracker.update(&page, &at(i as f64 * 100.0 + 50.0, 250.0), Some(&config), 10 + i as u64);
            assert!(!update.overloaded);
        }
        assert!(tracker.is_focused(para));

        let update = tracker.update(&page, &at(350.0, 250.0), Some(&config), 20);
        assert!(update.overloaded);
        assert_eq!(tracker.records().len(), 5);
        assert!(tracker.contains(para));
        assert_eq!(
            update.transitions,
            vec![FocusTransition::Unfocus {
                element: para,
                style: ElementStyle::new().with("color", "red"),
                reason: UnfocusReason::Overload,
            }]
        );
        assert_eq!(tracker.state(para), ElementState::Dwelling);

        let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), 30);
        assert!(update.overloaded);
        assert!(update.transitions.is_empty());
    }

    #[test]
    fn test_expiry_releases_focus() {
        let (page, para, _) = page();
        let config = config(0.0);
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), Some(&config), 0);
        assert!(tracker.is_focused(para));

        let update = tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), Some(&config), 2001);
        assert!(matches!(
            update.transitions[..],
            [FocusTransition::Unfocus {
                reason: UnfocusReason::Expired,
                ..
            }]
        ));
        assert_eq!(tracker.state(para), ElementState::Unseen);
    }

    #[test]
    fn test_expired_element_still_under_gaze_restarts_dwell() {
        let (page, para, _) = page();
        let config = config(0.5);
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), Some(&config), 0);
        tracker.update(&page, &at(10.0, 10.0), Some(&config), 600);
        assert!(tracker.is_focused(para));

        let update = tracker.update(&page, &at(10.0, 10.0), Some(&config), 2100);
        assert_eq!(update.expired, vec![para]);
        assert_eq!(update.entered, Some(para));
        assert_eq!(update.transitions.len(), 1);
        assert_eq!(tracker.state(para), ElementState::Dwelling);
        assert_eq!(tracker.records()[0].first_seen_ms, 2100);
    }

    #[test]
    fn test_detached_elements_are_evicted() {
        let (mut page, para, _) = page();
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), None, 0);
        page.detach(para);
        let update = tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), None, 10);
        assert_eq!(update.expired, vec![para]);
    }

    #[test]
    fn test_detached_focused_element_is_released_as_removed() {
        let (mut page, para, _) = page();
        let config = config(0.0);
        let mut tracker = DwellTracker::default();
        tracker.update(&page, &at(10.0, 10.0), Some(&config), 0);
        page.detach(para);

        let update = tracker.update(&page, &at(NOWHERE.0, NOWHERE.1), Some(&config), 10);
        assert!(matches!(
            update.transitions[..],
            [FocusTransition::Unfocus {
                reason: UnfocusReason::Removed,
                ..
            }]
        ));
        assert!(!tracker.is_focused(para));
    }
}
