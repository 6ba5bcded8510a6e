//! Reversible inline style mutation.
//!
//! Before a property is overwritten for the first time, its current inline
//! value (or the fact that it was unset) is recorded. Later applies of the
//! same property never overwrite that record, so a restore always returns
//! the element to its true pre-focus state.
//!
//! The ledger holds only [`ElementId`] handles, never the elements
//! themselves. Entries for elements that leave the page are dropped by
//! [`StyleLedger::forget`] or [`StyleLedger::prune`].

use std::collections::{BTreeMap, HashMap};

use gazelens_page_model::element::ElementId;
use gazelens_page_model::style::ElementStyle;
use gazelens_platform_core::Page;

/// Pre-mutation value of one property; `None` means the property was unset.
type Original = Option<String>;

/// Per-element record of original inline style values.
#[derive(Debug, Clone, Default)]
pub struct StyleLedger {
    originals: HashMap<ElementId, BTreeMap<String, Original>>,
}

impl StyleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `style` to `element`, capturing originals not yet recorded.
    pub fn apply<P: Page + ?Sized>(&mut self, page: &mut P, element: ElementId, style: &ElementStyle) {
        if !page.is_connected(element) {
            tracing::debug!(element = %element, "Skipping style apply on detached element");
            return;
        }
        if style.is_empty() {
            return;
        }

        let recorded = self.originals.entry(element).or_default();
        for (property, value) in style.declarations() {
            recorded.entry(property.clone()).or_insert_with(|| {
                page.style_property(element, &property)
                    .filter(|v| !v.is_empty())
            });
            page.set_style_property(element, &property, &value);
        }
    }

    /// Restore the properties named by `style` to their recorded originals.
    ///
    /// Properties without a record are left alone. A detached element just
    /// loses its ledger entry.
    pub fn restore<P: Page + ?Sized>(&mut self, page: &mut P, element: ElementId, style: &ElementStyle) {
        if !page.is_connected(element) {
            self.originals.remove(&element);
            return;
        }
        let Some(recorded) = self.originals.get_mut(&element) else {
            return;
        };

        for property in style.properties() {
            if let Some(original) = recorded.remove(&property) {
                write_original(page, element, &property, original);
            }
        }

        if recorded.is_empty() {
            self.originals.remove(&element);
        }
    }

    /// Restore every recorded property of `element`.
    pub fn reset<P: Page + ?Sized>(&mut self, page: &mut P, element: ElementId) {
        let Some(recorded) = self.originals.remove(&element) else {
            return;
        };
        if !page.is_connected(element) {
            return;
        }
        for (property, original) in recorded {
            write_original(page, element, &property, original);
        }
    }

    /// Drop the entry for an element without touching the page.
    pub fn forget(&mut self, element: ElementId) {
        self.originals.remove(&element);
    }

    /// Drop entries for elements the page no longer holds.
    pub fn prune<P: Page + ?Sized>(&mut self, page: &P) -> usize {
        let before = self.originals.len();
        self.originals.retain(|element, _| page.is_connected(*element));
        before - self.originals.len()
    }

    /// Recorded original for a property: `None` if not recorded,
    /// `Some(None)` if it was unset.
    pub fn original(&self, element: ElementId, property: &str) -> Option<Option<&str>> {
        self.originals
            .get(&element)
            .and_then(|recorded| recorded.get(property))
            .map(|original| original.as_deref())
    }

    pub fn is_tracked(&self, element: ElementId) -> bool {
        self.originals.contains_key(&element)
    }

    /// Elements with at least one recorded property.
    pub fn tracked_elements(&self) -> Vec<ElementId> {
        let mut elements: Vec<_> = self.originals.keys().copied().collect();
        elements.sort();
        elements
    }

    /// Forget everything without touching the page.
    pub fn clear(&mut self) {
        self.originals.clear();
    }
}

fn write_original<P: Page + ?Sized>(page: &mut P, element: ElementId, property: &str, original: Original) {
    match original {
        Some(value) => page.set_style_property(element, property, &value),
        None => page.remove_style_property(element, property),
    }
}
