//! In-memory page made of absolutely positioned boxes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gazelens_common::error::{GazelensError, GazelensResult};
use gazelens_page_model::element::ElementId;
use gazelens_platform_core::{Page, ViewportSize};
use serde::{Deserialize, Serialize};

/// Serializable description of a simulated page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLayout {
    #[serde(default)]
    pub viewport: ViewportSize,

    /// Boxes in document order; later boxes paint on top of earlier ones.
    pub elements: Vec<BoxSpec>,
}

impl PageLayout {
    /// Reject boxes with negative or non-finite geometry.
    pub fn validate(&self) -> GazelensResult<()> {
        for (idx, spec) in self.elements.iter().enumerate() {
            let finite = [spec.x, spec.y, spec.width, spec.height]
                .iter()
                .all(|v| v.is_finite());
            if !finite || spec.width < 0.0 || spec.height < 0.0 {
                return Err(GazelensError::page(format!(
                    "element {idx} <{}> has an invalid box",
                    spec.tag
                )));
            }
        }
        Ok(())
    }
}

/// One element box in page pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxSpec {
    pub tag: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Human-readable name used in reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Inline style present before the session starts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
}

impl BoxSpec {
    pub fn new(tag: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            tag: tag.into(),
            x,
            y,
            width,
            height,
            label: None,
            style: BTreeMap::new(),
        }
    }

    fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

#[derive(Debug, Clone)]
struct SimElement {
    spec: BoxSpec,
    inline_style: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    connected: bool,
}

/// A page whose elements are plain boxes held in memory.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    elements: Vec<SimElement>,
    viewport: ViewportSize,
    live: bool,
    gaze_marker: Option<(f64, f64)>,
    diagnostics_visible: bool,
    mutations: u64,
}

impl MemoryPage {
    /// Create an empty page.
    pub fn new(viewport: ViewportSize) -> Self {
        Self {
            elements: Vec::new(),
            viewport,
            live: true,
            gaze_marker: None,
            diagnostics_visible: false,
            mutations: 0,
        }
    }

    /// Build a page from a layout description.
    pub fn from_layout(layout: PageLayout) -> Self {
        let mut page = Self::new(layout.viewport);
        for spec in layout.elements {
            page.push(spec);
        }
        page
    }

    /// Load a layout JSON file.
    pub fn load_layout(path: &Path) -> GazelensResult<Self> {
        if !path.exists() {
            return Err(GazelensError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let layout: PageLayout = serde_json::from_str(&content)?;
        layout.validate()?;
        tracing::debug!(elements = layout.elements.len(), path = %path.display(), "Loaded page layout");
        Ok(Self::from_layout(layout))
    }

    /// Append a box on top of everything else.
    pub fn add_element(&mut self, tag: &str, x: f64, y: f64, width: f64, height: f64) -> ElementId {
        self.push(BoxSpec::new(tag, x, y, width, height))
    }

    /// Append a fully described box on top of everything else.
    pub fn push(&mut self, spec: BoxSpec) -> ElementId {
        let id = ElementId(self.elements.len() as u64);
        self.elements.push(SimElement {
            inline_style: spec.style.clone(),
            spec,
            classes: BTreeSet::new(),
            connected: true,
        });
        id
    }

    /// Detach an element from the document.
    pub fn detach(&mut self, element: ElementId) {
        if let Some(el) = self.get_mut(element) {
            el.connected = false;
        }
    }

    /// Mark the hosting context as torn down (navigation/unload).
    pub fn invalidate(&mut self) {
        self.live = false;
    }

    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.viewport = viewport;
    }

    /// All element ids in document order.
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len() as u64).map(ElementId)
    }

    /// Label of an element, falling back to its tag.
    pub fn label(&self, element: ElementId) -> Option<&str> {
        self.get(element)
            .map(|el| el.spec.label.as_deref().unwrap_or(el.spec.tag.as_str()))
    }

    /// Full inline style of an element.
    pub fn inline_style(&self, element: ElementId) -> Option<&BTreeMap<String, String>> {
        self.get(element).map(|el| &el.inline_style)
    }

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.get(element)
            .is_some_and(|el| el.classes.contains(class))
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.get(element)
            .map(|el| el.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Last position the gaze marker was moved to.
    pub fn gaze_marker(&self) -> Option<(f64, f64)> {
        self.gaze_marker
    }

    pub fn diagnostics_visible(&self) -> bool {
        self.diagnostics_visible
    }

    /// Number of style/class writes that reached an element.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    fn get(&self, element: ElementId) -> Option<&SimElement> {
        self.elements.get(element.0 as usize)
    }

    fn get_mut(&mut self, element: ElementId) -> Option<&mut SimElement> {
        self.elements.get_mut(element.0 as usize)
    }

    fn connected_mut(&mut self, element: ElementId) -> Option<&mut SimElement> {
        self.get_mut(element).filter(|el| el.connected)
    }
}

impl Page for MemoryPage {
    fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.elements
            .iter()
            .enumerate()
            .rev()
            .find(|(_, el)| el.connected && el.spec.contains(x, y))
            .map(|(idx, _)| ElementId(idx as u64))
    }

    fn tag_name(&self, element: ElementId) -> Option<String> {
        self.get(element).map(|el| el.spec.tag.to_ascii_uppercase())
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.get(element).is_some_and(|el| el.connected)
    }

    fn style_property(&self, element: ElementId, property: &str) -> Option<String> {
        self.get(element)
            .and_then(|el| el.inline_style.get(property).cloned())
    }

    fn set_style_property(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(el) = self.connected_mut(element) {
            el.inline_style
                .insert(property.to_string(), value.to_string());
            self.mutations += 1;
        }
    }

    fn remove_style_property(&mut self, element: ElementId, property: &str) {
        if let Some(el) = self.connected_mut(element) {
            el.inline_style.remove(property);
            self.mutations += 1;
        }
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        if let Some(el) = self.connected_mut(element) {
            el.classes.insert(class.to_string());
            self.mutations += 1;
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        if let Some(el) = self.connected_mut(element) {
            el.classes.remove(class);
            self.mutations += 1;
        }
    }

    fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn place_gaze_marker(&mut self, x: f64, y: f64) {
        self.gaze_marker = Some((x, y));
    }

    fn set_diagnostics_visible(&mut self, visible: bool) {
        self.diagnostics_visible = visible;
    }
}
