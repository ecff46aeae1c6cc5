//! In-memory reference implementation of [`Page`].
//!
//! `MockApp` is a multi-route document store with just enough element
//! semantics for the harness to drive: selector lookup, typed values,
//! checkboxes, classes, visibility. Interactive behavior comes from event
//! rules — programmatic closures for embedded use, or the declarative
//! submit/on_status rules a suite file's `app:` section can carry for
//! self-contained runs. All network traffic goes through the scenario's
//! injected [`NetworkHandle`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::HarnessResult;
use crate::intercept::{Method, NetworkHandle, StubResponse};
use crate::page::{ElementSnapshot, Page};
use crate::scenario::Selector;

/// One element in a mock document
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Literal CSS handles this element answers to
    pub css: Vec<String>,
    pub test_id: Option<String>,
    pub text: String,
    pub classes: BTreeSet<String>,
    pub value: String,
    pub checked: bool,
    pub visible: bool,
}

impl Element {
    pub fn new() -> Self {
        Self {
            visible: true,
            ..Default::default()
        }
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css.push(css.into());
        self
    }

    pub fn with_test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css(s) => self.css.iter().any(|c| c == s),
            Selector::TestId(s) => self.test_id.as_deref() == Some(s),
            Selector::Text(s) => !s.is_empty() && self.text.contains(s),
        }
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            text: self.text.clone(),
            value: self.value.clone(),
            classes: self.classes.iter().cloned().collect(),
            checked: self.checked,
            visible: self.visible,
        }
    }
}

/// One route's live document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub elements: Vec<Element>,
}

impl Document {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn find(&self, selector: &Selector) -> Option<&Element> {
        self.elements.iter().find(|el| el.matches(selector))
    }

    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut Element> {
        self.elements.iter_mut().find(|el| el.matches(selector))
    }

    /// Index of the first visible match in document order
    fn first_visible(&self, selector: &Selector) -> Option<usize> {
        self.elements
            .iter()
            .position(|el| el.visible && el.matches(selector))
    }

    /// The n-th element matching `selector`, counting all matches in
    /// document order
    pub fn nth_match_mut(&mut self, selector: &Selector, n: usize) -> Option<&mut Element> {
        self.elements
            .iter_mut()
            .filter(|el| el.matches(selector))
            .nth(n)
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn retain(&mut self, keep: impl FnMut(&Element) -> bool) {
        self.elements.retain(keep);
    }
}

/// Events the mock dispatches to rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Check,
}

/// Mutable application state rules operate on
pub struct AppState {
    routes: HashMap<String, Document>,
    current: String,
    network: NetworkHandle,
}

impl AppState {
    pub fn network(&self) -> &NetworkHandle {
        &self.network
    }

    pub fn current_path(&self) -> &str {
        &self.current
    }

    /// The current route's document
    pub fn doc(&mut self) -> &mut Document {
        self.routes.entry(self.current.clone()).or_default()
    }

    pub fn navigate(&mut self, path: &str) {
        debug!(path, "mock navigation");
        self.current = path.to_string();
        self.routes.entry(self.current.clone()).or_default();
    }

    /// Value of the first visible match on the current page
    pub fn value_of(&mut self, selector: &Selector) -> Option<String> {
        let doc = self.doc();
        doc.first_visible(selector)
            .map(|i| doc.elements[i].value.clone())
    }

    /// Issue a request through the scenario's network capability
    pub fn request(&self, method: Method, url: &str, body: Value) -> crate::intercept::CapturedResponse {
        self.network.request(method, url, body)
    }

    pub fn show(&mut self, selector: &Selector) {
        if let Some(el) = self.doc().find_mut(selector) {
            el.visible = true;
        }
    }

    pub fn hide(&mut self, selector: &Selector) {
        if let Some(el) = self.doc().find_mut(selector) {
            el.visible = false;
        }
    }
}

type RuleFn = Box<dyn FnMut(&mut AppState, usize) + Send>;

struct EventRule {
    event: EventKind,
    selector: Selector,
    run: RuleFn,
}

/// The mock application
pub struct MockApp {
    state: AppState,
    rules: Vec<EventRule>,
}

impl MockApp {
    pub fn new(network: NetworkHandle) -> Self {
        Self {
            state: AppState {
                routes: HashMap::new(),
                current: "/".to_string(),
                network,
            },
            rules: Vec::new(),
        }
    }

    /// Build a mock from the declarative model in a suite file: static
    /// pages, network stubs, and submit rules
    pub fn from_model(model: &AppModel, network: NetworkHandle) -> Self {
        let mut app = Self::new(network);

        for stub in &model.stubs {
            app.state.network.stub(stub.clone());
        }
        for page in &model.pages {
            app.add_route(
                &page.path,
                page.elements.iter().map(ElementModel::to_element).collect(),
            );
        }
        for rule in &model.rules {
            let rule = rule.clone();
            let event = rule.on;
            let selector = rule.selector.clone();
            app.on_event(event, selector, move |state, _ordinal| {
                if let Some(page) = &rule.page {
                    if state.current_path() != page {
                        return;
                    }
                }
                rule.submit.apply(state);
            });
        }

        app
    }

    pub fn add_route(&mut self, path: &str, elements: Vec<Element>) {
        self.state
            .routes
            .insert(path.to_string(), Document::new(elements));
    }

    /// Register a behavior for an event on elements matching `selector`.
    /// The closure receives the app state and the target's ordinal among
    /// the selector's matches in document order.
    pub fn on_event<F>(&mut self, event: EventKind, selector: Selector, run: F)
    where
        F: FnMut(&mut AppState, usize) + Send + 'static,
    {
        self.rules.push(EventRule {
            event,
            selector,
            run: Box::new(run),
        });
    }

    pub fn on_click<F>(&mut self, selector: Selector, run: F)
    where
        F: FnMut(&mut AppState, usize) + Send + 'static,
    {
        self.on_event(EventKind::Click, selector, run);
    }

    pub fn on_check<F>(&mut self, selector: Selector, run: F)
    where
        F: FnMut(&mut AppState, usize) + Send + 'static,
    {
        self.on_event(EventKind::Check, selector, run);
    }

    pub fn state(&mut self) -> &mut AppState {
        &mut self.state
    }

    fn dispatch(&mut self, event: EventKind, target_index: usize) {
        // Rules run outside the borrow of self.rules
        let mut rules = std::mem::take(&mut self.rules);
        for rule in rules.iter_mut() {
            if rule.event != event {
                continue;
            }
            let doc = self.state.doc();
            if target_index >= doc.elements.len()
                || !doc.elements[target_index].matches(&rule.selector)
            {
                continue;
            }
            let ordinal = doc.elements[..target_index]
                .iter()
                .filter(|el| el.matches(&rule.selector))
                .count();
            (rule.run)(&mut self.state, ordinal);
        }
        self.rules = rules;
    }
}

impl Page for MockApp {
    fn navigate(&mut self, path: &str) -> HarnessResult<()> {
        self.state.navigate(path);
        Ok(())
    }

    fn current_path(&self) -> String {
        self.state.current.clone()
    }

    fn query(&self, selector: &Selector) -> Vec<ElementSnapshot> {
        self.state
            .routes
            .get(&self.state.current)
            .map(|doc| {
                doc.elements
                    .iter()
                    .filter(|el| el.matches(selector))
                    .map(Element::snapshot)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn type_text(&mut self, selector: &Selector, text: &str) -> bool {
        let doc = self.state.doc();
        match doc.first_visible(selector) {
            Some(i) => {
                doc.elements[i].value = text.to_string();
                true
            }
            None => false,
        }
    }

    fn click(&mut self, selector: &Selector) -> bool {
        match self.state.doc().first_visible(selector) {
            Some(i) => {
                self.dispatch(EventKind::Click, i);
                true
            }
            None => false,
        }
    }

    fn check(&mut self, selector: &Selector) -> bool {
        let target = self.state.doc().first_visible(selector);
        match target {
            Some(i) => {
                self.state.doc().elements[i].checked = true;
                self.dispatch(EventKind::Check, i);
                true
            }
            None => false,
        }
    }

    fn capture(&mut self, name: &str) -> Option<String> {
        Some(format!("screenshots/{name}.png"))
    }
}

fn default_true() -> bool {
    true
}

/// Declarative element for suite-file app models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementModel {
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl ElementModel {
    fn to_element(&self) -> Element {
        Element {
            css: self.css.clone(),
            test_id: self.test_id.clone(),
            text: self.text.clone(),
            classes: self.classes.iter().cloned().collect(),
            value: self.value.clone(),
            checked: self.checked,
            visible: self.visible,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageModel {
    pub path: String,
    #[serde(default)]
    pub elements: Vec<ElementModel>,
}

/// What a declarative rule does when its status arm matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusAction {
    pub status: u16,
    #[serde(default)]
    pub navigate: Option<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub show: Option<Selector>,
}

/// Form submission: collect field values, issue the request, apply the
/// first matching status arm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitModel {
    pub method: Method,
    pub url: String,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub fields: BTreeMap<String, Selector>,
    #[serde(default)]
    pub on_status: Vec<StatusAction>,
}

impl SubmitModel {
    fn apply(&self, state: &mut AppState) {
        let mut body = serde_json::Map::new();
        for (field, selector) in &self.fields {
            match state.value_of(selector) {
                Some(value) => {
                    body.insert(field.clone(), Value::String(value));
                }
                None => warn!(field = field.as_str(), %selector, "submit field not found"),
            }
        }

        let response = state.request(self.method, &self.url, Value::Object(body));

        if let Some(action) = self.on_status.iter().find(|a| a.status == response.status) {
            if let Some(path) = &action.navigate {
                state.navigate(path);
            }
            if let Some(selector) = &action.show {
                state.show(selector);
            }
        }
    }
}

/// Declarative event rule for suite-file app models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleModel {
    pub on: EventKind,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub selector: Selector,
    /// Restrict the rule to one route
    #[serde(default)]
    pub page: Option<String>,
    pub submit: SubmitModel,
}

/// Inline application model carried by a suite file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppModel {
    #[serde(default)]
    pub pages: Vec<PageModel>,
    #[serde(default)]
    pub stubs: Vec<StubResponse>,
    #[serde(default)]
    pub rules: Vec<RuleModel>,
}
