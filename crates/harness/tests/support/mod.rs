//! Shared test support: sample applications built on the mock driver, the
//! user fixtures, and a fast timeout profile so failure-path tests stay
//! quick.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use specrun_harness::fixture::FixtureStore;
use specrun_harness::intercept::{Method, NetworkHandle, StubResponse, UrlPattern};
use specrun_harness::mock::{AppState, Element, MockApp};
use specrun_harness::runner::{PageFactory, ReportSink, ScenarioReport};
use specrun_harness::scenario::{Selector, Suite};
use specrun_harness::HarnessConfig;

pub fn fast_config() -> HarnessConfig {
    HarnessConfig {
        action_timeout: Duration::from_millis(250),
        assert_timeout: Duration::from_millis(250),
        wait_timeout: Duration::from_millis(400),
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

pub fn users_fixtures() -> FixtureStore {
    let mut store = FixtureStore::new();
    store.insert(
        "users",
        json!({
            "admin": { "username": "admin", "password": "secret" },
            "guest": { "username": "guest", "password": "guest123" },
            "apiUser": { "username": "api", "password": "api-key-123" }
        }),
    );
    store
}

/// Sink that records every emitted scenario report
#[derive(Clone, Default)]
pub struct CollectingSink(pub Arc<Mutex<Vec<ScenarioReport>>>);

impl ReportSink for CollectingSink {
    fn emit(&mut self, report: &ScenarioReport) {
        self.0.lock().push(report.clone());
    }
}

/// The mocked banking-style login app: `/login` with a credential form,
/// `/dashboard` behind a successful `POST /api/login`
pub fn login_factory() -> Box<PageFactory> {
    Box::new(|_suite: &Suite, network: &NetworkHandle| {
        for (username, password) in [("admin", "secret"), ("guest", "guest123")] {
            network.stub(StubResponse {
                method: Method::Post,
                url: UrlPattern::new("/api/login"),
                status: 200,
                body: json!({ "token": format!("jwt-{username}") }),
                body_match: Some(BTreeMap::from([
                    ("username".to_string(), json!(username)),
                    ("password".to_string(), json!(password)),
                ])),
                delay_ms: 20,
            });
        }
        network.stub(StubResponse {
            method: Method::Post,
            url: UrlPattern::new("/api/login"),
            status: 401,
            body: json!({ "error": "Invalid credentials" }),
            body_match: None,
            delay_ms: 0,
        });

        let mut app = MockApp::new(network.clone());
        app.add_route(
            "/login",
            vec![
                Element::new().with_css("input[name=username]"),
                Element::new().with_css("input[name=password]"),
                Element::new()
                    .with_css("button[type=submit]")
                    .with_text("Sign in"),
                Element::new()
                    .with_css(".error-message")
                    .with_text("Invalid credentials")
                    .hidden(),
            ],
        );
        app.add_route(
            "/dashboard",
            vec![Element::new()
                .with_css(".dashboard")
                .with_test_id("dashboard")
                .with_text("Dashboard")],
        );

        app.on_click(Selector::css("button[type=submit]"), |state, _| {
            let username = state
                .value_of(&Selector::css("input[name=username]"))
                .unwrap_or_default();
            let password = state
                .value_of(&Selector::css("input[name=password]"))
                .unwrap_or_default();
            let response = state.request(
                Method::Post,
                "/api/login",
                json!({ "username": username, "password": password }),
            );
            if response.status == 200 {
                state.navigate("/dashboard");
            } else {
                state.show(&Selector::css(".error-message"));
            }
        });

        Box::new(app)
    })
}

fn li_selector() -> Selector {
    Selector::css(".todo-list li")
}

fn toggle_selector() -> Selector {
    Selector::css("input.toggle")
}

/// Show/hide todo items by completion state; `None` shows everything.
/// Toggles mirror their item's visibility, pairing by ordinal.
fn apply_filter(state: &mut AppState, only_completed: Option<bool>) {
    let doc = state.doc();
    let mut item_flags = Vec::new();

    for el in doc.elements.iter_mut().filter(|el| el.matches(&li_selector())) {
        let completed = el.classes.contains("completed");
        let visible = match only_completed {
            None => true,
            Some(want) => completed == want,
        };
        el.visible = visible;
        item_flags.push(visible);
    }

    for (i, el) in doc
        .elements
        .iter_mut()
        .filter(|el| el.matches(&toggle_selector()))
        .enumerate()
    {
        if let Some(visible) = item_flags.get(i) {
            el.visible = *visible;
        }
    }
}

fn clear_completed(state: &mut AppState) {
    let doc = state.doc();
    let removed: Vec<usize> = doc
        .elements
        .iter()
        .filter(|el| el.matches(&li_selector()))
        .enumerate()
        .filter(|(_, el)| el.classes.contains("completed"))
        .map(|(i, _)| i)
        .collect();

    let (mut item_i, mut toggle_i) = (0usize, 0usize);
    doc.retain(|el| {
        if el.matches(&li_selector()) {
            let keep = !removed.contains(&item_i);
            item_i += 1;
            keep
        } else if el.matches(&toggle_selector()) {
            let keep = !removed.contains(&toggle_i);
            toggle_i += 1;
            keep
        } else {
            true
        }
    });

    state.hide(&Selector::css("button.clear-completed"));
}

/// The sample todo app: two default items, an add form, completion toggles,
/// filter links, and a clear-completed button that appears once an item is
/// checked
pub fn todo_factory() -> Box<PageFactory> {
    Box::new(|_suite: &Suite, network: &NetworkHandle| {
        let mut app = MockApp::new(network.clone());
        app.add_route(
            "/",
            vec![
                Element::new().with_css("input.new-todo").with_test_id("new-todo"),
                Element::new()
                    .with_css("button.add-todo")
                    .with_test_id("add-todo")
                    .with_text("Add"),
                Element::new()
                    .with_css(".todo-list li")
                    .with_text("Pay electric bill"),
                Element::new().with_css("input.toggle"),
                Element::new()
                    .with_css(".todo-list li")
                    .with_text("Walk the dog"),
                Element::new().with_css("input.toggle"),
                Element::new().with_css(".filters a").with_text("All"),
                Element::new().with_css(".filters a").with_text("Active"),
                Element::new().with_css(".filters a").with_text("Completed"),
                Element::new()
                    .with_css("button.clear-completed")
                    .with_text("Clear completed")
                    .hidden(),
            ],
        );

        app.on_click(Selector::test_id("add-todo"), |state, _| {
            let text = state
                .value_of(&Selector::test_id("new-todo"))
                .unwrap_or_default();
            if text.is_empty() {
                return;
            }
            let doc = state.doc();
            doc.push(Element::new().with_css(".todo-list li").with_text(text.clone()));
            doc.push(Element::new().with_css("input.toggle"));
            if let Some(input) = doc.find_mut(&Selector::test_id("new-todo")) {
                input.value.clear();
            }
        });

        app.on_check(toggle_selector(), |state, ordinal| {
            let doc = state.doc();
            if let Some(item) = doc.nth_match_mut(&li_selector(), ordinal) {
                item.classes.insert("completed".to_string());
            }
            state.show(&Selector::css("button.clear-completed"));
        });

        app.on_click(Selector::text("Active"), |state, _| {
            apply_filter(state, Some(false));
        });
        app.on_click(Selector::text("Completed"), |state, _| {
            apply_filter(state, Some(true));
        });
        app.on_click(Selector::text("All"), |state, _| {
            apply_filter(state, None);
        });
        app.on_click(Selector::css("button.clear-completed"), |state, _| {
            clear_completed(state);
        });

        Box::new(app)
    })
}
