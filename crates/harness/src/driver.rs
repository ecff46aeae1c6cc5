//! Action driver: UI actions with bounded element polling

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::page::Page;
use crate::scenario::Selector;

enum Action<'a> {
    Type(&'a str),
    Click,
    Check,
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::Type(_) => "type",
            Action::Click => "click",
            Action::Check => "check",
        }
    }
}

/// Issues navigate/type/click/check against a [`Page`].
///
/// Each action is synchronous from the scenario's point of view but retries
/// internally until the target exists and is interactable, failing with
/// [`HarnessError::ElementNotFound`] when the retry window closes.
pub struct ActionDriver {
    timeout: Duration,
    poll_interval: Duration,
}

impl ActionDriver {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub async fn navigate(&self, page: &mut dyn Page, path: &str) -> HarnessResult<()> {
        debug!(path, "navigate");
        page.navigate(path)
    }

    pub async fn type_text(
        &self,
        page: &mut dyn Page,
        selector: &Selector,
        text: &str,
    ) -> HarnessResult<()> {
        self.perform(page, selector, Action::Type(text)).await
    }

    pub async fn click(&self, page: &mut dyn Page, selector: &Selector) -> HarnessResult<()> {
        self.perform(page, selector, Action::Click).await
    }

    pub async fn check(&self, page: &mut dyn Page, selector: &Selector) -> HarnessResult<()> {
        self.perform(page, selector, Action::Check).await
    }

    async fn perform(
        &self,
        page: &mut dyn Page,
        selector: &Selector,
        action: Action<'_>,
    ) -> HarnessResult<()> {
        let start = Instant::now();

        loop {
            let acted = match &action {
                Action::Type(text) => page.type_text(selector, text),
                Action::Click => page.click(selector),
                Action::Check => page.check(selector),
            };

            if acted {
                debug!(action = action.name(), %selector, "action performed");
                return Ok(());
            }

            if start.elapsed() >= self.timeout {
                return Err(HarnessError::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::{AliasStore, NetworkHandle};
    use crate::mock::{Element, MockApp};

    fn driver() -> ActionDriver {
        ActionDriver::new(Duration::from_millis(150), Duration::from_millis(10))
    }

    fn page_with_input() -> MockApp {
        let mut app = MockApp::new(NetworkHandle::new(AliasStore::new()));
        app.add_route(
            "/",
            vec![Element::new()
                .with_css("input[name=username]")
                .with_test_id("username-input")],
        );
        app.navigate("/").unwrap();
        app
    }

    #[tokio::test]
    async fn test_type_sets_value() {
        let mut page = page_with_input();
        driver()
            .type_text(&mut page, &Selector::css("input[name=username]"), "admin")
            .await
            .unwrap();

        let snapshot = &page.query(&Selector::test_id("username-input"))[0];
        assert_eq!(snapshot.value, "admin");
    }

    #[tokio::test]
    async fn test_missing_element_fails_after_retry_window() {
        let mut page = page_with_input();
        let err = driver()
            .click(&mut page, &Selector::css("button[type=submit]"))
            .await
            .unwrap_err();

        match err {
            HarnessError::ElementNotFound {
                selector,
                waited_ms,
            } => {
                assert_eq!(selector, "button[type=submit]");
                assert!(waited_ms >= 150);
            }
            other => panic!("expected ElementNotFound, got {other}"),
        }
    }
}
