//! Assertion engine: read-only predicates with bounded polling.
//!
//! Real DOMs settle eventually, so every assertion re-checks its predicate
//! on a poll tick until it holds or the ceiling elapses. Assertions never
//! mutate document or network state.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::page::{ElementSnapshot, Page};
use crate::scenario::Selector;

/// Text comparison mode for [`AssertionEngine::assert_text`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    Contains,
}

/// Which visible match a text assertion inspects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    First,
    Last,
}

pub struct AssertionEngine {
    timeout: Duration,
    poll_interval: Duration,
}

impl AssertionEngine {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub async fn assert_visible(&self, page: &dyn Page, selector: &Selector) -> HarnessResult<()> {
        self.poll(page, selector, "a visible element", |visible| {
            if visible.is_empty() {
                Err("no visible match".to_string())
            } else {
                Ok(())
            }
        })
        .await
    }

    pub async fn assert_absent(&self, page: &dyn Page, selector: &Selector) -> HarnessResult<()> {
        self.poll(page, selector, "no visible element", |visible| {
            if visible.is_empty() {
                Ok(())
            } else {
                Err(format!("{} visible match(es)", visible.len()))
            }
        })
        .await
    }

    pub async fn assert_count(
        &self,
        page: &dyn Page,
        selector: &Selector,
        expected: usize,
    ) -> HarnessResult<()> {
        self.poll(
            page,
            selector,
            &format!("{expected} visible element(s)"),
            |visible| {
                if visible.len() == expected {
                    Ok(())
                } else {
                    Err(format!("{} visible element(s)", visible.len()))
                }
            },
        )
        .await
    }

    pub async fn assert_text(
        &self,
        page: &dyn Page,
        selector: &Selector,
        expected: &str,
        mode: MatchMode,
        position: Position,
    ) -> HarnessResult<()> {
        let wanted = match mode {
            MatchMode::Exact => format!("text '{expected}'"),
            MatchMode::Contains => format!("text containing '{expected}'"),
        };
        self.poll(page, selector, &wanted, |visible| {
            let target = match position {
                Position::First => visible.first(),
                Position::Last => visible.last(),
            };
            match target {
                None => Err("no visible match".to_string()),
                Some(el) => {
                    let holds = match mode {
                        MatchMode::Exact => el.text == expected,
                        MatchMode::Contains => el.text.contains(expected),
                    };
                    if holds {
                        Ok(())
                    } else {
                        Err(format!("text '{}'", el.text))
                    }
                }
            }
        })
        .await
    }

    pub async fn assert_class(
        &self,
        page: &dyn Page,
        selector: &Selector,
        class: &str,
    ) -> HarnessResult<()> {
        self.poll(
            page,
            selector,
            &format!("class '{class}'"),
            |visible| match visible.first() {
                None => Err("no visible match".to_string()),
                Some(el) => {
                    if el.has_class(class) {
                        Ok(())
                    } else {
                        Err(format!("classes [{}]", el.classes.join(", ")))
                    }
                }
            },
        )
        .await
    }

    /// Poll `predicate` over the visible matches for `selector` until it
    /// holds or the ceiling elapses; the last observed state becomes the
    /// `actual` in the failure.
    async fn poll<F>(
        &self,
        page: &dyn Page,
        selector: &Selector,
        expected: &str,
        predicate: F,
    ) -> HarnessResult<()>
    where
        F: Fn(&[ElementSnapshot]) -> Result<(), String>,
    {
        let start = Instant::now();

        loop {
            let visible: Vec<ElementSnapshot> = page
                .query(selector)
                .into_iter()
                .filter(|el| el.visible)
                .collect();

            match predicate(&visible) {
                Ok(()) => {
                    debug!(%selector, expected, "assertion held");
                    return Ok(());
                }
                Err(actual) => {
                    if start.elapsed() >= self.timeout {
                        return Err(HarnessError::AssertionFailed {
                            selector: selector.to_string(),
                            expected: expected.to_string(),
                            actual,
                        });
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
