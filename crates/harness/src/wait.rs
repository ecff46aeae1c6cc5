//! Wait coordinator: suspend a scenario until an aliased response lands

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::intercept::{AliasBinding, AliasStore, CapturedResponse};

/// Blocks scenario execution on alias bindings.
///
/// Suspension is cooperative: the coordinator polls the shared alias table
/// on a fixed tick and yields between polls, mirroring the rest of the
/// harness's bounded-poll primitives.
pub struct WaitCoordinator {
    aliases: AliasStore,
    default_timeout: Duration,
    poll_interval: Duration,
}

impl WaitCoordinator {
    pub fn new(aliases: AliasStore, default_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            aliases,
            default_timeout,
            poll_interval,
        }
    }

    /// Wait until the binding for `alias` resolves to a response, or fail
    /// with [`HarnessError::WaitTimeout`] once the ceiling elapses.
    ///
    /// Returns the captured response for chaining into assertions.
    pub async fn wait_for(
        &self,
        alias: &str,
        timeout: Option<Duration>,
    ) -> HarnessResult<CapturedResponse> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            if let Some(AliasBinding::Response(response)) = self.aliases.get(alias) {
                debug!(alias, polls, status = response.status, "wait resolved");
                return Ok(response);
            }

            if start.elapsed() >= timeout {
                return Err(HarnessError::WaitTimeout {
                    alias: alias.to_string(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::CapturedResponse;
    use serde_json::json;

    fn coordinator(aliases: AliasStore) -> WaitCoordinator {
        WaitCoordinator::new(
            aliases,
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_times_out_on_pending_alias() {
        let aliases = AliasStore::new();
        aliases.bind_pending("loginRequest");

        let err = coordinator(aliases)
            .wait_for("loginRequest", None)
            .await
            .unwrap_err();

        match err {
            HarnessError::WaitTimeout {
                alias,
                elapsed_ms,
                timeout_ms,
            } => {
                assert_eq!(alias, "loginRequest");
                assert_eq!(timeout_ms, 200);
                assert!(elapsed_ms >= 200);
            }
            other => panic!("expected WaitTimeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_resolves_when_binding_lands_mid_wait() {
        let aliases = AliasStore::new();
        aliases.bind_pending("slow");

        let writer = aliases.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.bind_response("slow", CapturedResponse::new(201, json!({"id": 7})));
        });

        let response = coordinator(aliases)
            .wait_for("slow", Some(Duration::from_millis(500)))
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, json!({"id": 7}));
    }
}
