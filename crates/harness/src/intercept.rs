//! Network interception: expectation registry, alias bindings, and the
//! injected network capability.
//!
//! Interception is never global state. Each scenario owns one
//! [`NetworkHandle`]; the page driver issues requests through it, and the
//! handle resolves matching pending registrations into alias bindings that
//! the wait coordinator and assertion engine read.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// HTTP method of an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        };
        f.write_str(s)
    }
}

/// URL pattern for intercept registrations and stubs.
///
/// A pattern without `*` matches by prefix; `*` matches any run of
/// characters. Specificity is the count of literal characters, used to pick
/// the single best match when several registrations are pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlPattern(String);

impl UrlPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, url: &str) -> bool {
        if !self.0.contains('*') {
            return url.starts_with(&self.0);
        }

        let mut rest = url;
        let mut first = true;
        let ends_open = self.0.ends_with('*');
        let segments: Vec<&str> = self.0.split('*').filter(|s| !s.is_empty()).collect();

        for segment in &segments {
            match rest.find(segment) {
                // The first literal segment must anchor at the start unless
                // the pattern opens with a wildcard
                Some(pos) if first && !self.0.starts_with('*') && pos != 0 => return false,
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
            first = false;
        }

        ends_open || segments.is_empty() || rest.is_empty()
    }

    /// Literal characters in the pattern; ties between pending matches break
    /// toward the most recent registration
    pub fn specificity(&self) -> usize {
        self.0.chars().filter(|c| *c != '*').count()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured network response bound to an alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CapturedResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            headers: BTreeMap::new(),
        }
    }
}

/// Current value behind an alias
#[derive(Debug, Clone)]
pub enum AliasBinding {
    /// Registered, request not yet observed
    Pending,
    /// Resolved network response
    Response(CapturedResponse),
    /// Arbitrary stored value (fixture records)
    Value(Value),
}

/// Scenario-scoped alias table. Bindings are last-write-wins; cloning the
/// store shares the underlying table.
#[derive(Clone, Default)]
pub struct AliasStore {
    inner: Arc<Mutex<HashMap<String, AliasBinding>>>,
}

impl AliasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_pending(&self, alias: &str) {
        self.inner
            .lock()
            .insert(alias.to_string(), AliasBinding::Pending);
    }

    pub fn bind_response(&self, alias: &str, response: CapturedResponse) {
        debug!(alias, status = response.status, "alias resolved");
        self.inner
            .lock()
            .insert(alias.to_string(), AliasBinding::Response(response));
    }

    pub fn bind_value(&self, alias: &str, value: Value) {
        self.inner
            .lock()
            .insert(alias.to_string(), AliasBinding::Value(value));
    }

    pub fn get(&self, alias: &str) -> Option<AliasBinding> {
        self.inner.lock().get(alias).cloned()
    }

    /// Snapshot of resolved bindings only, for seeding a fresh scenario
    /// context from suite-level setup. Pending registrations do not carry
    /// across contexts.
    pub fn resolved_bindings(&self) -> Vec<(String, AliasBinding)> {
        self.inner
            .lock()
            .iter()
            .filter(|(_, b)| !matches!(b, AliasBinding::Pending))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn seed(&self, bindings: Vec<(String, AliasBinding)>) {
        let mut inner = self.inner.lock();
        for (alias, binding) in bindings {
            inner.insert(alias, binding);
        }
    }

    /// Dereference an `@alias.path.to.field` expression against the store.
    ///
    /// The root must be a bound alias; the remaining dotted segments index
    /// into the stored value (or the response body for resolved intercepts).
    pub fn deref_path(&self, reference: &str) -> HarnessResult<Value> {
        let expr = reference.strip_prefix('@').unwrap_or(reference);
        let mut parts = expr.split('.');
        let root = parts.next().unwrap_or_default();

        let value = match self.get(root) {
            Some(AliasBinding::Value(v)) => v,
            Some(AliasBinding::Response(r)) => r.body,
            _ => {
                return Err(HarnessError::UnregisteredAlias {
                    alias: root.to_string(),
                })
            }
        };

        let mut current = value;
        for part in parts {
            current = match current.get(part) {
                Some(v) => v.clone(),
                None => {
                    return Err(HarnessError::Fixture(format!(
                        "'{reference}' has no field '{part}'"
                    )))
                }
            };
        }
        Ok(current)
    }
}

/// One declared expectation that a request will occur
#[derive(Debug, Clone)]
struct Registration {
    method: Method,
    pattern: UrlPattern,
    alias: String,
    resolved: bool,
}

/// Records expected outbound request patterns and assigns them aliases.
///
/// A registration stays pending until a matching request is observed, at
/// which point it is consumed and the alias binding resolves. Unmatched
/// registrations at scenario end are dropped silently.
#[derive(Default)]
pub struct InterceptRegistry {
    registrations: Vec<Registration>,
}

impl InterceptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending expectation. Re-registering an alias is allowed
    /// only once its previous registration has resolved.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        alias: &str,
        aliases: &AliasStore,
    ) -> HarnessResult<()> {
        if self
            .registrations
            .iter()
            .any(|r| r.alias == alias && !r.resolved)
        {
            return Err(HarnessError::DuplicateAlias {
                alias: alias.to_string(),
            });
        }

        debug!(%method, pattern, alias, "intercept registered");
        self.registrations.push(Registration {
            method,
            pattern: UrlPattern::new(pattern),
            alias: alias.to_string(),
            resolved: false,
        });
        aliases.bind_pending(alias);
        Ok(())
    }

    /// Find the single best-matching pending registration for an observed
    /// request and consume it. Returns the alias to resolve, or `None` when
    /// the traffic passes through unintercepted.
    pub fn match_request(&mut self, method: Method, url: &str) -> Option<String> {
        let best = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.resolved && r.method == method && r.pattern.matches(url))
            // max_by_key keeps the last maximum, so ties go to the most
            // recent registration
            .max_by_key(|(_, r)| r.pattern.specificity())
            .map(|(i, _)| i)?;

        let reg = &mut self.registrations[best];
        reg.resolved = true;
        Some(reg.alias.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.registrations.iter().filter(|r| !r.resolved).count()
    }
}

/// Canned response served by the mock network layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubResponse {
    pub method: Method,
    pub url: UrlPattern,
    pub status: u16,
    #[serde(default)]
    pub body: Value,
    /// Optional top-level body fields the request must carry for this stub
    /// to apply; first matching stub wins, so list matched stubs before
    /// catch-alls
    #[serde(default)]
    pub body_match: Option<BTreeMap<String, Value>>,
    /// Latency before the alias binding resolves. The response itself is
    /// returned to the page behavior synchronously.
    #[serde(default)]
    pub delay_ms: u64,
}

impl StubResponse {
    fn applies(&self, method: Method, url: &str, body: &Value) -> bool {
        if self.method != method || !self.url.matches(url) {
            return false;
        }
        match &self.body_match {
            None => true,
            Some(fields) => fields.iter().all(|(k, v)| body.get(k) == Some(v)),
        }
    }
}

/// The network capability injected into a scenario's execution context.
///
/// Owns the intercept registry and the stub table; shares the alias store
/// with the wait coordinator. Cloning shares all three.
#[derive(Clone)]
pub struct NetworkHandle {
    registry: Arc<Mutex<InterceptRegistry>>,
    stubs: Arc<Mutex<Vec<StubResponse>>>,
    aliases: AliasStore,
}

impl NetworkHandle {
    pub fn new(aliases: AliasStore) -> Self {
        Self {
            registry: Arc::new(Mutex::new(InterceptRegistry::new())),
            stubs: Arc::new(Mutex::new(Vec::new())),
            aliases,
        }
    }

    pub fn aliases(&self) -> &AliasStore {
        &self.aliases
    }

    pub fn register_intercept(
        &self,
        method: Method,
        pattern: &str,
        alias: &str,
    ) -> HarnessResult<()> {
        self.registry
            .lock()
            .register(method, pattern, alias, &self.aliases)
    }

    pub fn stub(&self, stub: StubResponse) {
        self.stubs.lock().push(stub);
    }

    /// Issue a request from the page under test. Answers from the stub
    /// table (404 when nothing is stubbed) and resolves the best-matching
    /// pending intercept, honoring stub latency.
    pub fn request(&self, method: Method, url: &str, body: Value) -> CapturedResponse {
        let stub = self
            .stubs
            .lock()
            .iter()
            .find(|s| s.applies(method, url, &body))
            .cloned();

        let (response, delay_ms) = match stub {
            Some(s) => (CapturedResponse::new(s.status, s.body.clone()), s.delay_ms),
            None => {
                warn!(%method, url, "request hit no stub");
                (
                    CapturedResponse::new(404, serde_json::json!({ "error": "no stub" })),
                    0,
                )
            }
        };

        debug!(%method, url, status = response.status, "request observed");

        if let Some(alias) = self.registry.lock().match_request(method, url) {
            if delay_ms > 0 {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let aliases = self.aliases.clone();
                    let resolved = response.clone();
                    handle.spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        aliases.bind_response(&alias, resolved);
                    });
                } else {
                    self.aliases.bind_response(&alias, response.clone());
                }
            } else {
                self.aliases.bind_response(&alias, response.clone());
            }
        }

        response
    }

    pub fn pending_intercepts(&self) -> usize {
        self.registry.lock().pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handle() -> NetworkHandle {
        NetworkHandle::new(AliasStore::new())
    }

    #[test]
    fn test_pattern_prefix_and_glob() {
        assert!(UrlPattern::new("/api/login").matches("/api/login"));
        assert!(UrlPattern::new("/api/login").matches("/api/login?next=/"));
        assert!(!UrlPattern::new("/api/login").matches("/api/logout"));
        assert!(UrlPattern::new("/api/*/detail").matches("/api/users/detail"));
        assert!(UrlPattern::new("*/login").matches("https://bank.test/login"));
        assert!(!UrlPattern::new("/api/*/detail").matches("/api/users/list"));
    }

    #[test]
    fn test_duplicate_alias_rejected_while_pending() {
        let net = handle();
        net.register_intercept(Method::Post, "/api/login", "loginRequest")
            .unwrap();
        let err = net
            .register_intercept(Method::Post, "/api/login", "loginRequest")
            .unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateAlias { alias } if alias == "loginRequest"));
    }

    #[test]
    fn test_last_write_wins_after_resolution() {
        let net = handle();
        net.stub(StubResponse {
            method: Method::Post,
            url: UrlPattern::new("/api/a"),
            status: 200,
            body: json!({"from": "a"}),
            body_match: None,
            delay_ms: 0,
        });
        net.stub(StubResponse {
            method: Method::Post,
            url: UrlPattern::new("/api/b"),
            status: 201,
            body: json!({"from": "b"}),
            body_match: None,
            delay_ms: 0,
        });

        net.register_intercept(Method::Post, "/api/a", "x").unwrap();
        net.request(Method::Post, "/api/a", Value::Null);
        // First registration resolved, so the alias may be reused
        net.register_intercept(Method::Post, "/api/b", "x").unwrap();
        net.request(Method::Post, "/api/b", Value::Null);

        match net.aliases().get("x") {
            Some(AliasBinding::Response(r)) => {
                assert_eq!(r.status, 201);
                assert_eq!(r.body, json!({"from": "b"}));
            }
            other => panic!("expected resolved response, got {other:?}"),
        }
    }

    #[test]
    fn test_most_specific_pending_registration_wins() {
        let net = handle();
        net.register_intercept(Method::Get, "/api/", "broad").unwrap();
        net.register_intercept(Method::Get, "/api/users", "narrow")
            .unwrap();

        net.request(Method::Get, "/api/users?page=2", Value::Null);

        assert!(matches!(
            net.aliases().get("narrow"),
            Some(AliasBinding::Response(_))
        ));
        assert!(matches!(
            net.aliases().get("broad"),
            Some(AliasBinding::Pending)
        ));
    }

    #[test]
    fn test_method_must_match_exactly() {
        let net = handle();
        net.register_intercept(Method::Post, "/api/login", "loginRequest")
            .unwrap();
        net.request(Method::Get, "/api/login", Value::Null);
        assert!(matches!(
            net.aliases().get("loginRequest"),
            Some(AliasBinding::Pending)
        ));
    }

    #[test]
    fn test_body_match_selects_stub() {
        let net = handle();
        net.stub(StubResponse {
            method: Method::Post,
            url: UrlPattern::new("/api/login"),
            status: 200,
            body: json!({"token": "abc"}),
            body_match: Some(BTreeMap::from([(
                "password".to_string(),
                json!("secret"),
            )])),
            delay_ms: 0,
        });
        net.stub(StubResponse {
            method: Method::Post,
            url: UrlPattern::new("/api/login"),
            status: 401,
            body: json!({"error": "Invalid credentials"}),
            body_match: None,
            delay_ms: 0,
        });

        let ok = net.request(Method::Post, "/api/login", json!({"password": "secret"}));
        assert_eq!(ok.status, 200);
        let bad = net.request(Method::Post, "/api/login", json!({"password": "nope"}));
        assert_eq!(bad.status, 401);
    }

    #[test]
    fn test_deref_path() {
        let aliases = AliasStore::new();
        aliases.bind_value(
            "adminUser",
            json!({"username": "admin", "password": "secret"}),
        );

        assert_eq!(
            aliases.deref_path("@adminUser.username").unwrap(),
            json!("admin")
        );
        assert_eq!(
            aliases.deref_path("@adminUser").unwrap(),
            json!({"username": "admin", "password": "secret"})
        );
        assert!(matches!(
            aliases.deref_path("@ghost.name"),
            Err(HarnessError::UnregisteredAlias { alias }) if alias == "ghost"
        ));
    }
}
