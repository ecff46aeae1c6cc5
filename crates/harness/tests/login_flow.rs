//! End-to-end login scenarios against the mocked banking app: fixture
//! aliases, network interception, status chaining, and wait timeouts.

mod support;

use specrun_harness::runner::{Outcome, Phase};
use specrun_harness::{ErrorKind, ScenarioRunner, Suite};

use support::{fast_config, login_factory, users_fixtures};

const LOGIN_SUITE: &str = r#"
name: login
description: Login scenarios against the mocked API
tags: [auth, smoke]
before_all:
  - action: bind_fixture
    fixture: users
    key: admin
    alias: adminUser
before_each:
  - action: navigate
    path: /login
  - action: intercept
    method: POST
    url: /api/login
    alias: loginRequest
scenarios:
  - name: rejects a wrong password
    steps:
      - action: type
        selector: { css: "input[name=username]" }
        text: "@adminUser.username"
      - action: type
        selector: { css: "input[name=password]" }
        text: wrongPassword
      - action: click
        selector: { css: "button[type=submit]" }
      - action: wait_for
        alias: loginRequest
        expect_status: 401
      - action: assert_text
        selector: { css: ".error-message" }
        expected: Invalid credentials
        mode: contains
  - name: signs in the admin
    steps:
      - action: type
        selector: { css: "input[name=username]" }
        text: "@adminUser.username"
      - action: type
        selector: { css: "input[name=password]" }
        text: "@adminUser.password"
      - action: click
        selector: { css: "button[type=submit]" }
      - action: wait_for
        alias: loginRequest
        expect_status: 200
      - action: assert_visible
        selector: { test_id: dashboard }
"#;

#[tokio::test]
async fn test_login_suite_passes_end_to_end() {
    let suite = Suite::from_yaml(LOGIN_SUITE).unwrap();
    suite.validate().unwrap();

    let mut runner = ScenarioRunner::new(fast_config()).with_fixtures(users_fixtures());
    let report = runner.run_suite(&suite, &*login_factory()).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 2, "failures: {:?}", report.scenarios);
    assert!(report.all_passed());

    // before_all ran once at suite scope, not per scenario
    let fixture_binds = report
        .suite_hooks
        .iter()
        .filter(|s| s.phase == Phase::BeforeAll)
        .count();
    assert_eq!(fixture_binds, 1);
}

#[tokio::test]
async fn test_fixture_record_is_shared_across_scenarios_unmodified() {
    // Both scenarios above dereference @adminUser; the second types the
    // fixture's exact username/password pair, which is the only combination
    // the 200 stub accepts. A mutated record would 401.
    let suite = Suite::from_yaml(LOGIN_SUITE).unwrap();
    let mut runner = ScenarioRunner::new(fast_config()).with_fixtures(users_fixtures());
    let report = runner.run_suite(&suite, &*login_factory()).await.unwrap();

    let admin_scenario = report
        .scenarios
        .iter()
        .find(|s| s.name == "signs in the admin")
        .unwrap();
    assert!(admin_scenario.outcome.is_passed());
}

#[tokio::test]
async fn test_wait_times_out_when_request_never_fires() {
    let suite = Suite::from_yaml(
        r#"
name: payment
after_each:
  - action: log
    message: cleanup
scenarios:
  - name: waits for a payment that never happens
    steps:
      - action: navigate
        path: /login
      - action: intercept
        method: POST
        url: /api/payment
        alias: paymentRequest
      - action: wait_for
        alias: paymentRequest
        timeout_ms: 150
"#,
    )
    .unwrap();

    let mut runner = ScenarioRunner::new(fast_config());
    let report = runner.run_suite(&suite, &*login_factory()).await.unwrap();

    assert_eq!(report.failed, 1);
    let scenario = &report.scenarios[0];
    match &scenario.outcome {
        Outcome::Failed {
            step_index,
            kind,
            message,
        } => {
            assert_eq!(*step_index, Some(2));
            assert_eq!(*kind, ErrorKind::WaitTimeout);
            assert!(message.contains("paymentRequest"), "message: {message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // Teardown still ran, exactly once
    let teardown_steps: Vec<_> = scenario
        .steps
        .iter()
        .filter(|s| s.phase == Phase::AfterEach)
        .collect();
    assert_eq!(teardown_steps.len(), 1);
    assert!(teardown_steps[0].success);

    // A failure capture ref was emitted for the artifact sink
    assert_eq!(
        scenario.screenshot.as_deref(),
        Some("screenshots/waits for a payment that never happens.png")
    );
}

#[tokio::test]
async fn test_status_mismatch_fails_the_wait_step() {
    let suite = Suite::from_yaml(
        r#"
name: login-status
before_each:
  - action: navigate
    path: /login
  - action: intercept
    method: POST
    url: /api/login
    alias: loginRequest
scenarios:
  - name: expects the wrong status
    steps:
      - action: type
        selector: { css: "input[name=password]" }
        text: wrongPassword
      - action: click
        selector: { css: "button[type=submit]" }
      - action: wait_for
        alias: loginRequest
        expect_status: 200
"#,
    )
    .unwrap();

    let mut runner = ScenarioRunner::new(fast_config());
    let report = runner.run_suite(&suite, &*login_factory()).await.unwrap();

    match &report.scenarios[0].outcome {
        Outcome::Failed { kind, message, .. } => {
            assert_eq!(*kind, ErrorKind::AssertionFailed);
            assert!(message.contains("status 200"), "message: {message}");
            assert!(message.contains("status 401"), "message: {message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
