//! Scenario runner: phase orchestration and outcome reporting.
//!
//! Each scenario runs in an isolated execution context — its own page,
//! intercept registry, and alias table — through the state machine
//! `Idle → Setup → Running(step) → Teardown → Done(outcome)`. Teardown
//! always executes, and a teardown failure never masks the failure that
//! forced it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::assert::AssertionEngine;
use crate::config::{HarnessConfig, Viewport};
use crate::driver::ActionDriver;
use crate::error::{ErrorKind, HarnessError, HarnessResult};
use crate::fixture::FixtureStore;
use crate::hooks::HookSet;
use crate::intercept::{AliasBinding, AliasStore, NetworkHandle};
use crate::page::Page;
use crate::scenario::{Scenario, Step, Suite};
use crate::wait::WaitCoordinator;

/// Builds the page a scenario context drives. Called once per scenario (and
/// once per suite-level hook context) so scenarios never share a document.
pub type PageFactory = dyn Fn(&Suite, &NetworkHandle) -> Box<dyn Page + Send> + Send + Sync;

/// Phase a step executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeAll,
    BeforeEach,
    Body,
    AfterEach,
    AfterAll,
}

/// Result of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub label: String,
    pub phase: Phase,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    Failed,
    Skipped,
}

/// Final outcome of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed {
        /// Index into the scenario's body steps; `None` when a hook failed
        step_index: Option<usize>,
        kind: ErrorKind,
        message: String,
    },
    Skipped,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Passed => OutcomeKind::Passed,
            Outcome::Failed { .. } => OutcomeKind::Failed,
            Outcome::Skipped => OutcomeKind::Skipped,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Structured record emitted per scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub steps: Vec<StepOutcome>,
    /// Artifact reference from the page driver, captured on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Aggregate result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub viewport: Viewport,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    /// Outcomes of suite-scope hooks (`before_all` / `after_all`)
    pub suite_hooks: Vec<StepOutcome>,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    fn new(base_url: &str, viewport: Viewport) -> Self {
        Self {
            started_at: Utc::now(),
            base_url: base_url.to_string(),
            viewport,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
            suite_hooks: Vec::new(),
            scenarios: Vec::new(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// External collaborator that receives each scenario record as it finishes.
/// The runner only emits; formatting and persistence live behind the sink.
pub trait ReportSink: Send {
    fn emit(&mut self, report: &ScenarioReport);
}

/// Per-scenario state machine (spec'd transitions; `Teardown` is reached on
/// every path out of `Setup` and `Running`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerState {
    Idle,
    Setup,
    Running(usize),
    Teardown,
    Done(OutcomeKind),
}

/// Everything one scenario owns while executing
struct ScenarioCtx {
    page: Box<dyn Page + Send>,
    network: NetworkHandle,
    aliases: AliasStore,
    driver: ActionDriver,
    wait: WaitCoordinator,
    assertions: AssertionEngine,
}

/// Orchestrates suites of scenarios
pub struct ScenarioRunner {
    config: HarnessConfig,
    fixtures: Arc<FixtureStore>,
    global_hooks: HookSet,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl ScenarioRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            fixtures: Arc::new(FixtureStore::new()),
            global_hooks: HookSet::default(),
            sinks: Vec::new(),
        }
    }

    pub fn with_fixtures(mut self, fixtures: FixtureStore) -> Self {
        self.fixtures = Arc::new(fixtures);
        self
    }

    /// Run-level hooks, composed outside every suite's own hooks
    pub fn with_global_hooks(mut self, hooks: HookSet) -> Self {
        self.global_hooks = hooks;
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub async fn run_suite(
        &mut self,
        suite: &Suite,
        factory: &PageFactory,
    ) -> HarnessResult<RunReport> {
        self.run_suites(std::slice::from_ref(suite), factory).await
    }

    /// Run suites in order. Suites and scenarios are independent: a failure
    /// in one never stops the others.
    pub async fn run_suites(
        &mut self,
        suites: &[Suite],
        factory: &PageFactory,
    ) -> HarnessResult<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new(&self.config.base_url, self.config.viewport);

        for suite in suites {
            self.run_suite_into(&mut report, suite, factory).await?;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenarios: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );
        Ok(report)
    }

    async fn run_suite_into(
        &mut self,
        report: &mut RunReport,
        suite: &Suite,
        factory: &PageFactory,
    ) -> HarnessResult<()> {
        // Definition-time errors abort before anything executes
        suite.validate()?;

        let hooks = HookSet::compose(&self.global_hooks, &suite.hooks);
        info!(
            "suite '{}': {} scenario(s) against {} at {}x{}",
            suite.name,
            suite.scenarios.len(),
            self.config.base_url,
            suite.viewport.width,
            suite.viewport.height
        );

        // before_all runs once in its own context; its resolved bindings
        // seed every scenario context
        let mut seed: Vec<(String, AliasBinding)> = Vec::new();
        let mut before_all_error: Option<HarnessError> = None;
        if !hooks.before_all.is_empty() {
            let mut ctx = self.new_context(suite, factory, Vec::new());
            for step in &hooks.before_all {
                let (outcome, err) = self.exec_recorded(&mut ctx, step, Phase::BeforeAll).await;
                report.suite_hooks.push(outcome);
                if let Some(err) = err {
                    before_all_error = Some(HarnessError::HookFailure {
                        hook: "before_all".to_string(),
                        message: err.to_string(),
                    });
                    break;
                }
            }
            seed = ctx.aliases.resolved_bindings();
        }

        for (index, scenario) in suite.scenarios.iter().enumerate() {
            let scenario_report = match &before_all_error {
                Some(err) if index == 0 => ScenarioReport {
                    name: scenario.name.clone(),
                    outcome: Outcome::Failed {
                        step_index: None,
                        kind: ErrorKind::HookFailure,
                        message: err.to_string(),
                    },
                    duration_ms: 0,
                    steps: Vec::new(),
                    screenshot: None,
                },
                Some(_) => ScenarioReport {
                    name: scenario.name.clone(),
                    outcome: Outcome::Skipped,
                    duration_ms: 0,
                    steps: Vec::new(),
                    screenshot: None,
                },
                None => {
                    self.run_scenario(suite, scenario, &hooks, factory, seed.clone())
                        .await
                }
            };

            match scenario_report.outcome.kind() {
                OutcomeKind::Passed => {
                    report.passed += 1;
                    info!("✓ {} ({} ms)", scenario_report.name, scenario_report.duration_ms);
                }
                OutcomeKind::Failed => {
                    report.failed += 1;
                    if let Outcome::Failed { message, .. } = &scenario_report.outcome {
                        error!("✗ {} - {}", scenario_report.name, message);
                    }
                }
                OutcomeKind::Skipped => {
                    report.skipped += 1;
                    warn!("- {} (skipped)", scenario_report.name);
                }
            }
            report.total += 1;

            for sink in &mut self.sinks {
                sink.emit(&scenario_report);
            }
            report.scenarios.push(scenario_report);
        }

        // after_all runs even when scenarios failed; its errors are
        // recorded, never propagated
        if !hooks.after_all.is_empty() {
            let mut ctx = self.new_context(suite, factory, seed);
            for step in &hooks.after_all {
                let (outcome, err) = self.exec_recorded(&mut ctx, step, Phase::AfterAll).await;
                report.suite_hooks.push(outcome);
                if let Some(err) = err {
                    error!("after_all hook failed: {err}");
                }
            }
        }

        Ok(())
    }

    async fn run_scenario(
        &self,
        suite: &Suite,
        scenario: &Scenario,
        hooks: &HookSet,
        factory: &PageFactory,
        seed: Vec<(String, AliasBinding)>,
    ) -> ScenarioReport {
        let start = Instant::now();
        let mut ctx = self.new_context(suite, factory, seed);
        let mut state = RunnerState::Idle;
        let mut steps: Vec<StepOutcome> = Vec::new();
        let mut failure: Option<(Option<usize>, HarnessError)> = None;

        debug!(scenario = %scenario.name, "starting");
        state = Self::advance(state, RunnerState::Setup);

        for step in &hooks.before_each {
            let (outcome, err) = self.exec_recorded(&mut ctx, step, Phase::BeforeEach).await;
            steps.push(outcome);
            if let Some(err) = err {
                failure = Some((
                    None,
                    HarnessError::HookFailure {
                        hook: "before_each".to_string(),
                        message: err.to_string(),
                    },
                ));
                break;
            }
        }

        // A setup failure skips the body entirely
        if failure.is_none() {
            for (index, step) in scenario.steps.iter().enumerate() {
                state = Self::advance(state, RunnerState::Running(index));
                let (outcome, err) = self.exec_recorded(&mut ctx, step, Phase::Body).await;
                steps.push(outcome);
                if let Some(err) = err {
                    failure = Some((Some(index), err));
                    break;
                }
            }
        }

        // Teardown runs on every path; its failures are recorded but never
        // mask the original failure
        state = Self::advance(state, RunnerState::Teardown);
        for step in &hooks.after_each {
            let (outcome, err) = self.exec_recorded(&mut ctx, step, Phase::AfterEach).await;
            steps.push(outcome);
            if let Some(err) = err {
                warn!(scenario = %scenario.name, "after_each hook failed: {err}");
                if failure.is_none() {
                    failure = Some((
                        None,
                        HarnessError::HookFailure {
                            hook: "after_each".to_string(),
                            message: err.to_string(),
                        },
                    ));
                }
            }
        }

        let screenshot = match &failure {
            Some(_) if self.config.screenshot_on_failure => ctx.page.capture(&scenario.name),
            _ => None,
        };

        let outcome = match failure {
            None => Outcome::Passed,
            Some((step_index, err)) => Outcome::Failed {
                step_index,
                kind: err.kind(),
                message: err.to_string(),
            },
        };
        Self::advance(state, RunnerState::Done(outcome.kind()));

        ScenarioReport {
            name: scenario.name.clone(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            screenshot,
        }
    }

    fn advance(from: RunnerState, to: RunnerState) -> RunnerState {
        debug!(?from, ?to, "state transition");
        to
    }

    fn new_context(
        &self,
        suite: &Suite,
        factory: &PageFactory,
        seed: Vec<(String, AliasBinding)>,
    ) -> ScenarioCtx {
        let aliases = AliasStore::new();
        aliases.seed(seed);
        let network = NetworkHandle::new(aliases.clone());
        let page = factory(suite, &network);

        ScenarioCtx {
            page,
            driver: ActionDriver::new(self.config.action_timeout, self.config.poll_interval),
            wait: WaitCoordinator::new(
                aliases.clone(),
                self.config.wait_timeout,
                self.config.poll_interval,
            ),
            assertions: AssertionEngine::new(self.config.assert_timeout, self.config.poll_interval),
            network,
            aliases,
        }
    }

    async fn exec_recorded(
        &self,
        ctx: &mut ScenarioCtx,
        step: &Step,
        phase: Phase,
    ) -> (StepOutcome, Option<HarnessError>) {
        let start = Instant::now();
        debug!(step = %step.label(), ?phase, "executing");
        let result = self.exec_step(ctx, step).await;

        let outcome = StepOutcome {
            label: step.label(),
            phase,
            success: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        (outcome, result.err())
    }

    async fn exec_step(&self, ctx: &mut ScenarioCtx, step: &Step) -> HarnessResult<()> {
        match step {
            Step::Navigate { path } => ctx.driver.navigate(ctx.page.as_mut(), path).await,
            Step::Type { selector, text } => {
                let text = resolve_text(&ctx.aliases, text)?;
                ctx.driver
                    .type_text(ctx.page.as_mut(), selector, &text)
                    .await
            }
            Step::Click { selector } => ctx.driver.click(ctx.page.as_mut(), selector).await,
            Step::Check { selector } => ctx.driver.check(ctx.page.as_mut(), selector).await,
            Step::Intercept { method, url, alias } => {
                ctx.network.register_intercept(*method, url, alias)
            }
            Step::WaitFor {
                alias,
                timeout_ms,
                expect_status,
            } => {
                let response = ctx
                    .wait
                    .wait_for(alias, timeout_ms.map(Duration::from_millis))
                    .await?;
                if let Some(expected) = expect_status {
                    if response.status != *expected {
                        return Err(HarnessError::AssertionFailed {
                            selector: format!("@{alias}"),
                            expected: format!("status {expected}"),
                            actual: format!("status {}", response.status),
                        });
                    }
                }
                Ok(())
            }
            Step::BindFixture {
                fixture,
                key,
                alias,
            } => {
                let record = self.fixtures.record(fixture, key)?;
                ctx.aliases.bind_value(alias, record);
                Ok(())
            }
            Step::AssertVisible { selector } => {
                ctx.assertions
                    .assert_visible(ctx.page.as_ref(), selector)
                    .await
            }
            Step::AssertText {
                selector,
                expected,
                mode,
                position,
            } => {
                ctx.assertions
                    .assert_text(ctx.page.as_ref(), selector, expected, *mode, *position)
                    .await
            }
            Step::AssertCount { selector, count } => {
                ctx.assertions
                    .assert_count(ctx.page.as_ref(), selector, *count)
                    .await
            }
            Step::AssertClass { selector, class } => {
                ctx.assertions
                    .assert_class(ctx.page.as_ref(), selector, class)
                    .await
            }
            Step::AssertAbsent { selector } => {
                ctx.assertions
                    .assert_absent(ctx.page.as_ref(), selector)
                    .await
            }
            Step::Screenshot { name } => {
                ctx.page.capture(name);
                Ok(())
            }
            Step::Log { message } => {
                info!("[scenario] {message}");
                Ok(())
            }
        }
    }
}

/// Resolve an `@alias.path` text parameter against the alias store; plain
/// text passes through untouched
fn resolve_text(aliases: &AliasStore, text: &str) -> HarnessResult<String> {
    if !text.starts_with('@') {
        return Ok(text.to_string());
    }
    let value = aliases.deref_path(text)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
