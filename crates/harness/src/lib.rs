//! Specrun scenario harness
//!
//! A network-aware, alias-based scenario runner for end-to-end UI tests:
//! declarative scenarios drive a pluggable page/document driver, synchronize
//! on intercepted network traffic through symbolic aliases, poll assertions
//! against eventually-consistent UI state, and emit structured per-scenario
//! reports.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ScenarioRunner                         │
//! │   Idle → Setup → Running(step) → Teardown → Done(outcome)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  per-scenario execution context                              │
//! │    ├── ActionDriver   navigate / type / click / check        │
//! │    ├── WaitCoordinator  wait_for(@alias, timeout)            │
//! │    ├── AssertionEngine  visible/text/count/class/absent      │
//! │    ├── NetworkHandle ── InterceptRegistry ── AliasStore      │
//! │    └── Box<dyn Page>  (real driver or mock::MockApp)         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Suite (YAML)                                                │
//! │    ├── hooks: before_all / before_each / after_each /        │
//! │    │          after_all                                      │
//! │    ├── scenarios: [ { name, steps } ]                        │
//! │    └── app: pages / stubs / rules   (self-contained runs)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scenarios are isolated: each owns its page, intercept registry, and
//! alias table. The shared [`fixture::FixtureStore`] is loaded once per run
//! and read-only thereafter.

pub mod assert;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod hooks;
pub mod intercept;
pub mod mock;
pub mod page;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod steps;
pub mod wait;

pub use assert::{MatchMode, Position};
pub use config::{HarnessConfig, Viewport};
pub use error::{ErrorKind, HarnessError, HarnessResult};
pub use fixture::FixtureStore;
pub use hooks::HookSet;
pub use intercept::{AliasStore, CapturedResponse, Method, NetworkHandle};
pub use page::{ElementSnapshot, Page};
pub use runner::{Outcome, ReportSink, RunReport, ScenarioReport, ScenarioRunner};
pub use scenario::{Scenario, Selector, Step, Suite};
pub use steps::{StepArg, StepRegistry};
