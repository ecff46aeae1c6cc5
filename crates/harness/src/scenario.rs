//! Declarative suite and step model.
//!
//! A suite file holds one group of scenarios with its phase hooks, an
//! optional inline app model for self-contained runs, and optional network
//! stubs. Suites are immutable once execution begins; validation happens at
//! definition time, before any step runs.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assert::{MatchMode, Position};
use crate::config::Viewport;
use crate::error::{HarnessError, HarnessResult};
use crate::hooks::HookSet;
use crate::intercept::Method;
use crate::mock::AppModel;

/// How a step locates its target element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Raw CSS selector
    Css(String),
    /// The `[data-test=<name>]` convention
    TestId(String),
    /// First element whose visible text contains the needle
    Text(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn test_id(s: impl Into<String>) -> Self {
        Selector::TestId(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Selector::Text(s.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => f.write_str(s),
            Selector::TestId(s) => write!(f, "[data-test={s}]"),
            Selector::Text(s) => write!(f, "text~'{s}'"),
        }
    }
}

/// A single scenario directive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a document
    Navigate { path: String },

    /// Type into a field. `text` may be an `@alias.path` reference, resolved
    /// against the alias store at execution time.
    Type { selector: Selector, text: String },

    /// Click an element
    Click { selector: Selector },

    /// Check a checkbox
    Check { selector: Selector },

    /// Register a network expectation under an alias
    Intercept {
        method: Method,
        url: String,
        alias: String,
    },

    /// Suspend until the aliased response lands, optionally asserting its
    /// status code
    WaitFor {
        alias: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        expect_status: Option<u16>,
    },

    /// Bind a fixture record to an alias
    BindFixture {
        fixture: String,
        key: String,
        alias: String,
    },

    AssertVisible {
        selector: Selector,
    },

    AssertText {
        selector: Selector,
        expected: String,
        #[serde(default)]
        mode: MatchMode,
        #[serde(default)]
        position: Position,
    },

    AssertCount {
        selector: Selector,
        count: usize,
    },

    AssertClass {
        selector: Selector,
        class: String,
    },

    AssertAbsent {
        selector: Selector,
    },

    /// Ask the page driver for a capture ref
    Screenshot { name: String },

    /// Emit a message into the run log
    Log { message: String },
}

impl Step {
    /// Short label for step outcomes and log lines
    pub fn label(&self) -> String {
        match self {
            Step::Navigate { path } => format!("navigate:{path}"),
            Step::Type { selector, .. } => format!("type:{selector}"),
            Step::Click { selector } => format!("click:{selector}"),
            Step::Check { selector } => format!("check:{selector}"),
            Step::Intercept { method, url, alias } => {
                format!("intercept:{method} {url} as @{alias}")
            }
            Step::WaitFor { alias, .. } => format!("wait:@{alias}"),
            Step::BindFixture { fixture, key, alias } => {
                format!("fixture:{fixture}.{key} as @{alias}")
            }
            Step::AssertVisible { selector } => format!("assert-visible:{selector}"),
            Step::AssertText { selector, .. } => format!("assert-text:{selector}"),
            Step::AssertCount { selector, count } => {
                format!("assert-count:{selector}={count}")
            }
            Step::AssertClass { selector, class } => {
                format!("assert-class:{selector}.{class}")
            }
            Step::AssertAbsent { selector } => format!("assert-absent:{selector}"),
            Step::Screenshot { name } => format!("screenshot:{name}"),
            Step::Log { message } => {
                format!("log:{}", &message[..message.len().min(30)])
            }
        }
    }
}

/// One complete ordered test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

/// A group of scenarios sharing hooks, tags, and (optionally) an inline app
/// model — the unit one suite file describes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering suites in a run
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub viewport: Viewport,

    /// Static page models and network stubs for self-contained runs; suites
    /// embedded in Rust tests usually omit this and supply a page factory
    /// instead
    #[serde(default)]
    pub app: Option<AppModel>,

    #[serde(flatten)]
    pub hooks: HookSet,

    pub scenarios: Vec<Scenario>,
}

impl Suite {
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(HarnessError::from)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            HarnessError::SuiteParse(format!("{}: {e}", path.display()))
        })
    }

    /// Load every suite file under a directory, in file-name order
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        let mut suites = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            suites.push(Self::from_file(entry.path())?);
        }

        Ok(suites)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Definition-time validation of the alias invariant: a `wait_for` must
    /// reference an intercept registered earlier in its phase chain, and an
    /// `@alias` text reference must name an alias bound earlier in the
    /// chain. Violations fail the suite before any step executes.
    pub fn validate(&self) -> HarnessResult<()> {
        for scenario in &self.scenarios {
            let body_chain = self
                .hooks
                .before_all
                .iter()
                .chain(self.hooks.before_each.iter())
                .chain(scenario.steps.iter())
                .chain(self.hooks.after_each.iter());
            Self::validate_chain(body_chain)?;
        }

        // after_all runs in its own context, seeded only from before_all
        let suite_chain = self
            .hooks
            .before_all
            .iter()
            .chain(self.hooks.after_all.iter());
        Self::validate_chain(suite_chain)
    }

    fn validate_chain<'a>(chain: impl Iterator<Item = &'a Step>) -> HarnessResult<()> {
        let mut intercepts: HashSet<&str> = HashSet::new();
        let mut bound: HashSet<&str> = HashSet::new();

        for step in chain {
            match step {
                Step::Intercept { alias, .. } => {
                    intercepts.insert(alias);
                    bound.insert(alias);
                }
                Step::BindFixture { alias, .. } => {
                    bound.insert(alias);
                }
                Step::WaitFor { alias, .. } => {
                    if !intercepts.contains(alias.as_str()) {
                        return Err(HarnessError::UnregisteredAlias {
                            alias: alias.clone(),
                        });
                    }
                }
                Step::Type { text, .. } => {
                    if let Some(reference) = text.strip_prefix('@') {
                        let root = reference.split('.').next().unwrap_or_default();
                        if !bound.contains(root) {
                            return Err(HarnessError::UnregisteredAlias {
                                alias: root.to_string(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
