//! Phase hooks and their composition across scopes.
//!
//! Hooks are explicit ordered step lists per scope — there is no ambient
//! registration order to rely on. Composition rule: outer-scope hooks run
//! before inner-scope hooks for `before_*`, and in reverse order for
//! `after_*`, so teardown unwinds setup.

use serde::{Deserialize, Serialize};

use crate::scenario::Step;

/// The four phase hook lists around a suite's scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookSet {
    /// Runs once before the first scenario; its resolved alias bindings seed
    /// every scenario context
    #[serde(default)]
    pub before_all: Vec<Step>,

    /// Runs at the start of every scenario (the Setup phase)
    #[serde(default)]
    pub before_each: Vec<Step>,

    /// Runs at the end of every scenario regardless of outcome (the
    /// Teardown phase)
    #[serde(default)]
    pub after_each: Vec<Step>,

    /// Runs once after the last scenario, even when scenarios failed
    #[serde(default)]
    pub after_all: Vec<Step>,
}

impl HookSet {
    pub fn is_empty(&self) -> bool {
        self.before_all.is_empty()
            && self.before_each.is_empty()
            && self.after_each.is_empty()
            && self.after_all.is_empty()
    }

    /// Merge an outer scope (run-level) with an inner scope (suite-level)
    pub fn compose(outer: &HookSet, inner: &HookSet) -> HookSet {
        let forward = |a: &[Step], b: &[Step]| {
            let mut steps = a.to_vec();
            steps.extend_from_slice(b);
            steps
        };

        HookSet {
            before_all: forward(&outer.before_all, &inner.before_all),
            before_each: forward(&outer.before_each, &inner.before_each),
            after_each: forward(&inner.after_each, &outer.after_each),
            after_all: forward(&inner.after_all, &outer.after_all),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(message: &str) -> Step {
        Step::Log {
            message: message.to_string(),
        }
    }

    fn messages(steps: &[Step]) -> Vec<&str> {
        steps
            .iter()
            .map(|s| match s {
                Step::Log { message } => message.as_str(),
                _ => panic!("expected log step"),
            })
            .collect()
    }

    #[test]
    fn test_compose_ordering() {
        let outer = HookSet {
            before_each: vec![log("outer-before")],
            after_each: vec![log("outer-after")],
            ..Default::default()
        };
        let inner = HookSet {
            before_each: vec![log("inner-before")],
            after_each: vec![log("inner-after")],
            ..Default::default()
        };

        let composed = HookSet::compose(&outer, &inner);
        assert_eq!(
            messages(&composed.before_each),
            vec!["outer-before", "inner-before"]
        );
        assert_eq!(
            messages(&composed.after_each),
            vec!["inner-after", "outer-after"]
        );
    }

    #[test]
    fn test_compose_with_empty_outer_is_identity() {
        let inner = HookSet {
            before_all: vec![log("setup")],
            after_all: vec![log("cleanup")],
            ..Default::default()
        };

        let composed = HookSet::compose(&HookSet::default(), &inner);
        assert_eq!(messages(&composed.before_all), vec!["setup"]);
        assert_eq!(messages(&composed.after_all), vec!["cleanup"]);
    }
}
