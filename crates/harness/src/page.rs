//! The document seam: a pluggable page driver.
//!
//! The harness never talks to a browser directly. Every scenario receives a
//! boxed [`Page`] built by the run's page factory; the action driver and the
//! assertion engine are written against this trait only. The in-memory
//! reference implementation lives in [`crate::mock`].

use crate::error::HarnessResult;
use crate::scenario::Selector;

/// Read-only view of one matched element at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementSnapshot {
    pub text: String,
    pub value: String,
    pub classes: Vec<String>,
    pub checked: bool,
    pub visible: bool,
}

impl ElementSnapshot {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// A live document a scenario can drive.
///
/// Action methods return `false` when the target does not currently exist or
/// is not interactable; the action driver retries on a poll tick until its
/// bounded window closes. Hard failures (a driver losing its session, say)
/// surface through `navigate`'s `Result`.
pub trait Page: Send {
    /// Load the document at `path`, relative to the driver's origin
    fn navigate(&mut self, path: &str) -> HarnessResult<()>;

    /// Path of the currently loaded document
    fn current_path(&self) -> String;

    /// Snapshots of every element matching `selector`, in document order,
    /// including invisible ones
    fn query(&self, selector: &Selector) -> Vec<ElementSnapshot>;

    /// Type into the first visible match
    fn type_text(&mut self, selector: &Selector, text: &str) -> bool;

    /// Click the first visible match
    fn click(&mut self, selector: &Selector) -> bool;

    /// Check the checkbox that is the first visible match
    fn check(&mut self, selector: &Selector) -> bool;

    /// Produce an artifact reference for a capture, if the driver supports
    /// captures. The harness only forwards the ref, it never encodes images.
    fn capture(&mut self, _name: &str) -> Option<String> {
        None
    }
}
