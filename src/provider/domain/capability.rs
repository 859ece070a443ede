//! Capability predicates deciding which providers accept a task.

use crate::task::domain::Task;
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Task) -> bool + Send + Sync;

/// Named predicate over a task's input.
///
/// # Examples
///
/// ```
/// use atelier::provider::domain::Capability;
/// use atelier::task::domain::{ReferencePayload, Task, TaskInput};
///
/// let text = Task::new(TaskInput::from_prompt("a lighthouse")).unwrap();
/// let edit = Task::new(
///     TaskInput::from_prompt("restyle").with_reference(ReferencePayload::new("r2://a.png")),
/// )
/// .unwrap();
///
/// assert!(Capability::text_only().matches(&text));
/// assert!(!Capability::text_only().matches(&edit));
/// assert!(Capability::reference_image().matches(&edit));
/// ```
#[derive(Clone)]
pub struct Capability {
    name: String,
    predicate: Arc<Predicate>,
}

impl Capability {
    /// Builds a capability from an arbitrary predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Task) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Accepts every task.
    #[must_use]
    pub fn any() -> Self {
        Self::new("any", |_| true)
    }

    /// Accepts tasks without reference payloads.
    #[must_use]
    pub fn text_only() -> Self {
        Self::new("text_only", |task| !task.input().has_reference())
    }

    /// Accepts tasks carrying at least one reference payload.
    #[must_use]
    pub fn reference_image() -> Self {
        Self::new("reference_image", |task| task.input().has_reference())
    }

    /// Returns `true` when the task satisfies the predicate.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        (self.predicate)(task)
    }

    /// Returns the capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
