//! The active pipeline definition.
//!
//! At most one definition is active per thread. Step calls made while a
//! context is active are recorded as invocations instead of executed.

use super::StepInvocation;
use crate::errors::PipelineContextError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::Arc;
use uuid::Uuid;

thread_local! {
    static ACTIVE: RefCell<Option<Arc<PipelineContext>>> = const { RefCell::new(None) };
}

/// Collects the step invocations of one pipeline definition.
#[derive(Debug)]
pub struct PipelineContext {
    id: Uuid,
    name: String,
    invocations: Mutex<IndexMap<String, StepInvocation>>,
}

impl PipelineContext {
    /// Creates an inactive context.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            invocations: Mutex::new(IndexMap::new()),
        }
    }

    /// Returns the context id carried by its artifact references.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context active on this thread.
    #[must_use]
    pub fn active() -> Option<Arc<Self>> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    /// Activates the context until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if another context is already active on this thread.
    pub fn activate(self: Arc<Self>) -> Result<ActivationGuard, PipelineContextError> {
        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(ref active) = *slot {
                return Err(PipelineContextError::NestedPipeline {
                    active: active.name.clone(),
                    requested: self.name.clone(),
                });
            }
            tracing::debug!(pipeline = %self.name, id = %self.id, "Activated pipeline context");
            *slot = Some(self);
            Ok(ActivationGuard { _private: () })
        })
    }

    /// Registers an invocation and returns its unique id.
    ///
    /// A custom id must be unused. Without one the step name is used,
    /// suffixed with `_2`, `_3`, ... when it is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom id is already taken.
    pub fn add_step(
        &self,
        mut invocation: StepInvocation,
        custom_id: Option<String>,
    ) -> Result<String, PipelineContextError> {
        let mut invocations = self.invocations.lock();

        let id = match custom_id {
            Some(id) if invocations.contains_key(&id) => {
                return Err(PipelineContextError::DuplicateStepId {
                    pipeline: self.name.clone(),
                    id,
                })
            }
            Some(id) => id,
            None => {
                let base = invocation.step().name().to_string();
                let mut candidate = base.clone();
                let mut counter = 2;
                while invocations.contains_key(&candidate) {
                    candidate = format!("{base}_{counter}");
                    counter += 1;
                }
                candidate
            }
        };

        invocation.assign_id(&id);
        tracing::debug!(pipeline = %self.name, step = %id, "Recorded step invocation");
        invocations.insert(id.clone(), invocation);
        Ok(id)
    }

    /// Returns the ids of the recorded invocations, in call order.
    #[must_use]
    pub fn invocation_ids(&self) -> Vec<String> {
        self.invocations.lock().keys().cloned().collect()
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invocations.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invocations.lock().is_empty()
    }

    pub(crate) fn take_invocations(&self) -> IndexMap<String, StepInvocation> {
        std::mem::take(&mut *self.invocations.lock())
    }
}

/// Keeps a pipeline context active. Dropping it deactivates the context,
/// on error returns and panics alike.
#[derive(Debug)]
#[must_use = "the context is deactivated when the guard is dropped"]
pub struct ActivationGuard {
    _private: (),
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        ACTIVE.with(|slot| {
            if let Some(context) = slot.borrow_mut().take() {
                tracing::debug!(pipeline = %context.name, "Deactivated pipeline context");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_lifecycle() {
        let context = Arc::new(PipelineContext::new("training"));
        assert!(PipelineContext::active().is_none());

        {
            let _guard = Arc::clone(&context).activate().unwrap();
            assert_eq!(PipelineContext::active().unwrap().id(), context.id());
        }

        assert!(PipelineContext::active().is_none());
    }

    #[test]
    fn test_nested_activation_fails() {
        let outer = Arc::new(PipelineContext::new("outer"));
        let _guard = outer.activate().unwrap();

        let err = Arc::new(PipelineContext::new("inner")).activate().unwrap_err();
        assert_eq!(
            err,
            PipelineContextError::NestedPipeline {
                active: "outer".to_string(),
                requested: "inner".to_string(),
            }
        );
    }

    #[test]
    fn test_deactivates_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = Arc::new(PipelineContext::new("boom")).activate().unwrap();
            panic!("definition failed");
        });

        assert!(result.is_err());
        assert!(PipelineContext::active().is_none());
    }

    #[test]
    fn test_contexts_are_per_thread() {
        let _guard = Arc::new(PipelineContext::new("main")).activate().unwrap();

        let other = std::thread::spawn(|| PipelineContext::active().is_none())
            .join()
            .unwrap();
        assert!(other);
    }
}
