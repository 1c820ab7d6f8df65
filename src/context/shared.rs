//! Thread-safe wrapper over a context.
//!
//! The engine itself is single-threaded and cooperative; hosts that expose
//! it across threads must serialize every mutating operation behind one
//! mutual-exclusion boundary. [`SharedAnalysisContext`] is that boundary: a
//! cloneable handle whose every access goes through one lock.

use std::sync::Arc;

use parking_lot::Mutex;

use super::AnalysisContext;
use super::changes::{ChangeNotice, ChangeSet};
use crate::base::Source;

/// Cloneable, lock-guarded handle to an [`AnalysisContext`].
#[derive(Clone)]
pub struct SharedAnalysisContext {
    inner: Arc<Mutex<AnalysisContext>>,
}

impl SharedAnalysisContext {
    pub fn new(context: AnalysisContext) -> SharedAnalysisContext {
        SharedAnalysisContext {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// Run `f` with exclusive access to the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut AnalysisContext) -> R) -> R {
        f(&mut self.inner.lock())
    }

    // Forwarders for the calls a driving loop makes constantly.

    pub fn apply_change_set(&self, changes: ChangeSet) {
        self.with(|context| context.apply_change_set(changes));
    }

    pub fn perform_analysis_task(&self) -> Option<Vec<ChangeNotice>> {
        self.with(AnalysisContext::perform_analysis_task)
    }

    pub fn set_contents(&self, source: Source, content: Option<&str>) {
        self.with(|context| context.set_contents(source, content));
    }

    pub fn set_analysis_priority_order(&self, order: Vec<Source>) {
        self.with(|context| context.set_analysis_priority_order(order));
    }
}

impl std::fmt::Debug for SharedAnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedAnalysisContext")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisOptions;

    #[test]
    fn test_shared_context_is_send_and_clone() {
        fn assert_send<T: Send>(_: &T) {}

        let (context, provider) = AnalysisContext::in_memory(AnalysisOptions::default());
        provider.set("a.lm", "library a;");
        let shared = SharedAnalysisContext::new(context);
        assert_send(&shared);

        let clone = shared.clone();
        let source = shared.with(|context| context.intern_path("a.lm"));
        clone.apply_change_set(ChangeSet::new().added(source));
        while clone.perform_analysis_task().is_some() {}
        assert_eq!(
            shared.with(|context| context.get_kind(source)),
            Some(crate::base::SourceKind::Library)
        );
    }
}
