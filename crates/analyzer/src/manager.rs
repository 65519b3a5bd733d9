//! A single-threaded, memoized dependency graph of analyses over one
//! [`Module`].
//!
//! Each [`Analysis`] declares its output type and computes it from the
//! manager, which it can re-borrow to pull in other analyses' results —
//! [`AnalysisManager::get`] runs an analysis at most once per manager
//! instance and hands back a cheaply-cloned [`Rc`] to every caller after
//! the first.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::any::{Any, TypeId};
use core::cell::RefCell;

use crate::{error::Error, module::Module};

/// A single named analysis pass. `Self` is a zero-sized marker type; the
/// actual computation lives in [`Analysis::run`], which receives the
/// manager so it can depend on other analyses via `manager.get::<Other>()`.
pub trait Analysis: 'static {
    type Output: 'static;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error>;
}

/// Owns the [`Module`] under analysis and memoizes every [`Analysis`] run
/// against it.
pub struct AnalysisManager {
    module: Module,
    cache: RefCell<BTreeMap<TypeId, Rc<dyn Any>>>,
}

impl AnalysisManager {
    pub fn new(module: Module) -> Self {
        Self { module, cache: RefCell::new(BTreeMap::new()) }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Runs (or returns the memoized result of) analysis `A`.
    pub fn get<A: Analysis>(&self) -> Result<Rc<A::Output>, Error> {
        let type_id = TypeId::of::<A>();
        if let Some(cached) = self.cache.borrow().get(&type_id) {
            tracing::debug!(analysis = core::any::type_name::<A>(), "analysis cache hit");
            return Ok(cached
                .clone()
                .downcast::<A::Output>()
                .expect("cache entry keyed by TypeId::of::<A>() always stores A::Output"));
        }

        tracing::debug!(analysis = core::any::type_name::<A>(), "running analysis");
        let output = Rc::new(A::run(self)?);
        self.cache.borrow_mut().insert(type_id, output.clone());
        Ok(output)
    }

    /// `true` if `A` has already been run against this module.
    pub fn has_run<A: Analysis>(&self) -> bool {
        self.cache.borrow().contains_key(&TypeId::of::<A>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    std::thread_local! {
        static RUN_COUNT: Cell<u32> = const { Cell::new(0) };
    }

    struct CountsRuns;
    impl Analysis for CountsRuns {
        type Output = u32;
        fn run(_manager: &AnalysisManager) -> Result<u32, Error> {
            RUN_COUNT.with(|c| {
                c.set(c.get() + 1);
                Ok(c.get())
            })
        }
    }

    #[test]
    fn an_analysis_runs_at_most_once_per_manager() {
        RUN_COUNT.with(|c| c.set(0));
        let manager = AnalysisManager::new(Module::default());
        assert!(!manager.has_run::<CountsRuns>());
        let first = manager.get::<CountsRuns>().unwrap();
        let second = manager.get::<CountsRuns>().unwrap();
        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert!(manager.has_run::<CountsRuns>());
    }
}
