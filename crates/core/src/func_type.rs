use crate::ValType;
use alloc::sync::Arc;
use core::fmt;

/// A function signature: an ordered parameter tuple and an ordered result
/// tuple.
///
/// [`FuncType`] is cheap to clone — it shares its backing storage via
/// [`Arc`], so the same type read once from a module's type section and
/// referenced from many call sites remains the same allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    inner: Arc<FuncTypeInner>,
}

#[derive(PartialEq, Eq, Hash)]
struct FuncTypeInner {
    params: alloc::vec::Vec<ValType>,
    results: alloc::vec::Vec<ValType>,
}

impl FuncType {
    /// Creates a new function type from its parameter and result tuples.
    pub fn new<P, R>(params: P, results: R) -> Self
    where
        P: IntoIterator<Item = ValType>,
        R: IntoIterator<Item = ValType>,
    {
        Self {
            inner: Arc::new(FuncTypeInner {
                params: params.into_iter().collect(),
                results: results.into_iter().collect(),
            }),
        }
    }

    /// The ordered parameter types.
    pub fn params(&self) -> &[ValType] {
        &self.inner.params
    }

    /// The ordered result types.
    pub fn results(&self) -> &[ValType] {
        &self.inner.results
    }

    /// `true` iff this type has no results (e.g. `block`'s empty type).
    pub fn returns_nothing(&self) -> bool {
        self.inner.results.is_empty()
    }
}

impl fmt::Debug for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncType")
            .field("params", &self.inner.params)
            .field("results", &self.inner.results)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_storage() {
        let ty = FuncType::new([ValType::I32, ValType::I32], [ValType::I32]);
        let ty2 = ty.clone();
        assert!(Arc::ptr_eq(&ty.inner, &ty2.inner));
    }

    #[test]
    fn empty_block_type_returns_nothing() {
        let ty = FuncType::new([], []);
        assert!(ty.returns_nothing());
    }
}
