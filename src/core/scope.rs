//! Per-logger scope stack
//!
//! Scopes live in an immutable singly-linked list. Pushing rebuilds the chain with
//! the new value at the tail and swaps the root with compare-and-swap; a guard
//! truncates back to its index when dropped unless the chain is already shorter.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct ScopeNode<T> {
    value: T,
    next: Option<Arc<ScopeNode<T>>>,
}

type Link<T> = Option<Arc<ScopeNode<T>>>;

fn count<T>(link: &Link<T>) -> usize {
    let mut n = 0;
    let mut current = link.as_deref();
    while let Some(node) = current {
        n += 1;
        current = node.next.as_deref();
    }
    n
}

fn collect<T: Clone>(link: &Link<T>, limit: usize) -> Vec<T> {
    let mut values = Vec::new();
    let mut current = link.as_deref();
    while let Some(node) = current {
        if values.len() == limit {
            break;
        }
        values.push(node.value.clone());
        current = node.next.as_deref();
    }
    values
}

fn build<T>(values: Vec<T>) -> Link<T> {
    values
        .into_iter()
        .rev()
        .fold(None, |next, value| Some(Arc::new(ScopeNode { value, next })))
}

fn append<T: Clone>(link: &Link<T>, value: T) -> Link<T> {
    let mut values = collect(link, usize::MAX);
    values.push(value);
    build(values)
}

fn truncate<T: Clone>(link: &Link<T>, length: usize) -> Link<T> {
    build(collect(link, length))
}

fn same<T>(a: &Link<T>, b: &Link<T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

pub struct ScopeStack<T> {
    root: ArcSwapOption<ScopeNode<T>>,
}

impl<T: Clone> ScopeStack<T> {
    pub fn new() -> Self {
        Self {
            root: ArcSwapOption::empty(),
        }
    }

    /// Append `value` and return the depth before the append.
    pub fn push(&self, value: T) -> usize {
        loop {
            let current = self.root.load_full();
            let index = count(&current);
            let next = append(&current, value.clone());
            let previous = self.root.compare_and_swap(&current, next);
            if same(&*previous, &current) {
                return index;
            }
        }
    }

    /// Cut the chain back to `length` entries. No-op when it is already shorter.
    pub fn truncate(&self, length: usize) {
        loop {
            let current = self.root.load_full();
            if count(&current) < length {
                return;
            }
            let next = truncate(&current, length);
            let previous = self.root.compare_and_swap(&current, next);
            if same(&*previous, &current) {
                return;
            }
        }
    }

    pub fn len(&self) -> usize {
        count(&self.root.load_full())
    }

    pub fn is_empty(&self) -> bool {
        self.root.load().is_none()
    }

    /// Snapshot of the current values, outermost first.
    pub fn values(&self) -> Vec<T> {
        collect(&self.root.load_full(), usize::MAX)
    }

    /// Push `value` and return a guard that truncates back on drop.
    pub fn begin(&self, value: T) -> ScopeGuard<'_, T> {
        let index = self.push(value);
        ScopeGuard {
            stack: self,
            index,
            disposed: AtomicBool::new(false),
        }
    }
}

impl<T: Clone> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ScopeStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStack")
            .field("depth", &count(&self.root.load_full()))
            .finish()
    }
}

/// Token returned by [`ScopeStack::begin`].
#[must_use = "the scope ends when the guard is dropped"]
pub struct ScopeGuard<'a, T: Clone> {
    stack: &'a ScopeStack<T>,
    index: usize,
    disposed: AtomicBool,
}

impl<T: Clone> ScopeGuard<'_, T> {
    /// Depth of the stack before this scope was pushed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// End the scope. Only the first call truncates.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.stack.truncate(self.index);
        }
    }
}

impl<T: Clone> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
