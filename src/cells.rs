// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-threaded interior-mutability cells.
//!
//! The core event loop (spec §5) is cooperative and single-threaded: no
//! component is ever reentered while one of its methods is on the stack.
//! That makes `RefCell`'s runtime borrow panics unnecessary ceremony; these
//! cells give the same "shared reference, mutable contents" shape `Cell<T>`
//! gives for `Copy` types, extended to `Option<T>` and move-only `T`.

use core::cell::Cell;

/// A `Cell<Option<T>>` with ergonomic helpers, for `T: Copy`.
///
/// Used for optional callback references and small `Copy` state.
pub struct OptionalCell<T> {
    value: Cell<Option<T>>,
}

impl<T: Copy> OptionalCell<T> {
    pub const fn empty() -> Self {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    pub const fn new(value: T) -> Self {
        OptionalCell {
            value: Cell::new(Some(value)),
        }
    }

    pub fn set(&self, value: T) {
        self.value.set(Some(value));
    }

    pub fn clear(&self) {
        self.value.set(None);
    }

    pub fn is_some(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.get().is_none()
    }

    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    /// Calls `f` with the contained value, if any, returning its result.
    pub fn map<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(f)
    }

    /// Like [`map`](Self::map), but returns `default` when empty.
    pub fn map_or<F, R>(&self, default: R, f: F) -> R
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map_or(default, f)
    }

    pub fn and_then<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(T) -> Option<R>,
    {
        self.value.get().and_then(f)
    }
}

impl<T: Copy> Default for OptionalCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A cell that can hold a move-only value and hand out ownership of it.
///
/// Modeled on the "take it, use it, put it back" discipline `TakeCell`
/// enforces: a method that needs the contents takes ownership for the
/// duration of a closure and is responsible for replacing it (or leaving it
/// empty, e.g. because ownership moved elsewhere, such as into a queue).
pub struct TakeCell<T> {
    value: Cell<Option<T>>,
}

impl<T> TakeCell<T> {
    pub const fn new(value: T) -> Self {
        TakeCell {
            value: Cell::new(Some(value)),
        }
    }

    pub const fn empty() -> Self {
        TakeCell {
            value: Cell::new(None),
        }
    }

    /// Removes and returns the contents, leaving the cell empty.
    pub fn take(&self) -> Option<T> {
        self.value.take()
    }

    /// Puts a value back into the cell, overwriting any previous contents.
    pub fn replace(&self, value: T) {
        self.value.set(Some(value));
    }

    pub fn is_none(&self) -> bool {
        // `Cell::take` would move out; peek via a swap-and-restore instead.
        let inner = self.value.take();
        let is_none = inner.is_none();
        self.value.set(inner);
        is_none
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Takes the value, calls `f` on it, and puts the (possibly new) result
    /// back. No-op if the cell was empty.
    pub fn map<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(T) -> (T, R),
    {
        self.take().map(|inner| {
            let (inner, result) = f(inner);
            self.replace(inner);
            result
        })
    }
}

/// A cell holding a value that is itself replaced wholesale by state-machine
/// steps (see `mac::framer`), rather than mutated in place.
///
/// Distinguished from [`TakeCell`] only by convention: `MapCell` is used
/// where the contained type is an enum whose variants *are* the state
/// machine, and every access goes through `take`/`replace` in pairs.
pub type MapCell<T> = TakeCell<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_cell_round_trips() {
        let c: OptionalCell<u32> = OptionalCell::empty();
        assert!(c.is_none());
        c.set(7);
        assert_eq!(c.get(), Some(7));
        assert_eq!(c.map(|v| v + 1), Some(8));
        c.clear();
        assert!(c.is_none());
    }

    #[test]
    fn take_cell_take_and_replace() {
        let c: TakeCell<u32> = TakeCell::new(5);
        assert!(c.is_some());
        let v = c.take().unwrap();
        assert!(c.is_none());
        c.replace(v + 1);
        assert_eq!(c.take(), Some(6));
    }
}
