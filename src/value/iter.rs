//! A shared, consumable iterator value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Value;

/// A cursor over a materialized sequence of values.
///
/// Cloning shares the cursor, so a partially consumed iterator observed
/// through one handle is partially consumed through all of them. This mirrors
/// live-iterator semantics: truthiness peeks, `length` consumes, `rest`
/// consumes the first element.
#[derive(Clone)]
pub struct IterValue {
    inner: Rc<RefCell<Cursor>>,
}

struct Cursor {
    items: Vec<Value>,
    pos: usize,
}

impl IterValue {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Cursor { items, pos: 0 })),
        }
    }

    /// Whether another element is available, without consuming it.
    pub fn has_next(&self) -> bool {
        let cursor = self.inner.borrow();
        cursor.pos < cursor.items.len()
    }

    /// Consume and return the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Value> {
        let mut cursor = self.inner.borrow_mut();
        if cursor.pos < cursor.items.len() {
            let pos = cursor.pos;
            cursor.pos += 1;
            Some(std::mem::take(&mut cursor.items[pos]))
        } else {
            None
        }
    }

    pub fn remaining(&self) -> usize {
        let cursor = self.inner.borrow();
        cursor.items.len() - cursor.pos
    }

    /// A copy of the unconsumed elements; used for display and traces.
    pub(crate) fn snapshot(&self) -> Vec<Value> {
        let cursor = self.inner.borrow();
        cursor.items[cursor.pos..].to_vec()
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for IterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursor = self.inner.borrow();
        write!(f, "IterValue({}/{})", cursor.pos, cursor.items.len())
    }
}
