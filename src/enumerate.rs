//! Index based enumeration
//!
//! Drivers expose their lists (formats, frame sizes, controls, ...) one index at a time. A
//! [`Cursor`] turns such a "fetch item at index" function into an iterator. It always fetches one
//! item ahead, so the first item is validated before anything is handed out and no driver call
//! happens once the cursor has reported its end.

use std::{fmt, iter::FusedIterator, mem};

use crate::error::{Error, Result};

/// Outcome of fetching a single index
#[derive(Debug)]
pub enum Fetch<T> {
    /// The index holds an item
    Item(T),
    /// The index is past the end; this ends the sequence normally
    Invalid,
    /// The index holds an entry of an unsupported kind and is skipped
    Disabled,
    /// The driver failed
    Error(Error),
}

enum State<T> {
    Ready(T),
    Done,
    Failed(Error),
}

/// Fetch-ahead iterator over one enumeration scope
pub struct Cursor<'a, T> {
    fetch: Box<dyn FnMut(u32) -> Fetch<T> + 'a>,
    index: u32,
    state: State<T>,
}

impl<'a, T> Cursor<'a, T> {
    /// Creates a cursor and fetches index 0 right away
    pub fn new<F>(fetch: F) -> Self
    where
        F: FnMut(u32) -> Fetch<T> + 'a,
    {
        let mut cursor = Cursor {
            fetch: Box::new(fetch),
            index: 0,
            state: State::Done,
        };
        cursor.advance();
        cursor
    }

    /// Creates a cursor that yields nothing and reports `err`
    pub fn failed(err: Error) -> Self {
        Cursor {
            fetch: Box::new(|_| Fetch::Invalid),
            index: 0,
            state: State::Failed(err),
        }
    }

    fn advance(&mut self) {
        self.state = loop {
            let outcome = (self.fetch)(self.index);
            self.index = self.index.saturating_add(1);
            match outcome {
                Fetch::Item(item) => break State::Ready(item),
                Fetch::Invalid => break State::Done,
                Fetch::Disabled => continue,
                Fetch::Error(e) => break State::Failed(e),
            }
        };
    }

    /// Whether the sequence ended because of a failure rather than exhaustion
    pub fn is_error(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    /// Returns the failure that ended the sequence, if any
    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Collects all remaining items, or returns the error that cut the sequence short
    pub fn into_vec(mut self) -> Result<Vec<T>> {
        let items: Vec<T> = self.by_ref().collect();
        match mem::replace(&mut self.state, State::Done) {
            State::Failed(e) => Err(e),
            _ => Ok(items),
        }
    }
}

impl<T> Iterator for Cursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, State::Done) {
            State::Ready(item) => {
                self.advance();
                Some(item)
            }
            state => {
                self.state = state;
                None
            }
        }
    }
}

impl<T> FusedIterator for Cursor<'_, T> {}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Ready(_) => "ready",
            State::Done => "done",
            State::Failed(_) => "failed",
        };
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("state", &state)
            .finish()
    }
}
