use std::{rc::Rc, sync::Arc};

use crate::reconcile::OrderedCollection;

/// An opaque item compared only through its canonical string form.
///
/// Two tokens are equal iff their canonical forms are byte-identical. No
/// ordering between tokens is ever used.
pub trait Token {
    fn canonical(&self) -> &str;
}

impl Token for str {
    fn canonical(&self) -> &str {
        self
    }
}

impl Token for String {
    fn canonical(&self) -> &str {
        self.as_str()
    }
}

impl Token for Box<str> {
    fn canonical(&self) -> &str {
        self
    }
}

impl Token for Arc<str> {
    fn canonical(&self) -> &str {
        self
    }
}

impl Token for Rc<str> {
    fn canonical(&self) -> &str {
        self
    }
}

impl<T: Token + ?Sized> Token for &T {
    fn canonical(&self) -> &str {
        (**self).canonical()
    }
}

/// One-pass cursor over the current content of a collection.
///
/// Each call to `next` fetches the token at the following position through
/// [`OrderedCollection::get`]; the cursor never rewinds.
pub struct CollectionStream<'a, C: OrderedCollection + ?Sized> {
    collection: &'a C,
    position: usize,
}

impl<'a, C: OrderedCollection + ?Sized> CollectionStream<'a, C> {
    pub fn new(collection: &'a C) -> Self {
        Self {
            collection,
            position: 0,
        }
    }

    /// Number of tokens fetched so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<'a, C: OrderedCollection + ?Sized> Iterator for CollectionStream<'a, C> {
    type Item = &'a C::Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.collection.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.collection.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}
