//! Append-only lists of definitions owned by a module or type.
//!
//! Readers iterate without locking; writers that need "look up, and create if absent" semantics
//! go through [`DefList::find_or_insert`], which serializes creation per list so that two threads
//! racing on the same key end up with the same definition.

use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// An append-only, concurrently readable list of shared definitions.
pub struct DefList<T> {
    items: boxcar::Vec<Arc<T>>,
    creation: Mutex<()>,
}

impl<T> DefList<T> {
    /// Creates an empty list
    #[must_use]
    pub fn new() -> Self {
        DefList {
            items: boxcar::Vec::new(),
            creation: Mutex::new(()),
        }
    }

    /// Iterates over the definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.iter().map(|(_, item)| item)
    }

    /// Returns the first definition matching `predicate`
    pub fn find<P>(&self, mut predicate: P) -> Option<Arc<T>>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|item| predicate(item)).cloned()
    }

    /// Returns `true` if `item` is in this list
    #[must_use]
    pub fn contains(&self, item: &Arc<T>) -> bool {
        self.iter().any(|existing| Arc::ptr_eq(existing, item))
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.count()
    }

    /// Returns `true` if the list holds no definitions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a definition and returns it
    pub fn push(&self, item: Arc<T>) -> Arc<T> {
        self.items.push(item.clone());
        item
    }

    /// Runs `create` while holding the creation lock and appends its result.
    ///
    /// `create` observes the list in a state no other creator can change, which lets callers pick
    /// a name that is guaranteed to be unused. It must not call back into any creation method of
    /// this list.
    ///
    /// # Errors
    /// Returns whatever `create` returns, or [`Error::LockError`] if the lock is poisoned.
    pub fn insert_with<F>(&self, create: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Self) -> Result<Arc<T>>,
    {
        let _guard = self.creation.lock().map_err(|_| Error::LockError)?;
        let item = create(self)?;
        Ok(self.push(item))
    }

    /// Returns the first definition matching `predicate`, creating one with `create` if none does.
    ///
    /// The boolean is `true` if the definition was created by this call.
    ///
    /// # Errors
    /// Returns whatever `create` returns, or [`Error::LockError`] if the lock is poisoned.
    pub fn find_or_insert<P, F>(&self, mut predicate: P, create: F) -> Result<(Arc<T>, bool)>
    where
        P: FnMut(&T) -> bool,
        F: FnOnce() -> Result<Arc<T>>,
    {
        if let Some(existing) = self.find(&mut predicate) {
            return Ok((existing, false));
        }

        let _guard = self.creation.lock().map_err(|_| Error::LockError)?;
        if let Some(existing) = self.find(&mut predicate) {
            return Ok((existing, false));
        }

        let item = create()?;
        Ok((self.push(item), true))
    }
}

impl<T> Default for DefList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn find_or_insert_creates_once() {
        let list: DefList<String> = DefList::new();

        let (first, created) = list
            .find_or_insert(|s| s == "a", || Ok(Arc::new("a".to_string())))
            .unwrap();
        assert!(created);

        let (second, created) = list
            .find_or_insert(|s| s == "a", || Ok(Arc::new("a".to_string())))
            .unwrap();
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn racing_creators_agree() {
        let list: Arc<DefList<String>> = Arc::new(DefList::new());
        let created = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let list = list.clone();
                let created = created.clone();
                std::thread::spawn(move || {
                    list.find_or_insert(
                        |s| s == "shared",
                        || {
                            created.fetch_add(1, Ordering::SeqCst);
                            Ok(Arc::new("shared".to_string()))
                        },
                    )
                    .unwrap()
                    .0
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failed_creation_inserts_nothing() {
        let list: DefList<String> = DefList::new();
        let result = list.find_or_insert(|_| false, || Err(Error::Error("nope".into())));
        assert!(result.is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn insert_with_sees_current_items() {
        let list: DefList<String> = DefList::new();
        list.push(Arc::new("m".to_string()));
        let item = list
            .insert_with(|current| Ok(Arc::new(format!("m{}", current.len()))))
            .unwrap();
        assert_eq!(item.as_str(), "m1");
        assert!(list.contains(&item));
    }
}
