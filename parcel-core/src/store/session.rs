//! Scoped edit session over a [`FeatureStore`].

use log::error;

use super::{FeatureStore, StoreError};

/// An open edit session that is rolled back unless committed.
///
/// Dropping the session without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) discards its changes; a failure to do so is
/// logged because `Drop` cannot report it.
#[derive(Debug)]
pub struct EditSession<'s, S: FeatureStore + ?Sized> {
    store: &'s mut S,
    open: bool,
}

impl<'s, S: FeatureStore + ?Sized> EditSession<'s, S> {
    /// Open a session on `store`.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FeatureStore::begin_edit`] failure.
    pub fn begin(store: &'s mut S) -> Result<Self, StoreError> {
        store.begin_edit()?;
        Ok(Self { store, open: true })
    }

    /// Borrow the store for reads.
    #[must_use]
    pub fn store(&self) -> &S {
        &*self.store
    }

    /// Borrow the store for writes inside the session.
    pub fn store_mut(&mut self) -> &mut S {
        &mut *self.store
    }

    /// Commit and close the session.
    ///
    /// When the commit fails the session is rolled back before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FeatureStore::commit_edit`] failure.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.open = false;
        let result = self.store.commit_edit();
        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Roll back and close the session.
    ///
    /// # Errors
    ///
    /// Propagates the store's [`FeatureStore::rollback_edit`] failure.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.open = false;
        self.store.rollback_edit()
    }

    fn abandon(&mut self) {
        if let Err(err) = self.store.rollback_edit() {
            error!("failed to roll back edit session: {err}");
        }
    }
}

impl<S: FeatureStore + ?Sized> Drop for EditSession<'_, S> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.abandon();
        }
    }
}
