//! The ambient write transaction.

use crate::store::{StoreError, TagIndexStore};

/// Tracks whether the engine holds an open store transaction.
///
/// The transaction is opened lazily by the first mutating call and stays
/// open across updates until [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
#[derive(Debug, Default)]
pub(crate) struct WriteSession {
    open: bool,
}

impl WriteSession {
    pub(crate) const fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn ensure_open<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: TagIndexStore + ?Sized,
    {
        if !self.open {
            store.begin()?;
            self.open = true;
            log::debug!("opened write session");
        }
        Ok(())
    }

    pub(crate) fn commit<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: TagIndexStore + ?Sized,
    {
        if self.open {
            store.commit()?;
            self.open = false;
            log::info!("committed write session");
        }
        Ok(())
    }

    /// Discard the session. It counts as closed even if the store fails to
    /// roll back.
    pub(crate) fn rollback<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: TagIndexStore + ?Sized,
    {
        if self.open {
            self.open = false;
            store.rollback()?;
            log::info!("rolled back write session");
        }
        Ok(())
    }
}
