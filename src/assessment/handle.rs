//! Lazily initialized, process-lifetime backend handles.
use std::sync::{Arc, OnceLock};

use crate::error::BackendError;

/// Single-flight memo of a backend load. The first caller runs the initializer while
/// concurrent callers block on the same cell; success and failure are both cached.
pub struct LazyHandle<T: ?Sized> {
    cell: OnceLock<Result<Arc<T>, BackendError>>,
}

impl<T: ?Sized> LazyHandle<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, BackendError>
    where
        F: FnOnce() -> Result<Arc<T>, BackendError>,
    {
        self.cell.get_or_init(load).clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized> Default for LazyHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}
