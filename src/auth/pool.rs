//! Reusable object pools for hot-path state.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// A lock-guarded free list handing out reusable objects.
///
/// `acquire` pops a pooled object or builds a fresh one; dropping the
/// returned guard pushes the object back, on every exit path, until the
/// pool holds `max_idle` objects.
pub struct Pool<T> {
    items: Mutex<Vec<T>>,
    build: Box<dyn Fn() -> T + Send + Sync>,
    max_idle: usize,
}

impl<T> Pool<T> {
    pub fn new(max_idle: usize, build: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(max_idle)),
            build: Box::new(build),
            max_idle,
        }
    }

    pub fn acquire(&self) -> PoolGuard<'_, T> {
        let item = self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| (self.build)());
        PoolGuard {
            pool: self,
            item: Some(item),
        }
    }

    fn release(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() < self.max_idle {
            items.push(item);
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct PoolGuard<'a, T> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pool guard already released")
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pool guard already released")
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
