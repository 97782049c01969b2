use std::sync::{Arc, Mutex, PoisonError};

/// A device shared between the control loop and outside callers.
///
/// The lock guards physical bus access only: it is held for one transaction
/// and never across propagation or sleeps.
#[derive(Debug, Default)]
pub struct SharedBus<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedBus<T> {
    pub fn new(device: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    pub fn transaction<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_device() {
        let bus = SharedBus::new(Vec::<u8>::new());
        let other = bus.clone();
        other.transaction(|v| v.push(7));
        assert_eq!(bus.transaction(|v| v.clone()), vec![7]);
    }
}
