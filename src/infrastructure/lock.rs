use crate::domain::ports::{Lock, LockError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

struct Lease {
    _permit: OwnedSemaphorePermit,
    expires_at: Option<Instant>,
}

impl Lease {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= Instant::now())
    }
}

/// Single-holder lock for processors sharing one process.
///
/// `acquire` waits until the current holder releases. With a lease
/// configured, the holder must `reacquire` before the lease runs out;
/// afterwards `reacquire` and `release` report [`LockError::NotOwned`].
/// Only `release` hands the lock to the next contender, so a holder that
/// lost its lease can never release someone else's.
pub struct InMemoryLock {
    permits: Arc<Semaphore>,
    lease: Option<Duration>,
    holder: Mutex<Option<Lease>>,
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLock {
    /// A lock whose ownership never expires.
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            lease: None,
            holder: Mutex::new(None),
        }
    }

    /// A lock whose holder must renew ownership within `lease`.
    ///
    /// # Arguments
    ///
    /// * `lease` - How long an acquire or reacquire keeps the lock owned.
    pub fn with_lease(lease: Duration) -> Self {
        Self {
            lease: Some(lease),
            ..Self::new()
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.lease.map(|lease| Instant::now() + lease)
    }
}

#[async_trait]
impl Lock for InMemoryLock {
    async fn acquire(&self) -> Result<(), LockError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LockError::Unavailable("lock was closed".to_string()))?;
        *self.holder.lock().await = Some(Lease {
            _permit: permit,
            expires_at: self.deadline(),
        });
        Ok(())
    }

    async fn release(&self) -> Result<(), LockError> {
        match self.holder.lock().await.take() {
            Some(lease) if !lease.expired() => Ok(()),
            _ => Err(LockError::NotOwned),
        }
    }

    async fn reacquire(&self) -> Result<(), LockError> {
        // An expired lease stays in place until its holder releases it.
        match self.holder.lock().await.as_mut() {
            Some(lease) if !lease.expired() => {
                lease.expires_at = self.deadline();
                Ok(())
            }
            _ => Err(LockError::NotOwned),
        }
    }
}
