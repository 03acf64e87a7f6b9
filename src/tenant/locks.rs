//! Per-tenant operation locks
//!
//! Mutating operations on one tenant are mutually exclusive for their whole
//! duration. Acquisition never blocks: a concurrent request for the same
//! tenant fails fast so the caller can retry, while different tenants
//! proceed independently.
//!
//! Engines take a `&TenantLockGuard` parameter so holding the lock is
//! visible in their signatures, not an unstated convention.

use std::collections::HashSet;
use std::sync::Mutex;

use uuid::Uuid;

/// Tracks which tenants currently have a mutating operation in flight.
#[derive(Debug, Default)]
pub struct TenantLocks {
    held: Mutex<HashSet<Uuid>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the lock for a tenant. Returns `None` when another
    /// operation on the same tenant is already in flight.
    pub fn try_acquire(&self, tenant: Uuid) -> Option<TenantLockGuard<'_>> {
        let mut held = self.held.lock().expect("tenant lock table poisoned");
        if held.insert(tenant) {
            Some(TenantLockGuard {
                locks: self,
                tenant,
            })
        } else {
            None
        }
    }

    fn release(&self, tenant: Uuid) {
        let mut held = self.held.lock().expect("tenant lock table poisoned");
        held.remove(&tenant);
    }
}

/// Proof that the holder owns a tenant's operation lock.
///
/// Released on drop, including on error paths.
#[derive(Debug)]
pub struct TenantLockGuard<'a> {
    locks: &'a TenantLocks,
    tenant: Uuid,
}

impl TenantLockGuard<'_> {
    pub fn tenant(&self) -> Uuid {
        self.tenant
    }
}

impl Drop for TenantLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.tenant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let locks = TenantLocks::new();
        let tenant = Uuid::new_v4();

        let guard = locks.try_acquire(tenant).unwrap();
        assert_eq!(guard.tenant(), tenant);
        drop(guard);

        // Released on drop, so a second acquisition succeeds
        assert!(locks.try_acquire(tenant).is_some());
    }

    #[test]
    fn test_same_tenant_fails_fast() {
        let locks = TenantLocks::new();
        let tenant = Uuid::new_v4();

        let _guard = locks.try_acquire(tenant).unwrap();
        assert!(locks.try_acquire(tenant).is_none());
    }

    #[test]
    fn test_different_tenants_independent() {
        let locks = TenantLocks::new();

        let _a = locks.try_acquire(Uuid::new_v4()).unwrap();
        let _b = locks.try_acquire(Uuid::new_v4()).unwrap();
    }

    #[test]
    fn test_released_on_error_path() {
        let locks = TenantLocks::new();
        let tenant = Uuid::new_v4();

        let result: Result<(), ()> = (|| {
            let _guard = locks.try_acquire(tenant).unwrap();
            Err(())
        })();

        assert!(result.is_err());
        assert!(locks.try_acquire(tenant).is_some());
    }
}
