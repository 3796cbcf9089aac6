use std::sync::{Mutex, MutexGuard};

/// Lock `lock`, recovering the inner value if a previous holder panicked.
/// The analysis path must keep running after a poisoned window buffer.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(context, "mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}
