use crate::error::Retryable;
use crate::memory::{MemoryStore, Trail};

/// Runs `op` inside a trail, committing on success.
///
/// A failed attempt aborts its trail. When the failure is transient (per
/// [`Retryable`]) and attempts remain, the operation is replayed with a
/// fresh trail; any other error surfaces to the caller unchanged.
pub fn run_trail<T, E, F>(store: &MemoryStore, attempts: usize, mut op: F) -> Result<T, E>
where
    E: Retryable,
    F: FnMut(&mut Trail<'_>) -> Result<T, E>,
{
    let mut remaining = attempts.max(1);
    loop {
        let mut trail = store.begin();
        match op(&mut trail) {
            Ok(value) => {
                trail.commit();
                return Ok(value);
            }
            Err(err) if remaining > 1 && err.is_transient() => remaining -= 1,
            Err(err) => return Err(err),
        }
    }
}
