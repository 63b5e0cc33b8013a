//! Scripted distributed lock guarding recovery so only one instance in
//! a multi-instance deployment runs the scan per cycle.

use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::keys::RedisKeys;
use crate::scripts::RedisScripts;

/// Attempt to acquire `keys.recovery_lock` for `ttl_seconds`. Returns a
/// nonce to pass to [`release`] if this call won the lock, or `None` if
/// another instance already holds it — in which case the caller treats
/// this cycle as a no-op.
pub async fn acquire(
    conn: &mut ConnectionManager,
    keys: &RedisKeys,
    scripts: &RedisScripts,
    ttl_seconds: u64,
) -> anyhow::Result<Option<String>> {
    let nonce = Uuid::new_v4().to_string();
    let acquired: Option<String> = scripts
        .lock_acquire
        .key(&keys.recovery_lock)
        .arg(&nonce)
        .arg(ttl_seconds)
        .invoke_async(conn)
        .await?;
    Ok(acquired.map(|_| nonce))
}

/// Release the lock iff we still hold it (the nonce matches), a
/// compare-and-delete so a lock that already expired and was
/// re-acquired by someone else is never torn down out from under them.
pub async fn release(
    conn: &mut ConnectionManager,
    keys: &RedisKeys,
    scripts: &RedisScripts,
    nonce: &str,
) -> anyhow::Result<()> {
    let _: i64 = scripts
        .lock_release
        .key(&keys.recovery_lock)
        .arg(nonce)
        .invoke_async(conn)
        .await?;
    Ok(())
}
