//! Bundles the `redis::Script`s this store needs, loaded once at
//! construction.
//!
//! Grounded directly on the apalis-redis example's `RedisScript` struct
//! (one field per `.lua` file, each built via
//! `redis::Script::new(include_str!(...))`).

use redis::Script;

#[derive(Clone)]
pub struct RedisScripts {
    pub claim: Script,
    pub recover_one: Script,
    pub lock_acquire: Script,
    pub lock_release: Script,
    pub heartbeat: Script,
}

impl Default for RedisScripts {
    fn default() -> Self {
        Self {
            claim: Script::new(include_str!("lua/claim.lua")),
            recover_one: Script::new(include_str!("lua/recover_one.lua")),
            lock_acquire: Script::new(include_str!("lua/lock_acquire.lua")),
            lock_release: Script::new(include_str!("lua/lock_release.lua")),
            heartbeat: Script::new(include_str!("lua/heartbeat.lua")),
        }
    }
}
