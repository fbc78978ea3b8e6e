pub mod blocklist;
pub mod executable;
pub mod fee_cache;
pub mod pool_map;
pub mod recent_reject;
pub mod validation;
pub mod wash;
