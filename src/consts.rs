//! Shared constants of the sync value framing and table naming.

// -------- Value framing --------
/// Size of the big-endian u64 nanosecond timestamp prefixed to every stored value.
pub const HEADER_SIZE: usize = 8;

// -------- Reserved tables --------
/// Name prefix shared by all internal tables that must never be synced.
pub const SYNC_DBI_PREFIX: &str = "_sync";
/// Name prefix of shadow tables.
pub const SYNC_DBI_SHADOW_PREFIX: &str = "_sync_";
/// Internal bookkeeping table, left out of the stats monitor's per-table detail.
pub const SYNC_META_DBI: &str = "_sync";

/// True for tables under the reserved `_sync` prefix.
#[inline]
pub fn is_sync_table(name: &str) -> bool {
    name.starts_with(SYNC_DBI_PREFIX)
}

/// True for shadow tables (`_sync_<name>`).
#[inline]
pub fn is_shadow_table(name: &str) -> bool {
    name.starts_with(SYNC_DBI_SHADOW_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_prefixes() {
        assert!(is_sync_table("_sync"));
        assert!(is_sync_table("_sync_users"));
        assert!(!is_sync_table("users"));
        assert!(!is_shadow_table("_sync"));
        assert!(is_shadow_table("_sync_users"));
    }
}
