//! engine/flags: numeric environment and table flags.
//!
//! Values are the LMDB bit layout so flags captured in a snapshot mean the
//! same thing to every peer that re-creates the table on import. `env_flags`
//! and `table_flags` translate them into heed's typed flag sets.

use heed::{DatabaseFlags, EnvFlags};

// ---- environment flags ----

/// `path` names the data file itself instead of a directory.
pub const ENV_NO_SUB_DIR: u32 = 0x4000;
/// Skip fsync on commit.
pub const ENV_NO_SYNC: u32 = 0x10000;
/// Open read-only; the data file must exist and writers are refused.
pub const ENV_READ_ONLY: u32 = 0x20000;
/// Skip the lock file; the caller serializes access.
pub const ENV_NO_LOCK: u32 = 0x400000;

// ---- table flags ----

/// Compare keys from the last byte towards the first.
pub const TABLE_REVERSE_KEY: u32 = 0x02;
/// Multiple values per key, kept sorted.
pub const TABLE_DUP_SORT: u32 = 0x04;
/// Keys are native-endian u32 or u64 integers.
pub const TABLE_INTEGER_KEY: u32 = 0x08;
/// Dup-sort values all have the same size.
pub const TABLE_DUP_FIXED: u32 = 0x10;
/// Dup-sort values are native-endian integers.
pub const TABLE_INTEGER_DUP: u32 = 0x20;
/// Compare dup-sort values from the last byte towards the first.
pub const TABLE_REVERSE_DUP: u32 = 0x40;
/// Create the table if it does not exist (open-time only, never persisted).
pub const TABLE_CREATE: u32 = 0x40000;

/// Flags that describe a table's layout and are persisted with it.
pub const TABLE_PERSISTENT_MASK: u32 = TABLE_REVERSE_KEY
    | TABLE_DUP_SORT
    | TABLE_INTEGER_KEY
    | TABLE_DUP_FIXED
    | TABLE_INTEGER_DUP
    | TABLE_REVERSE_DUP;

#[inline]
pub fn is_dup_sort(flags: u32) -> bool {
    flags & TABLE_DUP_SORT != 0
}

pub(crate) fn env_flags(bits: u32) -> EnvFlags {
    let mut out = EnvFlags::empty();
    if bits & ENV_NO_SUB_DIR != 0 {
        out |= EnvFlags::NO_SUB_DIR;
    }
    if bits & ENV_NO_SYNC != 0 {
        out |= EnvFlags::NO_SYNC;
    }
    if bits & ENV_READ_ONLY != 0 {
        out |= EnvFlags::READ_ONLY;
    }
    if bits & ENV_NO_LOCK != 0 {
        out |= EnvFlags::NO_LOCK;
    }
    out
}

/// Persistent table flags as heed database flags. TABLE_CREATE has no
/// counterpart here; creation goes through `DatabaseOpenOptions::create`.
pub(crate) fn table_flags(bits: u32) -> DatabaseFlags {
    const MAP: [(u32, DatabaseFlags); 6] = [
        (TABLE_REVERSE_KEY, DatabaseFlags::REVERSE_KEY),
        (TABLE_DUP_SORT, DatabaseFlags::DUP_SORT),
        (TABLE_INTEGER_KEY, DatabaseFlags::INTEGER_KEY),
        (TABLE_DUP_FIXED, DatabaseFlags::DUP_FIXED),
        (TABLE_INTEGER_DUP, DatabaseFlags::INTEGER_DUP),
        (TABLE_REVERSE_DUP, DatabaseFlags::REVERSE_DUP),
    ];
    MAP.iter()
        .filter(|(bit, _)| bits & bit != 0)
        .fold(DatabaseFlags::empty(), |acc, (_, f)| acc | *f)
}

/// Human-readable names of the table flags set in `flags`.
pub fn table_flag_names(flags: u32) -> Vec<&'static str> {
    const NAMES: [(u32, &str); 6] = [
        (TABLE_REVERSE_KEY, "reverse_key"),
        (TABLE_DUP_SORT, "dup_sort"),
        (TABLE_INTEGER_KEY, "integer_key"),
        (TABLE_DUP_FIXED, "dup_fixed"),
        (TABLE_INTEGER_DUP, "integer_dup"),
        (TABLE_REVERSE_DUP, "reverse_dup"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_names_in_bit_order() {
        assert!(table_flag_names(0).is_empty());
        assert_eq!(
            table_flag_names(TABLE_DUP_SORT | TABLE_REVERSE_KEY),
            vec!["reverse_key", "dup_sort"]
        );
    }

    #[test]
    fn create_is_not_persistent() {
        assert_eq!(TABLE_CREATE & TABLE_PERSISTENT_MASK, 0);
        assert!(is_dup_sort(TABLE_DUP_SORT | TABLE_INTEGER_DUP));
        assert!(!is_dup_sort(TABLE_INTEGER_KEY));
    }

    #[test]
    fn heed_flag_translation() {
        assert_eq!(
            table_flags(TABLE_DUP_SORT | TABLE_CREATE),
            DatabaseFlags::DUP_SORT
        );
        assert!(table_flags(0).is_empty());
        assert_eq!(
            env_flags(ENV_READ_ONLY | ENV_NO_SUB_DIR),
            EnvFlags::READ_ONLY | EnvFlags::NO_SUB_DIR
        );
    }
}
