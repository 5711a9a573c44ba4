//! util: small shared helpers.
//!
//! Contents:
//! - display_ascii(): printable rendering of binary keys for logs and errors.
//! - human_size(): byte counts in 1024-based units ("1.0 GB").
//! - parse_duration() / parse_size(): config value parsers.
//! - now_nanos(): wall clock in Unix nanoseconds (u64, saturating).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Render bytes with non-printable characters escaped (`\xNN`, `\n`, ...).
pub fn display_ascii(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

/// Format a byte count with 1024-based units, one decimal above bytes.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut v = bytes as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", v, UNITS[unit])
}

/// Parse "500ms", "30s", "2m", "1h" or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (num, mul_ms) = if let Some(x) = s.strip_suffix("ms") {
        (x, 1u64)
    } else if let Some(x) = s.strip_suffix('s') {
        (x, 1_000)
    } else if let Some(x) = s.strip_suffix('m') {
        (x, 60_000)
    } else if let Some(x) = s.strip_suffix('h') {
        (x, 3_600_000)
    } else {
        (s, 1_000)
    };
    let n = num
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid duration {:?}: {}", s, e))?;
    n.checked_mul(mul_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration {:?} overflows", s))
}

/// Parse "64MB", "1GB", "512KB" (1024-based) or a bare number of bytes.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let (num, mul) = [
        ("TB", 1u64 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
        ("B", 1),
    ]
    .iter()
    .find_map(|(suffix, mul)| upper.strip_suffix(suffix).map(|n| (n.to_string(), *mul)))
    .unwrap_or_else(|| (upper.clone(), 1));
    let n = num
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid size {:?}: {}", s, e))?;
    n.checked_mul(mul)
        .ok_or_else(|| format!("size {:?} overflows", s))
}

/// Current Unix time in nanoseconds, saturating at u64::MAX.
#[inline]
pub fn now_nanos() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_nanos().min(u64::MAX as u128) as u64
}
