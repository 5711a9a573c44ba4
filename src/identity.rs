//! identity: instance and generation tags attached to every snapshot.
//!
//! The host name is resolved once at startup into `HostIdentity` and handed
//! in explicitly; `instance_id` and `generation_id` are pure and uncached.

use log::debug;

const HOSTNAME_FILES: [&str; 2] = ["/proc/sys/kernel/hostname", "/etc/hostname"];
const HOSTNAME_VARS: [&str; 2] = ["HOSTNAME", "HOST"];

/// Process-wide host information, resolved once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity {
    hostname: String,
}

impl HostIdentity {
    /// Look up the host name the way the kernel reports it: the kernel
    /// hostname file, then /etc/hostname, then $HOSTNAME and $HOST.
    /// Yields an empty name when nothing is available.
    pub fn resolve() -> Self {
        Self::resolve_from(&HOSTNAME_FILES, |k| std::env::var(k).ok())
    }

    fn resolve_from<F>(files: &[&str], var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_files = files
            .iter()
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty());
        let from_env = || {
            HOSTNAME_VARS
                .iter()
                .filter_map(|k| var(k))
                .map(|s| s.trim().to_string())
                .find(|s| !s.is_empty())
        };
        let hostname = from_files.or_else(from_env).unwrap_or_default();
        if hostname.is_empty() {
            debug!("host name lookup failed, instance id needs a configured name");
        }
        Self { hostname }
    }

    pub fn from_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Instance id for `configured`, falling back to this host's name.
    pub fn instance_id(&self, configured: &str) -> String {
        instance_id(configured, &self.hostname)
    }
}

/// Safe instance name: `configured` if non-empty, else `host_fallback`, with
/// every character outside `[a-zA-Z0-9-]` replaced by `-`.
pub fn instance_id(configured: &str, host_fallback: &str) -> String {
    let source = if configured.is_empty() {
        host_fallback
    } else {
        configured
    };
    source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// `G-` plus the generation counter as 16 lowercase hex digits.
pub fn generation_id(generation: u64) -> String {
    format!("G-{:016x}", generation)
}
