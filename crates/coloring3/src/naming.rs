// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource naming: deriving the named shared-memory and semaphore names
//! from a unique token per deployment, such as a user identifier.

/// Environment variable that, if set, overrides the derived deployment
/// prefix. Useful for running two independent sessions as the same user.
pub const PREFIX_ENV_VAR: &str = "COLORING3_PREFIX";

/// Derive the deployment-specific prefix: the caller's real UID, unless
/// overridden by `COLORING3_PREFIX`.
#[must_use]
pub fn deployment_prefix() -> String {
    if let Ok(v) = std::env::var(PREFIX_ENV_VAR) {
        if !v.is_empty() {
            return v;
        }
    }
    // SAFETY: getuid() takes no arguments and cannot fail.
    let uid = unsafe { libc::getuid() };
    format!("u{uid}")
}

/// Names for the four named resources, derived from a shared prefix.
#[derive(Debug, Clone)]
pub struct ResourceNames {
    pub shm: String,
    pub used_slots: String,
    pub free_slots: String,
    pub write_mutex: String,
}

impl ResourceNames {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            shm: format!("/coloring3_{prefix}_SHM"),
            used_slots: format!("/coloring3_{prefix}_R_SEM"),
            free_slots: format!("/coloring3_{prefix}_W_SEM"),
            write_mutex: format!("/coloring3_{prefix}_W_SEM_SYNC"),
        }
    }

    #[must_use]
    pub fn with_default_prefix() -> Self {
        Self::new(&deployment_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_prefix_and_distinct_suffixes() {
        let names = ResourceNames::new("test123");
        assert_eq!(names.shm, "/coloring3_test123_SHM");
        assert_eq!(names.used_slots, "/coloring3_test123_R_SEM");
        assert_eq!(names.free_slots, "/coloring3_test123_W_SEM");
        assert_eq!(names.write_mutex, "/coloring3_test123_W_SEM_SYNC");
    }

    #[test]
    fn env_override_takes_precedence() {
        std::env::set_var(PREFIX_ENV_VAR, "overridden");
        assert_eq!(deployment_prefix(), "overridden");
        std::env::remove_var(PREFIX_ENV_VAR);
    }
}
