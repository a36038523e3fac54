//! Process-wide filesystem settings
//!
//! Four scalar knobs initialized once at startup, before any protocol
//! listener accepts connections. They live together in [`VfsSettings`];
//! the free functions operate on the process-wide instance, which is
//! read-mostly after startup.

use std::sync::{OnceLock, RwLock};

/// Cross-device renames fail with the backend error
pub const RENAME_MODE_FAIL: i32 = 0;
/// Cross-device renames fall back to copy and delete
pub const RENAME_MODE_COPY: i32 = 1;

/// Scalar knobs shared by all filesystem instances
#[derive(Debug, Clone, Default)]
pub struct VfsSettings {
    temp_path: String,
    sftp_fingerprints: Vec<String>,
    allow_self_connections: i32,
    rename_mode: i32,
}

impl VfsSettings {
    /// Directory for temporary files, empty to use the target directory
    pub fn temp_path(&self) -> &str {
        &self.temp_path
    }

    pub fn set_temp_path(&mut self, path: impl Into<String>) {
        self.temp_path = path.into();
    }

    /// Accepted SFTP host key fingerprints
    pub fn sftp_fingerprints(&self) -> &[String] {
        &self.sftp_fingerprints
    }

    pub fn set_sftp_fingerprints(&mut self, fingerprints: Vec<String>) {
        self.sftp_fingerprints = fingerprints;
    }

    /// Policy for connections pointing back at this server
    pub fn allow_self_connections(&self) -> i32 {
        self.allow_self_connections
    }

    pub fn set_allow_self_connections(&mut self, value: i32) {
        self.allow_self_connections = value;
    }

    /// Cross-device rename policy, see `RENAME_MODE_*`
    pub fn rename_mode(&self) -> i32 {
        self.rename_mode
    }

    pub fn set_rename_mode(&mut self, value: i32) {
        self.rename_mode = value;
    }
}

fn store() -> &'static RwLock<VfsSettings> {
    static STORE: OnceLock<RwLock<VfsSettings>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(VfsSettings::default()))
}

/// Set the path for temporary files
pub fn set_temp_path(path: impl Into<String>) {
    store().write().expect("settings lock poisoned").set_temp_path(path);
}

/// The path for temporary files, empty if unset
pub fn temp_path() -> String {
    store()
        .read()
        .expect("settings lock poisoned")
        .temp_path()
        .to_string()
}

/// Set the accepted SFTP host key fingerprints
pub fn set_sftp_fingerprints(fingerprints: Vec<String>) {
    store()
        .write()
        .expect("settings lock poisoned")
        .set_sftp_fingerprints(fingerprints);
}

/// The accepted SFTP host key fingerprints
pub fn sftp_fingerprints() -> Vec<String> {
    store()
        .read()
        .expect("settings lock poisoned")
        .sftp_fingerprints()
        .to_vec()
}

/// Set the desired behaviour for self connections
pub fn set_allow_self_connections(value: i32) {
    store()
        .write()
        .expect("settings lock poisoned")
        .set_allow_self_connections(value);
}

/// The policy for self connections
pub fn allow_self_connections() -> i32 {
    store()
        .read()
        .expect("settings lock poisoned")
        .allow_self_connections()
}

/// Set the cross-device rename policy
pub fn set_rename_mode(value: i32) {
    store()
        .write()
        .expect("settings lock poisoned")
        .set_rename_mode(value);
}

/// The cross-device rename policy
pub fn rename_mode() -> i32 {
    store().read().expect("settings lock poisoned").rename_mode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_struct() {
        let mut settings = VfsSettings::default();
        assert_eq!(settings.temp_path(), "");
        assert_eq!(settings.rename_mode(), RENAME_MODE_FAIL);

        settings.set_temp_path("/var/tmp/uploads");
        settings.set_sftp_fingerprints(vec!["SHA256:abcdef".to_string()]);
        settings.set_allow_self_connections(1);
        settings.set_rename_mode(RENAME_MODE_COPY);

        assert_eq!(settings.temp_path(), "/var/tmp/uploads");
        assert_eq!(settings.sftp_fingerprints().len(), 1);
        assert_eq!(settings.allow_self_connections(), 1);
        assert_eq!(settings.rename_mode(), RENAME_MODE_COPY);
    }

    #[test]
    fn test_process_wide_accessors() {
        set_sftp_fingerprints(vec!["SHA256:0011".to_string()]);
        assert_eq!(sftp_fingerprints(), vec!["SHA256:0011".to_string()]);

        set_allow_self_connections(1);
        assert_eq!(allow_self_connections(), 1);
    }
}
