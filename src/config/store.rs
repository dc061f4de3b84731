//! Local credential store backed by `~/.qernal/config.yaml`.
//!
//! ## Security
//!
//! The file holds the platform credential and is owner-only (0600) from the
//! moment it exists. Writes go to a temporary file in the same directory
//! (created 0600 by `tempfile`) which is then renamed over the target, so a
//! reader never observes a partially-written or wider-permission file.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::schema::QernalConfig;
#[cfg(unix)]
use super::schema::{CONFIG_DIR_MODE, CONFIG_FILE_MODE};
use crate::credential::Credential;
use crate::sys::SudoContext;

/// Errors from reading or writing the config file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No config file exists
    #[error("no config file at {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not a valid config document
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file or its directory could not be read, created or written
    #[error("config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of an advisory permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    /// Owner-only
    Secure,
    /// Group or other bits are set
    Insecure { mode: u32 },
}

impl PermissionCheck {
    /// Warning text for an insecure file, `None` when secure.
    pub fn warning(&self, path: &Path) -> Option<String> {
        match self {
            PermissionCheck::Secure => None,
            PermissionCheck::Insecure { mode } => Some(format!(
                "config file {} has permissions {:o}, which are too open; run `chmod 600 {}`",
                path.display(),
                mode,
                path.display()
            )),
        }
    }
}

/// Reads and writes the stored credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    owner: Option<SudoContext>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: None,
        }
    }

    /// Hand written files to `owner` (the sudo invoker) after each write.
    pub fn with_owner(mut self, owner: Option<SudoContext>) -> Self {
        self.owner = owner;
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a config file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the stored configuration.
    pub fn read(&self) -> Result<QernalConfig, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        QernalConfig::from_yaml(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `credential` as the stored token, replacing any previous file.
    pub fn write(&self, credential: &Credential) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let created_dir = !parent.exists();
        create_config_dir(&parent).map_err(io_err)?;

        let config = QernalConfig {
            token: credential.expose().to_string(),
        };
        let yaml = config
            .to_yaml()
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(CONFIG_FILE_MODE))
                .map_err(io_err)?;
        }
        tmp.write_all(yaml.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        if let Some(owner) = &self.owner {
            if created_dir {
                crate::sys::restore_ownership(&parent, owner).map_err(io_err)?;
            }
            crate::sys::restore_ownership(&self.path, owner).map_err(io_err)?;
        }

        tracing::debug!(
            path = %self.path.display(),
            token = %credential.masked(),
            "wrote credential to config file"
        );
        Ok(())
    }

    /// Delete the config file. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Check the permissions of the backing file.
    pub fn check_permissions(&self) -> std::io::Result<PermissionCheck> {
        check_permissions(&self.path)
    }
}

/// Check whether `path` is readable by anyone but its owner.
#[cfg(unix)]
pub fn check_permissions(path: &Path) -> std::io::Result<PermissionCheck> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        Ok(PermissionCheck::Insecure { mode })
    } else {
        Ok(PermissionCheck::Secure)
    }
}

#[cfg(not(unix))]
pub fn check_permissions(path: &Path) -> std::io::Result<PermissionCheck> {
    std::fs::metadata(path)?;
    Ok(PermissionCheck::Secure)
}

#[cfg(unix)]
fn create_config_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(CONFIG_DIR_MODE)
        .create(dir)
}

#[cfg(not(unix))]
fn create_config_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn cred(s: &str) -> Credential {
        Credential::parse(s).unwrap()
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let env = TestEnv::new();
        let err = env.store().read().unwrap_err();
        assert!(matches!(err, StoreError::NotFound(p) if p == env.config_file()));
    }

    #[test]
    fn test_read_invalid_yaml_is_parse_error() {
        let env = TestEnv::new();
        std::fs::write(env.config_file(), "token: [unclosed").unwrap();
        let err = env.store().read().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let env = TestEnv::new();
        std::fs::create_dir(env.config_file()).unwrap();
        let err = env.store().read().unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_write_then_read() {
        let env = TestEnv::new();
        let store = env.store();
        store.write(&cred("client@secret")).unwrap();
        assert_eq!(store.read().unwrap().token, "client@secret");
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let env = TestEnv::new();
        let blocker = env.config_path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let store = CredentialStore::new(blocker.join("config.yaml"));

        let err = store.write(&cred("client@secret")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!err.to_string().contains("parse"));
    }

    #[test]
    #[cfg(unix)]
    fn test_write_hands_file_to_owner() {
        use nix::unistd::{getgid, getuid};
        use std::os::unix::fs::MetadataExt;

        let env = TestEnv::new();
        let owner = SudoContext {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
            home: env.config_path().to_path_buf(),
        };
        let store = env.store().with_owner(Some(owner.clone()));
        store.write(&cred("client@secret")).unwrap();

        let meta = std::fs::metadata(store.path()).unwrap();
        assert_eq!(meta.uid(), owner.uid);
        assert_eq!(meta.gid(), owner.gid);
    }

    #[test]
    fn test_write_creates_missing_directories() {
        let env = TestEnv::new();
        let path = env.config_path().join("nested").join("dir").join("config.yaml");
        let store = CredentialStore::new(&path);
        store.write(&cred("client@secret")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_overwrites_existing() {
        let env = TestEnv::new();
        let store = env.store();
        store.write(&cred("first@one")).unwrap();
        store.write(&cred("second@two")).unwrap();
        assert_eq!(store.read().unwrap().token, "second@two");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let env = TestEnv::new();
        env.store().write(&cred("client@secret")).unwrap();
        let entries: Vec<_> = std::fs::read_dir(env.config_path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        let store = env.store();
        store.write(&cred("client@secret")).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, CONFIG_FILE_MODE);
        assert_eq!(store.check_permissions().unwrap(), PermissionCheck::Secure);
    }

    #[test]
    #[cfg(unix)]
    fn test_write_tightens_existing_loose_file() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        let path = env.config_file();
        std::fs::write(&path, "token: old@token\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        env.store().write(&cred("new@token")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn test_check_permissions_loose() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        let path = env.config_file();
        std::fs::write(&path, "token: a@b\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        let check = check_permissions(&path).unwrap();
        assert_eq!(check, PermissionCheck::Insecure { mode: 0o640 });
        let warning = check.warning(&path).unwrap();
        assert!(warning.contains("chmod 600"));
        assert!(warning.contains("640"));
    }

    #[test]
    fn test_secure_has_no_warning() {
        assert!(PermissionCheck::Secure.warning(Path::new("x")).is_none());
    }

    #[test]
    fn test_remove() {
        let env = TestEnv::new();
        let store = env.store();
        assert!(!store.remove().unwrap());
        store.write(&cred("client@secret")).unwrap();
        assert!(store.remove().unwrap());
        assert!(!store.exists());
    }
}
