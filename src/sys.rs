//! System utilities for sudo-aware home resolution and file ownership

use std::path::{Path, PathBuf};

/// Context information when running under sudo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoContext {
    /// The UID of the user who invoked sudo
    pub uid: u32,
    /// The GID of the user who invoked sudo
    pub gid: u32,
    /// The home directory of the user who invoked sudo
    pub home: PathBuf,
}

/// Detects if the current process is running as root via sudo.
///
/// `lookup` supplies the `SUDO_USER`, `SUDO_UID` and `SUDO_GID` variables.
/// Returns `None` unless the effective user is root and all three are set
/// and parseable.
#[cfg(unix)]
pub fn detect_sudo_context(lookup: impl Fn(&str) -> Option<String>) -> Option<SudoContext> {
    if !nix::unistd::geteuid().is_root() {
        return None;
    }
    sudo_context_from(lookup)
}

#[cfg(not(unix))]
pub fn detect_sudo_context(_lookup: impl Fn(&str) -> Option<String>) -> Option<SudoContext> {
    None
}

/// Build the context from the sudo variables.
///
/// The home directory comes from the password database for `SUDO_UID`,
/// falling back to `/home/<SUDO_USER>`. `HOME` is not trusted here since sudo
/// may have reset it to root's home.
#[cfg(unix)]
fn sudo_context_from(lookup: impl Fn(&str) -> Option<String>) -> Option<SudoContext> {
    use nix::unistd::{Uid, User};

    let sudo_user = lookup("SUDO_USER")?;
    let uid: u32 = lookup("SUDO_UID")?.parse().ok()?;
    let gid: u32 = lookup("SUDO_GID")?.parse().ok()?;

    let home = match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.dir,
        _ => PathBuf::from(format!("/home/{}", sudo_user)),
    };

    Some(SudoContext { uid, gid, home })
}

/// Home directory of the user the CLI is acting for.
///
/// Under sudo this is the invoking user's home, so `sudo qernal ...` reads
/// and writes the same `~/.qernal` as a plain run.
pub fn home_dir(sudo: Option<&SudoContext>) -> Option<PathBuf> {
    match sudo {
        Some(ctx) => Some(ctx.home.clone()),
        None => dirs::home_dir(),
    }
}

/// Hand `path` back to the user who invoked sudo.
#[cfg(unix)]
pub fn restore_ownership(path: &Path, owner: &SudoContext) -> std::io::Result<()> {
    use nix::unistd::{Gid, Uid, chown};

    chown(
        path,
        Some(Uid::from_raw(owner.uid)),
        Some(Gid::from_raw(owner.gid)),
    )
    .map_err(std::io::Error::from)?;
    tracing::debug!(path = %path.display(), uid = owner.uid, "restored file ownership");
    Ok(())
}

#[cfg(not(unix))]
pub fn restore_ownership(_path: &Path, _owner: &SudoContext) -> std::io::Result<()> {
    Ok(())
}
