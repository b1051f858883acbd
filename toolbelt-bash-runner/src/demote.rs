//! Best-effort privilege demotion for spawned processes.
//!
//! When the tool runs as root and the configured account exists, children
//! are started under that account instead. This narrows what a stray agent
//! command can touch, but it is not a sandbox: anything the unprivileged
//! account can do, the agent can do. When the account is missing, or the
//! tool is not privileged to begin with, children inherit the caller's
//! identity unchanged.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Identity a child process is switched to before exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    pub user: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl Demotion {
    /// Resolve the demotion target for `user`, if demotion applies.
    ///
    /// Returns `None` for an empty account name, when the current process is
    /// not running as root, or when the account cannot be found.
    #[cfg(unix)]
    pub fn resolve(user: &str) -> Option<Self> {
        use nix::unistd::{User, geteuid};

        let user = user.trim();
        if user.is_empty() {
            return None;
        }
        if !geteuid().is_root() {
            debug!(user, "not running as root; spawning without demotion");
            return None;
        }

        match User::from_name(user) {
            Ok(Some(account)) => Some(Self {
                user: account.name,
                uid: account.uid.as_raw(),
                gid: account.gid.as_raw(),
                home: account.dir,
            }),
            Ok(None) => {
                warn!(user, "demotion account not found; spawning as the current user");
                None
            }
            Err(error) => {
                warn!(user, %error, "failed to look up demotion account; spawning as the current user");
                None
            }
        }
    }

    #[cfg(not(unix))]
    pub fn resolve(_user: &str) -> Option<Self> {
        None
    }

    /// Switch `command` to this identity and point the login variables at it.
    pub fn apply(&self, command: &mut tokio::process::Command) {
        #[cfg(unix)]
        {
            command.uid(self.uid).gid(self.gid);
        }
        command
            .env("HOME", &self.home)
            .env("USER", &self.user)
            .env("LOGNAME", &self.user);
    }
}

/// Resolve and apply demotion in one step; returns the identity used, if any.
pub fn demote(command: &mut tokio::process::Command, user: Option<&str>) -> Option<Demotion> {
    let demotion = user.and_then(Demotion::resolve)?;
    demotion.apply(command);
    debug!(user = %demotion.user, uid = demotion.uid, "demoting spawned process");
    Some(demotion)
}
