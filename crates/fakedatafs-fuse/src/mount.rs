//! Mounting the generated tree and tearing it down again.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigError, FakeDataConfig};
use crate::filesystem::FakeDataFs;
use crate::read_cache::{spawn_sweeper, ReadCache};

/// Options accepted through `-o`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions {
    pub allow_other: bool,
    pub allow_root: bool,
    pub auto_unmount: bool,
    pub default_permissions: bool,
}

#[derive(Debug, Error)]
pub enum MountError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Mount failed: {0}")]
    Io(#[from] std::io::Error),
}

pub fn validate_mountpoint(path: &Path) -> Result<(), MountError> {
    if !path.exists() {
        return Err(MountError::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(MountError::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Parses a comma-separated option string such as `allow_other,auto_unmount`.
///
/// `ro` is accepted and ignored since the mount is always read-only; `rw` is
/// rejected.
pub fn parse_mount_options(opts_str: &str) -> Result<MountOptions, MountError> {
    let mut options = MountOptions::default();

    for opt in opts_str.split(',') {
        match opt.trim() {
            "allow_other" => options.allow_other = true,
            "allow_root" => options.allow_root = true,
            "auto_unmount" => options.auto_unmount = true,
            "default_permissions" => options.default_permissions = true,
            "ro" | "" => {}
            other => return Err(MountError::InvalidOption(other.to_string())),
        }
    }

    Ok(options)
}

pub fn options_to_fuser(opts: &MountOptions) -> Vec<fuser::MountOption> {
    let mut fuser_opts = vec![
        fuser::MountOption::RO,
        fuser::MountOption::FSName("fakedatafs".to_string()),
        fuser::MountOption::Subtype("fakedatafs".to_string()),
    ];

    if opts.allow_other {
        fuser_opts.push(fuser::MountOption::AllowOther);
    }
    if opts.allow_root {
        fuser_opts.push(fuser::MountOption::AllowRoot);
    }
    if opts.auto_unmount {
        fuser_opts.push(fuser::MountOption::AutoUnmount);
    }
    if opts.default_permissions {
        fuser_opts.push(fuser::MountOption::DefaultPermissions);
    }

    fuser_opts
}

/// How often `serve` checks whether the session thread has exited.
const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Why a mounted session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The shutdown token was cancelled.
    Cancelled,
    /// The session ended on its own, e.g. after `fusermount -u`.
    Unmounted,
}

/// Resolves once `shutdown` is cancelled or `session_ended` reports true,
/// checking the latter every `poll`.
pub async fn wait_for_teardown<F>(
    shutdown: &CancellationToken,
    mut session_ended: F,
    poll: Duration,
) -> Teardown
where
    F: FnMut() -> bool,
{
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Teardown::Cancelled,
            _ = ticker.tick() => {
                if session_ended() {
                    return Teardown::Unmounted;
                }
            }
        }
    }
}

/// Cancels `shutdown` once `signal` fires. If the signal cannot be
/// listened for, the token is left alone and the mount keeps running.
pub async fn cancel_on_signal<S>(signal: S, shutdown: CancellationToken)
where
    S: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("failed to listen for interrupt, Ctrl-C will not unmount: {}", e);
        return;
    }
    info!("interrupt received, cleaning up");
    shutdown.cancel();
}

/// Mounts the tree described by `config` at `mountpoint` and serves it until
/// `shutdown` is cancelled or the filesystem is unmounted externally.
pub async fn serve(
    mountpoint: &Path,
    config: FakeDataConfig,
    options: &MountOptions,
    shutdown: CancellationToken,
) -> Result<(), MountError> {
    config.validate()?;
    validate_mountpoint(mountpoint)?;

    let cache = Arc::new(ReadCache::new(config.cache.clone()));
    let sweeper_token = shutdown.child_token();
    let sweeper = spawn_sweeper(Arc::clone(&cache), sweeper_token.clone());

    let fs = FakeDataFs::new(config, Arc::clone(&cache));
    let files = fs.tree().len();
    let session = match fuser::spawn_mount2(fs, mountpoint, &options_to_fuser(options)) {
        Ok(session) => session,
        Err(e) => {
            sweeper_token.cancel();
            if let Err(join_err) = sweeper.await {
                warn!("read cache sweeper ended abnormally: {}", join_err);
            }
            return Err(e.into());
        }
    };
    info!(mountpoint = %mountpoint.display(), files, "filesystem mounted");

    let reason = wait_for_teardown(
        &shutdown,
        || session.guard.is_finished(),
        SESSION_POLL_INTERVAL,
    )
    .await;
    match reason {
        Teardown::Cancelled => info!("shutting down, unmounting {}", mountpoint.display()),
        Teardown::Unmounted => info!("{} was unmounted externally", mountpoint.display()),
    }

    sweeper_token.cancel();
    if let Err(e) = sweeper.await {
        warn!("read cache sweeper ended abnormally: {}", e);
    }
    drop(session);
    info!(stats = ?cache.stats(), "unmounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_default_options() {
        let opts = MountOptions::default();
        assert!(!opts.allow_other);
        assert!(!opts.allow_root);
        assert!(!opts.auto_unmount);
        assert!(!opts.default_permissions);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_mount_options("").unwrap(), MountOptions::default());
    }

    #[test]
    fn test_parse_multiple() {
        let opts = parse_mount_options("allow_other, auto_unmount,ro").unwrap();
        assert!(opts.allow_other);
        assert!(opts.auto_unmount);
        assert!(!opts.allow_root);
    }

    #[test]
    fn test_parse_rejects_rw() {
        let result = parse_mount_options("rw");
        assert!(matches!(result, Err(MountError::InvalidOption(o)) if o == "rw"));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_mount_options("allow_other,bogus").is_err());
    }

    #[test]
    fn test_fuser_options_always_read_only() {
        let fuser_opts = options_to_fuser(&MountOptions::default());
        assert!(fuser_opts.contains(&fuser::MountOption::RO));
        assert!(!fuser_opts.contains(&fuser::MountOption::AllowOther));
    }

    #[test]
    fn test_fuser_options_mapped() {
        let opts = MountOptions {
            allow_other: true,
            auto_unmount: true,
            ..Default::default()
        };
        let fuser_opts = options_to_fuser(&opts);
        assert!(fuser_opts.contains(&fuser::MountOption::AllowOther));
        assert!(fuser_opts.contains(&fuser::MountOption::AutoUnmount));
        assert!(!fuser_opts.contains(&fuser::MountOption::AllowRoot));
    }

    #[test]
    fn test_validate_mountpoint_dir() {
        let dir = TempDir::new().unwrap();
        assert!(validate_mountpoint(dir.path()).is_ok());
    }

    #[test]
    fn test_validate_mountpoint_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            validate_mountpoint(&missing),
            Err(MountError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_validate_mountpoint_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            validate_mountpoint(&file),
            Err(MountError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_serve_rejects_invalid_config_before_mounting() {
        let dir = TempDir::new().unwrap();
        let config = FakeDataConfig {
            max_size_kib: 0,
            ..Default::default()
        };
        let result = serve(
            dir.path(),
            config,
            &MountOptions::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(MountError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_rejects_missing_mountpoint() {
        let dir = TempDir::new().unwrap();
        let result = serve(
            &dir.path().join("absent"),
            FakeDataConfig::default(),
            &MountOptions::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(MountError::PathNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_cancel() {
        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        let reason = wait_for_teardown(&shutdown, || false, SESSION_POLL_INTERVAL).await;
        assert_eq!(reason, Teardown::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_on_external_unmount() {
        let shutdown = CancellationToken::new();
        let ended = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ended);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let reason = wait_for_teardown(
            &shutdown,
            || ended.load(Ordering::SeqCst),
            SESSION_POLL_INTERVAL,
        )
        .await;
        assert_eq!(reason, Teardown::Unmounted);
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_unmount_stops_sweeper() {
        let shutdown = CancellationToken::new();
        let sweeper_token = shutdown.child_token();
        let cache = Arc::new(ReadCache::new(Default::default()));
        let sweeper = spawn_sweeper(cache, sweeper_token.clone());

        let reason = wait_for_teardown(&shutdown, || true, SESSION_POLL_INTERVAL).await;
        assert_eq!(reason, Teardown::Unmounted);

        sweeper_token.cancel();
        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .expect("sweeper should stop once the session is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_cancels_shutdown() {
        let shutdown = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, shutdown.clone()).await;
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_listener_error_keeps_mount() {
        let shutdown = CancellationToken::new();
        let failing = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler")) };
        cancel_on_signal(failing, shutdown.clone()).await;
        assert!(!shutdown.is_cancelled());
    }
}
