//! Mounting of removable media at the daemon's fixed mount point.
//!
//! [`MountController`] is the seam the monitor drives; [`SysMounter`] is
//! the real implementation over the mount(2)/umount2(2) syscalls. Media
//! is always mounted read-only: the daemon must never write back to the
//! key an operator hands it.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MountError;

/// Filesystem types the mounter will accept. Removable keys in the field
/// are FAT-formatted; anything else is refused before the syscall.
pub const SUPPORTED_MEDIA_FILESYSTEMS: &[&str] = &["vfat", "msdos", "exfat", "fat"];

// ============================================================================
// Mount State
// ============================================================================

/// Book-keeping for the single process-wide mount point.
///
/// Owned exclusively by the event monitor; at most one device is mounted
/// at the mount point at any time.
#[derive(Debug, Clone)]
pub struct MountState {
    mount_point: PathBuf,
    is_mounted: bool,
    source_device: Option<String>,
}

impl MountState {
    pub fn new(mount_point: PathBuf) -> Self {
        Self {
            mount_point,
            is_mounted: false,
            source_device: None,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted
    }

    pub fn source_device(&self) -> Option<&str> {
        self.source_device.as_deref()
    }

    /// Record a successful mount of `device`.
    pub fn mark_mounted(&mut self, device: &str) {
        self.is_mounted = true;
        self.source_device = Some(device.to_string());
    }

    /// Record that the mount point is free again.
    pub fn mark_unmounted(&mut self) {
        self.is_mounted = false;
        self.source_device = None;
    }
}

// ============================================================================
// Mount Controller
// ============================================================================

/// OS-level mount operations, behind a trait so tests can drive the
/// monitor without privileges or real media.
pub trait MountController: Send + Sync {
    /// Mount `device` at `mount_point`.
    ///
    /// The caller has already ensured the mount point exists and is not a
    /// stale mount; no two mounts are ever attempted concurrently.
    fn mount(
        &self,
        device: &Path,
        mount_point: &Path,
        fstype: &str,
        read_only: bool,
    ) -> Result<(), MountError>;

    /// Best-effort unmount-and-remove of the mount point.
    ///
    /// Idempotent: unmounts if currently mounted, removes the directory
    /// if it still exists, and is safe to call when nothing is mounted.
    /// Returns false if any step failed; never raises.
    fn cleanup_unmount(&self, mount_point: &Path) -> bool;
}

/// [`MountController`] over the real mount(2) and umount2(2) syscalls.
#[cfg(target_os = "linux")]
pub struct SysMounter;

#[cfg(target_os = "linux")]
impl MountController for SysMounter {
    fn mount(
        &self,
        device: &Path,
        mount_point: &Path,
        fstype: &str,
        read_only: bool,
    ) -> Result<(), MountError> {
        use nix::mount::{MsFlags, mount};

        if !SUPPORTED_MEDIA_FILESYSTEMS.contains(&fstype) {
            return Err(MountError::UnsupportedFilesystem {
                fstype: fstype.to_string(),
            });
        }

        let mut flags = MsFlags::MS_NOATIME;
        if read_only {
            flags |= MsFlags::MS_RDONLY;
        }

        mount(
            Some(device),
            mount_point,
            Some(fstype),
            flags,
            None::<&str>,
        )
        .map_err(|errno| MountError::Mount {
            device: device.display().to_string(),
            fstype: fstype.to_string(),
            mount_point: mount_point.to_path_buf(),
            source: std::io::Error::from(errno),
        })?;

        debug!(
            device = %device.display(),
            mount_point = %mount_point.display(),
            fstype,
            read_only,
            "mounted removable media"
        );
        Ok(())
    }

    fn cleanup_unmount(&self, mount_point: &Path) -> bool {
        use nix::mount::{MntFlags, umount2};

        let mut clean = true;

        if is_mount_point(mount_point) {
            if let Err(errno) = umount2(mount_point, MntFlags::MNT_FORCE) {
                warn!(
                    mount_point = %mount_point.display(),
                    error = %errno,
                    "unmount failed during cleanup"
                );
                clean = false;
            }
        }

        if mount_point.exists() {
            if let Err(e) = std::fs::remove_dir(mount_point) {
                warn!(
                    mount_point = %mount_point.display(),
                    error = %e,
                    "could not remove mount point directory"
                );
                clean = false;
            }
        }

        clean
    }
}

/// Whether `path` is a mount point, decided by comparing its device id
/// with its parent's (the same test `os.path.ismount` style tools use).
#[cfg(unix)]
pub fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Some(parent) = path.parent() else {
        // The filesystem root is a mount point by definition.
        return true;
    };
    let Ok(parent_meta) = std::fs::metadata(parent) else {
        return false;
    };
    meta.dev() != parent_meta.dev() || meta.ino() == parent_meta.ino()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_state_transitions() {
        let mut state = MountState::new(PathBuf::from("/mnt/usbkey"));
        assert!(!state.is_mounted());
        assert_eq!(state.source_device(), None);

        state.mark_mounted("/dev/sdb1");
        assert!(state.is_mounted());
        assert_eq!(state.source_device(), Some("/dev/sdb1"));

        state.mark_unmounted();
        assert!(!state.is_mounted());
        assert_eq!(state.source_device(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_directory_is_not_a_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_mount_point(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_path_is_not_a_mount_point() {
        assert!(!is_mount_point(Path::new("/no/such/mount/point")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_cleanup_unmount_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mount_point = dir.path().join("usbkey");
        std::fs::create_dir(&mount_point).unwrap();

        // First call removes the (unmounted) directory.
        assert!(SysMounter.cleanup_unmount(&mount_point));
        assert!(!mount_point.exists());

        // Second call has nothing to do and still succeeds.
        assert!(SysMounter.cleanup_unmount(&mount_point));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unsupported_filesystem_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = SysMounter
            .mount(Path::new("/dev/null"), dir.path(), "ext4", true)
            .unwrap_err();
        assert!(matches!(err, MountError::UnsupportedFilesystem { .. }));
    }
}
