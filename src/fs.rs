//! Shared filesystem helpers for sources and filters.

use std::path::Path;

use crate::error::ExecutionError;

/// Recursively copy a directory tree.
///
/// When `preserve_symlinks` is `true`, symbolic links inside the source
/// tree are recreated as links in the destination. When `false`, links are
/// followed and their content materialised, as in a plain recursive copy.
pub(crate) fn copy_dir_recursive(
    src: &Path,
    dst: &Path,
    preserve_symlinks: bool,
) -> Result<(), ExecutionError> {
    std::fs::create_dir_all(dst).map_err(|e| ExecutionError::io(dst, e))?;
    for entry in std::fs::read_dir(src).map_err(|e| ExecutionError::io(src, e))? {
        let entry = entry.map_err(|e| ExecutionError::io(src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let meta = std::fs::symlink_metadata(&src_path)
            .map_err(|e| ExecutionError::io(&src_path, e))?;
        if preserve_symlinks && meta.is_symlink() {
            let target =
                std::fs::read_link(&src_path).map_err(|e| ExecutionError::io(&src_path, e))?;
            symlink(&target, &dst_path)?;
        } else if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, preserve_symlinks)?;
        } else {
            std::fs::copy(&src_path, &dst_path)
                .map_err(|e| ExecutionError::io(&src_path, e))?;
        }
    }
    Ok(())
}

/// Copy a file, or a directory tree when `path` is a directory, into
/// `dst`. `dst` names the copy itself, not its parent.
pub(crate) fn copy_path(
    path: &Path,
    dst: &Path,
    preserve_symlinks: bool,
) -> Result<(), ExecutionError> {
    if path.is_dir() {
        copy_dir_recursive(path, dst, preserve_symlinks)
    } else {
        std::fs::copy(path, dst)
            .map(|_| ())
            .map_err(|e| ExecutionError::io(path, e))
    }
}

/// Create a symbolic link at `link` pointing to `target`.
pub(crate) fn symlink(target: &Path, link: &Path) -> Result<(), ExecutionError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| ExecutionError::io(link, e))
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
                .map_err(|e| ExecutionError::io(link, e))
        } else {
            std::os::windows::fs::symlink_file(target, link)
                .map_err(|e| ExecutionError::io(link, e))
        }
    }
}
