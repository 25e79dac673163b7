use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Writes `data` to a temporary file beside `path` and renames it into place,
/// so readers see either the previous page or the complete new one.
/// A symlinked `path` stays a symlink; its target is replaced instead.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let target = match std::fs::symlink_metadata(path) {
        Ok(m) if m.file_type().is_symlink() => std::fs::canonicalize(path)
            .with_context(|| format!("failed to resolve symlink {}", path.display()))?,
        _ => path.to_path_buf(),
    };
    let path = target.as_path();
    let dir = match path.parent() { Some(p) if !p.as_os_str().is_empty() => p, _ => Path::new(".") };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(data).with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.flush()?;
    // NamedTempFile is created 0600; the page is meant to be served.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path).map(|m| m.permissions().mode()).unwrap_or(0o644);
        tmp.as_file().set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    tmp.as_file().sync_all().with_context(|| format!("failed to sync {}", tmp.path().display()))?;
    tmp.persist(path).map_err(|e| e.error).with_context(|| format!("failed to replace {}", path.display()))?;
    log::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
