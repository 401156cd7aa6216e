use std::fs;
use std::io::Write;
use std::path::Path;
use anyhow::{Result, Context};

/// Write `content` to `path` via a temp file and rename, so readers never see
/// a half-written document.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    write_via_temp(path.as_ref(), content, None)
}

/// Like [`atomic_write`], but the file is readable by its owner only.
pub fn atomic_write_private<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    write_via_temp(path.as_ref(), content, Some(0o600))
}

fn write_via_temp(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let parent = path.parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid path: no parent directory"))?;

    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
    }

    let tmp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", tmp_path))?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to restrict permissions on {:?}", tmp_path))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    file.write_all(content)
        .with_context(|| format!("Failed to write to temp file: {:?}", tmp_path))?;

    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {:?}", tmp_path))?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, path))?;

    Ok(())
}
