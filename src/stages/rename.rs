// src/stages/rename.rs

use std::path::{Path, PathBuf};

/// Rewrite output paths: `prefix` + stem + `suffix` + `extname`, optionally
/// moved to `dirname`.
///
/// `extname` includes the dot (`".css"`); an empty string drops the extension.
#[derive(Debug, Clone, Default)]
pub struct RenameStage {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub extname: Option<String>,
    pub dirname: Option<String>,
}

impl RenameStage {
    pub fn rename(&self, relative: &Path) -> PathBuf {
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match &self.extname {
            Some(ext) => ext.clone(),
            None => relative
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        };

        let name = format!(
            "{}{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            stem,
            self.suffix.as_deref().unwrap_or(""),
            ext
        );

        let dir = match &self.dirname {
            Some(dir) => PathBuf::from(dir),
            None => relative.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        dir.join(name)
    }
}

/// Replace the extension of `relative` with `extname` (dot included).
pub fn with_extname(relative: &Path, extname: &str) -> PathBuf {
    RenameStage {
        extname: Some(extname.to_string()),
        ..RenameStage::default()
    }
    .rename(relative)
}
