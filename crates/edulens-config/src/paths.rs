//! Where EduLens keeps its config, database and uploaded files.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    /// Managed copies of uploaded files, named `<artifact id>-<original name>`.
    pub uploads_dir: PathBuf,
}

impl AppPaths {
    pub const DATABASE_FILE_NAME: &'static str = "edulens.db";

    /// The platform's per-user locations, or `None` without a home directory.
    pub fn new() -> Option<Self> {
        let dirs = ProjectDirs::from("com", "edulens", "edulens")?;
        Some(Self::rooted(dirs.config_dir(), dirs.data_dir()))
    }

    /// Lay the files out under explicit config and data roots.
    pub fn rooted(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join(Self::DATABASE_FILE_NAME),
            uploads_dir: data_dir.join("uploads"),
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.uploads_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// `edulens init` has written a config file.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_paths() {
        let paths = AppPaths::new().unwrap();
        assert!(paths.config_file.ends_with("config.toml"));
        assert!(paths.database_file.ends_with("edulens.db"));
        assert!(paths.uploads_dir.starts_with(&paths.data_dir));
    }

    #[test]
    fn test_rooted_layout_and_init_marker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::rooted(&dir.path().join("cfg"), &dir.path().join("data"));
        assert!(!paths.is_initialized());

        paths.ensure_dirs().unwrap();
        assert!(paths.uploads_dir.is_dir());
        assert!(!paths.is_initialized());

        std::fs::write(&paths.config_file, "").unwrap();
        assert!(paths.is_initialized());
    }
}
