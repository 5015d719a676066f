//! Binary path resolution

use std::path::{Path, PathBuf};

/// Path resolution errors
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("app binary not found at '{}', did you build it?", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns user-supplied binary paths into absolute ones
pub trait PathResolver: Send + Sync {
    fn resolve_absolute_path(&self, path: &Path) -> Result<PathBuf, PathError>;
}

/// Resolves relative paths against a base directory (the process working
/// directory unless overridden) and requires the file to exist.
#[derive(Debug, Clone, Default)]
pub struct AbsolutePathResolver {
    base_dir: Option<PathBuf>,
}

impl AbsolutePathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir: Some(base_dir) }
    }
}

impl PathResolver for AbsolutePathResolver {
    fn resolve_absolute_path(&self, path: &Path) -> Result<PathBuf, PathError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let base = match &self.base_dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            base.join(path)
        };

        if !absolute.exists() {
            return Err(PathError::NotFound(absolute));
        }
        Ok(absolute)
    }
}
