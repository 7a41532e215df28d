//! Filesystem-backed content source.
//!
//! Post keys everywhere else in the crate are relative to the posts root;
//! this is the only module that knows where that root lives on disk.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    application::source::{ContentSource, RedirectStub},
    infra::error::InfraError,
};

pub struct FsContentSource {
    posts_root: PathBuf,
    templates_root: PathBuf,
}

impl FsContentSource {
    pub fn new(posts_root: PathBuf, templates_root: PathBuf) -> Self {
        Self {
            posts_root,
            templates_root,
        }
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, InfraError> {
    match fs::read_to_string(path).await {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(InfraError::Io(err)),
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn read_post(&self, path: &str) -> Result<Option<String>, InfraError> {
        read_optional(&self.posts_root.join(path)).await
    }

    async fn read_template(&self, name: &str) -> Result<Option<String>, InfraError> {
        read_optional(&self.templates_root.join(name)).await
    }

    async fn list_post_files(&self) -> Result<Vec<String>, InfraError> {
        // Iterative walk; the posts tree is only year/month/day/slug deep.
        let mut pending = vec![self.posts_root.clone()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.posts_root) {
                    files.push(relative.to_string_lossy().into_owned());
                }
            }
        }

        Ok(files)
    }

    async fn read_redirect(&self, key: &str) -> Result<Option<RedirectStub>, InfraError> {
        let stub_path = self.posts_root.join(format!("{key}.redirect"));
        Ok(read_optional(&stub_path)
            .await?
            .and_then(|raw| RedirectStub::parse(&raw)))
    }
}
