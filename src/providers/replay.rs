/*!
 * Completions replayed from disk.
 *
 * Each batch's completion lives in `<dir>/scene-<S>-batch-<B>.txt`. This lets a
 * translation produced elsewhere (or by hand) go through the same parse, match
 * and validate path as a live one.
 */

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::errors::ProviderError;
use crate::project::BatchKey;
use crate::providers::{CompletionRequest, CompletionSource};

// @struct: Completion source backed by a directory of text files
#[derive(Debug, Clone)]
pub struct ReplaySource {
    directory: PathBuf,
}

impl ReplaySource {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// File name holding the completion for a batch
    pub fn file_name(key: BatchKey) -> String {
        format!("scene-{}-batch-{}.txt", key.scene, key.batch)
    }

    pub fn completion_path(&self, key: BatchKey) -> PathBuf {
        self.directory.join(Self::file_name(key))
    }
}

#[async_trait]
impl CompletionSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let path = self.completion_path(request.key);
        debug!("Reading completion for {} from {}", request.key, path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProviderError::MissingCompletion {
                scene: request.key.scene,
                batch: request.key.batch,
            }),
            Err(e) => Err(ProviderError::Io(e)),
        }
    }
}
