//! Registry test utilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use runtime_installer::error::FetchError;
use runtime_installer::fetch::{ArtifactRegistry, extract_archive};

/// In-memory Artifact Registry. Repositories and images that were not
/// registered answer with an error, like an unreachable region.
#[derive(Default)]
pub struct FakeRegistry {
    tags: HashMap<String, Vec<String>>,
    images: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: Vec<&str>) -> Self {
        self.tags.insert(
            repository.to_string(),
            tags.into_iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Serve `archive` as the runtime layer of `image`
    pub fn with_image(mut self, image: &str, archive: Vec<u8>) -> Self {
        self.images.insert(image.to_string(), archive);
        self
    }

    /// Every repository listed and image pulled, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable(url: &str) -> FetchError {
        FetchError::Image {
            url: url.to_string(),
            reason: "503 Service Unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ArtifactRegistry for FakeRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, FetchError> {
        self.record(format!("list {repository}"));
        self.tags
            .get(repository)
            .cloned()
            .ok_or_else(|| Self::unavailable(repository))
    }

    async fn pull_image(&self, image: &str, dir: &Path, strip: usize) -> Result<(), FetchError> {
        self.record(format!("pull {image}"));
        let archive = self
            .images
            .get(image)
            .ok_or_else(|| Self::unavailable(image))?;
        extract_archive(archive, dir, strip)
    }
}
