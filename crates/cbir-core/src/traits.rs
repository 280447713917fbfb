use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DescriptorBundle, Feedback, SearchHit};

pub trait Extractor: Send + Sync {
    fn extract_bytes(&self, payload: &[u8]) -> Result<DescriptorBundle>;

    fn extract_path(&self, path: &Path) -> Result<DescriptorBundle> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
        self.extract_bytes(&bytes)
    }
}

pub trait SearchEngine: Send + Sync {
    fn search(
        &mut self,
        payload: &[u8],
        top_k: usize,
        feedback: Option<&Feedback>,
    ) -> Result<Vec<SearchHit>>;
}
