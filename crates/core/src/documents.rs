//! Reference-document search for `/chat_with_file`
//!
//! Plain-text and Markdown documents in one directory are embedded once,
//! lazily, and compared against each query embedding by cosine similarity.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{FarahError, Result};
use crate::llm::Oracle;

#[derive(Debug, Clone)]
struct Document {
    path: PathBuf,
    text: String,
    embedding: Vec<f32>,
}

/// The best document for a query
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub path: PathBuf,
    pub text: String,
    pub score: f32,
}

pub struct DocumentIndex {
    dir: PathBuf,
    threshold: f32,
    oracle: Arc<dyn Oracle>,
    documents: OnceCell<Vec<Document>>,
}

impl DocumentIndex {
    pub fn new(dir: impl Into<PathBuf>, threshold: f32, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            dir: dir.into(),
            threshold,
            oracle,
            documents: OnceCell::new(),
        }
    }

    /// Most similar document if its score reaches the threshold
    pub async fn search(&self, query: &str) -> Result<Option<DocumentMatch>> {
        let documents = self
            .documents
            .get_or_try_init(|| load_documents(&self.dir, self.oracle.as_ref()))
            .await?;
        if documents.is_empty() {
            return Ok(None);
        }

        let query_embedding = self.oracle.embed(query).await?;
        let best = documents
            .iter()
            .map(|doc| {
                let score = cosine_similarity(&query_embedding, &doc.embedding);
                debug!(path = %doc.path.display(), score, "Document similarity");
                (doc, score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((doc, score)) if score >= self.threshold => {
                info!(path = %doc.path.display(), score, "Relevant document found");
                Ok(Some(DocumentMatch {
                    path: doc.path.clone(),
                    text: doc.text.clone(),
                    score,
                }))
            }
            Some((_, score)) => {
                info!(score, threshold = self.threshold, "No document above threshold");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

async fn load_documents(dir: &Path, oracle: &dyn Oracle) -> Result<Vec<Document>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Document directory unavailable");
            return Ok(Vec::new());
        }
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FarahError::Config(format!("Failed to list {}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"));
        if is_text {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                continue;
            }
        };
        let embedding = oracle.embed(&text).await?;
        info!(path = %path.display(), "Created embedding for document");
        documents.push(Document {
            path,
            text,
            embedding,
        });
    }
    Ok(documents)
}

/// Cosine similarity; 0 when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOracle;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    fn docs_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("umrah.md"), "umrah guide").unwrap();
        std::fs::write(dir.path().join("visa.txt"), "visa rules").unwrap();
        std::fs::write(dir.path().join("ignored.docx"), "binary").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_search_above_threshold() {
        let dir = docs_dir();
        let oracle = Arc::new(
            FakeOracle::new()
                .with_embedding("umrah guide", vec![1.0, 0.0])
                .with_embedding("visa rules", vec![0.0, 1.0])
                .with_embedding("how do I perform umrah", vec![0.95, 0.1]),
        );
        let index = DocumentIndex::new(dir.path(), 0.84, oracle.clone());

        let found = index.search("how do I perform umrah").await.unwrap().unwrap();
        assert!(found.path.ends_with("umrah.md"));
        assert_eq!(found.text, "umrah guide");

        // Documents are embedded once
        index.search("how do I perform umrah").await.unwrap();
        assert_eq!(oracle.embed_calls(), 4);
    }

    #[tokio::test]
    async fn test_search_below_threshold() {
        let dir = docs_dir();
        let oracle = Arc::new(
            FakeOracle::new()
                .with_embedding("umrah guide", vec![1.0, 0.0])
                .with_embedding("visa rules", vec![0.0, 1.0])
                .with_embedding("best pizza", vec![0.7, 0.7]),
        );
        let index = DocumentIndex::new(dir.path(), 0.84, oracle);
        assert!(index.search("best pizza").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let oracle = Arc::new(FakeOracle::new());
        let index = DocumentIndex::new("/nonexistent/farah-docs", 0.84, oracle);
        assert!(index.search("anything").await.unwrap().is_none());
    }
}
