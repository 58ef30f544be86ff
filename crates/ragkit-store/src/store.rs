//! The append-only passage store.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matrix::VectorMatrix;
use ragkit_core::error::{RagKitError, Result};
use ragkit_core::types::ScoredPassage;

const META_FILE: &str = "passages.jsonl";
const VECTOR_FILE: &str = "vectors.bin";

/// One persisted passage record (vector lives in the parallel matrix file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPassage {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable view of the store contents at one point in time.
#[derive(Debug)]
struct Snapshot {
    records: Vec<StoredPassage>,
    matrix: Option<VectorMatrix>,
    ids: HashSet<String>,
}

/// Durable nearest-neighbor store over passage embeddings.
///
/// Dimensionality is fixed by the first insert (or the on-disk state) and
/// enforced on every subsequent `add` and `search`. Insertion with an id
/// already present is rejected — records never change once written.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    inner: RwLock<Snapshot>,
}

impl VectorStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// A record-count mismatch between the metadata log and the vector
    /// matrix is a fatal integrity error, not something to repair silently.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let records = load_records(&dir.join(META_FILE))?;
        let matrix = load_matrix(&dir.join(VECTOR_FILE))?;

        let rows = matrix.as_ref().map_or(0, VectorMatrix::rows);
        if records.len() != rows {
            return Err(RagKitError::CorruptStore(format!(
                "{} has {} records but {} has {} vectors",
                META_FILE,
                records.len(),
                VECTOR_FILE,
                rows
            )));
        }

        let ids = records.iter().map(|r| r.id.clone()).collect();
        tracing::debug!("opened vector store at {} ({} passages)", dir.display(), records.len());

        Ok(Self {
            dir,
            inner: RwLock::new(Snapshot { records, matrix, ids }),
        })
    }

    /// Number of stored passages.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed vector dimensionality, if any passage has been inserted.
    pub fn dim(&self) -> Option<usize> {
        self.read().matrix.as_ref().map(VectorMatrix::dim)
    }

    /// Append passages with their pre-computed embeddings.
    ///
    /// `texts`, `vectors`, and `metadatas` must be the same length; each
    /// vector must match the store dimensionality (inferred from the first
    /// insert when the store is empty). An explicit id may be supplied via
    /// `metadata["id"]`; otherwise a random one is generated. Duplicate ids
    /// — against the store or within the batch — are rejected.
    ///
    /// Returns the ids in input order. The new state is persisted before it
    /// becomes visible to searches; persistence failures surface as errors
    /// and leave the in-memory store unchanged.
    pub fn add(
        &self,
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[HashMap<String, String>],
    ) -> Result<Vec<String>> {
        if texts.len() != vectors.len() || texts.len() != metadatas.len() {
            return Err(RagKitError::Store(format!(
                "add() length mismatch: {} texts, {} vectors, {} metadatas",
                texts.len(),
                vectors.len(),
                metadatas.len()
            )));
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self
            .inner
            .write()
            .map_err(|e| RagKitError::Store(format!("store lock poisoned: {e}")))?;

        // Build the appended snapshot aside, swap it in only after persist.
        let mut matrix = match &guard.matrix {
            Some(m) => m.clone(),
            None => VectorMatrix::new(vectors[0].len())?,
        };
        let mut records = guard.records.clone();
        let mut ids = guard.ids.clone();

        let mut new_ids = Vec::with_capacity(texts.len());
        for ((text, vector), metadata) in texts.iter().zip(vectors).zip(metadatas) {
            let id = metadata
                .get("id")
                .cloned()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            if !ids.insert(id.clone()) {
                return Err(RagKitError::DuplicateId(id));
            }
            matrix.push(vector)?;
            records.push(StoredPassage {
                id: id.clone(),
                text: text.clone(),
                metadata: metadata.clone(),
                created_at: Utc::now(),
            });
            new_ids.push(id);
        }

        persist(&self.dir, &records, &matrix)?;

        tracing::debug!("added {} passages (store now {})", new_ids.len(), records.len());
        *guard = Snapshot {
            records,
            matrix: Some(matrix),
            ids,
        };
        Ok(new_ids)
    }

    /// Top-`top_k` passages by cosine similarity, best first.
    ///
    /// Ties keep insertion order (earlier record wins). An empty store
    /// returns an empty list, never an error.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<ScoredPassage>> {
        let guard = self.read();
        let Some(matrix) = &guard.matrix else {
            return Ok(Vec::new());
        };

        let scores = matrix.cosine_scores(query_vector)?;

        let mut order: Vec<usize> = (0..scores.len()).collect();
        // Stable sort: equal scores stay in insertion order.
        order.sort_by(|a, b| {
            scores[*b]
                .partial_cmp(&scores[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(order
            .into_iter()
            .take(top_k)
            .map(|i| {
                let rec = &guard.records[i];
                ScoredPassage {
                    id: rec.id.clone(),
                    text: rec.text.clone(),
                    metadata: rec.metadata.clone(),
                    score: scores[i],
                    rerank_score: None,
                }
            })
            .collect())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        // A poisoned lock means a panic mid-swap; the snapshot itself is
        // still a consistent value, so keep serving it.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn load_records(path: &Path) -> Result<Vec<StoredPassage>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let rec: StoredPassage = serde_json::from_str(line).map_err(|e| {
            RagKitError::CorruptStore(format!(
                "{} line {}: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        records.push(rec);
    }
    Ok(records)
}

fn load_matrix(path: &Path) -> Result<Option<VectorMatrix>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(VectorMatrix::read_from(path)?))
}

/// Write both files to temp paths, then rename into place.
fn persist(dir: &Path, records: &[StoredPassage], matrix: &VectorMatrix) -> Result<()> {
    let vec_tmp = dir.join(format!("{VECTOR_FILE}.tmp"));
    matrix.write_to(&vec_tmp)?;

    let meta_tmp = dir.join(format!("{META_FILE}.tmp"));
    let mut lines = String::new();
    for rec in records {
        lines.push_str(&serde_json::to_string(rec)?);
        lines.push('\n');
    }
    std::fs::write(&meta_tmp, lines)?;

    std::fs::rename(&vec_tmp, dir.join(VECTOR_FILE))?;
    std::fs::rename(&meta_tmp, dir.join(META_FILE))?;
    Ok(())
}
