//! Dense f32 vector matrix with cosine scoring and binary file I/O.

use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rayon::prelude::*;

use ragkit_core::error::{RagKitError, Result};

/// File magic for the vector matrix ("RagKit Vectors").
const MAGIC: &[u8; 4] = b"RGKV";
const VERSION: u32 = 1;

/// Norm epsilon: keeps zero vectors at similarity 0.0 instead of NaN.
const NORM_EPS: f32 = 1e-12;

/// Row-major matrix of embedding vectors, fixed dimensionality.
#[derive(Debug, Clone)]
pub struct VectorMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl VectorMatrix {
    /// Create an empty matrix with the given dimensionality (must be ≥ 1).
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(RagKitError::Config("vector dimensionality must be >= 1".into()));
        }
        Ok(Self { dim, data: Vec::new() })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Append one vector. Dimension mismatch is a fatal configuration error.
    pub fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(RagKitError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Cosine similarity of `query` against every row, in row order.
    ///
    /// `dot(a,b) / ((‖a‖+ε)·(‖b‖+ε))` — a zero query or row scores 0.0.
    pub fn cosine_scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dim {
            return Err(RagKitError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        let q_norm = norm(query) + NORM_EPS;
        let scores = self
            .data
            .par_chunks_exact(self.dim)
            .map(|row| {
                let dot: f32 = row.iter().zip(query).map(|(a, b)| a * b).sum();
                dot / ((norm(row) + NORM_EPS) * q_norm)
            })
            .collect();
        Ok(scores)
    }

    /// Write the matrix to `path`: magic, version, dim, then rows of f32 LE.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        file.write_all(MAGIC)?;
        file.write_u32::<LittleEndian>(VERSION)?;
        file.write_u32::<LittleEndian>(self.dim as u32)?;
        for v in &self.data {
            file.write_f32::<LittleEndian>(*v)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Read a matrix written by [`write_to`](Self::write_to).
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut file = std::io::BufReader::new(std::fs::File::open(path)?);

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(RagKitError::CorruptStore(format!(
                "bad vector file magic in {}",
                path.display()
            )));
        }
        let version = file.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(RagKitError::CorruptStore(format!(
                "unsupported vector file version {version}"
            )));
        }
        let dim = file.read_u32::<LittleEndian>()? as usize;
        if dim == 0 {
            return Err(RagKitError::CorruptStore("vector file declares dim 0".into()));
        }

        let mut data = Vec::new();
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        if raw.len() % 4 != 0 {
            return Err(RagKitError::CorruptStore("truncated vector data".into()));
        }
        for chunk in raw.chunks_exact(4) {
            data.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        if data.len() % dim != 0 {
            return Err(RagKitError::CorruptStore(format!(
                "vector data length {} not divisible by dim {dim}",
                data.len()
            )));
        }

        Ok(Self { dim, data })
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(a: &[f32], b: &[f32]) -> f32 {
        let mut m = VectorMatrix::new(a.len()).unwrap();
        m.push(a).unwrap();
        m.cosine_scores(b).unwrap()[0]
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = [0.3, -1.2, 4.5, 0.01];
        assert!((sim(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = [1.0, 2.0, 3.0];
        let b = [-0.5, 0.25, 9.0];
        assert!((sim(&a, &b) - sim(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero_not_nan() {
        let zero = [0.0, 0.0, 0.0];
        let v = [1.0, 2.0, 3.0];
        let s = sim(&zero, &v);
        assert!(!s.is_nan());
        assert_eq!(s, 0.0);
        let s = sim(&v, &zero);
        assert!(!s.is_nan());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(sim(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((sim(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_push_dimension_mismatch() {
        let mut m = VectorMatrix::new(3).unwrap();
        let err = m.push(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            RagKitError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let mut m = VectorMatrix::new(3).unwrap();
        m.push(&[1.0, 2.0, 3.0]).unwrap();
        assert!(m.cosine_scores(&[1.0]).unwrap_err().is_fatal());
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(VectorMatrix::new(0).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = std::env::temp_dir().join("ragkit-matrix-roundtrip");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("vectors.bin");

        let mut m = VectorMatrix::new(2).unwrap();
        m.push(&[1.0, -2.0]).unwrap();
        m.push(&[0.5, 3.25]).unwrap();
        m.write_to(&path).unwrap();

        let loaded = VectorMatrix::read_from(&path).unwrap();
        assert_eq!(loaded.dim(), 2);
        assert_eq!(loaded.rows(), 2);
        assert_eq!(loaded.row(1), &[0.5, 3.25]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let dir = std::env::temp_dir().join("ragkit-matrix-badmagic");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("vectors.bin");
        std::fs::write(&path, b"NOPE\x01\x00\x00\x00\x02\x00\x00\x00").unwrap();
        assert!(matches!(
            VectorMatrix::read_from(&path).unwrap_err(),
            RagKitError::CorruptStore(_)
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
