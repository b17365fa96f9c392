//! Nearest-neighbor index over chunk embeddings
//!
//! Small corpora get an exhaustive flat scan. Larger ones are partitioned
//! with k-means into an inverted-file (IVF) layout and only the clusters
//! nearest the query are scanned. Either way position `i` is the `i`-th
//! vector handed to [`VectorIndex::build`].

use super::clustering::{kmeans_clustering, squared_l2};
use crate::config::IndexConfig;
use crate::error::{RepoLensError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Search hit: squared L2 distance to the query and the vector's position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub position: usize,
}

/// Index layout chosen at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    Flat,
    Ivf { nlist: usize },
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Ivf { nlist } => write!(f, "ivf ({} clusters)", nlist),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Layout {
    Flat,
    Ivf {
        centroids: Vec<Vec<f32>>,
        /// Member positions of each cluster
        lists: Vec<Vec<usize>>,
        nprobe: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    layout: Layout,
}

/// Target cluster count for `n` points
pub fn cluster_count(n: usize, config: &IndexConfig) -> usize {
    config
        .max_clusters
        .min(n / config.min_points_per_cluster.max(1))
}

impl VectorIndex {
    /// Build over `vectors`, choosing flat or IVF by corpus size
    pub fn build(vectors: Vec<Vec<f32>>, config: &IndexConfig) -> Result<Self> {
        let n = vectors.len();
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(RepoLensError::InvalidInput(format!(
                "Vector {} has dimension {}, expected {}",
                bad,
                vectors[bad].len(),
                dimension
            )));
        }

        let nlist = cluster_count(n, config);
        if n < nlist || nlist < 2 {
            tracing::debug!("Using flat index for {} vectors (target {} clusters)", n, nlist);
            return Ok(Self {
                dimension,
                vectors,
                layout: Layout::Flat,
            });
        }

        let result = kmeans_clustering(&vectors, nlist, config.kmeans_iterations);
        let mut lists = vec![Vec::new(); result.centroids.len()];
        for (position, &cluster) in result.assignments.iter().enumerate() {
            lists[cluster].push(position);
        }
        let empty = lists.iter().filter(|l| l.is_empty()).count();
        if empty > 0 {
            tracing::warn!("{} of {} clusters are empty after k-means", empty, lists.len());
        }
        tracing::info!(
            "Built IVF index: {} vectors, {} clusters, {} k-means iterations",
            n,
            lists.len(),
            result.iterations
        );

        Ok(Self {
            dimension,
            vectors,
            layout: Layout::Ivf {
                centroids: result.centroids,
                lists,
                nprobe: config.nprobe.max(1),
            },
        })
    }

    /// Up to `k` nearest positions, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() {
            return Err(RepoLensError::IndexNotReady);
        }
        if query.len() != self.dimension {
            return Err(RepoLensError::EmbeddingFailed(format!(
                "Query vector has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = match &self.layout {
            Layout::Flat => self
                .vectors
                .iter()
                .enumerate()
                .map(|(position, v)| Neighbor {
                    distance: squared_l2(query, v),
                    position,
                })
                .collect(),
            Layout::Ivf {
                centroids,
                lists,
                nprobe,
            } => {
                let mut ranked: Vec<(usize, f32)> = centroids
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i, squared_l2(query, c)))
                    .collect();
                ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

                ranked
                    .iter()
                    .take(*nprobe)
                    .flat_map(|(cluster, _)| lists[*cluster].iter())
                    .map(|&position| Neighbor {
                        distance: squared_l2(query, &self.vectors[position]),
                        position,
                    })
                    .collect()
            }
        };

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Check internal consistency against the expected number of positions
    pub fn validate(&self, expected_len: usize) -> Result<()> {
        if self.vectors.len() != expected_len {
            return Err(RepoLensError::CorruptIndex(format!(
                "Index holds {} vectors but {} chunks were expected",
                self.vectors.len(),
                expected_len
            )));
        }
        if self.vectors.iter().any(|v| v.len() != self.dimension) {
            return Err(RepoLensError::CorruptIndex(
                "Vectors of mixed dimension".to_string(),
            ));
        }

        if let Layout::Ivf {
            centroids, lists, ..
        } = &self.layout
        {
            if centroids.len() != lists.len() || centroids.iter().any(|c| c.len() != self.dimension)
            {
                return Err(RepoLensError::CorruptIndex(
                    "Cluster centroids do not match inverted lists".to_string(),
                ));
            }
            let mut seen = vec![false; expected_len];
            for &position in lists.iter().flatten() {
                match seen.get_mut(position) {
                    Some(slot) if !*slot => *slot = true,
                    _ => {
                        return Err(RepoLensError::CorruptIndex(format!(
                            "Inverted lists reference position {} out of range or twice",
                            position
                        )))
                    }
                }
            }
            if seen.iter().any(|s| !s) {
                return Err(RepoLensError::CorruptIndex(
                    "Inverted lists do not cover every position".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn topology(&self) -> Topology {
        match &self.layout {
            Layout::Flat => Topology::Flat,
            Layout::Ivf { lists, .. } => Topology::Ivf { nlist: lists.len() },
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| vec![(i % 10) as f32, (i / 10) as f32, 1.0])
            .collect()
    }

    fn config() -> IndexConfig {
        IndexConfig::default()
    }

    #[test]
    fn test_cluster_count() {
        let config = config();
        assert_eq!(cluster_count(3, &config), 1);
        assert_eq!(cluster_count(10, &config), 5);
        assert_eq!(cluster_count(1000, &config), 100);
    }

    #[test]
    fn test_small_corpus_is_flat() {
        let index = VectorIndex::build(grid(3), &config()).unwrap();
        assert_eq!(index.topology(), Topology::Flat);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_large_corpus_is_ivf() {
        let index = VectorIndex::build(grid(200), &config()).unwrap();
        assert_eq!(index.topology(), Topology::Ivf { nlist: 100 });
        assert!(index.validate(200).is_ok());
    }

    #[test]
    fn test_flat_search_exact() {
        let index = VectorIndex::build(grid(3), &config()).unwrap();
        let hits = index.search(&[2.0, 0.0, 1.0], 2).unwrap();
        assert_eq!(hits[0], Neighbor { distance: 0.0, position: 2 });
        assert_eq!(hits[1].position, 1);
        assert_eq!(hits[1].distance, 1.0);
    }

    #[test]
    fn test_ivf_finds_exact_match() {
        let vectors = grid(200);
        let index = VectorIndex::build(vectors.clone(), &config()).unwrap();
        for position in [0, 57, 199] {
            let hits = index.search(&vectors[position], 1).unwrap();
            assert_eq!(hits[0].position, position);
            assert_eq!(hits[0].distance, 0.0);
        }
    }

    #[test]
    fn test_search_caps_at_k() {
        let index = VectorIndex::build(grid(50), &config()).unwrap();
        assert!(index.search(&[0.0, 0.0, 1.0], 7).unwrap().len() <= 7);
        assert!(index.search(&[0.0, 0.0, 1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index_not_ready() {
        let index = VectorIndex::build(Vec::new(), &config()).unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(RepoLensError::IndexNotReady)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = VectorIndex::build(grid(3), &config()).unwrap();
        assert!(matches!(
            index.search(&[1.0, 2.0], 1),
            Err(RepoLensError::EmbeddingFailed(_))
        ));

        let err = VectorIndex::build(vec![vec![1.0, 2.0], vec![1.0]], &config()).unwrap_err();
        assert!(matches!(err, RepoLensError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_length_mismatch() {
        let index = VectorIndex::build(grid(3), &config()).unwrap();
        assert!(matches!(
            index.validate(4),
            Err(RepoLensError::CorruptIndex(_))
        ));
    }

    #[test]
    fn test_validate_rejects_broken_lists() {
        let mut index = VectorIndex::build(grid(20), &config()).unwrap();
        if let Layout::Ivf { lists, .. } = &mut index.layout {
            let duplicate = lists.iter().flatten().next().copied().unwrap();
            lists[0].push(duplicate);
        } else {
            panic!("expected IVF layout");
        }
        assert!(matches!(
            index.validate(20),
            Err(RepoLensError::CorruptIndex(_))
        ));
    }

    #[test]
    fn test_topology_display() {
        assert_eq!(Topology::Flat.to_string(), "flat");
        assert_eq!(Topology::Ivf { nlist: 4 }.to_string(), "ivf (4 clusters)");
    }
}
