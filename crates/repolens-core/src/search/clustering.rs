//! K-means clustering for the inverted-file index

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Result of a clustering run
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f32>>,
    /// Cluster of each input vector, by position
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

/// Index of the centroid nearest to `vector`
pub fn assign_to_nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_l2(vector, c)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Lloyd's algorithm with evenly spaced seeds, so the same input always
/// yields the same partition. An emptied cluster keeps its previous centroid.
pub fn kmeans_clustering(vectors: &[Vec<f32>], k: usize, max_iterations: usize) -> KMeansResult {
    let n = vectors.len();
    if n == 0 {
        return KMeansResult {
            centroids: Vec::new(),
            assignments: Vec::new(),
            iterations: 0,
        };
    }
    let k = k.clamp(1, n);
    let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

    let mut centroids: Vec<Vec<f32>> = (0..k).map(|i| vectors[i * n / k].clone()).collect();
    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;

    loop {
        iterations += 1;

        let mut changed = false;
        for (slot, vector) in assignments.iter_mut().zip(vectors) {
            let nearest = assign_to_nearest_centroid(vector, &centroids);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }
        // assignments always reflect the final centroids
        if !changed || iterations >= max_iterations.max(1) {
            break;
        }

        let mut sums = vec![vec![0.0f32; dimension]; k];
        let mut counts = vec![0usize; k];
        for (vector, &cluster) in vectors.iter().zip(&assignments) {
            counts[cluster] += 1;
            for (sum, x) in sums[cluster].iter_mut().zip(vector) {
                *sum += x;
            }
        }
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum.into_iter().map(|s| s / count as f32).collect();
            }
        }
    }

    KMeansResult {
        centroids,
        assignments,
        iterations,
    }
}
