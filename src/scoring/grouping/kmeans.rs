//! Lloyd's k-means over sparse rows with greedy k-means++ seeding.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use super::tfidf::SparseRow;
use crate::error::ScoreError;

#[derive(Debug, Clone)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iter: usize,
    pub n_init: usize,
    /// Relative to the mean per-feature variance of the data.
    pub tolerance: f64,
    pub seed: Option<u64>,
}

/// Result of the best restart.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub n_iter: usize,
}

type Centroids = Vec<Vec<f64>>;

fn dot(row: &SparseRow, dense: &[f64]) -> f64 {
    row.iter().map(|&(j, w)| w * dense[j]).sum()
}

fn sq_norm_sparse(row: &SparseRow) -> f64 {
    row.iter().map(|(_, w)| w * w).sum()
}

fn sq_norm_dense(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

fn to_dense(row: &SparseRow, n_dims: usize) -> Vec<f64> {
    let mut dense = vec![0.0; n_dims];
    for &(j, w) in row {
        dense[j] = w;
    }
    dense
}

/// Squared euclidean distance, clamped at zero against rounding.
fn sq_dist(row: &SparseRow, row_sq: f64, centroid: &[f64], centroid_sq: f64) -> f64 {
    (row_sq - 2.0 * dot(row, centroid) + centroid_sq).max(0.0)
}

/// Runs `n_init` seeded restarts and keeps the lowest-inertia one.
///
/// # Errors
///
/// [`ScoreError::InvalidInput`] unless `1 <= k <= rows.len()`, or when a row
/// references a term index outside `n_dims`.
pub fn fit(
    rows: &[SparseRow],
    n_dims: usize,
    params: &KMeansParams,
) -> Result<KMeansFit, ScoreError> {
    if params.k == 0 {
        return Err(ScoreError::InvalidInput(
            "k-means needs at least one cluster".to_string(),
        ));
    }
    if rows.len() < params.k {
        return Err(ScoreError::InvalidInput(format!(
            "{} rows cannot form {} clusters",
            rows.len(),
            params.k
        )));
    }
    if rows.iter().flatten().any(|&(j, _)| j >= n_dims) {
        return Err(ScoreError::InvalidInput(format!(
            "row term index out of range for {n_dims} dimensions"
        )));
    }

    let seed = params.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let row_sq: Vec<f64> = rows.iter().map(sq_norm_sparse).collect();
    let tol = params.tolerance * mean_variance(rows, n_dims);

    let mut best: Option<KMeansFit> = None;
    for run in 0..params.n_init.max(1) {
        let init = kmeans_plus_plus(rows, &row_sq, n_dims, params.k, &mut rng);
        let candidate = lloyd(rows, &row_sq, n_dims, init, params.max_iter, tol);
        trace!(run, inertia = candidate.inertia, n_iter = candidate.n_iter, "k-means restart");
        if best
            .as_ref()
            .is_none_or(|b| candidate.inertia < b.inertia)
        {
            best = Some(candidate);
        }
    }

    let best = best.unwrap_or_else(|| KMeansFit {
        labels: vec![0; rows.len()],
        inertia: 0.0,
        n_iter: 0,
    });
    debug!(seed, k = params.k, inertia = best.inertia, n_iter = best.n_iter, "k-means fitted");
    Ok(best)
}

fn mean_variance(rows: &[SparseRow], n_dims: usize) -> f64 {
    if rows.is_empty() || n_dims == 0 {
        return 0.0;
    }
    let n = rows.len() as f64;
    let mut sum = vec![0.0; n_dims];
    let mut sum_sq = vec![0.0; n_dims];
    for row in rows {
        for &(j, w) in row {
            sum[j] += w;
            sum_sq[j] += w * w;
        }
    }
    let total: f64 = sum
        .iter()
        .zip(&sum_sq)
        .map(|(s, sq)| sq / n - (s / n).powi(2))
        .sum();
    total / n_dims as f64
}

/// Draws an index with probability proportional to `weights`.
fn sample_weighted(weights: &[f64], total: f64, rng: &mut ChaCha20Rng) -> usize {
    if total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }
    let target = rng.gen_range(0.0..total);
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if acc > target {
            return i;
        }
    }
    weights.len() - 1
}

/// Greedy k-means++: each new centre is the best of `2 + ln k` D²-weighted draws.
fn kmeans_plus_plus(
    rows: &[SparseRow],
    row_sq: &[f64],
    n_dims: usize,
    k: usize,
    rng: &mut ChaCha20Rng,
) -> Centroids {
    let n = rows.len();
    let trials = 2 + (k as f64).ln().floor() as usize;

    let distances_to = |idx: usize| -> Vec<f64> {
        let centre = to_dense(&rows[idx], n_dims);
        let centre_sq = row_sq[idx];
        rows.iter()
            .zip(row_sq)
            .map(|(r, &sq)| sq_dist(r, sq, &centre, centre_sq))
            .collect()
    };

    let first = rng.gen_range(0..n);
    let mut centres = vec![first];
    let mut closest = distances_to(first);

    while centres.len() < k {
        let potential: f64 = closest.iter().sum();
        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for _ in 0..trials {
            let candidate = sample_weighted(&closest, potential, rng);
            let merged: Vec<f64> = distances_to(candidate)
                .into_iter()
                .zip(&closest)
                .map(|(d, &c)| d.min(c))
                .collect();
            let merged_potential: f64 = merged.iter().sum();
            if best.as_ref().is_none_or(|(_, p, _)| merged_potential < *p) {
                best = Some((candidate, merged_potential, merged));
            }
        }
        if let Some((idx, _, merged)) = best {
            centres.push(idx);
            closest = merged;
        }
    }

    centres
        .into_iter()
        .map(|idx| to_dense(&rows[idx], n_dims))
        .collect()
}

fn lloyd(
    rows: &[SparseRow],
    row_sq: &[f64],
    n_dims: usize,
    mut centroids: Centroids,
    max_iter: usize,
    tol: f64,
) -> KMeansFit {
    let k = centroids.len();
    let mut labels: Vec<usize> = Vec::new();
    let mut n_iter = 0;

    for iter in 1..=max_iter.max(1) {
        n_iter = iter;
        let centroid_sq: Vec<f64> = centroids.iter().map(|c| sq_norm_dense(c)).collect();

        let mut new_labels = Vec::with_capacity(rows.len());
        let mut distances = Vec::with_capacity(rows.len());
        for (row, &sq) in rows.iter().zip(row_sq) {
            let (label, dist) = centroids
                .iter()
                .zip(&centroid_sq)
                .map(|(c, &csq)| sq_dist(row, sq, c, csq))
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (j, d)| if d < acc.1 { (j, d) } else { acc });
            new_labels.push(label);
            distances.push(dist);
        }
        relocate_empty_clusters(&mut new_labels, &distances, k);

        let new_centroids = recompute_centroids(rows, &new_labels, &centroids, n_dims);
        let shift: f64 = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>())
            .sum();

        let converged = new_labels == labels || shift <= tol;
        labels = new_labels;
        centroids = new_centroids;
        if converged {
            break;
        }
    }

    let inertia = rows
        .iter()
        .zip(row_sq)
        .zip(&labels)
        .map(|((row, &sq), &l)| sq_dist(row, sq, &centroids[l], sq_norm_dense(&centroids[l])))
        .sum();

    KMeansFit {
        labels,
        inertia,
        n_iter,
    }
}

/// Gives every empty cluster the farthest point of a cluster that can spare one.
fn relocate_empty_clusters(labels: &mut [usize], distances: &[f64], k: usize) {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }
    if counts.iter().all(|&c| c > 0) {
        return;
    }

    let mut by_distance: Vec<usize> = (0..labels.len()).collect();
    by_distance.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
    let mut donors = by_distance.into_iter();

    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        for i in donors.by_ref() {
            let from = labels[i];
            if counts[from] > 1 {
                counts[from] -= 1;
                counts[cluster] = 1;
                labels[i] = cluster;
                break;
            }
        }
    }
}

fn recompute_centroids(
    rows: &[SparseRow],
    labels: &[usize],
    previous: &Centroids,
    n_dims: usize,
) -> Centroids {
    let k = previous.len();
    let mut sums = vec![vec![0.0; n_dims]; k];
    let mut counts = vec![0usize; k];
    for (row, &l) in rows.iter().zip(labels) {
        counts[l] += 1;
        for &(j, w) in row {
            sums[l][j] += w;
        }
    }
    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}
