//! Peer-group clustering of companies from their descriptions.
//!
//! Descriptions are turned into TF-IDF vectors and partitioned with k-means.
//! The result is one label in `[0, k)` per description, in input order.

pub mod kmeans;
pub mod stopwords;
pub mod tfidf;

use tracing::info;

use crate::error::ScoreError;
use kmeans::KMeansParams;

/// Number of peer groups when nothing else is configured.
pub const DEFAULT_GROUPS: usize = 20;

#[derive(Debug, Clone)]
pub struct GroupingParams {
    pub n_groups: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub tolerance: f64,
    /// Fixes the clustering for reproducible runs. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GroupingParams {
    fn default() -> Self {
        Self {
            n_groups: DEFAULT_GROUPS,
            max_iter: 200,
            n_init: 10,
            tolerance: 1e-4,
            seed: None,
        }
    }
}

/// Assigns a peer group to every description.
///
/// # Errors
///
/// [`ScoreError::InvalidInput`] when there are no descriptions, zero groups
/// are requested, or fewer descriptions than groups.
#[tracing::instrument(skip_all, fields(n = descriptions.len(), k = params.n_groups))]
pub fn group_descriptions<S: AsRef<str>>(
    descriptions: &[S],
    params: &GroupingParams,
) -> Result<Vec<usize>, ScoreError> {
    if descriptions.is_empty() {
        return Err(ScoreError::InvalidInput(
            "no descriptions to group".to_string(),
        ));
    }
    if params.n_groups == 0 {
        return Err(ScoreError::InvalidInput(
            "number of groups must be at least 1".to_string(),
        ));
    }
    if descriptions.len() < params.n_groups {
        return Err(ScoreError::InvalidInput(format!(
            "{} descriptions cannot form {} groups",
            descriptions.len(),
            params.n_groups
        )));
    }

    let matrix = tfidf::vectorize(descriptions);
    info!(terms = matrix.n_terms(), "Descriptions vectorized");

    let fit = kmeans::fit(
        &matrix.rows,
        matrix.n_terms(),
        &KMeansParams {
            k: params.n_groups,
            max_iter: params.max_iter,
            n_init: params.n_init,
            tolerance: params.tolerance,
            seed: params.seed,
        },
    )?;
    Ok(fit.labels)
}
