//! Random-permutation baseline for tensor-train contraction orders.
//!
//! An instance is an `[S, S]` matrix whose diagonal holds the bond sizes of
//! the train's cores and whose off-diagonal entries hold the sizes of the
//! bonds between neighbours. Nodes are 1-based; rows `0` and `n + 1` are the
//! open boundaries, so `S >= n + 2`. Merge step `i` (0-based) contracts the
//! span holding node `i + 1` with the span holding node `i + 2`.

use crate::config::ContractionConfig;
use crate::consts::{RECORD_COSTS_FILE, RECORD_PERMUTATIONS_FILE};
use crate::error::{Error, Result};
use crate::utils::stop::StopFlag;
use ndarray::{Array3, ArrayView2, Axis};
use ndarray_npy::{ReadNpyError, read_npy};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::info;

/// Every sampled order of one instance plus the cheapest of them.
#[derive(Clone, Debug, Serialize)]
pub struct InstanceRecord {
    pub costs: Vec<f64>,
    pub permutations: Vec<Vec<usize>>,
    pub best_cost: f64,
    pub best_permutation: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct BaselineReport {
    pub instances: Vec<InstanceRecord>,
}

impl BaselineReport {
    /// Mean over instances of the best cost found.
    pub fn mean_best_cost(&self) -> f64 {
        if self.instances.is_empty() {
            return f64::NAN;
        }
        self.instances.iter().map(|r| r.best_cost).sum::<f64>() / self.instances.len() as f64
    }

    /// Writes all costs and all permutations as two JSON arrays indexed by instance.
    pub fn write_records(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let costs: Vec<&[f64]> = self.instances.iter().map(|r| r.costs.as_slice()).collect();
        let permutations: Vec<&[Vec<usize>]> = self
            .instances
            .iter()
            .map(|r| r.permutations.as_slice())
            .collect();

        let costs_path = dir.join(RECORD_COSTS_FILE);
        serde_json::to_writer(BufWriter::new(File::create(&costs_path)?), &costs)?;

        let permutations_path = dir.join(RECORD_PERMUTATIONS_FILE);
        serde_json::to_writer(BufWriter::new(File::create(&permutations_path)?), &permutations)?;

        Ok((costs_path, permutations_path))
    }
}

/// Loads a `[num_instances, S, S]` array of instances.
pub fn load_instances(path: impl AsRef<Path>) -> Result<Array3<f32>> {
    let path = path.as_ref();
    let npy_error = |source| Error::Npy {
        path: path.to_path_buf(),
        source,
    };

    match read_npy::<_, Array3<f32>>(path) {
        Ok(instances) => Ok(instances),
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(read_npy::<_, Array3<f64>>(path)
            .map_err(npy_error)?
            .mapv(|x| x as f32)),
        Err(e) => Err(npy_error(e)),
    }
}

/// Cost of contracting a length-`n` train in the given order of merge steps.
///
/// Each step pays the product of the two spans' core sizes times their outer
/// bonds, divided by the bond the two spans share; afterwards every node in
/// the union points at the merged span.
pub fn contraction_cost(state: ArrayView2<f32>, n: usize, permutation: &[usize]) -> f64 {
    let s = |row: usize, col: usize| f64::from(state[[row, col]]);
    let span_cost = |start: usize, end: usize| -> f64 {
        (start..=end)
            .map(|j| s(j, j) * s(j, start - 1) * s(end + 1, j))
            .product()
    };

    let mut start: Vec<usize> = (1..=n).collect();
    let mut end = start.clone();
    let mut cost = 0.0;

    for &i in permutation {
        let shared = s(start[i + 1], start[i + 1] - 1);
        cost += span_cost(start[i], end[i]) * span_cost(start[i + 1], end[i + 1]) / shared;

        let merged_start = start[i].min(start[i + 1]);
        let merged_end = end[i].max(end[i + 1]);
        for node in merged_start..=merged_end {
            start[node - 1] = merged_start;
            end[node - 1] = merged_end;
        }
    }

    cost
}

fn validate(instances: &Array3<f32>, n: usize) -> Result<()> {
    let (_, rows, cols) = instances.dim();
    if n < 2 {
        return Err(Error::InvalidConfig(format!("need at least 2 cores, got {n}")));
    }
    if rows != cols || rows < n + 2 {
        return Err(Error::InvalidInstance(format!(
            "instances are {rows}x{cols}, need square of at least {}",
            n + 2
        )));
    }
    Ok(())
}

/// Samples `num_samples` uniform merge orders per instance.
///
/// A raised `stop` ends the run after the current instance.
pub fn run_baseline<R: Rng>(
    instances: &Array3<f32>,
    config: &ContractionConfig,
    rng: &mut R,
    stop: &StopFlag,
) -> Result<BaselineReport> {
    validate(instances, config.n)?;

    let mut records = Vec::with_capacity(instances.len_of(Axis(0)));
    for (index, state) in instances.axis_iter(Axis(0)).enumerate() {
        if stop.is_requested() {
            tracing::warn!(index, "stop requested, skipping remaining instances");
            break;
        }

        let mut costs = Vec::with_capacity(config.num_samples);
        let mut permutations = Vec::with_capacity(config.num_samples);
        let mut best: Option<(f64, usize)> = None;

        for sample in 0..config.num_samples {
            let mut permutation: Vec<usize> = (0..config.n - 1).collect();
            permutation.shuffle(rng);

            let cost = contraction_cost(state, config.n, &permutation);
            if best.is_none_or(|(best_cost, _)| cost < best_cost) {
                best = Some((cost, sample));
            }
            costs.push(cost);
            permutations.push(permutation);
        }

        let (best_cost, best_permutation) = match best {
            Some((cost, sample)) => (cost, permutations[sample].clone()),
            None => (f64::INFINITY, Vec::new()),
        };
        info!(instance = index, best_cost, ?best_permutation, "baseline");

        records.push(InstanceRecord {
            costs,
            permutations,
            best_cost,
            best_permutation,
        });
    }

    let report = BaselineReport { instances: records };
    info!(mean_best_cost = report.mean_best_cost(), "random baseline finished");
    Ok(report)
}
