use crate::error::{Error, Result};
use burn::tensor::{Tensor, TensorData, backend::Backend};
use ndarray::Array2;
use ndarray_npy::{ReadNpyError, read_npy};
use rand::Rng;
use std::{fs, path::Path};

/// Dense, symmetric, zero-diagonal weight matrix of an undirected graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Adjacency {
    n: usize,
    weights: Vec<f32>,
}

impl Adjacency {
    /// Validates and wraps a row-major `n x n` matrix.
    pub fn from_dense(n: usize, weights: Vec<f32>) -> Result<Self> {
        if weights.len() != n * n {
            return Err(Error::InvalidGraph(format!(
                "expected {} weights for {n} nodes, got {}",
                n * n,
                weights.len()
            )));
        }

        for i in 0..n {
            if weights[i * n + i] != 0.0 {
                return Err(Error::InvalidGraph(format!("non-zero diagonal at node {i}")));
            }
            for j in (i + 1)..n {
                if weights[i * n + j] != weights[j * n + i] {
                    return Err(Error::InvalidGraph(format!(
                        "asymmetric weight between {i} and {j}"
                    )));
                }
            }
        }

        Ok(Self { n, weights })
    }

    /// Random graph: every upper-triangle edge is kept with probability
    /// `sparsity` and gets a uniform weight in `[0, 1)`.
    pub fn generate_symmetric<R: Rng>(n: usize, sparsity: f64, rng: &mut R) -> Result<Self> {
        if !(0.0..=1.0).contains(&sparsity) {
            return Err(Error::InvalidConfig(format!(
                "edge probability must be in [0, 1], got {sparsity}"
            )));
        }

        let mut weights = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let weight: f32 = rng.random();
                if rng.random_bool(sparsity) {
                    weights[i * n + j] = weight;
                    weights[j * n + i] = weight;
                }
            }
        }
        Ok(Self { n, weights })
    }

    pub fn num_nodes(&self) -> usize {
        self.n
    }

    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.weights.clone(), [self.n, self.n]),
            device,
        )
    }
}

/// Loads a graph from a `.npy` matrix or, for any other extension, a Gset edge list.
pub fn load_graph(path: impl AsRef<Path>) -> Result<Adjacency> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("npy") => load_npy(path),
        _ => parse_gset(&fs::read_to_string(path)?),
    }
}

fn load_npy(path: &Path) -> Result<Adjacency> {
    let npy_error = |source| Error::Npy {
        path: path.to_path_buf(),
        source,
    };

    // np.save keeps whatever dtype the generator produced.
    let matrix: Array2<f32> = match read_npy::<_, Array2<f32>>(path) {
        Ok(matrix) => matrix,
        Err(ReadNpyError::WrongDescriptor(_)) => match read_npy::<_, Array2<f64>>(path) {
            Ok(matrix) => matrix.mapv(|w| w as f32),
            Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, Array2<i64>>(path)
                .map_err(npy_error)?
                .mapv(|w| w as f32),
            Err(e) => return Err(npy_error(e)),
        },
        Err(e) => return Err(npy_error(e)),
    };

    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(Error::InvalidGraph(format!(
            "adjacency matrix is {rows}x{cols}, expected square"
        )));
    }

    Adjacency::from_dense(rows, matrix.iter().copied().collect())
}

/// Parses the Gset format: an `n m` header followed by `u v w` lines with 1-based nodes.
pub fn parse_gset(text: &str) -> Result<Adjacency> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::InvalidGraph("empty edge list".to_owned()))?;
    let mut fields = header.split_whitespace().map(str::parse::<usize>);
    let (n, m) = match (fields.next(), fields.next()) {
        (Some(Ok(n)), Some(Ok(m))) => (n, m),
        _ => return Err(Error::InvalidGraph(format!("bad header {header:?}"))),
    };

    let mut weights = vec![0.0; n * n];
    let mut edges = 0;
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [u, v, w] = fields[..] else {
            return Err(Error::InvalidGraph(format!("bad edge line {line:?}")));
        };
        let parse_node = |s: &str| -> Result<usize> {
            match s.parse::<usize>() {
                Ok(node) if (1..=n).contains(&node) => Ok(node - 1),
                _ => Err(Error::InvalidGraph(format!("bad node {s:?} in {line:?}"))),
            }
        };
        let (u, v) = (parse_node(u)?, parse_node(v)?);
        if u == v {
            return Err(Error::InvalidGraph(format!("self loop on node {}", u + 1)));
        }
        let w: f32 = w
            .parse()
            .map_err(|_| Error::InvalidGraph(format!("bad weight in {line:?}")))?;

        weights[u * n + v] = w;
        weights[v * n + u] = w;
        edges += 1;
    }

    if edges != m {
        tracing::warn!(expected = m, found = edges, "edge count differs from header");
    }

    Adjacency::from_dense(n, weights)
}

#[cfg(test)]
impl Adjacency {
    pub fn weight(&self, i: usize, j: usize) -> f32 {
        self.weights[i * self.n + j]
    }

    /// Same graph with nodes relabelled so that new node `i` is old node `perm[i]`.
    pub fn permuted(&self, perm: &[usize]) -> Self {
        let n = self.n;
        let mut weights = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                weights[i * n + j] = self.weight(perm[i], perm[j]);
            }
        }
        Self { n, weights }
    }

    /// Textbook cut value: total weight of edges from the `true` side to the `false` side.
    pub fn classical_cut(&self, assignment: &[bool]) -> f32 {
        let mut cut = 0.0;
        for i in 0..self.n {
            for j in 0..self.n {
                if assignment[i] && !assignment[j] {
                    cut += self.weight(i, j);
                }
            }
        }
        cut
    }
}
