//! CART regression tree
//!
//! Splits minimise the summed squared error of the two children. Nodes live in
//! a flat arena and children always sit after their parent, which is what
//! `is_well_formed` checks on trees read back from disk.

use serde::{Deserialize, Serialize};

/// Squared-error improvements below this are treated as no improvement
const MIN_IMPROVEMENT: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    children_sse: f64,
}

struct Builder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    params: &'a TreeParams,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Fit on the rows listed in `sample` (repeats allowed, as in a bootstrap).
    ///
    /// Returns the tree and the squared-error decrease credited to each feature.
    pub fn fit(features: &[Vec<f64>], targets: &[f64], sample: &[usize], params: &TreeParams) -> (Self, Vec<f64>) {
        let n_features = features.first().map_or(0, Vec::len);
        let mut builder = Builder {
            features,
            targets,
            params,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };

        let mut sample = sample.to_vec();
        if sample.is_empty() {
            builder.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            builder.grow(&mut sample, 0);
        }

        (Self { nodes: builder.nodes }, builder.importances)
    }

    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                Node::Leaf { value } => return Some(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if *row.get(*feature)? <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        if self.is_well_formed(usize::MAX) {
            walk(&self.nodes, 0)
        } else {
            0
        }
    }

    /// Children point forward and stay in bounds; split features are below `n_features`.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left > idx
                        && *right > idx
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

impl Builder<'_> {
    fn grow(&mut self, sample: &mut [usize], depth: usize) -> usize {
        let n = sample.len() as f64;
        let (sum, sum_sq) = sample.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = self.targets[i];
            (s + y, sq + y * y)
        });
        let mean = sum / n;
        let sse = (sum_sq - sum * sum / n).max(0.0);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.params.max_depth || sample.len() < self.params.min_samples_split || sse <= MIN_IMPROVEMENT {
            return idx;
        }
        let Some(split) = self.best_split(sample, sse) else {
            return idx;
        };

        let features = self.features;
        let mid = partition(sample, |row| features[row][split.feature] <= split.threshold);
        self.importances[split.feature] += sse - split.children_sse;

        let (left_rows, right_rows) = sample.split_at_mut(mid);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    /// Exhaustive search over every feature and every gap between sorted values
    fn best_split(&self, sample: &[usize], parent_sse: f64) -> Option<SplitCandidate> {
        let n = sample.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..self.importances.len() {
            column.clear();
            column.extend(sample.iter().map(|&i| (self.features[i][feature], self.targets[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (total, total_sq) = column.iter().fold((0.0, 0.0), |(s, sq), &(_, y)| (s + y, sq + y * y));
            let (mut left_sum, mut left_sq) = (0.0, 0.0);

            for i in 0..n - 1 {
                let (x, y) = column[i];
                left_sum += y;
                left_sq += y * y;

                let next_x = column[i + 1].0;
                let left_n = (i + 1) as f64;
                let right_n = (n - i - 1) as f64;
                if x == next_x || i + 1 < min_leaf || n - i - 1 < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let children_sse = (left_sq - left_sum * left_sum / left_n) + (right_sq - right_sum * right_sum / right_n);

                if best.as_ref().map_or(true, |b| children_sse < b.children_sse) {
                    let mut threshold = (x + next_x) / 2.0;
                    if threshold >= next_x {
                        threshold = x;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        children_sse,
                    });
                }
            }
        }

        best.filter(|b| b.children_sse < parent_sse - MIN_IMPROVEMENT)
    }
}

/// Move rows satisfying `goes_left` to the front; returns how many moved.
fn partition(sample: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..sample.len() {
        if goes_left(sample[i]) {
            sample.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: TreeParams = TreeParams {
        max_depth: 10,
        min_samples_split: 2,
        min_samples_leaf: 1,
    };

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Second column is noise; the target steps on the first
        let features = (0..10).map(|i| vec![i as f64, ((i * 7) % 5) as f64]).collect();
        let targets = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        (features, targets)
    }

    #[test]
    fn test_learns_a_step() {
        let (features, targets) = step_data();
        let sample: Vec<usize> = (0..10).collect();
        let (tree, importances) = RegressionTree::fit(&features, &targets, &sample, &PARAMS);

        assert_eq!(tree.depth(), 1);
        assert_relative_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 1.0);
        assert_relative_eq!(tree.predict(&[7.0, 0.0]).unwrap(), 3.0);
        // Split sits halfway between 4 and 5
        assert_relative_eq!(tree.predict(&[4.4, 0.0]).unwrap(), 1.0);
        assert_relative_eq!(tree.predict(&[4.6, 0.0]).unwrap(), 3.0);

        // Total SSE of the root is 10; all of it is explained by feature 0
        assert_relative_eq!(importances[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![2.5; 3];
        let (tree, _) = RegressionTree::fit(&features, &targets, &[0, 1, 2], &PARAMS);
        assert_eq!(tree.depth(), 0);
        assert_relative_eq!(tree.predict(&[100.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_depth_and_split_limits() {
        let (features, targets) = step_data();
        let sample: Vec<usize> = (0..10).collect();

        let stump = TreeParams { max_depth: 0, ..PARAMS };
        let (tree, _) = RegressionTree::fit(&features, &targets, &sample, &stump);
        assert_relative_eq!(tree.predict(&[0.0, 0.0]).unwrap(), 2.0);

        let picky = TreeParams { min_samples_split: 11, ..PARAMS };
        let (tree, _) = RegressionTree::fit(&features, &targets, &sample, &picky);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_short_row_has_no_prediction() {
        let (features, targets) = step_data();
        let (tree, _) = RegressionTree::fit(&features, &targets, &[0, 9], &PARAMS);
        assert!(tree.predict(&[]).is_none());
    }

    #[test]
    fn test_malformed_tree_detected() {
        let looping = RegressionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(!looping.is_well_formed(1));
        assert!(!RegressionTree { nodes: Vec::new() }.is_well_formed(1));

        let (features, targets) = step_data();
        let (tree, _) = RegressionTree::fit(&features, &targets, &[0, 9], &PARAMS);
        assert!(tree.is_well_formed(2));
        assert!(!tree.is_well_formed(0));
    }
}
