use crate::error::GraphError;
use crate::graph::node::Node;

/*
Routes
======

A route is the weight matrix sitting on one edge of the graph. It maps a
source node's outputs onto a target node's inputs:

    target.input[j] += source.output[i] * weight[i][j]

Rows are source channels, columns are target channels. Weights are integers,
so a route selects, duplicates, sums or inverts channels; scaling belongs in
a gain node.

Default Topologies
------------------

    sizes equal       identity            mono->mono, stereo->stereo
    sizes differ      all ones            mono->stereo fan-out,
                                          stereo->mono sum,
                                          3->2 full mix

    1 -> 2:   [ 1 1 ]          2 -> 2:   [ 1 0 ]
                                         [ 0 1 ]
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    source_size: usize,
    target_size: usize,
    /// Row-major, `source_size` rows of `target_size` weights.
    weights: Box<[i32]>,
}

impl Route {
    /// Default route between buffers of the given sizes.
    pub fn new(source_size: usize, target_size: usize) -> Self {
        let weights = (0..source_size * target_size)
            .map(|k| {
                if source_size == target_size {
                    let (i, j) = (k / target_size, k % target_size);
                    i32::from(i == j)
                } else {
                    1
                }
            })
            .collect();

        Self {
            source_size,
            target_size,
            weights,
        }
    }

    /// Default route shaped for `source.outputs -> target.inputs`.
    pub fn between(source: &Node, target: &Node) -> Self {
        Self::new(source.output_size(), target.input_size())
    }

    /// Route from explicit rows, one row per source channel.
    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self, GraphError> {
        let weights = flatten(rows)?;
        let source_size = rows.len();
        let target_size = weights.len() / source_size;
        Ok(Self {
            source_size,
            target_size,
            weights,
        })
    }

    pub fn source_size(&self) -> usize {
        self.source_size
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Weight from source channel `i` to target channel `j`.
    pub fn weight(&self, i: usize, j: usize) -> Option<i32> {
        if i < self.source_size && j < self.target_size {
            Some(self.weights[i * self.target_size + j])
        } else {
            None
        }
    }

    /// Replace every weight. The new matrix must keep the route's shape.
    pub fn replace_weights<R: AsRef<[i32]>>(&mut self, rows: &[R]) -> Result<(), GraphError> {
        if rows.len() != self.source_size
            || rows.iter().any(|row| row.as_ref().len() != self.target_size)
        {
            return Err(GraphError::MalformedRoute(format!(
                "expected {}x{} weights",
                self.source_size, self.target_size
            )));
        }
        self.weights = rows
            .iter()
            .flat_map(|row| row.as_ref().iter().copied())
            .collect();
        Ok(())
    }

    /// Whether the route fits `source.outputs -> target.inputs`.
    pub fn fits(&self, source_outputs: usize, target_inputs: usize) -> bool {
        self.source_size == source_outputs && self.target_size == target_inputs
    }

    /// Accumulate `source` through the weights into `target`.
    #[inline]
    pub fn accumulate(&self, source: &[f32], target: &mut [f32]) {
        debug_assert_eq!(source.len(), self.source_size);
        debug_assert_eq!(target.len(), self.target_size);

        if self.target_size == 0 {
            return;
        }
        for (&x, row) in source.iter().zip(self.weights.chunks_exact(self.target_size)) {
            for (t, &w) in target.iter_mut().zip(row) {
                *t += x * w as f32;
            }
        }
    }
}

fn flatten<R: AsRef<[i32]>>(rows: &[R]) -> Result<Box<[i32]>, GraphError> {
    let width = match rows.first() {
        Some(row) if !row.as_ref().is_empty() => row.as_ref().len(),
        _ => return Err(GraphError::MalformedRoute("route has no weights".into())),
    };
    if let Some(bad) = rows.iter().position(|row| row.as_ref().len() != width) {
        return Err(GraphError::MalformedRoute(format!(
            "row {bad} has {} weights, expected {width}",
            rows[bad].as_ref().len()
        )));
    }
    Ok(rows
        .iter()
        .flat_map(|row| row.as_ref().iter().copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_sizes_default_to_identity() {
        let route = Route::new(3, 3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(route.weight(i, j), Some(i32::from(i == j)));
            }
        }
    }

    #[test]
    fn different_sizes_default_to_full_mix() {
        let fan = Route::new(1, 2);
        assert_eq!(fan.weight(0, 0), Some(1));
        assert_eq!(fan.weight(0, 1), Some(1));

        let sum = Route::new(3, 2);
        assert!((0..3).all(|i| (0..2).all(|j| sum.weight(i, j) == Some(1))));
        assert_eq!(sum.weight(3, 0), None);
    }

    #[test]
    fn accumulate_adds_into_target() {
        let route = Route::from_rows(&[[1, 0], [1, -1]]).unwrap();
        let mut target = [1.0, 1.0];
        route.accumulate(&[0.5, 0.25], &mut target);
        assert_eq!(target, [1.75, 0.75]);
    }

    #[test]
    fn rejects_ragged_and_empty_rows() {
        let ragged: [&[i32]; 2] = [&[1, 0], &[1]];
        assert!(matches!(
            Route::from_rows(&ragged),
            Err(GraphError::MalformedRoute(_))
        ));

        let empty: [[i32; 0]; 0] = [];
        assert!(Route::from_rows(&empty).is_err());
    }

    #[test]
    fn replace_weights_keeps_shape() {
        let mut route = Route::new(2, 2);
        route.replace_weights(&[[0, 1], [1, 0]]).unwrap();
        assert_eq!(route.weight(0, 1), Some(1));
        assert_eq!(route.weight(0, 0), Some(0));

        assert!(route.replace_weights(&[[1, 1, 1]]).is_err());
        assert_eq!(route.weight(0, 1), Some(1));
    }

    #[test]
    fn zero_width_route_is_inert() {
        let route = Route::new(2, 0);
        let mut target: [f32; 0] = [];
        route.accumulate(&[1.0, 2.0], &mut target);
    }
}
