//! Overlap graph and greedy blend-order estimation.
//!
//! Each image's canvas ROI is known analytically before any pixel work, so
//! the graph is built from rectangle intersections alone. The visiting
//! order is greedy: always place next the image sharing the most canvas
//! area with what is already placed, which keeps seams short. Images with
//! no connection start a new component; components never blend into each
//! other since they share no pixels.

use crate::canvas::CanvasRect;

/// Pairwise canvas-overlap graph over the used images.
///
/// Vertices are positions in the `rois` slice handed to
/// [`OverlapGraph::from_rois`]; edge weights count overlapping canvas
/// pixels. Built once per stitch, immutable afterwards.
#[derive(Debug, Clone)]
pub struct OverlapGraph {
    n: usize,
    weights: Vec<u64>,
}

impl OverlapGraph {
    /// Build the graph from per-image canvas ROIs.
    pub fn from_rois(rois: &[CanvasRect]) -> Self {
        let n = rois.len();
        let mut weights = vec![0u64; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let w = rois[i].intersect(&rois[j]).area();
                weights[i * n + j] = w;
                weights[j * n + i] = w;
            }
        }
        Self { n, weights }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Overlap pixel count between two images.
    pub fn weight(&self, i: usize, j: usize) -> u64 {
        self.weights[i * self.n + j]
    }

    /// Total overlap of `i` against all other images.
    pub fn total_weight(&self, i: usize) -> u64 {
        (0..self.n).map(|j| self.weight(i, j)).sum()
    }
}

/// Result of blend-order estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendOrder {
    /// Visiting order over graph vertex indices.
    pub order: Vec<usize>,
    /// Connected components, in placement order, each listing its vertices
    /// in placement order.
    pub components: Vec<Vec<usize>>,
}

/// Greedy placement: seed with the best-connected image, then repeatedly
/// add the unplaced image with the largest overlap against the placed set.
/// Not globally optimal, but each new image maximizes shared boundary.
pub fn estimate_order(graph: &OverlapGraph) -> BlendOrder {
    let n = graph.len();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut components: Vec<Vec<usize>> = Vec::new();

    while order.len() < n {
        // Start a component at the unplaced image with the largest total
        // overlap (ties break toward the lower index for determinism).
        let seed = (0..n)
            .filter(|&i| !placed[i])
            .max_by_key(|&i| (graph.total_weight(i), std::cmp::Reverse(i)))
            .expect("unplaced vertex exists");
        placed[seed] = true;
        order.push(seed);
        let mut component = vec![seed];

        loop {
            let mut best: Option<(u64, usize)> = None;
            for i in (0..n).filter(|&i| !placed[i]) {
                let w: u64 = component.iter().map(|&j| graph.weight(i, j)).sum();
                let better = match best {
                    None => true,
                    Some((bw, bi)) => w > bw || (w == bw && i < bi),
                };
                if better {
                    best = Some((w, i));
                }
            }
            match best {
                Some((w, i)) if w > 0 => {
                    placed[i] = true;
                    order.push(i);
                    component.push(i);
                }
                _ => break,
            }
        }
        components.push(component);
    }

    BlendOrder { order, components }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: u32, w: u32) -> CanvasRect {
        CanvasRect::new(x, 0, w, 100)
    }

    #[test]
    fn chain_is_placed_by_shared_overlap() {
        // Three images in a row: 0-1 overlap strongly, 1-2 weakly.
        let graph = OverlapGraph::from_rois(&[rect(0, 100), rect(60, 100), rect(150, 100)]);
        assert_eq!(graph.weight(0, 1), 40 * 100);
        assert_eq!(graph.weight(1, 2), 10 * 100);
        assert_eq!(graph.weight(0, 2), 0);

        let est = estimate_order(&graph);
        assert_eq!(est.order, vec![1, 0, 2]);
        assert_eq!(est.components.len(), 1);
    }

    #[test]
    fn disjoint_images_form_separate_components() {
        let graph = OverlapGraph::from_rois(&[rect(0, 50), rect(200, 50), rect(20, 50)]);
        let est = estimate_order(&graph);
        assert_eq!(est.components.len(), 2);
        assert!(est.components.iter().any(|c| c == &vec![1]));
        assert_eq!(est.order.len(), 3);
    }

    #[test]
    fn single_image_is_its_own_component() {
        let graph = OverlapGraph::from_rois(&[rect(0, 10)]);
        let est = estimate_order(&graph);
        assert_eq!(est.order, vec![0]);
        assert_eq!(est.components, vec![vec![0]]);
    }
}
