//! Disjoint-set forest over dense integer indices.
//!
//! Array-backed: `parent`, `rank` and `size` are indexed by element. `find`
//! is iterative (locate the root, then re-point the walked path) so its
//! stack use does not grow with the image size.

use crate::error::ForestError;

#[derive(Debug, Clone)]
pub struct DisjointSetForest {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
}

impl DisjointSetForest {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn check(&self, x: usize) -> Result<(), ForestError> {
        if x < self.parent.len() {
            Ok(())
        } else {
            Err(ForestError::IndexOutOfRange {
                index: x,
                len: self.parent.len(),
            })
        }
    }

    /// Root of the set containing `x`, compressing the walked path.
    pub fn find(&mut self, x: usize) -> Result<usize, ForestError> {
        self.check(x)?;

        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while node != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        Ok(root)
    }

    /// Merge the sets containing `x` and `y`.
    ///
    /// The lower-rank root goes under the higher-rank root. On a tie `y`'s
    /// root is attached under `x`'s root and `x`'s root gains a rank.
    pub fn union(&mut self, x: usize, y: usize) -> Result<(), ForestError> {
        let root_x = self.find(x)?;
        let root_y = self.find(y)?;
        if root_x == root_y {
            return Ok(());
        }

        let (keep, absorb) = match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => (root_y, root_x),
            std::cmp::Ordering::Greater => (root_x, root_y),
            std::cmp::Ordering::Equal => {
                self.rank[root_x] += 1;
                (root_x, root_y)
            }
        };

        self.parent[absorb] = keep;
        self.size[keep] += self.size[absorb];
        Ok(())
    }

    /// Number of elements in the set containing `x`.
    pub fn size(&mut self, x: usize) -> Result<usize, ForestError> {
        let root = self.find(x)?;
        Ok(self.size[root])
    }

    pub fn connected(&mut self, x: usize, y: usize) -> Result<bool, ForestError> {
        Ok(self.find(x)? == self.find(y)?)
    }

    /// Number of disjoint sets.
    pub fn count_sets(&self) -> usize {
        self.parent
            .iter()
            .enumerate()
            .filter(|&(i, &p)| i == p)
            .count()
    }

    /// Every current root index, ascending.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.parent
            .iter()
            .enumerate()
            .filter(|&(i, &p)| i == p)
            .map(|(i, _)| i)
    }
}
