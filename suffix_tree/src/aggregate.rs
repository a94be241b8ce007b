use std::collections::HashSet;

/// A capability implemented by anything that can answer substring
/// membership queries over a set of inserted ids.
///
/// [`crate::GeneralizedSuffixTree`] implements this directly. Callers that
/// shard their data across several trees can combine them with
/// [`CombinedSearchTree`] without this crate needing to know anything
/// about sharding, ranking, or persistence.
pub trait SearchTree {
    fn search(&self, query: &str) -> HashSet<u64>;
}

/// A trivial union over several independent [`SearchTree`]s.
///
/// This is deliberately thin: no ranking, no de-duplication beyond the
/// set union, no persistence. It exists only so that the `search_tree`
/// capability described in the external interface is a real, working
/// trait object rather than a documented-but-unimplemented idea.
#[derive(Default)]
pub struct CombinedSearchTree {
    trees: Vec<Box<dyn SearchTree>>,
}

impl CombinedSearchTree {
    pub fn new() -> Self {
        Self { trees: Vec::new() }
    }

    pub fn add(&mut self, tree: Box<dyn SearchTree>) {
        self.trees.push(tree);
    }
}

impl SearchTree for CombinedSearchTree {
    fn search(&self, query: &str) -> HashSet<u64> {
        let mut acc = HashSet::new();
        for tree in &self.trees {
            acc.extend(tree.search(query));
        }
        acc
    }
}
