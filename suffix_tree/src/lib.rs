//! A generalized suffix tree: an in-memory index over (string, id) pairs
//! answering, for any query string, the set of ids whose string contains
//! the query as a substring.
//!
//! Construction is Ukkonen's on-line algorithm, generalized to several
//! strings by reusing branches a later key walks into and by propagating
//! payload ids along suffix links (see [`GeneralizedSuffixTree::put`]).
//! Search is O(|query|) plus the cost of enumerating the matched subtree.
//!
//! The tree is single-writer: `put` and `search` are not meant to be
//! interleaved from different threads without external synchronization.

pub mod aggregate;
pub mod error;
pub mod types;

use std::collections::HashSet;

pub use aggregate::{CombinedSearchTree, SearchTree};
pub use error::GstError;
use crate::types::{Edge, Node, NodeId, ROOT};

/// An in-memory generalized suffix tree.
///
/// All nodes live in a single arena (`nodes`); edges and suffix links are
/// non-owning [`NodeId`] indices into it. Nodes are never removed.
#[derive(Debug)]
pub struct GeneralizedSuffixTree {
    nodes: Vec<Node>,
    active_leaf: NodeId,
    highest_index: Option<u64>,
}

impl Default for GeneralizedSuffixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralizedSuffixTree {
    /// Constructs an empty index.
    pub fn new() -> Self {
        GeneralizedSuffixTree {
            nodes: vec![Node::default()],
            active_leaf: ROOT,
            highest_index: None,
        }
    }

    /// Indexes `key` under `id`. `id` must be greater than or equal to
    /// every id accepted by a previous call to `put` on this tree;
    /// otherwise the tree is left unchanged and
    /// [`GstError::OutOfOrderId`] is returned.
    ///
    /// `key` must be non-empty.
    pub fn put(&mut self, key: &str, id: u64) -> Result<(), GstError> {
        assert!(!key.is_empty(), "put: key must be non-empty");

        if let Some(highest) = self.highest_index {
            if id < highest {
                return Err(GstError::OutOfOrderId {
                    attempted: id,
                    highest,
                });
            }
        }
        self.highest_index = Some(id);
        self.active_leaf = ROOT;

        let bytes = key.as_bytes();
        let mut s = ROOT;
        let mut alpha: Vec<u8> = Vec::new();
        for i in 0..bytes.len() {
            let (next_s, next_alpha) = self.update(bytes, id, s, alpha, i)?;
            s = next_s;
            alpha = next_alpha;
        }

        // Finalizer (§4.5 step 3): the very last leaf created for this key
        // may still be missing a suffix link if Update's loop ended on an
        // endpoint before wiring it.
        if self.nodes[self.active_leaf].suffix_link.is_none()
            && self.active_leaf != ROOT
            && self.active_leaf != s
        {
            self.nodes[self.active_leaf].suffix_link = Some(s);
        }

        Ok(())
    }

    /// Returns the set of ids of every key previously `put` that contains
    /// `query` as a substring. An empty query returns every id ever
    /// inserted, matching what a zero-length walk from the root would
    /// otherwise yield via `GetData`.
    pub fn search(&self, query: &str) -> HashSet<u64> {
        if query.is_empty() {
            let mut acc = HashSet::new();
            self.collect_ids(ROOT, &mut acc);
            return acc;
        }

        let word = query.as_bytes();
        let mut node = ROOT;
        let mut i = 0;
        loop {
            let edge = match self.nodes[node].edges.get(&word[i]) {
                Some(e) => e,
                None => return HashSet::new(),
            };
            let remaining = word.len() - i;
            let m = remaining.min(edge.label.len());
            if word[i..i + m] != edge.label[..m] {
                return HashSet::new();
            }
            if edge.label.len() >= remaining {
                let mut acc = HashSet::new();
                self.collect_ids(edge.dest, &mut acc);
                return acc;
            }
            i += edge.label.len();
            node = edge.dest;
        }
    }

    // ---- Node: payload and reachability (§4.1) ----

    fn collect_ids(&self, node: NodeId, acc: &mut HashSet<u64>) {
        acc.extend(self.nodes[node].data.iter());
        for edge in self.nodes[node].edges.values() {
            self.collect_ids(edge.dest, acc);
        }
    }

    /// Attaches `id` to `node`, then propagates it up the suffix-link
    /// chain, stopping at the first ancestor that already carries it
    /// (invariant 5 of §3 guarantees every farther ancestor already has
    /// it too). Returns whether `id` was newly added to `node` itself.
    fn add_ref(&mut self, node: NodeId, id: u64) -> bool {
        let added = self.nodes[node].data.insert(id);
        if !added {
            return false;
        }
        let mut cur = node;
        while let Some(link) = self.nodes[cur].suffix_link {
            if self.nodes[link].data.insert(id) {
                cur = link;
            } else {
                break;
            }
        }
        true
    }

    fn new_node(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    // ---- Canonize (§4.2) ----

    /// Reduces the locus `(s, alpha)` to its canonical form: the farthest
    /// `(s', alpha')` reachable by walking fully-consumed edges, such
    /// that `alpha'` cannot be entirely consumed by any single outgoing
    /// edge of `s'`.
    fn canonize(&self, mut s: NodeId, mut alpha: Vec<u8>) -> (NodeId, Vec<u8>) {
        loop {
            if alpha.is_empty() {
                return (s, alpha);
            }
            let edge = match self.nodes[s].edges.get(&alpha[0]) {
                Some(e) => e,
                None => return (s, alpha),
            };
            if alpha.len() >= edge.label.len() && alpha[..edge.label.len()] == edge.label[..] {
                let dest = edge.dest;
                alpha = alpha[edge.label.len()..].to_vec();
                s = dest;
            } else {
                return (s, alpha);
            }
        }
    }

    // ---- TestAndSplit (§4.3) ----

    /// Decides whether `alpha · t` is already represented under `s`. If
    /// not, prepares (possibly by splitting an edge) the anchor node a
    /// new leaf for `remainder` should be attached to.
    fn test_and_split(
        &mut self,
        s: NodeId,
        alpha: &[u8],
        t: u8,
        remainder: &[u8],
        id: u64,
    ) -> Result<(bool, NodeId), GstError> {
        let (s, alpha) = self.canonize(s, alpha.to_vec());

        if !alpha.is_empty() {
            let first = alpha[0];
            let label_len = self.nodes[s]
                .edges
                .get(&first)
                .ok_or_else(|| {
                    GstError::InvariantViolation(format!(
                        "canonical locus ({}, alpha starting with {:?}) has no matching edge",
                        s, first
                    ))
                })?
                .label
                .len();

            if label_len <= alpha.len() {
                return Err(GstError::InvariantViolation(format!(
                    "canonize returned a non-canonical alpha of length {} against an edge of length {}",
                    alpha.len(),
                    label_len
                )));
            }

            let next_char = self.nodes[s].edges[&first].label[alpha.len()];
            if next_char == t {
                return Ok((true, s));
            }

            // Split: the existing edge g keyed by `first` becomes two
            // edges meeting at a fresh internal node r.
            let r = self.new_node();
            let g_label = self.nodes[s].edges[&first].label.clone();
            let g_dest = self.nodes[s].edges[&first].dest;
            let suffix_label = g_label[alpha.len()..].to_vec();
            let suffix_first = suffix_label[0];

            self.nodes[s]
                .edges
                .insert(first, Edge::new(alpha.clone(), r));
            self.nodes[r]
                .edges
                .insert(suffix_first, Edge::new(suffix_label, g_dest));

            Ok((false, r))
        } else {
            match self.nodes[s].edges.get(&t) {
                None => Ok((false, s)),
                Some(e) => {
                    let label = e.label.clone();
                    let dest = e.dest;

                    if label == remainder {
                        self.add_ref(dest, id);
                        Ok((true, s))
                    } else if starts_with(remainder, &label) {
                        // The whole edge is consumed by `remainder`; the
                        // rest already lives further down this branch.
                        Ok((true, s))
                    } else if starts_with(&label, remainder) {
                        let n = self.new_node();
                        self.add_ref(n, id);
                        let shortened = label[remainder.len()..].to_vec();
                        let shortened_first = shortened[0];

                        self.nodes[s]
                            .edges
                            .insert(t, Edge::new(remainder.to_vec(), n));
                        self.nodes[n]
                            .edges
                            .insert(shortened_first, Edge::new(shortened, dest));

                        Ok((false, s))
                    } else {
                        // Neither is a prefix of the other, though they
                        // share their first byte `t`. No split here; a
                        // later Update iteration, after a suffix-link
                        // jump, resolves the disagreement. See §9.
                        Ok((true, s))
                    }
                }
            }
        }
    }

    // ---- Update (§4.4) ----

    /// Ukkonen's main extension step for the `i`th byte of `key`. Returns
    /// the new canonical active point `(s, alpha)` for the next byte.
    fn update(
        &mut self,
        key: &[u8],
        id: u64,
        mut s: NodeId,
        alpha: Vec<u8>,
        i: usize,
    ) -> Result<(NodeId, Vec<u8>), GstError> {
        let c = key[i];
        let remainder = &key[i..];
        let mut old_root = ROOT;

        let mut tau = alpha.clone();
        tau.push(c);

        let (mut endpoint, mut r_anchor) = self.test_and_split(s, &alpha, c, remainder, id)?;

        while !endpoint {
            let leaf = match self.nodes[r_anchor].edges.get(&c) {
                // The GST may already contain this branch from a prior
                // key: reuse its destination instead of creating a new
                // leaf. This is the departure from the single-string
                // Ukkonen paper that generalizes it to many strings.
                Some(e) => e.dest,
                None => {
                    let leaf = self.new_node();
                    self.add_ref(leaf, id);
                    self.nodes[r_anchor]
                        .edges
                        .insert(c, Edge::new(remainder.to_vec(), leaf));
                    leaf
                }
            };

            if self.active_leaf != ROOT {
                self.nodes[self.active_leaf].suffix_link = Some(leaf);
            }
            self.active_leaf = leaf;

            if old_root != ROOT {
                self.nodes[old_root].suffix_link = Some(r_anchor);
            }
            old_root = r_anchor;

            match self.nodes[s].suffix_link {
                None => {
                    debug_assert_eq!(s, ROOT, "a node without a suffix link must be the root");
                    tau = drop_first(&tau);
                }
                Some(link) => {
                    let last = *tau.last().expect("tau is never empty inside this loop");
                    let without_last = drop_last(&tau);
                    let (next_s, mut next_alpha) = self.canonize(link, without_last);
                    next_alpha.push(last);
                    s = next_s;
                    tau = next_alpha;
                }
            }

            // `tau` may have just gone empty via the `None` branch above (the
            // root case can drop its only remaining character); `drop_last`
            // treats that the same as any other empty string instead of
            // underflowing on `tau.len() - 1`.
            let without_last = drop_last(&tau);
            let (next_endpoint, next_anchor) =
                self.test_and_split(s, &without_last, c, remainder, id)?;
            endpoint = next_endpoint;
            r_anchor = next_anchor;
        }

        if old_root != ROOT {
            self.nodes[old_root].suffix_link = Some(r_anchor);
        }

        Ok(self.canonize(s, tau))
    }
}

fn starts_with(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && &haystack[..prefix.len()] == prefix
}

/// All but the last byte of `tau`, or empty if `tau` is already empty.
fn drop_last(tau: &[u8]) -> Vec<u8> {
    if tau.is_empty() {
        Vec::new()
    } else {
        tau[..tau.len() - 1].to_vec()
    }
}

/// All but the first byte of `tau`, or empty if `tau` is already empty.
fn drop_first(tau: &[u8]) -> Vec<u8> {
    if tau.is_empty() {
        Vec::new()
    } else {
        tau[1..].to_vec()
    }
}

impl SearchTree for GeneralizedSuffixTree {
    fn search(&self, query: &str) -> HashSet<u64> {
        // Calls the inherent method above, not this trait method: Rust
        // resolves inherent methods before trait methods, so this does
        // not recurse.
        self.search(query)
    }
}

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tree: &GeneralizedSuffixTree, query: &str) -> HashSet<u64> {
        tree.search(query)
    }

    fn substrings(word: &str) -> Vec<String> {
        let chars: Vec<char> = word.chars().collect();
        let mut out = Vec::new();
        for start in 0..chars.len() {
            for end in (start + 1)..=chars.len() {
                out.push(chars[start..end].iter().collect());
            }
        }
        out
    }

    #[test]
    fn cacao_every_substring_found() {
        let mut t = GeneralizedSuffixTree::new();
        t.put("cacao", 0).unwrap();
        for s in substrings("cacao") {
            assert!(ids(&t, &s).contains(&0), "missing substring {:?}", s);
        }
        assert!(ids(&t, "caco").is_empty());
        assert!(ids(&t, "cacaoo").is_empty());
        assert!(ids(&t, "ccacao").is_empty());
    }

    #[test]
    fn bookkeeper_every_substring_found() {
        let mut t = GeneralizedSuffixTree::new();
        t.put("bookkeeper", 0).unwrap();
        for s in substrings("bookkeeper") {
            assert!(ids(&t, &s).contains(&0), "missing substring {:?}", s);
        }
        assert!(ids(&t, "books").is_empty());
        assert!(ids(&t, "boke").is_empty());
        assert!(ids(&t, "ookepr").is_empty());
    }

    #[test]
    fn duplicate_key_both_ids_found() {
        let mut t = GeneralizedSuffixTree::new();
        t.put("cacao", 0).unwrap();
        t.put("cacao", 1).unwrap();
        for s in substrings("cacao") {
            let found = ids(&t, &s);
            assert!(found.contains(&0) && found.contains(&1), "missing ids for {:?}", s);
        }
    }

    #[test]
    fn prefix_chain_banana_bano_ba() {
        let words = ["banana", "bano", "ba"];
        let mut t = GeneralizedSuffixTree::new();
        for (i, w) in words.iter().enumerate() {
            t.put(w, i as u64).unwrap();
        }
        for (i, w) in words.iter().enumerate() {
            for s in substrings(w) {
                assert!(ids(&t, &s).contains(&(i as u64)), "missing {:?} for {:?}", s, w);
            }
        }

        for (j, w) in words.iter().enumerate() {
            let id = (words.len() + j) as u64;
            t.put(w, id).unwrap();
        }
        for (j, w) in words.iter().enumerate() {
            let id = (words.len() + j) as u64;
            for s in substrings(w) {
                assert!(ids(&t, &s).contains(&id), "missing {:?} for {:?}", s, w);
            }
        }
    }

    #[test]
    fn larger_mixed_sample() {
        let words = [
            "cacaor",
            "caricato",
            "cacato",
            "cacata",
            "caricata",
            "cacao",
            "banana",
        ];
        let mut t = GeneralizedSuffixTree::new();
        for (i, w) in words.iter().enumerate() {
            t.put(w, i as u64).unwrap();
        }
        for (i, w) in words.iter().enumerate() {
            for s in substrings(w) {
                assert!(ids(&t, &s).contains(&(i as u64)), "missing {:?} for {:?}", s, w);
            }
        }
        assert!(ids(&t, "aoca").is_empty());
    }

    #[test]
    fn repeat_put_accumulates_ids() {
        let words = [
            "cacaor",
            "caricato",
            "cacato",
            "cacata",
            "caricata",
            "cacao",
            "banana",
        ];
        let mut t = GeneralizedSuffixTree::new();
        for (i, w) in words.iter().enumerate() {
            t.put(w, i as u64).unwrap();
        }
        for (i, w) in words.iter().enumerate() {
            t.put(w, (words.len() + i) as u64).unwrap();
        }
        for (i, w) in words.iter().enumerate() {
            for s in substrings(w) {
                let found = ids(&t, &s);
                assert!(found.contains(&(i as u64)));
                assert!(found.contains(&((words.len() + i) as u64)));
            }
        }
    }

    #[test]
    fn unresolved_branch_disagreement_case() {
        // Exercises the TestAndSplit branch where neither `remainder` nor
        // an edge label is a prefix of the other at the point they first
        // share a byte; resolution happens on a later Update iteration
        // after a suffix-link jump. See §9 of the design notes.
        let mut t = GeneralizedSuffixTree::new();
        t.put("cacacato", 0).unwrap();
        for s in substrings("cacacato") {
            assert!(ids(&t, &s).contains(&0), "missing substring {:?}", s);
        }

        let mut t2 = GeneralizedSuffixTree::new();
        t2.put("addressrestricted", 0).unwrap();
        for s in substrings("addressrestricted") {
            assert!(ids(&t2, &s).contains(&0), "missing substring {:?}", s);
        }
    }

    #[test]
    fn out_of_order_id_rejected_and_tree_unchanged() {
        let mut t = GeneralizedSuffixTree::new();
        t.put("banana", 5).unwrap();
        let err = t.put("banana", 2).unwrap_err();
        assert_eq!(
            err,
            GstError::OutOfOrderId {
                attempted: 2,
                highest: 5
            }
        );
        // Unchanged: still only id 5 is present.
        assert_eq!(ids(&t, "ban"), [5u64].iter().copied().collect());
    }

    #[test]
    fn empty_query_returns_every_id() {
        let mut t = GeneralizedSuffixTree::new();
        t.put("banana", 0).unwrap();
        t.put("cacao", 1).unwrap();
        let all = ids(&t, "");
        assert!(all.contains(&0));
        assert!(all.contains(&1));
    }

    #[test]
    fn search_absent_key_returns_empty() {
        let t = GeneralizedSuffixTree::new();
        assert!(ids(&t, "anything").is_empty());
    }

    #[test]
    fn combined_search_tree_unions_results() {
        let mut a = GeneralizedSuffixTree::new();
        a.put("banana", 0).unwrap();
        let mut b = GeneralizedSuffixTree::new();
        b.put("bandana", 1).unwrap();

        let mut combined = CombinedSearchTree::new();
        combined.add(Box::new(a));
        combined.add(Box::new(b));

        let found = combined.search("ban");
        assert!(found.contains(&0));
        assert!(found.contains(&1));
    }

    #[quickcheck]
    fn qc_substring_completeness(word: String, id: u64) -> bool {
        if word.is_empty() {
            return true;
        }
        let mut t = GeneralizedSuffixTree::new();
        t.put(&word, id).unwrap();
        substrings(&word).into_iter().all(|s| t.search(&s).contains(&id))
    }

    #[quickcheck]
    fn qc_no_false_positive_for_absent_char(word: String, id: u64, absent: char) -> bool {
        if word.is_empty() || word.contains(absent) {
            return true;
        }
        let mut t = GeneralizedSuffixTree::new();
        t.put(&word, id).unwrap();
        t.search(&absent.to_string()).is_empty()
    }
}
