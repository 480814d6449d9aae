//! Arena-backed character trie with per-path counts and extension entropy.

use rustc_hash::FxHashMap;

/// Index of a node inside a [`Trie`] arena.
pub type NodeId = usize;

/// A single trie node: occurrence count, candidate scores, and child links.
#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    /// Number of corpus windows that exactly match the path to this node.
    pub freq: u64,
    /// Pointwise mutual information of the path, filled in by the compute phase.
    pub pmi: f64,
    /// Right boundary entropy of the path, filled in by the compute phase.
    pub r_entropy: f64,
    /// Left boundary entropy of the path, filled in by the compute phase.
    pub l_entropy: f64,
    children: FxHashMap<char, NodeId>,
}

impl TrieNode {
    /// Returns `true` if at least one extension of this path was observed.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of distinct one-character extensions.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Character trie stored as an arena of nodes referenced by index.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    /// Identifier of the root node (the empty string).
    pub const ROOT: NodeId = 0;

    /// Creates a trie holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Total number of nodes including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Immutable access to a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TrieNode {
        &mut self.nodes[id]
    }

    /// Follows the edge labelled `ch` from `id`.
    #[must_use]
    pub fn child(&self, id: NodeId, ch: char) -> Option<NodeId> {
        self.node(id).children.get(&ch).copied()
    }

    /// Iterates the `(label, child)` edges of a node in arbitrary order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (char, NodeId)> + '_ {
        self.node(id).children.iter().map(|(&ch, &child)| (ch, child))
    }

    fn child_or_insert(&mut self, id: NodeId, ch: char) -> NodeId {
        if let Some(child) = self.child(id, ch) {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(TrieNode::default());
        self.nodes[id].children.insert(ch, child);
        child
    }

    /// Inserts one occurrence of `word`, creating nodes as needed.
    pub fn insert<I: IntoIterator<Item = char>>(&mut self, word: I) -> NodeId {
        let mut node = Self::ROOT;
        for ch in word {
            node = self.child_or_insert(node, ch);
        }
        self.node_mut(node).freq += 1;
        node
    }

    /// Inserts one occurrence of every non-empty prefix of `chars`.
    ///
    /// Equivalent to calling [`Trie::insert`] for each prefix, but walks the path once.
    /// Returns the number of insertions performed.
    pub fn insert_prefixes<I: IntoIterator<Item = char>>(&mut self, chars: I) -> u64 {
        let mut node = Self::ROOT;
        let mut inserted = 0;
        for ch in chars {
            node = self.child_or_insert(node, ch);
            self.node_mut(node).freq += 1;
            inserted += 1;
        }
        inserted
    }

    /// Looks up the node for `word`.
    pub fn find<I: IntoIterator<Item = char>>(&self, word: I) -> Option<NodeId> {
        word.into_iter()
            .try_fold(Self::ROOT, |node, ch| self.child(node, ch))
    }

    /// Frequency of `word`, or zero if it was never inserted.
    pub fn frequency<I: IntoIterator<Item = char>>(&self, word: I) -> u64 {
        self.find(word).map_or(0, |id| self.node(id).freq)
    }

    /// Shannon entropy (bits) of the distribution over a node's one-character extensions.
    #[must_use]
    pub fn extension_entropy(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        let total: u64 = node
            .children
            .values()
            .map(|&child| self.node(child).freq)
            .sum();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        node.children.values().fold(0.0, |entropy, &child| {
            let p = self.node(child).freq as f64 / total;
            if p > 0.0 {
                entropy - p * p.log2()
            } else {
                entropy
            }
        })
    }

    /// Adds every count of `other` into `self`.
    ///
    /// Merging is plain integer addition per path, so the result does not depend on the
    /// order in which shards are merged.
    pub fn merge(&mut self, other: &Trie) {
        let mut stack = vec![(Self::ROOT, Self::ROOT)];
        while let Some((theirs, ours)) = stack.pop() {
            let freq = other.node(theirs).freq;
            self.node_mut(ours).freq += freq;
            for (ch, their_child) in other.children(theirs) {
                let our_child = self.child_or_insert(ours, ch);
                stack.push((their_child, our_child));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_counts_exact_paths() {
        let mut trie = Trie::new();
        trie.insert("天下".chars());
        trie.insert("天下".chars());
        trie.insert("天".chars());
        assert_eq!(trie.frequency("天下".chars()), 2);
        assert_eq!(trie.frequency("天".chars()), 1);
        assert_eq!(trie.frequency("下".chars()), 0);
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn insert_prefixes_matches_repeated_insert() {
        let mut walked = Trie::new();
        assert_eq!(walked.insert_prefixes("大道至简".chars()), 4);
        let mut inserted = Trie::new();
        for len in 1..=4 {
            inserted.insert("大道至简".chars().take(len));
        }
        for len in 1..=4 {
            let prefix: String = "大道至简".chars().take(len).collect();
            assert_eq!(
                walked.frequency(prefix.chars()),
                inserted.frequency(prefix.chars())
            );
        }
    }

    #[test]
    fn entropy_of_single_extension_is_zero() {
        let mut trie = Trie::new();
        trie.insert("天下".chars());
        trie.insert("天下".chars());
        let id = trie.find("天".chars()).unwrap();
        assert_eq!(trie.extension_entropy(id), 0.0);
    }

    #[test]
    fn entropy_of_uniform_extensions_is_log2_n() {
        let mut trie = Trie::new();
        for word in ["天下", "天地", "天子", "天命"] {
            trie.insert(word.chars());
        }
        let id = trie.find("天".chars()).unwrap();
        assert!((trie.extension_entropy(id) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn merge_sums_counts_in_any_order() {
        let mut a = Trie::new();
        a.insert_prefixes("天下".chars());
        let mut b = Trie::new();
        b.insert_prefixes("天地".chars());
        b.insert_prefixes("天下".chars());

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        for word in ["天", "天下", "天地"] {
            assert_eq!(ab.frequency(word.chars()), ba.frequency(word.chars()));
        }
        assert_eq!(ab.frequency("天".chars()), 3);
        assert_eq!(ab.frequency("天下".chars()), 2);
    }

    #[test]
    fn node_ids_index_the_arena_in_insertion_order() {
        let mut trie = Trie::new();
        let tianxia = trie.insert("天下".chars());
        let tiandi = trie.insert("天地".chars());
        assert_eq!(trie.find("天".chars()), Some(1));
        assert_eq!(tianxia, 2);
        assert_eq!(tiandi, 3);
        assert_eq!(trie.len(), 4);
        assert_eq!(trie.node(tiandi).freq, 1);
    }
}
