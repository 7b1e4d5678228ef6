use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::io::{Read, Write};

use crate::binary_stream::{BitReader, BitWriter};
use crate::error::Error;
use crate::Result;

/// Upper bound for the depth of a tree over byte values.
pub const MAX_TREE_DEPTH: usize = 256;
const MAX_LEAF_COUNT: usize = 256;

/// Root-to-leaf path, `false` takes the left and `true` the right child.
pub type BitPath = Vec<bool>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodeKind {
    Leaf { symbol: u8 },
    Inner { left: usize, right: usize },
}

#[derive(Clone, Copy)]
struct Node {
    frequency: usize,
    index: usize,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

/// Binary decode tree over byte values, every inner node has two children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<NodeKind>,
    root_index: usize,
}

impl HuffmanTree {
    /// Builds a tree by repeatedly merging the two least frequent nodes.
    ///
    /// A single symbol gets a sibling with the neighbouring byte value so
    /// that every code has at least one bit. Returns `None` without symbols.
    pub fn from_frequencies(symbols_and_frequencies: &[(u8, usize)]) -> Option<HuffmanTree> {
        let mut symbols_and_frequencies = symbols_and_frequencies.to_vec();
        match symbols_and_frequencies.len() {
            0 => return None,
            1 => {
                let sibling = symbols_and_frequencies[0].0 ^ 1;
                symbols_and_frequencies.push((sibling, 0));
            }
            _ => (),
        }
        let mut heap = BinaryHeap::new();
        let mut nodes: Vec<NodeKind> = Vec::new();
        for &(symbol, frequency) in symbols_and_frequencies.iter() {
            heap.push(Reverse(Node {
                frequency,
                index: nodes.len(),
            }));
            nodes.push(NodeKind::Leaf { symbol });
        }
        while heap.len() > 1 {
            let (Some(Reverse(t1)), Some(Reverse(t2))) = (heap.pop(), heap.pop()) else {
                break;
            };
            heap.push(Reverse(Node {
                frequency: t1.frequency + t2.frequency,
                index: nodes.len(),
            }));
            nodes.push(NodeKind::Inner {
                left: t1.index,
                right: t2.index,
            });
        }
        let root_index = heap.pop()?.0.index;
        Some(HuffmanTree { nodes, root_index })
    }

    /// Builds a tree from the byte frequencies of `data`.
    pub fn from_data(data: &[u8]) -> Option<HuffmanTree> {
        let mut counts = [0usize; 256];
        data.iter().for_each(|&b| counts[b as usize] += 1);
        let frequencies: Vec<(u8, usize)> = counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
            .collect();
        Self::from_frequencies(&frequencies)
    }

    /// Reconstructs a tree from its preorder serialization.
    ///
    /// `node := flag [ value(8) | node node ]`, flag 1 marks a leaf.
    pub fn read_from<R: Read>(bits: &mut BitReader<R>) -> Result<HuffmanTree> {
        let mut tree = HuffmanTree {
            nodes: Vec::new(),
            root_index: 0,
        };
        let mut leaf_count = 0;
        tree.root_index = tree.read_node(bits, 0, &mut leaf_count)?;
        if let NodeKind::Leaf { .. } = tree.nodes[tree.root_index] {
            return Err(Error::MalformedHeader(
                "Huffman tree consists of a single leaf",
            ));
        }
        log::debug!(
            "Reconstructed Huffman tree with {} leaves from {} bytes",
            leaf_count,
            bits.bytes_fetched()
        );
        Ok(tree)
    }

    fn read_node<R: Read>(
        &mut self,
        bits: &mut BitReader<R>,
        depth: usize,
        leaf_count: &mut usize,
    ) -> Result<usize> {
        if depth >= MAX_TREE_DEPTH {
            return Err(Error::MalformedHeader("Huffman tree is too deep"));
        }
        let is_leaf = bits
            .read_bit()
            .map_err(Error::FailedToReadImageData)?
            .ok_or(Error::MalformedHeader("data segment ends inside the Huffman tree"))?;
        let index = self.nodes.len();
        if is_leaf {
            let value = bits.read_bits(8).map_err(Error::FailedToReadImageData)?;
            if value.len < 8 {
                return Err(Error::MalformedHeader(
                    "data segment ends inside the Huffman tree",
                ));
            }
            *leaf_count += 1;
            if *leaf_count > MAX_LEAF_COUNT {
                return Err(Error::MalformedHeader("Huffman tree has too many leaves"));
            }
            self.nodes.push(NodeKind::Leaf {
                symbol: value.value as u8,
            });
        } else {
            self.nodes.push(NodeKind::Inner { left: 0, right: 0 });
            let left = self.read_node(bits, depth + 1, leaf_count)?;
            let right = self.read_node(bits, depth + 1, leaf_count)?;
            self.nodes[index] = NodeKind::Inner { left, right };
        }
        Ok(index)
    }

    /// Writes the preorder serialization read by [`Self::read_from`].
    pub fn write_to<W: Write>(&self, writer: &mut BitWriter<W>) -> std::io::Result<()> {
        self.write_node(self.root_index, writer)
    }

    fn write_node<W: Write>(&self, index: usize, writer: &mut BitWriter<W>) -> std::io::Result<()> {
        match self.nodes[index] {
            NodeKind::Leaf { symbol } => {
                writer.write_bit(true)?;
                writer.write_bits(&[symbol], 8)?;
            }
            NodeKind::Inner { left, right } => {
                writer.write_bit(false)?;
                self.write_node(left, writer)?;
                self.write_node(right, writer)?;
            }
        }
        Ok(())
    }

    pub(super) fn root(&self) -> NodeKind {
        self.nodes[self.root_index]
    }

    pub(super) fn node(&self, index: usize) -> NodeKind {
        self.nodes[index]
    }

    /// Maps every code to the byte value of its leaf.
    pub fn codes(&self) -> BTreeMap<BitPath, u8> {
        let mut codes = BTreeMap::new();
        let mut stack = vec![(self.root_index, BitPath::new())];
        while let Some((index, path)) = stack.pop() {
            match self.nodes[index] {
                NodeKind::Leaf { symbol } => {
                    codes.insert(path, symbol);
                }
                NodeKind::Inner { left, right } => {
                    let mut left_path = path.clone();
                    left_path.push(false);
                    let mut right_path = path;
                    right_path.push(true);
                    stack.push((left, left_path));
                    stack.push((right, right_path));
                }
            }
        }
        codes
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, NodeKind::Leaf { .. }))
            .count()
    }
}
