// Search graph for one route request.
//
// Nodes live in an arena (`Vec<SearchNode>`) and refer to their parent by
// `NodeHandle`, an index into that arena. A `FxHashMap<Position,
// NodeHandle>` guarantees at most one node per position. The open set is a
// `BinaryHeap` min-ordered by `(total, sequence)` (same reversed-ordering
// pattern as a scheduled event queue): when a node's costs improve it is
// pushed again with a fresh sequence, and heap entries whose sequence no
// longer matches their node are skipped on pop.
//
// Nodes are only representable inside a square lattice of side
// `node_window` centred on the search origin. Inserts outside it are
// dropped, which bounds the memory of a single search.
//
// The graph owns its buffers across requests; `reset` clears them but
// keeps their capacity.
//
// See also: `pathfinding.rs` for the A* loop that drives this graph.

use crate::error::GraphError;
use crate::types::{Direction, Position};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Index of a node in the graph arena. Only valid for the search that
/// created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One explored position.
#[derive(Clone, Debug)]
pub struct SearchNode {
    pub position: Position,
    /// Direction of the step that reached this node; `None` for the origin.
    pub direction: Option<Direction>,
    pub start_cost: f64,
    pub heuristic: f64,
    /// Always `start_cost + heuristic`.
    pub total: f64,
    pub closed: bool,
    pub parent: Option<NodeHandle>,
    /// Sequence of this node's live heap entry.
    open_sequence: u64,
}

/// Fields of a node about to be inserted.
#[derive(Clone, Copy, Debug)]
pub struct NewNode {
    pub position: Position,
    pub direction: Option<Direction>,
    pub parent: Option<NodeHandle>,
    pub start_cost: f64,
    pub heuristic: f64,
}

/// Entry in the open set (min-heap via reversed ordering).
struct OpenEntry {
    total: f64,
    sequence: u64,
    node: NodeHandle,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest (total, sequence) is "greatest" for the max-heap.
        other
            .total
            .total_cmp(&self.total)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Arena, position index and open set of one search.
#[derive(Default)]
pub struct SearchGraph {
    nodes: Vec<SearchNode>,
    index: FxHashMap<Position, NodeHandle>,
    open: BinaryHeap<OpenEntry>,
    next_sequence: u64,
    origin: Position,
    window: i32,
    closed: usize,
}

impl SearchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all nodes and start a new search around `origin`.
    pub fn reset(&mut self, origin: Position, window: i32) {
        self.clear();
        self.origin = origin;
        self.window = window;
    }

    /// Drop all nodes, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.open.clear();
        self.next_sequence = 0;
        self.closed = 0;
    }

    /// Whether `position` fits the lattice around the search origin.
    pub fn in_lattice(&self, position: Position) -> bool {
        let half = self.window / 2;
        let mx = half + position.x - self.origin.x;
        let my = half + position.y - self.origin.y;
        (0..self.window).contains(&mx) && (0..self.window).contains(&my)
    }

    pub fn find(&self, position: Position) -> Option<NodeHandle> {
        self.index.get(&position).copied()
    }

    /// The node behind `handle`. Panics on a handle from another search.
    pub fn node(&self, handle: NodeHandle) -> &SearchNode {
        &self.nodes[handle.index()]
    }

    pub fn nodes(&self) -> &[SearchNode] {
        &self.nodes
    }

    /// Number of nodes created in this search.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn closed_count(&self) -> usize {
        self.closed
    }

    fn push_open(&mut self, handle: NodeHandle) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let node = &mut self.nodes[handle.index()];
        node.open_sequence = sequence;
        self.open.push(OpenEntry {
            total: node.total,
            sequence,
            node: handle,
        });
    }

    /// Register a new open node. Returns `Ok(None)` when the position lies
    /// outside the lattice.
    pub fn insert(&mut self, new: NewNode) -> Result<Option<NodeHandle>, GraphError> {
        if !self.in_lattice(new.position) {
            return Ok(None);
        }
        if self.index.contains_key(&new.position) {
            return Err(GraphError::AlreadyRegistered(new.position));
        }
        let handle = NodeHandle(self.nodes.len() as u32);
        self.nodes.push(SearchNode {
            position: new.position,
            direction: new.direction,
            start_cost: new.start_cost,
            heuristic: new.heuristic,
            total: new.start_cost + new.heuristic,
            closed: false,
            parent: new.parent,
            open_sequence: 0,
        });
        self.index.insert(new.position, handle);
        self.push_open(handle);
        Ok(Some(handle))
    }

    /// Offer a cheaper way to reach an open node. Returns `Ok(true)` when
    /// `start_cost` improved the node, which then moves in the open set.
    pub fn revise(
        &mut self,
        handle: NodeHandle,
        parent: NodeHandle,
        direction: Direction,
        start_cost: f64,
    ) -> Result<bool, GraphError> {
        let node = &mut self.nodes[handle.index()];
        if node.closed {
            return Err(GraphError::ClosedRevision(node.position));
        }
        if start_cost >= node.start_cost {
            return Ok(false);
        }
        node.parent = Some(parent);
        node.direction = Some(direction);
        node.start_cost = start_cost;
        node.total = start_cost + node.heuristic;
        self.push_open(handle);
        Ok(true)
    }

    /// Remove and return the cheapest open node without closing it. Ties
    /// go to the node that entered the open set first.
    pub fn pop_cheapest(&mut self) -> Option<NodeHandle> {
        while let Some(entry) = self.open.pop() {
            let node = &self.nodes[entry.node.index()];
            if node.closed || node.open_sequence != entry.sequence {
                continue;
            }
            return Some(entry.node);
        }
        None
    }

    /// Mark a node as expanded. Closed nodes never change again.
    pub fn close(&mut self, handle: NodeHandle) -> Result<(), GraphError> {
        let node = &mut self.nodes[handle.index()];
        if node.closed {
            return Err(GraphError::AlreadyClosed(node.position));
        }
        node.closed = true;
        self.closed += 1;
        Ok(())
    }

    /// Handles from the search origin to `handle`, inclusive on both ends.
    pub fn path_to(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut path = vec![handle];
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}
