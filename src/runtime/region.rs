//! Live regions and state nodes.
//!
//! Nodes and regions live in an arena addressed by ids. A node exists only
//! while its state is active (or terminated in place); a region exists only
//! while its parent node does.

use super::context::StateHandler;
use crate::client::behavior::ErasedBehavior;
use crate::client::ClientId;
use crate::core::State;
use crate::logic::LogicUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Active,
    /// Exited by its own reaction but still the current node of its region.
    Terminated,
}

pub(crate) struct BoundBehavior {
    pub region: RegionId,
    pub client: ClientId,
    pub behavior: Box<dyn ErasedBehavior>,
}

pub(crate) struct Node<S: State> {
    pub state: S,
    pub region: RegionId,
    pub regions: Vec<RegionId>,
    pub handler: Option<Box<dyn StateHandler<S>>>,
    pub behaviors: Vec<BoundBehavior>,
    pub logic_units: Vec<Box<dyn LogicUnit>>,
    pub lifecycle: Lifecycle,
}

impl<S: State> Node<S> {
    pub fn new(state: S, region: RegionId, handler: Box<dyn StateHandler<S>>) -> Self {
        Self {
            state,
            region,
            regions: Vec::new(),
            handler: Some(handler),
            behaviors: Vec::new(),
            logic_units: Vec::new(),
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }
}

#[derive(Debug)]
pub(crate) struct Region {
    pub name: String,
    pub parent: Option<NodeId>,
    pub current: Option<NodeId>,
    pub client: Option<ClientId>,
    pub clients_in_use: Vec<ClientId>,
}

/// A currently active state, as reported by introspection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActiveState<S: State> {
    pub region: String,
    pub state: S,
    /// 0 for states of root regions
    pub depth: usize,
    pub leaf: bool,
    pub terminated: bool,
}

pub(crate) struct Arena<S: State> {
    nodes: HashMap<NodeId, Node<S>>,
    regions: HashMap<RegionId, Region>,
    roots: Vec<RegionId>,
    next_id: u64,
}

impl<S: State> Arena<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            regions: HashMap::new(),
            roots: Vec::new(),
            next_id: 0,
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_region(&mut self, name: &str, parent: Option<NodeId>, client: Option<ClientId>) -> RegionId {
        let id = RegionId(self.allocate());
        self.regions.insert(
            id,
            Region {
                name: name.to_string(),
                parent,
                current: None,
                client,
                clients_in_use: Vec::new(),
            },
        );
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => node.regions.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Insert `node` as the current node of its region.
    pub fn add_node(&mut self, node: Node<S>) -> NodeId {
        let id = NodeId(self.allocate());
        if let Some(region) = self.regions.get_mut(&node.region) {
            region.current = Some(id);
        }
        self.nodes.insert(id, node);
        id
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<Node<S>> {
        let node = self.nodes.remove(&id)?;
        if let Some(region) = self.regions.get_mut(&node.region) {
            if region.current == Some(id) {
                region.current = None;
            }
        }
        Some(node)
    }

    pub fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let region = self.regions.remove(&id)?;
        match region.parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => node.regions.retain(|r| *r != id),
            None => self.roots.retain(|r| *r != id),
        }
        Some(region)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<S>> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<S>> {
        self.nodes.get_mut(&id)
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    pub fn roots(&self) -> &[RegionId] {
        &self.roots
    }

    /// The live region called `name`. Region names are unique.
    pub fn find_region(&self, name: &str) -> Option<RegionId> {
        self.regions
            .iter()
            .find(|(_, region)| region.name == name)
            .map(|(id, _)| *id)
    }

    /// Parent node of `node`, `None` for nodes of root regions.
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        let region = self.nodes.get(&node)?.region;
        self.regions.get(&region)?.parent
    }

    /// Every node, depth-first in region declaration order, parents first.
    pub fn nodes_in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for region in &self.roots {
            self.walk_region(*region, &mut out);
        }
        out
    }

    fn walk_region(&self, region: RegionId, out: &mut Vec<NodeId>) {
        let Some(current) = self.regions.get(&region).and_then(|r| r.current) else {
            return;
        };
        out.push(current);
        if let Some(node) = self.nodes.get(&current) {
            for child in &node.regions {
                self.walk_region(*child, out);
            }
        }
    }

    /// Nodes with no live child region, in depth-first declaration order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes_in_order()
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|node| node.regions.is_empty()))
            .collect()
    }

    pub fn depth_of(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(node);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent_of(parent);
        }
        depth
    }

    pub fn active_states(&self) -> Vec<ActiveState<S>> {
        self.nodes_in_order()
            .into_iter()
            .filter_map(|id| {
                let node = self.nodes.get(&id)?;
                let region = self.regions.get(&node.region)?;
                Some(ActiveState {
                    region: region.name.clone(),
                    state: node.state.clone(),
                    depth: self.depth_of(id),
                    leaf: node.regions.is_empty(),
                    terminated: !node.is_active(),
                })
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn regions(&self) -> impl Iterator<Item = (RegionId, &Region)> {
        self.regions.iter().map(|(id, region)| (*id, region))
    }
}
