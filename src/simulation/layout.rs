//! Indexed view of the line configuration
//!
//! The configuration names everything by string id. The engine works on arena
//! indices, so the layout resolves every id once, rejects duplicates and
//! dangling references, and precomputes the lookups the handlers need.

use std::collections::{HashMap, HashSet};

use crate::model::{NodeRef, Operation, RoutingCatalog};
use crate::simulation::error::{SimulationError, SimulationResult};
use crate::simulation::resource_pool::ResourcePool;
use crate::types::{
    BufferConfig, FlowConfig, LineConfig, PoolConfig, ReleasePolicy, ResourceKind, StationConfig,
    StationKind,
};

/// A flow with both ends resolved
#[derive(Debug, Clone)]
pub struct ResolvedFlow {
    /// Source node
    pub from: NodeRef,
    /// Target node
    pub to: NodeRef,
    /// Distance in metres
    pub distance: f64,
    /// Tool pool serving the flow
    pub tool_pool: Option<usize>,
}

/// Worker pool serving a station
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerBinding {
    /// Pool index
    pub pool: usize,
    /// Walking distance in metres
    pub distance: f64,
}

/// Resolved line layout
#[derive(Debug, Clone)]
pub struct Layout {
    /// Station table
    pub stations: Vec<StationConfig>,
    /// Buffer table
    pub buffers: Vec<BufferConfig>,
    /// Flow table, same order as the configuration
    pub flows: Vec<ResolvedFlow>,
    /// Flow configuration, for ids in replay records
    pub flow_configs: Vec<FlowConfig>,
    /// Routing catalog
    pub routings: RoutingCatalog,
    pools: Vec<(PoolConfig, ResourceKind)>,
    nodes: HashMap<String, NodeRef>,
    workers: Vec<Option<WorkerBinding>>,
    inbound_buffers: Vec<Vec<usize>>,
}

impl Layout {
    /// Resolve a line configuration
    pub fn build(line: &LineConfig) -> SimulationResult<Self> {
        let mut nodes = HashMap::new();
        for (index, station) in line.stations.iter().enumerate() {
            if nodes.insert(station.id.to_string(), NodeRef::Station(index)).is_some() {
                return Err(SimulationError::invalid_layout(format!(
                    "duplicate node id '{}'",
                    station.id
                )));
            }
        }
        for (index, buffer) in line.buffers.iter().enumerate() {
            if nodes.insert(buffer.id.to_string(), NodeRef::Buffer(index)).is_some() {
                return Err(SimulationError::invalid_layout(format!(
                    "duplicate node id '{}'",
                    buffer.id
                )));
            }
        }

        let mut pools = Vec::new();
        let mut pool_index = HashMap::new();
        let all_pools = line
            .worker_pools
            .iter()
            .map(|p| (p, ResourceKind::Worker))
            .chain(line.tool_pools.iter().map(|p| (p, ResourceKind::Tool)));
        for (config, kind) in all_pools {
            if pool_index.insert(config.id.clone(), pools.len()).is_some() {
                return Err(SimulationError::invalid_layout(format!(
                    "duplicate pool id '{}'",
                    config.id
                )));
            }
            pools.push((config.clone(), kind));
        }

        let mut flow_ids = HashSet::new();
        let mut flows = Vec::with_capacity(line.flows.len());
        for flow in &line.flows {
            if !flow_ids.insert(flow.id.clone()) {
                return Err(SimulationError::invalid_layout(format!(
                    "duplicate flow id '{}'",
                    flow.id
                )));
            }
            let resolve = |id: &str| {
                nodes.get(id).copied().ok_or_else(|| {
                    SimulationError::invalid_layout(format!(
                        "flow '{}' references unknown node '{}'",
                        flow.id, id
                    ))
                })
            };
            flows.push(ResolvedFlow {
                from: resolve(flow.from.as_str())?,
                to: resolve(flow.to.as_str())?,
                distance: flow.distance.max(0.0),
                tool_pool: None,
            });
        }

        for (index, (config, kind)) in pools.iter().enumerate() {
            if *kind != ResourceKind::Tool {
                continue;
            }
            for flow_id in &config.assigned_flows {
                let position = line.flows.iter().position(|f| f.id == *flow_id).ok_or_else(|| {
                    SimulationError::invalid_layout(format!(
                        "tool pool '{}' is assigned to unknown flow '{}'",
                        config.id, flow_id
                    ))
                })?;
                // First assignment wins
                flows[position].tool_pool.get_or_insert(index);
            }
        }

        let mut workers = vec![None; line.stations.len()];
        for worker_flow in &line.worker_flows {
            let pool = match pool_index.get(&worker_flow.from) {
                Some(&index) if pools[index].1 == ResourceKind::Worker => index,
                _ => {
                    return Err(SimulationError::invalid_layout(format!(
                        "worker flow references unknown worker pool '{}'",
                        worker_flow.from
                    )))
                }
            };
            let station = match nodes.get(worker_flow.to.as_str()) {
                Some(NodeRef::Station(index)) => *index,
                _ => {
                    return Err(SimulationError::invalid_layout(format!(
                        "worker flow references unknown station '{}'",
                        worker_flow.to
                    )))
                }
            };
            workers[station]
                .get_or_insert(WorkerBinding { pool, distance: worker_flow.distance.max(0.0) });
        }

        let mut inbound_buffers = vec![Vec::new(); line.stations.len()];
        for flow in &flows {
            if let (NodeRef::Buffer(buffer), NodeRef::Station(station)) = (flow.from, flow.to) {
                if !inbound_buffers[station].contains(&buffer) {
                    inbound_buffers[station].push(buffer);
                }
            }
        }

        Ok(Self {
            stations: line.stations.clone(),
            buffers: line.buffers.clone(),
            flows,
            flow_configs: line.flows.clone(),
            routings: line.routings.clone(),
            pools,
            nodes,
            workers,
            inbound_buffers,
        })
    }

    /// Fresh pools, worker pools first
    pub fn make_pools(&self, policy: ReleasePolicy) -> Vec<ResourcePool> {
        self.pools
            .iter()
            .map(|(config, kind)| ResourcePool::from_config(config, *kind, policy))
            .collect()
    }

    /// Resolve a node id
    pub fn node(&self, id: &str) -> Option<NodeRef> {
        self.nodes.get(id).copied()
    }

    /// Configured id of a node
    pub fn node_id(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Station(index) => self.stations[index].id.as_str(),
            NodeRef::Buffer(index) => self.buffers[index].id.as_str(),
        }
    }

    /// First flow leaving a node
    pub fn outbound_flow(&self, from: NodeRef) -> Option<usize> {
        self.flows.iter().position(|f| f.from == from)
    }

    /// Flow connecting two nodes
    pub fn flow_between(&self, from: NodeRef, to: NodeRef) -> Option<usize> {
        self.flows.iter().position(|f| f.from == from && f.to == to)
    }

    /// Buffers with a flow into a station
    pub fn inbound_buffers(&self, station: usize) -> &[usize] {
        &self.inbound_buffers[station]
    }

    /// Worker pool serving a station
    pub fn worker_binding(&self, station: usize) -> Option<WorkerBinding> {
        self.workers[station]
    }

    /// First station able to perform an operation
    pub fn station_for_operation(&self, operation: &Operation) -> Option<usize> {
        self.stations.iter().position(|s| s.can_perform(operation))
    }

    /// First entry buffer admitting a product type
    pub fn entry_buffer(&self, product_type: &str) -> Option<usize> {
        self.buffers.iter().position(|b| b.is_entry && b.admits(product_type))
    }

    /// Assembly station fed by a buffer
    pub fn assembly_fed_by(&self, buffer: usize) -> Option<usize> {
        self.flows.iter().find_map(|f| match (f.from, f.to) {
            (NodeRef::Buffer(b), NodeRef::Station(s))
                if b == buffer && self.stations[s].kind == StationKind::Assembly =>
            {
                Some(s)
            }
            _ => None,
        })
    }

    /// Stations of the assembly kind
    pub fn assembly_stations(&self) -> impl Iterator<Item = usize> + '_ {
        self.stations
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == StationKind::Assembly)
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlowId, NodeId, PoolId, SimulationInput};

    #[test]
    fn test_template_layout() {
        let input = SimulationInput::template();
        let layout = Layout::build(&input.line).unwrap();

        let buf_in = layout.node("buf_in").unwrap();
        let casing = layout.node("sta_casing").unwrap();
        let assembly = layout.node("sta_assembly").unwrap();
        assert_eq!(layout.node_id(casing), "sta_casing");
        assert!(layout.flow_between(buf_in, casing).is_some());
        assert!(layout.flow_between(casing, buf_in).is_none());

        let NodeRef::Station(assembly) = assembly else { panic!("not a station") };
        assert_eq!(layout.inbound_buffers(assembly).len(), 2);
        let NodeRef::Buffer(casings) = layout.node("buf_casings").unwrap() else {
            panic!("not a buffer")
        };
        assert_eq!(layout.assembly_fed_by(casings), Some(assembly));
        assert_eq!(layout.assembly_stations().collect::<Vec<_>>(), vec![assembly]);

        assert_eq!(layout.entry_buffer("casings_S1_M1"), Some(0));
        assert_eq!(layout.entry_buffer("casings_S9_M1"), None);

        let f7 = layout.flow_between(NodeRef::Station(assembly), NodeRef::Station(3)).unwrap();
        assert_eq!(layout.flows[f7].tool_pool, Some(1));
        assert!(layout.worker_binding(assembly).is_some());
        assert!(layout.worker_binding(3).is_none());

        let pools = layout.make_pools(ReleasePolicy::HeadOfLine);
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].kind, ResourceKind::Worker);
        assert_eq!(pools[1].kind, ResourceKind::Tool);
    }

    #[test]
    fn test_dangling_flow_rejected() {
        let mut input = SimulationInput::template();
        input.line.flows.push(FlowConfig {
            id: FlowId::new("f9"),
            from: NodeId::new("buf_out"),
            to: NodeId::new("nowhere"),
            distance: 1.0,
        });
        let err = Layout::build(&input.line).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut input = SimulationInput::template();
        let copy = input.line.stations[0].clone();
        input.line.stations.push(copy);
        assert!(matches!(Layout::build(&input.line), Err(SimulationError::InvalidLayout(_))));

        let mut input = SimulationInput::template();
        input.line.tool_pools[0].id = PoolId::new("pool_operators");
        assert!(Layout::build(&input.line).is_err());
    }
}
