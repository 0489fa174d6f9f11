use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::jobs::JobInstance;

/// Stable identifier for a job instance within one resolution call: the
/// instance's position in the resolver's input slice.
pub type JobId = usize;

/// One node of a resolved dependency graph.
///
/// Equality and hashing consider the job id only; children are excluded so
/// that two nodes wrapping the same instance compare equal regardless of how
/// much of the graph was expanded beneath them.
#[derive(Clone)]
pub struct Node {
    pub id: JobId,
    pub job: Arc<dyn JobInstance>,
    pub children: Vec<NodeChild>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("job", &self.job.name())
            .field("children", &self.children)
            .finish()
    }
}

/// A child node together with the name of the queue edge connecting it to
/// its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChild {
    pub node: Node,
    pub edge: String,
}

/// Producers and consumers recorded against one queue name during
/// resolution. Producers write to the queue, consumers drain it.
#[derive(Debug, Clone, Default)]
pub struct QueueEndpoints {
    pub producers: Vec<JobId>,
    pub consumers: Vec<JobId>,
}

/// One connected structural group of the analyzed job set.
#[derive(Debug, Clone)]
pub struct GroupNodes {
    pub is_cycle: bool,
    pub is_isolated: bool,
    /// Queue names feeding this group from outside the analyzed job set
    pub external_input_queues: Vec<String>,
    /// Queue names this group produces to with no consumer in the set
    pub external_output_queues: Vec<String>,
    pub nodes: Node,
}

/// Domain service partitioning job instances into structural groups.
///
/// Jobs are classified by their declared input/output queue names into
/// isolated nodes, root-reachable DAG chains and closed cycles, and each
/// group is expanded into a traversable [`Node`] tree for visualization or
/// scheduling-order decisions.
pub struct JobTopologyResolver;

impl JobTopologyResolver {
    /// Resolve a job set into its structural groups.
    ///
    /// Group order is deterministic: root groups in declaration order
    /// (boundary-promoted roots after true roots, by queue name), then cycle
    /// groups, then isolated nodes. A cycle has no canonical first node, so
    /// the sweep starts each cycle group from the lowest remaining job id.
    pub fn resolve(jobs: &[Arc<dyn JobInstance>]) -> Vec<GroupNodes> {
        let mut index: BTreeMap<String, QueueEndpoints> = BTreeMap::new();
        let mut first_nodes: Vec<JobId> = Vec::new();
        let mut isolated: Vec<JobId> = Vec::new();
        let mut members: BTreeSet<JobId> = BTreeSet::new();

        // Classification pass
        for (id, job) in jobs.iter().enumerate() {
            let outputs = job.output_queues();
            match job.input_queue() {
                None if outputs.is_empty() => {
                    isolated.push(id);
                    continue;
                }
                None => {
                    first_nodes.push(id);
                    members.insert(id);
                }
                Some(input) => {
                    members.insert(id);
                    index.entry(input.to_string()).or_default().consumers.push(id);
                }
            }
            for queue in outputs {
                index.entry(queue.clone()).or_default().producers.push(id);
            }
        }

        // Boundary detection: a queue produced to but never consumed inside
        // the set crosses the boundary outward; a queue consumed but never
        // produced is fed from outside, which makes its consumers roots.
        let mut external_inputs: HashSet<String> = HashSet::new();
        let mut external_outputs: HashSet<String> = HashSet::new();
        for (queue, endpoints) in &index {
            if !endpoints.producers.is_empty() && endpoints.consumers.is_empty() {
                external_outputs.insert(queue.clone());
            }
            if endpoints.producers.is_empty() && !endpoints.consumers.is_empty() {
                external_inputs.insert(queue.clone());
                for &id in &endpoints.consumers {
                    if !first_nodes.contains(&id) {
                        debug!("job '{}' promoted to root: queue '{}' has no producer in the set", jobs[id].name(), queue);
                        first_nodes.push(id);
                    }
                }
            }
        }

        let mut groups = Vec::new();
        let mut reached: BTreeSet<JobId> = BTreeSet::new();

        // Root traversal, one tree per root with a fresh visitation cache
        for &root in &first_nodes {
            let mut cache: HashSet<JobId> = HashSet::new();
            let node = Self::build_node(root, jobs, &index, &mut cache);
            reached.extend(cache.iter().copied());
            let (ext_in, ext_out) =
                Self::external_queues_for(&cache, jobs, &external_inputs, &external_outputs);
            groups.push(GroupNodes {
                is_cycle: false,
                is_isolated: false,
                external_input_queues: ext_in,
                external_output_queues: ext_out,
                nodes: node,
            });
        }

        // Cycle sweep: whatever no root ever reached participates purely in
        // a cycle. Start each group at the lowest remaining id.
        let mut remaining: BTreeSet<JobId> = members.difference(&reached).copied().collect();
        while let Some(&start) = remaining.iter().next() {
            debug!("cycle sweep starting at job '{}'", jobs[start].name());
            let mut cache: HashSet<JobId> = HashSet::new();
            let node = Self::build_node(start, jobs, &index, &mut cache);
            for id in &cache {
                remaining.remove(id);
            }
            let (ext_in, ext_out) =
                Self::external_queues_for(&cache, jobs, &external_inputs, &external_outputs);
            groups.push(GroupNodes {
                is_cycle: true,
                is_isolated: false,
                external_input_queues: ext_in,
                external_output_queues: ext_out,
                nodes: node,
            });
        }

        // Isolated emission
        for id in isolated {
            groups.push(GroupNodes {
                is_cycle: false,
                is_isolated: true,
                external_input_queues: Vec::new(),
                external_output_queues: Vec::new(),
                nodes: Node {
                    id,
                    job: jobs[id].clone(),
                    children: Vec::new(),
                },
            });
        }

        debug!(
            "resolved {} jobs into {} groups ({} roots)",
            jobs.len(),
            groups.len(),
            first_nodes.len()
        );
        groups
    }

    /// Depth-first expansion of one instance. Revisiting an instance already
    /// in this traversal's cache truncates to a childless leaf, which bounds
    /// recursion on graphs that loop back on themselves.
    fn build_node(
        id: JobId,
        jobs: &[Arc<dyn JobInstance>],
        index: &BTreeMap<String, QueueEndpoints>,
        cache: &mut HashSet<JobId>,
    ) -> Node {
        if !cache.insert(id) {
            return Node {
                id,
                job: jobs[id].clone(),
                children: Vec::new(),
            };
        }

        let mut children = Vec::new();
        for queue in jobs[id].output_queues() {
            if let Some(endpoints) = index.get(queue) {
                for &consumer in &endpoints.consumers {
                    let child = Self::build_node(consumer, jobs, index, cache);
                    children.push(NodeChild {
                        node: child,
                        edge: queue.clone(),
                    });
                }
            }
        }

        Node {
            id,
            job: jobs[id].clone(),
            children,
        }
    }

    /// Queue names of this group that cross the boundary of the analyzed
    /// set, in sorted order.
    fn external_queues_for(
        group: &HashSet<JobId>,
        jobs: &[Arc<dyn JobInstance>],
        external_inputs: &HashSet<String>,
        external_outputs: &HashSet<String>,
    ) -> (Vec<String>, Vec<String>) {
        let mut ins: BTreeSet<String> = BTreeSet::new();
        let mut outs: BTreeSet<String> = BTreeSet::new();
        for &id in group {
            if let Some(input) = jobs[id].input_queue() {
                if external_inputs.contains(input) {
                    ins.insert(input.to_string());
                }
            }
            for queue in jobs[id].output_queues() {
                if external_outputs.contains(queue) {
                    outs.insert(queue.clone());
                }
            }
        }
        (ins.into_iter().collect(), outs.into_iter().collect())
    }
}
