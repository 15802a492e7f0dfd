//! Louvain community detection
//!
//! Pure function over an index-based graph representation: repeated local
//! modularity optimization followed by community aggregation, until a pass
//! stops merging. The resolution parameter scales the null-model term; values
//! above 1.0 bias toward more, smaller communities.
//!
//! Tie-breaking between equal-gain moves follows map iteration order and is
//! not seeded, so repeated runs over identical input may yield different
//! (similarly-scored) partitions.

use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

const MAX_SWEEPS: usize = 20;
const MIN_GAIN: f32 = 1e-10;

/// Community per node (indexed by `NodeIndex::index()`, compact ids starting
/// at 0) plus the partition's global modularity.
#[derive(Debug, Clone)]
pub struct Partition {
    pub communities: Vec<u32>,
    pub modularity: f32,
}

impl Partition {
    pub fn community_count(&self) -> usize {
        self.communities.iter().map(|c| *c + 1).max().unwrap_or(0) as usize
    }
}

struct LevelGraph {
    /// Adjacency between distinct nodes; each undirected edge appears in both
    /// endpoint lists.
    neighbors: Vec<Vec<(usize, f32)>>,
    /// Intra-node weight folded in by aggregation (zero at level 0).
    self_weight: Vec<f32>,
}

impl LevelGraph {
    fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    fn degree(&self, i: usize) -> f32 {
        self.neighbors[i].iter().map(|(_, w)| w).sum::<f32>() + 2.0 * self.self_weight[i]
    }
}

pub fn louvain(graph: &UnGraph<String, f32>, resolution: f32) -> Partition {
    let n = graph.node_count();
    if n == 0 {
        return Partition {
            communities: vec![],
            modularity: 0.0,
        };
    }

    let mut level = LevelGraph {
        neighbors: vec![vec![]; n],
        self_weight: vec![0.0; n],
    };
    let mut total_weight: f32 = 0.0;

    for edge in graph.edge_references() {
        let u = edge.source().index();
        let v = edge.target().index();
        let w = *edge.weight();
        if u == v {
            level.self_weight[u] += w;
        } else {
            level.neighbors[u].push((v, w));
            level.neighbors[v].push((u, w));
        }
        total_weight += w;
    }

    if total_weight == 0.0 {
        return Partition {
            communities: (0..n as u32).collect(),
            modularity: 0.0,
        };
    }

    // membership[i] = community of original node i, refined level by level
    let mut membership: Vec<usize> = (0..n).collect();

    loop {
        let local = local_move(&level, total_weight, resolution);
        let (compact, count) = renumber(&local);

        if count == level.node_count() {
            break;
        }

        for m in membership.iter_mut() {
            *m = compact[*m];
        }
        level = aggregate(&level, &compact, count);
    }

    let (compact, _) = renumber(&membership);
    let communities: Vec<u32> = compact.into_iter().map(|c| c as u32).collect();
    let modularity = modularity_of(graph, &communities, total_weight, resolution);

    Partition {
        communities,
        modularity,
    }
}

/// One level of greedy local moves: each node joins the neighboring community
/// with the highest modularity gain until a full sweep changes nothing.
fn local_move(level: &LevelGraph, total_weight: f32, resolution: f32) -> Vec<usize> {
    let n = level.node_count();
    let m2 = 2.0 * total_weight;

    let mut assignment: Vec<usize> = (0..n).collect();
    let mut community_weights: Vec<f32> = (0..n).map(|i| level.degree(i)).collect();

    let mut changed = true;
    let mut sweeps = 0;

    while changed && sweeps < MAX_SWEEPS {
        changed = false;
        sweeps += 1;

        for i in 0..n {
            let current = assignment[i];
            let ki = level.degree(i);

            let mut links: HashMap<usize, f32> = HashMap::new();
            for &(neighbor, weight) in &level.neighbors[i] {
                *links.entry(assignment[neighbor]).or_insert(0.0) += weight;
            }

            let ki_in_current = *links.get(&current).unwrap_or(&0.0);
            let sum_tot_current = community_weights[current] - ki;

            let mut best = current;
            let mut max_delta: f32 = 0.0;

            for (&comm, &ki_in) in &links {
                if comm == current {
                    continue;
                }
                let sum_tot = community_weights[comm];
                let gain_new = (ki_in / m2) - resolution * (sum_tot * ki) / (m2 * m2);
                let gain_current =
                    (ki_in_current / m2) - resolution * (sum_tot_current * ki) / (m2 * m2);
                let delta = gain_new - gain_current;
                if delta > max_delta {
                    max_delta = delta;
                    best = comm;
                }
            }

            if best != current && max_delta > MIN_GAIN {
                assignment[i] = best;
                community_weights[current] -= ki;
                community_weights[best] += ki;
                changed = true;
            }
        }
    }

    assignment
}

/// Map arbitrary community labels to 0..count.
fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut compact = Vec::with_capacity(assignment.len());
    for &c in assignment {
        let next = remap.len();
        compact.push(*remap.entry(c).or_insert(next));
    }
    let count = remap.len();
    (compact, count)
}

/// Collapse each community into one super-node; inter-community weights sum
/// into single edges, intra-community weights into self loops.
fn aggregate(level: &LevelGraph, compact: &[usize], count: usize) -> LevelGraph {
    let mut self_weight = vec![0.0; count];
    let mut between: HashMap<(usize, usize), f32> = HashMap::new();

    for u in 0..level.node_count() {
        let cu = compact[u];
        self_weight[cu] += level.self_weight[u];
        for &(v, w) in &level.neighbors[u] {
            // each undirected edge appears twice in the adjacency lists
            if v < u {
                continue;
            }
            let cv = compact[v];
            if cu == cv {
                self_weight[cu] += w;
            } else {
                let key = if cu < cv { (cu, cv) } else { (cv, cu) };
                *between.entry(key).or_insert(0.0) += w;
            }
        }
    }

    let mut neighbors = vec![vec![]; count];
    for ((a, b), w) in between {
        neighbors[a].push((b, w));
        neighbors[b].push((a, w));
    }

    LevelGraph {
        neighbors,
        self_weight,
    }
}

/// Modularity of an assignment against the original graph:
/// `Q = sum_c [ w_in_c / m - resolution * (sum_tot_c / 2m)^2 ]`.
fn modularity_of(
    graph: &UnGraph<String, f32>,
    communities: &[u32],
    total_weight: f32,
    resolution: f32,
) -> f32 {
    let count = communities.iter().map(|c| *c + 1).max().unwrap_or(0) as usize;
    let mut internal = vec![0.0f32; count];
    let mut degree = vec![0.0f32; count];

    for edge in graph.edge_references() {
        let u = edge.source().index();
        let v = edge.target().index();
        let w = *edge.weight();
        let cu = communities[u] as usize;
        let cv = communities[v] as usize;
        degree[cu] += w;
        degree[cv] += w;
        if cu == cv {
            internal[cu] += w;
        }
    }

    let m = total_weight;
    let m2 = 2.0 * total_weight;
    (0..count)
        .map(|c| internal[c] / m - resolution * (degree[c] / m2) * (degree[c] / m2))
        .sum()
}
