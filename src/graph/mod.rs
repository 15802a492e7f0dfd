pub mod knn;
pub mod louvain;
pub mod rrf;

pub use knn::{
    collect_edges, edge_key, graph_order, EdgeKey, KNN_K, MIN_GRAPH_ORDER, MIN_SIMILARITY,
    MIN_TENANT_ARTIFACTS,
};
pub use louvain::{louvain, Partition};
pub use rrf::{rrf_fuse, FusedScore, RRF_K};
