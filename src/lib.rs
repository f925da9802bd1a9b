pub mod audit;
pub mod baseline;
pub mod datasets;
pub mod enumeration;
pub mod error;
pub mod graph;
pub mod sampling;
pub mod wl;

pub use audit::{audit_collisions, CollisionReport};
pub use baseline::{
    BaselineConfig, BaselineQueries, BaselineQueryBuilder, BaselineStats, BaselineStrategy,
    SizeHistogram, SizeReport,
};
pub use datasets::DatasetLoader;
pub use enumeration::{EnumerationConfig, EnumerationOutcome, MotifBuckets, SubgraphEnumerator};
pub use error::MotifError;
pub use graph::{GraphId, GraphInstance, GraphLoader, GraphWriter};
pub use sampling::{NeighborhoodSampler, SampledNeighborhood, SamplerConfig};
pub use wl::{CanonicalHasher, CanonicalKey, Fingerprint, HashMasks};
