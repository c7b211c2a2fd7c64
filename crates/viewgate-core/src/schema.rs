mod cache;
pub use cache::CacheConfig;

mod column;
pub use column::Column;

mod constraints;
pub use constraints::SelectorConstraints;

mod partition;
pub use partition::Partition;

mod relation;
pub use relation::{Cardinality, Link, MatchStrategy, Relation};

mod source;
pub use source::Source;

mod view;
pub use view::View;
