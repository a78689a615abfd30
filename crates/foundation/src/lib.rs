pub mod bounds;
pub mod ids;
pub mod scale;

// Foundation crate: small, dependency-free primitives only.
pub use bounds::*;
pub use ids::*;
pub use scale::*;
