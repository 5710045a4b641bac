//! Text stream tools.

pub mod sed;
pub mod split;
pub mod transform;

pub use sed::SedTool;
pub use split::SplitTool;
pub use transform::TransformTool;
