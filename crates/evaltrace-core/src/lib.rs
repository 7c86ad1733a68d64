pub mod error;
pub mod id;
pub mod node;
pub mod ops;
pub mod value;

// Re-export commonly used types
pub use error::CoreError;
pub use id::NodeTag;
pub use node::Node;
pub use ops::{BinaryOp, UnaryOp};
pub use value::Value;
