mod envelope;
mod node;

pub use envelope::{DataType, Envelope};
pub use node::{validate_link_name, Link, Node};
