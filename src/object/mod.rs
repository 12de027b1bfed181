pub mod block;
pub mod node;
pub mod proto;
pub mod unixfs;

pub use block::{block_exists, block_path, read_block, write_block};
pub use node::{decode_node, encode_node, encoded_node_len};
pub use unixfs::{decode_envelope, encode_envelope};
