//! Shared helpers: paths, encoding, hashing and text truncation.

pub mod encoding;
pub mod hashing;
pub mod paths;
pub mod text;

pub use encoding::{control_char_ratio, is_binary_file, read_file_safe};
pub use hashing::short_hash;
pub use paths::normalize_path;
pub use text::{truncate_head, truncate_tail};
