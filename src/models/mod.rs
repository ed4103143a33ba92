//! 数据模型层

pub mod file_tree;
pub mod listing;
pub mod open_file;

pub use file_tree::{FileId, FileNode, FolderNode, TreeError, TreeNode};
pub use listing::{
    build_tree_from_listing, is_placeholder, placeholder_content, split_file_name, ListingEntry,
    PLACEHOLDER_MARKER,
};
pub use open_file::OpenFile;
