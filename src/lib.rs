//! workspace-sync - 浏览器内代码工作区的同步引擎
//!
//! 模块结构：
//! - models: 数据模型（FolderNode, FileNode, OpenFile）
//! - kernel: 状态机与协调层（Store, ExplorerStore, RuntimeSync, InlineCompletion）
//! - kernel::services: 端口与适配器（持久化、缓存、沙箱、模板、内容源）
//! - logging: tracing 初始化

pub mod kernel;
pub mod logging;
pub mod models;

pub use kernel::{ExplorerStore, WorkspaceServices};
pub use models::{FileId, FileNode, FolderNode, OpenFile, TreeNode};
