//! 文件名处理
//!
//! 把下载站点生成的文件名整理为 `Author - Title` 形式，并在目标已存在时
//! 生成不冲突的兄弟路径。

mod collision;
mod filename;

pub use collision::{resolve_collision_with, unique_path};
pub use filename::{sanitize, FilenameNormalizer, ILLEGAL_CHARS};
