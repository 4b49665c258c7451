//! 存储层
//!
//! 唯一持久状态入口。各聚合的操作按文件拆分在同级模块的
//! `impl Storage` 块里，事务边界在每个操作内部。

mod balance;
mod orders;
mod storage;
mod users;
mod withdrawals;

pub use storage::Storage;
