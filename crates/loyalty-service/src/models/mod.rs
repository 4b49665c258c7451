//! 领域模型定义

mod balance;
mod order;
mod user;
mod withdrawal;

pub use balance::Balance;
pub use order::{Order, OrderStatus, OrderUpdate, PendingOrder};
pub use user::User;
pub use withdrawal::Withdrawal;
