pub mod account;
pub mod asset;
pub mod budget;
pub mod item;
pub mod link_event;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use asset::Asset;
pub use budget::BudgetCategory;
pub use item::{Item, ItemStatus};
pub use link_event::{LinkEvent, LinkEventType};
pub use transaction::Transaction;
pub use user::User;
