pub mod assets;
pub mod budgets;
pub mod health;
pub mod items;
pub mod link;
pub mod users;

pub use assets::{create_asset, delete_asset, get_user_assets};
pub use budgets::{create_budget_category, list_budget_categories, update_budget_category};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use items::{create_item, delete_item, sync_item, update_item_status};
pub use link::{create_link_token, record_link_event};
pub use users::{
    create_user, delete_user, get_income_bills, get_user, get_user_accounts, get_user_items,
    get_user_recurring_transactions, get_user_transactions, set_income_bills,
};
