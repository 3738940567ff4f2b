//! Database service for finboard-service.

use crate::models::{Account, Asset, BudgetCategory, Item, ItemStatus, LinkEvent, Transaction, User};
use crate::services::aggregator::{AggregatorAccount, AggregatorTransaction};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::sync::SyncDelta;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Acquire;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Result of committing one reconciliation attempt.
pub struct SyncApplyReport {
    pub accounts: Vec<Account>,
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub accounts_created: bool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "finboard-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(auth_id = %auth_id))]
    pub async fn create_user(&self, auth_id: &str, username: &str) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users_table (id, auth_id, username)
            VALUES ($1, $2, $3)
            RETURNING id, auth_id, username, monthly_income, monthly_bills, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(auth_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("User with this auth id already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();

        info!(user_id = %user.id, "User created");

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, auth_id, username, monthly_income, monthly_bills, created_at, updated_at
            FROM users_table
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        Ok(user)
    }

    /// Delete a user; items, accounts, and transactions cascade.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users_table WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected())
    }

    /// Set the monthly income/bills figures used by the budget view.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn set_income_bills(
        &self,
        user_id: Uuid,
        monthly_income: Decimal,
        monthly_bills: Decimal,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users_table
            SET monthly_income = $2, monthly_bills = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, auth_id, username, monthly_income, monthly_bills, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(monthly_income)
        .bind(monthly_bills)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set income/bills: {}", e))
        })?;

        Ok(user)
    }

    // -------------------------------------------------------------------------
    // Item Operations
    // -------------------------------------------------------------------------

    /// Create an item for a fresh bank link. Status starts `good`, cursor unset.
    #[instrument(skip(self, access_token), fields(user_id = %user_id, institution_id = %institution_id))]
    pub async fn create_item(
        &self,
        user_id: Uuid,
        external_item_id: &str,
        access_token: &str,
        institution_id: &str,
    ) -> Result<Item, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_item"])
            .start_timer();

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items_table (id, user_id, external_item_id, access_token, institution_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, external_item_id, access_token, institution_id, status,
                      transactions_cursor, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(external_item_id)
        .bind(access_token)
        .bind(institution_id)
        .bind(ItemStatus::Good.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Institution '{}' is already linked for this user",
                    institution_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create item: {}", e)),
        })?;

        timer.observe_duration();

        info!(item_id = %item.id, "Item created");

        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, user_id, external_item_id, access_token, institution_id, status,
                   transactions_cursor, created_at, updated_at
            FROM items_table
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get item: {}", e)))?;

        Ok(item)
    }

    pub async fn get_item_by_external_id(
        &self,
        external_item_id: &str,
    ) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, user_id, external_item_id, access_token, institution_id, status,
                   transactions_cursor, created_at, updated_at
            FROM items_table
            WHERE external_item_id = $1
            "#,
        )
        .bind(external_item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get item: {}", e)))?;

        Ok(item)
    }

    pub async fn get_items_by_user(&self, user_id: Uuid) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, user_id, external_item_id, access_token, institution_id, status,
                   transactions_cursor, created_at, updated_at
            FROM items_table
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list items: {}", e)))?;

        Ok(items)
    }

    /// Read the stored sync cursor for an item.
    pub async fn get_item_cursor(&self, item_id: Uuid) -> Result<Option<String>, AppError> {
        let cursor: Option<Option<String>> = sqlx::query_scalar(
            "SELECT transactions_cursor FROM items_table WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get cursor: {}", e)))?;

        Ok(cursor.flatten())
    }

    #[instrument(skip(self), fields(item_id = %item_id, status = %status))]
    pub async fn update_item_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE items_table SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(item_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update item: {}", e)))?;

        Ok(result.rows_affected())
    }

    /// Delete an item; accounts and transactions cascade.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM items_table WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete item: {}", e)))?;

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Account / Transaction Reads
    // -------------------------------------------------------------------------

    pub async fn get_accounts_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_accounts_by_user"])
            .start_timer();

        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.id, a.item_id, a.external_account_id, a.name, a.mask, a.official_name,
                   a.current_balance, a.available_balance, a.iso_currency_code,
                   a.account_type, a.account_subtype, a.created_at, a.updated_at
            FROM accounts_table a
            JOIN items_table i ON i.id = a.item_id
            WHERE i.user_id = $1
            ORDER BY a.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list accounts: {}", e)))?;

        timer.observe_duration();

        Ok(accounts)
    }

    /// All of a user's transactions, newest first.
    pub async fn get_transactions_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_transactions_by_user"])
            .start_timer();

        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT t.id, t.account_id, t.external_transaction_id, t.name, t.amount,
                   t.category, t.subcategory, t.transaction_type, t.iso_currency_code,
                   t.date, t.pending, t.created_at, t.updated_at
            FROM transactions_table t
            JOIN accounts_table a ON a.id = t.account_id
            JOIN items_table i ON i.id = a.item_id
            WHERE i.user_id = $1
            ORDER BY t.date DESC, t.external_transaction_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list transactions: {}", e))
        })?;

        timer.observe_duration();

        Ok(transactions)
    }

    // -------------------------------------------------------------------------
    // Sync Commit
    // -------------------------------------------------------------------------

    /// Commit one reconciliation attempt atomically.
    ///
    /// Account upserts, transaction upserts, removals, and the cursor
    /// advance all happen in a single database transaction; a crash
    /// mid-commit cannot leave the cursor and the data inconsistent.
    ///
    /// When the provider reports zero accounts the whole attempt is a
    /// no-op: everything rolls back, the cursor keeps its previous value,
    /// and `accounts_created` is false so the caller can discard a
    /// freshly linked item.
    ///
    /// Individual malformed delta rows are logged and skipped (savepoint
    /// per row); one bad upstream record must not block the rest.
    #[instrument(skip(self, accounts, delta, next_cursor), fields(item_id = %item_id, account_count = accounts.len()))]
    pub async fn apply_sync(
        &self,
        item_id: Uuid,
        accounts: &[AggregatorAccount],
        delta: &SyncDelta,
        next_cursor: &str,
    ) -> Result<SyncApplyReport, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_sync"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Account upserts, keyed by (item_id, external_account_id).
        let mut upserted = Vec::with_capacity(accounts.len());
        let mut accounts_created = false;

        for account in accounts {
            let existing: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM accounts_table WHERE item_id = $1 AND external_account_id = $2",
            )
            .bind(item_id)
            .bind(&account.account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to look up account: {}", e))
            })?;

            let row = if let Some(id) = existing {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts_table
                    SET current_balance = $2, available_balance = $3, updated_at = now()
                    WHERE id = $1
                    RETURNING id, item_id, external_account_id, name, mask, official_name,
                              current_balance, available_balance, iso_currency_code,
                              account_type, account_subtype, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(account.balances.current.unwrap_or(Decimal::ZERO))
                .bind(account.balances.available.unwrap_or(Decimal::ZERO))
                .fetch_one(&mut *tx)
                .await
            } else {
                accounts_created = true;
                sqlx::query_as::<_, Account>(
                    r#"
                    INSERT INTO accounts_table
                        (id, item_id, external_account_id, name, mask, official_name,
                         current_balance, available_balance, iso_currency_code,
                         account_type, account_subtype)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING id, item_id, external_account_id, name, mask, official_name,
                              current_balance, available_balance, iso_currency_code,
                              account_type, account_subtype, created_at, updated_at
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(item_id)
                .bind(&account.account_id)
                .bind(&account.name)
                .bind(account.mask.as_deref().unwrap_or(""))
                .bind(account.official_name.as_deref().unwrap_or(""))
                .bind(account.balances.current.unwrap_or(Decimal::ZERO))
                .bind(account.balances.available.unwrap_or(Decimal::ZERO))
                .bind(account.balances.iso_currency_code.as_deref().unwrap_or(""))
                .bind(&account.account_type)
                .bind(account.subtype.as_deref().unwrap_or(""))
                .fetch_one(&mut *tx)
                .await
            }
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to upsert account: {}", e))
            })?;

            upserted.push(row);
        }

        // No accounts means the whole attempt is a no-op; the cursor must
        // not advance and the caller discards a freshly linked item.
        if upserted.is_empty() {
            tx.rollback().await.ok();
            timer.observe_duration();
            return Ok(SyncApplyReport {
                accounts: Vec::new(),
                added: 0,
                modified: 0,
                removed: 0,
                skipped: 0,
                accounts_created: false,
            });
        }

        let account_ids: HashMap<&str, Uuid> = upserted
            .iter()
            .map(|a| (a.external_account_id.as_str(), a.id))
            .collect();

        // Added and modified both upsert on the external transaction id;
        // a "modified" record for an unseen id is an insert.
        let mut added = 0usize;
        let mut modified = 0usize;
        let mut skipped = 0usize;

        let rows = delta
            .added
            .iter()
            .map(|t| (t, true))
            .chain(delta.modified.iter().map(|t| (t, false)));

        for (record, is_added) in rows {
            let Some(&account_id) = account_ids.get(record.account_id.as_str()) else {
                warn!(
                    external_transaction_id = %record.transaction_id,
                    external_account_id = %record.account_id,
                    "Skipping delta row for unknown account"
                );
                skipped += 1;
                continue;
            };

            // Savepoint per row: a malformed record rolls back alone and
            // the rest of the batch proceeds.
            let mut sp = tx.begin().await.map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create savepoint: {}", e))
            })?;

            let result = upsert_transaction(&mut sp, account_id, record).await;

            match result {
                Ok(()) => {
                    sp.commit().await.map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to release savepoint: {}",
                            e
                        ))
                    })?;
                    if is_added {
                        added += 1;
                    } else {
                        modified += 1;
                    }
                }
                Err(e) => {
                    sp.rollback().await.ok();
                    warn!(
                        external_transaction_id = %record.transaction_id,
                        error = %e,
                        "Skipping malformed transaction row"
                    );
                    skipped += 1;
                }
            }
        }

        // Removals, keyed by external transaction id.
        let removed = if delta.removed.is_empty() {
            0
        } else {
            sqlx::query("DELETE FROM transactions_table WHERE external_transaction_id = ANY($1)")
                .bind(&delta.removed)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to delete removed transactions: {}",
                        e
                    ))
                })?
                .rows_affected() as usize
        };

        // Cursor advances only inside this committed transaction.
        sqlx::query(
            "UPDATE items_table SET transactions_cursor = $2, updated_at = now() WHERE id = $1",
        )
        .bind(item_id)
        .bind(next_cursor)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to advance cursor: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit sync: {}", e))
        })?;

        timer.observe_duration();

        info!(
            item_id = %item_id,
            added = added,
            modified = modified,
            removed = removed,
            skipped = skipped,
            "Sync committed"
        );

        Ok(SyncApplyReport {
            accounts: upserted,
            added,
            modified,
            removed,
            skipped,
            accounts_created,
        })
    }

    // -------------------------------------------------------------------------
    // Asset Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_asset(
        &self,
        user_id: Uuid,
        description: &str,
        value: Decimal,
    ) -> Result<Asset, AppError> {
        let asset = sqlx::query_as::<_, Asset>(
            r#"
            INSERT INTO assets_table (id, user_id, description, value)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, description, value, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(description)
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create asset: {}", e)))?;

        Ok(asset)
    }

    pub async fn get_assets_by_user(&self, user_id: Uuid) -> Result<Vec<Asset>, AppError> {
        let assets = sqlx::query_as::<_, Asset>(
            r#"
            SELECT id, user_id, description, value, created_at, updated_at
            FROM assets_table
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list assets: {}", e)))?;

        Ok(assets)
    }

    #[instrument(skip(self), fields(asset_id = %asset_id))]
    pub async fn delete_asset(&self, asset_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM assets_table WHERE id = $1")
            .bind(asset_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete asset: {}", e))
            })?;

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Budget Category Operations
    // -------------------------------------------------------------------------

    /// Create a budget bucket. `remaining` is derived, not client-supplied.
    #[instrument(skip(self), fields(user_id = %user_id, category = %category))]
    pub async fn create_budget_category(
        &self,
        user_id: Uuid,
        category: &str,
        budgeted: Decimal,
        actual: Decimal,
    ) -> Result<BudgetCategory, AppError> {
        let row = sqlx::query_as::<_, BudgetCategory>(
            r#"
            INSERT INTO budget_categories_table (id, user_id, category, budgeted, actual, remaining)
            VALUES ($1, $2, $3, $4, $5, $4 - $5)
            RETURNING id, user_id, category, budgeted, actual, remaining, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(category)
        .bind(budgeted)
        .bind(actual)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Budget category '{}' already exists for this user",
                    category
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create category: {}", e)),
        })?;

        Ok(row)
    }

    pub async fn list_budget_categories(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BudgetCategory>, AppError> {
        let rows = sqlx::query_as::<_, BudgetCategory>(
            r#"
            SELECT id, user_id, category, budgeted, actual, remaining, created_at, updated_at
            FROM budget_categories_table
            WHERE user_id = $1
            ORDER BY category
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list categories: {}", e)))?;

        Ok(rows)
    }

    #[instrument(skip(self), fields(user_id = %user_id, category = %category))]
    pub async fn update_budget_category(
        &self,
        user_id: Uuid,
        category: &str,
        budgeted: Decimal,
        actual: Decimal,
    ) -> Result<Option<BudgetCategory>, AppError> {
        let row = sqlx::query_as::<_, BudgetCategory>(
            r#"
            UPDATE budget_categories_table
            SET budgeted = $3, actual = $4, remaining = $3 - $4, updated_at = now()
            WHERE user_id = $1 AND category = $2
            RETURNING id, user_id, category, budgeted, actual, remaining, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(budgeted)
        .bind(actual)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update category: {}", e)))?;

        Ok(row)
    }

    // -------------------------------------------------------------------------
    // Link Event Operations
    // -------------------------------------------------------------------------

    /// Append one link-flow telemetry record. These rows are never updated.
    #[instrument(skip(self), fields(event_type = %event_type))]
    pub async fn create_link_event(
        &self,
        user_id: Option<Uuid>,
        event_type: &str,
        link_session_id: &str,
        request_id: &str,
        error_type: &str,
        error_code: &str,
    ) -> Result<LinkEvent, AppError> {
        let event = sqlx::query_as::<_, LinkEvent>(
            r#"
            INSERT INTO link_events_table
                (id, user_id, event_type, link_session_id, request_id, error_type, error_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, event_type, link_session_id, request_id,
                      error_type, error_code, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_type)
        .bind(link_session_id)
        .bind(request_id)
        .bind(error_type)
        .bind(error_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record event: {}", e)))?;

        Ok(event)
    }
}

/// Insert-or-update one delta row, normalizing at the commit boundary:
/// the provider's outflow-positive amount is negated, and optional
/// string fields default to empty string so downstream formatting stays
/// total.
async fn upsert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
    record: &AggregatorTransaction,
) -> Result<(), sqlx::Error> {
    let (category, subcategory) = match &record.category {
        Some(path) => (
            path.first().cloned().unwrap_or_default(),
            path.get(1).cloned().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    sqlx::query(
        r#"
        INSERT INTO transactions_table
            (id, account_id, external_transaction_id, name, amount, category,
             subcategory, transaction_type, iso_currency_code, date, pending)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (external_transaction_id) DO UPDATE SET
            account_id = EXCLUDED.account_id,
            name = EXCLUDED.name,
            amount = EXCLUDED.amount,
            category = EXCLUDED.category,
            subcategory = EXCLUDED.subcategory,
            transaction_type = EXCLUDED.transaction_type,
            iso_currency_code = EXCLUDED.iso_currency_code,
            date = EXCLUDED.date,
            pending = EXCLUDED.pending,
            updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(&record.transaction_id)
    .bind(&record.name)
    .bind(-record.amount)
    .bind(category)
    .bind(subcategory)
    .bind(record.transaction_type.as_deref().unwrap_or(""))
    .bind(record.iso_currency_code.as_deref().unwrap_or(""))
    .bind(record.date)
    .bind(record.pending)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
