//! Postgres-backed document store.
//!
//! Aggregates are stored as JSONB documents (schema in
//! `migrations/0001_commerce.sql`). Mutation closures run inside a transaction
//! that holds the row lock (`SELECT ... FOR UPDATE`), so concurrent writers to
//! the same document serialize.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DomainError |
//! |------------|-----------------------|-------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Infrastructure` |
//! | PoolClosed / network / decode | N/A | `Infrastructure` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use forgeshop_carts::{Cart, CartEvent};
use forgeshop_categories::{Category, CategoryId};
use forgeshop_core::{AggregateRoot, DomainError, DomainResult, Page, PageRequest, UserId};
use forgeshop_orders::{Order, OrderEvent, OrderFilter, OrderId};
use forgeshop_products::{FilterCriterion, Product, ProductFilter, ProductId};
use forgeshop_reviews::{RatingSummary, Review};

use super::{
    CartMutation, CartStore, CategoryMutation, CategoryStore, OrderMutation, OrderStore,
    ProductMutation, ProductStore, ReviewStore,
};

const MIGRATION: &str = include_str!("../../migrations/0001_commerce.sql");

/// Postgres implementation of every store trait over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the commerce schema. Idempotent.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> DomainResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DomainError::Conflict(msg),
                _ => DomainError::Infrastructure(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            DomainError::infrastructure(format!("connection pool closed in {operation}"))
        }
        _ => DomainError::infrastructure(format!("sqlx error in {operation}: {err}")),
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> DomainResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

/// Roll back and hand `err` back to the caller.
async fn abort(tx: Transaction<'_, Postgres>, err: DomainError) -> DomainError {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
    err
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> DomainResult<T> {
    let Json(doc) = row
        .try_get::<Json<T>, _>("doc")
        .map_err(|e| map_sqlx_error("decode_document", e))?;
    Ok(doc)
}

fn decode_all<T: DeserializeOwned>(rows: &[PgRow]) -> DomainResult<Vec<T>> {
    rows.iter().map(decode).collect()
}

fn json<T: Serialize>(value: &T) -> Json<&T> {
    Json(value)
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (i64::from(page.limit), page.offset() as i64)
}

fn page_of<T>(items: Vec<T>, page: PageRequest, total: i64) -> Page<T> {
    Page {
        items,
        page: page.page,
        limit: page.limit,
        total: total.max(0) as u64,
    }
}

fn category_ids(ids: &[CategoryId]) -> Vec<Uuid> {
    ids.iter().map(|id| Uuid::from(id.0)).collect()
}

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn insert(&self, category: Category) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, slug, parent_id, level, path, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(category.id.0))
        .bind(&category.slug)
        .bind(category.parent_id.map(|p| Uuid::from(p.0)))
        .bind(category.level as i32)
        .bind(category_ids(&category.path))
        .bind(json(&category))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn get(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        let row = sqlx::query("SELECT doc FROM categories WHERE id = $1")
            .bind(Uuid::from(id.0))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> DomainResult<Option<Category>> {
        let row = sqlx::query("SELECT doc FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category_by_slug", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, mutation), fields(category_id = %id), err)]
    async fn modify(&self, id: CategoryId, mutation: CategoryMutation) -> DomainResult<Category> {
        let mut tx = self.begin().await?;
        let row = sqlx::query("SELECT doc FROM categories WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id.0))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_category", e))?;
        let Some(row) = row else {
            return Err(abort(tx, DomainError::not_found(format!("category {id}"))).await);
        };
        let mut category: Category = decode(&row)?;
        if let Err(err) = mutation(&mut category) {
            return Err(abort(tx, err).await);
        }
        if category.id != id {
            return Err(abort(tx, DomainError::invariant("category id cannot change")).await);
        }

        sqlx::query("UPDATE categories SET slug = $2, doc = $3 WHERE id = $1")
            .bind(Uuid::from(id.0))
            .bind(&category.slug)
            .bind(json(&category))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        commit(tx).await?;
        Ok(category)
    }

    async fn delete(&self, id: CategoryId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(Uuid::from(id.0))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("category {id}")));
        }
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> DomainResult<Page<Category>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query("SELECT doc FROM categories ORDER BY level, slug LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_categories", e))?;
        Ok(page_of(decode_all(&rows)?, page, total))
    }

    async fn list_roots(&self) -> DomainResult<Vec<Category>> {
        let rows = sqlx::query("SELECT doc FROM categories WHERE parent_id IS NULL ORDER BY slug")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_root_categories", e))?;
        decode_all(&rows)
    }

    async fn list_children(&self, parent_id: CategoryId) -> DomainResult<Vec<Category>> {
        let rows = sqlx::query("SELECT doc FROM categories WHERE parent_id = $1 ORDER BY slug")
            .bind(Uuid::from(parent_id.0))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_child_categories", e))?;
        decode_all(&rows)
    }

    async fn list_descendants(&self, root: CategoryId) -> DomainResult<Vec<Category>> {
        let rows = sqlx::query("SELECT doc FROM categories WHERE path @> ARRAY[$1]::uuid[]")
            .bind(Uuid::from(root.0))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_descendant_categories", e))?;
        decode_all(&rows)
    }

    async fn has_children(&self, id: CategoryId) -> DomainResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE parent_id = $1)")
            .bind(Uuid::from(id.0))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("category_has_children", e))
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert(&self, product: Product) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, stock, category_ids, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(product.id.0))
        .bind(&product.sku)
        .bind(product.stock)
        .bind(category_ids(&product.category_ids))
        .bind(json(&product))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get(&self, id: ProductId) -> DomainResult<Option<Product>> {
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1")
            .bind(Uuid::from(id.0))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, mutation), fields(product_id = %id), err)]
    async fn modify(&self, id: ProductId, mutation: ProductMutation) -> DomainResult<Product> {
        let mut tx = self.begin().await?;
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id.0))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        let Some(row) = row else {
            return Err(abort(tx, DomainError::not_found(format!("product {id}"))).await);
        };
        let mut product: Product = decode(&row)?;
        if let Err(err) = mutation(&mut product) {
            return Err(abort(tx, err).await);
        }
        if product.id != id {
            return Err(abort(tx, DomainError::invariant("product id cannot change")).await);
        }

        sqlx::query(
            r#"
            UPDATE products
            SET sku = $2, stock = $3, category_ids = $4, doc = $5
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id.0))
        .bind(&product.sku)
        .bind(product.stock)
        .bind(category_ids(&product.category_ids))
        .bind(json(&product))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        commit(tx).await?;
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(Uuid::from(id.0))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("product {id}")));
        }
        Ok(())
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DomainResult<Page<Product>> {
        // SKU and category membership are pushed down; the remaining criteria
        // (price, stock, attributes) are evaluated on the decoded documents.
        let sku = filter.criteria().iter().find_map(|c| match c {
            FilterCriterion::Sku(sku) => Some(sku.clone()),
            _ => None,
        });
        let categories: Vec<Uuid> = filter
            .criteria()
            .iter()
            .filter_map(|c| match c {
                FilterCriterion::Category(id) => Some(Uuid::from(id.0)),
                _ => None,
            })
            .collect();

        let rows = sqlx::query(
            r#"
            SELECT doc FROM products
            WHERE ($1::text IS NULL OR sku = $1)
              AND category_ids @> $2::uuid[]
            ORDER BY sku
            "#,
        )
        .bind(sku)
        .bind(categories)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let matching: Vec<Product> = decode_all::<Product>(&rows)?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        Ok(page.paginate(matching))
    }

    async fn list_in_categories(
        &self,
        category_ids_in: &[CategoryId],
        page: PageRequest,
    ) -> DomainResult<Page<Product>> {
        let ids = category_ids(category_ids_in);
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query(
            r#"
            SELECT doc FROM products
            WHERE category_ids && $1::uuid[]
            ORDER BY sku
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&ids)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products_in_categories", e))?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_ids && $1::uuid[]")
                .bind(&ids)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("count_products_in_categories", e))?;
        Ok(page_of(decode_all(&rows)?, page, total))
    }

    async fn count_in_category(&self, category_id: CategoryId) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE $1 = ANY(category_ids)")
            .bind(Uuid::from(category_id.0))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products_in_category", e))?;
        Ok(count.max(0) as u64)
    }

    /// Single conditional `UPDATE`; concurrent callers cannot drive stock below zero.
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> DomainResult<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2,
                doc = jsonb_set(
                    jsonb_set(doc, '{stock}', to_jsonb(stock + $2)),
                    '{updated_at}', to_jsonb($3::timestamptz)
                )
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING doc
            "#,
        )
        .bind(Uuid::from(id.0))
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        if let Some(row) = row {
            return decode(&row);
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(Uuid::from(id.0))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_stock", e))?;
        match available {
            Some(available) => Err(DomainError::insufficient_stock(id, -delta, available)),
            None => Err(DomainError::not_found(format!("product {id}"))),
        }
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn get(&self, user_id: UserId) -> DomainResult<Option<Cart>> {
        let row = sqlx::query("SELECT doc FROM carts WHERE user_id = $1")
            .bind(Uuid::from(user_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_cart", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn get_or_create(&self, user_id: UserId) -> DomainResult<Cart> {
        let fresh = Cart::new(user_id, Utc::now());
        sqlx::query("INSERT INTO carts (user_id, doc) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(Uuid::from(user_id))
            .bind(json(&fresh))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_cart", e))?;
        CartStore::get(self, user_id)
            .await?
            .ok_or_else(|| DomainError::infrastructure("cart vanished after creation"))
    }

    #[instrument(skip(self, mutation), fields(user_id = %user_id), err)]
    async fn update(
        &self,
        user_id: UserId,
        mutation: CartMutation,
    ) -> DomainResult<(Cart, Vec<CartEvent>)> {
        let mut tx = self.begin().await?;
        let fresh = Cart::new(user_id, Utc::now());
        sqlx::query("INSERT INTO carts (user_id, doc) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(Uuid::from(user_id))
            .bind(json(&fresh))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_cart", e))?;
        let row = sqlx::query("SELECT doc FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(Uuid::from(user_id))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_cart", e))?;
        let mut cart: Cart = decode(&row)?;
        let events = match mutation(&mut cart) {
            Ok(events) => events,
            Err(err) => return Err(abort(tx, err).await),
        };

        sqlx::query("UPDATE carts SET doc = $2, updated_at = $3 WHERE user_id = $1")
            .bind(Uuid::from(user_id))
            .bind(json(&cart))
            .bind(cart.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_cart", e))?;
        commit(tx).await?;
        Ok((cart, events))
    }
}

const ORDER_FILTER_SQL: &str = r#"
    ($1::uuid IS NULL OR customer_id = $1)
    AND ($2::text IS NULL OR status = $2)
    AND ($3::jsonb IS NULL OR doc -> 'items' @> $3)
    AND ($4::timestamptz IS NULL OR created_at >= $4)
    AND ($5::timestamptz IS NULL OR created_at < $5)
"#;

struct OrderFilterBinds {
    customer_id: Option<Uuid>,
    status: Option<String>,
    items: Option<Json<serde_json::Value>>,
    created_from: Option<DateTime<Utc>>,
    created_to: Option<DateTime<Utc>>,
}

impl From<&OrderFilter> for OrderFilterBinds {
    fn from(filter: &OrderFilter) -> Self {
        Self {
            customer_id: filter.customer_id.map(Uuid::from),
            status: filter.status.map(|s| s.as_str().to_string()),
            items: filter
                .product_id
                .map(|p| Json(json!([{ "product_id": Uuid::from(p.0) }]))),
            created_from: filter.created_from,
            created_to: filter.created_to,
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert(&self, order: Order) -> DomainResult<()> {
        let created_at = order
            .created_at()
            .ok_or_else(|| DomainError::invariant("cannot persist an order that was never placed"))?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(order.id().0))
        .bind(Uuid::from(order.customer_id()))
        .bind(order.status().as_str())
        .bind(created_at)
        .bind(json(&order))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> DomainResult<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(Uuid::from(id.0))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, mutation), fields(order_id = %id), err)]
    async fn update(
        &self,
        id: OrderId,
        mutation: OrderMutation,
    ) -> DomainResult<(Order, Vec<OrderEvent>)> {
        let mut tx = self.begin().await?;
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id.0))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;
        let Some(row) = row else {
            return Err(abort(tx, DomainError::not_found(format!("order {id}"))).await);
        };
        let mut order: Order = decode(&row)?;
        let events = match mutation(&mut order) {
            Ok(events) => events,
            Err(err) => return Err(abort(tx, err).await),
        };

        sqlx::query("UPDATE orders SET status = $2, doc = $3 WHERE id = $1")
            .bind(Uuid::from(id.0))
            .bind(order.status().as_str())
            .bind(json(&order))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?;
        commit(tx).await?;
        Ok((order, events))
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DomainResult<Page<Order>> {
        let binds = OrderFilterBinds::from(filter);
        let (limit, offset) = limit_offset(page);

        let list_sql = format!(
            "SELECT doc FROM orders WHERE {ORDER_FILTER_SQL} ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        );
        let rows = sqlx::query(&list_sql)
            .bind(binds.customer_id)
            .bind(binds.status.clone())
            .bind(binds.items.clone())
            .bind(binds.created_from)
            .bind(binds.created_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let count_sql = format!("SELECT COUNT(*) FROM orders WHERE {ORDER_FILTER_SQL}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(binds.customer_id)
            .bind(binds.status)
            .bind(binds.items)
            .bind(binds.created_from)
            .bind(binds.created_to)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;

        Ok(page_of(decode_all(&rows)?, page, total))
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    async fn insert(&self, review: Review) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, product_id, order_id, rating, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::from(review.id.0))
        .bind(Uuid::from(review.user_id))
        .bind(Uuid::from(review.product_id.0))
        .bind(Uuid::from(review.order_id.0))
        .bind(i16::from(review.rating))
        .bind(review.created_at)
        .bind(json(&review))
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_review", e) {
            DomainError::Conflict(_) => {
                DomainError::conflict("this purchase has already been reviewed")
            }
            other => other,
        })?;
        Ok(())
    }

    async fn find_by_triple(
        &self,
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
    ) -> DomainResult<Option<Review>> {
        let row = sqlx::query(
            "SELECT doc FROM reviews WHERE user_id = $1 AND product_id = $2 AND order_id = $3",
        )
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(product_id.0))
        .bind(Uuid::from(order_id.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_review", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> DomainResult<Page<Review>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query(
            r#"
            SELECT doc FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(Uuid::from(product_id.0))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reviews", e))?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
            .bind(Uuid::from(product_id.0))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_reviews", e))?;
        Ok(page_of(decode_all(&rows)?, page, total))
    }

    async fn rating_summary(&self, product_id: ProductId) -> DomainResult<RatingSummary> {
        let rows = sqlx::query(
            "SELECT rating, COUNT(*) AS n FROM reviews WHERE product_id = $1 GROUP BY rating",
        )
        .bind(Uuid::from(product_id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("rating_summary", e))?;

        let mut distribution = [0u64; 5];
        for row in rows {
            let rating: i16 = row
                .try_get("rating")
                .map_err(|e| map_sqlx_error("rating_summary", e))?;
            let n: i64 = row
                .try_get("n")
                .map_err(|e| map_sqlx_error("rating_summary", e))?;
            if let Some(slot) = usize::try_from(rating - 1)
                .ok()
                .and_then(|idx| distribution.get_mut(idx))
            {
                *slot = n.max(0) as u64;
            }
        }
        Ok(RatingSummary::from_distribution(distribution))
    }
}
