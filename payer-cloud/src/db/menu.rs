//! Menu database operations (PostgreSQL)

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    MenuItem, MenuItemCreate, MenuItemUpdate, SpecOption, Specification, SpecificationInput,
};
use sqlx::PgConnection;
use std::collections::HashMap;

use super::{MenuRepository, PgStore};
use crate::error::{ServiceError, ServiceResult, is_foreign_key_violation};

const ITEM_COLUMNS: &str =
    "id, merchant_id, name, price, original_price, description, image_url, is_available";

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: i64,
    merchant_id: i64,
    name: String,
    price: Decimal,
    original_price: Option<Decimal>,
    description: Option<String>,
    image_url: Option<String>,
    is_available: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct SpecificationRow {
    id: i64,
    menu_item_id: i64,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SpecOptionRow {
    id: i64,
    specification_id: i64,
    name: String,
    price_change: Decimal,
}

/// Load specifications + options for the given item rows and assemble full items
async fn with_specifications(
    conn: &mut PgConnection,
    rows: Vec<MenuItemRow>,
) -> ServiceResult<Vec<MenuItem>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let specs: Vec<SpecificationRow> = sqlx::query_as(
        "SELECT id, menu_item_id, name FROM specifications \
         WHERE menu_item_id = ANY($1) ORDER BY menu_item_id, display_order, id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let options: Vec<SpecOptionRow> = sqlx::query_as(
        r#"
        SELECT o.id, o.specification_id, o.name, o.price_change
        FROM spec_options o
        JOIN specifications s ON s.id = o.specification_id
        WHERE s.menu_item_id = ANY($1)
        ORDER BY o.specification_id, o.display_order, o.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut options_by_spec: HashMap<i64, Vec<SpecOption>> = HashMap::new();
    for o in options {
        options_by_spec
            .entry(o.specification_id)
            .or_default()
            .push(SpecOption {
                id: o.id,
                name: o.name,
                price_change: o.price_change,
            });
    }

    let mut specs_by_item: HashMap<i64, Vec<Specification>> = HashMap::new();
    for s in specs {
        specs_by_item
            .entry(s.menu_item_id)
            .or_default()
            .push(Specification {
                id: s.id,
                name: s.name,
                options: options_by_spec.remove(&s.id).unwrap_or_default(),
            });
    }

    Ok(rows
        .into_iter()
        .map(|r| MenuItem {
            specifications: specs_by_item.remove(&r.id).unwrap_or_default(),
            id: r.id,
            merchant_id: r.merchant_id,
            name: r.name,
            price: r.price,
            original_price: r.original_price,
            description: r.description,
            image_url: r.image_url,
            is_available: r.is_available,
        })
        .collect())
}

async fn insert_specifications(
    conn: &mut PgConnection,
    menu_item_id: i64,
    specs: &[SpecificationInput],
) -> Result<(), sqlx::Error> {
    for (spec_order, spec) in specs.iter().enumerate() {
        let (spec_id,): (i64,) = sqlx::query_as(
            "INSERT INTO specifications (menu_item_id, name, display_order) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(menu_item_id)
        .bind(&spec.name)
        .bind(spec_order as i32)
        .fetch_one(&mut *conn)
        .await?;

        for (option_order, option) in spec.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO spec_options (specification_id, name, price_change, display_order) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(spec_id)
            .bind(&option.name)
            .bind(option.price_change)
            .bind(option_order as i32)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn load_item(conn: &mut PgConnection, id: i64) -> ServiceResult<Option<MenuItem>> {
    let row: Option<MenuItemRow> =
        sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(row) => Ok(with_specifications(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl MenuRepository for PgStore {
    async fn find_items_for_merchant(
        &self,
        merchant_id: i64,
        ids: &[i64],
    ) -> ServiceResult<Vec<MenuItem>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<MenuItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items WHERE merchant_id = $1 AND id = ANY($2)"
        ))
        .bind(merchant_id)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
        with_specifications(&mut conn, rows).await
    }

    async fn list_menu(
        &self,
        merchant_id: i64,
        available_only: bool,
    ) -> ServiceResult<Vec<MenuItem>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<MenuItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items \
             WHERE merchant_id = $1 AND ($2 = FALSE OR is_available) ORDER BY id"
        ))
        .bind(merchant_id)
        .bind(available_only)
        .fetch_all(&mut *conn)
        .await?;
        with_specifications(&mut conn, rows).await
    }

    async fn create_menu_item(&self, data: &MenuItemCreate) -> ServiceResult<MenuItem> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO menu_items (merchant_id, name, price, original_price, description, image_url, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(data.merchant_id)
        .bind(&data.name)
        .bind(data.price)
        .bind(data.original_price)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(data.is_available.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        if let Some(specs) = &data.specifications {
            insert_specifications(&mut tx, id, specs).await?;
        }

        let item = load_item(&mut tx, id).await?;
        tx.commit().await?;
        item.ok_or_else(|| ServiceError::Db(format!("menu item {id} vanished after insert").into()))
    }

    async fn update_menu_item(
        &self,
        id: i64,
        data: &MenuItemUpdate,
    ) -> ServiceResult<Option<MenuItem>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE menu_items SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                original_price = COALESCE($4, original_price),
                description = COALESCE($5, description),
                image_url = COALESCE($6, image_url),
                is_available = COALESCE($7, is_available),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.price)
        .bind(data.original_price)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(data.is_available)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(specs) = &data.specifications {
            sqlx::query("DELETE FROM specifications WHERE menu_item_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_specifications(&mut tx, id, specs).await?;
        }

        let item = load_item(&mut tx, id).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn delete_menu_item(&self, id: i64) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Options go with their specifications via ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::App(AppError::with_message(
                        ErrorCode::MenuItemInUse,
                        format!("Menu item {id} is referenced by existing orders"),
                    ))
                } else {
                    e.into()
                }
            })?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn merchant_exists(&self, merchant_id: i64) -> ServiceResult<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM merchants WHERE id = $1)")
                .bind(merchant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }
}
