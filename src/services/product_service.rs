use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::products::{
        CategoryList, CreateCategoryRequest, CreateProductRequest, ProductList,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthAdmin,
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, category_id, image_url, created_at";

pub async fn list_products(
    pool: &DbPool,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut builder = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");

    for b in [&mut builder, &mut count_builder] {
        if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            b.push(" AND (name ILIKE ").push_bind(pattern.clone());
            b.push(" OR description ILIKE ").push_bind(pattern);
            b.push(")");
        }
        if let Some(category_id) = query.category_id {
            b.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(min_price) = query.min_price {
            b.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = query.max_price {
            b.push(" AND price <= ").push_bind(max_price);
        }
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    builder.push(format!(" ORDER BY {} {}", sort_by.as_sql(), sort_order.as_sql()));
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let items: Vec<Product> = builder.build_query_as().fetch_all(pool).await?;
    let total: (i64,) = count_builder.build_query_as().fetch_one(pool).await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product: Option<Product> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match product {
        Some(p) => Ok(ApiResponse::success("Product", p, None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> =
        sqlx::query_as("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(pool)
            .await?;

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    pool: &DbPool,
    admin: &AuthAdmin,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_price(payload.price)?;

    let product: Product = sqlx::query_as(&format!(
        r#"
        INSERT INTO products (id, name, description, price, stock, category_id, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.category_id)
    .bind(payload.image_url)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(admin.admin_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    pool: &DbPool,
    admin: &AuthAdmin,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing: Option<Product> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.or(existing.description);
    let price = payload.price.unwrap_or(existing.price);
    let stock = payload.stock.unwrap_or(existing.stock);
    let category_id = payload.category_id.or(existing.category_id);
    let image_url = payload.image_url.or(existing.image_url);

    validate_price(price)?;

    let product: Product = sqlx::query_as(&format!(
        r#"
        UPDATE products
        SET name = $2, description = $3, price = $4, stock = $5, category_id = $6, image_url = $7
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(stock)
    .bind(category_id)
    .bind(image_url)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(admin.admin_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    pool: &DbPool,
    admin: &AuthAdmin,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(admin.admin_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    pool: &DbPool,
    admin: &AuthAdmin,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let category: Category = sqlx::query_as(
        "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.trim())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(admin.admin_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    pool: &DbPool,
    admin: &AuthAdmin,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(admin.admin_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest("price must be a non-negative number".into()));
    }
    Ok(())
}
