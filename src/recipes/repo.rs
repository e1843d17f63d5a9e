use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

pub async fn list_tags(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name
        FROM tags
        WHERE user_id = $1
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_tag(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(tag)
}

/// `assigned_only` keeps only ingredients referenced by at least one recipe;
/// the EXISTS collapses multiple references to one row.
pub async fn list_ingredients(
    db: &PgPool,
    user_id: Uuid,
    assigned_only: bool,
) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, user_id, name
        FROM ingredients i
        WHERE user_id = $1
          AND (NOT $2 OR EXISTS (
              SELECT 1 FROM recipe_ingredients ri WHERE ri.ingredient_id = i.id
          ))
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .bind(assigned_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_ingredient(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
) -> anyhow::Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(ingredient)
}

/// Owner-scoped listing with optional tag/ingredient id filters: OR within a
/// list, AND between the two dimensions, NULL meaning no filter.
pub async fn list_recipes(
    db: &PgPool,
    user_id: Uuid,
    tag_ids: Option<&[i64]>,
    ingredient_ids: Option<&[i64]>,
) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, link, image, created_at
        FROM recipes r
        WHERE user_id = $1
          AND ($2::bigint[] IS NULL OR EXISTS (
              SELECT 1 FROM recipe_tags rt
              WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
          ))
          AND ($3::bigint[] IS NULL OR EXISTS (
              SELECT 1 FROM recipe_ingredients ri
              WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)
          ))
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .bind(tag_ids)
    .bind(ingredient_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_recipe(db: &PgPool, user_id: Uuid, id: i64) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, link, image, created_at
        FROM recipes
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(recipe)
}

pub async fn insert_recipe(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    link: &str,
) -> anyhow::Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (user_id, title, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, title, time_minutes, price, link, image, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(link)
    .fetch_one(&mut **tx)
    .await?;
    Ok(recipe)
}

pub async fn update_recipe_scalars(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    link: &str,
) -> anyhow::Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET title = $2, time_minutes = $3, price = $4, link = $5
        WHERE id = $1
        RETURNING id, user_id, title, time_minutes, price, link, image, created_at
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(link)
    .fetch_one(&mut **tx)
    .await?;
    Ok(recipe)
}

pub async fn delete_recipe(db: &PgPool, user_id: Uuid, id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM recipes WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_image(db: &PgPool, id: i64, image: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE recipes SET image = $2 WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(image)
    .execute(db)
    .await?;
    Ok(())
}

/// Replaces the recipe's tag links with exactly `tag_ids`.
pub async fn set_tag_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM recipe_tags WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, unnest($2::bigint[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Replaces the recipe's ingredient links with exactly `ingredient_ids`.
pub async fn set_ingredient_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredient_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM recipe_ingredients WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id)
        SELECT $1, unnest($2::bigint[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(ingredient_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn linked_tag_ids(db: &PgPool, recipe_id: i64) -> anyhow::Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT tag_id FROM recipe_tags WHERE recipe_id = $1 ORDER BY tag_id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

pub async fn linked_ingredient_ids(db: &PgPool, recipe_id: i64) -> anyhow::Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT ingredient_id FROM recipe_ingredients WHERE recipe_id = $1 ORDER BY ingredient_id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

pub async fn linked_tags(db: &PgPool, recipe_id: i64) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.user_id, t.name
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn linked_ingredients(db: &PgPool, recipe_id: i64) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT i.id, i.user_id, i.name
        FROM ingredients i
        JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
        WHERE ri.recipe_id = $1
        ORDER BY i.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_existing_tags(db: &PgPool, ids: &[i64]) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT count(*) FROM tags WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn count_existing_ingredients(db: &PgPool, ids: &[i64]) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT count(*) FROM ingredients WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_one(db)
    .await?;
    Ok(count)
}
