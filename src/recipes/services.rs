use std::collections::BTreeSet;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::dto::{RecipePatchRequest, RecipeWriteRequest};
use super::repo::{self, Recipe};
use crate::error::ApiError;

/// Parses a comma-separated id list query value. An absent or empty value
/// means no filter; a non-integer element is a client error.
pub fn parse_id_list(field: &str, raw: Option<&str>) -> Result<Option<Vec<i64>>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let id = part
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::field(field, format!("'{}' is not a valid id", part)))?;
        ids.push(id);
    }
    Ok(Some(ids))
}

/// Boolean-ish integer query value: absent/empty/`0` is false, any other
/// integer is true, anything else is a client error.
pub fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, ApiError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    if raw.is_empty() {
        return Ok(false);
    }
    let value = raw
        .parse::<i64>()
        .map_err(|_| ApiError::field(field, format!("'{}' is not a valid flag", raw)))?;
    Ok(value != 0)
}

pub fn check_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::field("name", "must not be empty"));
    }
    Ok(())
}

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::field("title", "must not be empty"));
    }
    Ok(())
}

/// The price column is NUMERIC(5, 2): two decimal places, five digits total.
fn check_price(price: Decimal) -> Result<(), ApiError> {
    if price != price.round_dp(2) {
        return Err(ApiError::field(
            "price",
            "no more than 2 decimal places allowed",
        ));
    }
    if price.abs() >= Decimal::from(1000) {
        return Err(ApiError::field("price", "no more than 5 digits allowed"));
    }
    Ok(())
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

async fn check_tag_refs(db: &PgPool, ids: &[i64]) -> Result<Vec<i64>, ApiError> {
    let ids = dedup(ids);
    if repo::count_existing_tags(db, &ids).await? != ids.len() as i64 {
        return Err(ApiError::field("tags", "one or more tag ids do not exist"));
    }
    Ok(ids)
}

async fn check_ingredient_refs(db: &PgPool, ids: &[i64]) -> Result<Vec<i64>, ApiError> {
    let ids = dedup(ids);
    if repo::count_existing_ingredients(db, &ids).await? != ids.len() as i64 {
        return Err(ApiError::field(
            "ingredients",
            "one or more ingredient ids do not exist",
        ));
    }
    Ok(ids)
}

pub async fn create_recipe(
    db: &PgPool,
    user_id: Uuid,
    req: RecipeWriteRequest,
) -> Result<Recipe, ApiError> {
    check_title(&req.title)?;
    check_price(req.price)?;
    let tag_ids = check_tag_refs(db, &req.tags).await?;
    let ingredient_ids = check_ingredient_refs(db, &req.ingredients).await?;

    let mut tx = db.begin().await?;
    let recipe = repo::insert_recipe(
        &mut tx,
        user_id,
        req.title.trim(),
        req.time_minutes,
        req.price,
        req.link.as_deref().unwrap_or(""),
    )
    .await?;
    repo::set_tag_links(&mut tx, recipe.id, &tag_ids).await?;
    repo::set_ingredient_links(&mut tx, recipe.id, &ingredient_ids).await?;
    tx.commit().await?;

    info!(user_id = %user_id, recipe_id = recipe.id, "recipe created");
    Ok(recipe)
}

/// PUT semantics: every scalar comes from the payload (absent link resets to
/// empty) and both link sets are replaced with exactly the payload's lists.
pub async fn replace_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: i64,
    req: RecipeWriteRequest,
) -> Result<Recipe, ApiError> {
    repo::find_recipe(db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    check_title(&req.title)?;
    check_price(req.price)?;
    let tag_ids = check_tag_refs(db, &req.tags).await?;
    let ingredient_ids = check_ingredient_refs(db, &req.ingredients).await?;

    let mut tx = db.begin().await?;
    let recipe = repo::update_recipe_scalars(
        &mut tx,
        id,
        req.title.trim(),
        req.time_minutes,
        req.price,
        req.link.as_deref().unwrap_or(""),
    )
    .await?;
    repo::set_tag_links(&mut tx, id, &tag_ids).await?;
    repo::set_ingredient_links(&mut tx, id, &ingredient_ids).await?;
    tx.commit().await?;

    info!(user_id = %user_id, recipe_id = id, "recipe replaced");
    Ok(recipe)
}

/// PATCH semantics: only fields present in the payload change; a present
/// list replaces that link set, an absent one is left alone.
pub async fn patch_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: i64,
    req: RecipePatchRequest,
) -> Result<Recipe, ApiError> {
    let current = repo::find_recipe(db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let title = req.title.unwrap_or(current.title);
    check_title(&title)?;
    let time_minutes = req.time_minutes.unwrap_or(current.time_minutes);
    let price = req.price.unwrap_or(current.price);
    check_price(price)?;
    let link = req.link.unwrap_or(current.link);

    let tag_ids = match &req.tags {
        Some(ids) => Some(check_tag_refs(db, ids).await?),
        None => None,
    };
    let ingredient_ids = match &req.ingredients {
        Some(ids) => Some(check_ingredient_refs(db, ids).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let recipe =
        repo::update_recipe_scalars(&mut tx, id, title.trim(), time_minutes, price, &link).await?;
    if let Some(ids) = tag_ids {
        repo::set_tag_links(&mut tx, id, &ids).await?;
    }
    if let Some(ids) = ingredient_ids {
        repo::set_ingredient_links(&mut tx, id, &ids).await?;
    }
    tx.commit().await?;

    info!(user_id = %user_id, recipe_id = id, "recipe patched");
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parses_comma_separated_integers() {
        assert_eq!(
            parse_id_list("tags", Some("1,2,3")).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(parse_id_list("tags", Some("42")).unwrap(), Some(vec![42]));
        // whitespace around elements is tolerated
        assert_eq!(
            parse_id_list("tags", Some("1, 2")).unwrap(),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn id_list_treats_absent_and_empty_as_no_filter() {
        assert_eq!(parse_id_list("tags", None).unwrap(), None);
        assert_eq!(parse_id_list("tags", Some("")).unwrap(), None);
    }

    #[test]
    fn id_list_keeps_duplicates_for_the_query_layer() {
        assert_eq!(
            parse_id_list("tags", Some("7,7")).unwrap(),
            Some(vec![7, 7])
        );
    }

    #[test]
    fn id_list_rejects_non_integer_elements() {
        assert!(parse_id_list("tags", Some("1,abc")).is_err());
        assert!(parse_id_list("tags", Some("1,,2")).is_err());
        assert!(parse_id_list("tags", Some("1.5")).is_err());
    }

    #[test]
    fn flag_parses_boolean_ish_integers() {
        assert!(!parse_flag("assigned_only", None).unwrap());
        assert!(!parse_flag("assigned_only", Some("")).unwrap());
        assert!(!parse_flag("assigned_only", Some("0")).unwrap());
        assert!(parse_flag("assigned_only", Some("1")).unwrap());
        assert!(parse_flag("assigned_only", Some("2")).unwrap());
        assert!(parse_flag("assigned_only", Some("yes")).is_err());
    }

    #[test]
    fn price_must_fit_numeric_5_2() {
        assert!(check_price(Decimal::new(500, 2)).is_ok()); // 5.00
        assert!(check_price(Decimal::new(99999, 2)).is_ok()); // 999.99
        assert!(check_price(Decimal::new(100000, 2)).is_err()); // 1000.00
        assert!(check_price(Decimal::new(5123, 3)).is_err()); // 5.123
    }

    #[test]
    fn names_and_titles_must_be_non_empty() {
        assert!(check_name("Kale").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name("   ").is_err());
        assert!(check_title("soup").is_ok());
        assert!(check_title("").is_err());
    }

    #[test]
    fn dedup_sorts_and_drops_repeats() {
        assert_eq!(dedup(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(dedup(&[]).is_empty());
    }
}
