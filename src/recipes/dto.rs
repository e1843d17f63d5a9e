use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo::{Ingredient, Recipe, Tag};

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
        }
    }
}

/// Body for tag and ingredient creation.
#[derive(Debug, Deserialize)]
pub struct CreateAttrRequest {
    #[serde(default)]
    pub name: String,
}

/// `assigned_only` comes in as a raw string; the service parses the
/// boolean-ish value.
#[derive(Debug, Default, Deserialize)]
pub struct IngredientListQuery {
    pub assigned_only: Option<String>,
}

/// Comma-separated id lists, parsed by the service.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// List representation: related rows as bare id lists.
#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Detail representation: related rows nested, plus the image key.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<IngredientResponse>,
}

/// Body for recipe create and full (PUT) replace. Absent lists mean empty,
/// so a PUT without `tags` clears every tag link.
#[derive(Debug, Deserialize)]
pub struct RecipeWriteRequest {
    #[serde(default)]
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub ingredients: Vec<i64>,
}

/// Body for partial (PATCH) update; absent fields are left untouched and a
/// present list replaces that link set.
#[derive(Debug, Deserialize)]
pub struct RecipePatchRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_request_defaults_absent_lists_to_empty() {
        let req: RecipeWriteRequest =
            serde_json::from_str(r#"{"title": "soup", "time_minutes": 10, "price": "5.00"}"#)
                .unwrap();
        assert!(req.tags.is_empty());
        assert!(req.ingredients.is_empty());
        assert!(req.link.is_none());
    }

    #[test]
    fn patch_request_distinguishes_absent_from_empty() {
        let absent: RecipePatchRequest = serde_json::from_str(r#"{"title": "new"}"#).unwrap();
        assert!(absent.tags.is_none());

        let empty: RecipePatchRequest = serde_json::from_str(r#"{"tags": []}"#).unwrap();
        assert_eq!(empty.tags.as_deref(), Some(&[][..]));
    }

    #[test]
    fn price_accepts_string_and_number_forms() {
        let from_string: RecipeWriteRequest =
            serde_json::from_str(r#"{"title": "a", "time_minutes": 1, "price": "12.50"}"#).unwrap();
        assert_eq!(from_string.price.to_string(), "12.50");

        let from_number: RecipeWriteRequest =
            serde_json::from_str(r#"{"title": "a", "time_minutes": 1, "price": 5.0}"#).unwrap();
        assert_eq!(from_number.price, Decimal::new(50, 1));
    }

    #[test]
    fn detail_serializes_nested_relations() {
        let detail = RecipeDetail {
            id: 1,
            title: "curry".into(),
            time_minutes: 30,
            price: Decimal::new(999, 2),
            link: String::new(),
            image: None,
            tags: vec![TagResponse {
                id: 3,
                name: "vegan".into(),
            }],
            ingredients: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["tags"][0]["name"], "vegan");
        assert_eq!(json["price"], "9.99");
        assert!(json["image"].is_null());
    }
}
