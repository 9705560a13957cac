use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    clean, ensure_positive, fetch_page, find_or_404, required, search_pattern, Page, PageRequest,
};
use crate::entities::item;
use crate::entities::recipe_expert::{self, Ingredients, RecipeIngredient};
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub portions: Option<i32>,
    pub ingredients: Option<Vec<RecipeIngredient>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientCost {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCost {
    pub recipe_id: Uuid,
    pub portions: i32,
    pub ingredients: Vec<IngredientCost>,
    pub total_cost: Decimal,
    pub cost_per_portion: Decimal,
}

fn check_portions(portions: i32) -> ServiceResult<()> {
    if portions < 1 {
        return Err(ServiceError::ValidationError(
            "portions must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Recipe experts: named ingredient lists with a portion count.
#[derive(Clone)]
pub struct RecipeService {
    db: Arc<DatabaseConnection>,
}

impl RecipeService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        search: Option<String>,
        page: PageRequest,
    ) -> ServiceResult<Page<recipe_expert::Model>> {
        let mut query = recipe_expert::Entity::find().order_by_asc(recipe_expert::Column::Name);
        if let Some(pattern) = search_pattern(search.as_deref()) {
            query = query.filter(recipe_expert::Column::Name.like(pattern));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<recipe_expert::Model> {
        find_or_404::<recipe_expert::Entity, _>(&*self.db, id, "RecipeExpert").await
    }

    /// Every ingredient needs a positive quantity and an existing item.
    async fn check_ingredients(&self, ingredients: &[RecipeIngredient]) -> ServiceResult<()> {
        for (index, ingredient) in ingredients.iter().enumerate() {
            ensure_positive(ingredient.quantity, &format!("ingredients[{index}].quantity"))?;
        }
        let ids: BTreeSet<Uuid> = ingredients.iter().map(|i| i.item_id).collect();
        if ids.is_empty() {
            return Ok(());
        }
        let found: BTreeSet<Uuid> = item::Entity::find()
            .filter(item::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(index) = ingredients.iter().position(|i| !found.contains(&i.item_id)) {
            return Err(ServiceError::ValidationError(format!(
                "ingredients[{index}].itemId references a missing item"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: RecipeInput) -> ServiceResult<recipe_expert::Model> {
        let name = required(input.name, "name")?;
        let portions = input.portions.unwrap_or(1);
        check_portions(portions)?;
        let ingredients = input.ingredients.unwrap_or_default();
        self.check_ingredients(&ingredients).await?;

        let now = Utc::now();
        let created = recipe_expert::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(clean(input.description)),
            portions: Set(portions),
            ingredients: Set(Ingredients(ingredients)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(recipe_id = %created.id, "recipe created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: RecipeInput) -> ServiceResult<recipe_expert::Model> {
        let mut active: recipe_expert::ActiveModel = self.get(id).await?.into();
        if let Some(portions) = input.portions {
            check_portions(portions)?;
            active.portions = Set(portions);
        }
        if let Some(ingredients) = input.ingredients {
            self.check_ingredients(&ingredients).await?;
            active.ingredients = Set(Ingredients(ingredients));
        }
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(recipe_id = %id, "recipe deleted");
        Ok(())
    }

    /// Ingredient cost at current item prices. Items deleted since the recipe
    /// was saved cost nothing.
    pub async fn cost(&self, id: Uuid) -> ServiceResult<RecipeCost> {
        let recipe = self.get(id).await?;
        let ids: Vec<Uuid> = recipe.ingredients.0.iter().map(|i| i.item_id).collect();
        let prices: HashMap<Uuid, Decimal> = item::Entity::find()
            .filter(item::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|i| (i.id, i.unit_price))
            .collect();

        let ingredients: Vec<IngredientCost> = recipe
            .ingredients
            .0
            .iter()
            .map(|ingredient| {
                let unit_price = prices.get(&ingredient.item_id).copied().unwrap_or_default();
                IngredientCost {
                    item_id: ingredient.item_id,
                    quantity: ingredient.quantity,
                    unit_price,
                    cost: unit_price.checked_mul(ingredient.quantity).unwrap_or_default(),
                }
            })
            .collect();
        let total_cost = ingredients
            .iter()
            .try_fold(Decimal::ZERO, |total, i| total.checked_add(i.cost))
            .ok_or_else(|| ServiceError::ValidationError("recipe cost is too large".into()))?;
        let cost_per_portion = (total_cost / Decimal::from(recipe.portions.max(1))).round_dp(4);

        Ok(RecipeCost {
            recipe_id: recipe.id,
            portions: recipe.portions,
            ingredients,
            total_cost,
            cost_per_portion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::services::testing::seed_item;
    use rust_decimal_macros::dec;

    fn ingredient(item_id: Uuid, quantity: Decimal) -> RecipeIngredient {
        RecipeIngredient {
            item_id,
            quantity,
            unit: Some("kg".into()),
        }
    }

    #[tokio::test]
    async fn costs_per_portion() {
        let (db, _dir) = migrated_sqlite().await;
        let flour = seed_item(&db, dec!(2)).await;
        let butter = seed_item(&db, dec!(8)).await;
        let service = RecipeService::new(db);

        let recipe = service
            .create(RecipeInput {
                name: Some("Shortbread".into()),
                portions: Some(4),
                ingredients: Some(vec![
                    ingredient(flour.id, dec!(1.5)),
                    ingredient(butter.id, dec!(0.5)),
                ]),
                ..Default::default()
            })
            .await
            .unwrap();

        let cost = service.cost(recipe.id).await.unwrap();
        assert_eq!(cost.total_cost, dec!(7));
        assert_eq!(cost.cost_per_portion, dec!(1.75));
    }

    #[tokio::test]
    async fn rejects_unknown_items_and_zero_portions() {
        let (db, _dir) = migrated_sqlite().await;
        let flour = seed_item(&db, dec!(2)).await;
        let service = RecipeService::new(db);

        let err = service
            .create(RecipeInput {
                name: Some("Bread".into()),
                ingredients: Some(vec![
                    ingredient(flour.id, dec!(1)),
                    ingredient(Uuid::new_v4(), dec!(1)),
                ]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ingredients[1].itemId references a missing item");

        let err = service
            .create(RecipeInput {
                name: Some("Bread".into()),
                portions: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "portions must be at least 1");
    }
}
