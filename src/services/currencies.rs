use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, ensure_positive, fetch_page, find_or_404, required, Page, PageRequest};
use crate::entities::currency;
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub is_default: Option<bool>,
}

/// ISO-style three letter code, uppercased.
fn normalize_code(code: &str) -> ServiceResult<String> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ServiceError::ValidationError(
            "code must be exactly 3 letters".into(),
        ));
    }
    Ok(code)
}

#[derive(Clone)]
pub struct CurrencyService {
    db: Arc<DatabaseConnection>,
}

impl CurrencyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, page: PageRequest) -> ServiceResult<Page<currency::Model>> {
        let query = currency::Entity::find()
            .order_by_desc(currency::Column::IsDefault)
            .order_by_asc(currency::Column::Code);
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<currency::Model> {
        find_or_404::<currency::Entity, _>(&*self.db, id, "Currency").await
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> ServiceResult<()> {
        let mut query = currency::Entity::find().filter(currency::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(currency::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Currency with code {code} already exists"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CurrencyInput) -> ServiceResult<currency::Model> {
        let code = normalize_code(&required(input.code, "code")?)?;
        let name = required(input.name, "name")?;
        let exchange_rate = input.exchange_rate.unwrap_or(Decimal::ONE);
        ensure_positive(exchange_rate, "exchangeRate")?;
        self.ensure_code_free(&code, None).await?;

        let is_default = input.is_default.unwrap_or(false);
        let now = Utc::now();
        let txn = self.db.begin().await?;
        if is_default {
            clear_default(&txn, None).await?;
        }
        let created = currency::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(name),
            symbol: Set(clean(input.symbol)),
            exchange_rate: Set(exchange_rate),
            is_default: Set(is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(currency = %created.code, is_default, "currency created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: CurrencyInput) -> ServiceResult<currency::Model> {
        let existing = self.get(id).await?;
        let mut active: currency::ActiveModel = existing.into();

        if let Some(code) = clean(input.code) {
            let code = normalize_code(&code)?;
            self.ensure_code_free(&code, Some(id)).await?;
            active.code = Set(code);
        }
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(symbol) = clean(input.symbol) {
            active.symbol = Set(Some(symbol));
        }
        if let Some(rate) = input.exchange_rate {
            ensure_positive(rate, "exchangeRate")?;
            active.exchange_rate = Set(rate);
        }

        let txn = self.db.begin().await?;
        if let Some(is_default) = input.is_default {
            if is_default {
                clear_default(&txn, Some(id)).await?;
            }
            active.is_default = Set(is_default);
        }
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(currency_id = %id, "currency deleted");
        Ok(())
    }
}

async fn clear_default<C: sea_orm::ConnectionTrait>(
    conn: &C,
    except: Option<Uuid>,
) -> ServiceResult<()> {
    let mut update = currency::Entity::update_many()
        .col_expr(currency::Column::IsDefault, Expr::value(false))
        .col_expr(currency::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(currency::Column::IsDefault.eq(true));
    if let Some(id) = except {
        update = update.filter(currency::Column::Id.ne(id));
    }
    update.exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use rust_decimal_macros::dec;

    fn input(code: &str, is_default: bool) -> CurrencyInput {
        CurrencyInput {
            code: Some(code.into()),
            name: Some(format!("{code} currency")),
            is_default: Some(is_default),
            ..Default::default()
        }
    }

    #[test]
    fn codes_are_three_letters() {
        assert_eq!(normalize_code(" eur ").unwrap(), "EUR");
        assert!(normalize_code("EURO").is_err());
        assert!(normalize_code("E1R").is_err());
    }

    #[tokio::test]
    async fn only_one_default_currency() {
        let (db, _dir) = migrated_sqlite().await;
        let service = CurrencyService::new(db);

        let usd = service.create(input("usd", true)).await.unwrap();
        let eur = service.create(input("EUR", true)).await.unwrap();

        assert!(!service.get(usd.id).await.unwrap().is_default);
        assert!(service.get(eur.id).await.unwrap().is_default);
        assert_eq!(usd.exchange_rate, Decimal::ONE);

        service
            .update(
                usd.id,
                CurrencyInput {
                    is_default: Some(true),
                    exchange_rate: Some(dec!(0.5)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(service.get(usd.id).await.unwrap().is_default);
        assert!(!service.get(eur.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let (db, _dir) = migrated_sqlite().await;
        let service = CurrencyService::new(db);
        service.create(input("GBP", false)).await.unwrap();

        let err = service.create(input("gbp", false)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn exchange_rate_keeps_eight_decimal_places() {
        let (db, _dir) = migrated_sqlite().await;
        let service = CurrencyService::new(db);
        let jpy = service
            .create(CurrencyInput {
                exchange_rate: Some(dec!(0.00671234)),
                ..input("JPY", false)
            })
            .await
            .unwrap();

        assert_eq!(service.get(jpy.id).await.unwrap().exchange_rate, dec!(0.00671234));
    }
}
