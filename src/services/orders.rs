use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    clean, ensure_exists, ensure_non_negative, ensure_optional, ensure_positive, fetch_page,
    find_or_404, required, Page, PageRequest,
};
use crate::entities::{branch, item, order, order_line, packaging, section, supplier, OrderStatus};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};

const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// `ORD-YYYYMMDD-XXXXXX` with an uppercase alphanumeric suffix.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    #[serde(alias = "item")]
    pub item_id: Option<Uuid>,
    #[serde(alias = "packaging")]
    pub packaging_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    /// Defaults to the item's unit price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    #[serde(alias = "supplier")]
    pub supplier_id: Option<Uuid>,
    #[serde(alias = "section")]
    pub section_id: Option<Uuid>,
    pub notes: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub lines: Option<Vec<OrderLineInput>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    /// One of `draft`, `submitted`, `received`, `cancelled`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub branch: Option<Uuid>,
    pub supplier: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: order::Model,
    pub lines: Vec<order_line::Model>,
}

/// A validated line ready to insert.
struct PricedLine {
    item_id: Uuid,
    packaging_id: Option<Uuid>,
    quantity: Decimal,
    unit_price: Decimal,
    line_total: Decimal,
}

/// Sum of line totals; overflow is a validation failure rather than a panic.
fn order_total(lines: &[PricedLine]) -> ServiceResult<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.line_total))
        .ok_or_else(|| ServiceError::ValidationError("order total is too large".into()))
}

pub fn parse_status(raw: &str) -> ServiceResult<OrderStatus> {
    OrderStatus::parse(raw).map_err(ServiceError::ValidationError)
}

/// Purchase orders and their lines.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    pub async fn list(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<order::Model>> {
        let mut query = order::Entity::find().order_by_desc(order::Column::OrderedAt);
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(branch) = filter.branch {
            query = query.filter(order::Column::BranchId.eq(branch));
        }
        if let Some(supplier) = filter.supplier {
            query = query.filter(order::Column::SupplierId.eq(supplier));
        }
        fetch_page(query, &*self.db, page).await
    }

    async fn lines_of<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> ServiceResult<Vec<order_line::Model>> {
        Ok(order_line::Entity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<OrderWithLines> {
        let order = find_or_404::<order::Entity, _>(&*self.db, id, "Order").await?;
        let lines = Self::lines_of(&*self.db, id).await?;
        Ok(OrderWithLines { order, lines })
    }

    async fn check_header(&self, input: &OrderInput) -> ServiceResult<()> {
        let db = &*self.db;
        ensure_optional::<branch::Entity, _>(db, input.branch_id, "branchId", "branch").await?;
        ensure_optional::<supplier::Entity, _>(db, input.supplier_id, "supplierId", "supplier")
            .await?;
        ensure_optional::<section::Entity, _>(db, input.section_id, "sectionId", "section").await
    }

    async fn price_lines(&self, lines: Vec<OrderLineInput>) -> ServiceResult<Vec<PricedLine>> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "lines must contain at least one entry".into(),
            ));
        }
        let mut priced = Vec::with_capacity(lines.len());
        for (index, line) in lines.into_iter().enumerate() {
            let field = |name: &str| format!("lines[{index}].{name}");
            let item_id = line
                .item_id
                .ok_or_else(|| ServiceError::ValidationError(format!("{} is required", field("itemId"))))?;
            let quantity = line
                .quantity
                .ok_or_else(|| ServiceError::ValidationError(format!("{} is required", field("quantity"))))?;
            ensure_positive(quantity, &field("quantity"))?;

            let item =
                ensure_exists::<item::Entity, _>(&*self.db, item_id, &field("itemId"), "item").await?;
            if let Some(packaging_id) = line.packaging_id {
                let row = ensure_exists::<packaging::Entity, _>(
                    &*self.db,
                    packaging_id,
                    &field("packagingId"),
                    "packaging",
                )
                .await?;
                if row.item_id != item_id {
                    return Err(ServiceError::ValidationError(format!(
                        "{} belongs to a different item",
                        field("packagingId")
                    )));
                }
            }
            let unit_price = line.unit_price.unwrap_or(item.unit_price);
            ensure_non_negative(unit_price, &field("unitPrice"))?;
            let line_total = quantity
                .checked_mul(unit_price)
                .ok_or_else(|| ServiceError::ValidationError(format!("{} is too large", field("quantity"))))?;
            priced.push(PricedLine {
                item_id,
                packaging_id: line.packaging_id,
                quantity,
                unit_price,
                line_total,
            });
        }
        Ok(priced)
    }

    async fn insert_lines<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
        lines: &[PricedLine],
    ) -> ServiceResult<()> {
        let now = Utc::now();
        let rows: Vec<order_line::ActiveModel> = lines
            .iter()
            .map(|line| order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                item_id: Set(line.item_id),
                packaging_id: Set(line.packaging_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
                created_at: Set(now),
            })
            .collect();
        order_line::Entity::insert_many(rows).exec(conn).await?;
        Ok(())
    }

    /// Creates the order and its lines in one transaction.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: OrderInput,
        created_by: Option<Uuid>,
    ) -> ServiceResult<OrderWithLines> {
        self.check_header(&input).await?;
        let lines = input
            .lines
            .clone()
            .ok_or_else(|| ServiceError::ValidationError("lines is required".into()))?;
        let priced = self.price_lines(lines).await?;
        let total = order_total(&priced)?;
        let now = Utc::now();

        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let txn = self.db.begin().await?;
            let header = order::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_number: Set(generate_order_number(now)),
                branch_id: Set(input.branch_id),
                supplier_id: Set(input.supplier_id),
                section_id: Set(input.section_id),
                status: Set(OrderStatus::Draft),
                notes: Set(clean(input.notes.clone())),
                total_amount: Set(total),
                created_by: Set(created_by),
                ordered_at: Set(input.ordered_at.unwrap_or(now)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            match header.insert(&txn).await {
                Ok(order) => {
                    Self::insert_lines(&txn, order.id, &priced).await?;
                    txn.commit().await?;
                    break order;
                }
                Err(e)
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                        && attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    warn!(attempt, "order number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(order_id = %order.id, order_number = %order.order_number, %total, "order created");
        self.events.emit(Event::OrderCreated(order.id)).await;
        self.get(order.id).await
    }

    /// Only drafts can be edited. Supplying `lines` replaces every line.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: OrderInput) -> ServiceResult<OrderWithLines> {
        let existing = find_or_404::<order::Entity, _>(&*self.db, id, "Order").await?;
        if existing.status != OrderStatus::Draft {
            return Err(ServiceError::Conflict(
                "Only draft orders can be modified".into(),
            ));
        }
        self.check_header(&input).await?;
        let priced = match input.lines {
            Some(lines) => {
                let priced = self.price_lines(lines).await?;
                let total = order_total(&priced)?;
                Some((priced, total))
            }
            None => None,
        };

        let txn = self.db.begin().await?;
        let mut active: order::ActiveModel = existing.into();
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(supplier_id) = input.supplier_id {
            active.supplier_id = Set(Some(supplier_id));
        }
        if let Some(section_id) = input.section_id {
            active.section_id = Set(Some(section_id));
        }
        if let Some(notes) = clean(input.notes) {
            active.notes = Set(Some(notes));
        }
        if let Some(ordered_at) = input.ordered_at {
            active.ordered_at = Set(ordered_at);
        }
        if let Some((priced, total)) = priced {
            order_line::Entity::delete_many()
                .filter(order_line::Column::OrderId.eq(id))
                .exec(&txn)
                .await?;
            Self::insert_lines(&txn, id, &priced).await?;
            active.total_amount = Set(total);
        }
        active.update(&txn).await?;
        txn.commit().await?;

        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, id: Uuid, update: OrderStatusUpdate) -> ServiceResult<order::Model> {
        let next = parse_status(&required(update.status, "status")?)?;
        let existing = find_or_404::<order::Entity, _>(&*self.db, id, "Order").await?;
        let current = existing.status;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "Cannot change order status from {current} to {next}"
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(next);
        let updated = active.update(&*self.db).await?;

        info!(order_id = %id, %current, %next, "order status changed");
        self.events
            .emit(Event::OrderStatusChanged {
                order_id: id,
                old_status: current.to_string(),
                new_status: next.to_string(),
            })
            .await;
        Ok(updated)
    }

    /// Drafts and cancelled orders only; lines go with the order.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let existing = find_or_404::<order::Entity, _>(&*self.db, id, "Order").await?;
        if !existing.status.is_deletable() {
            return Err(ServiceError::Conflict(format!(
                "Cannot delete an order in status {}",
                existing.status
            )));
        }
        let txn = self.db.begin().await?;
        order_line::Entity::delete_many()
            .filter(order_line::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!(order_id = %id, "order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::services::testing::seed_item;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn service(db: Arc<DatabaseConnection>) -> OrderService {
        let (tx, _rx) = mpsc::channel(32);
        OrderService::new(db, EventSender::new(tx))
    }

    fn line(item_id: Uuid, quantity: Decimal, unit_price: Option<Decimal>) -> OrderLineInput {
        OrderLineInput {
            item_id: Some(item_id),
            quantity: Some(quantity),
            unit_price,
            ..Default::default()
        }
    }

    #[test]
    fn order_numbers_carry_the_date() {
        let now = Utc::now();
        let number = generate_order_number(now);
        assert!(number.starts_with(&format!("ORD-{}-", now.format("%Y%m%d"))));
        assert_eq!(number.len(), "ORD-YYYYMMDD-XXXXXX".len());
    }

    #[tokio::test]
    async fn totals_sum_line_prices() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(2.5)).await;
        let service = service(db);

        let created = service
            .create(
                OrderInput {
                    lines: Some(vec![
                        line(item.id, dec!(4), None),
                        line(item.id, dec!(2), Some(dec!(0.25))),
                    ]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(created.order.status, OrderStatus::Draft);
        assert_eq!(created.lines.len(), 2);
        assert_eq!(created.order.total_amount, dec!(10.5));
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let service = service(db);

        let err = service
            .create(
                OrderInput {
                    lines: Some(vec![
                        line(item.id, dec!(1), Some(Decimal::MAX)),
                        line(item.id, dec!(1), Some(Decimal::MAX)),
                    ]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "order total is too large");
    }

    #[tokio::test]
    async fn status_transitions_are_enforced() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let service = service(db);
        let order = service
            .create(
                OrderInput {
                    lines: Some(vec![line(item.id, dec!(1), None)]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap()
            .order;

        let status = |s: &str| OrderStatusUpdate {
            status: Some(s.to_string()),
        };
        let err = service.update_status(order.id, status("received")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        service.update_status(order.id, status("submitted")).await.unwrap();
        let err = service.delete(order.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = service
            .update(order.id, OrderInput { notes: Some("late".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Only draft orders can be modified");

        service.update_status(order.id, status("cancelled")).await.unwrap();
        service.delete(order.id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_item_rejects_the_whole_order() {
        let (db, _dir) = migrated_sqlite().await;
        let service = service(db.clone());
        let err = service
            .create(
                OrderInput {
                    lines: Some(vec![line(Uuid::new_v4(), dec!(1), Some(dec!(1)))]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "lines[0].itemId references a missing item");
        let listed = service.list(OrderFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(listed.total, 0);
    }
}
