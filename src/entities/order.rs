use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

pub const ORDER_STATUS_ERROR: &str = "status must be one of: draft, submitted, received, cancelled";

impl OrderStatus {
    pub fn parse(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| ORDER_STATUS_ERROR.to_string())
    }

    /// draft → submitted → received; draft and submitted may be cancelled.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Submitted)
                | (Self::Submitted, Self::Received)
                | (Self::Draft, Self::Cancelled)
                | (Self::Submitted, Self::Cancelled)
        )
    }

    /// Only orders that never reached a supplier can be removed.
    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::Draft | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
#[schema(as = Order)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub branch_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total_amount: Decimal,
    pub created_by: Option<Uuid>,
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLine,
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLine.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.updated_at = Set(Utc::now());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderStatus::Draft, OrderStatus::Submitted, true)]
    #[test_case(OrderStatus::Submitted, OrderStatus::Received, true)]
    #[test_case(OrderStatus::Submitted, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Draft, OrderStatus::Received, false)]
    #[test_case(OrderStatus::Received, OrderStatus::Cancelled, false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Draft, false)]
    fn transitions(from: OrderStatus, to: OrderStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn status_names_round_trip_through_display() {
        assert_eq!(OrderStatus::parse(" Submitted").unwrap(), OrderStatus::Submitted);
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(OrderStatus::parse("shipped").unwrap_err(), ORDER_STATUS_ERROR);
    }
}
