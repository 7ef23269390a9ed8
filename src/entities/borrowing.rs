use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open or closed loan of lab equipment.
///
/// `item_id` is `Some` when the loan is backed by tracked stock (units
/// were decremented when it opened and restored when it closed) and
/// `None` for untracked gear. `returned_at` is set exactly once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrowings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub tool: String,
    pub quantity: i32,
    pub borrowed_at: DateTime<Utc>,
    pub expected_return: Option<NaiveDate>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Model {
    pub fn is_closed(&self) -> bool {
        self.returned_at.is_some()
    }

    pub fn is_tracked(&self) -> bool {
        self.item_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::borrow_request::Entity",
        from = "Column::RequestId",
        to = "super::borrow_request::Column::Id"
    )]
    BorrowRequest,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::borrow_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BorrowRequest.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.borrowed_at {
            active_model.borrowed_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
