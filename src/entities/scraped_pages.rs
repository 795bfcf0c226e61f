//! `SeaORM` Entity for scraped_pages table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scraped_pages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub page_number: i32,
    pub record_count: i32,
    pub scraped_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
