use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// A workshop employee that can receive loans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub(crate) fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Employee> for ActiveModel {
    fn from(employee: &Employee) -> Self {
        Self {
            id: ActiveValue::Set(employee.id.to_string()),
            name: ActiveValue::Set(employee.name.clone()),
            created_at: ActiveValue::Set(employee.created_at),
        }
    }
}

impl TryFrom<Model> for Employee {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "employee")?,
            name: model.name,
            created_at: model.created_at,
        })
    }
}
