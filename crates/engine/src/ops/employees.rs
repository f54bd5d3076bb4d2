use uuid::Uuid;

use sea_orm::{ConnectionTrait, TransactionTrait, prelude::*};

use crate::{
    Employee, EngineError, ResultEngine, employees,
    util::{normalize_required, require_actor},
};

use super::{Engine, with_tx};

pub(super) async fn load_employee<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
) -> ResultEngine<Employee> {
    let model = employees::Entity::find_by_id(employee_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("employee".to_string()))?;
    Employee::try_from(model)
}

impl Engine {
    pub async fn create_employee(&self, name: &str, user_id: &str) -> ResultEngine<Employee> {
        require_actor(user_id)?;
        let employee = Employee::new(normalize_required(name, "employee name")?);

        with_tx!(self, |db_tx| {
            employees::ActiveModel::from(&employee)
                .insert(&db_tx)
                .await?;
            Ok(())
        })?;

        tracing::info!(employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub async fn employee(&self, employee_id: Uuid) -> ResultEngine<Employee> {
        load_employee(&self.database, employee_id).await
    }
}
