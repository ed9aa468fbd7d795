//! Lookup of seeded support type codes

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::domain::DomainResult;
use crate::infrastructure::database::entities::support_type;
use crate::shared::errors::db_err;

pub struct SeaOrmSupportTypeRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> SeaOrmSupportTypeRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn exists(&self, code: &str) -> DomainResult<bool> {
        let model = support_type::Entity::find_by_id(code.to_string())
            .one(self.conn)
            .await
            .map_err(db_err)?;
        Ok(model.is_some())
    }

    pub async fn all_codes(&self) -> DomainResult<Vec<String>> {
        let models = support_type::Entity::find()
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.code).collect())
    }
}
