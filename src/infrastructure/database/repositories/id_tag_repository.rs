//! SeaORM implementation of IdTagRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{DomainError, DomainResult, IdTag, IdTagRepository, IdTagStatus};
use crate::infrastructure::database::entities::id_tag;

pub struct SeaOrmIdTagRepository {
    db: DatabaseConnection,
}

impl SeaOrmIdTagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn status_to_entity(status: IdTagStatus) -> id_tag::IdTagStatus {
    match status {
        IdTagStatus::Accepted => id_tag::IdTagStatus::Accepted,
        IdTagStatus::Blocked => id_tag::IdTagStatus::Blocked,
        IdTagStatus::Expired => id_tag::IdTagStatus::Expired,
        IdTagStatus::Invalid => id_tag::IdTagStatus::Invalid,
        IdTagStatus::ConcurrentTx => id_tag::IdTagStatus::ConcurrentTx,
    }
}

fn status_from_entity(status: id_tag::IdTagStatus) -> IdTagStatus {
    match status {
        id_tag::IdTagStatus::Accepted => IdTagStatus::Accepted,
        id_tag::IdTagStatus::Blocked => IdTagStatus::Blocked,
        id_tag::IdTagStatus::Expired => IdTagStatus::Expired,
        id_tag::IdTagStatus::Invalid => IdTagStatus::Invalid,
        id_tag::IdTagStatus::ConcurrentTx => IdTagStatus::ConcurrentTx,
    }
}

fn tag_from_model(model: id_tag::Model) -> IdTag {
    IdTag {
        id: model.id,
        tag: model.tag,
        parent_id_tag: model.parent_id_tag,
        status: status_from_entity(model.status),
        user_id: model.user_id,
        expiry_date: model.expiry_date,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn active_model(tag: IdTag) -> id_tag::ActiveModel {
    id_tag::ActiveModel {
        id: NotSet,
        tag: Set(tag.tag),
        parent_id_tag: Set(tag.parent_id_tag),
        status: Set(status_to_entity(tag.status)),
        user_id: Set(tag.user_id),
        expiry_date: Set(tag.expiry_date),
        created_at: Set(tag.created_at),
        updated_at: Set(tag.updated_at),
    }
}

#[async_trait]
impl IdTagRepository for SeaOrmIdTagRepository {
    async fn insert(&self, tag: IdTag) -> DomainResult<IdTag> {
        debug!("Inserting id tag: {}", tag.tag);
        let model = active_model(tag).insert(&self.db).await?;
        Ok(tag_from_model(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<IdTag>> {
        let model = id_tag::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(tag_from_model))
    }

    async fn find_by_tag(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        let model = id_tag::Entity::find()
            .filter(id_tag::Column::Tag.eq(tag))
            .one(&self.db)
            .await?;
        Ok(model.map(tag_from_model))
    }

    async fn update(&self, tag: IdTag) -> DomainResult<()> {
        debug!("Updating id tag: {}", tag.tag);
        let id = tag.id;
        if id_tag::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(DomainError::not_found("IdTag", "id", id));
        }

        let mut model = active_model(tag);
        model.id = Set(id);
        model.updated_at = Set(Utc::now());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = id_tag::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("IdTag", "id", id));
        }
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<IdTag>> {
        let models = id_tag::Entity::find()
            .order_by_asc(id_tag::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(tag_from_model).collect())
    }
}
