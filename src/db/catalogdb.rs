// db/catalogdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::{
    cache::{CacheHelper, CATALOG_CACHE_TTL, CATEGORIES_KEY, LOCATIONS_KEY},
    DBClient,
};
use crate::models::catalogmodel::{Category, Location};

#[async_trait]
pub trait CatalogExt {
    async fn get_categories(&self) -> Result<Vec<Category>, Error>;

    async fn get_locations(&self) -> Result<Vec<Location>, Error>;

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, Error>;

    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>, Error>;

    async fn count_locations(&self, location_ids: &[Uuid]) -> Result<i64, Error>;
}

#[async_trait]
impl CatalogExt for DBClient {
    async fn get_categories(&self) -> Result<Vec<Category>, Error> {
        if let Some(redis) = &self.redis_client {
            if let Some(cached) = CacheHelper::get::<Vec<Category>>(redis, CATEGORIES_KEY).await {
                return Ok(cached);
            }
        }

        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, icon, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        if let Some(redis) = &self.redis_client {
            CacheHelper::set(redis, CATEGORIES_KEY, &categories, CATALOG_CACHE_TTL).await;
        }
        Ok(categories)
    }

    async fn get_locations(&self) -> Result<Vec<Location>, Error> {
        if let Some(redis) = &self.redis_client {
            if let Some(cached) = CacheHelper::get::<Vec<Location>>(redis, LOCATIONS_KEY).await {
                return Ok(cached);
            }
        }

        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, name, slug, region, created_at FROM locations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        if let Some(redis) = &self.redis_client {
            CacheHelper::set(redis, LOCATIONS_KEY, &locations, CATALOG_CACHE_TTL).await;
        }
        Ok(locations)
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, icon, created_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>, Error> {
        sqlx::query_as::<_, Location>(
            "SELECT id, name, slug, region, created_at FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_locations(&self, location_ids: &[Uuid]) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM locations WHERE id = ANY($1)")
            .bind(location_ids)
            .fetch_one(&self.pool)
            .await
    }
}
