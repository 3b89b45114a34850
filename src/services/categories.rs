//! Category service

use crate::{error::AppResult, models::category::Category, repository::Repository};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, name: &str) -> AppResult<Category> {
        self.repository.categories.create(name).await
    }

    pub async fn rename(&self, id: i32, name: &str) -> AppResult<Category> {
        self.repository.categories.rename(id, name).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await
    }
}
