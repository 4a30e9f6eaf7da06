use std::sync::Arc;

use uuid::Uuid;

use crate::db::models::Category;
use crate::error::{ApiResult, Error};
use crate::store::Store;

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Top-level categories only; children are fetched per parent.
    pub fn top_level(&self) -> ApiResult<Vec<Category>> {
        self.store.top_level_categories()
    }

    pub fn children(&self, parent_id: Uuid) -> ApiResult<Vec<Category>> {
        if self.store.find_category(parent_id)?.is_none() {
            return Err(Error::not_found(format!("Category with ID {parent_id} not found")));
        }
        self.store.subcategories(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::test_support::sample_categories;

    #[test]
    fn top_level_excludes_children_and_sorts_by_name() {
        let service = CategoryService::new(Arc::new(MemoryStore::with_categories(sample_categories())));
        let names: Vec<String> = service
            .top_level()
            .expect("categories")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Garden & Outdoor", "Power Tools"]);
    }

    #[test]
    fn children_are_listed_under_their_parent() {
        let categories = sample_categories();
        let parent = categories[0].id;
        let service = CategoryService::new(Arc::new(MemoryStore::with_categories(categories)));

        let children = service.children(parent).expect("children");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].slug, "drills");
        assert!(service.children(Uuid::new_v4()).is_err());
    }
}
