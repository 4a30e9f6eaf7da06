use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ApiResult, Error};
use crate::models::{PublicUser, UserStats};
use crate::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> ApiResult<Vec<PublicUser>> {
        Ok(self
            .store
            .list_users()?
            .into_iter()
            .map(PublicUser::from)
            .collect())
    }

    /// Listing and rental counts for a profile screen.
    pub fn stats(&self, user_id: Uuid) -> ApiResult<UserStats> {
        if self.store.find_user(user_id)?.is_none() {
            return Err(Error::not_found("User not found"));
        }
        Ok(UserStats {
            listed_count: self.store.count_tools_owned(user_id)?,
            rental_count: self.store.count_bookings_received(user_id)?,
            rating: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::memory::MemoryStore;

    #[test]
    fn stats_for_unknown_user_is_not_found() {
        let users = UserService::new(Arc::new(MemoryStore::new()));
        let err = users.stats(Uuid::new_v4()).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
