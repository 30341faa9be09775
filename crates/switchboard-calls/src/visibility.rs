use std::sync::Arc;

use tracing::debug;

use switchboard_users::{PermissionRegistry, Visibility};

use crate::error::Result;
use crate::store::CallStore;
use crate::types::{Call, CallStatus};

/// Derives the set of calls a viewer is authorized to see.
///
/// Admins resolve to the wildcard and fetch everything; everyone else
/// fetches calls owned by their active grant targets plus themself.
/// A viewer with zero grants is not an error — they still see their own
/// calls, and the embedding layer explains the empty-permission case.
pub struct VisibleCallSet {
    registry: Arc<PermissionRegistry>,
    store: Arc<dyn CallStore>,
}

impl VisibleCallSet {
    pub fn new(registry: Arc<PermissionRegistry>, store: Arc<dyn CallStore>) -> Self {
        Self { registry, store }
    }

    /// Calls visible to `viewer_id`, ascending by `scheduled_at`.
    ///
    /// An empty `statuses` slice means any status.
    pub fn visible_calls(&self, viewer_id: &str, statuses: &[CallStatus]) -> Result<Vec<Call>> {
        let calls = match self.registry.active_targets_for(viewer_id)? {
            Visibility::Everyone => self.store.fetch_calls(None, statuses)?,
            Visibility::Only(targets) => {
                let owners: Vec<String> = targets.into_iter().collect();
                self.store.fetch_calls(Some(&owners), statuses)?
            }
        };
        debug!(viewer_id, count = calls.len(), "resolved visible calls");
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db as init_calls_db;
    use crate::store::SqliteCallStore;
    use crate::types::Call;
    use chrono::{Duration, Utc};
    use rusqlite::Connection;
    use switchboard_core::types::UserRole;
    use switchboard_users::db::{create_user, init_db as init_users_db};

    struct Fixture {
        set: VisibleCallSet,
        registry: Arc<PermissionRegistry>,
        admin: String,
        caller: String,
        owner: String,
    }

    fn fixture() -> Fixture {
        let users_conn = Connection::open_in_memory().unwrap();
        init_users_db(&users_conn).unwrap();
        let admin = create_user(&users_conn, "root", UserRole::Admin).unwrap();
        let caller = create_user(&users_conn, "carol", UserRole::Caller).unwrap();
        let owner = create_user(&users_conn, "owen", UserRole::Standard).unwrap();
        let registry = Arc::new(PermissionRegistry::new(users_conn));

        let calls_conn = Connection::open_in_memory().unwrap();
        init_calls_db(&calls_conn).unwrap();
        let store = Arc::new(SqliteCallStore::new(calls_conn));

        let base = Utc::now();
        for (owner_id, minutes) in [
            (owner.id.as_str(), 10),
            (caller.id.as_str(), 25),
            (admin.id.as_str(), 40),
        ] {
            store
                .create(&Call::new(
                    owner_id,
                    "contact",
                    "subject",
                    base + Duration::minutes(minutes),
                    30,
                ))
                .unwrap();
        }

        Fixture {
            set: VisibleCallSet::new(registry.clone(), store),
            registry,
            admin: admin.id,
            caller: caller.id,
            owner: owner.id,
        }
    }

    #[test]
    fn admin_sees_every_call() {
        let f = fixture();
        let calls = f.set.visible_calls(&f.admin, &[]).unwrap();
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn caller_without_grants_sees_only_own_calls() {
        let f = fixture();
        let calls = f.set.visible_calls(&f.caller, &[]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].owner_id, f.caller);
    }

    #[test]
    fn grant_extends_view_and_revoke_shrinks_it() {
        let f = fixture();
        let summary = f
            .registry
            .grant(&f.caller, &[f.owner.clone()], &f.admin)
            .unwrap();
        let grant_id = summary.created[0].id.clone();

        let calls = f.set.visible_calls(&f.caller, &[]).unwrap();
        assert_eq!(calls.len(), 2);
        // Ascending by scheduled time: owner's call (10m) before caller's (25m).
        assert_eq!(calls[0].owner_id, f.owner);
        assert_eq!(calls[1].owner_id, f.caller);

        f.registry.revoke(&grant_id).unwrap();
        let calls = f.set.visible_calls(&f.caller, &[]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].owner_id, f.caller);
    }
}
