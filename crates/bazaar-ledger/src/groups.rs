//! The group ledger.
//!
//! Groups are rows keyed by id; memberships are rows keyed by
//! `(group, user)`. A group's `member_count` is a cached counter with these
//! rules:
//!
//! - A group row is written only after its creator's membership, and with a
//!   count of 1, so no reader sees a group with zero members.
//! - A join bumps the counter only if its membership insert created the row.
//!   Concurrent joins for the same pair race on `insert_if_absent`; exactly
//!   one wins and exactly one increment happens.
//! - Increments are compare-and-swap on the group row's version, retried up
//!   to [`LedgerConfig::max_cas_retries`] times.
//! - If the increment cannot be applied after the membership was recorded,
//!   the join still counts and the drift is logged.
//!   [`GroupLedger::reconcile_member_count`] recomputes the counter from the
//!   membership rows.
//!
//! Every public operation is fail-soft: store errors are logged at `warn`
//! and become `None`, `false` or an empty list.

use std::collections::HashSet;
use std::sync::Arc;

use bazaar_store::{CasOutcome, Filter, InsertOutcome, RowStore, StoreError, StoreResult, Table, Versioned};
use bazaar_types::{Group, GroupDescriptor, GroupId, GroupMembership, Record, Role, UserId};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;

/// Name of the group every installation starts with.
pub const DEFAULT_GROUP_NAME: &str = "Top Sale";

fn default_group(created_by: UserId) -> GroupDescriptor {
    GroupDescriptor {
        name: DEFAULT_GROUP_NAME.into(),
        description: "Best deals and trending items".into(),
        category: "General".into(),
        is_public: true,
        created_by,
    }
}

fn members_of(group_id: &GroupId) -> Filter {
    Filter::all().eq("group_id", group_id.to_string())
}

fn sort_groups(groups: &mut [Group]) {
    groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Groups and their memberships.
#[derive(Clone, Debug)]
pub struct GroupLedger {
    groups: Table<Group>,
    memberships: Table<GroupMembership>,
    config: LedgerConfig,
}

impl GroupLedger {
    pub fn new(store: Arc<dyn RowStore>, config: LedgerConfig) -> Self {
        Self {
            groups: Table::new(Arc::clone(&store)),
            memberships: Table::new(store),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create a group with its creator as the first member.
    ///
    /// Returns the new group's id, or `None` if the descriptor is invalid or
    /// the store failed.
    pub async fn create_group(&self, descriptor: GroupDescriptor) -> Option<GroupId> {
        if let Err(e) = descriptor.validate() {
            warn!(op = "create_group", error = %e, "rejected group descriptor");
            return None;
        }
        let id = GroupId::generate();
        match self.found_group(id, descriptor).await {
            Ok(outcome) => Some(outcome.into_inner().value.id),
            Err(e) => {
                warn!(op = "create_group", group = %id, error = %e, "group creation failed");
                None
            }
        }
    }

    /// Add `user_id` to the group.
    ///
    /// Returns `true` once the user is a member, including when they already
    /// were. Returns `false` if the group does not exist or the store failed.
    pub async fn join_group(&self, group_id: &GroupId, user_id: &UserId) -> bool {
        match self.try_join(group_id, user_id).await {
            Ok(joined) => joined,
            Err(e) => {
                warn!(op = "join_group", group = %group_id, user = %user_id, error = %e, "join failed");
                false
            }
        }
    }

    /// Every group, oldest first.
    pub async fn get_groups(&self) -> Vec<Group> {
        match self.groups.all().await {
            Ok(rows) => {
                let mut groups: Vec<Group> = rows.into_iter().map(|row| row.value).collect();
                sort_groups(&mut groups);
                groups
            }
            Err(e) => {
                warn!(op = "get_groups", error = %e, "listing groups failed");
                Vec::new()
            }
        }
    }

    pub async fn get_group_by_id(&self, group_id: &GroupId) -> Option<Group> {
        match self.groups.get(&group_id.to_string()).await {
            Ok(row) => row.map(|row| row.value),
            Err(e) => {
                warn!(op = "get_group_by_id", group = %group_id, error = %e, "group lookup failed");
                None
            }
        }
    }

    /// Groups `user_id` belongs to, oldest first.
    pub async fn get_user_groups(&self, user_id: &UserId) -> Vec<Group> {
        match self.try_user_groups(user_id).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(op = "get_user_groups", user = %user_id, error = %e, "listing user groups failed");
                Vec::new()
            }
        }
    }

    pub async fn is_user_member(&self, group_id: &GroupId, user_id: &UserId) -> bool {
        let key = GroupMembership::key_for(group_id, user_id);
        match self.memberships.get(&key).await {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!(op = "is_user_member", key = %key, error = %e, "membership lookup failed");
                false
            }
        }
    }

    /// Memberships of a group, earliest join first.
    pub async fn get_members(&self, group_id: &GroupId) -> Vec<GroupMembership> {
        match self.memberships.select(&members_of(group_id)).await {
            Ok(rows) => {
                let mut members: Vec<GroupMembership> = rows.into_iter().map(|row| row.value).collect();
                members.sort_by(|a, b| {
                    a.joined_at
                        .cmp(&b.joined_at)
                        .then_with(|| a.user_id.cmp(&b.user_id))
                });
                members
            }
            Err(e) => {
                warn!(op = "get_members", group = %group_id, error = %e, "listing members failed");
                Vec::new()
            }
        }
    }

    /// Recompute `member_count` from the membership rows and store it.
    ///
    /// Returns the reconciled count, or `None` if the group does not exist or
    /// the store failed.
    pub async fn reconcile_member_count(&self, group_id: &GroupId) -> Option<u64> {
        match self.try_reconcile(group_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(op = "reconcile_member_count", group = %group_id, error = %e, "reconcile failed");
                None
            }
        }
    }

    /// Make sure the default group exists. Safe to call on every start.
    pub async fn initialize_default_groups(&self) {
        if let Err(e) = self.try_initialize_default_groups().await {
            warn!(op = "initialize_default_groups", error = %e, "default group bootstrap failed");
        }
    }

    // ---- internals ----

    /// Write the creator's membership, then the group row with a count of 1.
    ///
    /// Both writes are insert-if-absent, so re-running with the same id
    /// converges on one group and one owner membership.
    async fn found_group(
        &self,
        id: GroupId,
        descriptor: GroupDescriptor,
    ) -> StoreResult<InsertOutcome<Versioned<Group>>> {
        let now = Utc::now();
        let owner = GroupMembership::new(id, descriptor.created_by.clone(), Role::Owner, now);
        self.memberships.insert_if_absent(&owner).await?;

        let group = Group::founded(id, descriptor, now);
        let outcome = self.groups.insert_if_absent(&group).await?;
        if outcome.was_inserted() {
            debug!(group = %id, name = %group.name, created_by = %group.created_by, "group created");
        }
        Ok(outcome)
    }

    async fn try_join(&self, group_id: &GroupId, user_id: &UserId) -> StoreResult<bool> {
        if self.groups.get(&group_id.to_string()).await?.is_none() {
            warn!(op = "join_group", group = %group_id, user = %user_id, "group not found");
            return Ok(false);
        }

        let membership = GroupMembership::new(*group_id, user_id.clone(), Role::Member, Utc::now());
        if !self.memberships.insert_if_absent(&membership).await?.was_inserted() {
            debug!(group = %group_id, user = %user_id, "already a member");
            return Ok(true);
        }

        if let Err(e) = self.increment_member_count(group_id).await {
            warn!(
                op = "join_group",
                group = %group_id,
                user = %user_id,
                error = %e,
                "membership recorded but member count not updated; reconcile required"
            );
        }
        debug!(group = %group_id, user = %user_id, "joined group");
        Ok(true)
    }

    async fn increment_member_count(&self, group_id: &GroupId) -> StoreResult<()> {
        let key = group_id.to_string();
        let attempts = self.config.max_cas_retries.max(1);
        let mut current = self.groups.get(&key).await?;
        for _ in 0..attempts {
            let Some(row) = current else {
                warn!(group = %group_id, "group vanished before member count update");
                return Ok(());
            };
            let mut group = row.value;
            group.member_count += 1;
            match self.groups.compare_and_swap(row.version, &group).await? {
                CasOutcome::Swapped(_) => return Ok(()),
                CasOutcome::Stale(latest) => current = latest,
            }
        }
        Err(StoreError::Contention {
            collection: Group::COLLECTION.into(),
            key,
            attempts,
        })
    }

    async fn try_user_groups(&self, user_id: &UserId) -> StoreResult<Vec<Group>> {
        let joined: HashSet<GroupId> = self
            .memberships
            .select(&Filter::all().eq("user_id", user_id.as_str()))
            .await?
            .into_iter()
            .map(|row| row.value.group_id)
            .collect();
        if joined.is_empty() {
            return Ok(Vec::new());
        }
        let mut groups: Vec<Group> = self
            .groups
            .all()
            .await?
            .into_iter()
            .map(|row| row.value)
            .filter(|group| joined.contains(&group.id))
            .collect();
        sort_groups(&mut groups);
        Ok(groups)
    }

    async fn try_reconcile(&self, group_id: &GroupId) -> StoreResult<Option<u64>> {
        let key = group_id.to_string();
        let attempts = self.config.max_cas_retries.max(1);
        for _ in 0..attempts {
            let Some(row) = self.groups.get(&key).await? else {
                return Ok(None);
            };
            let actual = self.memberships.select(&members_of(group_id)).await?.len() as u64;
            let recorded = row.value.member_count;
            if recorded == actual {
                return Ok(Some(actual));
            }
            let mut group = row.value;
            group.member_count = actual;
            if self.groups.compare_and_swap(row.version, &group).await?.is_swapped() {
                info!(group = %group_id, recorded, actual, "member count reconciled");
                return Ok(Some(actual));
            }
        }
        Err(StoreError::Contention {
            collection: Group::COLLECTION.into(),
            key,
            attempts,
        })
    }

    async fn try_initialize_default_groups(&self) -> StoreResult<()> {
        let existing = self
            .groups
            .select(&Filter::all().eq("name", DEFAULT_GROUP_NAME))
            .await?;
        if !existing.is_empty() {
            debug!(name = DEFAULT_GROUP_NAME, "default group present");
            return Ok(());
        }

        let id = GroupId::for_name(DEFAULT_GROUP_NAME);
        let descriptor = default_group(self.config.system_user.clone());
        if self.found_group(id, descriptor).await?.was_inserted() {
            info!(group = %id, name = DEFAULT_GROUP_NAME, "created default group");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use bazaar_store::{InMemoryRowStore, InstrumentedStore, StoreOp};

    fn ledger() -> (Arc<InstrumentedStore>, GroupLedger) {
        let store = Arc::new(InstrumentedStore::new(Arc::new(InMemoryRowStore::new())));
        (store.clone(), GroupLedger::new(store, LedgerConfig::default()))
    }

    fn uid(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn descriptor(name: &str, creator: &str) -> GroupDescriptor {
        GroupDescriptor {
            name: name.into(),
            description: format!("{name} members"),
            category: "Hobbies".into(),
            is_public: true,
            created_by: uid(creator),
        }
    }

    async fn count_memberships(ledger: &GroupLedger, group_id: &GroupId) -> u64 {
        ledger.get_members(group_id).await.len() as u64
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn book_club_scenario() {
        let (_, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();

        let group = groups.get_group_by_id(&id).await.unwrap();
        assert_eq!(group.member_count, 1);
        assert!(groups.is_user_member(&id, &uid("u1")).await);

        assert!(groups.join_group(&id, &uid("u2")).await);
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 2);

        assert!(groups.join_group(&id, &uid("u2")).await);
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 2);
        assert_eq!(count_memberships(&groups, &id).await, 2);
    }

    #[tokio::test]
    async fn creator_is_recorded_as_owner() {
        let (_, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        groups.join_group(&id, &uid("u2")).await;

        let members = groups.get_members(&id).await;
        assert_eq!(members.len(), 2);
        let owner = members.iter().find(|m| m.user_id == uid("u1")).unwrap();
        assert_eq!(owner.role, Role::Owner);
        let member = members.iter().find(|m| m.user_id == uid("u2")).unwrap();
        assert_eq!(member.role, Role::Member);
    }

    #[tokio::test]
    async fn invalid_descriptor_writes_nothing() {
        let (store, groups) = ledger();
        assert!(groups.create_group(descriptor("  ", "u1")).await.is_none());
        assert_eq!(store.calls(StoreOp::InsertIfAbsent), 0);
        assert!(groups.get_groups().await.is_empty());
    }

    #[tokio::test]
    async fn group_names_need_not_be_unique() {
        let (_, groups) = ledger();
        let a = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        let b = groups.create_group(descriptor("Book Club", "u2")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(groups.get_groups().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_owner_write_leaves_no_group() {
        let (store, groups) = ledger();
        store.fail(StoreOp::InsertIfAbsent);
        assert!(groups.create_group(descriptor("Book Club", "u1")).await.is_none());
        store.heal();
        assert!(groups.get_groups().await.is_empty());
        assert!(groups.get_user_groups(&uid("u1")).await.is_empty());
    }

    // -----------------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn repeated_join_counts_once() {
        let (_, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        for _ in 0..3 {
            assert!(groups.join_group(&id, &uid("u2")).await);
        }
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 2);
    }

    #[tokio::test]
    async fn creator_rejoin_is_a_no_op() {
        let (_, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        assert!(groups.join_group(&id, &uid("u1")).await);
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 1);
    }

    #[tokio::test]
    async fn joining_unknown_group_fails_without_membership() {
        let (_, groups) = ledger();
        let ghost = GroupId::generate();
        assert!(!groups.join_group(&ghost, &uid("u1")).await);
        assert!(!groups.is_user_member(&ghost, &uid("u1")).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_for_one_pair_converge() {
        let (_, groups) = ledger();
        let groups = Arc::new(groups);
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let groups = Arc::clone(&groups);
            tasks.spawn(async move { groups.join_group(&id, &uid("u2")).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap());
        }

        assert_eq!(count_memberships(&groups, &id).await, 2);
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_by_different_users_lose_no_increment() {
        let store: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let config = LedgerConfig {
            max_cas_retries: 256,
            ..LedgerConfig::default()
        };
        let groups = Arc::new(GroupLedger::new(store, config));
        let id = groups.create_group(descriptor("Book Club", "owner")).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..24 {
            let groups = Arc::clone(&groups);
            tasks.spawn(async move { groups.join_group(&id, &uid(&format!("u{i}"))).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap());
        }

        let group = groups.get_group_by_id(&id).await.unwrap();
        assert_eq!(group.member_count, 25);
        assert_eq!(count_memberships(&groups, &id).await, 25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn default_retry_budget_keeps_count_under_load() {
        let store: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let groups = Arc::new(GroupLedger::new(store, LedgerConfig::default()));

        for round in 0..5 {
            let id = groups
                .create_group(descriptor(&format!("Crowd {round}"), "owner"))
                .await
                .unwrap();
            let mut tasks = tokio::task::JoinSet::new();
            for i in 0..64 {
                let groups = Arc::clone(&groups);
                tasks.spawn(async move { groups.join_group(&id, &uid(&format!("r{round}-u{i}"))).await });
            }
            while let Some(joined) = tasks.join_next().await {
                assert!(joined.unwrap());
            }

            let members = count_memberships(&groups, &id).await;
            assert_eq!(members, 65);
            assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, members, "round {round}");
        }
    }

    #[tokio::test]
    async fn failed_increment_is_logged_and_repairable() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let (store, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();

        store.fail(StoreOp::CompareAndSwap);
        assert!(groups.join_group(&id, &uid("u2")).await);
        store.heal();

        assert!(groups.is_user_member(&id, &uid("u2")).await);
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 1);
        assert!(logs
            .warnings()
            .iter()
            .any(|w| w.contains("reconcile required")));

        assert_eq!(groups.reconcile_member_count(&id).await, Some(2));
        assert_eq!(groups.get_group_by_id(&id).await.unwrap().member_count, 2);
    }

    #[tokio::test]
    async fn reconcile_is_a_no_op_when_consistent() {
        let (store, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        store.reset_counts();
        assert_eq!(groups.reconcile_member_count(&id).await, Some(1));
        assert_eq!(store.calls(StoreOp::CompareAndSwap), 0);
        assert_eq!(groups.reconcile_member_count(&GroupId::generate()).await, None);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn user_groups_is_the_membership_join() {
        let (_, groups) = ledger();
        let books = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();
        let bikes = groups.create_group(descriptor("Bike Swap", "u2")).await.unwrap();
        let _chess = groups.create_group(descriptor("Chess", "u3")).await.unwrap();
        groups.join_group(&bikes, &uid("u1")).await;

        let mine: Vec<GroupId> = groups
            .get_user_groups(&uid("u1"))
            .await
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(mine.len(), 2);
        assert!(mine.contains(&books));
        assert!(mine.contains(&bikes));
        assert!(groups.get_user_groups(&uid("nobody")).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_group_lookup_is_none() {
        let (_, groups) = ledger();
        assert!(groups.get_group_by_id(&GroupId::generate()).await.is_none());
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn bootstrap_creates_top_sale_once() {
        let (_, groups) = ledger();
        groups.initialize_default_groups().await;
        groups.initialize_default_groups().await;

        let all = groups.get_groups().await;
        let top: Vec<_> = all.iter().filter(|g| g.name == DEFAULT_GROUP_NAME).collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].created_by, UserId::system());
        assert_eq!(top[0].member_count, 1);
        assert!(top[0].is_public);
        assert_eq!(top[0].id, GroupId::for_name(DEFAULT_GROUP_NAME));
    }

    #[tokio::test]
    async fn bootstrap_respects_existing_group_by_name() {
        let (_, groups) = ledger();
        let id = groups.create_group(descriptor(DEFAULT_GROUP_NAME, "u1")).await.unwrap();
        groups.initialize_default_groups().await;

        let all = groups.get_groups().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bootstrap_yields_one_group() {
        let (_, groups) = ledger();
        let groups = Arc::new(groups);
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let groups = Arc::clone(&groups);
            tasks.spawn(async move { groups.initialize_default_groups().await });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        let all = groups.get_groups().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].member_count, 1);
        assert_eq!(count_memberships(&groups, &all[0].id).await, 1);
    }

    // -----------------------------------------------------------------------
    // Fail-soft
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn store_outage_yields_benign_values_and_logs() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let (store, groups) = ledger();
        let id = groups.create_group(descriptor("Book Club", "u1")).await.unwrap();

        store.fail_all();
        assert!(groups.create_group(descriptor("Chess", "u1")).await.is_none());
        assert!(!groups.join_group(&id, &uid("u2")).await);
        assert!(groups.get_groups().await.is_empty());
        assert!(groups.get_group_by_id(&id).await.is_none());
        assert!(groups.get_user_groups(&uid("u1")).await.is_empty());
        assert!(!groups.is_user_member(&id, &uid("u1")).await);
        assert!(groups.get_members(&id).await.is_empty());
        assert!(groups.reconcile_member_count(&id).await.is_none());
        groups.initialize_default_groups().await;

        let warnings = logs.warnings();
        for op in [
            "create_group",
            "join_group",
            "get_groups",
            "get_group_by_id",
            "get_user_groups",
            "is_user_member",
            "get_members",
            "reconcile_member_count",
            "initialize_default_groups",
        ] {
            assert!(
                warnings.iter().any(|w| w.contains(&format!("op={op}"))),
                "no warning logged for {op}: {warnings:?}"
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn member_count_matches_memberships(
            ops in proptest::collection::vec((0usize..3, 0usize..5), 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (_, groups) = ledger();
                let mut ids = Vec::new();
                for g in 0..3 {
                    let id = groups
                        .create_group(descriptor(&format!("Group {g}"), &format!("u{g}")))
                        .await
                        .unwrap();
                    ids.push(id);
                }
                for (g, u) in ops {
                    let joined = groups.join_group(&ids[g], &uid(&format!("u{u}"))).await;
                    proptest::prop_assert!(joined);
                }
                for id in &ids {
                    let group = groups.get_group_by_id(id).await.unwrap();
                    proptest::prop_assert_eq!(group.member_count, count_memberships(&groups, id).await);
                }
                Ok(())
            })?;
        }
    }
}
