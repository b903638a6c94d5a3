//! Optimistic mutation protocol over the query cache:
//! cancel → snapshot → apply → send → reconcile/rollback → settle.
//!
//! Applies to writes whose effect is locally predictable, e.g. sending a
//! message appends a locally-known record to a locally-known list. The
//! provisional record is tagged with a generated temporary id and
//! `optimistic: true`; reconciliation and rollback are keyed off that id,
//! never off a whole-list replace, so the settle of one mutation cannot
//! clobber the apply of a later one on the same key. Apply and
//! reconcile/rollback run under the cache's per-key lock, which hands itself
//! out in acquisition order.
//!
//! Whatever the server says, after settle no record under the key still
//! carries this mutation's `optimistic: true` tag, and the key (plus any
//! configured coarser summary keys) is invalidated to force convergence with
//! server state on the next read.

use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ApiError;
use crate::cache::{CacheKey, QueryCache};

pub const OPTIMISTIC_TAG: &str = "optimistic";
pub const ERROR_TAG: &str = "error";

/// One planned write: the list key it targets, the provisional record to
/// apply, coarser keys to invalidate at settle (e.g. a thread-summary key
/// when a message-list key changed), and the field the server assigns ids to.
#[derive(Debug, Clone)]
pub struct MutationPlan {
    pub key: CacheKey,
    pub provisional: Value,
    pub related: Vec<CacheKey>,
    pub id_field: String,
}

impl MutationPlan {
    pub fn new(key: CacheKey, provisional: Value) -> Self {
        Self { key, provisional, related: Vec::new(), id_field: "id".to_string() }
    }

    /// Also invalidate `key` at settle.
    pub fn invalidating(mut self, key: CacheKey) -> Self {
        self.related.push(key);
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }
}

#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// The authoritative server record now sits where the provisional one was.
    Applied(Value),
    /// The provisional record was removed and the pre-mutation sequence
    /// restored; the last surviving record carries the error tag.
    RolledBack(ApiError),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }
}

/// Book-keeping for one in-flight mutation; discarded at settle.
struct OptimisticRecord {
    temp_id: String,
    snapshot: Option<Value>,
}

pub struct MutationCoordinator {
    cache: QueryCache,
}

impl MutationCoordinator {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Run the full protocol for one write. `send` is the API boundary call;
    /// its error is converted into cache state and the returned outcome,
    /// never propagated.
    pub async fn run<F>(&self, plan: MutationPlan, send: F) -> MutationOutcome
    where
        F: std::future::Future<Output = Result<Value, ApiError>>,
    {
        let lock = self.cache.mutation_lock(&plan.key);

        let record = {
            let _guard = lock.lock().await;
            // A stale read settling mid-mutation must not overwrite the
            // optimistic value.
            self.cache.cancel_in_flight(&plan.key);
            let snapshot = self.cache.value(&plan.key);

            let temp_id = Uuid::new_v4().to_string();
            let mut provisional = plan.provisional.clone();
            tag_provisional(&mut provisional, &plan.id_field, &temp_id);

            let mut list = as_list(snapshot.as_ref());
            list.push(provisional);
            self.cache.write(&plan.key, Value::Array(list));
            debug!("mutation apply key={} temp_id={}", plan.key, temp_id);

            OptimisticRecord { temp_id, snapshot }
        };

        let result = send.await;

        let _guard = lock.lock().await;
        let outcome = match result {
            Ok(server_record) => self.reconcile(&plan, &record, server_record),
            Err(err) => {
                warn!("mutation failed key={} status={}, rolling back", plan.key, err.status);
                self.rollback(&plan, &record);
                MutationOutcome::RolledBack(err)
            }
        };
        // Settle: force convergence with server state on next read.
        self.cache.invalidate(&plan.key);
        for related in &plan.related {
            self.cache.invalidate(related);
        }
        outcome
    }

    /// Replace the provisional record, located by temporary id, with the
    /// authoritative server record in the same position. If the temporary id
    /// is gone (an invalidation-driven refetch may have raced ahead), merge
    /// by server-assigned id instead of blindly appending, so the defensive
    /// append cannot produce a duplicate.
    fn reconcile(&self, plan: &MutationPlan, record: &OptimisticRecord, server_record: Value) -> MutationOutcome {
        let mut list = as_list(self.cache.value(&plan.key).as_ref());
        let by_temp = position_by_id(&list, &plan.id_field, &record.temp_id);
        match by_temp {
            Some(pos) => {
                list[pos] = server_record.clone();
            }
            None => {
                let server_id = server_record.get(&plan.id_field).cloned();
                let existing = server_id
                    .as_ref()
                    .and_then(|sid| list.iter().position(|rec| rec.get(&plan.id_field) == Some(sid)));
                match existing {
                    Some(pos) => list[pos] = server_record.clone(),
                    None => list.push(server_record.clone()),
                }
            }
        }
        self.cache.write(&plan.key, Value::Array(list));
        debug!("mutation reconciled key={} temp_id={}", plan.key, record.temp_id);
        MutationOutcome::Applied(server_record)
    }

    /// Restore the pre-mutation sequence and tag the last surviving record
    /// so the UI can surface a retry affordance instead of silently
    /// reverting. With no other mutation in flight this is a straight
    /// snapshot restore; if a later mutation's optimistic record is already
    /// applied under the key, only this mutation's record is removed, keyed
    /// by temporary id, so the later apply is not clobbered.
    fn rollback(&self, plan: &MutationPlan, record: &OptimisticRecord) {
        let current = as_list(self.cache.value(&plan.key).as_ref());
        let temp = Value::String(record.temp_id.clone());
        let others_pending = current.iter().any(|rec| {
            rec.get(OPTIMISTIC_TAG) == Some(&json!(true)) && rec.get(&plan.id_field) != Some(&temp)
        });
        let mut list = if others_pending {
            let mut surgical = current;
            surgical.retain(|rec| rec.get(&plan.id_field) != Some(&temp));
            surgical
        } else {
            as_list(record.snapshot.as_ref())
        };
        if let Some(last) = list
            .iter_mut()
            .rev()
            .find(|rec| rec.get(OPTIMISTIC_TAG) != Some(&json!(true)))
        {
            if let Some(obj) = last.as_object_mut() {
                obj.insert(OPTIMISTIC_TAG.to_string(), json!(false));
                obj.insert(ERROR_TAG.to_string(), json!(true));
            }
        }
        self.cache.write(&plan.key, Value::Array(list));
    }
}

fn tag_provisional(rec: &mut Value, id_field: &str, temp_id: &str) {
    match rec.as_object_mut() {
        Some(obj) => {
            obj.insert(id_field.to_string(), json!(temp_id));
            obj.insert(OPTIMISTIC_TAG.to_string(), json!(true));
        }
        None => {
            // Non-object provisional values cannot be tracked by id; the
            // record survives until settle's invalidation refetches.
            warn!("provisional record is not an object; optimistic tagging skipped");
        }
    }
}

fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn position_by_id(list: &[Value], id_field: &str, id: &str) -> Option<usize> {
    list.iter()
        .position(|rec| rec.get(id_field).and_then(Value::as_str) == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_builder_collects_related_keys() {
        let plan = MutationPlan::new(CacheKey::new("messages").scoped(1), json!({"body": "hi"}))
            .invalidating(CacheKey::new("threads"))
            .id_field("message_id");
        assert_eq!(plan.related.len(), 1);
        assert_eq!(plan.id_field, "message_id");
    }

    #[test]
    fn position_lookup_ignores_non_string_ids() {
        let list = vec![json!({"id": 7}), json!({"id": "abc"})];
        assert_eq!(position_by_id(&list, "id", "abc"), Some(1));
        assert_eq!(position_by_id(&list, "id", "7"), None);
    }
}
