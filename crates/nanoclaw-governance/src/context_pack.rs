//! Context Pack assembly (spec.md §4.G): the IPC snapshot delivered to a
//! worker group before dispatch, combining task metadata, product
//! context, execution/evidence activity, a trailing activity window, gate
//! approvals, and scope/product-filtered relevant memories.

use nanoclaw_core::{ContextPack, GovScope, GovTask, GroupFolder};
use nanoclaw_memory::MemoryBroker;
use nanoclaw_storage::store::Store;
use nanoclaw_storage::{GovernanceRepository, ProductRepository};

use crate::error::GovernanceResult;

/// Trailing activity window size, independent of evidence/summary
/// filtering.
const RECENT_ACTIVITY_WINDOW: usize = 10;

/// Build the Context Pack for dispatching `task` to `group`.
pub async fn build(
    store: &Store,
    main_group: &GroupFolder,
    task: &GovTask,
    group: &GroupFolder,
) -> GovernanceResult<ContextPack> {
    let gov_repo = GovernanceRepository::new(store);
    let activities = gov_repo.activities_for(&task.id).await?;
    let approvals = gov_repo.approvals_for(&task.id).await?;

    let execution_summary = activities
        .iter()
        .filter(|a| a.action == "execution_summary")
        .cloned()
        .collect();
    let evidence = activities
        .iter()
        .filter(|a| a.action == "evidence")
        .cloned()
        .collect();
    let recent_activities = activities
        .iter()
        .rev()
        .take(RECENT_ACTIVITY_WINDOW)
        .rev()
        .cloned()
        .collect();

    let product_context = match (&task.scope, &task.product_id) {
        (GovScope::Product, Some(product_id)) => {
            let products = ProductRepository::new(store);
            products
                .get(product_id)
                .await?
                .map(|p| serde_json::to_value(p).unwrap_or(serde_json::Value::Null))
        }
        _ => None,
    };

    let memory_repo = nanoclaw_storage::MemoryRepository::new(store);
    let memory_broker = MemoryBroker::new(memory_repo, main_group.clone());
    let relevant_memories = memory_broker
        .recall(
            group,
            &task.title,
            task.product_id.as_ref(),
            10,
            chrono::Utc::now(),
        )
        .await?;

    Ok(ContextPack {
        task: task.clone(),
        product_context,
        execution_summary,
        evidence,
        recent_activities,
        approvals,
        relevant_memories,
    })
}
