//! The session: one operator, one open table, at most one active workflow.
//!
//! Operator input enters through the async methods below. Plan requests are
//! fed to the pure workflow machine; every remote effect it emits is run here
//! under its timeout and answered with the matching event until the machine
//! settles in a state that waits for the operator.

use std::sync::Arc;

use dyno_core::{DynoConfig, Item, TableDescriptor};
use dyno_plan::workflow::step;
use dyno_plan::{Effect, WorkflowError, WorkflowEvent, WorkflowState};
use dyno_planner::Planner;
use dyno_storage::{BatchOutcome, ContinuationToken, DynamoApi, StoreClient};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::items::ItemList;

/// The latest thing the operator should be told.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The planner declined the request.
    Refusal { reason: String },
    /// A read or direct statement returned items.
    Results { count: usize },
    /// A batch finished; `report` carries counts and the first failures.
    Outcome { report: String },
    /// The workflow stopped on a fatal error and awaits acknowledgement.
    Failure {
        kind: &'static str,
        message: String,
        retryable: bool,
    },
    Saved,
    Deleted,
}

pub struct Session<A, P> {
    store: StoreClient<A>,
    planner: P,
    config: Arc<DynoConfig>,
    tables: Vec<TableDescriptor>,
    current: Option<usize>,
    items: ItemList,
    next_page: Option<ContinuationToken>,
    exhausted: bool,
    workflow: WorkflowState,
    /// Set while `drive` runs; still set on entry means the last call was dropped.
    driving: bool,
    results: Vec<Item>,
    last_outcome: Option<BatchOutcome>,
    notice: Option<Notice>,
}

impl<A: DynamoApi, P: Planner> Session<A, P> {
    pub fn new(api: A, planner: P, config: Arc<DynoConfig>) -> Self {
        Self {
            store: StoreClient::new(api, &config),
            planner,
            config,
            tables: Vec::new(),
            current: None,
            items: ItemList::new(),
            next_page: None,
            exhausted: true,
            workflow: WorkflowState::Idle,
            driving: false,
            results: Vec::new(),
            last_outcome: None,
            notice: None,
        }
    }

    // ---- accessors ----

    pub fn store(&self) -> &StoreClient<A> {
        &self.store
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn config(&self) -> &DynoConfig {
        &self.config
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn current_table(&self) -> Option<&TableDescriptor> {
        self.current.and_then(|i| self.tables.get(i))
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    /// Whether another browsing page can be loaded.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn workflow(&self) -> &WorkflowState {
        &self.workflow
    }

    /// The pending discovery set while write confirmation is outstanding.
    pub fn discovered(&self) -> Option<&[Item]> {
        self.workflow.discovered()
    }

    /// Items from the last read or direct statement.
    pub fn results(&self) -> &[Item] {
        &self.results
    }

    pub fn last_outcome(&self) -> Option<&BatchOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    // ---- browsing ----

    /// Reload table names and descriptions. Keeps the open table selected
    /// when it still exists.
    pub async fn refresh_tables(&mut self) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        let open = self.current_table().map(|t| t.name.clone());
        self.tables = self.store.list_tables_with_details().await?;
        self.current = open.and_then(|name| self.tables.iter().position(|t| t.name == name));
        info!(tables = self.tables.len(), "table list refreshed");
        Ok(self.tables.len())
    }

    /// Open a table and load its first page.
    pub async fn open_table(&mut self, name: &str) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        let index = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| SessionError::UnknownTable {
                name: name.to_string(),
            })?;
        self.current = Some(index);
        self.items.clear();
        self.results.clear();
        self.next_page = None;
        self.exhausted = false;
        self.load_next_page().await
    }

    /// Append the next scan page to the item list. Returns how many items
    /// were added; zero once the table is exhausted.
    pub async fn load_next_page(&mut self) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        let table = self.require_table()?.name.clone();
        if self.exhausted {
            return Ok(0);
        }
        let page = self.store.scan_page(&table, self.next_page.take()).await?;
        let added = page.items.len();
        self.exhausted = page.is_last();
        self.next_page = page.next;
        self.items.extend_loaded(page.items);
        debug!(table = %table, added, total = self.items.len(), more = !self.exhausted, "page loaded");
        Ok(added)
    }

    pub fn select(&mut self, index: usize) {
        self.items.select(index);
    }

    /// Replace the current item with an edited copy.
    pub fn edit_current(&mut self, item: Item) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.items.edit_current(item) {
            Ok(())
        } else {
            Err(SessionError::NoCurrentItem)
        }
    }

    pub fn add_item(&mut self, item: Item) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.require_table()?;
        self.items.add_new(item);
        Ok(())
    }

    /// Put the current item. On success the entry is clean and no other
    /// entry shares its key.
    pub async fn save_current(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let table = self.require_table()?.clone();
        let entry = self.items.current().ok_or(SessionError::NoCurrentItem)?;
        if table.key_of(&entry.item).is_none() {
            return Err(SessionError::IncompleteKey { table: table.name });
        }
        self.store.put_item(&table.name, &entry.item).await?;
        self.items.mark_current_saved(&table);
        self.notice = Some(Notice::Saved);
        Ok(())
    }

    /// Delete the current item by its last known key, then drop it from the
    /// list.
    pub async fn delete_current(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let table = self.require_table()?.clone();
        let entry = self.items.current().ok_or(SessionError::NoCurrentItem)?;
        let key = table
            .key_of(&entry.item)
            .ok_or_else(|| SessionError::IncompleteKey {
                table: table.name.clone(),
            })?;
        if !entry.new {
            self.store.delete_item(&table.name, &key).await?;
        }
        self.items.remove_current();
        self.notice = Some(Notice::Deleted);
        Ok(())
    }

    // ---- plan workflow ----

    /// Submit a natural-language request for the open table.
    pub async fn ask(&mut self, request: &str) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.drive(WorkflowEvent::Submit {
            request: request.to_string(),
        })
        .await
    }

    /// Approve whatever the workflow is waiting on.
    pub async fn confirm(&mut self) -> Result<(), SessionError> {
        self.drive(WorkflowEvent::Confirm).await
    }

    /// Reject whatever the workflow is waiting on. Nothing remote happens.
    pub async fn decline(&mut self) -> Result<(), SessionError> {
        self.drive(WorkflowEvent::Decline).await
    }

    /// Clear a workflow error.
    pub async fn acknowledge(&mut self) -> Result<(), SessionError> {
        self.drive(WorkflowEvent::Acknowledge).await?;
        self.notice = None;
        Ok(())
    }

    /// A workflow call whose future was dropped mid-await leaves the machine
    /// in a waiting-on-remote state nothing will ever answer. Put it back to
    /// idle before accepting new input.
    fn recover_abandoned(&mut self) {
        if !self.driving {
            return;
        }
        warn!(
            state = self.workflow.name(),
            "previous workflow call was abandoned; resetting to idle"
        );
        self.workflow = WorkflowState::Idle;
        self.driving = false;
    }

    fn ensure_idle(&mut self) -> Result<(), SessionError> {
        self.recover_abandoned();
        if self.workflow.is_idle() {
            Ok(())
        } else {
            Err(SessionError::Busy {
                state: self.workflow.name(),
            })
        }
    }

    fn require_table(&self) -> Result<&TableDescriptor, SessionError> {
        self.current_table().ok_or(SessionError::NoTableSelected)
    }

    /// Feed one operator event, then answer remote effects until the machine
    /// waits for the operator again.
    async fn drive(&mut self, mut event: WorkflowEvent) -> Result<(), SessionError> {
        self.recover_abandoned();
        let table = self.require_table()?.clone();
        self.driving = true;
        loop {
            let event_name = event.name();
            let state = std::mem::take(&mut self.workflow);
            let next = step(state, event, &table);
            self.workflow = next.state;
            if !next.accepted {
                self.driving = false;
                return Err(SessionError::NotApplicable {
                    event: event_name,
                    state: self.workflow.name(),
                });
            }
            match next.effect {
                Some(effect) => match self.perform(effect, &table).await {
                    Some(answer) => event = answer,
                    None => break,
                },
                None => break,
            }
        }
        self.driving = false;
        if let Some(err) = self.workflow.error() {
            self.notice = Some(failure_notice(err));
        }
        Ok(())
    }

    /// Run one effect. Remote effects return the event that answers them.
    async fn perform(&mut self, effect: Effect, table: &TableDescriptor) -> Option<WorkflowEvent> {
        match effect {
            Effect::InvokePlanner { request } => Some(self.invoke_planner(&request, table).await),
            Effect::ExecuteStatement { statement } => {
                Some(match self.store.execute_statement(&statement).await {
                    Ok(items) => WorkflowEvent::StatementCompleted { items },
                    Err(err) => WorkflowEvent::StatementFailed(err),
                })
            }
            Effect::ExecuteRead { statement } => {
                Some(match self.store.execute_statement(&statement).await {
                    Ok(items) => WorkflowEvent::ReadCompleted { items },
                    Err(err) => WorkflowEvent::ReadFailed(err),
                })
            }
            Effect::SubmitBatch { statements } => {
                let outcome = self.store.submit_batch(&statements).await;
                Some(WorkflowEvent::BatchCompleted(outcome))
            }
            Effect::ShowItems { items } => {
                self.notice = Some(Notice::Results { count: items.len() });
                self.results = items;
                None
            }
            Effect::ShowOutcome(outcome) => {
                let report = outcome.report(self.config.batch.failure_preview);
                if outcome.all_succeeded() {
                    info!(summary = %outcome.summary(), "batch finished");
                } else {
                    warn!(summary = %outcome.summary(), "batch finished with failures");
                }
                self.notice = Some(Notice::Outcome { report });
                self.last_outcome = Some(outcome);
                None
            }
            Effect::ShowRefusal { reason } => {
                self.notice = Some(Notice::Refusal { reason });
                None
            }
        }
    }

    async fn invoke_planner(&self, request: &str, table: &TableDescriptor) -> WorkflowEvent {
        let limit = self.config.timeouts.planner();
        match tokio::time::timeout(limit, self.planner.plan(request, table)).await {
            Ok(Ok(raw)) => WorkflowEvent::PlannerReturned(raw),
            Ok(Err(err)) => {
                warn!(kind = err.kind(), error = %err, "planner failed");
                WorkflowEvent::PlannerFailed {
                    message: err.to_string(),
                }
            }
            Err(_) => {
                warn!(after_ms = limit.as_millis() as u64, "planner timed out");
                WorkflowEvent::PlannerFailed {
                    message: format!("planner timed out after {}ms", limit.as_millis()),
                }
            }
        }
    }
}

fn failure_notice(err: &WorkflowError) -> Notice {
    Notice::Failure {
        kind: err.kind(),
        message: err.to_string(),
        retryable: err.is_retryable(),
    }
}
