//! Delivery-agent participant.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::{AgentId, TransactionId};
use coordinator::{Participant, ParticipantError, ParticipantTracker, TransactionState};
use tokio::sync::RwLock;

/// A delivery agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAgent {
    pub id: AgentId,
    pub location: String,
    pub available: bool,
    /// The transaction currently holding the agent, staged or committed.
    pub assigned_to: Option<TransactionId>,
}

impl DeliveryAgent {
    fn new(id: AgentId, location: String) -> Self {
        Self {
            id,
            location,
            available: true,
            assigned_to: None,
        }
    }

    fn is_held_by(&self, transaction_id: &TransactionId) -> bool {
        self.assigned_to.as_ref() == Some(transaction_id)
    }

    fn release(&mut self) {
        self.available = true;
        self.assigned_to = None;
    }
}

#[derive(Debug, Default)]
struct DeliveryState {
    // Ordered so that "first available" is deterministic.
    agents: BTreeMap<AgentId, DeliveryAgent>,
    assignments: HashMap<TransactionId, AgentId>,
}

/// The delivery service.
///
/// An agent is taken out of the pool as soon as it is assigned, so two
/// concurrent orders can never be given the same agent. Abort puts it back;
/// commit keeps it busy until [`Delivery::complete_delivery`].
#[derive(Debug, Default)]
pub struct Delivery {
    tracker: ParticipantTracker,
    state: RwLock<DeliveryState>,
}

impl Delivery {
    /// Creates a delivery service with no agents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an available agent.
    pub async fn add_agent(
        &self,
        agent_id: impl Into<AgentId>,
        location: impl Into<String>,
    ) -> Result<(), ParticipantError> {
        let agent_id = agent_id.into();
        let mut state = self.state.write().await;

        if state.agents.contains_key(&agent_id) {
            return Err(ParticipantError::DuplicateAgent(agent_id));
        }

        let agent = DeliveryAgent::new(agent_id.clone(), location.into());
        tracing::debug!(agent_id = %agent.id, location = %agent.location, "agent added");
        state.agents.insert(agent_id, agent);
        Ok(())
    }

    /// Returns an agent by ID.
    pub async fn agent(&self, agent_id: &AgentId) -> Option<DeliveryAgent> {
        self.state.read().await.agents.get(agent_id).cloned()
    }

    /// Returns every agent, ordered by ID.
    pub async fn agents(&self) -> Vec<DeliveryAgent> {
        self.state.read().await.agents.values().cloned().collect()
    }

    /// Returns the number of agents free to take an order.
    pub async fn available_agents(&self) -> usize {
        self.state
            .read()
            .await
            .agents
            .values()
            .filter(|a| a.available)
            .count()
    }

    /// Returns the agent assigned to a not-yet-finished transaction.
    pub async fn assignment(&self, transaction_id: &TransactionId) -> Option<AgentId> {
        self.state
            .read()
            .await
            .assignments
            .get(transaction_id)
            .cloned()
    }

    /// Assigns the first available agent to the transaction.
    ///
    /// The location is not used for matching yet: the lowest available agent
    /// ID wins.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn assign_agent(
        &self,
        transaction_id: &TransactionId,
        location: &str,
    ) -> Result<AgentId, ParticipantError> {
        let mut state = self.state.write().await;

        if state.assignments.contains_key(transaction_id) {
            return Err(ParticipantError::AlreadyExists(transaction_id.clone()));
        }

        let Some(agent) = state.agents.values_mut().find(|a| a.available) else {
            tracing::warn!("no delivery agents available");
            return Err(ParticipantError::NoAgentsAvailable);
        };

        agent.available = false;
        agent.assigned_to = Some(transaction_id.clone());
        let agent_id = agent.id.clone();

        state
            .assignments
            .insert(transaction_id.clone(), agent_id.clone());
        self.tracker.track(transaction_id).await;

        metrics::counter!("delivery_agents_assigned_total").increment(1);
        tracing::debug!(%agent_id, "agent assigned");
        Ok(agent_id)
    }

    /// Returns a committed agent to the pool once its delivery is done.
    ///
    /// Fails if the agent is unknown or still held by an unfinished
    /// transaction. Completing an idle agent is a no-op.
    #[tracing::instrument(skip(self), fields(agent_id = %agent_id))]
    pub async fn complete_delivery(&self, agent_id: &AgentId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        let held_by = state
            .agents
            .get(agent_id)
            .ok_or_else(|| ParticipantError::AgentNotFound(agent_id.clone()))?
            .assigned_to
            .clone();

        if let Some(transaction_id) = held_by
            && state.assignments.contains_key(&transaction_id)
        {
            let actual = self.tracker.get(&transaction_id).await.unwrap_or_default();
            return Err(ParticipantError::InvalidState {
                transaction_id,
                expected: "Committed",
                actual,
            });
        }

        if let Some(agent) = state.agents.get_mut(agent_id) {
            agent.release();
        }
        tracing::debug!("delivery completed");
        Ok(())
    }
}

#[async_trait]
impl Participant for Delivery {
    /// Confirms the assigned agent is still held for this transaction.
    #[tracing::instrument(skip(self), fields(participant = "delivery", transaction_id = %transaction_id))]
    async fn prepare(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        let agent_id = state
            .assignments
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| ParticipantError::NotFound(transaction_id.clone()))?;

        self.tracker.ensure_can_prepare(transaction_id).await?;

        match state.agents.get_mut(&agent_id) {
            Some(agent) if agent.is_held_by(transaction_id) => agent.available = false,
            _ => return Err(ParticipantError::AgentUnavailable(agent_id)),
        }

        self.tracker.prepare(transaction_id).await
    }

    /// Drops the assignment record; the agent stays busy with the delivery.
    #[tracing::instrument(skip(self), fields(participant = "delivery", transaction_id = %transaction_id))]
    async fn commit(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        self.tracker.ensure_can_commit(transaction_id).await?;
        state.assignments.remove(transaction_id);

        self.tracker.commit(transaction_id).await
    }

    /// Puts the assigned agent back in the pool.
    #[tracing::instrument(skip(self), fields(participant = "delivery", transaction_id = %transaction_id))]
    async fn abort(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        if let Some(agent_id) = state.assignments.remove(transaction_id)
            && let Some(agent) = state.agents.get_mut(&agent_id)
            && agent.is_held_by(transaction_id)
        {
            agent.release();
            tracing::debug!(%agent_id, "agent released");
        }

        self.tracker.abort(transaction_id).await
    }

    async fn state(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionState, ParticipantError> {
        self.tracker.state(transaction_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn delivery_with_agents() -> Delivery {
        let delivery = Delivery::new();
        delivery.add_agent("agent1", "location1").await.unwrap();
        delivery.add_agent("agent2", "location2").await.unwrap();
        delivery
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::from(id)
    }

    #[tokio::test]
    async fn test_assign_first_available() {
        let delivery = delivery_with_agents().await;

        let first = delivery.assign_agent(&tx("t1"), "home").await.unwrap();
        let second = delivery.assign_agent(&tx("t2"), "home").await.unwrap();

        assert_eq!(first, AgentId::from("agent1"));
        assert_eq!(second, AgentId::from("agent2"));
        assert_eq!(delivery.available_agents().await, 0);
        assert_eq!(delivery.assignment(&tx("t1")).await, Some(first));
    }

    #[tokio::test]
    async fn test_assign_without_agents() {
        let delivery = Delivery::new();
        let result = delivery.assign_agent(&tx("t1"), "home").await;
        assert!(matches!(result, Err(ParticipantError::NoAgentsAvailable)));
        assert!(delivery.state(&tx("t1")).await.is_err());
    }

    #[tokio::test]
    async fn test_assign_twice_fails() {
        let delivery = delivery_with_agents().await;
        delivery.assign_agent(&tx("t1"), "home").await.unwrap();

        let result = delivery.assign_agent(&tx("t1"), "home").await;
        assert!(matches!(result, Err(ParticipantError::AlreadyExists(_))));
        assert_eq!(delivery.available_agents().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_agent_rejected() {
        let delivery = delivery_with_agents().await;
        let result = delivery.add_agent("agent1", "elsewhere").await;
        assert!(matches!(result, Err(ParticipantError::DuplicateAgent(_))));
    }

    #[tokio::test]
    async fn test_prepare_commit_keeps_agent_busy() {
        let delivery = delivery_with_agents().await;
        let agent_id = delivery.assign_agent(&tx("t1"), "home").await.unwrap();

        delivery.prepare(&tx("t1")).await.unwrap();
        delivery.commit(&tx("t1")).await.unwrap();

        let agent = delivery.agent(&agent_id).await.unwrap();
        assert!(!agent.available);
        assert_eq!(agent.assigned_to, Some(tx("t1")));
        assert_eq!(delivery.assignment(&tx("t1")).await, None);
        assert_eq!(
            delivery.state(&tx("t1")).await.unwrap(),
            TransactionState::Committed
        );
    }

    #[tokio::test]
    async fn test_prepare_without_assignment_not_found() {
        let delivery = delivery_with_agents().await;
        let result = delivery.prepare(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_prepare_fails_when_agent_released() {
        let delivery = delivery_with_agents().await;
        let agent_id = delivery.assign_agent(&tx("t1"), "home").await.unwrap();

        // Simulate the agent being freed underneath the staged transaction.
        delivery
            .state
            .write()
            .await
            .agents
            .get_mut(&agent_id)
            .unwrap()
            .release();

        let result = delivery.prepare(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::AgentUnavailable(id)) if id == agent_id));
    }

    #[tokio::test]
    async fn test_abort_releases_agent() {
        let delivery = delivery_with_agents().await;
        let agent_id = delivery.assign_agent(&tx("t1"), "home").await.unwrap();
        delivery.prepare(&tx("t1")).await.unwrap();

        delivery.abort(&tx("t1")).await.unwrap();
        let agent = delivery.agent(&agent_id).await.unwrap();
        assert!(agent.available);
        assert_eq!(agent.assigned_to, None);
        assert_eq!(delivery.available_agents().await, 2);
        assert_eq!(
            delivery.state(&tx("t1")).await.unwrap(),
            TransactionState::Aborted
        );

        delivery.abort(&tx("t1")).await.unwrap();
        assert_eq!(delivery.available_agents().await, 2);
    }

    #[tokio::test]
    async fn test_abort_after_commit_keeps_agent() {
        let delivery = delivery_with_agents().await;
        let agent_id = delivery.assign_agent(&tx("t1"), "home").await.unwrap();
        delivery.prepare(&tx("t1")).await.unwrap();
        delivery.commit(&tx("t1")).await.unwrap();

        delivery.abort(&tx("t1")).await.unwrap();
        assert!(!delivery.agent(&agent_id).await.unwrap().available);
    }

    #[tokio::test]
    async fn test_complete_delivery() {
        let delivery = delivery_with_agents().await;
        let agent_id = delivery.assign_agent(&tx("t1"), "home").await.unwrap();

        let result = delivery.complete_delivery(&agent_id).await;
        assert!(matches!(
            result,
            Err(ParticipantError::InvalidState {
                actual: TransactionState::Initialized,
                ..
            })
        ));

        delivery.prepare(&tx("t1")).await.unwrap();
        delivery.commit(&tx("t1")).await.unwrap();
        delivery.complete_delivery(&agent_id).await.unwrap();

        assert!(delivery.agent(&agent_id).await.unwrap().available);
        assert_eq!(delivery.available_agents().await, 2);
    }

    #[tokio::test]
    async fn test_complete_unknown_agent() {
        let delivery = delivery_with_agents().await;
        let result = delivery.complete_delivery(&AgentId::from("ghost")).await;
        assert!(matches!(result, Err(ParticipantError::AgentNotFound(_))));
    }
}
