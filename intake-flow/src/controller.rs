use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    conversation::{Conversation, Effect},
    message::Message,
    recommendation::RecommendationClient,
    stage::{Event, Stage},
};

/// Delay before the side channel's canned acknowledgement.
pub const DEFAULT_ACKNOWLEDGEMENT_DELAY: Duration = Duration::from_millis(1200);

/// Drives a [`Conversation`] through one event, including the asynchronous
/// part of a transition (the recommendation call or the acknowledgement delay).
///
/// The controller holds no per-conversation state, so one instance can be
/// shared across every session.
#[derive(Clone)]
pub struct Controller {
    client: Arc<dyn RecommendationClient>,
    acknowledgement_delay: Duration,
}

impl Controller {
    pub fn new(client: Arc<dyn RecommendationClient>) -> Self {
        Self {
            client,
            acknowledgement_delay: DEFAULT_ACKNOWLEDGEMENT_DELAY,
        }
    }

    pub fn with_acknowledgement_delay(mut self, delay: Duration) -> Self {
        self.acknowledgement_delay = delay;
        self
    }

    /// Apply `event` and wait for whatever it started to settle.
    ///
    /// Never fails: recommendation errors become the apology message and end
    /// the flow at [`Stage::Done`].
    #[instrument(skip(self, conversation, event), fields(event = event.name(), stage = ?conversation.stage()))]
    pub async fn dispatch(&self, conversation: &mut Conversation, event: Event) -> DispatchResult {
        let logged = conversation.log().len();

        let status = match conversation.apply(event) {
            Effect::Ignored => FlowStatus::Ignored,
            Effect::Buffered | Effect::Advanced { .. } => FlowStatus::from_stage(conversation.stage()),
            Effect::RequestRecommendation { history } => {
                info!(messages = history.len(), "Requesting recommendation");
                let outcome = self.client.recommend(&history).await;
                FlowStatus::from_stage(conversation.settle_recommendation(outcome))
            }
            Effect::Acknowledge { text } => {
                tokio::time::sleep(self.acknowledgement_delay).await;
                conversation.acknowledge(&text);
                FlowStatus::from_stage(conversation.stage())
            }
        };

        let log = conversation.log();
        // a restart shrinks the log back to the greeting
        let appended = if log.len() < logged {
            log.entries().to_vec()
        } else {
            log.since(logged).to_vec()
        };

        DispatchResult {
            appended,
            stage: conversation.stage(),
            status,
        }
    }
}

/// Outcome of one dispatched event.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    /// Messages appended by this event, in order. After a restart this is
    /// the fresh greeting.
    pub appended: Vec<Message>,
    pub stage: Stage,
    pub status: FlowStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// The event did not apply to the current stage.
    Ignored,
    /// Waiting for the next user action.
    WaitingForInput,
    /// Reached `NextSteps` or `Done`.
    Completed,
}

impl FlowStatus {
    fn from_stage(stage: Stage) -> Self {
        if stage.is_terminal() {
            FlowStatus::Completed
        } else {
            FlowStatus::WaitingForInput
        }
    }
}
