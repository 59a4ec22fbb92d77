//! The questionnaire state machine.
//!
//! [`Conversation::apply`] is the synchronous half of every transition: it
//! checks the guard for the current stage, updates buffers, appends to the
//! log and moves the stage. Events that need to wait on something (the
//! recommendation call, the side-channel acknowledgement) come back as an
//! [`Effect`] which the [`Controller`](crate::Controller) resolves and then
//! settles with [`Conversation::settle_recommendation`] or
//! [`Conversation::acknowledge`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    error::Result,
    message::{Message, MessageLog},
    profile::{AgeGroup, FormBuffers, InsuranceProduct},
    prompt::recommendation_prompt,
    stage::{Affordance, Event, Stage},
};

pub const GREETING: &str = "I’m Tina. I help you choose the right car insurance policy. May I ask you a few personal questions to make sure I recommend the best policy for you?";
pub const ASK_AGE: &str = "Great! Please select your age group.";
pub const FAREWELL: &str = "Okay, feel free to ask me anytime!";
pub const ASK_INSURANCE: &str = "Which insurance types interest you? Select all that apply.";
pub const ASK_VEHICLE: &str = "Great! Now, to help me recommend the best policy, could you tell me a little more about your vehicle? What make, model, and year is it?";
pub const ANALYZING: &str = "Thanks! Let me analyze your answers and recommend the best policy...";
pub const APOLOGY: &str = "Sorry, something went wrong getting the AI response.";

fn ask_additional(make: &str, model: &str, year: &str) -> String {
    format!(
        "Great! A {year} {make} {model}. Do you need to insure other vehicles as well? And will this car be used primarily for personal or business purposes?"
    )
}

fn acknowledgement(text: &str) -> String {
    format!("Thanks for your message: \"{text}\"")
}

/// What applying an event asks of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Guard failed or the event does not belong to this stage. Nothing changed.
    Ignored,
    /// A form buffer changed; stage and log did not.
    Buffered,
    /// The stage moved.
    Advanced { from: Stage, to: Stage },
    /// The quote was confirmed. The caller must send `history` to the
    /// recommendation service and pass the outcome to
    /// [`Conversation::settle_recommendation`].
    RequestRecommendation { history: Vec<Message> },
    /// A side-channel message was echoed. After the simulated delay the
    /// caller must call [`Conversation::acknowledge`] with `text`.
    Acknowledge { text: String },
}

/// State of one chat: log, stage and form buffers, plus the typing indicator.
#[derive(Debug)]
pub struct Conversation {
    log: MessageLog,
    stage: Stage,
    form: FormBuffers,
    typing: watch::Sender<bool>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let (typing, _) = watch::channel(false);
        Self {
            log: MessageLog::with_greeting(GREETING),
            stage: Stage::Consent,
            form: FormBuffers::default(),
            typing,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn form(&self) -> &FormBuffers {
        &self.form
    }

    pub fn is_typing(&self) -> bool {
        *self.typing.borrow()
    }

    /// Receiver that follows the typing indicator, readable while a call is
    /// pending on another task.
    pub fn subscribe_typing(&self) -> watch::Receiver<bool> {
        self.typing.subscribe()
    }

    fn set_typing(&self, typing: bool) {
        self.typing.send_replace(typing);
    }

    fn advance(&mut self, to: Stage) -> Effect {
        let from = self.stage;
        self.stage = to;
        debug!(?from, ?to, "Stage advanced");
        Effect::Advanced { from, to }
    }

    /// Take the happy-path step out of the current stage.
    fn advance_forward(&mut self) -> Effect {
        match self.stage.next() {
            Some(to) => self.advance(to),
            None => Effect::Ignored,
        }
    }

    /// Apply one user event to the current stage.
    pub fn apply(&mut self, event: Event) -> Effect {
        match (self.stage, event) {
            (Stage::Consent, Event::Consent { agree }) => {
                if agree {
                    self.log.push(Message::user("Yes"));
                    self.log.push(Message::ai(ASK_AGE));
                    self.advance_forward()
                } else {
                    self.log.push(Message::user("No"));
                    self.log.push(Message::ai(FAREWELL));
                    self.advance(Stage::Done)
                }
            }

            (Stage::AskAge, Event::SelectAge { group }) => {
                let Ok(group) = group.parse::<AgeGroup>() else {
                    return Effect::Ignored;
                };
                self.form.age_group = Some(group);
                self.log.push(Message::user(group.label()));
                self.log.push(Message::ai(ASK_INSURANCE));
                self.advance_forward()
            }

            (Stage::AskInsurance, Event::ToggleInsurance { product }) => {
                match product.parse::<InsuranceProduct>() {
                    Ok(product) => {
                        self.form.insurance.toggle(product);
                        Effect::Buffered
                    }
                    Err(_) => Effect::Ignored,
                }
            }

            (Stage::AskInsurance, Event::SubmitInsurance { products }) => {
                if let Some(labels) = products {
                    let parsed: std::result::Result<Vec<_>, _> = labels
                        .iter()
                        .map(|l| l.parse::<InsuranceProduct>())
                        .collect();
                    let Ok(parsed) = parsed else {
                        return Effect::Ignored;
                    };
                    self.form.insurance = parsed.into_iter().collect();
                }
                if self.form.insurance.is_empty() {
                    return Effect::Ignored;
                }
                self.log.push(Message::user(self.form.insurance.joined()));
                self.log.push(Message::ai(ASK_VEHICLE));
                self.advance_forward()
            }

            (Stage::AskVehicle, Event::EditVehicle { field, value }) => {
                self.form.vehicle.set(field, value);
                Effect::Buffered
            }

            (Stage::AskVehicle, Event::SubmitVehicle { make, model, year }) => {
                let vehicle = &mut self.form.vehicle;
                if let Some(make) = make {
                    vehicle.make = make;
                }
                if let Some(model) = model {
                    vehicle.model = model;
                }
                if let Some(year) = year {
                    vehicle.year = year;
                }
                if !vehicle.is_complete() {
                    return Effect::Ignored;
                }
                let prompt = ask_additional(
                    vehicle.make.trim(),
                    vehicle.model.trim(),
                    vehicle.year.trim(),
                );
                self.log.push(Message::user(vehicle.describe()));
                self.log.push(Message::ai(prompt));
                self.advance_forward()
            }

            (Stage::AskAdditional, Event::EditAdditional { text }) => {
                self.form.additional_info = text;
                Effect::Buffered
            }

            (Stage::AskAdditional, Event::SubmitAdditional { text }) => {
                if let Some(text) = text {
                    self.form.additional_info = text;
                }
                let text = self.form.additional_info.trim();
                if text.is_empty() {
                    return Effect::Ignored;
                }
                self.log.push(Message::user(text));
                self.advance_forward()
            }

            (Stage::ReadyForQuote, Event::Confirm) => {
                if self.is_typing() {
                    return Effect::Ignored;
                }
                let mut history = self.log.entries().to_vec();
                history.push(Message::user(recommendation_prompt(&self.form)));
                self.log.push(Message::ai(ANALYZING));
                self.set_typing(true);
                Effect::RequestRecommendation { history }
            }

            (stage, Event::Restart) if stage.accepts_restart() => {
                self.log.reset(GREETING);
                self.form.clear();
                self.set_typing(false);
                self.advance(Stage::Consent)
            }

            (stage, Event::EditMessage { text }) if stage.accepts_free_text() => {
                self.form.chat_input = text;
                Effect::Buffered
            }

            (stage, Event::SendMessage { text }) if stage.accepts_free_text() => {
                let text = text.unwrap_or_else(|| std::mem::take(&mut self.form.chat_input));
                let text = text.trim().to_string();
                self.form.chat_input.clear();
                if text.is_empty() {
                    return Effect::Ignored;
                }
                self.log.push(Message::user(text.clone()));
                self.set_typing(true);
                Effect::Acknowledge { text }
            }

            (stage, event) => {
                debug!(?stage, event = event.name(), "Event ignored for stage");
                Effect::Ignored
            }
        }
    }

    /// Settle a pending recommendation call. Success moves to `NextSteps`;
    /// any failure appends the apology and ends the flow at `Done`.
    pub fn settle_recommendation(&mut self, outcome: Result<String>) -> Stage {
        self.set_typing(false);
        match outcome {
            Ok(recommendation) => {
                info!("Recommendation received");
                self.log.push(Message::ai(recommendation));
                self.advance_forward();
            }
            Err(e) => {
                error!(error = %e, "AI response error");
                self.log.push(Message::ai(APOLOGY));
                self.advance(Stage::Done);
            }
        }
        self.stage
    }

    /// Append the canned side-channel acknowledgement for `text`.
    pub fn acknowledge(&mut self, text: &str) {
        self.log.push(Message::ai(acknowledgement(text)));
        self.set_typing(false);
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            stage: self.stage,
            affordance: self.stage.affordance(),
            accepts_free_text: self.stage.accepts_free_text(),
            typing: self.is_typing(),
            log: self.log.entries().to_vec(),
            form: self.form.clone(),
        }
    }
}

/// Read-only view of a conversation, handed to renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub stage: Stage,
    pub affordance: Affordance,
    pub accepts_free_text: bool,
    pub typing: bool,
    pub log: Vec<Message>,
    pub form: FormBuffers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::message::Speaker;
    use crate::profile::VehicleField;

    fn at_ready_for_quote() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        conversation.apply(Event::select_age("26-40"));
        conversation.apply(Event::submit_insurance(["Comprehensive Insurance"]));
        conversation.apply(Event::submit_vehicle("Toyota", "Corolla", "2015"));
        conversation.apply(Event::submit_additional("Just this one, personal use"));
        assert_eq!(conversation.stage(), Stage::ReadyForQuote);
        conversation
    }

    #[test]
    fn test_refusal_ends_after_two_appends() {
        let mut conversation = Conversation::new();
        let effect = conversation.apply(Event::consent(false));

        assert_eq!(
            effect,
            Effect::Advanced {
                from: Stage::Consent,
                to: Stage::Done
            }
        );
        assert_eq!(
            conversation.log().since(1),
            &[Message::user("No"), Message::ai(FAREWELL)]
        );
    }

    #[test]
    fn test_unknown_age_group_is_ignored() {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        let before = conversation.log().clone();

        assert_eq!(conversation.apply(Event::select_age("30")), Effect::Ignored);
        assert_eq!(conversation.stage(), Stage::AskAge);
        assert_eq!(conversation.log(), &before);
        assert_eq!(conversation.form().age_group, None);
    }

    #[test]
    fn test_empty_insurance_submit_is_ignored() {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        conversation.apply(Event::select_age("18-25"));
        let before = conversation.log().clone();

        let effect = conversation.apply(Event::SubmitInsurance { products: None });
        assert_eq!(effect, Effect::Ignored);
        assert_eq!(conversation.stage(), Stage::AskInsurance);
        assert_eq!(conversation.log(), &before);

        // toggled on and off again is still empty
        conversation.apply(Event::toggle_insurance("Third Party Insurance"));
        conversation.apply(Event::toggle_insurance("Third Party Insurance"));
        let effect = conversation.apply(Event::SubmitInsurance { products: None });
        assert_eq!(effect, Effect::Ignored);
        assert_eq!(conversation.log(), &before);
    }

    #[test]
    fn test_toggled_insurance_is_echoed_joined() {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        conversation.apply(Event::select_age("41-60"));
        assert_eq!(
            conversation.apply(Event::toggle_insurance("Comprehensive Insurance")),
            Effect::Buffered
        );
        conversation.apply(Event::toggle_insurance("Mechanical Breakdown Insurance (MBI)"));
        conversation.apply(Event::SubmitInsurance { products: None });

        assert_eq!(conversation.stage(), Stage::AskVehicle);
        assert_eq!(
            conversation.log().since(conversation.log().len() - 2),
            &[
                Message::user("Comprehensive Insurance, Mechanical Breakdown Insurance (MBI)"),
                Message::ai(ASK_VEHICLE)
            ]
        );
    }

    #[test]
    fn test_incomplete_vehicle_is_ignored() {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        conversation.apply(Event::select_age("26-40"));
        conversation.apply(Event::submit_insurance(["Comprehensive Insurance"]));
        let before = conversation.log().clone();

        for (make, model, year) in [("", "Corolla", "2015"), ("Toyota", "", "2015"), ("Toyota", "Corolla", " ")] {
            let effect = conversation.apply(Event::submit_vehicle(make, model, year));
            assert_eq!(effect, Effect::Ignored);
            assert_eq!(conversation.stage(), Stage::AskVehicle);
            assert_eq!(conversation.log(), &before);
        }
    }

    #[test]
    fn test_vehicle_form_edits_then_submit() {
        let mut conversation = Conversation::new();
        conversation.apply(Event::consent(true));
        conversation.apply(Event::select_age("26-40"));
        conversation.apply(Event::submit_insurance(["Third Party Insurance"]));
        for (field, value) in [
            (VehicleField::Make, "Mazda"),
            (VehicleField::Model, "3"),
            (VehicleField::Year, "2019"),
        ] {
            conversation.apply(Event::EditVehicle {
                field,
                value: value.to_string(),
            });
        }
        conversation.apply(Event::SubmitVehicle {
            make: None,
            model: None,
            year: None,
        });

        assert_eq!(conversation.stage(), Stage::AskAdditional);
        let log = conversation.log().entries();
        assert_eq!(log[log.len() - 2], Message::user("Mazda 3, 2019"));
        assert!(log[log.len() - 1].text.starts_with("Great! A 2019 Mazda 3."));
    }

    #[test]
    fn test_happy_path_follows_forward_walk() {
        let mut conversation = Conversation::new();
        let mut expected = Stage::Consent;
        for event in [
            Event::consent(true),
            Event::select_age("Over 60"),
            Event::submit_insurance(["Mechanical Breakdown Insurance (MBI)"]),
            Event::submit_vehicle("Ford", "Ranger", "2012"),
            Event::submit_additional("Two cars, business use"),
        ] {
            let next = expected.next().unwrap();
            assert_eq!(
                conversation.apply(event),
                Effect::Advanced {
                    from: expected,
                    to: next
                }
            );
            expected = next;
        }
        conversation.apply(Event::Confirm);
        conversation.settle_recommendation(Ok("MBI and Third Party".to_string()));
        assert_eq!(Some(conversation.stage()), expected.next());
        assert_eq!(conversation.stage(), Stage::NextSteps);
    }

    #[test]
    fn test_additional_info_echo_has_no_ai_reply() {
        let conversation = at_ready_for_quote();
        assert_eq!(
            conversation.log().last(),
            Some(&Message::user("Just this one, personal use"))
        );
    }

    #[test]
    fn test_confirm_sends_prompt_outside_log() {
        let mut conversation = at_ready_for_quote();
        let logged = conversation.log().len();

        let Effect::RequestRecommendation { history } = conversation.apply(Event::Confirm) else {
            panic!("confirm should request a recommendation");
        };

        assert_eq!(history.len(), logged + 1);
        let prompt = history.last().unwrap();
        assert_eq!(prompt.speaker, Speaker::User);
        assert!(prompt.text.contains("- Vehicle: Toyota Corolla, 2015"));
        assert!(prompt.text.contains("- Additional Info: Just this one, personal use"));

        assert_eq!(conversation.log().last(), Some(&Message::ai(ANALYZING)));
        assert!(conversation.is_typing());
        assert!(!conversation.log().entries().iter().any(|m| m.text == prompt.text));

        // pending call blocks a second confirm
        assert_eq!(conversation.apply(Event::Confirm), Effect::Ignored);
    }

    #[test]
    fn test_failed_recommendation_ends_at_done() {
        let mut conversation = at_ready_for_quote();
        conversation.apply(Event::Confirm);

        let stage = conversation.settle_recommendation(Err(FlowError::Service {
            status: 500,
            detail: "boom".to_string(),
        }));

        assert_eq!(stage, Stage::Done);
        assert_eq!(conversation.log().last(), Some(&Message::ai(APOLOGY)));
        assert!(!conversation.is_typing());
    }

    #[test]
    fn test_restart_clears_everything() {
        let mut conversation = at_ready_for_quote();
        conversation.apply(Event::Confirm);
        conversation.settle_recommendation(Ok("Recommend Third Party".to_string()));
        assert_eq!(conversation.stage(), Stage::NextSteps);

        conversation.apply(Event::Restart);

        assert_eq!(conversation.stage(), Stage::Consent);
        assert_eq!(conversation.log().entries(), &[Message::ai(GREETING)]);
        assert_eq!(conversation.form(), &FormBuffers::default());
    }

    #[test]
    fn test_restart_outside_terminal_stages_is_ignored() {
        let mut conversation = at_ready_for_quote();
        let before = conversation.log().clone();
        assert_eq!(conversation.apply(Event::Restart), Effect::Ignored);
        assert_eq!(conversation.log(), &before);
    }

    #[test]
    fn test_side_channel_only_at_done() {
        let mut conversation = Conversation::new();
        assert_eq!(
            conversation.apply(Event::send_message("hello")),
            Effect::Ignored
        );

        conversation.apply(Event::consent(false));
        assert_eq!(
            conversation.apply(Event::send_message("   ")),
            Effect::Ignored
        );

        conversation.apply(Event::EditMessage {
            text: "  what about boats? ".to_string(),
        });
        let effect = conversation.apply(Event::SendMessage { text: None });
        assert_eq!(
            effect,
            Effect::Acknowledge {
                text: "what about boats?".to_string()
            }
        );
        assert!(conversation.is_typing());
        assert!(conversation.form().chat_input.is_empty());

        conversation.acknowledge("what about boats?");
        assert_eq!(conversation.stage(), Stage::Done);
        assert_eq!(
            conversation.log().since(3),
            &[
                Message::user("what about boats?"),
                Message::ai("Thanks for your message: \"what about boats?\"")
            ]
        );
        assert!(!conversation.is_typing());
    }
}
