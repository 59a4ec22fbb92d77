use serde::{Deserialize, Serialize};

use crate::profile::{AgeGroup, InsuranceProduct, VehicleField};

/// Where the questionnaire currently is.
///
/// The walk is strictly forward through the declaration order, except for
/// `Consent -> Done` on refusal and `ReadyForQuote -> Done` when the
/// recommendation call fails. `Restart` leads back to `Consent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Consent,
    AskAge,
    AskInsurance,
    AskVehicle,
    AskAdditional,
    ReadyForQuote,
    NextSteps,
    Done,
}

impl Stage {
    /// The next stage on the happy path, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Consent => Some(Stage::AskAge),
            Stage::AskAge => Some(Stage::AskInsurance),
            Stage::AskInsurance => Some(Stage::AskVehicle),
            Stage::AskVehicle => Some(Stage::AskAdditional),
            Stage::AskAdditional => Some(Stage::ReadyForQuote),
            Stage::ReadyForQuote => Some(Stage::NextSteps),
            Stage::NextSteps | Stage::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::NextSteps | Stage::Done)
    }

    /// Whether the free-text side channel is open.
    pub fn accepts_free_text(self) -> bool {
        matches!(self, Stage::Done)
    }

    pub fn accepts_restart(self) -> bool {
        self.is_terminal()
    }

    pub fn affordance(self) -> Affordance {
        match self {
            Stage::Consent => Affordance::ConsentButtons,
            Stage::AskAge => Affordance::AgeSelect {
                options: AgeGroup::ALL.to_vec(),
            },
            Stage::AskInsurance => Affordance::InsuranceChecklist {
                options: InsuranceProduct::ALL.to_vec(),
            },
            Stage::AskVehicle => Affordance::VehicleForm,
            Stage::AskAdditional => Affordance::AdditionalText,
            Stage::ReadyForQuote => Affordance::QuoteButton,
            Stage::NextSteps => Affordance::RestartButton,
            Stage::Done => Affordance::None,
        }
    }
}

/// Input widget a renderer should show for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affordance {
    ConsentButtons,
    AgeSelect { options: Vec<AgeGroup> },
    InsuranceChecklist { options: Vec<InsuranceProduct> },
    VehicleForm,
    AdditionalText,
    QuoteButton,
    RestartButton,
    None,
}

/// A user action. Labels arrive as plain strings and are checked against the
/// closed answer sets when the event is applied; an unknown label is ignored
/// like any other guard failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Consent {
        agree: bool,
    },
    SelectAge {
        group: String,
    },
    ToggleInsurance {
        product: String,
    },
    /// Submits the checklist. When `products` is given it replaces the
    /// current selection first.
    SubmitInsurance {
        #[serde(default)]
        products: Option<Vec<String>>,
    },
    EditVehicle {
        field: VehicleField,
        value: String,
    },
    /// Submits the vehicle form. Fields given here overwrite the buffer first.
    SubmitVehicle {
        #[serde(default)]
        make: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        year: Option<String>,
    },
    EditAdditional {
        text: String,
    },
    SubmitAdditional {
        #[serde(default)]
        text: Option<String>,
    },
    Confirm,
    Restart,
    EditMessage {
        text: String,
    },
    SendMessage {
        #[serde(default)]
        text: Option<String>,
    },
}

impl Event {
    pub fn consent(agree: bool) -> Self {
        Event::Consent { agree }
    }

    pub fn select_age(group: impl Into<String>) -> Self {
        Event::SelectAge {
            group: group.into(),
        }
    }

    pub fn toggle_insurance(product: impl Into<String>) -> Self {
        Event::ToggleInsurance {
            product: product.into(),
        }
    }

    pub fn submit_insurance<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Event::SubmitInsurance {
            products: Some(products.into_iter().map(Into::into).collect()),
        }
    }

    pub fn submit_vehicle(
        make: impl Into<String>,
        model: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Event::SubmitVehicle {
            make: Some(make.into()),
            model: Some(model.into()),
            year: Some(year.into()),
        }
    }

    pub fn submit_additional(text: impl Into<String>) -> Self {
        Event::SubmitAdditional {
            text: Some(text.into()),
        }
    }

    pub fn send_message(text: impl Into<String>) -> Self {
        Event::SendMessage {
            text: Some(text.into()),
        }
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Consent { .. } => "consent",
            Event::SelectAge { .. } => "select_age",
            Event::ToggleInsurance { .. } => "toggle_insurance",
            Event::SubmitInsurance { .. } => "submit_insurance",
            Event::EditVehicle { .. } => "edit_vehicle",
            Event::SubmitVehicle { .. } => "submit_vehicle",
            Event::EditAdditional { .. } => "edit_additional",
            Event::SubmitAdditional { .. } => "submit_additional",
            Event::Confirm => "confirm",
            Event::Restart => "restart",
            Event::EditMessage { .. } => "edit_message",
            Event::SendMessage { .. } => "send_message",
        }
    }
}
