pub mod controller;
pub mod conversation;
pub mod error;
pub mod message;
pub mod profile;
pub mod prompt;
pub mod recommendation;
pub mod runner;
pub mod stage;
pub mod storage;

// Re-export commonly used types
pub use controller::{Controller, DispatchResult, FlowStatus};
pub use conversation::{Conversation, ConversationSnapshot, Effect};
pub use error::{FlowError, Result};
pub use message::{Message, MessageLog, Speaker};
pub use profile::{AgeGroup, FormBuffers, InsuranceProduct, VehicleDetails, VehicleField};
pub use recommendation::{HttpRecommendationClient, RecommendationClient};
pub use runner::SessionRunner;
pub use stage::{Affordance, Event, Stage};
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
