//! Turn orchestration over completion clients: conversation state, stream
//! reassembly, and the tool-call loop.

mod assembler;
mod conversation;
mod engine;
mod error;
mod events;

pub mod prelude {
    pub use crate::{
        AssembledTurn, AssemblerEvent, AssemblerPhase, ConversationState, DEFAULT_TURN_TIMEOUT,
        TurnAssembler, TurnEngine, TurnEngineBuilder, TurnError, TurnErrorKind, TurnEvent,
        TurnOutcome,
    };
    pub use gclient::prelude::*;
    pub use gcommon::EventBus;
    pub use gtool::prelude::*;
}

pub use assembler::{AssembledTurn, AssemblerPhase, TurnAssembler};
pub use conversation::ConversationState;
pub use engine::{DEFAULT_TURN_TIMEOUT, TurnEngine, TurnEngineBuilder, TurnOutcome};
pub use error::{TurnError, TurnErrorKind};
pub use events::{AssemblerEvent, TurnEvent};
pub use gcommon::EventBus;
