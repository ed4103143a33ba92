//! Headless workspace core (state/action/effect).

pub mod action;
pub mod completion;
pub mod effect;
pub mod explorer;
pub mod hydration;
pub mod language;
pub mod services;
pub mod state;
pub mod store;

pub use action::Action;
pub use completion::{CompletionOutcome, CompletionRequest, InlineCompletion};
pub use effect::{Effect, RuntimeOp};
pub use explorer::{
    ExplorerStore, LoadReport, LoadSource, MutationReport, SaveAllReport, SaveReport, SinkError,
    WorkspaceServices,
};
pub use state::WorkspaceSession;
pub use store::{DispatchResult, PendingSave, Store, StoreError};
