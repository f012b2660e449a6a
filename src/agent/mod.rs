//! Agent module - conversation pipeline and terminal front-end

pub mod context_manager;
pub mod dispatcher;
pub mod greeting;
pub mod interactive;
pub mod session;

pub use context_manager::{ContextTracker, ConversationContext, TopicTable};
pub use dispatcher::{DispatchTables, EmotionLexicon, ResponseDispatcher};
pub use interactive::{print_report, run_interactive, TerminalSink};
pub use session::{spawn_message, Assistant, DisplaySink};
