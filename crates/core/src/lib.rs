//! Presentation outline model, oracle response extraction, and the
//! instruction contract for conversational deck editing.

pub mod contract;
pub mod error;
pub mod extract;
pub mod instruction;
pub mod oracle;
pub mod outline;
pub mod session;
pub mod types;

pub use contract::{ContractViolation, EditIntent};
pub use error::{Error, Result, ValidationError};
pub use extract::{extract, extract_document, strip_code_fences, Extraction};
pub use instruction::{build_instruction, InstructionBuilder};
pub use oracle::Oracle;
pub use outline::OutlineFormatter;
pub use session::{run_turn, ChatMessage, Role, SessionState, Turn, TurnConfig, TurnOutcome};
pub use types::{validate, Document, Slide};
