/// State management module
///
/// This module handles everything the editor remembers between events:
/// - Asset, session and loading data structures (data.rs)
/// - Edit operations and the editing history (edit.rs)
/// - The confirmation gate for destructive actions (gate.rs)
/// - The photo-edit session state machine (session.rs)

pub mod data;
pub mod edit;
pub mod gate;
pub mod session;
