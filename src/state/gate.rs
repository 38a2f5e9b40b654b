/// Yes/no confirmation before destructive transitions
///
/// The gate only knows whether it is showing, what it is asking, and which
/// pending action to hand back when the user confirms. It never confirms on
/// its own.

use serde::{Deserialize, Serialize};

/// Visual emphasis of a prompt
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PromptVariant {
    #[default]
    Default,
    Warning,
    Danger,
}

/// What the gate shows to the user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub variant: PromptVariant,
}

impl ConfirmationPrompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
            variant: PromptVariant::Default,
        }
    }

    pub fn buttons(mut self, confirm: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.confirm_text = confirm.into();
        self.cancel_text = cancel.into();
        self
    }

    pub fn variant(mut self, variant: PromptVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Shown before closing with unsaved changes
    pub fn unsaved_changes() -> Self {
        Self::new(
            "Unsaved Changes",
            "You have unsaved changes. Are you sure you want to close the editor? All changes will be lost.",
        )
        .buttons("Close Editor", "Keep Editing")
        .variant(PromptVariant::Warning)
    }

    /// Shown before discarding the edit history
    pub fn reset_changes() -> Self {
        Self::new(
            "Reset Changes",
            "Are you sure you want to reset all changes? This action cannot be undone.",
        )
        .buttons("Reset", "Cancel")
        .variant(PromptVariant::Danger)
    }
}

/// Outcome of resolving a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Confirmed(T),
    Cancelled,
}

/// A gate holding at most one pending action of type `T`
#[derive(Debug, Clone)]
pub struct ConfirmationGate<T> {
    pending: Option<(ConfirmationPrompt, T)>,
}

impl<T> Default for ConfirmationGate<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> ConfirmationGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `prompt`; `action` is returned if the user confirms.
    /// A second request replaces the first.
    pub fn request(&mut self, prompt: ConfirmationPrompt, action: T) {
        self.pending = Some((prompt, action));
    }

    pub fn is_showing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn prompt(&self) -> Option<&ConfirmationPrompt> {
        self.pending.as_ref().map(|(prompt, _)| prompt)
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, action)| action)
    }

    /// Hide the gate and hand back the pending action
    pub fn confirm(&mut self) -> Outcome<T> {
        match self.pending.take() {
            Some((_, action)) => Outcome::Confirmed(action),
            None => Outcome::Cancelled,
        }
    }

    /// Hide the gate without running anything
    pub fn cancel(&mut self) -> Outcome<T> {
        self.pending = None;
        Outcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_returns_pending_action() {
        let mut gate = ConfirmationGate::new();
        gate.request(ConfirmationPrompt::reset_changes(), "reset");

        assert!(gate.is_showing());
        assert_eq!(gate.prompt().unwrap().variant, PromptVariant::Danger);
        assert_eq!(gate.confirm(), Outcome::Confirmed("reset"));
        assert!(!gate.is_showing());
    }

    #[test]
    fn test_cancel_drops_action() {
        let mut gate = ConfirmationGate::new();
        gate.request(ConfirmationPrompt::unsaved_changes(), 1);

        assert_eq!(gate.cancel(), Outcome::Cancelled);
        assert!(!gate.is_showing());
        assert_eq!(gate.confirm(), Outcome::Cancelled);
    }

    #[test]
    fn test_hidden_gate_confirms_nothing() {
        let mut gate: ConfirmationGate<u8> = ConfirmationGate::new();
        assert_eq!(gate.confirm(), Outcome::Cancelled);
        assert_eq!(gate.pending(), None);
    }

    #[test]
    fn test_prompt_labels() {
        let prompt = ConfirmationPrompt::unsaved_changes();
        assert_eq!(prompt.confirm_text, "Close Editor");
        assert_eq!(prompt.cancel_text, "Keep Editing");
        assert_eq!(prompt.variant, PromptVariant::Warning);
    }
}
