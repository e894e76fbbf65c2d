//! Named system instructions selectable with `/mode`.

pub const DEFAULT_MODE: &str = session_store::DEFAULT_MODE;

/// Mode name and its system instruction, in display order.
pub const MODES: [(&str, &str); 4] = [
    ("default", "You are a helpful assistant."),
    (
        "coding",
        "You are a senior software engineer. Be concise. Provide code blocks when useful.",
    ),
    (
        "tutor",
        "You are a patient tutor. Explain step-by-step and check for understanding.",
    ),
    ("snark", "You are witty and playful, but still helpful."),
];

#[must_use]
pub fn system_instruction(mode: &str) -> Option<&'static str> {
    MODES
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, instruction)| *instruction)
}

/// Instruction for `mode`, or the default mode's instruction for unknown names.
#[must_use]
pub fn system_instruction_or_default(mode: &str) -> &'static str {
    system_instruction(mode).unwrap_or(MODES[0].1)
}

pub fn mode_names() -> impl Iterator<Item = &'static str> {
    MODES.iter().map(|(name, _)| *name)
}
