use crate::{Role, Turn};

/// Opens a block; followed by the role label and a newline.
pub const IM_START: &str = "<|im_start|>";
/// Closes a block; followed by a newline. Also the server-side stop sequence.
pub const IM_END: &str = "<|im_end|>";
/// Trailing open assistant block the server continues from.
pub const ASSISTANT_OPEN: &str = "<|im_start|>assistant\n";

/// Assemble the full prompt for one completion request.
///
/// Layout:
/// 1) one system block carrying `system_instruction`
/// 2) one block per turn, in history order
/// 3) the open assistant marker, never closed
///
/// The markup must match the server's chat template byte-for-byte.
#[must_use]
pub fn build_prompt(system_instruction: &str, turns: &[Turn]) -> String {
    let capacity = block_len(Role::System, system_instruction)
        + turns
            .iter()
            .map(|turn| block_len(turn.role, &turn.content))
            .sum::<usize>()
        + ASSISTANT_OPEN.len();

    let mut prompt = String::with_capacity(capacity);
    push_block(&mut prompt, Role::System, system_instruction);
    for turn in turns {
        push_block(&mut prompt, turn.role, &turn.content);
    }
    prompt.push_str(ASSISTANT_OPEN);
    prompt
}

fn push_block(prompt: &mut String, role: Role, content: &str) {
    prompt.push_str(IM_START);
    prompt.push_str(role.as_str());
    prompt.push('\n');
    prompt.push_str(content);
    prompt.push_str(IM_END);
    prompt.push('\n');
}

fn block_len(role: Role, content: &str) -> usize {
    IM_START.len() + role.as_str().len() + content.len() + IM_END.len() + 2
}
