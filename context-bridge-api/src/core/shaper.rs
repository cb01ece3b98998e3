//! Bounded context views
//!
//! Shaping keeps pinned system turns in place and trims the rest of the
//! conversation to a turn budget and then to a serialized byte budget,
//! evicting oldest first.

use context_bridge::Turn;

pub const DEFAULT_MAX_TURNS: usize = 50;
pub const DEFAULT_MAX_BYTES: usize = 8000;

#[derive(Debug, Clone, Copy)]
pub struct ContextShaper {
    max_turns: usize,
    max_bytes: usize,
}

impl Default for ContextShaper {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, DEFAULT_MAX_BYTES)
    }
}

impl ContextShaper {
    /// A zero turn budget is treated as one so the newest turn always survives
    pub fn new(max_turns: usize, max_bytes: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            max_bytes,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Produce the bounded view of `conversation` sent to the model
    pub fn shape(&self, conversation: &[Turn]) -> Vec<Turn> {
        let (pinned, mut rest): (Vec<Turn>, Vec<Turn>) = conversation
            .iter()
            .cloned()
            .partition(|turn| turn.role.is_system());

        if rest.len() > self.max_turns {
            rest.drain(..rest.len() - self.max_turns);
        }

        let sizes: Vec<usize> = rest.iter().map(turn_len).collect();
        let mut total = array_len(&sizes);
        let mut evicted = 0;
        while total > self.max_bytes && rest.len() - evicted > 1 {
            total -= sizes[evicted] + 1;
            evicted += 1;
        }
        rest.drain(..evicted);

        let mut shaped = pinned;
        shaped.extend(rest);
        shaped
    }
}

/// Length in bytes of `turns` serialized as a compact JSON array
pub fn serialized_len(turns: &[Turn]) -> usize {
    let sizes: Vec<usize> = turns.iter().map(turn_len).collect();
    array_len(&sizes)
}

fn turn_len(turn: &Turn) -> usize {
    serde_json::to_vec(turn).map(|bytes| bytes.len()).unwrap_or(0)
}

// brackets plus one comma between each pair of elements
fn array_len(sizes: &[usize]) -> usize {
    2 + sizes.iter().sum::<usize>() + sizes.len().saturating_sub(1)
}
