use anyhow::Result;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use crate::controller::CandidatePicker;

/// Label of the trailing item that declines every candidate.
pub const NONE_ITEM: &str = "(none of these)";

/// Interactive picker backed by `dialoguer::Select`.
#[derive(Debug, Default)]
pub struct SelectPicker;

impl SelectPicker {
    pub fn new() -> Self {
        Self
    }
}

impl CandidatePicker for SelectPicker {
    fn pick(&mut self, prompt: &str, candidates: &[String]) -> Result<Option<usize>> {
        let items = candidate_items(candidates);
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact_opt()?;

        Ok(selection.and_then(|index| selection_to_choice(index, candidates.len())))
    }
}

/// Menu items: one per candidate, single-lined, plus the decline item.
pub fn candidate_items(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|candidate| candidate.split_whitespace().collect::<Vec<_>>().join(" "))
        .chain(std::iter::once(NONE_ITEM.to_string()))
        .collect()
}

/// Map a menu index back to a candidate index; the decline item maps to `None`.
pub fn selection_to_choice(index: usize, candidate_count: usize) -> Option<usize> {
    (index < candidate_count).then_some(index)
}

/// Prompt for one line of chat input. Empty input is re-prompted.
pub fn read_command(speaker: &str) -> Result<String> {
    let line: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(speaker)
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Say something, or type 'exit'")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(line)
}
