//! Parsing of 1-based model choices.

/// Result of validating one answer to a "pick a model" prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the model list.
    Valid(usize),

    /// The answer is not an integer.
    NotANumber(String),

    /// The answer is an integer outside `1..=count`.
    OutOfRange(i64),
}

/// Validate `input` as a 1-based choice among `count` entries.
pub fn parse_selection(input: &str, count: usize) -> Selection {
    let trimmed = input.trim();
    let Ok(number) = trimmed.parse::<i64>() else {
        return Selection::NotANumber(trimmed.to_string());
    };

    match usize::try_from(number) {
        Ok(choice) if (1..=count).contains(&choice) => Selection::Valid(choice - 1),
        _ => Selection::OutOfRange(number),
    }
}

/// Render models as a 1-based numbered list, one per line.
pub fn format_model_list(models: &[String]) -> String {
    models
        .iter()
        .enumerate()
        .map(|(index, model)| format!("{:>3}. {model}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
