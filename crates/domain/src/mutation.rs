//! Positional edits on a question list, addressed by 1-based question number.
//!
//! Neither operation validates the resulting list; callers re-run question
//! validation before persisting anything.

use crate::error::ValidationError;

/// Replaces question `number` verbatim, keeping every other position.
pub fn edit_at<T>(
    mut questions: Vec<T>,
    number: usize,
    replacement: T,
) -> Result<Vec<T>, ValidationError> {
    let index = slot_index(number, questions.len())?;
    questions[index] = replacement;
    Ok(questions)
}

/// Removes question `number`; the remaining questions close the gap in order.
pub fn delete_at<T>(mut questions: Vec<T>, number: usize) -> Result<Vec<T>, ValidationError> {
    let index = slot_index(number, questions.len())?;
    questions.remove(index);
    Ok(questions)
}

/// Reads a question number from a path segment. Anything that is not a
/// non-negative integer maps to 0, which no list accepts.
pub fn parse_question_number(raw: &str) -> usize {
    raw.trim().parse::<usize>().unwrap_or(0)
}

fn slot_index(number: usize, len: usize) -> Result<usize, ValidationError> {
    if number == 0 || number > len {
        return Err(ValidationError::InvalidQuestionNumber);
    }
    Ok(number - 1)
}
