//! Prompt assembly: render an entry snapshot and optional context blocks
//! into the text payload sent to the provider.
//!
//! Pure and deterministic — the same entry and context strings always yield
//! byte-identical output, so orchestrator behavior stays testable without a
//! network.

use domain::Entry;

/// System instructions sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You are a supportive daily-journal coach. \
The user shares one day's financial and wellbeing numbers. Reply with a short, \
concrete, encouraging reflection on that day. Do not give financial advice.";

/// Render the prompt for one generation attempt.
///
/// `profile_context` and `auxiliary_context` are appended verbatim when
/// present; numeric fields are formatted with fixed precision so output
/// never depends on float display quirks.
pub fn build_prompt(
    entry: &Entry,
    profile_context: Option<&str>,
    auxiliary_context: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Journal entry for {date}:\n\
         - income: {income:.2}\n\
         - expenses: {expenses:.2}\n\
         - hours worked: {hours_worked:.1}\n\
         - hours slept: {sleep_hours:.1}\n\
         - stress level: {stress}/10\n\
         - notes: {notes}\n",
        date = entry.date.format("%Y-%m-%d"),
        income = entry.income,
        expenses = entry.expenses,
        hours_worked = entry.hours_worked,
        sleep_hours = entry.sleep_hours,
        stress = entry.stress_level,
        notes = if entry.notes.is_empty() {
            "(none)"
        } else {
            &entry.notes
        },
    );

    if let Some(profile) = profile_context {
        prompt.push_str("\nAbout the user:\n");
        prompt.push_str(profile);
        prompt.push('\n');
    }
    if let Some(auxiliary) = auxiliary_context {
        prompt.push_str("\nAdditional context:\n");
        prompt.push_str(auxiliary);
        prompt.push('\n');
    }

    prompt
}
