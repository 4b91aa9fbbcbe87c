use std::io::{BufRead, Write};

use anyhow::Result;

use crate::domain::{AllocationDraft, AllocationError, DraftState, format_cents};

/// How an interactive entry session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Every check passed; the draft can be committed
    Ready,
    /// The user gave up; the draft should be discarded
    Abandoned,
}

const HELP: &str = "Enter an amount for the member shown, or one of:
  >      keep this bill and move on
  <      go back to the previous member
  paid   mark this member as the payer
  done   finish and record the expense
  quit   abandon this expense";

/// Walk the user through a custom split, one member at a time.
///
/// Entering an amount sets the current bill and moves on. Input errors are
/// printed and the prompt repeats; the draft is never left half-updated.
pub fn prompt_custom_split<R: BufRead, W: Write>(
    draft: &mut AllocationDraft,
    input: R,
    mut output: W,
) -> Result<PromptOutcome> {
    writeln!(output, "{}", HELP)?;
    print_position(draft, &mut output)?;

    for line in input.lines() {
        let line = line?;
        let command = line.trim();

        let result = match command {
            "" => Ok(()),
            ">" => draft.advance(),
            "<" => draft.retreat(),
            "paid" => match draft.mark_current_paid() {
                Ok(id) => {
                    if let Some(member) = draft.members().iter().find(|m| m.id == id) {
                        writeln!(output, "Paid by {}.", member.name)?;
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            },
            "done" => match ready_check(draft) {
                Ok(()) => return Ok(PromptOutcome::Ready),
                Err(err) => Err(err),
            },
            "quit" => return Ok(PromptOutcome::Abandoned),
            "help" | "?" => {
                writeln!(output, "{}", HELP)?;
                Ok(())
            }
            amount => draft
                .enter_bill_for_current(amount)
                .and_then(|()| draft.advance()),
        };

        if let Err(err) = result {
            writeln!(output, "Error: {}", err)?;
        }
        print_position(draft, &mut output)?;
    }

    // Input closed before "done"
    Ok(PromptOutcome::Abandoned)
}

/// Run the commit checks on a scratch copy so the draft stays untouched.
fn ready_check(draft: &AllocationDraft) -> Result<(), AllocationError> {
    draft.clone().commit().map(|_| ())
}

fn print_position<W: Write>(draft: &AllocationDraft, output: &mut W) -> Result<()> {
    writeln!(output, "Remaining: {}", format_cents(draft.remaining()))?;
    match draft.state() {
        DraftState::Collecting { cursor, .. } => {
            if let Some(member) = draft.current_member() {
                let bill = draft.bill_for(member.id).unwrap_or(0);
                write!(
                    output,
                    "[{}/{}] {} bill {} > ",
                    cursor + 1,
                    draft.members().len(),
                    member,
                    format_cents(bill)
                )?;
            }
        }
        DraftState::ReadyToCommit { .. } => {
            write!(output, "All bills entered. 'done' to record, '<' to edit > ")?;
        }
        DraftState::Committed => {}
    }
    output.flush()?;
    Ok(())
}
