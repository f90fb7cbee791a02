//! Row classifier — positional sheet cells to an [`RsvpRow`].
//!
//! Column layout of the RSVP form sheet:
//! ```text
//! A: timestamp (unused)  B: name  C: email  D: attendance  E: guests  F: comment
//! ```

use crate::types::{RecipientId, RsvpRow};

const COL_NAME: usize = 1;
const COL_EMAIL: usize = 2;
const COL_ATTENDANCE: usize = 3;
const COL_GUESTS: usize = 4;
const COL_COMMENT: usize = 5;

/// Sheet row number of the first data row (row 1 is the header).
const FIRST_DATA_ROW: usize = 2;

/// Classify one data row. `index` is its 0-based position after the header.
/// Missing cells read as empty strings.
pub fn classify(raw: &[String], index: usize) -> RsvpRow {
    let cell = |col: usize| raw.get(col).map(|s| s.trim().to_string()).unwrap_or_default();

    let raw_email = cell(COL_EMAIL);
    RsvpRow {
        row_number: index + FIRST_DATA_ROW,
        name: cell(COL_NAME),
        recipient: RecipientId::normalize(&raw_email),
        raw_email,
        attendance: cell(COL_ATTENDANCE),
        guests: cell(COL_GUESTS),
        comment: cell(COL_COMMENT),
    }
}
