/*!
 * # Editing
 *
 * A Markdown document whose display layout is kept up to date incrementally.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - The document text lives in one **`xi_rope::Rope`**
 * - Every edit is a **Command** (`Cmd`) compiled to a **Delta**
 * - Saving writes the rope verbatim
 *
 * ### 2. Edits Become Dirty Ranges
 * - Each delta is recorded in an [`EditLog`](crate::tracking::EditLog) before
 *   it is applied, in the coordinates of the last reflow
 * - Any number of edits between two reflows collapse into one ordered set
 *   of dirty ranges
 *
 * ### 3. Pull-Based Reflow
 * - The layout is a [`Segment`](crate::segment::Segment) of units, one per
 *   block, with quote runs as containers holding nested segments
 * - [`Document::reflow`] walks it like a renderer: it jumps to the first
 *   change, reformats what changed and stops once nothing is left
 * - Unchanged units keep their cached [`FormattedBlock`]
 *
 * ## Module Structure
 *
 * - **`document`**: `Document`, tying buffer, block structure, edit log and layout
 * - **`commands`**: `Cmd` and its compilation to deltas
 * - **`reflow`**: the pull loop that drives a formatting pass
 * - **`wrap`**: the line wrapper that produces payloads
 * - **`patch`**: what a command reports back
 *
 * ## Usage Pattern
 *
 * ```rust
 * use reflow_engine::editing::*;
 *
 * let mut doc = Document::from_bytes(b"Hello\n\n> quoted\n").unwrap();
 * doc.reflow().unwrap();
 *
 * doc.apply(Cmd::InsertText { at: 5, text: " world".to_string() });
 * let report = doc.reflow().unwrap();
 * assert_eq!(report.formatted, 1);
 * ```
 */

pub mod commands;
pub mod document;
pub mod patch;
pub mod reflow;
pub mod wrap;

pub use commands::Cmd;
pub use document::Document;
pub use patch::Patch;
pub use reflow::{Payload, ReflowReport};
pub use wrap::{FormattedBlock, LineWrapper};
