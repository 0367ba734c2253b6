/*!
 * Validation of translated lines before they are committed.
 *
 * - `limits`: emptiness, binding, length and newline checks
 */

pub mod limits;

pub use limits::{ValidationLimits, validate_translations};
