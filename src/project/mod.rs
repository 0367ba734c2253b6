/*!
 * The subtitle project: the scene/batch tree, the flat line lists derived from
 * it, and the context that travels with them.
 *
 * - `scene`: scenes, batches and their merge operations
 * - `context`: project settings and their reconciliation with new options
 * - `subtitle_file`: the aggregate that owns the tree and keeps numbering consistent
 */

pub mod context;
pub mod scene;
pub mod subtitle_file;

pub use context::ProjectContext;
pub use scene::{BatchKey, SubtitleBatch, SubtitleScene};
pub use subtitle_file::{SubtitleData, SubtitleFile};
