//! Ordered, multi-kind progress content
//!
//! A progress entry owns text, video, image and map blocks stored in four
//! tables. This module validates submitted forms, plans the row changes of
//! an update, writes them in one transaction and composes the stored rows
//! back into a single ordered sequence.

pub mod block;
pub mod compose;
pub mod links;
pub mod reconcile;
pub mod slug;
pub mod store;
pub mod submission;
pub mod summary;
mod writer;

pub use block::{Block, BlockId, BlockKind, DRAFT_ID_THRESHOLD};
pub use compose::ComposedProgress;
pub use submission::{
    BlockInput, ImageInput, MapInput, ProgressSubmission, SubmittedBlock, TextInput, VideoInput,
};
pub use writer::{DeleteOutcome, ProgressService, PROGRESS_SUBFOLDER};
