pub mod block;
pub mod media;

pub use block::{BlockForest, BlockId, BlockKind, ContentBlock, StyledTextRun, TextStyle};
pub use media::{MediaSource, MediaTable};
