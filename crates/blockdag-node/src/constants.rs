pub(crate) const DEFAULT_WRITERS: usize = 4;
pub(crate) const DEFAULT_BLOCKS_PER_WRITER: usize = 25;
pub(crate) const DEFAULT_MERGE_EVERY: usize = 5;
