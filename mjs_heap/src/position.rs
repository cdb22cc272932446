/// A bump-allocator slot position. Position `0` is reserved and never
/// allocated — it is the "no object" sentinel used by null untracked/weak
/// handles, mirroring the arena's `(0, 0)` empty-node convention in
/// `mjs_ast`.
pub type Position = u32;

pub const NULL_POSITION: Position = 0;
