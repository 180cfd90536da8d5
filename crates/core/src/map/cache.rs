//! Direct-mapped near cache tags.
//!
//! In the `TwoLevel` mode the near slots stop being migration targets and
//! become cache lines. Block number `n` may only live in line `n % lines`;
//! each line remembers which block it holds and whether the copy is newer
//! than the block's home. The tag store only bookkeeps; the router moves
//! the data.

use crate::common::BlockAddr;

/// Identifier of a near cache line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(pub usize);

/// Tag of one cache line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheTag {
    /// Block held by the line, if any.
    pub block: Option<BlockAddr>,
    /// The line was written since it was filled.
    pub dirty: bool,
}

/// Outcome of a tag lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The block is cached in `LineId`.
    Hit(LineId),
    /// The block is not cached; it belongs in `line`.
    Miss {
        /// Line the block maps to.
        line: LineId,
        /// Current occupant and its dirty bit.
        victim: Option<(BlockAddr, bool)>,
    },
}

impl Lookup {
    /// Line the looked-up block maps to.
    pub const fn line(&self) -> LineId {
        match *self {
            Self::Hit(line) | Self::Miss { line, .. } => line,
        }
    }
}

/// Tag store of a direct-mapped write-back cache.
///
/// Line `n` lives at physical offset `base + n * block_size` of the near tier.
#[derive(Clone, Debug)]
pub struct NearCache {
    base: u64,
    block_size: u64,
    tags: Vec<CacheTag>,
}

impl NearCache {
    /// Creates `lines` empty lines starting at near offset `base`.
    pub fn new(base: u64, block_size: u64, lines: usize) -> Self {
        Self {
            base,
            block_size,
            tags: vec![CacheTag::default(); lines],
        }
    }

    /// Line `block` maps to.
    pub fn line_of(&self, block: BlockAddr) -> LineId {
        LineId(((block.val() / self.block_size) % self.tags.len() as u64) as usize)
    }

    /// Looks `block` up without changing any tag.
    pub fn lookup(&self, block: BlockAddr) -> Lookup {
        let line = self.line_of(block);
        let tag = self.tags[line.0];
        match tag.block {
            Some(held) if held == block => Lookup::Hit(line),
            Some(held) => Lookup::Miss {
                line,
                victim: Some((held, tag.dirty)),
            },
            None => Lookup::Miss { line, victim: None },
        }
    }

    /// Installs a clean copy of `block` in `line`.
    pub fn fill(&mut self, line: LineId, block: BlockAddr) {
        self.tags[line.0] = CacheTag {
            block: Some(block),
            dirty: false,
        };
    }

    /// Marks `line` as newer than its block's home.
    pub fn mark_dirty(&mut self, line: LineId) {
        self.tags[line.0].dirty = true;
    }

    /// Line holding `block`, if it is cached.
    pub fn holding(&self, block: BlockAddr) -> Option<LineId> {
        match self.lookup(block) {
            Lookup::Hit(line) => Some(line),
            Lookup::Miss { .. } => None,
        }
    }

    /// Tag of `line`.
    pub fn tag(&self, line: LineId) -> CacheTag {
        self.tags[line.0]
    }

    /// Physical near offset of `line`.
    pub const fn offset(&self, line: LineId) -> u64 {
        self.base + line.0 as u64 * self.block_size
    }

    /// Number of lines.
    pub fn lines(&self) -> usize {
        self.tags.len()
    }

    /// Lines currently holding a block.
    pub fn valid_lines(&self) -> usize {
        self.tags.iter().filter(|t| t.block.is_some()).count()
    }
}
