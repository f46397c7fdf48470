//! Position maps for collab-sync.
//!
//! A [`StepMap`] describes how a single step moves document positions. A
//! [`Mapping`] chains step maps and can pair an inverted step with the step
//! that re-applies it (a *mirror*). Mapping through such a pair recovers
//! positions inside content that the inverse removed, which is what lets a
//! rebased step land exactly where it was before the rebase.

/// Which side a position sticks to when content is inserted at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before content inserted at this position.
    Before,
    /// Move after content inserted at this position.
    After,
}

/// Offset into a replaced range, kept so a mirror can restore the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
    /// Index of the range within its step map.
    pub index: usize,
    /// Offset of the position from the start of that range.
    pub offset: usize,
}

/// The result of mapping one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    /// The mapped position.
    pub pos: usize,
    /// Content on the associated side of the position was deleted.
    pub deleted: bool,
    /// The position was strictly inside a replaced range.
    pub deleted_across: bool,
    /// Recovery data when the position fell inside a replaced range.
    pub recover: Option<Recover>,
}

impl MapResult {
    fn unchanged(pos: usize) -> Self {
        Self {
            pos,
            deleted: false,
            deleted_across: false,
            recover: None,
        }
    }
}

/// One replaced range: `old_size` characters at `start` became `new_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRange {
    /// Start of the range in the source document.
    pub start: usize,
    /// Length of the range before the step.
    pub old_size: usize,
    /// Length of the range after the step.
    pub new_size: usize,
}

/// Position map of a single step.
///
/// Ranges are sorted by `start` and do not overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<MapRange>,
}

impl StepMap {
    /// A map that leaves every position alone.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a map from sorted, non-overlapping ranges.
    pub fn new(ranges: Vec<MapRange>) -> Self {
        Self { ranges }
    }

    /// A map with a single replaced range. Empty replacements yield an empty map.
    pub fn single(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::empty();
        }
        Self {
            ranges: vec![MapRange {
                start,
                old_size,
                new_size,
            }],
        }
    }

    /// The replaced ranges.
    pub fn ranges(&self) -> &[MapRange] {
        &self.ranges
    }

    /// Map a position, returning only the new position.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map a position and report whether it was deleted.
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for (index, range) in self.ranges.iter().enumerate() {
            let start = range.start;
            if start > pos {
                break;
            }
            let end = start + range.old_size;
            if pos <= end {
                let side = if range.old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                let mapped = match side {
                    Assoc::Before => base,
                    Assoc::After => base + range.new_size,
                };
                let sticky = match assoc {
                    Assoc::Before => start,
                    Assoc::After => end,
                };
                let recover = (pos != sticky).then_some(Recover {
                    index,
                    offset: pos - start,
                });
                return MapResult {
                    pos: mapped,
                    deleted: pos != sticky,
                    deleted_across: pos != start && pos != end,
                    recover,
                };
            }
            diff += range.new_size as isize - range.old_size as isize;
        }
        MapResult::unchanged((pos as isize + diff) as usize)
    }

    /// Turn recovery data produced by the mirrored map back into a position
    /// in this map's output.
    ///
    /// Returns `None` if this map has no range at `recover.index`.
    pub fn recover(&self, recover: Recover) -> Option<usize> {
        let range = self.ranges.get(recover.index)?;
        let diff: isize = self.ranges[..recover.index]
            .iter()
            .map(|r| r.new_size as isize - r.old_size as isize)
            .sum();
        Some((range.start as isize + diff) as usize + recover.offset)
    }

    /// The map of the inverse step.
    pub fn invert(&self) -> Self {
        let mut diff: isize = 0;
        let ranges = self
            .ranges
            .iter()
            .map(|r| {
                let start = (r.start as isize + diff) as usize;
                diff += r.new_size as isize - r.old_size as isize;
                MapRange {
                    start,
                    old_size: r.new_size,
                    new_size: r.old_size,
                }
            })
            .collect();
        Self { ranges }
    }
}

/// An ordered chain of step maps with optional mirror pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirrors: Vec<(usize, usize)>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// The step maps in order.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// Number of step maps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// True if the mapping holds no step maps.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Append a step map.
    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Declare the maps at `a` and `b` to be inverses of each other.
    pub fn set_mirror(&mut self, a: usize, b: usize) {
        self.mirrors.push((a, b));
    }

    /// The index mirrored with `n`, if any.
    pub fn mirror(&self, n: usize) -> Option<usize> {
        self.mirrors.iter().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    /// View of the maps from index `from` to the end.
    pub fn slice(&self, from: usize) -> MappingSlice<'_> {
        MappingSlice {
            mapping: self,
            from: from.min(self.maps.len()),
            to: self.maps.len(),
        }
    }

    /// Map a position through every map.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.slice(0).map(pos, assoc)
    }

    /// Map a position through every map, collecting deletion flags.
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.slice(0).map_result(pos, assoc)
    }
}

/// A borrowed window `[from, to)` of a [`Mapping`].
///
/// Mirror pairs keep their absolute indices, so a slice still follows a
/// mirror as long as both ends of the pair lie inside the window.
#[derive(Debug, Clone, Copy)]
pub struct MappingSlice<'a> {
    mapping: &'a Mapping,
    from: usize,
    to: usize,
}

impl MappingSlice<'_> {
    /// Map a position, returning only the new position.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map a position through the window, following mirrors.
    pub fn map_result(&self, mut pos: usize, assoc: Assoc) -> MapResult {
        let mut deleted = false;
        let mut deleted_across = false;
        let mut i = self.from;
        while i < self.to {
            let result = self.mapping.maps[i].map_result(pos, assoc);
            if let Some(recover) = result.recover {
                if let Some(mirror) = self.mapping.mirror(i) {
                    if mirror > i && mirror < self.to {
                        // A mirror with a different shape can't recover; map normally.
                        if let Some(recovered) = self.mapping.maps[mirror].recover(recover) {
                            pos = recovered;
                            i = mirror + 1;
                            continue;
                        }
                    }
                }
            }
            deleted |= result.deleted;
            deleted_across |= result.deleted_across;
            pos = result.pos;
            i += 1;
        }
        MapResult {
            pos,
            deleted,
            deleted_across,
            recover: None,
        }
    }
}
