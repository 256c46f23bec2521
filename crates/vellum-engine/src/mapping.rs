//! # Range Mapper - Carrying Positions Across Edits
//!
//! Every document step produces one elementary [`MapRule`] describing how
//! offset paths in the tree before the step relate to paths in the tree
//! after it. A [`RangeMapper`] is a list of such rules applied in order,
//! plus the tree the last one lands in.
//!
//! Rules work on paths only, never on nodes, so mapping is cheap and does
//! not need the old tree. A path that sits exactly on an edit boundary is
//! ambiguous; the caller's [`Bias`] decides which side it ends up on:
//!
//! ```text
//! insert "XY" at offset 2 of "abcd"
//!
//!   offset 2, Bias::Left   -> 2   ab|XYcd
//!   offset 2, Bias::Right  -> 4   abXY|cd
//!   offset 3               -> 5   abXYc|d
//! ```

use crate::addressing::{Position, Range};
use crate::error::Result;
use crate::model::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapRule {
    /// Offsets `start..end` of the element at `parent` were replaced by
    /// `inserted` units of new content.
    Splice {
        parent: Vec<usize>,
        start: usize,
        end: usize,
        inserted: usize,
    },
    /// The element at `parent` became two siblings, the second holding what
    /// followed `offset`.
    Split { parent: Vec<usize>, offset: usize },
    /// Offsets `start..end` of the element at `parent` were cut out and
    /// reinserted at `destination` (a position path valid after the cut).
    Move {
        parent: Vec<usize>,
        start: usize,
        end: usize,
        destination: Vec<usize>,
    },
    /// The document was swapped wholesale; paths carry over as they are.
    Reroot,
}

impl MapRule {
    pub fn map_path(&self, path: &[usize], bias: Bias) -> Vec<usize> {
        match self {
            MapRule::Splice {
                parent,
                start,
                end,
                inserted,
            } => map_splice(path, parent, *start, *end, *inserted, bias),
            MapRule::Split { parent, offset } => map_split(path, parent, *offset, bias),
            MapRule::Move {
                parent,
                start,
                end,
                destination,
            } => map_move(path, parent, *start, *end, destination, bias),
            MapRule::Reroot => path.to_vec(),
        }
    }
}

/// `path` continues below `parent` (is in its subtree).
fn is_below(path: &[usize], parent: &[usize]) -> bool {
    path.len() > parent.len() && path[..parent.len()] == *parent
}

fn map_splice(
    path: &[usize],
    parent: &[usize],
    start: usize,
    end: usize,
    inserted: usize,
    bias: Bias,
) -> Vec<usize> {
    if !is_below(path, parent) {
        return path.to_vec();
    }
    let depth = parent.len();
    let offset = path[depth];
    let collapsed = match bias {
        Bias::Left => start,
        Bias::Right => start + inserted,
    };

    let mut mapped = path.to_vec();
    if path.len() == depth + 1 {
        mapped[depth] = if offset < start {
            offset
        } else if offset > end {
            offset - end + start + inserted
        } else {
            collapsed
        };
    } else if offset >= end {
        mapped[depth] = offset - end + start + inserted;
    } else if offset >= start {
        // inside a removed element
        mapped.truncate(depth + 1);
        mapped[depth] = collapsed;
    }
    mapped
}

fn map_split(path: &[usize], parent: &[usize], offset: usize, bias: Bias) -> Vec<usize> {
    let Some((&parent_offset, grandparent)) = parent.split_last() else {
        return path.to_vec();
    };
    if !is_below(path, grandparent) {
        return path.to_vec();
    }
    let depth = grandparent.len();
    let at = path[depth];
    let mut mapped = path.to_vec();

    if path.len() == depth + 1 || at != parent_offset {
        if at > parent_offset {
            mapped[depth] = at + 1;
        }
        return mapped;
    }

    let inner = path[depth + 1];
    let moves = if path.len() == depth + 2 {
        inner > offset || (inner == offset && bias == Bias::Right)
    } else {
        inner >= offset
    };
    if moves {
        mapped[depth] = parent_offset + 1;
        mapped[depth + 1] = inner - offset;
    }
    mapped
}

fn map_move(
    path: &[usize],
    parent: &[usize],
    start: usize,
    end: usize,
    destination: &[usize],
    bias: Bias,
) -> Vec<usize> {
    let depth = parent.len();
    let moved = is_below(path, parent) && {
        let offset = path[depth];
        if path.len() == depth + 1 {
            start < offset && offset < end
        } else {
            start <= offset && offset < end
        }
    };

    if moved {
        let mut mapped = destination.to_vec();
        if let Some(last) = mapped.last_mut() {
            *last += path[depth] - start;
        }
        mapped.extend_from_slice(&path[depth + 1..]);
        return mapped;
    }

    let removed = map_splice(path, parent, start, end, 0, bias);
    match destination.split_last() {
        Some((&at, target)) => map_splice(&removed, target, at, at, end - start, bias),
        None => removed,
    }
}

/// Composition of map rules, ending in `target`.
///
/// An empty mapper is the identity.
#[derive(Debug, Clone, Default)]
pub struct RangeMapper {
    rules: Vec<MapRule>,
    target: Option<Tree>,
}

impl RangeMapper {
    pub fn identity() -> Self {
        Self::default()
    }

    /// No path changes, but results land in `tree`.
    pub fn onto(tree: Tree) -> Self {
        Self {
            rules: Vec::new(),
            target: Some(tree),
        }
    }

    pub fn new(rule: MapRule, target: Tree) -> Self {
        Self {
            rules: vec![rule],
            target: Some(target),
        }
    }

    /// `self` followed by `next`.
    pub fn then(mut self, next: RangeMapper) -> Self {
        self.rules.extend(next.rules);
        if next.target.is_some() {
            self.target = next.target;
        }
        self
    }

    pub fn compose<I>(mappers: I) -> Self
    where
        I: IntoIterator<Item = RangeMapper>,
    {
        mappers
            .into_iter()
            .fold(RangeMapper::identity(), RangeMapper::then)
    }

    pub fn rules(&self) -> &[MapRule] {
        &self.rules
    }

    pub fn target(&self) -> Option<&Tree> {
        self.target.as_ref()
    }

    pub fn is_identity(&self) -> bool {
        self.rules.is_empty() && self.target.is_none()
    }

    pub fn map_path(&self, path: &[usize], bias: Bias) -> Vec<usize> {
        self.rules
            .iter()
            .fold(path.to_vec(), |path, rule| rule.map_path(&path, bias))
    }

    /// Equivalent position in the target tree. A path that no longer
    /// resolves is clamped to the nearest surviving ancestor.
    pub fn map_position(&self, position: &Position, bias: Bias) -> Result<Position> {
        let Some(target) = &self.target else {
            return Ok(position.clone());
        };
        let path = self.map_path(position.path(), bias);
        match Position::from_path(target, path.clone()) {
            Ok(mapped) => Ok(mapped),
            Err(error) => {
                log::trace!("mapped path {path:?} did not resolve ({error}), clamping");
                Position::from_path_clamped(target, &path)
            }
        }
    }

    /// Collapsed ranges map with right bias; other ranges expand over
    /// content inserted at either edge.
    pub fn map_range(&self, range: &Range) -> Result<Range> {
        if range.is_collapsed() {
            return Ok(Range::collapsed(
                self.map_position(range.start(), Bias::Right)?,
            ));
        }
        self.map_range_with(range, Bias::Left, Bias::Right)
    }

    pub fn map_range_with(&self, range: &Range, start: Bias, end: Bias) -> Result<Range> {
        Range::new(
            self.map_position(range.start(), start)?,
            self.map_position(range.end(), end)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn splice() -> MapRule {
        // replace offsets 2..4 of the element at [1] with 3 units
        MapRule::Splice {
            parent: vec![1],
            start: 2,
            end: 4,
            inserted: 3,
        }
    }

    #[rstest]
    #[case::before(vec![1, 1], Bias::Right, vec![1, 1])]
    #[case::at_start_left(vec![1, 2], Bias::Left, vec![1, 2])]
    #[case::at_start_right(vec![1, 2], Bias::Right, vec![1, 5])]
    #[case::inside_left(vec![1, 3], Bias::Left, vec![1, 2])]
    #[case::at_end_right(vec![1, 4], Bias::Right, vec![1, 5])]
    #[case::after(vec![1, 6], Bias::Left, vec![1, 7])]
    #[case::in_removed_element(vec![1, 3, 0], Bias::Right, vec![1, 5])]
    #[case::in_shifted_element(vec![1, 4, 2], Bias::Left, vec![1, 5, 2])]
    #[case::in_earlier_element(vec![1, 0, 2], Bias::Left, vec![1, 0, 2])]
    #[case::outside(vec![0, 9], Bias::Left, vec![0, 9])]
    #[case::ancestor_level(vec![2], Bias::Left, vec![2])]
    fn test_splice(#[case] path: Vec<usize>, #[case] bias: Bias, #[case] expected: Vec<usize>) {
        assert_eq!(splice().map_path(&path, bias), expected);
    }

    #[rstest]
    // the element at [0, 2] splits at offset 3
    #[case::later_sibling(vec![0, 4], Bias::Left, vec![0, 5])]
    #[case::before_parent(vec![0, 2], Bias::Right, vec![0, 2])]
    #[case::after_parent(vec![0, 3], Bias::Right, vec![0, 4])]
    #[case::first_half(vec![0, 2, 1], Bias::Right, vec![0, 2, 1])]
    #[case::at_split_left(vec![0, 2, 3], Bias::Left, vec![0, 2, 3])]
    #[case::at_split_right(vec![0, 2, 3], Bias::Right, vec![0, 3, 0])]
    #[case::second_half(vec![0, 2, 5], Bias::Left, vec![0, 3, 2])]
    #[case::nested_second_half(vec![0, 2, 4, 1], Bias::Left, vec![0, 3, 1, 1])]
    #[case::later_sibling_subtree(vec![0, 3, 1], Bias::Left, vec![0, 4, 1])]
    fn test_split(#[case] path: Vec<usize>, #[case] bias: Bias, #[case] expected: Vec<usize>) {
        let rule = MapRule::Split {
            parent: vec![0, 2],
            offset: 3,
        };
        assert_eq!(rule.map_path(&path, bias), expected);
    }

    #[rstest]
    // move [0]: 1..3 to the end of [2] (offset 4 after the cut)
    #[case::moved_content(vec![0, 2], Bias::Left, vec![2, 5])]
    #[case::moved_subtree(vec![0, 1, 0], Bias::Left, vec![2, 4, 0])]
    #[case::after_cut(vec![0, 5], Bias::Left, vec![0, 3])]
    #[case::cut_boundary_left(vec![0, 1], Bias::Left, vec![0, 1])]
    #[case::target_right(vec![2, 4], Bias::Right, vec![2, 6])]
    #[case::target_left(vec![2, 4], Bias::Left, vec![2, 4])]
    fn test_move(#[case] path: Vec<usize>, #[case] bias: Bias, #[case] expected: Vec<usize>) {
        let rule = MapRule::Move {
            parent: vec![0],
            start: 1,
            end: 3,
            destination: vec![2, 4],
        };
        assert_eq!(rule.map_path(&path, bias), expected);
    }

    #[test]
    fn test_composition_applies_in_order() {
        let insert = RangeMapper {
            rules: vec![MapRule::Splice {
                parent: vec![0],
                start: 0,
                end: 0,
                inserted: 2,
            }],
            target: None,
        };
        let delete = RangeMapper {
            rules: vec![MapRule::Splice {
                parent: vec![0],
                start: 1,
                end: 3,
                inserted: 0,
            }],
            target: None,
        };

        let composed = RangeMapper::compose([insert, delete]);
        // 1 -> 3 -> 1
        assert_eq!(composed.map_path(&[0, 1], Bias::Left), vec![0, 1]);
        // 4 -> 6 -> 4
        assert_eq!(composed.map_path(&[0, 4], Bias::Left), vec![0, 4]);
        assert_eq!(composed.rules().len(), 2);
    }

    #[test]
    fn test_identity() {
        let mapper = RangeMapper::identity();
        assert!(mapper.is_identity());
        assert_eq!(mapper.map_path(&[3, 1, 4], Bias::Left), vec![3, 1, 4]);
    }
}
