use crate::addressing::position::Position;
use crate::addressing::range::Range;
use crate::error::{EngineError, Result};
use crate::mapping::RangeMapper;
use crate::model::Tree;

/// Ordered, possibly empty list of ranges plus a direction flag.
///
/// For a left-to-right selection the anchor is the start of the first range
/// and the focus the end of the last; right-to-left swaps them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ranges: Vec<Range>,
    right_to_left: bool,
}

impl Selection {
    pub fn new(mut ranges: Vec<Range>, right_to_left: bool) -> Self {
        ranges.sort_by(|a, b| a.start().path().cmp(b.start().path()));
        Self {
            ranges,
            right_to_left,
        }
    }

    pub fn single(range: Range) -> Self {
        Self::new(vec![range], false)
    }

    pub fn caret(at: Position) -> Self {
        Self::single(Range::collapsed(at))
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn primary(&self) -> Option<&Range> {
        self.ranges.first()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_right_to_left(&self) -> bool {
        self.right_to_left
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_collapsed()
    }

    pub fn anchor(&self) -> Result<&Position> {
        let range = if self.right_to_left {
            self.ranges.last().map(Range::end)
        } else {
            self.ranges.first().map(Range::start)
        };
        range.ok_or(EngineError::IncompleteSelection { missing: "anchor" })
    }

    pub fn focus(&self) -> Result<&Position> {
        let range = if self.right_to_left {
            self.ranges.first().map(Range::start)
        } else {
            self.ranges.last().map(Range::end)
        };
        range.ok_or(EngineError::IncompleteSelection { missing: "focus" })
    }

    /// The selection carried through an edit. Carets follow inserted
    /// content; other ranges grow to include content inserted at their
    /// edges.
    pub fn mapped(&self, mapper: &RangeMapper) -> Result<Selection> {
        let ranges = self
            .ranges
            .iter()
            .map(|range| mapper.map_range(range))
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::new(ranges, self.right_to_left))
    }

    pub fn rerooted(&self, tree: &Tree) -> Result<Selection> {
        let ranges = self
            .ranges
            .iter()
            .map(|range| range.rerooted_clamped(tree))
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::new(ranges, self.right_to_left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_document;

    #[test]
    fn test_anchor_and_focus_follow_direction() {
        let tree = parse_document("<p>hello</p><p>world</p>").unwrap();
        let a = Range::from_paths(&tree, vec![0, 1], vec![0, 2]).unwrap();
        let b = Range::from_paths(&tree, vec![1, 1], vec![1, 3]).unwrap();

        let forward = Selection::new(vec![b.clone(), a.clone()], false);
        assert_eq!(forward.ranges()[0], a);
        assert_eq!(forward.anchor().unwrap().path(), &[0, 1]);
        assert_eq!(forward.focus().unwrap().path(), &[1, 3]);

        let backward = Selection::new(vec![a, b], true);
        assert_eq!(backward.anchor().unwrap().path(), &[1, 3]);
        assert_eq!(backward.focus().unwrap().path(), &[0, 1]);
    }

    #[test]
    fn test_empty_selection_has_no_anchor() {
        let selection = Selection::default();
        assert_eq!(
            selection.anchor(),
            Err(EngineError::IncompleteSelection { missing: "anchor" })
        );
        assert!(selection.focus().is_err());
    }
}
