use serde::{Deserialize, Serialize};

/// A half-open range `[start, end)` into the original wikitext.
///
/// Offsets are measured in Unicode codepoints, not bytes. Use
/// [`SourceText`] to turn a range back into a `&str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "SourceRange start must be <= end");
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Returns a range that covers both `self` and `other`.
    #[inline]
    pub fn cover(self, other: SourceRange) -> SourceRange {
        SourceRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shifts both ends by `delta`, saturating at zero.
    #[inline]
    pub fn offset(self, delta: isize) -> SourceRange {
        let shift = |v: usize| v.saturating_add_signed(delta);
        SourceRange {
            start: shift(self.start),
            end: shift(self.end),
        }
    }
}

/// Location of a DOM node in the original wikitext.
///
/// `open_width` and `close_width` are the widths of the wikitext markup that
/// opened and closed the node (`''` for italics, `[[` for links, ...).
/// `None` means the width is unknown, which is not the same as zero: an
/// unknown width rules out reusing that boundary's source.
///
/// The JSON form is the array `[start, end, open_width, close_width]` with
/// `null` or negative numbers for unknown positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<i64>>", into = "Vec<Option<i64>>")]
pub struct DomSourceRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub open_width: Option<usize>,
    pub close_width: Option<usize>,
}

impl DomSourceRange {
    pub fn new(start: usize, end: usize, open_width: usize, close_width: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            open_width: Some(open_width),
            close_width: Some(close_width),
        }
    }

    /// Start and end are both known and ordered.
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }

    /// `start <= start + open_width <= end - close_width <= end`, with every
    /// component known.
    pub fn has_valid_tag_widths(&self) -> bool {
        let (Some(s), Some(e), Some(ow), Some(cw)) =
            (self.start, self.end, self.open_width, self.close_width)
        else {
            return false;
        };
        s <= e && ow <= e - s && cw <= e - s - ow
    }

    pub fn range(&self) -> Option<SourceRange> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if s <= e => Some(SourceRange::new(s, e)),
            _ => None,
        }
    }

    pub fn inner_start(&self) -> Option<usize> {
        Some(self.start? + self.open_width?)
    }

    pub fn inner_end(&self) -> Option<usize> {
        self.end?.checked_sub(self.close_width?)
    }

    pub fn open_range(&self) -> Option<SourceRange> {
        let s = self.start?;
        Some(SourceRange::new(s, s + self.open_width?))
    }

    pub fn inner_range(&self) -> Option<SourceRange> {
        let (s, e) = (self.inner_start()?, self.inner_end()?);
        (s <= e).then(|| SourceRange::new(s, e))
    }

    pub fn close_range(&self) -> Option<SourceRange> {
        let e = self.end?;
        Some(SourceRange::new(self.inner_end()?, e))
    }
}

impl TryFrom<Vec<Option<i64>>> for DomSourceRange {
    type Error = String;

    fn try_from(v: Vec<Option<i64>>) -> Result<Self, Self::Error> {
        if v.len() > 6 {
            return Err(format!("dsr has {} elements, expected at most 6", v.len()));
        }
        // trailing leading/trailing-ws fields are accepted and dropped.
        let at = |i: usize| {
            v.get(i)
                .copied()
                .flatten()
                .and_then(|n| usize::try_from(n).ok())
        };
        Ok(Self {
            start: at(0),
            end: at(1),
            open_width: at(2),
            close_width: at(3),
        })
    }
}

impl From<DomSourceRange> for Vec<Option<i64>> {
    fn from(d: DomSourceRange) -> Self {
        let conv = |v: Option<usize>| v.and_then(|n| i64::try_from(n).ok());
        vec![
            conv(d.start),
            conv(d.end),
            conv(d.open_width),
            conv(d.close_width),
        ]
    }
}

/// The original wikitext, indexable by codepoint offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    // byte offset of every codepoint, plus one trailing entry for the end.
    offsets: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in codepoints.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the text covered by `range`, or `None` when the range runs
    /// past the end of the source.
    pub fn slice(&self, range: SourceRange) -> Option<&str> {
        if range.start > range.end {
            return None;
        }
        let s = *self.offsets.get(range.start)?;
        let e = *self.offsets.get(range.end)?;
        self.text.get(s..e)
    }

    pub fn slice_between(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        self.slice(SourceRange::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsr_from_json_array_with_unknowns() {
        let d: DomSourceRange = serde_json::from_str("[0,10,null,-1]").unwrap();
        assert_eq!(d.start, Some(0));
        assert_eq!(d.end, Some(10));
        assert_eq!(d.open_width, None);
        assert_eq!(d.close_width, None);
        assert!(d.is_valid());
        assert!(!d.has_valid_tag_widths());
    }

    #[test]
    fn dsr_short_and_long_arrays() {
        let d: DomSourceRange = serde_json::from_str("[3,7]").unwrap();
        assert_eq!(d.range(), Some(SourceRange::new(3, 7)));
        assert_eq!(d.open_width, None);

        let d: DomSourceRange = serde_json::from_str("[0,12,3,3,0,1]").unwrap();
        assert!(d.has_valid_tag_widths());
        assert_eq!(d.inner_range(), Some(SourceRange::new(3, 9)));

        assert!(serde_json::from_str::<DomSourceRange>("[0,1,0,0,0,0,0]").is_err());
    }

    #[test]
    fn tag_widths_must_fit_inside_range() {
        assert!(DomSourceRange::new(0, 10, 3, 3).has_valid_tag_widths());
        assert!(DomSourceRange::new(0, 6, 3, 3).has_valid_tag_widths());
        assert!(!DomSourceRange::new(0, 5, 3, 3).has_valid_tag_widths());
        let backwards = DomSourceRange {
            start: Some(5),
            end: Some(2),
            open_width: Some(0),
            close_width: Some(0),
        };
        assert!(!backwards.is_valid());
        assert!(!backwards.has_valid_tag_widths());
    }

    #[test]
    fn open_and_close_ranges() {
        let d = DomSourceRange::new(4, 14, 3, 3);
        assert_eq!(d.open_range(), Some(SourceRange::new(4, 7)));
        assert_eq!(d.close_range(), Some(SourceRange::new(11, 14)));
    }

    #[test]
    fn source_text_slices_by_codepoint() {
        let src = SourceText::new("héllo wörld");
        assert_eq!(src.len(), 11);
        assert_eq!(src.slice(SourceRange::new(0, 5)), Some("héllo"));
        assert_eq!(src.slice(SourceRange::new(6, 11)), Some("wörld"));
        assert_eq!(src.slice(SourceRange::new(6, 12)), None);
        assert_eq!(src.slice_between(4, 2), None);
    }

    #[test]
    fn range_offset_and_cover() {
        let r = SourceRange::new(5, 9);
        assert_eq!(r.offset(3), SourceRange::new(8, 12));
        assert_eq!(r.offset(-7), SourceRange::new(0, 2));
        assert_eq!(r.cover(SourceRange::new(1, 6)), SourceRange::new(1, 9));
        assert!(r.contains(5) && !r.contains(9));
    }
}
