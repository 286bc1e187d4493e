/// Newline requirement between two adjacent pieces of wikitext.
///
/// `min <= max` holds for every value produced by [`Constraint::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub min: usize,
    pub max: usize,
    /// Must be honored exactly, even against a neighbour's preference.
    pub force: bool,
}

impl Default for Constraint {
    fn default() -> Self {
        Self::new(0, 2)
    }
}

/// Result of merging two constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merged {
    pub constraint: Constraint,
    /// The two intervals did not overlap and one side had to give way.
    pub conflict: bool,
}

impl Constraint {
    /// No upper bound on newlines.
    pub const UNBOUNDED: usize = usize::MAX;

    pub const fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            force: false,
        }
    }

    pub const fn exactly(n: usize) -> Self {
        Self::new(n, n)
    }

    /// `{min}` with the default upper bound of two.
    pub const fn at_least(min: usize) -> Self {
        Self::new(min, if min > 2 { min } else { 2 })
    }

    pub const fn forced(self) -> Self {
        Self {
            force: true,
            ..self
        }
    }

    /// Single-line override: no newlines allowed at all.
    pub const fn single_line() -> Self {
        Self::exactly(0).forced()
    }

    pub fn allows(&self, newlines: usize) -> bool {
        self.min <= newlines && newlines <= self.max
    }

    /// Intersects two intervals.
    ///
    /// On conflict (`min > max`) a forced side wins outright; when neither
    /// or both are forced the larger minimum wins as `{m, m}`.
    pub fn merge(self, other: Constraint) -> Merged {
        let merged = Constraint {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
            force: self.force || other.force,
        };
        if merged.min <= merged.max {
            return Merged {
                constraint: merged,
                conflict: false,
            };
        }
        let constraint = match (self.force, other.force) {
            (true, false) => self,
            (false, true) => other,
            _ => Constraint {
                min: merged.min,
                max: merged.min,
                force: merged.force,
            },
        };
        Merged {
            constraint,
            conflict: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[Constraint] = &[
        Constraint::new(0, 0),
        Constraint::new(0, 1),
        Constraint::new(0, 2),
        Constraint::new(1, 1),
        Constraint::new(1, 2),
        Constraint::new(2, 2),
        Constraint::new(0, Constraint::UNBOUNDED),
        Constraint::new(0, 0).forced(),
        Constraint::new(2, 2).forced(),
    ];

    #[test]
    fn merge_is_commutative_and_ordered() {
        for &a in SAMPLES {
            for &b in SAMPLES {
                let ab = a.merge(b);
                let ba = b.merge(a);
                assert_eq!(ab, ba, "{a:?} vs {b:?}");
                assert!(ab.constraint.min <= ab.constraint.max);
            }
        }
    }

    #[test]
    fn overlapping_merge_narrows_both_bounds() {
        for &a in SAMPLES {
            for &b in SAMPLES {
                let m = a.merge(b);
                if m.conflict {
                    continue;
                }
                assert!(m.constraint.min >= a.min && m.constraint.min >= b.min);
                assert!(m.constraint.max <= a.max && m.constraint.max <= b.max);
            }
        }
    }

    #[test]
    fn conflicts_favor_force_then_larger_min() {
        let m = Constraint::new(2, 2).merge(Constraint::new(0, 0));
        assert!(m.conflict);
        assert_eq!(m.constraint, Constraint::new(2, 2));

        let m = Constraint::new(2, 2).merge(Constraint::single_line());
        assert!(m.conflict);
        assert_eq!(m.constraint, Constraint::single_line());

        let m = Constraint::new(1, 2).merge(Constraint::new(0, 1));
        assert!(!m.conflict);
        assert_eq!(m.constraint, Constraint::new(1, 1));
    }

    #[test]
    fn at_least_defaults_to_two_max() {
        assert_eq!(Constraint::at_least(1), Constraint::new(1, 2));
        assert_eq!(Constraint::at_least(3), Constraint::new(3, 3));
        assert!(Constraint::default().allows(2) && !Constraint::default().allows(3));
    }
}
