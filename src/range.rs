use itertools::{EitherOrBoth, Itertools};
use serde::Serialize;
use std::{borrow::Borrow, fmt};

/// Range where lower bound is inclusive, upper bound is exclusive or unbounded.
///
/// An optional label replaces the `from - to` rendering, since report categories are often named
/// differently from their bounds ("20-29" covers `[19, 29)`).
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Range<T> {
    from: T,
    to: Option<T>,
    label: Option<&'static str>,
}

impl<T> Range<T>
where
    T: Ord,
{
    pub fn new(from: T, to: Option<T>) -> Self {
        if let Some(ref to) = to {
            if from >= *to {
                panic!("ranges must go from low to high")
            }
        }
        Range {
            from,
            to,
            label: None,
        }
    }

    pub fn labelled(from: T, to: Option<T>, label: &'static str) -> Self {
        Range {
            label: Some(label),
            ..Self::new(from, to)
        }
    }

    pub fn contains(&self, val: &T) -> bool {
        if let Some(end) = &self.to {
            val >= &self.from && val < end
        } else {
            val >= &self.from
        }
    }
}

impl<T> fmt::Display for Range<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(label) = self.label {
            return f.write_str(label);
        }
        if let Some(end) = &self.to {
            write!(f, "{} - {}", self.from, end)
        } else {
            write!(f, "{}+", self.from)
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RangeSet<T> {
    ranges: Vec<Range<T>>,
}

impl<T> RangeSet<T> {
    pub fn new(ranges: Vec<Range<T>>) -> Self {
        Self { ranges }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range<T>> + '_ {
        self.ranges.iter()
    }
}

impl<T> RangeSet<T>
where
    T: Ord,
{
    /// Count values per range. `None` values, and values that fall outside every range, are
    /// counted as missing.
    pub fn bucket_values_with_missing<I, B>(self, values: I) -> RangeSetCountsWithMissing<T>
    where
        I: Iterator<Item = Option<B>>,
        B: Borrow<T>,
    {
        let mut buckets = vec![0usize; self.ranges.len() + 1];
        let last = self.ranges.len();
        for value in values {
            let idx = value.and_then(|value| {
                self.ranges
                    .iter()
                    .position(|bucket| bucket.contains(value.borrow()))
            });
            buckets[idx.unwrap_or(last)] += 1;
        }
        RangeSetCountsWithMissing {
            set: self,
            counts: buckets,
        }
    }
}

/// A range set with values bucketed, and bucket sizes recorded.
pub struct RangeSetCountsWithMissing<T> {
    set: RangeSet<T>,
    counts: Vec<usize>,
}

impl<T> RangeSetCountsWithMissing<T> {
    pub fn iter(&self) -> impl Iterator<Item = (Option<&Range<T>>, usize)> {
        self.set
            .iter()
            .zip_longest(self.counts.iter().copied())
            .map(|el| match el {
                EitherOrBoth::Left(_) => unreachable!(),
                EitherOrBoth::Right(count) => (None, count),
                EitherOrBoth::Both(range, count) => (Some(range), count),
            })
    }
}

impl<T> RangeSetCountsWithMissing<T>
where
    T: fmt::Display,
{
    pub fn for_display(&self) -> impl Iterator<Item = (&dyn fmt::Display, usize)> {
        self.iter().map(|(range, count)| {
            let range = match range {
                Some(range) => range as &dyn fmt::Display,
                None => &"missing" as &dyn fmt::Display,
            };
            (range, count)
        })
    }
}
