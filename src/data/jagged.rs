use std::{ops::Range, sync::Arc};

use crate::{data::column::Column, HepvecError, HepvecResult};

/// Flat storage which a [`JaggedArray`] can partition into rows.
pub trait Content: Clone {
    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather entries by position. A `None` index produces the zero element of the content
    /// (`0.0` for numbers, the zero vector for vectors, an empty row for jagged content).
    fn take(&self, indices: &[Option<usize>]) -> Self;
}

/// Convert per-row counts into canonical offsets `[0, c0, c0 + c1, ...]`.
pub fn counts_to_offsets(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut total = 0;
    offsets.push(total);
    for count in counts {
        total += count;
        offsets.push(total);
    }
    offsets
}

/// A sequence of variable-length rows over shared flat content.
///
/// Row `i` covers `content[starts[i]..stops[i]]`. Rows need not be contiguous or ordered, and
/// content outside every row is simply unreachable. The partition and the content are both
/// reference-counted, so arrays which only differ in their content share one partition.
#[derive(Clone, Debug)]
pub struct JaggedArray<C> {
    starts: Arc<[usize]>,
    stops: Arc<[usize]>,
    content: Arc<C>,
}

impl<C> JaggedArray<C> {
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Number of entries in each row.
    pub fn counts(&self) -> Vec<usize> {
        self.starts
            .iter()
            .zip(self.stops.iter())
            .map(|(start, stop)| stop - start)
            .collect()
    }

    pub fn row_range(&self, row: usize) -> Option<Range<usize>> {
        Some(*self.starts.get(row)?..*self.stops.get(row)?)
    }

    pub fn row_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.starts
            .iter()
            .zip(self.stops.iter())
            .map(|(start, stop)| *start..*stop)
    }

    /// Compare partitions by value.
    pub fn same_partition<D>(&self, other: &JaggedArray<D>) -> bool {
        (Arc::ptr_eq(&self.starts, &other.starts) && Arc::ptr_eq(&self.stops, &other.stops))
            || (self.starts == other.starts && self.stops == other.stops)
    }

    /// `true` if rows tile the content exactly, in order, starting at zero.
    pub fn is_compact(&self) -> bool
    where
        C: Content,
    {
        let mut expected = 0;
        for (start, stop) in self.starts.iter().zip(self.stops.iter()) {
            if *start != expected {
                return false;
            }
            expected = *stop;
        }
        expected == self.content.len()
    }

    /// Keep the partition and replace the content.
    pub fn with_content<D>(&self, content: D) -> JaggedArray<D> {
        JaggedArray {
            starts: Arc::clone(&self.starts),
            stops: Arc::clone(&self.stops),
            content: Arc::new(content),
        }
    }

    /// Keep the partition and transform the content.
    pub fn map_content<D, F>(&self, f: F) -> JaggedArray<D>
    where
        F: FnOnce(&C) -> D,
    {
        self.with_content(f(&self.content))
    }

    /// Keep the partition and transform the content, failing if the transformation does.
    pub fn try_map_content<D, F>(&self, f: F) -> HepvecResult<JaggedArray<D>>
    where
        F: FnOnce(&C) -> HepvecResult<D>,
    {
        Ok(self.with_content(f(&self.content)?))
    }
}

impl<C: Content> JaggedArray<C> {
    /// Build a jagged array from explicit row boundaries.
    pub fn new(starts: Vec<usize>, stops: Vec<usize>, content: C) -> HepvecResult<Self> {
        Self::from_parts(starts.into(), stops.into(), Arc::new(content))
    }

    fn from_parts(starts: Arc<[usize]>, stops: Arc<[usize]>, content: Arc<C>) -> HepvecResult<Self> {
        if starts.len() != stops.len() {
            return Err(HepvecError::InvalidPartition(format!(
                "{} starts but {} stops",
                starts.len(),
                stops.len()
            )));
        }
        let len = content.len();
        for (row, (start, stop)) in starts.iter().zip(stops.iter()).enumerate() {
            if start > stop || *stop > len {
                return Err(HepvecError::InvalidPartition(format!(
                    "row {row} spans {start}..{stop} over content of length {len}"
                )));
            }
        }
        Ok(Self {
            starts,
            stops,
            content,
        })
    }

    /// Build a jagged array from `n + 1` non-decreasing offsets.
    pub fn from_offsets(offsets: &[usize], content: C) -> HepvecResult<Self> {
        if offsets.is_empty() {
            return Err(HepvecError::InvalidPartition(
                "offsets must contain at least one entry".to_string(),
            ));
        }
        Self::new(
            offsets[..offsets.len() - 1].to_vec(),
            offsets[1..].to_vec(),
            content,
        )
    }

    /// Build a jagged array whose rows have the given sizes.
    pub fn from_counts(counts: &[usize], content: C) -> HepvecResult<Self> {
        Self::from_offsets(&counts_to_offsets(counts), content)
    }

    /// Rebuild this array over a new partition of the same content.
    pub fn repartition(&self, starts: Vec<usize>, stops: Vec<usize>) -> HepvecResult<Self> {
        Self::from_parts(starts.into(), stops.into(), Arc::clone(&self.content))
    }

    /// The content of one row.
    pub fn row(&self, row: usize) -> Option<C> {
        let range = self.row_range(row)?;
        Some(self.content.take(&range.map(Some).collect::<Vec<_>>()))
    }

    /// The content of every row, concatenated in row order.
    ///
    /// When the rows already tile the content, the content itself is returned (sharing its
    /// storage and any memoized quantities).
    pub fn flatten(&self) -> C {
        if self.is_compact() {
            return self.content.as_ref().clone();
        }
        let indices: Vec<Option<usize>> = self.row_ranges().flatten().map(Some).collect();
        self.content.take(&indices)
    }
}

impl<C: Content> Content for JaggedArray<C> {
    fn len(&self) -> usize {
        JaggedArray::len(self)
    }

    // Rows are selected by rebuilding the partition only, so the content stays shared.
    fn take(&self, indices: &[Option<usize>]) -> Self {
        let (starts, stops) = indices
            .iter()
            .map(|i| match i {
                Some(i) => (self.starts[*i], self.stops[*i]),
                None => (0, 0),
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();
        Self {
            starts: starts.into(),
            stops: stops.into(),
            content: Arc::clone(&self.content),
        }
    }
}

/// Either flat content or a jagged array of (possibly jagged) content.
///
/// `Nested<Column>` is a column of numbers with any depth of jaggedness, and
/// `Nested<Vec4Array>` is the same for Lorentz vectors.
#[derive(Clone, Debug)]
pub enum Nested<T> {
    Flat(T),
    Jagged(JaggedArray<Nested<T>>),
}

impl<T> Nested<T> {
    pub fn is_jagged(&self) -> bool {
        matches!(self, Nested::Jagged(_))
    }

    /// Number of jagged levels above the flat content.
    pub fn depth(&self) -> usize {
        match self {
            Nested::Flat(_) => 0,
            Nested::Jagged(jagged) => 1 + jagged.content().depth(),
        }
    }

    pub fn as_flat(&self) -> Option<&T> {
        match self {
            Nested::Flat(flat) => Some(flat),
            Nested::Jagged(_) => None,
        }
    }

    pub fn into_flat(self) -> Option<T> {
        match self {
            Nested::Flat(flat) => Some(flat),
            Nested::Jagged(_) => None,
        }
    }

    pub fn as_jagged(&self) -> Option<&JaggedArray<Nested<T>>> {
        match self {
            Nested::Flat(_) => None,
            Nested::Jagged(jagged) => Some(jagged),
        }
    }

    /// The flat content at the bottom of every jagged level.
    pub fn innermost(&self) -> &T {
        match self {
            Nested::Flat(flat) => flat,
            Nested::Jagged(jagged) => jagged.content().innermost(),
        }
    }

    /// Row sizes of the outermost jagged level.
    pub fn counts(&self) -> Option<Vec<usize>> {
        self.as_jagged().map(JaggedArray::counts)
    }

    /// Transform the flat content while keeping every partition (and therefore every row
    /// boundary) untouched.
    pub fn map_content<U, F>(&self, f: F) -> Nested<U>
    where
        F: Fn(&T) -> U,
    {
        self.map_content_ref(&f)
    }

    fn map_content_ref<U, F>(&self, f: &F) -> Nested<U>
    where
        F: Fn(&T) -> U,
    {
        match self {
            Nested::Flat(flat) => Nested::Flat(f(flat)),
            Nested::Jagged(jagged) => {
                Nested::Jagged(jagged.map_content(|content| content.map_content_ref(f)))
            }
        }
    }

    pub fn try_map_content<U, F>(&self, f: F) -> HepvecResult<Nested<U>>
    where
        F: Fn(&T) -> HepvecResult<U>,
    {
        self.try_map_content_ref(&f)
    }

    fn try_map_content_ref<U, F>(&self, f: &F) -> HepvecResult<Nested<U>>
    where
        F: Fn(&T) -> HepvecResult<U>,
    {
        Ok(match self {
            Nested::Flat(flat) => Nested::Flat(f(flat)?),
            Nested::Jagged(jagged) => Nested::Jagged(
                jagged.try_map_content(|content| content.try_map_content_ref(f))?,
            ),
        })
    }
}

impl<T: Content> Nested<T> {
    /// A single jagged level with rows of the given sizes over `content`.
    pub fn from_counts(counts: &[usize], content: T) -> HepvecResult<Self> {
        Ok(Nested::Jagged(JaggedArray::from_counts(
            counts,
            Nested::Flat(content),
        )?))
    }

    /// A single jagged level from explicit row boundaries over `content`.
    pub fn from_starts_stops(starts: Vec<usize>, stops: Vec<usize>, content: T) -> HepvecResult<Self> {
        Ok(Nested::Jagged(JaggedArray::new(
            starts,
            stops,
            Nested::Flat(content),
        )?))
    }

    /// Add a jagged level on top of this array.
    pub fn wrap_counts(self, counts: &[usize]) -> HepvecResult<Self> {
        Ok(Nested::Jagged(JaggedArray::from_counts(counts, self)?))
    }

    /// Each row of the outermost jagged level as its own array.
    pub fn rows(&self) -> Option<Vec<Nested<T>>> {
        let jagged = self.as_jagged()?;
        (0..jagged.len()).map(|row| jagged.row(row)).collect()
    }

    /// Remove every jagged level, concatenating rows in order.
    pub fn flatten_all(&self) -> T {
        match self {
            Nested::Flat(flat) => flat.clone(),
            Nested::Jagged(jagged) => jagged.flatten().flatten_all(),
        }
    }
}

impl<T: Content> Content for Nested<T> {
    fn len(&self) -> usize {
        match self {
            Nested::Flat(flat) => flat.len(),
            Nested::Jagged(jagged) => jagged.len(),
        }
    }

    fn take(&self, indices: &[Option<usize>]) -> Self {
        match self {
            Nested::Flat(flat) => Nested::Flat(flat.take(indices)),
            Nested::Jagged(jagged) => Nested::Jagged(jagged.take(indices)),
        }
    }
}

impl<T> From<T> for Nested<T> {
    fn from(flat: T) -> Self {
        Nested::Flat(flat)
    }
}

impl From<Vec<f64>> for Nested<Column> {
    fn from(values: Vec<f64>) -> Self {
        Nested::Flat(Column::new(values))
    }
}
