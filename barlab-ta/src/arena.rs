use crate::series::LineSeries;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Index of a [`LineSeries`] inside a [`SeriesArena`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct SeriesId(pub usize);

/// One line of one series: how indicators address their inputs.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct LineRef {
    pub series: SeriesId,
    pub line: usize,
}

/// Owner of every series in a run, addressed by [`SeriesId`].
///
/// Feeds and indicators reference series by index rather than by shared
/// pointers, so the whole graph has a single owner and releases in one
/// place. An indicator's output series is temporarily detached with
/// [`take`](SeriesArena::take) while its kernel runs, which lets the kernel
/// read any other series (its inputs) while writing its own.
#[derive(Debug, Default)]
pub struct SeriesArena {
    entries: Vec<LineSeries>,
}

impl SeriesArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, series: LineSeries) -> SeriesId {
        self.entries.push(series);
        SeriesId(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: SeriesId) -> bool {
        id.0 < self.entries.len()
    }

    pub fn series(&self, id: SeriesId) -> &LineSeries {
        &self.entries[id.0]
    }

    pub fn series_mut(&mut self, id: SeriesId) -> &mut LineSeries {
        &mut self.entries[id.0]
    }

    /// Detach a series, leaving an empty placeholder.
    pub fn take(&mut self, id: SeriesId) -> LineSeries {
        std::mem::take(&mut self.entries[id.0])
    }

    /// Restore a series detached with [`take`](SeriesArena::take).
    pub fn restore(&mut self, id: SeriesId, series: LineSeries) {
        self.entries[id.0] = series;
    }
}

/// Read context handed to indicator kernels: the arena plus the kernel's
/// resolved input lines.
///
/// Kernels address bars by absolute index `i`; out-of-range reads are NaN.
#[derive(Debug, Copy, Clone)]
pub struct Ctx<'a> {
    arena: &'a SeriesArena,
    inputs: &'a [LineRef],
}

impl<'a> Ctx<'a> {
    pub fn new(arena: &'a SeriesArena, inputs: &'a [LineRef]) -> Self {
        Self { arena, inputs }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Value of input `input` at absolute bar `i`; NaN out of range.
    pub fn at(&self, input: usize, i: isize) -> f64 {
        let r = self.inputs[input];
        self.arena.series(r.series).get_abs(r.line, i)
    }

    /// Appended length of the series behind input `input`.
    pub fn input_len(&self, input: usize) -> usize {
        self.arena.series(self.inputs[input].series).data_size()
    }
}
