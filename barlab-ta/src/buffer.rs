use std::ops::Index;

/// Division that substitutes `zero` when the denominator is exactly zero.
///
/// Strict division (the default throughout the indicator kernels) follows
/// IEEE-754: `x/0 -> ±inf` signed by the numerator, `0/0 -> NaN`.
pub fn safe_div(num: f64, den: f64, zero: f64) -> f64 {
    if den == 0.0 { zero } else { num / den }
}

/// Growable column of doubles with a movable logical cursor.
///
/// Values are stored in insertion order. Reads are relative to the cursor
/// `idx` via an `ago` offset: `get(0)` is the current value, `get(-1)` the
/// previous one. Reads outside the written range (including any `ago > 0`)
/// yield NaN and never panic; NaN is the "not yet available / undefined"
/// sentinel across the whole framework.
///
/// Streaming mode drives the buffer with [`append`](LineBuffer::append)
/// (cursor follows the data); batch mode pre-allocates with
/// [`extend_nan`](LineBuffer::extend_nan), fills by absolute index and
/// traverses afterwards with [`forward`](LineBuffer::forward). Buffers grow
/// monotonically; only [`reset`](LineBuffer::reset) shrinks them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBuffer {
    array: Vec<f64>,
    idx: isize,
}

static OUT_OF_RANGE: f64 = f64::NAN;

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            array: Vec::new(),
            idx: -1,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            array: Vec::with_capacity(capacity),
            idx: -1,
        }
    }

    /// Append a value and move the cursor onto it.
    pub fn append(&mut self, value: f64) {
        self.array.push(value);
        self.idx = self.array.len() as isize - 1;
    }

    /// Append `n` NaN slots without moving the cursor (batch pre-allocation).
    pub fn extend_nan(&mut self, n: usize) {
        self.array.resize(self.array.len() + n, f64::NAN);
    }

    /// Advance the cursor by `n` positions without appending.
    ///
    /// The cursor must stay within the allocated range.
    pub fn forward(&mut self, n: usize) {
        let next = self.idx + n as isize;
        assert!(
            next < self.array.len() as isize,
            "LineBuffer::forward beyond allocated range (idx {next}, len {})",
            self.array.len()
        );
        self.idx = next;
    }

    /// Value at `idx + ago`. `ago` must be `<= 0`; anything outside the
    /// written range (past or future) is NaN.
    pub fn get(&self, ago: isize) -> f64 {
        if ago > 0 {
            return OUT_OF_RANGE;
        }
        let i = self.idx + ago;
        if i < 0 || i > self.idx {
            return OUT_OF_RANGE;
        }
        self.array[i as usize]
    }

    /// Write at `idx + ago`. The target must be within the allocated range.
    pub fn set(&mut self, ago: isize, value: f64) {
        let i = self.idx + ago;
        assert!(
            i >= 0 && i < self.array.len() as isize,
            "LineBuffer::set outside allocated range (idx {}, ago {ago}, len {})",
            self.idx,
            self.array.len()
        );
        self.array[i as usize] = value;
    }

    /// Value at absolute position `i`, NaN if out of range.
    pub fn get_abs(&self, i: isize) -> f64 {
        if i < 0 || i as usize >= self.array.len() {
            return OUT_OF_RANGE;
        }
        self.array[i as usize]
    }

    /// Write at absolute position `i`, which must be allocated.
    pub fn set_abs(&mut self, i: usize, value: f64) {
        assert!(
            i < self.array.len(),
            "LineBuffer::set_abs outside allocated range (i {i}, len {})",
            self.array.len()
        );
        self.array[i] = value;
    }

    /// Cursor-relative length: the number of values up to and including the
    /// cursor.
    pub fn size(&self) -> usize {
        (self.idx + 1) as usize
    }

    /// Number of appended values regardless of cursor position.
    pub fn data_size(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Empty the buffer and park the cursor before the first slot.
    pub fn reset(&mut self) {
        self.array.clear();
        self.idx = -1;
    }

    pub fn get_idx(&self) -> isize {
        self.idx
    }

    /// Explicit cursor control; `i` must lie in `[-1, data_size - 1]`.
    pub fn set_idx(&mut self, i: isize) {
        assert!(
            i >= -1 && i < self.array.len() as isize,
            "LineBuffer::set_idx out of range (i {i}, len {})",
            self.array.len()
        );
        self.idx = i;
    }

    /// Raw view of the stored values in insertion order.
    pub fn as_slice(&self) -> &[f64] {
        &self.array
    }
}

impl Index<isize> for LineBuffer {
    type Output = f64;

    fn index(&self, ago: isize) -> &f64 {
        if ago > 0 {
            return &OUT_OF_RANGE;
        }
        let i = self.idx + ago;
        if i < 0 || i > self.idx {
            return &OUT_OF_RANGE;
        }
        &self.array[i as usize]
    }
}
