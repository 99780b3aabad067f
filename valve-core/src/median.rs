//! Running median over a fixed window.

use heapless::Vec;

/// Median of the last `N` inserted values.
///
/// Keeps the raw window in insertion order alongside a sorted copy, so each
/// insert is a single replace-and-bubble over at most `N` elements. A window
/// of zero disables the filter.
#[derive(Clone, Debug)]
pub struct RunningMedianFilter<T, const N: usize> {
    values: Vec<T, N>,
    sorted: Vec<T, N>,
    oldest: usize,
}

impl<T, const N: usize> Default for RunningMedianFilter<T, N>
where
    T: Copy + PartialOrd,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RunningMedianFilter<T, N>
where
    T: Copy + PartialOrd,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
            sorted: Vec::new(),
            oldest: 0,
        }
    }

    /// Adds `value`, evicting the oldest sample once the window is full.
    pub fn insert(&mut self, value: T) {
        match self.values.push(value) {
            Ok(()) => {
                if self.sorted.push(value).is_ok() {
                    self.sink(self.sorted.len() - 1);
                }
            }
            Err(value) => self.replace_oldest(value),
        }
    }

    /// Middle element of the sorted window (index `len / 2`).
    #[must_use]
    pub fn median(&self) -> Option<T> {
        self.sorted.get(self.sorted.len() / 2).copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sorted.clear();
        self.oldest = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn replace_oldest(&mut self, value: T) {
        let Some(slot) = self.values.get_mut(self.oldest) else {
            return;
        };
        let evicted = core::mem::replace(slot, value);
        self.oldest = (self.oldest + 1) % self.values.len();
        if evicted == value {
            return;
        }

        // Values that are not equal to themselves (NaN) cannot be located in
        // the sorted copy; rebuild it from the raw window instead.
        let Some(index) = self.sorted.iter().position(|sample| *sample == evicted) else {
            self.resort();
            return;
        };
        self.sorted[index] = value;
        let index = self.rise(index);
        self.sink(index);
    }

    // Moves the element at `index` towards the end while it is larger than its
    // right neighbour.
    fn rise(&mut self, mut index: usize) -> usize {
        while index + 1 < self.sorted.len() && self.sorted[index] > self.sorted[index + 1] {
            self.sorted.swap(index, index + 1);
            index += 1;
        }
        index
    }

    fn sink(&mut self, mut index: usize) {
        while index > 0 && self.sorted[index - 1] > self.sorted[index] {
            self.sorted.swap(index - 1, index);
            index -= 1;
        }
    }

    fn resort(&mut self) {
        let window = self.values.clone();
        self.sorted.clear();
        for &value in &window {
            if self.sorted.push(value).is_ok() {
                self.sink(self.sorted.len() - 1);
            }
        }
    }
}
