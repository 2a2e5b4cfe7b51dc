/// Generation-stamped mark array.
///
/// Marking index `i` writes the current generation into `marks[i]`; a slot is
/// marked iff it holds the current generation. Starting a new generation is
/// O(1), so the array is never cleared between uses. When the counter would
/// reach `u32::MAX` the array is zeroed and the counter restarts at 1, which
/// keeps stale slots from colliding with a wrapped generation.
#[derive(Debug, Clone)]
pub struct StampSet {
    marks: Vec<u32>,
    generation: u32,
}

impl Default for StampSet {
    fn default() -> Self {
        Self::new(0)
    }
}

impl StampSet {
    /// Create a set covering indices `[0, len)`, with nothing marked.
    pub fn new(len: usize) -> Self {
        Self {
            marks: vec![0; len],
            generation: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Unmark everything by advancing the generation.
    pub fn begin(&mut self) {
        if self.generation >= u32::MAX - 1 {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Mark `i`. Returns `true` if it was not already marked this generation.
    /// Out-of-range indices are dropped and report `false`.
    pub fn mark(&mut self, i: usize) -> bool {
        match self.marks.get_mut(i) {
            Some(slot) if *slot != self.generation => {
                *slot = self.generation;
                true
            }
            _ => false,
        }
    }

    pub fn is_marked(&self, i: usize) -> bool {
        self.marks.get(i).is_some_and(|&g| g == self.generation)
    }

    #[cfg(test)]
    pub(crate) fn force_generation(&mut self, generation: u32) {
        self.generation = generation;
    }
}
