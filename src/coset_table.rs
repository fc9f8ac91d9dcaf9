//! Coset table.
//!
//! Three parallel sparse matrices indexed by `(coset, generator)`. Grows on
//! demand via [`CosetTable::add_row`]; rows are never removed (deactivated
//! cosets keep their row, since compression is a separate relabelling
//! step, not a table resize).

use crate::common::Letter;

/// A coset id. Coset `0` is the identity class for monoid presentations, or
/// an auxiliary source node for semigroup presentations.
pub type Coset = usize;

pub struct CosetTable {
    nr_generators: usize,
    image: Vec<Vec<Option<Coset>>>,
    preim_init: Vec<Vec<Option<Coset>>>,
    preim_next: Vec<Vec<Option<Coset>>>,
}

impl CosetTable {
    pub fn new(nr_generators: usize) -> Self {
        CosetTable {
            nr_generators,
            image: Vec::new(),
            preim_init: Vec::new(),
            preim_next: Vec::new(),
        }
    }

    pub fn nr_generators(&self) -> usize {
        self.nr_generators
    }

    pub fn nr_rows(&self) -> usize {
        self.image.len()
    }

    /// Appends a row initialised to undefined in every column, returning its
    /// coset id.
    pub fn add_row(&mut self) -> Coset {
        let c = self.image.len();
        self.image.push(vec![None; self.nr_generators]);
        self.preim_init.push(vec![None; self.nr_generators]);
        self.preim_next.push(vec![None; self.nr_generators]);
        c
    }

    pub fn image(&self, c: Coset, a: Letter) -> Option<Coset> {
        self.image[c][a as usize]
    }

    /// Records `image[c, a] = d` and links `c` into `d`'s preimage chain
    /// under `a`.
    pub fn set_image(&mut self, c: Coset, a: Letter, d: Coset) {
        debug_assert!(self.image[c][a as usize].is_none(), "overwriting a defined image");
        self.image[c][a as usize] = Some(d);
        let ai = a as usize;
        self.preim_next[c][ai] = self.preim_init[d][ai];
        self.preim_init[d][ai] = Some(c);
    }

    /// Removes `c` from the preimage chain it occupies under `a` and resets
    /// `image[c, a]`.
    pub fn clear_image(&mut self, c: Coset, a: Letter) {
        let ai = a as usize;
        let Some(d) = self.image[c][ai] else { return };
        self.image[c][ai] = None;
        let mut cur = self.preim_init[d][ai];
        let mut prev: Option<Coset> = None;
        while let Some(node) = cur {
            let next = self.preim_next[node][ai];
            if node == c {
                match prev {
                    Some(p) => self.preim_next[p][ai] = next,
                    None => self.preim_init[d][ai] = next,
                }
                self.preim_next[c][ai] = None;
                return;
            }
            prev = Some(node);
            cur = next;
        }
    }

    /// Lazily iterates every `c` with `image[c, a] = d`.
    pub fn preimage_chain(&self, d: Coset, a: Letter) -> PreimageChain<'_> {
        PreimageChain {
            table: self,
            generator: a,
            cur: self.preim_init[d][a as usize],
        }
    }
}

pub struct PreimageChain<'a> {
    table: &'a CosetTable,
    generator: Letter,
    cur: Option<Coset>,
}

impl<'a> Iterator for PreimageChain<'a> {
    type Item = Coset;

    fn next(&mut self) -> Option<Coset> {
        let c = self.cur?;
        self.cur = self.table.preim_next[c][self.generator as usize];
        Some(c)
    }
}
