//! Quotient semigroup builder.
//!
//! Wraps a finished congruence into a concrete [`BaseSemigroup`]. Elements
//! are congruence class indices ("coset elements"); equality is
//! coset-index equality, and the product of a class with
//! generator `g` is `right(c, g)`. The builder seeds one generator per
//! alphabet letter and lets [`BaseSemigroup::enumerate`]'s own BFS do the
//! rest — the quotient never needs to retrace words itself once built.

use crate::base_semigroup::BaseSemigroup;
use crate::common::{ClassCount, Letter, Tri, Word};
use crate::error::{CongruenceError, Result};
use crate::todd_coxeter::ToddCoxeter;

/// A finished [`ToddCoxeter`] congruence, exposed as a [`BaseSemigroup`]
/// whose elements are class indices.
pub struct Quotient {
    tc: ToddCoxeter,
    nr_classes: usize,
}

impl Quotient {
    /// `tc` must already have finished enumeration with a finite class
    /// count; returns `Undecidable` otherwise.
    pub fn new(mut tc: ToddCoxeter) -> Result<Self> {
        let nr_classes = match tc.nr_classes()? {
            ClassCount::Finite(n) => n,
            ClassCount::Infinite => return Err(CongruenceError::Undecidable),
        };
        Ok(Quotient { tc, nr_classes })
    }

    pub fn todd_coxeter(&self) -> &ToddCoxeter {
        &self.tc
    }
}

impl BaseSemigroup for Quotient {
    type Element = usize;

    fn nr_generators(&self) -> usize {
        self.tc.nr_generators()
    }

    fn size(&self) -> ClassCount {
        ClassCount::Finite(self.nr_classes)
    }

    fn is_finite(&self) -> Tri {
        Tri::Yes
    }

    fn evaluate(&self, word: &[Letter]) -> usize {
        self.tc
            .class_of_word_immut(word)
            .expect("word evaluates within a finished quotient congruence")
    }

    fn factorise(&self, element: &usize) -> Word {
        self.tc
            .word_of_class_immut(*element)
            .expect("every class of a finished quotient has a representative word")
    }

    fn multiply(&self, x: &usize, y: &usize) -> usize {
        let word = self.factorise(y);
        let mut c = *x;
        for &a in &word {
            c = self.tc.right_immut(c, a).expect("closed quotient action");
        }
        c
    }

    fn enumerate(&mut self, _should_stop: &mut dyn FnMut() -> bool) {
        // Already fully enumerated by the Todd-Coxeter run that produced
        // this quotient; nothing left to discover.
    }

    fn right_cayley_graph(&self) -> Option<Vec<Vec<usize>>> {
        let n = self.tc.nr_generators();
        Some(
            (0..self.nr_classes)
                .map(|c| (0..n).map(|a| self.tc.right_immut(c, a as Letter).unwrap_or(c)).collect())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Kind;
    use crate::todd_coxeter::{Sense, ToddCoxeter};

    fn w(s: &str) -> Word {
        s.bytes().map(|b| (b - b'a') as Letter).collect()
    }

    #[test]
    fn bicyclic_quotient_has_three_elements() {
        let mut tc = ToddCoxeter::new(Kind::Monoid, Sense::TwoSided, 3);
        tc.add_relation(&w("ab"), &w("c"));
        tc.add_generating_pair(&w("bbb"), &w("c")).unwrap();
        let quotient = Quotient::new(tc).unwrap();
        assert_eq!(quotient.size(), ClassCount::Finite(3));
    }

    #[test]
    fn multiply_matches_word_concatenation() {
        let mut tc = ToddCoxeter::new(Kind::Monoid, Sense::TwoSided, 3);
        tc.add_relation(&w("ab"), &w("c"));
        tc.add_generating_pair(&w("bbb"), &w("c")).unwrap();
        let quotient = Quotient::new(tc).unwrap();
        let x = quotient.evaluate(&w("b"));
        let y = quotient.evaluate(&w("b"));
        let xy = quotient.multiply(&x, &y);
        assert_eq!(xy, quotient.evaluate(&w("bb")));
    }
}
