//! Generating-pair closure over a finite base semigroup.
//!
//! A brute-force orbit/union-find procedure: enumerate the base
//! semigroup's elements, seed a [`UnionFind`] with the given pairs, then
//! saturate by repeatedly multiplying known-equal elements on the left and
//! right by every generator until a fixed point. Infinite base semigroups
//! make the orbit undecidable up front (see DESIGN.md: rejected with
//! `Undecidable`).

use std::collections::{HashMap, VecDeque};

use crate::base_semigroup::BaseSemigroup;
use crate::common::{ClassCount, Letter, Tri, Word};
use crate::error::{CongruenceError, Result};
use crate::runner::{CancelHandle, Runner, RunnerState};
use crate::union_find::UnionFind;

pub struct PairClosure<S: BaseSemigroup> {
    base: S,
    pairs: Vec<(Word, Word)>,
    started: bool,
    elements: Vec<S::Element>,
    index: HashMap<S::Element, usize>,
    uf: Option<UnionFind>,
    runner: RunnerState,
}

impl<S: BaseSemigroup> PairClosure<S> {
    pub fn new(base: S) -> Self {
        PairClosure {
            base,
            pairs: Vec::new(),
            started: false,
            elements: Vec::new(),
            index: HashMap::new(),
            uf: None,
            runner: RunnerState::new(),
        }
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn add_generating_pair(&mut self, u: &[Letter], v: &[Letter]) -> Result<()> {
        if self.started {
            return Err(CongruenceError::AlreadyStarted);
        }
        if u.is_empty() || v.is_empty() {
            return Err(CongruenceError::EmptyWord);
        }
        if u == v {
            return Ok(());
        }
        self.pairs.push((u.to_vec(), v.to_vec()));
        Ok(())
    }

    fn intern(&mut self, element: S::Element) -> usize {
        if let Some(&i) = self.index.get(&element) {
            return i;
        }
        let i = self.elements.len();
        self.index.insert(element.clone(), i);
        self.elements.push(element);
        i
    }

    /// Breadth-first closure of the base semigroup's generators under
    /// right multiplication, built only from the base semigroup's
    /// `evaluate`/`multiply` primitives.
    fn enumerate_elements(&mut self) -> Result<()> {
        if !self.elements.is_empty() {
            return Ok(());
        }
        if matches!(self.base.is_finite(), Tri::No | Tri::Unknown) {
            return Err(CongruenceError::Undecidable);
        }
        let n = self.base.nr_generators();
        let generators: Vec<S::Element> = (0..n).map(|g| self.base.evaluate(&[g as Letter])).collect();
        let mut frontier = VecDeque::new();
        for gen in &generators {
            let i = self.intern(gen.clone());
            frontier.push_back(i);
        }
        while let Some(i) = frontier.pop_front() {
            let x = self.elements[i].clone();
            for gen in &generators {
                let y = self.base.multiply(&x, gen);
                if !self.index.contains_key(&y) {
                    let j = self.intern(y);
                    frontier.push_back(j);
                }
            }
        }
        Ok(())
    }

    /// Closure loop: seed the union-find with the generating pairs, then
    /// repeatedly propagate each merge through left and right
    /// multiplication by every generator until nothing new unites.
    fn run_to_completion(&mut self, pred: &mut dyn FnMut() -> bool) -> Result<()> {
        if self.uf.is_some() {
            return Ok(());
        }
        self.started = true;
        self.enumerate_elements()?;

        let n = self.elements.len();
        let mut uf = UnionFind::with_capacity(n);

        let generators: Vec<S::Element> = (0..self.base.nr_generators())
            .map(|g| self.base.evaluate(&[g as Letter]))
            .collect();

        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        for (u, v) in self.pairs.clone() {
            let eu = self.base.evaluate(&u);
            let ev = self.base.evaluate(&v);
            if !self.index.contains_key(&eu) || !self.index.contains_key(&ev) {
                return Err(CongruenceError::Undecidable);
            }
            queue.push_back((self.index[&eu], self.index[&ev]));
        }

        while let Some((a, b)) = queue.pop_front() {
            if self.runner.should_stop() || pred() {
                return Err(CongruenceError::Undecidable);
            }
            if uf.same_class(a, b) {
                continue;
            }
            uf.unite(a, b);
            for gen in &generators {
                let ra = self.base.multiply(&self.elements[a], gen);
                let rb = self.base.multiply(&self.elements[b], gen);
                if let (Some(&ia), Some(&ib)) = (self.index.get(&ra), self.index.get(&rb)) {
                    queue.push_back((ia, ib));
                }
                let la = self.base.multiply(gen, &self.elements[a]);
                let lb = self.base.multiply(gen, &self.elements[b]);
                if let (Some(&ia), Some(&ib)) = (self.index.get(&la), self.index.get(&lb)) {
                    queue.push_back((ia, ib));
                }
            }
        }

        self.uf = Some(uf);
        Ok(())
    }

    fn ensure_run(&mut self) -> Result<()> {
        if self.uf.is_some() {
            return Ok(());
        }
        self.run_to_completion(&mut || false)?;
        self.runner.mark_finished(true);
        Ok(())
    }

    pub fn nr_classes(&mut self) -> Result<ClassCount> {
        self.ensure_run()?;
        Ok(ClassCount::Finite(self.uf.as_ref().unwrap().nr_blocks()))
    }

    pub fn contains(&mut self, u: &[Letter], v: &[Letter]) -> Result<bool> {
        self.ensure_run()?;
        let eu = self.base.evaluate(u);
        let ev = self.base.evaluate(v);
        let (Some(&iu), Some(&iv)) = (self.index.get(&eu), self.index.get(&ev)) else {
            return Err(CongruenceError::Undecidable);
        };
        Ok(self.uf.as_mut().unwrap().same_class(iu, iv))
    }

    pub fn currently_contains(&self, u: &[Letter], v: &[Letter]) -> Tri {
        let (Some(uf), true) = (self.uf.as_ref(), !self.elements.is_empty()) else {
            return Tri::Unknown;
        };
        let eu = self.base.evaluate(u);
        let ev = self.base.evaluate(v);
        match (self.index.get(&eu), self.index.get(&ev)) {
            (Some(&iu), Some(&iv)) => Tri::from_bool(uf.same_class_immut(iu, iv)),
            _ => Tri::Unknown,
        }
    }
}

impl<S: BaseSemigroup + Send> Runner for PairClosure<S> {
    fn run_until(&mut self, pred: &mut dyn FnMut() -> bool) {
        if self.uf.is_some() {
            self.runner.mark_finished(true);
            return;
        }
        if self.run_to_completion(pred).is_ok() {
            self.runner.mark_finished(true);
        }
    }

    fn set_deadline(&mut self, dur: std::time::Duration) {
        self.runner.set_deadline(dur);
    }

    fn kill(&self) {
        self.runner.kill();
    }

    fn finished(&self) -> bool {
        self.runner.finished()
    }

    fn success(&self) -> bool {
        self.runner.success()
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.runner.cancel_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformation::{Transformation, TransformationSemigroup};

    fn full_transformation_degree_2() -> TransformationSemigroup {
        // {0,1} -> {0,1}: a single swap generator gives a 2-element group;
        // add a collapsing generator to make the semigroup non-trivial.
        let swap = Transformation::new(vec![1, 0]);
        let collapse = Transformation::new(vec![0, 0]);
        let mut s = TransformationSemigroup::new(2, vec![swap, collapse]);
        s.enumerate(&mut || false);
        s
    }

    #[test]
    fn closure_of_trivial_pair_is_identity_partition() {
        let s = full_transformation_degree_2();
        let nr_elements = s.elements().len();
        let mut pc = PairClosure::new(s);
        assert_eq!(pc.nr_classes().unwrap(), ClassCount::Finite(nr_elements));
    }

    #[test]
    fn closure_unites_generated_orbit() {
        // Generator 0 (swap) and generator 1 (collapse) composed both ways
        // land on [0,0] and [1,1] respectively; force them equal and check
        // the class count strictly decreases.
        let before = {
            let mut probe = PairClosure::new(full_transformation_degree_2());
            probe.nr_classes().unwrap()
        };
        let mut pc = PairClosure::new(full_transformation_degree_2());
        pc.add_generating_pair(&[0], &[1]).unwrap();
        let after = pc.nr_classes().unwrap();
        assert!(matches!((before, after), (ClassCount::Finite(b), ClassCount::Finite(a)) if a <= b));
    }

    #[test]
    fn adding_pair_after_start_is_rejected() {
        let mut pc = PairClosure::new(full_transformation_degree_2());
        let _ = pc.nr_classes();
        assert_eq!(pc.add_generating_pair(&[0], &[1]), Err(CongruenceError::AlreadyStarted));
    }
}
