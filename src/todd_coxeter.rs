//! Todd–Coxeter coset enumeration.
//!
//! Builds the action of the semigroup on congruence classes as a coset
//! table, tracing every relation from every coset and resolving
//! coincidences through a union-find-style forwarding pointer
//! (`redirect: Vec<Option<Coset>>`, an intrusive-arena idiom applied here
//! to coset identification rather than a signed backward array). This
//! favours a plain growing-id scheme over a doubly-linked active/free
//! coset sublist: dead cosets simply stay in `order` marked `!alive`,
//! which preserves every coset-enumeration invariant without needing id
//! reuse (see DESIGN.md).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::base_semigroup::BaseSemigroup;
use crate::common::{reversed, ClassCount, Kind, Letter, Tri, Word};
use crate::coset_table::CosetTable;
use crate::error::{CongruenceError, Result};
use crate::presentation::Presentation;
use crate::reporting::ReportingContext;
use crate::runner::{CancelHandle, Runner, RunnerState};

pub use crate::coset_table::Coset;

/// Which side of the semigroup's action the congruence is taken with
/// respect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Left,
    Right,
    TwoSided,
}

/// How the coset table is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    UseRelations,
    UseCayleyGraph,
    None,
}

pub struct ToddCoxeter {
    kind: Kind,
    sense: Sense,
    nr_generators: usize,
    relations: Vec<(Word, Word)>,
    one_shot_pairs: Vec<(Word, Word)>,
    table: CosetTable,
    redirect: Vec<Option<Coset>>,
    alive: Vec<bool>,
    order: Vec<Coset>,
    next_to_process: usize,
    pack_limit: usize,
    pack_growth_percent: u32,
    nr_dead: usize,
    seeded_from_finite_base: bool,
    started: bool,
    runner: RunnerState,
    reporting: Option<ReportingContext>,
}

impl ToddCoxeter {
    pub fn new(kind: Kind, sense: Sense, nr_generators: usize) -> Self {
        ToddCoxeter {
            kind,
            sense,
            nr_generators,
            relations: Vec::new(),
            one_shot_pairs: Vec::new(),
            table: CosetTable::new(nr_generators),
            redirect: Vec::new(),
            alive: Vec::new(),
            order: Vec::new(),
            next_to_process: 0,
            pack_limit: 120_000,
            pack_growth_percent: 10,
            nr_dead: 0,
            seeded_from_finite_base: false,
            started: false,
            runner: RunnerState::new(),
            reporting: None,
        }
    }

    pub fn from_presentation(p: &Presentation, sense: Sense) -> Result<Self> {
        let nr_generators = p.nr_generators()?;
        let mut tc = ToddCoxeter::new(p.kind(), sense, nr_generators);
        for rule in p.rules() {
            tc.add_relation(&rule.lhs, &rule.rhs);
        }
        Ok(tc)
    }

    /// Seeds the table from an already-enumerated base semigroup: one coset
    /// per element, rows taken directly from its right Cayley graph.
    pub fn from_base_semigroup<S: BaseSemigroup>(base: &S, sense: Sense) -> Result<Self> {
        let graph = base
            .right_cayley_graph()
            .ok_or_else(|| CongruenceError::InvalidTable("base semigroup has no Cayley graph".into()))?;
        let nr_generators = base.nr_generators();
        let mut tc = ToddCoxeter::new(Kind::Semigroup, sense, nr_generators);
        tc.seeded_from_finite_base = matches!(base.is_finite(), Tri::Yes);
        for _ in &graph {
            tc.new_coset();
        }
        for (c, row) in graph.iter().enumerate() {
            for (g, &d) in row.iter().enumerate() {
                if tc.table.image(c, g as Letter).is_none() {
                    tc.table.set_image(c, g as Letter, d);
                }
            }
        }
        Ok(tc)
    }

    /// Manual prefill. `rows[c][a]` is the coset reached from `c` by
    /// generator `a`, or `None`.
    pub fn prefill(&mut self, rows: Vec<Vec<Option<Coset>>>) -> Result<()> {
        let n = rows.len();
        for row in &rows {
            if row.len() != self.nr_generators {
                return Err(CongruenceError::InvalidTable("row width does not match generator count".into()));
            }
            for &cell in row {
                if let Some(d) = cell {
                    if d >= n {
                        return Err(CongruenceError::InvalidTable(format!("image {d} out of range")));
                    }
                }
            }
        }
        for _ in 0..n {
            self.new_coset();
        }
        for (c, row) in rows.into_iter().enumerate() {
            for (a, cell) in row.into_iter().enumerate() {
                if let Some(d) = cell {
                    if self.table.image(c, a as Letter).is_none() {
                        self.table.set_image(c, a as Letter, d);
                    }
                }
            }
        }
        Ok(())
    }

    fn maybe_reverse(&self, w: &[Letter]) -> Word {
        match self.sense {
            Sense::Left => reversed(w),
            _ => w.to_vec(),
        }
    }

    pub fn add_relation(&mut self, u: &[Letter], v: &[Letter]) {
        let u = self.maybe_reverse(u);
        let v = self.maybe_reverse(v);
        self.relations.push((u, v));
    }

    /// Adds a generating pair. Two-sided congruences fold the
    /// pair into the relation list (tracing it from every coset, which is
    /// exactly the two-sided congruence generated by relations union
    /// pairs); one-sided congruences trace it once from coset 0 only.
    pub fn add_generating_pair(&mut self, u: &[Letter], v: &[Letter]) -> Result<()> {
        if self.started {
            return Err(CongruenceError::AlreadyStarted);
        }
        if u == v {
            return Ok(());
        }
        let u = self.maybe_reverse(u);
        let v = self.maybe_reverse(v);
        match self.sense {
            Sense::TwoSided => self.relations.push((u, v)),
            Sense::Left | Sense::Right => self.one_shot_pairs.push((u, v)),
        }
        Ok(())
    }

    /// Cheap sufficient condition for infiniteness: true whenever some
    /// generator never appears in any relation, since it then generates a
    /// free factor.
    pub fn is_obviously_infinite(&self) -> bool {
        if self.seeded_from_finite_base {
            return false;
        }
        if self.nr_generators == 0 || self.nr_generators <= self.relations.len() {
            return false;
        }
        let mut seen = vec![false; self.nr_generators];
        for (u, v) in self.relations.iter().chain(self.one_shot_pairs.iter()) {
            for &l in u.iter().chain(v.iter()) {
                seen[l as usize] = true;
            }
        }
        seen.iter().any(|&s| !s)
    }

    fn new_coset(&mut self) -> Coset {
        let c = self.table.add_row();
        self.redirect.push(None);
        self.alive.push(true);
        self.order.push(c);
        c
    }

    fn find(&mut self, c: Coset) -> Coset {
        let mut root = c;
        while let Some(r) = self.redirect[root] {
            root = r;
        }
        let mut cur = c;
        while let Some(r) = self.redirect[cur] {
            if r == root {
                break;
            }
            self.redirect[cur] = Some(root);
            cur = r;
        }
        root
    }

    fn find_immut(&self, c: Coset) -> Coset {
        let mut cur = c;
        while let Some(r) = self.redirect[cur] {
            cur = r;
        }
        cur
    }

    /// Merges two cosets discovered to be equal, propagating the merge
    /// through every generator's image/preimage links and queuing any
    /// further coincidences it forces.
    fn identify_cosets(&mut self, a: Coset, b: Coset) {
        let mut stack = vec![(a, b)];
        while let Some((x, y)) = stack.pop() {
            let mut lo = self.find(x);
            let mut hi = self.find(y);
            if lo == hi {
                continue;
            }
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            self.redirect[hi] = Some(lo);
            self.alive[hi] = false;
            self.nr_dead += 1;
            for g in 0..self.nr_generators {
                let a = g as Letter;
                let preimages: Vec<Coset> = self.table.preimage_chain(hi, a).collect();
                for p in preimages {
                    self.table.clear_image(p, a);
                    if self.table.image(p, a).is_none() {
                        self.table.set_image(p, a, lo);
                    }
                }
                if let Some(img_hi) = self.table.image(hi, a) {
                    self.table.clear_image(hi, a);
                    match self.table.image(lo, a) {
                        Some(img_lo) => stack.push((img_lo, img_hi)),
                        None => self.table.set_image(lo, a, img_hi),
                    }
                }
            }
        }
    }

    fn trace_word(&mut self, start: Coset, word: &[Letter], create: bool) -> Option<Coset> {
        let mut c = self.find(start);
        for &a in word {
            c = match self.table.image(c, a) {
                Some(d) => self.find(d),
                None => {
                    if !create {
                        return None;
                    }
                    let d = self.new_coset();
                    self.table.set_image(c, a, d);
                    d
                }
            };
        }
        Some(c)
    }

    /// Traces a relation's two sides from `c0`, identifying the cosets they
    /// reach. `create = false` is the non-adding packing pass.
    fn trace_relation(&mut self, c0: Coset, u: &[Letter], v: &[Letter], create: bool) {
        if u.is_empty() && v.is_empty() {
            return;
        }
        if u.is_empty() || v.is_empty() {
            let (empty_is_u, word) = if u.is_empty() { (true, v) } else { (false, u) };
            let _ = empty_is_u;
            let c0r = self.find(c0);
            if let Some(end) = self.trace_word(c0, word, create) {
                if self.find(end) != c0r {
                    self.identify_cosets(end, c0r);
                }
            }
            return;
        }
        let Some(lhs_c) = self.trace_word(c0, &u[..u.len() - 1], create) else {
            return;
        };
        let Some(rhs_c) = self.trace_word(c0, &v[..v.len() - 1], create) else {
            return;
        };
        let a = u[u.len() - 1];
        let b = v[v.len() - 1];
        match (self.table.image(lhs_c, a), self.table.image(rhs_c, b)) {
            (None, None) => {
                if create {
                    let d = self.new_coset();
                    self.table.set_image(lhs_c, a, d);
                    self.table.set_image(rhs_c, b, d);
                }
            }
            (Some(d), None) => self.table.set_image(rhs_c, b, d),
            (None, Some(d)) => self.table.set_image(lhs_c, a, d),
            (Some(d1), Some(d2)) => {
                if self.find(d1) != self.find(d2) {
                    self.identify_cosets(d1, d2);
                }
            }
        }
    }

    fn pack(&mut self, should_stop: &mut dyn FnMut() -> bool) {
        for i in 0..self.order.len() {
            if should_stop() {
                return;
            }
            let c = self.order[i];
            if !self.alive[c] {
                continue;
            }
            for r in 0..self.relations.len() {
                let (u, v) = self.relations[r].clone();
                self.trace_relation(c, &u, &v, false);
            }
        }
        self.pack_limit += (self.pack_limit * self.pack_growth_percent as usize / 100).max(1);
    }

    fn live_cosets_in_order(&self) -> Vec<Coset> {
        self.order.iter().copied().filter(|&c| self.alive[c]).collect()
    }

    fn class_index_base(&self) -> usize {
        if self.kind == Kind::Semigroup {
            1
        } else {
            0
        }
    }

    fn ensure_run(&mut self) -> Result<()> {
        if !self.runner.finished() {
            Runner::run(self);
        }
        if !self.runner.success() {
            return Err(CongruenceError::Undecidable);
        }
        Ok(())
    }

    /// The number of congruence classes, running enumeration to completion
    /// first if it hasn't already finished.
    pub fn nr_classes(&mut self) -> Result<ClassCount> {
        if self.nr_generators == 0 {
            return Ok(ClassCount::Finite(0));
        }
        if self.is_obviously_infinite() {
            self.started = true;
            return Ok(ClassCount::Infinite);
        }
        self.ensure_run()?;
        let live = self.live_cosets_in_order().len();
        Ok(ClassCount::Finite(live.saturating_sub(self.class_index_base())))
    }

    /// The congruence class index of a word, tracing it from coset 0.
    pub fn word_to_class_index(&mut self, w: &[Letter]) -> Result<usize> {
        self.ensure_run()?;
        let mut c = self.find_immut(0);
        for &a in w {
            match self.table.image(c, a) {
                Some(d) => c = self.find_immut(d),
                None => return Err(CongruenceError::Undecidable),
            }
        }
        let live = self.live_cosets_in_order();
        let pos = live
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| CongruenceError::InvalidTable("word traces to a dead coset".into()))?;
        pos.checked_sub(self.class_index_base())
            .ok_or_else(|| CongruenceError::InvalidTable("word maps to the auxiliary source coset".into()))
    }

    /// A word naming the class at `index`: the shortest path in the Cayley
    /// graph from coset 0 to the coset at `index`.
    pub fn class_index_to_word(&mut self, index: usize) -> Result<Word> {
        self.ensure_run()?;
        let live = self.live_cosets_in_order();
        let target = *live
            .get(index + self.class_index_base())
            .ok_or_else(|| CongruenceError::InvalidTable("class index out of range".into()))?;

        let root = self.find_immut(0);
        let mut dist: HashMap<Coset, Word> = HashMap::new();
        dist.insert(root, Vec::new());
        let mut queue = VecDeque::new();
        queue.push_back(root);
        while let Some(c) = queue.pop_front() {
            if c == target {
                return Ok(dist[&c].clone());
            }
            for a in 0..self.nr_generators {
                if let Some(d) = self.table.image(c, a as Letter) {
                    let d = self.find_immut(d);
                    if !dist.contains_key(&d) {
                        let mut w = dist[&c].clone();
                        w.push(a as Letter);
                        dist.insert(d, w);
                        queue.push_back(d);
                    }
                }
            }
        }
        Err(CongruenceError::InvalidTable("class index unreachable from the source coset".into()))
    }

    /// Immutable counterparts of [`Self::word_to_class_index`],
    /// [`Self::class_index_to_word`] and [`Self::right`] for callers that
    /// already know enumeration finished — [`crate::quotient::Quotient`]
    /// wraps a finished congruence and can only borrow it immutably
    /// through [`BaseSemigroup`](crate::base_semigroup::BaseSemigroup).
    pub fn class_of_word_immut(&self, w: &[Letter]) -> Option<usize> {
        let c = self.trace_immut(0, w)?;
        let live = self.live_cosets_in_order();
        let pos = live.iter().position(|&x| x == c)?;
        pos.checked_sub(self.class_index_base())
    }

    pub fn word_of_class_immut(&self, index: usize) -> Option<Word> {
        let live = self.live_cosets_in_order();
        let target = *live.get(index + self.class_index_base())?;
        let root = self.find_immut(0);
        let mut dist: HashMap<Coset, Word> = HashMap::new();
        dist.insert(root, Vec::new());
        let mut queue = VecDeque::new();
        queue.push_back(root);
        while let Some(c) = queue.pop_front() {
            if c == target {
                return Some(dist[&c].clone());
            }
            for a in 0..self.nr_generators {
                if let Some(d) = self.table.image(c, a as Letter) {
                    let d = self.find_immut(d);
                    if !dist.contains_key(&d) {
                        let mut w = dist[&c].clone();
                        w.push(a as Letter);
                        dist.insert(d, w);
                        queue.push_back(d);
                    }
                }
            }
        }
        None
    }

    pub fn right_immut(&self, class_index: usize, a: Letter) -> Option<usize> {
        let live = self.live_cosets_in_order();
        let c = *live.get(class_index + self.class_index_base())?;
        let d = self.find_immut(self.table.image(c, a)?);
        let pos = live.iter().position(|&x| x == d)?;
        pos.checked_sub(self.class_index_base())
    }

    pub fn nr_classes_immut(&self) -> usize {
        self.live_cosets_in_order().len().saturating_sub(self.class_index_base())
    }

    /// Never runs; `Tri::Unknown` unless both words already trace to
    /// defined cosets.
    pub fn currently_contains(&self, u: &[Letter], v: &[Letter]) -> Tri {
        match (self.trace_immut(0, u), self.trace_immut(0, v)) {
            (Some(a), Some(b)) => Tri::from_bool(a == b),
            _ => Tri::Unknown,
        }
    }

    fn trace_immut(&self, start: Coset, w: &[Letter]) -> Option<Coset> {
        let mut c = self.find_immut(start);
        for &a in w {
            c = self.find_immut(self.table.image(c, a)?);
        }
        Some(c)
    }

    pub fn contains(&mut self, u: &[Letter], v: &[Letter]) -> Result<bool> {
        Ok(self.word_to_class_index(u)? == self.word_to_class_index(v)?)
    }

    pub fn right(&mut self, c: Coset, a: Letter) -> Result<Coset> {
        self.ensure_run()?;
        let c = self.find(c);
        self.table.image(c, a).ok_or(CongruenceError::Undecidable)
    }

    pub fn set_reporting(&mut self, reporting: ReportingContext) {
        self.reporting = Some(reporting);
    }

    pub fn set_pack_limit(&mut self, limit: usize) {
        self.pack_limit = limit;
    }

    pub fn nr_generators(&self) -> usize {
        self.nr_generators
    }
}

impl Runner for ToddCoxeter {
    fn run_until(&mut self, pred: &mut dyn FnMut() -> bool) {
        let reporting = self.reporting.clone();
        let _enter = reporting.as_ref().map(|r| r.enter());
        if self.is_obviously_infinite() {
            // Applied here too, not just in `nr_classes`, so a race never
            // spins this engine forever tracing an unboundedly growing coset
            // table; `finished` without `success` just leaves the race to
            // whichever other engine can actually decide it.
            self.runner.mark_finished(false);
            return;
        }
        if self.order.is_empty() {
            self.started = true;
            let c0 = self.new_coset();
            debug_assert_eq!(c0, 0);
            for i in 0..self.one_shot_pairs.len() {
                let (u, v) = self.one_shot_pairs[i].clone();
                self.trace_relation(0, &u, &v, true);
            }
        }
        loop {
            if self.runner.should_stop() || pred() {
                return;
            }
            if self.next_to_process >= self.order.len() {
                self.runner.mark_finished(true);
                return;
            }
            let c = self.order[self.next_to_process];
            self.next_to_process += 1;
            if !self.alive[c] {
                continue;
            }
            for i in 0..self.relations.len() {
                if self.runner.should_stop() || pred() {
                    return;
                }
                let (u, v) = self.relations[i].clone();
                self.trace_relation(c, &u, &v, true);
            }
            if self.order.len().saturating_sub(self.nr_dead) > self.pack_limit {
                let runner = std::mem::take(&mut self.runner);
                let mut should_stop = || runner.should_stop() || pred();
                self.pack(&mut should_stop);
                self.runner = runner;
            }
        }
    }

    fn set_deadline(&mut self, dur: Duration) {
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

    fn w(s: &str) -> Word {
        s.bytes().map(|b| (b - b'a') as Letter).collect()
    }

    #[test]
    fn s1_two_sided_congruence_has_five_classes() {
        // Alphabet {a, b}, rules aaa=a, a=bb, two-sided.
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::TwoSided, 2);
        tc.add_relation(&w("aaa"), &w("a"));
        tc.add_relation(&w("a"), &w("bb"));
        assert_eq!(tc.nr_classes().unwrap(), ClassCount::Finite(5));
        assert!(tc.contains(&w("aab"), &w("aaaab")).unwrap());
    }

    #[test]
    fn s2_left_congruence_has_five_classes() {
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::Left, 2);
        tc.add_relation(&w("aaa"), &w("a"));
        tc.add_relation(&w("a"), &w("bb"));
        assert_eq!(tc.nr_classes().unwrap(), ClassCount::Finite(5));
    }

    #[test]
    fn s4_bicyclic_monoid_quotient_has_three_classes() {
        // Alphabet {a, b, e}, identity e, rule ab=e, two-sided
        // congruence generated by bbb=e.
        let mut tc = ToddCoxeter::new(Kind::Monoid, Sense::TwoSided, 3);
        tc.add_relation(&w("ab"), &w("c"));
        tc.add_generating_pair(&w("bbb"), &w("c")).unwrap();
        assert_eq!(tc.nr_classes().unwrap(), ClassCount::Finite(3));
    }

    #[test]
    fn obvious_infiniteness_short_circuits() {
        // Three letters, one relation not mentioning 'c': obviously infinite.
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::TwoSided, 3);
        tc.add_relation(&w("aa"), &w("a"));
        assert!(tc.is_obviously_infinite());
        assert_eq!(tc.nr_classes().unwrap(), ClassCount::Infinite);
        assert!(!tc.runner.finished()); // never actually ran
    }

    #[test]
    fn empty_alphabet_has_zero_classes() {
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::TwoSided, 0);
        assert_eq!(tc.nr_classes().unwrap(), ClassCount::Finite(0));
    }

    #[test]
    fn adding_pair_after_start_is_rejected() {
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::TwoSided, 2);
        tc.add_relation(&w("aa"), &w("a"));
        let _ = tc.nr_classes();
        assert_eq!(
            tc.add_generating_pair(&w("a"), &w("b")),
            Err(CongruenceError::AlreadyStarted)
        );
    }

    #[test]
    fn trivial_pair_is_a_no_op() {
        let mut tc = ToddCoxeter::new(Kind::Semigroup, Sense::TwoSided, 1);
        assert!(tc.add_generating_pair(&w("a"), &w("a")).is_ok());
        assert!(tc.one_shot_pairs.is_empty() && tc.relations.is_empty());
    }
}
