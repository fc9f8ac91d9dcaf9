//! Knuth–Bendix completion engine.
//!
//! Drives [`rewrite_rule::RuleStore`] through the work-stack variant of
//! KBS-2: newly derived rules are rewritten under the current active set,
//! reordered, and activated; activating a rule in turn may deactivate any
//! active rule whose left-hand side contains the new rule's left-hand side
//! as a substring, requeuing it. Once the pending stack empties, critical
//! pairs ("overlaps") between all pairs of active rules are generated via a
//! pair of cursors that only ever advance forward through the active list,
//! so newly appended rules are visited exactly once each without revisiting
//! settled pairs.

use std::time::Duration;

use crate::common::{ClassCount, Kind, Letter, Word};
use crate::error::{CongruenceError, Result};
use crate::gilman;
use crate::ordering::{ReductionOrdering, ShortLex};
use crate::presentation::Presentation;
use crate::reporting::ReportingContext;
use crate::rewrite_rule::{Cursor, RuleStore};
use crate::runner::{CancelHandle, Runner, RunnerState};

/// Which of the three overlap measures bounds critical-pair generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    Abc,
    AbBc,
    MaxAbBc,
}

impl OverlapPolicy {
    fn measure(self, a_len: usize, b_len: usize, c_len: usize) -> usize {
        match self {
            OverlapPolicy::Abc => a_len + b_len + c_len,
            OverlapPolicy::AbBc => (a_len + b_len) + (b_len + c_len),
            OverlapPolicy::MaxAbBc => (a_len + b_len).max(b_len + c_len),
        }
    }
}

/// Tunable completion parameters. Every field
/// has a dedicated setter via direct mutation (the struct is plain data);
/// changing a field other than through [`KnuthBendix::add_rule`] does not
/// reset cached confluence.
#[derive(Debug, Clone)]
pub struct KnuthBendixOptions {
    pub max_pending_rules: usize,
    pub check_confluence_interval: usize,
    pub max_overlap: Option<usize>,
    pub max_rules: Option<usize>,
    pub overlap_policy: OverlapPolicy,
}

impl Default for KnuthBendixOptions {
    fn default() -> Self {
        KnuthBendixOptions {
            max_pending_rules: 128,
            check_confluence_interval: 4096,
            max_overlap: None,
            max_rules: None,
            overlap_policy: OverlapPolicy::Abc,
        }
    }
}

impl From<&crate::config::KnuthBendixDefaults> for KnuthBendixOptions {
    fn from(d: &crate::config::KnuthBendixDefaults) -> Self {
        KnuthBendixOptions {
            max_pending_rules: d.max_pending_rules,
            check_confluence_interval: d.check_confluence_interval,
            max_overlap: d.max_overlap,
            max_rules: d.max_rules,
            overlap_policy: OverlapPolicy::Abc,
        }
    }
}

/// Rewrites `w` to normal form under `rules`' active set: left-to-right,
/// repeatedly splicing in the right-hand side of any active rule whose
/// left-hand side is a suffix of the word built so far. Terminates because
/// every splice strictly decreases the word under the active reduction
/// ordering (every active rule satisfies `lhs > rhs`).
fn rewrite_word(rules: &RuleStore, w: &[Letter]) -> Word {
    let mut result: Word = Vec::with_capacity(w.len());
    for &letter in w {
        result.push(letter);
        while let Some((suffix_len, idx)) = rules.find_suffix_match(&result) {
            let rhs = rules.rule_at(idx).rhs.clone();
            let new_len = result.len() - suffix_len;
            result.truncate(new_len);
            result.extend_from_slice(&rhs);
        }
    }
    result
}

/// Confluence test: for every ordered pair of active rules
/// and every non-empty suffix of the first lhs that is a prefix of the
/// second, both resolutions of the critical pair must rewrite identically.
/// Returns `None` if `should_stop` fires before the test completes.
fn check_confluence(rules: &RuleStore, should_stop: &mut dyn FnMut() -> bool) -> Option<bool> {
    let active: Vec<(Word, Word)> = rules
        .active_rules()
        .map(|r| (r.lhs.clone(), r.rhs.clone()))
        .collect();
    for (lhs1, rhs1) in &active {
        for (lhs2, rhs2) in &active {
            if should_stop() {
                return None;
            }
            let max_b = lhs1.len().min(lhs2.len());
            for blen in 1..=max_b {
                if lhs1[lhs1.len() - blen..] != lhs2[..blen] {
                    continue;
                }
                let a_len = lhs1.len() - blen;
                let mut w1 = lhs1[..a_len].to_vec();
                w1.extend_from_slice(rhs2);
                let mut w2 = rhs1.clone();
                w2.extend_from_slice(&lhs2[blen..]);
                if rewrite_word(rules, &w1) != rewrite_word(rules, &w2) {
                    return Some(false);
                }
            }
        }
    }
    Some(true)
}

pub struct KnuthBendix {
    kind: Kind,
    nr_letters: usize,
    ordering: Box<dyn ReductionOrdering + Send>,
    rules: RuleStore,
    options: KnuthBendixOptions,
    runner: RunnerState,
    reporting: Option<ReportingContext>,
    confluent: Option<bool>,
    overlaps_since_check: usize,
    total_rules_ever: u64,
    cursor1: Cursor,
    cursor2: Cursor,
    row_done: bool,
}

impl KnuthBendix {
    pub fn new(kind: Kind, nr_letters: usize) -> Self {
        let rules = RuleStore::new();
        let cursor1 = rules.cursor_begin();
        let cursor2 = rules.cursor_begin();
        KnuthBendix {
            kind,
            nr_letters,
            ordering: Box::new(ShortLex),
            rules,
            options: KnuthBendixOptions::default(),
            runner: RunnerState::new(),
            reporting: None,
            confluent: None,
            overlaps_since_check: 0,
            total_rules_ever: 0,
            cursor1,
            cursor2,
            row_done: false,
        }
    }

    /// Seeds an engine from a presentation's alphabet size and rules.
    pub fn from_presentation(p: &Presentation) -> Result<Self> {
        let nr_letters = p.nr_generators()?;
        let mut kb = KnuthBendix::new(p.kind(), nr_letters);
        for rule in p.rules() {
            kb.add_rule(&rule.lhs, &rule.rhs)?;
        }
        Ok(kb)
    }

    pub fn set_ordering(&mut self, ordering: impl ReductionOrdering + Send + 'static) {
        self.ordering = Box::new(ordering);
    }

    pub fn options(&self) -> &KnuthBendixOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut KnuthBendixOptions {
        &mut self.options
    }

    pub fn set_options(&mut self, options: KnuthBendixOptions) {
        self.options = options;
    }

    pub fn set_reporting(&mut self, reporting: ReportingContext) {
        self.reporting = Some(reporting);
    }

    fn validate_word(&self, w: &[Letter]) -> Result<()> {
        for &l in w {
            if l as usize >= self.nr_letters {
                return Err(CongruenceError::UnknownLetter('\u{FFFD}'));
            }
        }
        if w.is_empty() && self.kind == Kind::Semigroup {
            return Err(CongruenceError::EmptyWord);
        }
        Ok(())
    }

    /// Stages a rule for completion. Resets cached
    /// confluence and restarts the overlap cursors from the active list's
    /// head, since the new rule may interact with any existing rule.
    pub fn add_rule(&mut self, u: &[Letter], v: &[Letter]) -> Result<()> {
        self.validate_word(u)?;
        self.validate_word(v)?;
        let mut rule = self.rules.new_rule();
        rule.lhs = u.to_vec();
        rule.rhs = v.to_vec();
        self.rules.push_pending(rule);
        self.confluent = None;
        self.runner.reset();
        self.cursor1 = self.rules.cursor_begin();
        self.cursor2 = self.rules.cursor_begin();
        self.row_done = false;
        Ok(())
    }

    pub fn rewrite(&self, w: &[Letter]) -> Word {
        rewrite_word(&self.rules, w)
    }

    pub fn equal_to(&self, u: &[Letter], v: &[Letter]) -> bool {
        self.rewrite(u) == self.rewrite(v)
    }

    /// Tests confluence of the current active set, caching the result until
    /// the next `add_rule`.
    pub fn confluent(&mut self) -> bool {
        if let Some(c) = self.confluent {
            return c;
        }
        let c = check_confluence(&self.rules, &mut || false).unwrap_or(false);
        self.confluent = Some(c);
        c
    }

    /// The last-computed confluence verdict without forcing a new check.
    pub fn confluent_cached(&self) -> Option<bool> {
        self.confluent
    }

    /// Counts irreducible words via the Gilman graph (finite-model
    /// extraction); meaningful once `confluent()` holds.
    pub fn size(&self) -> ClassCount {
        let max_lhs_len = self.rules.active_rules().map(|r| r.lhs.len()).max().unwrap_or(0);
        let allow_empty = self.kind == Kind::Monoid;
        let rules = &self.rules;
        gilman::count_irreducible_words(
            self.nr_letters,
            max_lhs_len,
            allow_empty,
            |w| rewrite_word(rules, w),
            || false,
        )
        .unwrap_or(ClassCount::Infinite)
    }

    pub fn nr_active_rules(&self) -> usize {
        self.rules.nr_active_rules()
    }

    pub fn nr_inactive_rules(&self) -> usize {
        self.rules.nr_inactive_rules()
    }

    pub fn total_rules_ever(&self) -> u64 {
        self.total_rules_ever
    }

    /// Drains pending rules, rewriting and reordering
    /// each, deactivating and requeuing any active rule it subsumes.
    fn drain_pending(&mut self) {
        while let Some(mut rule) = self.rules.pop_pending() {
            rule.lhs = rewrite_word(&self.rules, &rule.lhs);
            rule.rhs = rewrite_word(&self.rules, &rule.rhs);
            let (lhs, rhs) = self.ordering.reorder(rule.lhs, rule.rhs);
            rule.lhs = lhs;
            rule.rhs = rhs;
            if rule.is_trivial() {
                self.rules.recycle(rule);
                continue;
            }
            let needle = rule.lhs.clone();
            self.scan_and_deactivate_containing(&needle);
            self.rules.add_active(rule);
            self.total_rules_ever += 1;
            if let Some(max) = self.options.max_rules {
                if self.rules.nr_active_rules() >= max {
                    return;
                }
            }
        }
    }

    /// Deactivates every active rule whose lhs contains `needle` as a
    /// substring, pushing each back onto `pending` with its rhs already
    /// rewritten. Keeps `cursor1`/`cursor2` valid across the deletions.
    fn scan_and_deactivate_containing(&mut self, needle: &[Letter]) {
        let mut cur = self.rules.cursor_begin();
        while let Some(idx) = self.rules.cursor_idx(&cur) {
            if crate::common::contains_subword(&self.rules.rule_at(idx).lhs, needle) {
                let (next, mut rule) = self.rules.deactivate(idx);
                self.rules.fix_cursor(&mut self.cursor1, idx, next);
                self.rules.fix_cursor(&mut self.cursor2, idx, next);
                rule.rhs = rewrite_word(&self.rules, &rule.rhs);
                self.rules.push_pending(rule);
                cur = Cursor(next);
            } else {
                self.rules.cursor_advance(&mut cur);
            }
        }
    }

    /// Generates the critical pair from an overlap of two active rules: for
    /// every proper suffix `B` of `u`'s lhs that
    /// is a prefix of `v`'s lhs, push the critical-pair rule `u.lhs[..|u|-|B|]
    /// . v.rhs -> u.rhs . v.lhs[|B|..]` onto pending, subject to the overlap
    /// measure bound.
    fn generate_overlap(&mut self, idx_u: usize, idx_v: usize) {
        let (u_lhs, u_rhs) = {
            let u = self.rules.rule_at(idx_u);
            (u.lhs.clone(), u.rhs.clone())
        };
        let (v_lhs, v_rhs) = {
            let v = self.rules.rule_at(idx_v);
            (v.lhs.clone(), v.rhs.clone())
        };
        // B must be a proper suffix of u.lhs (blen < u_lhs.len()) and a
        // prefix of v.lhs (blen <= v_lhs.len()).
        let max_blen = u_lhs.len().saturating_sub(1).min(v_lhs.len());
        for blen in 1..=max_blen {
            let b_suffix_of_u = &u_lhs[u_lhs.len() - blen..];
            if v_lhs[..blen] != *b_suffix_of_u {
                continue;
            }
            let a_len = u_lhs.len() - blen;
            let c_len = v_lhs.len() - blen;
            let measure = self.options.overlap_policy.measure(a_len, blen, c_len);
            if let Some(max) = self.options.max_overlap {
                if measure > max {
                    continue;
                }
            }
            let mut new_lhs = u_lhs[..a_len].to_vec();
            new_lhs.extend_from_slice(&v_rhs);
            let mut new_rhs = u_rhs.clone();
            new_rhs.extend_from_slice(&v_lhs[blen..]);
            let mut rule = self.rules.new_rule();
            rule.lhs = new_lhs;
            rule.rhs = new_rhs;
            self.rules.push_pending(rule);
            self.overlaps_since_check += 1;
        }
    }
}

impl Runner for KnuthBendix {
    fn run_until(&mut self, pred: &mut dyn FnMut() -> bool) {
        let reporting = self.reporting.clone();
        let _enter = reporting.as_ref().map(|r| r.enter());
        self.drain_pending();
        loop {
            if self.runner.should_stop() || pred() {
                return;
            }
            if self.rules.nr_active_rules() == 0 && self.rules.pending_is_empty() {
                self.confluent = Some(true);
                self.runner.mark_finished(true);
                return;
            }
            if self.cursor1.is_end() {
                match check_confluence(&self.rules, &mut || self.runner.should_stop() || pred()) {
                    None => return,
                    Some(true) => {
                        self.confluent = Some(true);
                        self.runner.mark_finished(true);
                        return;
                    }
                    Some(false) => {
                        self.confluent = Some(false);
                        self.cursor1 = self.rules.cursor_begin();
                        self.cursor2 = self.rules.cursor_begin();
                        self.row_done = false;
                        continue;
                    }
                }
            }
            let idx1 = self.rules.cursor_idx(&self.cursor1).expect("checked not end");
            if self.row_done || self.cursor2.is_end() {
                self.row_done = false;
                self.drain_pending();
                if self.runner.should_stop() || pred() {
                    return;
                }
                if let Some(max) = self.options.max_rules {
                    if self.rules.nr_active_rules() >= max {
                        self.runner.mark_finished(false);
                        return;
                    }
                }
                if self.rules.cursor_idx(&self.cursor1) == Some(idx1) {
                    self.rules.cursor_advance(&mut self.cursor1);
                }
                self.cursor2 = self.rules.cursor_begin();
                continue;
            }
            let idx2 = self.rules.cursor_idx(&self.cursor2).expect("checked not end");
            self.generate_overlap(idx1, idx2);
            if idx1 != idx2 {
                self.generate_overlap(idx2, idx1);
            }
            if idx2 == idx1 {
                self.row_done = true;
            } else {
                self.rules.cursor_advance(&mut self.cursor2);
            }
            if self.overlaps_since_check >= self.options.check_confluence_interval {
                self.overlaps_since_check = 0;
                self.drain_pending();
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
    fn completes_idempotent_generator() {
        // a^2 = a: confluent immediately, one rule, two irreducible words.
        let mut kb = KnuthBendix::new(Kind::Monoid, 1);
        kb.add_rule(&w("aa"), &w("a")).unwrap();
        kb.run();
        assert!(kb.finished());
        assert!(kb.confluent());
        assert_eq!(kb.size(), ClassCount::Finite(2));
    }

    #[test]
    fn rewrite_reaches_normal_form() {
        let mut kb = KnuthBendix::new(Kind::Semigroup, 1);
        kb.add_rule(&w("aaa"), &w("a")).unwrap();
        kb.run();
        assert!(kb.confluent());
        assert_eq!(kb.rewrite(&w("aaaaaa")), kb.rewrite(&w("aa")));
    }

    #[test]
    fn equal_to_respects_defining_relation() {
        let mut kb = KnuthBendix::new(Kind::Semigroup, 2);
        kb.add_rule(&w("ab"), &w("ba")).unwrap();
        kb.run();
        assert!(kb.confluent());
        assert!(kb.equal_to(&w("ab"), &w("ba")));
    }

    #[test]
    fn add_rule_invalidates_cached_confluence() {
        let mut kb = KnuthBendix::new(Kind::Monoid, 1);
        kb.add_rule(&w("aa"), &w("a")).unwrap();
        kb.run();
        assert!(kb.confluent());
        kb.add_rule(&w("a"), &w("")).unwrap();
        assert_eq!(kb.confluent, None);
        kb.run();
        assert!(kb.confluent());
        assert_eq!(kb.size(), ClassCount::Finite(1));
    }

    #[test]
    fn unknown_letter_rejected() {
        let mut kb = KnuthBendix::new(Kind::Semigroup, 1);
        assert!(kb.add_rule(&[5], &w("a")).is_err());
    }

    proptest::proptest! {
        /// Every active rule's lhs outranks its rhs
        /// under the active reduction ordering, for an arbitrary run of
        /// `add_rule` calls over a small alphabet (not necessarily confluent:
        /// the ordering invariant holds on every active rule regardless).
        #[test]
        fn active_rules_respect_the_reduction_ordering(
            pairs in proptest::collection::vec(
                (proptest::collection::vec(0..2u16, 1..5), proptest::collection::vec(0..2u16, 0..5)),
                1..6,
            )
        ) {
            let mut kb = KnuthBendix::new(Kind::Monoid, 2);
            for (u, v) in pairs {
                let _ = kb.add_rule(&u, &v);
            }
            kb.drain_pending();
            for rule in kb.rules.active_rules() {
                proptest::prop_assert!(ShortLex.reorder(rule.lhs.clone(), rule.rhs.clone()).0 == rule.lhs);
            }
        }
    }

    #[test]
    fn dihedral_like_presentation_completes_finite() {
        // a^2 = 1, b^2 = 1, (ab)^3 = 1 on {a, b} (monoid with identity as
        // empty word) presents the dihedral group of order 6.
        let mut kb = KnuthBendix::new(Kind::Monoid, 2);
        kb.add_rule(&w("aa"), &[]).unwrap();
        kb.add_rule(&w("bb"), &[]).unwrap();
        kb.add_rule(&w("ababab"), &[]).unwrap();
        kb.run();
        assert!(kb.finished());
        assert!(kb.confluent());
        assert_eq!(kb.size(), ClassCount::Finite(6));
    }
}
