//! # Congruence Engine
//!
//! Decides and enumerates congruences of finitely presented semigroups and
//! monoids. Given a finite alphabet, a set of defining relations, and
//! optionally a set of additional generating pairs, this crate answers the
//! word problem (do two words denote the same class?), class enumeration
//! (how many classes, and what words represent them), and — when the
//! quotient is finite — builds a concrete multiplication table for it.
//!
//! ## Core engines
//!
//! Three algorithmic engines attack the same problem from different
//! angles, coordinated by a race that yields whichever finishes first:
//!
//! * [`knuth_bendix`] — Knuth–Bendix completion of a length-reducing
//!   string rewriting system.
//! * [`todd_coxeter`] — Todd–Coxeter coset enumeration over a
//!   right/left/two-sided congruence.
//! * [`pair_closure`] — brute-force generating-pair closure over a finite
//!   [`base_semigroup::BaseSemigroup`].
//!
//! ## Usage
//!
//! ### Deciding a congruence from a presentation
//! ```rust,ignore
//! use congruence_engine::common::Kind;
//! use congruence_engine::presentation::Presentation;
//! use congruence_engine::congruence::Congruence;
//! use congruence_engine::todd_coxeter::Sense;
//!
//! let mut p = Presentation::new(Kind::Semigroup);
//! p.set_alphabet_size(2);
//! p.add_rule_str("aaa", "a")?;
//! p.add_rule_str("a", "bb")?;
//!
//! let mut cong = Congruence::from_presentation(p, Sense::TwoSided);
//! assert_eq!(cong.nr_classes()?, congruence_engine::common::ClassCount::Finite(5));
//! ```
//!
//! ### Running Knuth–Bendix directly
//! ```rust,ignore
//! use congruence_engine::common::Kind;
//! use congruence_engine::knuth_bendix::KnuthBendix;
//!
//! let mut kb = KnuthBendix::new(Kind::Monoid, 2);
//! kb.add_rule(&[0, 0], &[0])?;
//! assert!(kb.confluent());
//! ```
//!
//! ## Module organization
//!
//! | Module | Role |
//! |--------|------|
//! | [`common`] | Shared primitives: letters, words, `Kind`, `Tri`, `ClassCount`. |
//! | [`error`] | Crate-wide `CongruenceError` / `Result`. |
//! | [`config`] | Layered defaults for every engine (`figment`-backed). |
//! | [`reporting`] | Optional `tracing`-backed progress context. |
//! | [`runner`] | Cooperative cancellation/deadline primitive shared by every engine. |
//! | [`union_find`] | Disjoint-set structure backing coincidence processing and pair closure. |
//! | [`presentation`] | Alphabet and defining-relation storage. |
//! | [`ordering`] | Reduction orderings (`ShortLex`, `RecursivePathOrdering`). |
//! | [`rewrite_rule`] | Active/inactive rewrite-rule storage with suffix indexing. |
//! | [`gilman`] | Finite-model extraction from a confluent rewriting system. |
//! | [`knuth_bendix`] | Knuth–Bendix completion engine. |
//! | [`coset_table`] | Sparse coset action table for Todd–Coxeter. |
//! | [`todd_coxeter`] | Todd–Coxeter coset enumeration engine. |
//! | [`base_semigroup`] | The external base-semigroup collaborator interface. |
//! | [`transformation`] | A worked `BaseSemigroup`: finite transformation semigroups. |
//! | [`pair_closure`] | Generating-pair closure over a finite base semigroup. |
//! | [`race`] | Generic multi-engine race coordinator. |
//! | [`congruence`] | The unifying façade over all three engines. |
//! | [`quotient`] | Wraps a finished congruence as a `BaseSemigroup`. |

pub mod common;
pub mod error;

pub mod config;
pub mod reporting;
pub mod runner;
pub mod union_find;

pub mod presentation;

pub mod ordering;
pub mod rewrite_rule;
pub mod gilman;
pub mod knuth_bendix;

pub mod coset_table;
pub mod todd_coxeter;

pub mod base_semigroup;
pub mod transformation;
pub mod pair_closure;

pub mod race;
pub mod congruence;
pub mod quotient;

pub use common::{ClassCount, Kind, Letter, Tri, Word};
pub use congruence::Congruence;
pub use error::{CongruenceError, Result};
pub use knuth_bendix::KnuthBendix;
pub use presentation::Presentation;
pub use todd_coxeter::{Sense, ToddCoxeter};
