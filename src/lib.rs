//! Grammar-Derive finds derivations of words in context-free and matrix grammars.
//!
//! A grammar is a set of single-character non-terminals and terminals, a start
//! symbol, and either context-free rules or matrices of rewrites that apply
//! atomically. Given a target length (or any length), a bounded depth-first
//! search explores rewrites in random order and returns the first derivation
//! it finds, from the start symbol to a terminal word.
//!
//! # Example
//!
//! ```rust
//! use grammar_derive::GrammarBuilder;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let grammar = GrammarBuilder::context_free('S')
//!     .nonterminals("SA")
//!     .terminals("ab")
//!     .rule('S', "aA")
//!     .rule('A', "b")
//!     .build()
//!     .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let derivation = grammar.derive(2, &mut rng).unwrap();
//! assert_eq!(derivation.to_string(), "S => aA => ab");
//!
//! // No word of length 1 exists
//! assert!(grammar.derive(1, &mut rng).is_none());
//! ```

pub mod alphabet;
pub mod derive;
pub mod grammar;
pub mod loader;
pub mod rules;
pub mod utils;

pub use alphabet::Alphabet;
pub use derive::{Derivation, Target, derive};
pub use grammar::{Grammar, GrammarBuilder, GrammarConfig};
pub use loader::{GrammarDefinition, RuleDefinition, RulesDefinition, parse_grammar};
pub use rules::{ContextFreeRules, GrammarKind, Matrix, MatrixRules, RuleStore};
pub use utils::{GrammarError, Result};
