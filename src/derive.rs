//! Bounded, randomized depth-first search for derivations.
//!
//! Both grammar variants share one search skeleton. The rule store supplies
//! the randomly ordered next words for the current word; the search prunes
//! words that exceed the length limit, descends into the rest and rolls the
//! trace back on every failing branch.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::grammar::Grammar;
use crate::utils::word_len;

/// What a derived word has to satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Any terminal word within the length bound
    #[default]
    Any,
    /// A terminal word of exactly this many symbols
    Exact(usize),
}

impl From<usize> for Target {
    /// `0` means any length
    fn from(length: usize) -> Self {
        match length {
            0 => Target::Any,
            n => Target::Exact(n),
        }
    }
}

impl Target {
    /// Longest word worth materializing under the given length bound
    pub fn length_limit(&self, max_length: usize) -> usize {
        match self {
            Target::Any => max_length,
            Target::Exact(n) => (*n).min(max_length),
        }
    }

    fn is_met_by(&self, grammar: &Grammar, word: &str) -> bool {
        let length_ok = match self {
            Target::Any => true,
            Target::Exact(n) => word_len(word) == *n,
        };
        length_ok && grammar.alphabet().is_terminal_word(word)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Any => write!(f, "any length"),
            Target::Exact(n) => write!(f, "length {}", n),
        }
    }
}

/// The sequence of words from the start word to the derived word
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Derivation {
    words: Vec<String>,
}

impl Derivation {
    fn start(word: &str) -> Self {
        Derivation {
            words: vec![word.to_string()],
        }
    }

    /// Wrap an existing word sequence, e.g. to check it against a grammar
    pub fn from_words(words: Vec<String>) -> Self {
        Derivation { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The last word of the derivation
    pub fn result(&self) -> &str {
        self.words.last().map(String::as_str).unwrap_or("")
    }

    /// Number of rewrite steps
    pub fn steps(&self) -> usize {
        self.words.len().saturating_sub(1)
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn push(&mut self, word: String) {
        self.words.push(word);
    }

    fn rollback(&mut self, len: usize) {
        self.words.truncate(len);
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words.join(" => "))
    }
}

/// One partially explored word on the search stack
struct Frame {
    word: String,
    depth: usize,
    candidates: std::vec::IntoIter<String>,
    /// Trace length while this word is the last entry
    mark: usize,
}

enum Visit {
    Found,
    Expand(Frame),
    Failed,
}

/// State of one search call; never shared between searches
struct Search<'g, 'r, R: Rng + ?Sized> {
    grammar: &'g Grammar,
    target: Target,
    length_limit: usize,
    rng: &'r mut R,
    trace: Derivation,
    /// Words whose subtree already failed, with the shallowest failing depth
    dead_ends: HashMap<String, usize>,
    visited: usize,
}

impl<R: Rng + ?Sized> Search<'_, '_, R> {
    fn visit(&mut self, word: String, depth: usize) -> Visit {
        self.visited += 1;

        if self.target.is_met_by(self.grammar, &word) {
            return Visit::Found;
        }
        if depth > self.grammar.config().max_depth {
            trace!(word = %word, depth, "depth bound reached");
            return Visit::Failed;
        }
        // A subtree that failed with more steps left fails again now
        if self.dead_ends.get(&word).is_some_and(|&failed| failed <= depth) {
            return Visit::Failed;
        }

        let candidates = self
            .grammar
            .rules()
            .candidates(self.grammar.alphabet(), &word, &mut *self.rng);
        Visit::Expand(Frame {
            word,
            depth,
            candidates: candidates.into_iter(),
            mark: self.trace.len(),
        })
    }

    /// Depth-first search on an explicit stack, so the depth bound is not
    /// limited by the thread's stack size.
    fn explore(&mut self, start_word: &str) -> bool {
        let mut stack = match self.visit(start_word.to_string(), 0) {
            Visit::Found => return true,
            Visit::Failed => return false,
            Visit::Expand(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            let (depth, mark) = (frame.depth, frame.mark);
            let Some(candidate) = frame.candidates.next() else {
                if let Some(exhausted) = stack.pop() {
                    trace!(word = %exhausted.word, depth, "backtracking");
                    self.dead_ends.insert(exhausted.word, depth);
                }
                if !stack.is_empty() {
                    self.trace.rollback(mark - 1);
                }
                continue;
            };

            if word_len(&candidate) > self.length_limit {
                trace!(word = %candidate, limit = self.length_limit, "pruned by length bound");
                continue;
            }
            self.trace.push(candidate.clone());
            match self.visit(candidate, depth + 1) {
                Visit::Found => return true,
                Visit::Expand(child) => stack.push(child),
                Visit::Failed => self.trace.rollback(mark),
            }
        }
        false
    }
}

/// Search for a derivation from `start_word` satisfying `target`.
///
/// Non-terminals (CFG) or matrices (MG) and rule alternatives are tried in
/// the order drawn from `rng`; the first successful derivation is returned.
/// `None` means no such word is derivable within the grammar's depth and
/// length bounds.
pub fn derive<R: Rng + ?Sized>(
    grammar: &Grammar,
    start_word: &str,
    target: Target,
    rng: &mut R,
) -> Option<Derivation> {
    let config = grammar.config();
    let mut search = Search {
        grammar,
        target,
        length_limit: target.length_limit(config.max_length),
        rng,
        trace: Derivation::start(start_word),
        dead_ends: HashMap::new(),
        visited: 0,
    };

    debug!(
        kind = %grammar.kind(),
        start = start_word,
        target = %target,
        max_depth = config.max_depth,
        max_length = config.max_length,
        "starting derivation search"
    );

    if search.explore(start_word) {
        debug!(
            steps = search.trace.steps(),
            visited = search.visited,
            word = search.trace.result(),
            "derivation found"
        );
        Some(search.trace)
    } else {
        debug!(visited = search.visited, "no derivation within bounds");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, GrammarConfig};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn simple_cfg() -> Grammar {
        GrammarBuilder::context_free('S')
            .nonterminals("SA")
            .terminals("ab")
            .rule('S', "aA")
            .rule('A', "b")
            .build()
            .unwrap()
    }

    fn simple_mg() -> Grammar {
        GrammarBuilder::matrix_grammar('S')
            .nonterminals("SA")
            .terminals("ab")
            .matrix(&[('S', "aA"), ('A', "b")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_target_from_length() {
        assert_eq!(Target::from(0), Target::Any);
        assert_eq!(Target::from(4), Target::Exact(4));
        assert_eq!(Target::Exact(4).length_limit(100), 4);
        assert_eq!(Target::Exact(400).length_limit(100), 100);
        assert_eq!(Target::Any.length_limit(100), 100);
    }

    #[test]
    fn test_cfg_exact_length() {
        let mut rng = StdRng::seed_from_u64(42);
        let derivation = simple_cfg().derive(2, &mut rng).unwrap();
        assert_eq!(derivation.words(), ["S", "aA", "ab"]);
        assert_eq!(derivation.steps(), 2);
        assert_eq!(derivation.to_string(), "S => aA => ab");
    }

    #[test]
    fn test_cfg_infeasible_length() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(simple_cfg().derive(1, &mut rng).is_none());
        assert!(simple_cfg().derive(3, &mut rng).is_none());
    }

    #[test]
    fn test_mg_records_only_whole_matrix_applications() {
        let mut rng = StdRng::seed_from_u64(42);
        let derivation = simple_mg().derive(2, &mut rng).unwrap();
        assert_eq!(derivation.words(), ["S", "ab"]);
    }

    #[test]
    fn test_any_length() {
        let mut rng = StdRng::seed_from_u64(3);
        let derivation = simple_cfg().derive(Target::Any, &mut rng).unwrap();
        assert_eq!(derivation.result(), "ab");
    }

    #[test]
    fn test_already_terminal_start_word() {
        let mut rng = StdRng::seed_from_u64(3);
        let grammar = simple_cfg();
        let derivation = derive(&grammar, "ab", Target::Exact(2), &mut rng).unwrap();
        assert_eq!(derivation.words(), ["ab"]);
        assert_eq!(derivation.steps(), 0);
    }

    #[test]
    fn test_unbounded_recursion_terminates() {
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("S")
            .terminals("a")
            .rule('S', "SS")
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        assert!(grammar.derive(0, &mut rng).is_none());
        assert!(grammar.derive(5, &mut rng).is_none());
    }

    #[test]
    fn test_depth_bound_limits_steps() {
        // a^n needs n steps of S -> aS before S -> a
        let config = GrammarConfig {
            max_depth: 3,
            ..GrammarConfig::default()
        };
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("S")
            .terminals("a")
            .rule('S', "aS")
            .rule('S', "a")
            .config(config)
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(grammar.derive(4, &mut rng).unwrap().result(), "aaaa");
        assert!(grammar.derive(5, &mut rng).is_none());
    }

    fn distinct_traces(grammar: &Grammar, length: usize) -> HashSet<Vec<String>> {
        (0..32)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                grammar.derive(length, &mut rng).unwrap().into_words()
            })
            .collect()
    }

    #[test]
    fn test_alternatives_tried_in_random_order() {
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("S")
            .terminals("ab")
            .rule('S', "a")
            .rule('S', "b")
            .build()
            .unwrap();

        let words: HashSet<String> = distinct_traces(&grammar, 1)
            .into_iter()
            .map(|trace| trace[1].clone())
            .collect();
        assert_eq!(words, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_nonterminals_visited_in_random_order() {
        // One rule per non-terminal: only the rewrite order can differ
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("SAB")
            .terminals("ab")
            .rule('S', "AB")
            .rule('A', "a")
            .rule('B', "b")
            .build()
            .unwrap();

        let traces = distinct_traces(&grammar, 2);
        let middles: HashSet<&str> = traces.iter().map(|trace| trace[2].as_str()).collect();
        assert_eq!(middles, HashSet::from(["aB", "Ab"]));
    }

    #[test]
    fn test_matrices_tried_in_random_order() {
        let grammar = GrammarBuilder::matrix_grammar('S')
            .nonterminals("S")
            .terminals("ab")
            .matrix(&[('S', "a")])
            .matrix(&[('S', "b")])
            .build()
            .unwrap();

        let words: HashSet<String> = distinct_traces(&grammar, 1)
            .into_iter()
            .map(|trace| trace[1].clone())
            .collect();
        assert_eq!(words, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_large_depth_bound_on_unit_cycle() {
        // S and A rewrite into each other forever without growing the word
        let config = GrammarConfig {
            max_depth: 200_000,
            ..GrammarConfig::default()
        };
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("SA")
            .terminals("a")
            .rule('S', "A")
            .rule('A', "S")
            .config(config)
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        assert!(grammar.derive(1, &mut rng).is_none());
    }

    #[test]
    fn test_length_bound_prunes() {
        let config = GrammarConfig {
            max_length: 3,
            ..GrammarConfig::default()
        };
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("S")
            .terminals("a")
            .rule('S', "aS")
            .rule('S', "a")
            .config(config)
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        assert!(grammar.derive(4, &mut rng).is_none());
        let any = grammar.derive(0, &mut rng).unwrap();
        assert!(any.result().len() <= 3);
    }

    #[test]
    fn test_same_seed_same_derivation() {
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("SAB")
            .terminals("ab")
            .rule('S', "AB")
            .rule('S', "BA")
            .rule('A', "a")
            .rule('A', "aA")
            .rule('B', "b")
            .rule('B', "bB")
            .build()
            .unwrap();

        let first = grammar.derive(6, &mut StdRng::seed_from_u64(11)).unwrap();
        let second = grammar.derive(6, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(first, second);
        assert!(grammar.check_derivation(&first).is_ok());
    }

    #[test]
    fn test_matrix_grammar_copy_language() {
        // { a^n b^n c^n : n >= 1 }, not context-free
        let grammar = GrammarBuilder::matrix_grammar('S')
            .nonterminals("SABC")
            .terminals("abc")
            .matrix(&[('S', "ABC")])
            .matrix(&[('A', "aA"), ('B', "bB"), ('C', "cC")])
            .matrix(&[('A', "a"), ('B', "b"), ('C', "c")])
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(21);
        let derivation = grammar.derive(9, &mut rng).unwrap();
        assert_eq!(derivation.result(), "aaabbbccc");
        assert!(grammar.check_derivation(&derivation).is_ok());
        assert!(grammar.derive(8, &mut rng).is_none());
    }

    #[test]
    fn test_trace_rolled_back_between_branches() {
        // Only the S -> bA branch can reach length 3
        let grammar = GrammarBuilder::context_free('S')
            .nonterminals("SA")
            .terminals("ab")
            .rule('S', "a")
            .rule('S', "bA")
            .rule('A', "ab")
            .build()
            .unwrap();

        for seed in 0..10 {
            let derivation = grammar.derive(3, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(derivation.words(), ["S", "bA", "bab"]);
        }
    }
}
