use std::fmt;

use rand::Rng;

use crate::alphabet::Alphabet;
use crate::derive::{self, Derivation, Target};
use crate::rules::{ContextFreeRules, GrammarKind, Matrix, MatrixRules, RuleStore};
use crate::utils::{GrammarError, Result};

/// Bounds and validation options for a grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Maximum number of rewrite steps from the start word
    pub max_depth: usize,
    /// Maximum length of any word the search materializes
    pub max_length: usize,
    /// Reject matrix pairs that use undeclared symbols instead of only logging them
    pub strict_matrices: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_depth: 100,
            max_length: 100,
            strict_matrices: false,
        }
    }
}

/// A context-free or matrix grammar `G = (N, T, P, S)`
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    /// Non-terminal and terminal symbol sets
    alphabet: Alphabet,
    /// The symbol every derivation starts from
    start_symbol: char,
    /// Rule table or matrix table
    rules: RuleStore,
    /// Search bounds and validation options
    config: GrammarConfig,
}

impl Grammar {
    /// Create a grammar with the default configuration
    pub fn new(alphabet: Alphabet, start_symbol: char, rules: RuleStore) -> Result<Self> {
        Self::with_config(alphabet, start_symbol, rules, GrammarConfig::default())
    }

    /// Create a grammar with a custom configuration
    pub fn with_config(
        alphabet: Alphabet,
        start_symbol: char,
        rules: RuleStore,
        config: GrammarConfig,
    ) -> Result<Self> {
        let grammar = Grammar {
            alphabet,
            start_symbol,
            rules,
            config,
        };
        grammar.validate()?;
        Ok(grammar)
    }

    /// Re-check the alphabet, start symbol and every rule.
    pub fn validate(&self) -> Result<()> {
        self.alphabet.validate()?;
        if !self.alphabet.is_nonterminal(self.start_symbol) {
            return Err(GrammarError::InvalidStartSymbol(self.start_symbol));
        }
        self.rules.validate(&self.alphabet, self.config.strict_matrices)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn start_symbol(&self) -> char {
        self.start_symbol
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn kind(&self) -> GrammarKind {
        self.rules.kind()
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Replace the configuration, re-validating the grammar under it
    pub fn set_config(&mut self, config: GrammarConfig) -> Result<()> {
        let previous = std::mem::replace(&mut self.config, config);
        if let Err(err) = self.validate() {
            self.config = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Search for a derivation from the start symbol.
    ///
    /// `target` may be a [`Target`] or a length, where `0` accepts any length.
    /// Returns `None` when no word satisfying the target is derivable within
    /// the configured bounds.
    pub fn derive<R: Rng + ?Sized>(
        &self,
        target: impl Into<Target>,
        rng: &mut R,
    ) -> Option<Derivation> {
        derive::derive(self, &self.start_symbol.to_string(), target.into(), rng)
    }

    /// Like [`Grammar::derive`], drawing from the thread-local generator
    pub fn derive_word(&self, length: usize) -> Option<Derivation> {
        self.derive(length, &mut rand::thread_rng())
    }

    /// Check that a derivation is licensed by this grammar: it starts at the
    /// start symbol, each step is exactly one rule or matrix application,
    /// and it ends in a terminal word.
    pub fn check_derivation(&self, derivation: &Derivation) -> Result<()> {
        let words = derivation.words();
        let start = self.start_symbol.to_string();
        match words.first() {
            Some(first) if *first == start => {}
            Some(first) => {
                return Err(GrammarError::InvalidDerivation(format!(
                    "derivation starts at '{}' instead of '{}'",
                    first, start
                )));
            }
            None => {
                return Err(GrammarError::InvalidDerivation("empty derivation".to_string()));
            }
        }

        for (step, pair) in words.windows(2).enumerate() {
            let successors = self.rules.successors(&self.alphabet, &pair[0]);
            if !successors.contains(&pair[1]) {
                return Err(GrammarError::InvalidDerivation(format!(
                    "step {}: '{}' does not follow from '{}'",
                    step + 1,
                    pair[1],
                    pair[0]
                )));
            }
        }

        let result = derivation.result();
        if !self.alphabet.is_terminal_word(result) {
            return Err(GrammarError::InvalidDerivation(format!(
                "final word '{}' is not terminal",
                result
            )));
        }
        Ok(())
    }
}

fn join_symbols<'a>(symbols: impl Iterator<Item = &'a char>) -> String {
    symbols
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rules {
            RuleStore::ContextFree(_) => {
                writeln!(f, "Context-free grammar G=(N,T,P,{})", self.start_symbol)?
            }
            RuleStore::Matrix(_) => writeln!(f, "Matrix grammar G=(N,T,M,{})", self.start_symbol)?,
        }
        writeln!(f, "Non-terminals N: {}", join_symbols(self.alphabet.nonterminals().iter()))?;
        writeln!(f, "Terminals T: {}", join_symbols(self.alphabet.terminals().iter()))?;
        match &self.rules {
            RuleStore::ContextFree(rules) => {
                writeln!(f, "Rules P:")?;
                for (left, alternatives) in rules.iter() {
                    writeln!(f, "  {} -> {}", left, alternatives.join(" | "))?;
                }
            }
            RuleStore::Matrix(matrices) => {
                writeln!(f, "Matrices M:")?;
                for (index, matrix) in matrices.matrices().iter().enumerate() {
                    writeln!(f, "  Matrix {}: {}", index + 1, matrix)?;
                }
            }
        }
        write!(f, "Start symbol: {}", self.start_symbol)
    }
}

/// Builder for constructing Grammar instances
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    kind: GrammarKind,
    start_symbol: char,
    nonterminals: Vec<char>,
    terminals: Vec<char>,
    rules: Vec<(char, String)>,
    matrices: Vec<Vec<(char, String)>>,
    config: GrammarConfig,
}

impl GrammarBuilder {
    /// Start building a context-free grammar
    pub fn context_free(start_symbol: char) -> Self {
        Self::new(GrammarKind::ContextFree, start_symbol)
    }

    /// Start building a matrix grammar
    pub fn matrix_grammar(start_symbol: char) -> Self {
        Self::new(GrammarKind::Matrix, start_symbol)
    }

    pub fn new(kind: GrammarKind, start_symbol: char) -> Self {
        GrammarBuilder {
            kind,
            start_symbol,
            nonterminals: Vec::new(),
            terminals: Vec::new(),
            rules: Vec::new(),
            matrices: Vec::new(),
            config: GrammarConfig::default(),
        }
    }

    /// Declare non-terminals, one per character
    pub fn nonterminals(mut self, symbols: &str) -> Self {
        self.nonterminals.extend(symbols.chars());
        self
    }

    /// Declare terminals, one per character
    pub fn terminals(mut self, symbols: &str) -> Self {
        self.terminals.extend(symbols.chars());
        self
    }

    /// Add a context-free rule `left -> right`
    pub fn rule(mut self, left: char, right: &str) -> Self {
        self.rules.push((left, right.to_string()));
        self
    }

    /// Add a matrix of `(left, right)` pairs
    pub fn matrix(mut self, pairs: &[(char, &str)]) -> Self {
        self.matrices.push(
            pairs
                .iter()
                .map(|(left, right)| (*left, right.to_string()))
                .collect(),
        );
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate everything collected so far and build the grammar
    pub fn build(self) -> Result<Grammar> {
        let alphabet = Alphabet::new(self.nonterminals, self.terminals)?;
        let rules = match self.kind {
            GrammarKind::ContextFree => {
                if !self.matrices.is_empty() {
                    return Err(GrammarError::RuleKindMismatch(self.kind));
                }
                let mut rules = ContextFreeRules::new();
                for (left, right) in &self.rules {
                    rules.add_rule(&alphabet, *left, right)?;
                }
                RuleStore::ContextFree(rules)
            }
            GrammarKind::Matrix => {
                if !self.rules.is_empty() {
                    return Err(GrammarError::RuleKindMismatch(self.kind));
                }
                let mut matrices = MatrixRules::new();
                for pairs in self.matrices {
                    matrices.push(Matrix::new(pairs))?;
                }
                RuleStore::Matrix(matrices)
            }
        };
        Grammar::with_config(alphabet, self.start_symbol, rules, self.config)
    }
}
