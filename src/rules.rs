use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::alphabet::Alphabet;
use crate::utils::{GrammarError, Result, replace_first};

/// The grammar variants this crate can derive from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarKind {
    /// Context-free grammar: one non-terminal rewritten per step
    ContextFree,
    /// Matrix grammar: one matrix of rewrites applied atomically per step
    Matrix,
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarKind::ContextFree => write!(f, "CFG"),
            GrammarKind::Matrix => write!(f, "MG"),
        }
    }
}

impl FromStr for GrammarKind {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CFG" => Ok(GrammarKind::ContextFree),
            "MG" => Ok(GrammarKind::Matrix),
            other => Err(GrammarError::UnknownGrammarKind(other.to_string())),
        }
    }
}

/// Context-free rule table: non-terminal to its alternative right-hand sides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextFreeRules {
    rules: BTreeMap<char, Vec<String>>,
}

impl ContextFreeRules {
    pub fn new() -> Self {
        ContextFreeRules::default()
    }

    /// Register `left -> right` after checking both sides against the alphabet
    pub fn add_rule(&mut self, alphabet: &Alphabet, left: char, right: &str) -> Result<()> {
        Self::check_rule(alphabet, left, right)?;
        self.rules.entry(left).or_default().push(right.to_string());
        Ok(())
    }

    fn check_rule(alphabet: &Alphabet, left: char, right: &str) -> Result<()> {
        if !alphabet.is_nonterminal(left) {
            return Err(GrammarError::UndeclaredNonTerminal(left));
        }
        if right.is_empty() {
            return Err(GrammarError::EmptyProduction(format!("{}->", left)));
        }
        if let Some(symbol) = alphabet.first_undeclared(right) {
            return Err(GrammarError::UndeclaredSymbol {
                symbol,
                rule: format!("{}->{}", left, right),
            });
        }
        Ok(())
    }

    /// Alternatives registered for a non-terminal (empty if none)
    pub fn alternatives(&self, nonterminal: char) -> &[String] {
        self.rules
            .get(&nonterminal)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over `(left, alternatives)` in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (char, &[String])> {
        self.rules.iter().map(|(&nt, alts)| (nt, alts.as_slice()))
    }

    /// Total number of productions
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self, alphabet: &Alphabet) -> Result<()> {
        for (left, alternatives) in self.iter() {
            for right in alternatives {
                Self::check_rule(alphabet, left, right)?;
            }
        }
        Ok(())
    }

    /// Next words in exploration order: non-terminals present in the word are
    /// visited in random order, each rewritten at its leftmost occurrence with
    /// its alternatives in random order.
    fn candidates<R: Rng + ?Sized>(
        &self,
        alphabet: &Alphabet,
        word: &str,
        rng: &mut R,
    ) -> Vec<String> {
        let mut present = alphabet.nonterminals_in(word);
        present.shuffle(rng);

        let mut candidates = Vec::new();
        for nonterminal in present {
            let alternatives = self.alternatives(nonterminal);
            if alternatives.is_empty() {
                continue;
            }
            let mut order: Vec<&String> = alternatives.iter().collect();
            order.shuffle(rng);
            candidates.extend(
                order
                    .into_iter()
                    .filter_map(|right| replace_first(word, nonterminal, right)),
            );
        }
        candidates
    }

    fn successors(&self, alphabet: &Alphabet, word: &str) -> Vec<String> {
        alphabet
            .nonterminals_in(word)
            .into_iter()
            .flat_map(|nt| {
                self.alternatives(nt)
                    .iter()
                    .filter_map(move |right| replace_first(word, nt, right))
            })
            .collect()
    }
}

/// An ordered group of rewrites that must all apply, in sequence, or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pairs: Vec<(char, String)>,
}

impl Matrix {
    pub fn new(pairs: Vec<(char, String)>) -> Self {
        Matrix { pairs }
    }

    pub fn pairs(&self) -> &[(char, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply every pair in order, each against the word as rewritten by the
    /// pairs before it. `None` if any left symbol is missing at its turn.
    pub fn apply(&self, word: &str) -> Option<String> {
        self.pairs
            .iter()
            .try_fold(word.to_string(), |current, (left, right)| {
                replace_first(&current, *left, right)
            })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(left, right)| format!("{} -> {}", left, right))
            .collect();
        write!(f, "[{}]", pairs.join(", "))
    }
}

/// The matrix table of a matrix grammar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixRules {
    matrices: Vec<Matrix>,
}

impl MatrixRules {
    pub fn new() -> Self {
        MatrixRules::default()
    }

    /// Append a matrix. Matrices without pairs are discarded.
    pub fn push(&mut self, matrix: Matrix) -> Result<bool> {
        if matrix.is_empty() {
            return Ok(false);
        }
        if let Some((left, _)) = matrix.pairs.iter().find(|(_, right)| right.is_empty()) {
            return Err(GrammarError::EmptyProduction(format!("{}->", left)));
        }
        self.matrices.push(matrix);
        Ok(true)
    }

    pub fn matrices(&self) -> &[Matrix] {
        &self.matrices
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Check pair symbols against the alphabet.
    ///
    /// In lenient mode undeclared symbols are only logged; words containing
    /// them can never become terminal, so such matrices simply never lead to
    /// a result.
    pub fn validate(&self, alphabet: &Alphabet, strict: bool) -> Result<()> {
        for matrix in &self.matrices {
            for (left, right) in &matrix.pairs {
                let rule = format!("{}->{}", left, right);
                if right.is_empty() {
                    return Err(GrammarError::EmptyProduction(rule));
                }
                if !alphabet.is_nonterminal(*left) {
                    if strict {
                        return Err(GrammarError::UndeclaredNonTerminal(*left));
                    }
                    warn!(
                        symbol = %left,
                        rule = %rule,
                        "matrix rewrites an undeclared non-terminal"
                    );
                }
                if let Some(symbol) = alphabet.first_undeclared(right) {
                    if strict {
                        return Err(GrammarError::UndeclaredSymbol { symbol, rule });
                    }
                    warn!(symbol = %symbol, rule = %rule, "matrix introduces an undeclared symbol");
                }
            }
        }
        Ok(())
    }

    /// Next words in exploration order: one per applicable matrix, matrices
    /// visited in random order.
    fn candidates<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> Vec<String> {
        let mut order: Vec<usize> = (0..self.matrices.len()).collect();
        order.shuffle(rng);
        order
            .into_iter()
            .filter_map(|index| self.matrices[index].apply(word))
            .collect()
    }

    fn successors(&self, word: &str) -> Vec<String> {
        self.matrices
            .iter()
            .filter_map(|matrix| matrix.apply(word))
            .collect()
    }
}

/// The rewrite rules of a grammar, one variant per grammar kind
#[derive(Debug, Clone, PartialEq)]
pub enum RuleStore {
    ContextFree(ContextFreeRules),
    Matrix(MatrixRules),
}

impl RuleStore {
    pub fn kind(&self) -> GrammarKind {
        match self {
            RuleStore::ContextFree(_) => GrammarKind::ContextFree,
            RuleStore::Matrix(_) => GrammarKind::Matrix,
        }
    }

    /// Every word reachable from `word` in one step, randomly ordered
    pub fn candidates<R: Rng + ?Sized>(
        &self,
        alphabet: &Alphabet,
        word: &str,
        rng: &mut R,
    ) -> Vec<String> {
        match self {
            RuleStore::ContextFree(rules) => rules.candidates(alphabet, word, rng),
            RuleStore::Matrix(matrices) => matrices.candidates(word, rng),
        }
    }

    /// Every word reachable from `word` in one step, in declaration order
    pub fn successors(&self, alphabet: &Alphabet, word: &str) -> Vec<String> {
        match self {
            RuleStore::ContextFree(rules) => rules.successors(alphabet, word),
            RuleStore::Matrix(matrices) => matrices.successors(word),
        }
    }

    pub fn validate(&self, alphabet: &Alphabet, strict_matrices: bool) -> Result<()> {
        match self {
            RuleStore::ContextFree(rules) => rules.validate(alphabet),
            RuleStore::Matrix(matrices) => matrices.validate(alphabet, strict_matrices),
        }
    }

    /// Number of productions (CFG) or matrices (MG)
    pub fn len(&self) -> usize {
        match self {
            RuleStore::ContextFree(rules) => rules.len(),
            RuleStore::Matrix(matrices) => matrices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
