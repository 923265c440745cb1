use std::collections::BTreeSet;

use crate::utils::{GrammarError, Result};

/// The disjoint non-terminal and terminal symbol sets of a grammar.
///
/// Ordered sets keep iteration stable, so a seeded generator replays the
/// same derivation on every run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alphabet {
    nonterminals: BTreeSet<char>,
    terminals: BTreeSet<char>,
}

impl Alphabet {
    /// Create an alphabet, rejecting symbols declared in both sets
    pub fn new<N, T>(nonterminals: N, terminals: T) -> Result<Self>
    where
        N: IntoIterator<Item = char>,
        T: IntoIterator<Item = char>,
    {
        let alphabet = Alphabet {
            nonterminals: nonterminals.into_iter().collect(),
            terminals: terminals.into_iter().collect(),
        };
        alphabet.validate()?;
        Ok(alphabet)
    }

    /// Check that no symbol is both a terminal and a non-terminal
    pub fn validate(&self) -> Result<()> {
        match self.nonterminals.intersection(&self.terminals).next() {
            Some(&c) => Err(GrammarError::OverlappingAlphabet(c)),
            None => Ok(()),
        }
    }

    pub fn nonterminals(&self) -> &BTreeSet<char> {
        &self.nonterminals
    }

    pub fn terminals(&self) -> &BTreeSet<char> {
        &self.terminals
    }

    pub fn is_nonterminal(&self, symbol: char) -> bool {
        self.nonterminals.contains(&symbol)
    }

    pub fn is_terminal(&self, symbol: char) -> bool {
        self.terminals.contains(&symbol)
    }

    /// True if the symbol is declared in either set
    pub fn contains(&self, symbol: char) -> bool {
        self.is_nonterminal(symbol) || self.is_terminal(symbol)
    }

    /// True if every symbol of the word is a terminal
    pub fn is_terminal_word(&self, word: &str) -> bool {
        word.chars().all(|c| self.is_terminal(c))
    }

    /// The distinct non-terminals occurring in a word, in sorted order
    pub fn nonterminals_in(&self, word: &str) -> Vec<char> {
        self.nonterminals
            .iter()
            .copied()
            .filter(|&nt| word.contains(nt))
            .collect()
    }

    /// First symbol of the word that is declared in neither set
    pub fn first_undeclared(&self, word: &str) -> Option<char> {
        word.chars().find(|&c| !self.contains(c))
    }
}
