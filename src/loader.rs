//! Reading grammar definitions from text and JSON.
//!
//! The text format has five significant lines (blank lines and `#` comments
//! are skipped):
//!
//! ```text
//! CFG
//! S;A
//! a;b
//! S->aA;A->b
//! S
//! ```
//!
//! For matrix grammars the first line is `MG` and the rules line lists
//! matrices separated by `|`, e.g. `S->AB | A->aA;B->bB | A->a;B->b`.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grammar::{Grammar, GrammarBuilder, GrammarConfig};
use crate::rules::{GrammarKind, RuleStore};
use crate::utils::{GrammarError, Result, parse_symbol};

static RULE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s*->\s*(.*?)\s*$").expect("rule pattern is valid"));

/// A single `left -> right` rewrite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub left: char,
    pub right: String,
}

/// The rules of a definition, tagged by grammar kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RulesDefinition {
    Cfg { rules: Vec<RuleDefinition> },
    Mg { matrices: Vec<Vec<RuleDefinition>> },
}

/// Serializable form of a grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarDefinition {
    pub nonterminals: Vec<char>,
    pub terminals: Vec<char>,
    pub start: char,
    #[serde(flatten)]
    pub rules: RulesDefinition,
}

impl GrammarDefinition {
    /// Validate the definition and build a grammar from it
    pub fn into_grammar(self, config: GrammarConfig) -> Result<Grammar> {
        let kind = match self.rules {
            RulesDefinition::Cfg { .. } => GrammarKind::ContextFree,
            RulesDefinition::Mg { .. } => GrammarKind::Matrix,
        };
        let mut builder = GrammarBuilder::new(kind, self.start)
            .nonterminals(&self.nonterminals.iter().collect::<String>())
            .terminals(&self.terminals.iter().collect::<String>())
            .config(config);

        match &self.rules {
            RulesDefinition::Cfg { rules } => {
                for rule in rules {
                    builder = builder.rule(rule.left, &rule.right);
                }
            }
            RulesDefinition::Mg { matrices } => {
                for matrix in matrices {
                    let pairs: Vec<(char, &str)> = matrix
                        .iter()
                        .map(|rule| (rule.left, rule.right.as_str()))
                        .collect();
                    builder = builder.matrix(&pairs);
                }
            }
        }
        builder.build()
    }
}

fn to_rule_definitions<'a>(pairs: impl Iterator<Item = (char, &'a String)>) -> Vec<RuleDefinition> {
    pairs
        .map(|(left, right)| RuleDefinition {
            left,
            right: right.clone(),
        })
        .collect()
}

impl Grammar {
    /// Load a grammar from a file, as JSON if the extension is `.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_config(path, GrammarConfig::default())
    }

    pub fn from_file_with_config<P: AsRef<Path>>(path: P, config: GrammarConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        debug!(path = %path.display(), json = is_json, "loading grammar");
        if is_json {
            let definition: GrammarDefinition = serde_json::from_str(&content)?;
            definition.into_grammar(config)
        } else {
            parse_grammar(&content, config)
        }
    }

    /// The serializable definition of this grammar
    pub fn to_definition(&self) -> GrammarDefinition {
        let rules = match self.rules() {
            RuleStore::ContextFree(rules) => RulesDefinition::Cfg {
                rules: to_rule_definitions(
                    rules
                        .iter()
                        .flat_map(|(left, alts)| alts.iter().map(move |right| (left, right))),
                ),
            },
            RuleStore::Matrix(matrices) => RulesDefinition::Mg {
                matrices: matrices
                    .matrices()
                    .iter()
                    .map(|matrix| {
                        let pairs = matrix.pairs().iter().map(|(left, right)| (*left, right));
                        to_rule_definitions(pairs)
                    })
                    .collect(),
            },
        };
        GrammarDefinition {
            nonterminals: self.alphabet().nonterminals().iter().copied().collect(),
            terminals: self.alphabet().terminals().iter().copied().collect(),
            start: self.start_symbol(),
            rules,
        }
    }

    /// Render this grammar in the five-line text format
    pub fn to_text(&self) -> String {
        let join = |symbols: &std::collections::BTreeSet<char>| {
            symbols.iter().map(char::to_string).collect::<Vec<_>>().join(";")
        };
        let rules = match self.rules() {
            RuleStore::ContextFree(rules) => rules
                .iter()
                .flat_map(|(left, alts)| {
                    alts.iter().map(move |right| format!("{}->{}", left, right))
                })
                .collect::<Vec<_>>()
                .join(";"),
            RuleStore::Matrix(matrices) => matrices
                .matrices()
                .iter()
                .map(|matrix| {
                    matrix
                        .pairs()
                        .iter()
                        .map(|(left, right)| format!("{}->{}", left, right))
                        .collect::<Vec<_>>()
                        .join(";")
                })
                .collect::<Vec<_>>()
                .join(" | "),
        };
        format!(
            "{}\n{}\n{}\n{}\n{}\n",
            self.kind(),
            join(self.alphabet().nonterminals()),
            join(self.alphabet().terminals()),
            rules,
            self.start_symbol()
        )
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self> {
        parse_grammar(s, GrammarConfig::default())
    }
}

/// Parse the five-line text format
pub fn parse_grammar(text: &str, config: GrammarConfig) -> Result<Grammar> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if lines.len() < 5 {
        return Err(GrammarError::Parse {
            line: text.lines().count(),
            message: format!(
                "expected kind, non-terminals, terminals, rules and start symbol, found {} line(s)",
                lines.len()
            ),
        });
    }

    let kind: GrammarKind = lines[0].1.parse()?;
    let nonterminals = parse_symbol_list(lines[1].1)?;
    let terminals = parse_symbol_list(lines[2].1)?;
    let (rules_line, rules) = lines[3];
    let start = parse_symbol(lines[4].1)?;

    let mut builder = GrammarBuilder::new(kind, start)
        .nonterminals(&nonterminals)
        .terminals(&terminals)
        .config(config);

    match kind {
        GrammarKind::ContextFree => {
            for (left, right) in parse_rule_list(rules, rules_line)? {
                builder = builder.rule(left, &right);
            }
        }
        GrammarKind::Matrix => {
            for matrix in rules.split('|') {
                let pairs = parse_rule_list(matrix, rules_line)?;
                if pairs.is_empty() {
                    continue;
                }
                let pairs: Vec<(char, &str)> = pairs
                    .iter()
                    .map(|(left, right)| (*left, right.as_str()))
                    .collect();
                builder = builder.matrix(&pairs);
            }
        }
    }

    builder.build()
}

/// `;`-separated single-character symbols, concatenated
fn parse_symbol_list(line: &str) -> Result<String> {
    line.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_symbol)
        .collect()
}

/// `;`-separated `L->R` rules
fn parse_rule_list(text: &str, line: usize) -> Result<Vec<(char, String)>> {
    text.split(';')
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .map(|rule| {
            let captures = RULE_PATTERN.captures(rule).ok_or_else(|| GrammarError::Parse {
                line,
                message: format!("malformed rule '{}'", rule),
            })?;
            let left = parse_symbol(&captures[1])?;
            let right = captures[2].to_string();
            if right.is_empty() {
                return Err(GrammarError::EmptyProduction(rule.to_string()));
            }
            Ok((left, right))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CFG_TEXT: &str = "CFG\nS;A\na;b\nS->aA;A->b\nS\n";

    #[test]
    fn test_parse_cfg() {
        let grammar: Grammar = CFG_TEXT.parse().unwrap();
        assert_eq!(grammar.kind(), GrammarKind::ContextFree);
        assert_eq!(grammar.start_symbol(), 'S');
        match grammar.rules() {
            RuleStore::ContextFree(rules) => {
                assert_eq!(rules.alternatives('S'), ["aA"]);
                assert_eq!(rules.alternatives('A'), ["b"]);
            }
            other => panic!("Expected context-free rules, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_mg_with_comments() {
        let text = "# matrix grammar\nMG\n\nS;A;B\na;b\nS->AB | A->aA; B->bB | A->a;B->b |\nS\n";
        let grammar: Grammar = text.parse().unwrap();
        match grammar.rules() {
            RuleStore::Matrix(matrices) => {
                assert_eq!(matrices.len(), 3);
                assert_eq!(
                    matrices.matrices()[1].pairs(),
                    [('A', "aA".to_string()), ('B', "bB".to_string())]
                );
            }
            other => panic!("Expected matrices, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_lines() {
        let result = "CFG\nS\na\n".parse::<Grammar>();
        assert!(matches!(result, Err(GrammarError::Parse { .. })));
    }

    #[test]
    fn test_unknown_kind() {
        let result = "CSG\nS\na\nS->a\nS\n".parse::<Grammar>();
        assert!(matches!(result, Err(GrammarError::UnknownGrammarKind(_))));
    }

    #[test]
    fn test_malformed_rule() {
        let result = "CFG\nS\na\nS=>a\nS\n".parse::<Grammar>();
        assert!(matches!(result, Err(GrammarError::Parse { line: 4, .. })));
    }

    #[test]
    fn test_multi_character_symbol() {
        let result = "CFG\nS;AB\na\nS->a\nS\n".parse::<Grammar>();
        assert!(matches!(result, Err(GrammarError::InvalidSymbol(_))));
    }

    #[test]
    fn test_undeclared_symbol_in_cfg() {
        let result = "CFG\nS\na\nS->ax\nS\n".parse::<Grammar>();
        let err = result.unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(err, GrammarError::UndeclaredSymbol { symbol: 'x', .. }));
    }

    #[test]
    fn test_text_form_reparses() {
        let text = "MG\nA;B;S\na;b\nS->AB | A->aA;B->bB | A->a;B->b\nS\n";
        let grammar: Grammar = text.parse().unwrap();
        assert_eq!(grammar.to_text(), text);
        assert_eq!(grammar.to_text().parse::<Grammar>().unwrap(), grammar);
    }

    #[test]
    fn test_json_definition() {
        let json = r#"{
            "kind": "mg",
            "nonterminals": ["A", "S"],
            "terminals": ["a", "b"],
            "start": "S",
            "matrices": [[{"left": "S", "right": "aA"}, {"left": "A", "right": "b"}]]
        }"#;
        let definition: GrammarDefinition = serde_json::from_str(json).unwrap();
        let grammar = definition.clone().into_grammar(GrammarConfig::default()).unwrap();
        assert_eq!(grammar.kind(), GrammarKind::Matrix);
        assert_eq!(grammar.to_definition(), definition);
    }
}
