use grammar_derive::{GrammarBuilder, GrammarConfig, Target};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Example of building grammars programmatically and deriving words from them
fn main() -> Result<(), Box<dyn Error>> {
    // Example 1: a context-free grammar for a^n b^n
    let grammar = GrammarBuilder::context_free('S')
        .nonterminals("S")
        .terminals("ab")
        .rule('S', "aSb")
        .rule('S', "ab")
        .build()?;

    println!("{}\n", grammar);

    let mut rng = StdRng::seed_from_u64(2024);
    for length in [2, 5, 6, 10] {
        match grammar.derive(length, &mut rng) {
            Some(derivation) => println!("length {}: {}", length, derivation),
            None => println!("length {}: not derivable", length),
        }
    }

    // Example 2: a matrix grammar for a^n b^n c^n, which no
    // context-free grammar generates
    let config = GrammarConfig {
        max_depth: 30,
        max_length: 30,
        ..GrammarConfig::default()
    };
    let grammar = GrammarBuilder::matrix_grammar('S')
        .nonterminals("SABC")
        .terminals("abc")
        .matrix(&[('S', "ABC")])
        .matrix(&[('A', "aA"), ('B', "bB"), ('C', "cC")])
        .matrix(&[('A', "a"), ('B', "b"), ('C', "c")])
        .config(config)
        .build()?;

    println!("\n{}\n", grammar);

    for i in 1..=3 {
        if let Some(derivation) = grammar.derive(Target::Any, &mut rng) {
            println!("{}. {}", i, derivation.result());
        }
    }

    if let Some(derivation) = grammar.derive(12, &mut rng) {
        println!("\nDerivation of length 12:\n{}", derivation);
    }

    Ok(())
}
