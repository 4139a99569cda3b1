//! Fuzz target for the proof reader
//!
//! Builds proof text from a mix of valid names, unknown names and raw
//! noise over a fixed circuit with two named latches.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sisi_core::Aig;
use sisi_core::proof_file::parse_proof;

const MODEL: &str = "aag 4 1 2 0 1 1\n2\n4 8\n6 4\n8\n8 2 5\ni0 enable\nl0 ready\n";

#[derive(Debug, Arbitrary)]
enum Token {
    Input(bool),
    Latch(u8, bool),
    Symbol(bool),
    Unknown(String),
}

#[derive(Debug, Arbitrary)]
enum Line {
    Header,
    Blank,
    Clause(u16, Vec<Token>),
    Noise(String),
}

fn render(token: &Token) -> String {
    let neg = |n: bool| if n { "!" } else { "" };
    match token {
        Token::Input(n) => format!("{}i0", neg(*n)),
        Token::Latch(k, n) => format!("{}l{}", neg(*n), k % 3),
        Token::Symbol(n) => format!("{}enable", neg(*n)),
        Token::Unknown(name) => name.clone(),
    }
}

fuzz_target!(|lines: Vec<Line>| {
    let Ok(aig) = Aig::parse(MODEL.as_bytes()) else {
        return;
    };
    let mut text = String::new();
    for line in &lines {
        match line {
            Line::Header => text.push_str("One-step Inductive Strengthening of Property (in CNF):"),
            Line::Blank => {}
            Line::Clause(id, tokens) => {
                let body: Vec<String> = tokens.iter().map(render).collect();
                text.push_str(&format!("Clause {id}: {}", body.join(" ")));
            }
            Line::Noise(noise) => text.push_str(noise),
        }
        text.push('\n');
    }
    if let Ok(clauses) = parse_proof(&text, &aig) {
        for clause in clauses {
            assert!(clause.iter().all(|lit| (2..=7).contains(lit)));
        }
    }
});
