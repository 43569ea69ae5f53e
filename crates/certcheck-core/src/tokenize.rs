//! Product-name tokenisation with stop-word removal and alias expansion.
//!
//! Names are lower-cased and split into runs of letters ("words") and runs of
//! digits ("numbers", usually concentrations). A number followed by a pack unit
//! is a pack size, kept apart from the concentrations: `"ACETIC ACID 20% 15L"`
//! becomes words `{acetic, acid}`, numbers `{20}` and sizes `{15}`.

use std::collections::BTreeSet;

use crate::tables::Tables;

/// Tokens extracted from one product name, before alias expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductTokens {
    pub words: BTreeSet<String>,
    pub numbers: BTreeSet<String>,
    /// Pack sizes ("15L", "190 kg"); never compared.
    pub sizes: BTreeSet<String>,
}

impl ProductTokens {
    pub fn parse(name: &str, tables: &Tables) -> Self {
        let mut tokens = Self::default();
        let lowered = name.to_lowercase();
        let mut chars = lowered.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_alphabetic() {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_alphabetic() {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                if !tables.stop_words.contains(&word) {
                    tokens.words.insert(word);
                }
            } else if c.is_ascii_digit() {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        number.push(c);
                        chars.next();
                    } else if c == '.' && !number.contains('.') {
                        // Keep "12.5" whole but not a trailing "12." before text.
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                            number.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                if followed_by_pack_unit(chars.clone(), tables) {
                    tokens.sizes.insert(number);
                } else {
                    tokens.numbers.insert(number);
                }
            } else {
                chars.next();
            }
        }

        tokens
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.numbers.is_empty() && self.sizes.is_empty()
    }

    /// Words and numbers together, unexpanded.
    pub fn plain(&self) -> BTreeSet<String> {
        self.words.union(&self.numbers).cloned().collect()
    }
}

fn followed_by_pack_unit(rest: impl Iterator<Item = char>, tables: &Tables) -> bool {
    let unit: String = rest
        .skip_while(|c| *c == ' ')
        .take_while(|c| c.is_alphabetic())
        .collect();
    !unit.is_empty() && tables.pack_units.contains(&unit)
}

/// Tokenise a product name into its alias-expanded word set.
///
/// Stop words are removed; each surviving word contributes itself plus its alias
/// target and any aliases pointing at it.
pub fn tokenize(name: &str, tables: &Tables) -> BTreeSet<String> {
    expand(&ProductTokens::parse(name, tables).words, tables)
}

/// One-hop alias expansion: every token, its alias target, and its reverse aliases.
pub fn expand(tokens: &BTreeSet<String>, tables: &Tables) -> BTreeSet<String> {
    let mut expanded = tokens.clone();
    for t in tokens {
        if let Some(target) = tables.aliases.get(t) {
            expanded.insert(target.clone());
        }
        expanded.extend(tables.aliases_of(t).map(str::to_string));
    }
    expanded
}

/// Alias expansion followed to a fixed point, so chains like
/// `vitriol → sulphuric → sulfuric` connect both ends.
pub fn expand_closure(tokens: &BTreeSet<String>, tables: &Tables) -> BTreeSet<String> {
    let mut current = tokens.clone();
    loop {
        let next = expand(&current, tables);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}
