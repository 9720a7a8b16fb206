//! # Turkish Collation
//!
//! Locale-aware string ordering for teacher branches.
//!
//! Comparison runs in three levels, like a UCA collator at tertiary strength:
//! 1. Primary: base letters in Turkish alphabet order
//!    (`a b c ç d e f g ğ h ı i j k l m n o ö p q r s ş t u ü v w x y z`),
//!    with spaces/punctuation before digits before letters.
//! 2. Secondary: circumflex and other accents (`â` after `a`).
//! 3. Tertiary: lowercase before uppercase.
//!
//! Casing follows Turkish rules: `I` lowercases to `ı`, `İ` to `i`.

use std::cmp::Ordering;

/// Turkish alphabet (plus q, w, x in Latin position), lowercase.
const ALPHABET: [char; 32] = [
    'a', 'b', 'c', 'ç', 'd', 'e', 'f', 'g', 'ğ', 'h', 'ı', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'ö', 'p', 'q', 'r', 's', 'ş', 't', 'u', 'ü', 'v', 'w', 'x', 'y', 'z',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Group {
    Punctuation,
    Digit,
    Letter,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Element {
    primary: (Group, u32),
    secondary: u8,
    tertiary: u8,
}

/// Lowercase `c` the Turkish way. Returns the lowercase char and whether the
/// input was uppercase.
fn fold_case(c: char) -> (char, bool) {
    match c {
        'I' => ('ı', true),
        'İ' => ('i', true),
        _ if c.is_uppercase() => (c.to_lowercase().next().unwrap_or(c), true),
        _ => (c, false),
    }
}

/// Strip accents that are not letters of their own in Turkish.
fn fold_accent(c: char) -> (char, u8) {
    match c {
        'â' | 'á' | 'à' => ('a', 1),
        'ê' | 'é' | 'è' => ('e', 1),
        'î' | 'í' | 'ì' => ('i', 1),
        'ô' | 'ó' | 'ò' => ('o', 1),
        'û' | 'ú' | 'ù' => ('u', 1),
        _ => (c, 0),
    }
}

fn element(c: char) -> Element {
    let (lower, upper) = fold_case(c);
    let (base, secondary) = fold_accent(lower);
    let tertiary = u8::from(upper);

    let primary = if let Some(index) = ALPHABET.iter().position(|&l| l == base) {
        (Group::Letter, index as u32)
    } else if let Some(digit) = base.to_digit(10) {
        (Group::Digit, digit)
    } else if base.is_whitespace() || base.is_ascii_punctuation() {
        (Group::Punctuation, base as u32)
    } else {
        (Group::Other, base as u32)
    };

    Element {
        primary,
        secondary,
        tertiary,
    }
}

/// Compare two strings under Turkish collation.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let left: Vec<Element> = a.chars().map(element).collect();
    let right: Vec<Element> = b.chars().map(element).collect();

    left.iter()
        .map(|e| e.primary)
        .cmp(right.iter().map(|e| e.primary))
        .then_with(|| {
            left.iter()
                .map(|e| e.secondary)
                .cmp(right.iter().map(|e| e.secondary))
        })
        .then_with(|| {
            left.iter()
                .map(|e| e.tertiary)
                .cmp(right.iter().map(|e| e.tertiary))
        })
}

// =============================================================================
// TESTS
// =============================================================================
