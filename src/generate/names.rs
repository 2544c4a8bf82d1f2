//! Readable, unique synthetic student names

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

const FIRST: &[&str] = &[
    "A", "Be", "Ca", "Da", "El", "Fa", "Gi", "Ha", "I", "Ja", "Ka", "La", "Ma", "Na", "O", "Pa",
    "Qi", "Ra", "Sa", "Ta", "Uma", "Va", "Wa", "Xa", "Ya", "Za",
];
const LAST_STEM: &[&str] = &[
    "Al", "Ben", "Car", "Dia", "Fern", "Gon", "Ham", "Ivan", "Jun", "Kim", "Lee", "Mor", "Nov",
    "Omar", "Park", "Quan", "Ross", "Sing", "Tan", "Umar", "Val", "Wang", "Xu", "Yam", "Zar",
];
const LAST_SUFFIX: &[&str] = &[
    "son", "s", "ez", "ov", "ski", "sen", "li", "chi", "yan", "man", "ford", "elli", "dell",
    "berg", "wala", "ova", "ian", "aro", "etti", "ato", "ino",
];
const MIDDLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `n` distinct names like `Bena Parkson K.`, deterministic for a given RNG state.
///
/// Once the syllable space is exhausted a numeric suffix keeps names unique.
pub fn unique_names<R: Rng>(n: usize, rng: &mut R) -> Vec<String> {
    let mut combos: Vec<(&str, String)> = Vec::with_capacity(FIRST.len() * LAST_STEM.len() * LAST_SUFFIX.len());
    for first in FIRST {
        for stem in LAST_STEM {
            for suffix in LAST_SUFFIX {
                combos.push((*first, format!("{}{}", stem, suffix)));
            }
        }
    }
    combos.shuffle(rng);

    let mut out = Vec::with_capacity(n);
    let mut used = HashSet::with_capacity(n);
    let mut attempt = 0usize;

    while out.len() < n {
        let (first, last) = &combos[attempt % combos.len()];
        let middle = MIDDLE[rng.random_range(0..MIDDLE.len())] as char;
        let mut candidate = format!("{}na {} {}.", first, last, middle);
        if attempt >= combos.len() * 2 {
            candidate.push_str(&attempt.to_string());
        }
        if used.insert(candidate.clone()) {
            out.push(candidate);
        }
        attempt += 1;
    }

    out
}
