use any_ascii::any_ascii;
use itertools::Itertools;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this carry too little signal to be compared.
const MIN_TOKEN_LEN: usize = 3;

/// Lowercase, ASCII-transliterated form with collapsed whitespace.
pub(crate) fn normalize(value: &str) -> String {
  let value: String = value.nfkc().collect();

  any_ascii(&value)
    .to_lowercase()
    .chars()
    .map(|c| match c {
      c if c.is_alphanumeric() => c,
      _ => ' ',
    })
    .collect::<String>()
    .split_whitespace()
    .join(" ")
}

pub(crate) fn tokenize(value: &str) -> Vec<String> {
  normalize(value).split(' ').filter(|token| token.len() >= MIN_TOKEN_LEN).map(str::to_string).unique().collect()
}

pub(crate) fn same_label(lhs: &str, rhs: &str) -> bool {
  let lhs = normalize(lhs);

  !lhs.is_empty() && lhs == normalize(rhs)
}

/// Share of `needle` tokens found in `haystack`, where a token is found when
/// it is equal to, contained in or contains a `haystack` token.
pub(crate) fn token_overlap(haystack: &str, needle: &str) -> f64 {
  let needles = tokenize(needle);
  let haystack = tokenize(haystack);

  if needles.is_empty() || haystack.is_empty() {
    return 0.0;
  }

  let found = needles.iter().filter(|needle| haystack.iter().any(|token| token.contains(needle.as_str()) || needle.contains(token.as_str()))).count();

  found as f64 / needles.len() as f64
}
