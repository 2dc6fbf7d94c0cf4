use serde::Serialize;
use strsim::levenshtein;

/// Outcome of comparing a candidate token against a brand set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Similarity {
    Exact { brand: String },
    Typo { brand: String, distance: usize },
    Unrelated,
}

impl Similarity {
    pub fn is_exact(&self) -> bool {
        matches!(self, Similarity::Exact { .. })
    }
}

/// Classify `candidate` against `brands` by Levenshtein distance.
///
/// An identical brand always wins, so an official name is never reported as a
/// typo of a neighbouring brand. Otherwise the closest brand (first in
/// iteration order on ties) is a typo when its distance is within
/// `1..=max_distance`.
pub fn classify<I>(candidate: &str, brands: I, max_distance: usize) -> Similarity
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return Similarity::Unrelated;
    }

    let brands: Vec<String> = brands
        .into_iter()
        .map(|brand| brand.as_ref().trim().to_lowercase())
        .filter(|brand| !brand.is_empty())
        .collect();

    if let Some(brand) = brands.iter().find(|brand| **brand == candidate) {
        return Similarity::Exact {
            brand: brand.clone(),
        };
    }

    let closest = brands
        .iter()
        .map(|brand| (brand, levenshtein(&candidate, brand)))
        .fold(None, |best: Option<(&String, usize)>, (brand, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((brand, distance)),
        });

    match closest {
        Some((brand, distance)) if distance > 0 && distance <= max_distance => Similarity::Typo {
            brand: brand.clone(),
            distance,
        },
        _ => Similarity::Unrelated,
    }
}

/// Adversarial shapes looked for in the tokens of an otherwise trusted domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPattern {
    RepeatedCharacters,
    RepeatedSequence,
    NumbersAfterBrand,
    NumbersBeforeBrand,
    RepeatedWord,
}

impl TokenPattern {
    const ORDERED: [TokenPattern; 5] = [
        TokenPattern::RepeatedCharacters,
        TokenPattern::RepeatedSequence,
        TokenPattern::NumbersAfterBrand,
        TokenPattern::NumbersBeforeBrand,
        TokenPattern::RepeatedWord,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            TokenPattern::RepeatedCharacters => "Repeated characters in domain",
            TokenPattern::RepeatedSequence => "Repeated sequence in domain",
            TokenPattern::NumbersAfterBrand => "Numbers after brand name",
            TokenPattern::NumbersBeforeBrand => "Numbers before brand name",
            TokenPattern::RepeatedWord => "Repeated words with separators",
        }
    }

    fn matches(&self, token: &[char]) -> bool {
        let n = token.len();
        match self {
            // e.g. gooogle
            TokenPattern::RepeatedCharacters => token
                .windows(3)
                .any(|w| w[0] == w[1] && w[1] == w[2]),
            // e.g. googlegoogle
            TokenPattern::RepeatedSequence => (2..=n / 2).any(|len| {
                (0..=n - 2 * len).any(|i| token[i..i + len] == token[i + len..i + 2 * len])
            }),
            // e.g. google123
            TokenPattern::NumbersAfterBrand => (3..n).any(|k| token[k].is_ascii_digit()),
            // e.g. 123google
            TokenPattern::NumbersBeforeBrand => {
                (0..n).any(|k| token[k].is_ascii_digit() && n - k - 1 >= 3)
            }
            // e.g. googleaccountgoogle
            TokenPattern::RepeatedWord => (3..=n / 2).any(|len| {
                (0..=n - 2 * len).any(|i| {
                    (i + len..=n - len).any(|j| token[i..i + len] == token[j..j + len])
                })
            }),
        }
    }
}

/// Split a domain label into word tokens (`google-account` -> `google`, `account`).
pub fn domain_tokens(label: &str) -> Vec<String> {
    label
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// First adversarial pattern, in fixed priority order, found in any token.
pub fn find_token_pattern<S: AsRef<str>>(tokens: &[S]) -> Option<TokenPattern> {
    let tokens: Vec<Vec<char>> = tokens
        .iter()
        .map(|token| token.as_ref().to_lowercase().chars().collect())
        .collect();

    TokenPattern::ORDERED
        .into_iter()
        .find(|pattern| tokens.iter().any(|token| pattern.matches(token)))
}
