//! Account-holder name canonicalization and comparison.

use std::collections::HashSet;

/// Honorific tokens that commonly precede Indonesian account-holder names.
pub const INDONESIAN_HONORIFICS: &[&str] = &[
    "bapak", "bpk", "ibu", "sdr", "sdri", "saudara", "saudari", "tn", "ny", "nn", "mr", "mrs",
    "ms", "dr",
];

/// Shortest run of trailing `x` that marks a masked token ("marxxx").
const MASK_MIN_RUN: usize = 2;

/// Canonicalizes human names for comparison.
///
/// Normalization is total and deterministic: diacritics are folded, case is
/// folded, punctuation becomes whitespace, whitespace is collapsed, and any
/// configured honorifics are dropped from the front of the name.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    honorifics: HashSet<String>,
}

impl Normalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_honorifics<I, S>(honorifics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            honorifics: honorifics
                .into_iter()
                .map(|h| h.as_ref().to_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn indonesian() -> Self {
        Self::with_honorifics(INDONESIAN_HONORIFICS)
    }

    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let folded: String = raw
            .chars()
            .flat_map(char::to_lowercase)
            .filter_map(fold_diacritic)
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let mut tokens = folded.split_whitespace().peekable();
        while tokens.next_if(|t| self.honorifics.contains(*t)).is_some() {}
        tokens.collect::<Vec<_>>().join(" ")
    }
}

/// Normalize with no honorific stripping.
#[must_use]
pub fn normalize(raw: &str) -> String {
    Normalizer::new().normalize(raw)
}

fn fold_diacritic(c: char) -> Option<char> {
    let folded = match c {
        // combining marks left behind by lowercasing (e.g. 'İ')
        '\u{0300}'..='\u{036f}' => return None,
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ś' | 'š' | 'ş' => 's',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    };
    Some(folded)
}

/// Structured result of comparing an expected name with the provider's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVerdict {
    Exact,
    Truncated,
    Different,
    ExpectedEmpty,
}

impl MatchVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Truncated => "truncated",
            Self::Different => "different",
            Self::ExpectedEmpty => "expected_empty",
        }
    }
}

impl std::fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares names on their normalized forms.
///
/// A `Truncated` verdict requires the first token to match whole; after that
/// the shorter name may stop early, either between tokens or inside its final
/// token (providers cut long names at a fixed width).
///
/// With masking enabled, a token of the *actual* name ending in two or more
/// `x` ("marxxx") matches any expected token that starts with the visible part.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    normalizer: Normalizer,
    masked: bool,
}

impl Comparator {
    #[must_use]
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            masked: false,
        }
    }

    #[must_use]
    pub fn masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    #[must_use]
    pub fn compare(&self, expected: &str, actual: &str) -> MatchVerdict {
        let expected = self.normalizer.normalize(expected);
        if expected.is_empty() {
            return MatchVerdict::ExpectedEmpty;
        }
        let actual = self.normalizer.normalize(actual);

        let exp: Vec<&str> = expected.split_whitespace().collect();
        let act: Vec<&str> = actual.split_whitespace().collect();

        if exp.len() == act.len() && exp.iter().zip(&act).all(|(e, a)| self.same_token(e, a)) {
            return MatchVerdict::Exact;
        }

        if self.is_truncation(&act, &exp, true) || self.is_truncation(&exp, &act, false) {
            MatchVerdict::Truncated
        } else {
            MatchVerdict::Different
        }
    }

    fn same_token(&self, expected: &str, actual: &str) -> bool {
        expected == actual
            || (self.masked
                && unmask(actual)
                    .is_some_and(|visible| expected.len() > visible.len() && expected.starts_with(visible)))
    }

    fn is_truncation(&self, short: &[&str], long: &[&str], short_is_actual: bool) -> bool {
        let Some((last, leading)) = short.split_last() else {
            return false;
        };
        if short.len() > long.len() {
            return false;
        }

        let whole = |s: &str, l: &str| {
            if short_is_actual {
                self.same_token(l, s)
            } else {
                self.same_token(s, l)
            }
        };

        if !leading.iter().zip(long).all(|(s, l)| whole(s, l)) {
            return false;
        }

        let aligned = long[leading.len()];
        if whole(last, aligned) {
            return long.len() > short.len();
        }
        // first token must be whole; only later tokens may be cut
        !leading.is_empty() && aligned.len() > last.len() && aligned.starts_with(last)
    }
}

/// Default comparator: no honorifics, no masking.
#[must_use]
pub fn compare(expected: &str, actual: &str) -> MatchVerdict {
    Comparator::default().compare(expected, actual)
}

fn unmask(token: &str) -> Option<&str> {
    let visible = token.trim_end_matches('x');
    (!visible.is_empty() && token.len() - visible.len() >= MASK_MIN_RUN).then_some(visible)
}
