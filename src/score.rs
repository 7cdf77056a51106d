//! Fuzzy pattern scoring.
//!
//! The matcher is a pure function over two strings: a typed pattern and a
//! candidate target (a file name or a relative path). It fills a
//! `|pattern| x |target|` dynamic-programming score matrix together with a
//! parallel consecutive-run-length matrix, then walks the run matrix
//! backward to recover which target characters the match consumed.

use smallvec::SmallVec;

/// Indices into the target consumed by a match, in ascending order.
pub type MatchPositions = SmallVec<[u32; 16]>;

/// A successful fuzzy match. `score` is always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub score: i32,
    pub positions: MatchPositions,
}

/// Awarded for every matched character.
const MATCH_BONUS: i32 = 16;
/// Extra when pattern and target agree on case.
const EXACT_CASE_BONUS: i32 = 8;
/// Extra when the match consumes the very first target character.
const FIRST_CHAR_BONUS: i32 = 32;
/// Extra when the matched character follows a separator, space, `_` or `.`.
const BOUNDARY_BONUS: i32 = 16;
/// Extra on a lowercase-to-uppercase (camelCase) transition.
const CAMEL_BONUS: i32 = 16;
/// Per unit of consecutive-run length already behind the matched character.
/// Must stay above BOUNDARY_BONUS and CAMEL_BONUS so that an unbroken
/// continuation strictly outranks the same continuation with one intervening
/// character, whatever that character is.
const CONSECUTIVE_BONUS: i32 = 24;

/// Additive weight folded into a file-name match so it ordinarily outranks
/// any path-only match of the same pattern.
pub const NAME_MATCH_WEIGHT: i32 = 4096;

/// Cell value for "no way to match this many pattern characters here".
const UNREACHABLE: i32 = i32::MIN;

#[inline]
fn chars_match(pattern_char: char, target_char: char) -> bool {
    pattern_char == target_char
        || pattern_char
            .to_lowercase()
            .eq(target_char.to_lowercase())
}

#[inline]
fn is_boundary(c: char) -> bool {
    matches!(c, '/' | '\\' | ' ' | '_' | '.')
}

/// Score `pattern` against `target`, returning the consumed target indices.
///
/// Returns `None` when either string is empty, when the pattern is longer
/// than the target, or when some pattern character has no case-insensitive
/// occurrence left to consume. Two calls with identical arguments return
/// identical results.
pub fn fuzzy_match(pattern: &str, target: &str) -> Option<FuzzyMatch> {
    let pat: Vec<char> = pattern.chars().collect();
    let tgt: Vec<char> = target.chars().collect();

    let plen = pat.len();
    let tlen = tgt.len();
    if plen == 0 || tlen == 0 || plen > tlen {
        return None;
    }

    let mut scores = vec![UNREACHABLE; plen * tlen];
    let mut runs = vec![0u32; plen * tlen];

    for p in 0..plen {
        let row = p * tlen;
        for t in 0..tlen {
            // Skip this target character: carry the score accumulated to
            // the left within the same pattern row.
            let skip = if t > 0 { scores[row + t - 1] } else { UNREACHABLE };

            let mut best = skip;
            let mut best_run = 0u32;

            if chars_match(pat[p], tgt[t]) {
                let (diag, prev_run) = if p == 0 {
                    // No pattern characters before this one; any target
                    // prefix may be skipped for free.
                    (0, 0)
                } else if t > 0 {
                    let prev = row - tlen + t - 1;
                    (scores[prev], runs[prev])
                } else {
                    (UNREACHABLE, 0)
                };

                if diag != UNREACHABLE {
                    let mut bonus = MATCH_BONUS;
                    if pat[p] == tgt[t] {
                        bonus += EXACT_CASE_BONUS;
                    }
                    if t == 0 {
                        bonus += FIRST_CHAR_BONUS;
                    } else {
                        let prev_char = tgt[t - 1];
                        if is_boundary(prev_char) {
                            bonus += BOUNDARY_BONUS;
                        }
                        if prev_char.is_lowercase() && tgt[t].is_uppercase() {
                            bonus += CAMEL_BONUS;
                        }
                    }
                    bonus = bonus.saturating_add(
                        CONSECUTIVE_BONUS.saturating_mul(prev_run as i32),
                    );

                    let matched = diag.saturating_add(bonus);
                    // Ties break toward matching.
                    if matched >= best {
                        best = matched;
                        best_run = prev_run + 1;
                    }
                }
            }

            scores[row + t] = best;
            runs[row + t] = best_run;
        }
    }

    let score = scores[(plen - 1) * tlen + (tlen - 1)];
    if score == UNREACHABLE {
        return None;
    }

    // Recover consumed indices by walking the run matrix backward from the
    // final cell: a positive run length means the pattern character matched
    // here, a zero means the cell's score was carried in from the left.
    let mut positions = MatchPositions::new();
    let mut p = plen - 1;
    let mut t = tlen - 1;
    loop {
        if runs[p * tlen + t] > 0 {
            positions.push(t as u32);
            if p == 0 {
                break;
            }
            p -= 1;
            t -= 1;
        } else {
            t -= 1;
        }
    }
    positions.reverse();

    Some(FuzzyMatch { score, positions })
}

/// Score-only wrapper: 0 means no match.
pub fn fuzzy_score(pattern: &str, target: &str) -> i32 {
    fuzzy_match(pattern, target).map_or(0, |m| m.score)
}
