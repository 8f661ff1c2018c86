//! Odds label canonicalization
//!
//! Bookmakers label the same outcome differently: `"Home"`, `"1"`, the team's
//! full name, its short code, or `"<team> | Yes"` for combined markets. Every
//! label of a bookmaker's odds list is rewritten to the `1` / `X` / `2`
//! vocabulary, with any qualifier joined by `/` and all whitespace removed
//! (`"Chelsea | No"` -> `"2/No"`).
//!
//! Team labels, qualified or bare, are resolved in two passes over one
//! bookmaker's entries for a market:
//!
//! 1. Literal tokens (`1`, `X`, `2`) are taken as-is, and every *banker* (a
//!    token sharing text with exactly one of the team names) is placed on
//!    that team's side.
//! 2. If the bankers named only one side, every other team token that is not
//!    positively matched (short code, two-word structure) is the other side.
//!    Otherwise each token is resolved on its own: short code, then two-word
//!    structure, then edit distance.
//!
//! Neither pass looks at entry order, so shuffling a group never moves an
//! outcome to the other side. Tokens that cannot be placed are returned as
//! [`Resolution::Unresolved`], never defaulted to a side.

use strsim::levenshtein;
use tracing::{debug, warn};

use crate::models::{FixtureContext, OddsEntry};

pub const HOME: &str = "1";
pub const DRAW: &str = "X";
pub const AWAY: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Draw,
    Away,
}

impl Side {
    pub fn as_label(self) -> &'static str {
        match self {
            Side::Home => HOME,
            Side::Draw => DRAW,
            Side::Away => AWAY,
        }
    }

    fn opposite(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
            Side::Draw => Side::Draw,
        }
    }

    fn from_literal(token: &str) -> Option<Self> {
        match token {
            HOME => Some(Side::Home),
            DRAW => Some(Side::Draw),
            AWAY => Some(Side::Away),
            _ => None,
        }
    }
}

/// Which rule placed a team token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Token was already `1`, `X` or `2`
    Literal,
    /// Token and team name contain one another
    Substring,
    /// Placed by elimination against the one side named outright
    Inferred,
    /// Upper-case token equal to a team short code
    ShortCode,
    /// First word and second initial match a multi-word team name
    Structural,
    /// Closer by edit distance
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Label names no team
    Plain,
    Resolved { side: Side, rule: Rule },
    Unresolved,
}

/// An odds entry with its label in canonical form
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalOdds {
    pub label: String,
    pub value: String,
    pub total: Option<String>,
    pub resolution: Resolution,
}

impl CanonicalOdds {
    pub fn is_resolved(&self) -> bool {
        self.resolution != Resolution::Unresolved
    }
}

/// Replace `|` with `/` and strip every whitespace character.
pub fn normalize_punctuation(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '|' { '/' } else { c })
        .collect()
}

/// Rewrite whole `Home` / `Draw` / `Away` segments to `1` / `X` / `2`.
///
/// Segments are delimited by `|` and `/`, so a team called "Homestead" keeps
/// its name.
pub fn substitute_keywords(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut rest = label;
    loop {
        match rest.find(|c: char| c == '|' || c == '/') {
            Some(idx) => {
                out.push_str(&substitute_segment(&rest[..idx]));
                out.push_str(&rest[idx..idx + 1]);
                rest = &rest[idx + 1..];
            }
            None => {
                out.push_str(&substitute_segment(rest));
                return out;
            }
        }
    }
}

fn substitute_segment(segment: &str) -> String {
    let keyword = segment.trim();
    let replacement = match keyword {
        "Home" => HOME,
        "Draw" => DRAW,
        "Away" => AWAY,
        _ => return segment.to_string(),
    };
    segment.replacen(keyword, replacement, 1)
}

/// Bare labels that never name a team, even when a team name contains them.
const OUTCOME_WORDS: [&str; 5] = ["Yes", "No", "Over", "Under", "Exactly"];

#[derive(Debug)]
enum ParsedLabel {
    Plain(String),
    /// `outcome` is `None` for a bare team label such as `"Chelsea"`.
    Team { token: String, outcome: Option<String> },
}

impl ParsedLabel {
    fn parse(label: &str, ctx: &FixtureContext) -> Self {
        let label = substitute_keywords(label);
        if let Some((team, outcome)) = label.split_once('|') {
            return ParsedLabel::Team {
                token: team.trim().to_string(),
                outcome: Some(outcome.to_string()),
            };
        }
        if names_team(label.trim(), ctx) {
            return ParsedLabel::Team {
                token: label.trim().to_string(),
                outcome: None,
            };
        }
        ParsedLabel::Plain(label)
    }
}

/// Whether a label without `|` is a team: it contains a full team name,
/// equals a short code, or matches a name structurally.
fn names_team(token: &str, ctx: &FixtureContext) -> bool {
    if token.is_empty()
        || token.contains('/')
        || Side::from_literal(token).is_some()
        || OUTCOME_WORDS.contains(&token)
    {
        return false;
    }
    is_within(&ctx.home, token)
        || is_within(&ctx.away, token)
        || short_code_side(token, ctx).is_some()
        || structural_side(token, ctx).is_some()
}

/// Canonicalize every label of one bookmaker's odds for one market.
///
/// The result does not depend on the order of `entries`: every team token is
/// placed from its own text plus the set of sides named outright somewhere
/// in the group.
pub fn canonicalize(entries: &[OddsEntry], ctx: &FixtureContext) -> Vec<CanonicalOdds> {
    let parsed: Vec<ParsedLabel> = entries
        .iter()
        .map(|e| ParsedLabel::parse(&e.label, ctx))
        .collect();

    // Pass 1: literal tokens and bankers, the tokens sharing text with a name.
    let mut resolutions: Vec<Resolution> = parsed
        .iter()
        .map(|p| match p {
            ParsedLabel::Plain(_) => Resolution::Plain,
            ParsedLabel::Team { token, .. } => {
                if let Some(side) = Side::from_literal(token) {
                    Resolution::Resolved {
                        side,
                        rule: Rule::Literal,
                    }
                } else if let Some(side) = substring_side(token, ctx) {
                    Resolution::Resolved {
                        side,
                        rule: Rule::Substring,
                    }
                } else {
                    Resolution::Unresolved
                }
            }
        })
        .collect();

    let anchored = |wanted: Side| {
        resolutions.iter().any(|r| {
            matches!(r, Resolution::Resolved { side, rule: Rule::Substring } if *side == wanted)
        })
    };
    let anchor = match (anchored(Side::Home), anchored(Side::Away)) {
        (true, false) => Some(Side::Home),
        (false, true) => Some(Side::Away),
        _ => None,
    };

    // Pass 2: the remaining team tokens.
    for (index, p) in parsed.iter().enumerate() {
        let token = match p {
            ParsedLabel::Team { token, .. } if resolutions[index] == Resolution::Unresolved => token,
            _ => continue,
        };
        if token.is_empty() {
            warn!("empty team token");
            continue;
        }
        resolutions[index] = match anchor {
            Some(side) => resolve_against(token, side, ctx),
            None => resolve_token(token, ctx),
        };
    }

    entries
        .iter()
        .zip(&parsed)
        .zip(resolutions)
        .map(|((entry, parsed), resolution)| {
            let label = match (parsed, resolution) {
                (ParsedLabel::Plain(label), _) => normalize_punctuation(label),
                (ParsedLabel::Team { outcome, .. }, Resolution::Resolved { side, .. }) => {
                    qualified(side.as_label(), outcome.as_deref())
                }
                (ParsedLabel::Team { token, outcome }, _) => qualified(token, outcome.as_deref()),
            };
            debug!(raw = %entry.label, label = %label, ?resolution, "canonical label");
            CanonicalOdds {
                label,
                value: entry.value.clone(),
                total: entry.total.clone(),
                resolution,
            }
        })
        .collect()
}

fn qualified(head: &str, outcome: Option<&str>) -> String {
    match outcome {
        Some(outcome) => normalize_punctuation(&format!("{}|{}", head, outcome)),
        None => normalize_punctuation(head),
    }
}

fn is_within(token: &str, name: &str) -> bool {
    !token.is_empty() && !name.is_empty() && name.contains(token)
}

/// Side whose name shares text with `token`; `None` when both or neither do.
fn substring_side(token: &str, ctx: &FixtureContext) -> Option<Side> {
    let related = |name: &str| is_within(token, name) || is_within(name, token);
    match (related(&ctx.home), related(&ctx.away)) {
        (true, false) => Some(Side::Home),
        (false, true) => Some(Side::Away),
        _ => None,
    }
}

fn is_acronym(token: &str) -> bool {
    token.to_uppercase() == token
}

fn short_code_side(token: &str, ctx: &FixtureContext) -> Option<Side> {
    if ctx.home_short.as_deref() == Some(token) {
        Some(Side::Home)
    } else if ctx.away_short.as_deref() == Some(token) {
        Some(Side::Away)
    } else {
        None
    }
}

/// Only one side was named outright: anything not positively matched to a
/// team is its counterpart.
fn resolve_against(token: &str, anchored: Side, ctx: &FixtureContext) -> Resolution {
    if let Some(side) = short_code_side(token, ctx) {
        return Resolution::Resolved {
            side,
            rule: Rule::ShortCode,
        };
    }
    if is_acronym(token) {
        warn!(token, "acronym matches no short code");
        return Resolution::Unresolved;
    }
    if let Some(side) = structural_side(token, ctx) {
        return Resolution::Resolved {
            side,
            rule: Rule::Structural,
        };
    }
    let side = anchored.opposite();
    debug!(token, side = side.as_label(), "inferred by elimination");
    Resolution::Resolved {
        side,
        rule: Rule::Inferred,
    }
}

/// Resolve a token when no single side was named outright.
fn resolve_token(token: &str, ctx: &FixtureContext) -> Resolution {
    // Acronyms: QPR, PSG
    if is_acronym(token) {
        return match short_code_side(token, ctx) {
            Some(side) => Resolution::Resolved {
                side,
                rule: Rule::ShortCode,
            },
            None => {
                warn!(
                    token,
                    home_short = ?ctx.home_short,
                    away_short = ?ctx.away_short,
                    "ambiguous acronym"
                );
                Resolution::Unresolved
            }
        };
    }

    if let Some(side) = structural_side(token, ctx) {
        return Resolution::Resolved {
            side,
            rule: Rule::Structural,
        };
    }

    let side = distance_side(token, ctx);
    debug!(token, home = %ctx.home, away = %ctx.away, side = side.as_label(), "chose by edit distance");
    Resolution::Resolved {
        side,
        rule: Rule::Distance,
    }
}

/// "Man Utd" against "Manchester United": the first word sits inside the
/// team's first word and the second words share an initial.
fn structural_side(token: &str, ctx: &FixtureContext) -> Option<Side> {
    let words: Vec<&str> = token.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    let matches = |name: &str| {
        let name_words: Vec<&str> = name.split_whitespace().collect();
        name_words.len() > 1
            && name_words[0].contains(words[0])
            && words[1].chars().next() == name_words[1].chars().next()
    };

    if matches(&ctx.home) {
        Some(Side::Home)
    } else if matches(&ctx.away) {
        Some(Side::Away)
    } else {
        None
    }
}

/// Ties go to the away side.
fn distance_side(token: &str, ctx: &FixtureContext) -> Side {
    if levenshtein(token, &ctx.home) >= levenshtein(token, &ctx.away) {
        Side::Away
    } else {
        Side::Home
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(labels: &[&str]) -> Vec<OddsEntry> {
        labels
            .iter()
            .map(|l| OddsEntry::new(l, "2.00", None))
            .collect()
    }

    fn labels(out: &[CanonicalOdds]) -> Vec<&str> {
        out.iter().map(|o| o.label.as_str()).collect()
    }

    fn united_chelsea() -> FixtureContext {
        FixtureContext::new("Manchester United", "Chelsea").with_short_codes("MUN", "CHE")
    }

    #[test]
    fn plain_keywords_are_substituted() {
        let out = canonicalize(&entries(&["Home", "Draw", "Away", "Over", "Yes"]), &united_chelsea());
        assert_eq!(labels(&out), vec!["1", "X", "2", "Over", "Yes"]);
        assert!(out.iter().all(|o| o.resolution == Resolution::Plain));
    }

    #[test]
    fn keyword_substitution_is_segment_wise() {
        assert_eq!(substitute_keywords("Home/Draw"), "1/X");
        assert_eq!(substitute_keywords("Draw | Yes"), "X | Yes");
        assert_eq!(substitute_keywords("Homestead | Yes"), "Homestead | Yes");
        assert_eq!(substitute_keywords("Away"), "2");
    }

    #[test]
    fn canonical_labels_are_unchanged_on_second_pass() {
        let ctx = united_chelsea();
        let first = canonicalize(
            &entries(&[
                "Manchester United | Yes",
                "Chelsea | No",
                "Draw | Yes",
                "Home",
                "Over",
            ]),
            &ctx,
        );
        let again: Vec<OddsEntry> = first
            .iter()
            .map(|o| OddsEntry::new(&o.label, &o.value, o.total.as_deref()))
            .collect();
        let second = canonicalize(&again, &ctx);
        assert_eq!(labels(&first), labels(&second));
        assert!(second
            .iter()
            .all(|o| !o.label.contains('|') && !o.label.contains(char::is_whitespace)));
    }

    #[test]
    fn counterpart_of_exact_home_token_is_away() {
        let ctx = FixtureContext::new("Manchester United", "Chelsea");
        // Neither token of the second entry resembles "Chelsea".
        let out = canonicalize(&entries(&["Manchester United | Yes", "Blues FC | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["1/Yes", "2/Yes"]);
        assert_eq!(
            out[1].resolution,
            Resolution::Resolved {
                side: Side::Away,
                rule: Rule::Inferred
            }
        );
    }

    #[test]
    fn anchor_order_does_not_depend_on_position() {
        let ctx = FixtureContext::new("Manchester United", "Chelsea");
        let out = canonicalize(&entries(&["Blues FC | No", "Manchester United | No"]), &ctx);
        assert_eq!(labels(&out), vec!["2/No", "1/No"]);
    }

    #[test]
    fn shuffled_group_resolves_identically() {
        let ctx = FixtureContext::new("Manchester United", "Chelsea");
        let forward = canonicalize(
            &entries(&["Manchester United | Yes", "Chelsea | Yes", "Man Utd | No"]),
            &ctx,
        );
        let shuffled = canonicalize(
            &entries(&["Chelsea | Yes", "Man Utd | No", "Manchester United | Yes"]),
            &ctx,
        );
        assert_eq!(labels(&forward), vec!["1/Yes", "2/Yes", "1/No"]);
        assert_eq!(labels(&shuffled), vec!["2/Yes", "1/No", "1/Yes"]);
        assert_eq!(
            shuffled[1].resolution,
            Resolution::Resolved {
                side: Side::Home,
                rule: Rule::Structural
            }
        );
    }

    #[test]
    fn short_code_beats_elimination() {
        let ctx = united_chelsea();
        let out = canonicalize(&entries(&["Manchester United | Yes", "MUN | No", "LFC | No"]), &ctx);
        assert_eq!(out[1].label, "1/No");
        assert_eq!(out[2].resolution, Resolution::Unresolved);
    }

    #[test]
    fn bare_team_names_become_sides() {
        let ctx = united_chelsea();
        let out = canonicalize(&entries(&["Manchester United", "Draw", "Chelsea"]), &ctx);
        assert_eq!(labels(&out), vec!["1", "X", "2"]);
        assert_eq!(
            out[0].resolution,
            Resolution::Resolved {
                side: Side::Home,
                rule: Rule::Substring
            }
        );
        assert_eq!(out[1].resolution, Resolution::Plain);

        let out = canonicalize(&entries(&["CHE", "Man United"]), &ctx);
        assert_eq!(labels(&out), vec!["2", "1"]);
        assert!(out.iter().all(CanonicalOdds::is_resolved));
    }

    #[test]
    fn outcome_words_inside_team_names_stay_plain() {
        let ctx = FixtureContext::new("Nottingham Forest", "Bristol Rovers");
        let out = canonicalize(&entries(&["No", "Yes", "Over"]), &ctx);
        assert_eq!(labels(&out), vec!["No", "Yes", "Over"]);
        assert!(out.iter().all(|o| o.resolution == Resolution::Plain));
    }

    #[test]
    fn empty_team_token_is_unresolved_with_or_without_anchor() {
        let ctx = FixtureContext::new("Manchester United", "Chelsea");
        let out = canonicalize(&entries(&["Manchester United | Yes", " | Yes"]), &ctx);
        assert_eq!(out[0].label, "1/Yes");
        assert_eq!(out[1].resolution, Resolution::Unresolved);

        let out = canonicalize(&entries(&[" | Yes"]), &ctx);
        assert_eq!(out[0].resolution, Resolution::Unresolved);
    }

    #[test]
    fn same_team_different_outcome_shares_side() {
        let ctx = united_chelsea();
        let out = canonicalize(
            &entries(&[
                "Man United | Yes",
                "Chelsea | Yes",
                "Man United | No",
                "Chelsea | No",
                "Draw | Yes",
                "Draw | No",
            ]),
            &ctx,
        );
        assert_eq!(
            labels(&out),
            vec!["1/Yes", "2/Yes", "1/No", "2/No", "X/Yes", "X/No"]
        );
    }

    #[test]
    fn away_anchor_mirrors_home() {
        let ctx = FixtureContext::new("Wolverhampton Wanderers", "Arsenal");
        let out = canonicalize(&entries(&["Wolves | Yes", "Arsenal | Yes", "Wolves | No"]), &ctx);
        assert_eq!(labels(&out), vec!["1/Yes", "2/Yes", "1/No"]);
    }

    #[test]
    fn acronym_matches_short_code() {
        let ctx = FixtureContext::new("Queens Park Rangers", "Reading").with_short_codes("QPR", "REA");
        let out = canonicalize(&entries(&["QPR | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["1/Yes"]);
        assert_eq!(
            out[0].resolution,
            Resolution::Resolved {
                side: Side::Home,
                rule: Rule::ShortCode
            }
        );

        let out = canonicalize(&entries(&["REA | No"]), &ctx);
        assert_eq!(labels(&out), vec!["2/No"]);
    }

    #[test]
    fn unknown_acronym_stays_unresolved() {
        let ctx = FixtureContext::new("Queens Park Rangers", "Reading").with_short_codes("QUE", "REA");
        let out = canonicalize(&entries(&["QPR | Yes"]), &ctx);
        assert_eq!(out[0].resolution, Resolution::Unresolved);
        assert!(!out[0].is_resolved());
        assert_eq!(out[0].label, "QPR/Yes");

        let no_codes = FixtureContext::new("Queens Park Rangers", "Reading");
        let out = canonicalize(&entries(&["QPR | Yes"]), &no_codes);
        assert_eq!(out[0].resolution, Resolution::Unresolved);
    }

    #[test]
    fn structural_match_on_multi_word_token() {
        let ctx = FixtureContext::new("Sheffield Wednesday", "Sheffield United");
        let out = canonicalize(&entries(&["Sheff Utd | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["2/Yes"]);
        assert_eq!(
            out[0].resolution,
            Resolution::Resolved {
                side: Side::Away,
                rule: Rule::Structural
            }
        );

        let out = canonicalize(&entries(&["Sheff Wed | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["1/Yes"]);
    }

    #[test]
    fn edit_distance_picks_the_closer_name() {
        let ctx = FixtureContext::new("Tottenham", "Liverpool");
        let out = canonicalize(&entries(&["Totenham | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["1/Yes"]);
        assert_eq!(
            out[0].resolution,
            Resolution::Resolved {
                side: Side::Home,
                rule: Rule::Distance
            }
        );
    }

    #[test]
    fn edit_distance_tie_goes_away() {
        // "Bbb" is two edits from both names.
        let ctx = FixtureContext::new("Abc", "Bcd");
        assert_eq!(levenshtein("Bbb", "Abc"), levenshtein("Bbb", "Bcd"));
        let out = canonicalize(&entries(&["Bbb | Yes"]), &ctx);
        assert_eq!(labels(&out), vec!["2/Yes"]);
    }

    #[test]
    fn literal_tokens_are_kept_and_never_inferred() {
        let ctx = united_chelsea();
        let out = canonicalize(
            &entries(&["Manchester United | Yes", "1 | No", "X | Yes", "2 | No"]),
            &ctx,
        );
        assert_eq!(labels(&out), vec!["1/Yes", "1/No", "X/Yes", "2/No"]);
    }

    #[test]
    fn result_and_btts_end_to_end() {
        let ctx = FixtureContext::new("Manchester United", "Chelsea");
        let out = canonicalize(
            &entries(&["Manchester United | Yes", "Chelsea | No", "1 | Yes"]),
            &ctx,
        );
        assert_eq!(labels(&out), vec!["1/Yes", "2/No", "1/Yes"]);
        assert!(out.iter().all(CanonicalOdds::is_resolved));
    }

    #[test]
    fn values_and_totals_are_carried() {
        let ctx = united_chelsea();
        let input = vec![OddsEntry::new("Over", "1.90", Some("2.5"))];
        let out = canonicalize(&input, &ctx);
        assert_eq!(out[0].value, "1.90");
        assert_eq!(out[0].total.as_deref(), Some("2.5"));
    }

    #[test]
    fn normalization_strips_whitespace_and_pipes() {
        assert_eq!(normalize_punctuation(" 1 | Yes "), "1/Yes");
        assert_eq!(normalize_punctuation("1/Yes"), "1/Yes");
    }
}
