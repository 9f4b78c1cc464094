//! Route matching logic.
//!
//! # Responsibilities
//! - Filter routes by request method
//! - Match the checked path in two passes (full, then relative suffix)
//! - Reduce several candidates to one with a lexicographic tie-break
//!
//! # Design Decisions
//! - Pure function of (routes, method, path): same input, same route
//! - An empty pass yields an empty list; no errors are used for control flow
//! - The tie-break is a chain of disqualification checks, not a weighted score
//! - Full ties keep the earlier registered route

use std::cmp::Ordering;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::route::Route;

/// One matching pass over the candidate routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPass {
    /// The whole checked path must match (`^expr$`).
    Full,
    /// Routes flagged relative may match a path suffix.
    Relative,
}

impl MatchPass {
    /// Returns true if `route` is a candidate for `path` in this pass.
    pub fn accepts(&self, route: &Route, path: &str) -> bool {
        match self {
            MatchPass::Full => route.match_expression().is_full_match(path),
            MatchPass::Relative => {
                route.is_relative() && route.match_expression().is_suffix_match(path)
            }
        }
    }
}

/// Find the route for `method` and `path`.
///
/// `fallback` is excluded from candidacy and returned when nothing matches.
pub fn find_route<'r>(
    routes: &'r [Arc<Route>],
    fallback: Option<&'r Arc<Route>>,
    method: &Method,
    path: &str,
) -> Option<&'r Arc<Route>> {
    let eligible: Vec<&Arc<Route>> = routes
        .iter()
        .filter(|route| fallback.map_or(true, |f| f.id() != route.id()))
        .filter(|route| route.allows_method(method))
        .collect();

    let mut candidates = collect_candidates(&eligible, MatchPass::Full, path);
    if candidates.is_empty() {
        candidates = collect_candidates(&eligible, MatchPass::Relative, path);
    }

    match candidates.len() {
        0 => fallback,
        1 => Some(candidates[0]),
        _ => Some(break_tie(&candidates, path)),
    }
}

fn collect_candidates<'r>(
    eligible: &[&'r Arc<Route>],
    pass: MatchPass,
    path: &str,
) -> Vec<&'r Arc<Route>> {
    eligible
        .iter()
        .copied()
        .filter(|route| pass.accepts(route, path))
        .collect()
}

/// Reduce several matching routes to one.
fn break_tie<'r>(candidates: &[&'r Arc<Route>], path: &str) -> &'r Arc<Route> {
    let mut best = candidates[0];
    for &challenger in &candidates[1..] {
        if challenger_wins(best, challenger, path) {
            tracing::trace!(
                previous = %best.id(),
                preferred = %challenger.id(),
                "Tie-break replaced best candidate"
            );
            best = challenger;
        }
    }
    best
}

/// Returns true if `challenger` should replace `best`.
///
/// Checked in order, each step either decides or passes on a tie:
/// 1. the more specific (smaller, non-empty) method set wins
/// 2. fewer declared placeholders wins
/// 3. `satisfied - declared` must not be lower than best's; higher wins
/// 4. more placeholders holding a value wins
pub(crate) fn challenger_wins(best: &Route, challenger: &Route, path: &str) -> bool {
    if challenger.methods().is_more_specific_than(best.methods()) {
        return true;
    }
    if best.methods().is_more_specific_than(challenger.methods()) {
        return false;
    }

    let declared = challenger.placeholders().len();
    match declared.cmp(&best.placeholders().len()) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }

    let (best_satisfied, best_present) = best.placeholder_profile(path);
    let (challenger_satisfied, challenger_present) = challenger.placeholder_profile(path);

    let best_delta = best_satisfied as isize - declared as isize;
    let challenger_delta = challenger_satisfied as isize - declared as isize;
    match challenger_delta.cmp(&best_delta) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => challenger_present > best_present,
    }
}
