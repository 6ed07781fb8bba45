use serde::{Deserialize, Serialize};

/// Overs-remaining breakpoints the resource table is published at,
/// ascending. Lookups between breakpoints interpolate linearly.
const OVERS_BREAKPOINTS: [f64; 15] = [
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0,
];

/// Resource percentages, indexed [overs breakpoint][wickets lost].
/// Standard Edition combined resource values for a 50-over innings.
#[rustfmt::skip]
const RESOURCE_TABLE: [[f64; 10]; 15] = [
    //  0w     1w     2w     3w     4w     5w     6w     7w     8w     9w
    [  0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0],
    [  3.6,   3.6,   3.6,   3.6,   3.6,   3.5,   3.5,   3.4,   3.2,   2.5],
    [  7.2,   7.1,   7.1,   7.0,   7.0,   6.8,   6.6,   6.2,   5.5,   3.7],
    [ 10.6,  10.5,  10.4,  10.3,  10.2,   9.9,   9.5,   8.7,   7.2,   4.2],
    [ 13.9,  13.8,  13.7,  13.5,  13.2,  12.7,  11.9,  10.7,   8.4,   4.5],
    [ 17.2,  17.0,  16.8,  16.5,  16.1,  15.4,  14.3,  12.5,   9.4,   4.6],
    [ 32.1,  31.6,  30.8,  29.8,  28.3,  26.1,  22.8,  17.9,  11.4,   4.7],
    [ 45.2,  44.1,  42.6,  40.6,  37.6,  33.5,  27.8,  20.2,  11.8,   4.7],
    [ 56.6,  54.8,  52.4,  49.1,  44.6,  38.6,  30.8,  21.2,  11.9,   4.7],
    [ 66.5,  63.9,  60.5,  56.0,  50.0,  42.2,  32.6,  21.6,  11.9,   4.7],
    [ 75.1,  71.8,  67.3,  61.6,  54.1,  44.7,  33.6,  21.8,  11.9,   4.7],
    [ 82.7,  78.3,  72.9,  65.7,  56.8,  46.4,  34.2,  21.9,  11.9,   4.7],
    [ 89.3,  84.2,  77.8,  69.6,  59.5,  47.6,  34.6,  22.0,  11.9,   4.7],
    [ 95.0,  89.1,  81.8,  72.5,  61.3,  48.4,  34.7,  22.0,  11.9,   4.7],
    [100.0,  93.4,  85.1,  74.9,  62.7,  49.0,  34.9,  22.0,  11.9,   4.7],
];

/// A revised-target computation for a rain-affected chase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlsComputation {
    /// First-innings score plus one
    pub target_runs: u32,
    pub resources_at_start: f64,
    pub resources_remaining: f64,
    pub par_score: f64,
    pub revised_target: u32,
}

/// Convert a cricket overs figure (completed overs + balls into the
/// current over) to decimal overs for table lookup.
pub fn decimal_overs(overs: u32, balls: u32) -> f64 {
    overs as f64 + balls as f64 / 6.0
}

/// Percentage of a full innings' scoring resources left with the given
/// overs remaining and wickets down. Inputs clamp to the table domain;
/// overs between breakpoints interpolate linearly within the same
/// wickets column.
pub fn resource_percentage(overs_remaining: f64, wickets_lost: u32) -> f64 {
    if wickets_lost >= 10 {
        return 0.0;
    }
    let w = wickets_lost as usize;
    let overs = overs_remaining.clamp(0.0, 50.0);

    let mut i = 0;
    while i + 1 < OVERS_BREAKPOINTS.len() && OVERS_BREAKPOINTS[i + 1] <= overs {
        i += 1;
    }
    if i + 1 == OVERS_BREAKPOINTS.len() {
        return RESOURCE_TABLE[i][w];
    }

    let lo = OVERS_BREAKPOINTS[i];
    let hi = OVERS_BREAKPOINTS[i + 1];
    let t = (overs - lo) / (hi - lo);
    RESOURCE_TABLE[i][w] + t * (RESOURCE_TABLE[i + 1][w] - RESOURCE_TABLE[i][w])
}

/// Revised target for the chasing side after an interruption.
///
/// The par score scales the target by the fraction of starting resources
/// still available; the revised target rounds the par score up and is
/// never a score the chasing side has already reached.
pub fn compute(
    target_runs: u32,
    overs_at_start: f64,
    overs_remaining: f64,
    wickets_lost: u32,
    runs_scored: u32,
) -> DlsComputation {
    let resources_at_start = resource_percentage(overs_at_start, 0);
    let resources_remaining = resource_percentage(overs_remaining, wickets_lost);

    let fraction = if resources_at_start > 0.0 {
        resources_remaining / resources_at_start
    } else {
        0.0
    };
    let par_score = target_runs as f64 * fraction;
    let revised_target = (par_score.ceil() as u32).max(runs_scored + 1);

    DlsComputation {
        target_runs,
        resources_at_start,
        resources_remaining,
        par_score,
        revised_target,
    }
}
