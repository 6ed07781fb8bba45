use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;
use uuid::Uuid;

/// What the scorer pressed for a single delivery
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, EnumIter,
)]
pub enum BallInput {
    #[serde(rename = "0")]
    Dot,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "WD")]
    Wide,
    #[serde(rename = "NB")]
    NoBall,
    #[serde(rename = "B")]
    Bye,
    #[serde(rename = "LB")]
    LegBye,
    #[serde(rename = "W")]
    Wicket,
}

impl BallInput {
    /// Runs off the bat for numeric inputs, None for extras and wickets
    pub fn bat_runs(&self) -> Option<u32> {
        match self {
            BallInput::Dot => Some(0),
            BallInput::One => Some(1),
            BallInput::Two => Some(2),
            BallInput::Three => Some(3),
            BallInput::Four => Some(4),
            BallInput::Five => Some(5),
            BallInput::Six => Some(6),
            _ => None,
        }
    }

    /// Wides and no-balls must be re-bowled and do not advance the over
    pub fn is_illegal_delivery(&self) -> bool {
        matches!(self, BallInput::Wide | BallInput::NoBall)
    }

    pub fn is_extra(&self) -> bool {
        matches!(
            self,
            BallInput::Wide | BallInput::NoBall | BallInput::Bye | BallInput::LegBye
        )
    }
}

impl fmt::Display for BallInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BallInput::Dot => "0",
                BallInput::One => "1",
                BallInput::Two => "2",
                BallInput::Three => "3",
                BallInput::Four => "4",
                BallInput::Five => "5",
                BallInput::Six => "6",
                BallInput::Wide => "WD",
                BallInput::NoBall => "NB",
                BallInput::Bye => "B",
                BallInput::LegBye => "LB",
                BallInput::Wicket => "W",
            }
        )
    }
}

impl TryFrom<&str> for BallInput {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "0" => Ok(BallInput::Dot),
            "1" => Ok(BallInput::One),
            "2" => Ok(BallInput::Two),
            "3" => Ok(BallInput::Three),
            "4" => Ok(BallInput::Four),
            "5" => Ok(BallInput::Five),
            "6" => Ok(BallInput::Six),
            "WD" => Ok(BallInput::Wide),
            "NB" => Ok(BallInput::NoBall),
            "B" => Ok(BallInput::Bye),
            "LB" => Ok(BallInput::LegBye),
            "W" => Ok(BallInput::Wicket),
            _ => Err(s.to_string()),
        }
    }
}

/// How the batsman got out
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum WicketKind {
    Bowled,
    Caught,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
    Other,
}

impl fmt::Display for WicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WicketKind::Bowled => "bowled",
                WicketKind::Caught => "caught",
                WicketKind::Lbw => "lbw",
                WicketKind::RunOut => "run-out",
                WicketKind::Stumped => "stumped",
                WicketKind::HitWicket => "hit-wicket",
                WicketKind::Other => "other",
            }
        )
    }
}

impl TryFrom<&str> for WicketKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "bowled" => Ok(WicketKind::Bowled),
            "caught" => Ok(WicketKind::Caught),
            "lbw" => Ok(WicketKind::Lbw),
            "run-out" => Ok(WicketKind::RunOut),
            "stumped" => Ok(WicketKind::Stumped),
            "hit-wicket" => Ok(WicketKind::HitWicket),
            "other" => Ok(WicketKind::Other),
            _ => Err(s.to_string()),
        }
    }
}

/// A scorer's raw submission for one delivery, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallCall {
    pub input: BallInput,
    /// Total runs for the delivery when the default does not apply
    /// (overthrows on an extra, runs completed before a run-out)
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub wicket: Option<WicketKind>,
    #[serde(default)]
    pub batsman_id: Option<String>,
    #[serde(default)]
    pub bowler_id: Option<String>,
}

impl BallCall {
    pub fn new(input: BallInput) -> Self {
        Self {
            input,
            runs: None,
            wicket: None,
            batsman_id: None,
            bowler_id: None,
        }
    }

    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }

    pub fn with_wicket(mut self, kind: WicketKind) -> Self {
        self.wicket = Some(kind);
        self
    }

    pub fn with_batsman(mut self, batsman_id: impl Into<String>) -> Self {
        self.batsman_id = Some(batsman_id.into());
        self
    }

    pub fn with_bowler(mut self, bowler_id: impl Into<String>) -> Self {
        self.bowler_id = Some(bowler_id.into());
        self
    }

    /// Classify this submission into a canonical record, stamped with the
    /// position of the next legal delivery at recording time.
    ///
    /// Classification never fails: unknown input tokens are rejected at the
    /// wire-parsing boundary before a BallCall exists.
    pub fn classify(&self, over: u32, ball_in_over: u32) -> BallRecord {
        let runs = match self.input.bat_runs() {
            Some(n) => n,
            // Extras default to the single penalty run, a wicket to none;
            // the scorer's override carries the full total when it differs.
            None => match self.input {
                BallInput::Wicket => self.runs.unwrap_or(0),
                _ => self.runs.unwrap_or(1),
            },
        };

        let is_wide = self.input == BallInput::Wide;
        let is_no_ball = self.input == BallInput::NoBall;
        let is_bye = self.input == BallInput::Bye;
        let is_leg_bye = self.input == BallInput::LegBye;
        let off_the_bat = !(is_wide || is_no_ball || is_bye || is_leg_bye);

        BallRecord {
            ball_id: Uuid::new_v4(),
            over,
            ball_in_over,
            input: self.input,
            runs,
            is_wide,
            is_no_ball,
            is_bye,
            is_leg_bye,
            is_wicket: self.input == BallInput::Wicket || self.wicket.is_some(),
            is_four: off_the_bat && runs == 4,
            is_six: off_the_bat && runs == 6,
            wicket: self.wicket,
            batsman_id: self.batsman_id.clone(),
            bowler_id: self.bowler_id.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// The canonical scored delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallRecord {
    pub ball_id: Uuid,
    pub over: u32,
    pub ball_in_over: u32,
    pub input: BallInput,
    pub runs: u32,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    pub is_wicket: bool,
    pub is_four: bool,
    pub is_six: bool,
    pub wicket: Option<WicketKind>,
    pub batsman_id: Option<String>,
    pub bowler_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl BallRecord {
    /// Byes and leg byes count toward the over; wides and no-balls do not
    pub fn is_legal(&self) -> bool {
        !self.is_wide && !self.is_no_ball
    }
}

impl fmt::Display for BallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.over, self.ball_in_over, self.input)
    }
}
