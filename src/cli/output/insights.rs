use std::{fmt::Display, sync::Arc};

use crate::delta::DeltaResult;

use super::format_playtime;

/// Length of the observation window used for daily averages.
pub const WINDOW_DAYS: u64 = 7;

/// A single observation about a week of activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insight {
    NoActivity,
    GamesPlayed(usize),
    TotalTime(u64),
    AverageDaily(u64),
    MostPlayed { name: Arc<str>, minutes: u64 },
    NewGames(usize),
    ReturningGames(usize),
}

impl Display for Insight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Insight::NoActivity => write!(f, "No gaming activity this week"),
            Insight::GamesPlayed(count) => {
                write!(f, "You've played {count} different games this week")
            }
            Insight::TotalTime(minutes) => {
                write!(f, "Total weekly gaming time: {}", format_playtime(*minutes))
            }
            Insight::AverageDaily(minutes) => write!(
                f,
                "Average daily gaming this week: {}",
                format_playtime(*minutes)
            ),
            Insight::MostPlayed { name, minutes } => write!(
                f,
                "Most played this week: {name} ({})",
                format_playtime(*minutes)
            ),
            Insight::NewGames(count) => write!(f, "New games this week: {count}"),
            Insight::ReturningGames(count) => write!(f, "Returning games this week: {count}"),
        }
    }
}

/// Summarizes a delta into observations. Only records that gained playtime are taken into
/// account; when there are none a single [Insight::NoActivity] is returned.
pub fn summarize(result: &DeltaResult) -> Vec<Insight> {
    let active = result.active_records().collect::<Vec<_>>();
    // Ties keep the record that came first.
    let Some(most_played) = active.iter().copied().reduce(|best, v| {
        if v.playtime_delta_minutes > best.playtime_delta_minutes {
            v
        } else {
            best
        }
    }) else {
        return vec![Insight::NoActivity];
    };

    let total = result.total_delta_minutes();
    let mut insights = vec![Insight::GamesPlayed(active.len()), Insight::TotalTime(total)];

    if total > 0 {
        insights.push(Insight::AverageDaily(total / WINDOW_DAYS));
    }

    insights.push(Insight::MostPlayed {
        name: most_played.activity.name.clone(),
        minutes: most_played.playtime_delta_minutes,
    });

    let returning = active.iter().filter(|v| v.is_returning).count();
    let new = active.len() - returning;
    if new > 0 {
        insights.push(Insight::NewGames(new));
    }
    if returning > 0 {
        insights.push(Insight::ReturningGames(returning));
    }

    insights
}
