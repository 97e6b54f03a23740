//! Day planning: day type, time-of-day slots and the scene schedule.
//!
//! A [`DayPlan`] is immutable once built and is the only source of truth for
//! mapping a linear scene index onto a time-of-day.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::PlannerConfig;
use crate::constants::LOG_PLAN_BUILT;
use crate::error::PlanError;

/// Kind of day being played. Chosen once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayType {
    #[serde(rename = "School Day")]
    SchoolDay,
    #[serde(rename = "Weekend")]
    Weekend,
}

impl DayType {
    pub const ALL: [Self; 2] = [Self::SchoolDay, Self::Weekend];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchoolDay => "School Day",
            Self::Weekend => "Weekend",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "School Day" => Ok(Self::SchoolDay),
            "Weekend" => Ok(Self::Weekend),
            _ => Err(()),
        }
    }
}

/// Time-of-day segment. Variant order is the canonical narrative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    Morning,
    Day,
    #[serde(rename = "Afternoon/Night")]
    AfternoonNight,
}

impl TimeOfDay {
    /// All slots in canonical order.
    pub const ALL: [Self; 3] = [Self::Morning, Self::Day, Self::AfternoonNight];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Day => "Day",
            Self::AfternoonNight => "Afternoon/Night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Morning" => Ok(Self::Morning),
            "Day" => Ok(Self::Day),
            "Afternoon/Night" => Ok(Self::AfternoonNight),
            _ => Err(()),
        }
    }
}

/// One time-of-day segment holding a positive scene count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time_of_day: TimeOfDay,
    pub count: u8,
}

impl Slot {
    #[must_use]
    pub const fn new(time_of_day: TimeOfDay, count: u8) -> Self {
        Self { time_of_day, count }
    }
}

/// Schedule storage; three slots fit inline.
pub type Schedule = SmallVec<[Slot; 3]>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDayPlan {
    day_type: DayType,
    schedule: Vec<Slot>,
}

/// Immutable structure of a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDayPlan")]
pub struct DayPlan {
    day_type: DayType,
    schedule: Schedule,
}

impl TryFrom<RawDayPlan> for DayPlan {
    type Error = PlanError;

    fn try_from(raw: RawDayPlan) -> Result<Self, Self::Error> {
        Self::new(raw.day_type, raw.schedule)
    }
}

impl DayPlan {
    /// Build a plan from explicit slots.
    ///
    /// # Errors
    ///
    /// Returns an error unless the slots list Morning, Day and Afternoon/Night
    /// exactly once each, in that order, with positive counts.
    pub fn new(
        day_type: DayType,
        slots: impl IntoIterator<Item = Slot>,
    ) -> Result<Self, PlanError> {
        let schedule: Schedule = slots.into_iter().collect();
        if schedule.is_empty() {
            return Err(PlanError::EmptySchedule);
        }
        for (slot, expected) in schedule.iter().zip(TimeOfDay::ALL) {
            if slot.time_of_day != expected {
                return Err(PlanError::OutOfOrder {
                    expected,
                    found: slot.time_of_day,
                });
            }
            if slot.count == 0 {
                return Err(PlanError::EmptySlot {
                    time_of_day: slot.time_of_day,
                });
            }
        }
        if schedule.len() != TimeOfDay::ALL.len() {
            return Err(PlanError::MissingSlots {
                found: schedule.len(),
            });
        }
        Ok(Self { day_type, schedule })
    }

    /// Convenience constructor from per-slot counts in canonical order.
    ///
    /// # Errors
    ///
    /// Returns an error if any count is zero.
    pub fn from_counts(day_type: DayType, counts: [u8; 3]) -> Result<Self, PlanError> {
        Self::new(
            day_type,
            TimeOfDay::ALL
                .into_iter()
                .zip(counts)
                .map(|(time_of_day, count)| Slot::new(time_of_day, count)),
        )
    }

    #[must_use]
    pub const fn day_type(&self) -> DayType {
        self.day_type
    }

    #[must_use]
    pub fn schedule(&self) -> &[Slot] {
        &self.schedule
    }

    /// Total number of scenes in the day.
    #[must_use]
    pub fn total_scenes(&self) -> usize {
        self.schedule.iter().map(|slot| usize::from(slot.count)).sum()
    }

    /// Contiguous index ranges covered by each slot, in schedule order.
    pub fn slot_ranges(&self) -> impl Iterator<Item = (TimeOfDay, Range<usize>)> + '_ {
        self.schedule.iter().scan(0usize, |start, slot| {
            let begin = *start;
            *start += usize::from(slot.count);
            Some((slot.time_of_day, begin..*start))
        })
    }

    /// Time-of-day for the scene at `index`.
    ///
    /// Indices past the end of the day resolve to the last slot rather than
    /// failing; callers check completion before asking.
    #[must_use]
    pub fn time_of_day_for_index(&self, index: usize) -> TimeOfDay {
        self.slot_ranges()
            .find(|(_, range)| range.contains(&index))
            .map_or_else(|| self.last_time_of_day(), |(time_of_day, _)| time_of_day)
    }

    /// Position of `index` within its slot as `(time_of_day, ordinal, slot_len)`.
    #[must_use]
    pub fn slot_position(&self, index: usize) -> Option<(TimeOfDay, usize, usize)> {
        self.slot_ranges()
            .find(|(_, range)| range.contains(&index))
            .map(|(time_of_day, range)| (time_of_day, index - range.start, range.len()))
    }

    fn last_time_of_day(&self) -> TimeOfDay {
        self.schedule
            .last()
            .map_or(TimeOfDay::AfternoonNight, |slot| slot.time_of_day)
    }
}

/// Sum of all slot counts.
#[must_use]
pub fn total_scenes(plan: &DayPlan) -> usize {
    plan.total_scenes()
}

/// Map a linear 0-based scene index to the slot that contains it.
#[must_use]
pub fn time_of_day_for_index(plan: &DayPlan, index: usize) -> TimeOfDay {
    plan.time_of_day_for_index(index)
}

/// Pick School Day or Weekend with equal probability.
pub fn choose_day_type<R: Rng + ?Sized>(rng: &mut R) -> DayType {
    pick_day_type(rng, PlannerConfig::default_weekend_probability())
}

/// Build a day with the shipped pacing: one to three scenes per slot.
pub fn build_day_plan<R: Rng + ?Sized>(rng: &mut R) -> DayPlan {
    draw_plan(rng, &PlannerConfig::default())
}

/// Build a day using explicit planner configuration.
///
/// # Errors
///
/// Returns an error if the configuration fails validation.
pub fn build_day_plan_with<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &PlannerConfig,
) -> Result<DayPlan, PlanError> {
    cfg.validate()?;
    Ok(draw_plan(rng, cfg))
}

fn pick_day_type<R: Rng + ?Sized>(rng: &mut R, weekend_probability: f64) -> DayType {
    if rng.gen_bool(weekend_probability.clamp(0.0, 1.0)) {
        DayType::Weekend
    } else {
        DayType::SchoolDay
    }
}

fn draw_plan<R: Rng + ?Sized>(rng: &mut R, cfg: &PlannerConfig) -> DayPlan {
    let day_type = pick_day_type(rng, cfg.weekend_probability);
    let low = cfg.min_scenes_per_slot.max(1);
    let high = cfg.max_scenes_per_slot.max(low);
    let schedule: Schedule = TimeOfDay::ALL
        .into_iter()
        .map(|time_of_day| Slot::new(time_of_day, rng.gen_range(low..=high)))
        .collect();
    let plan = DayPlan { day_type, schedule };
    log::debug!(
        "{LOG_PLAN_BUILT}: {} with {} scenes {:?}",
        plan.day_type,
        plan.total_scenes(),
        plan.schedule.iter().map(|slot| slot.count).collect::<Vec<_>>()
    );
    plan
}
