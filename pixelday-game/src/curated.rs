//! Curated offline scene content.
//!
//! A [`SceneCatalog`] is a list of hand-written scenes tagged with the day types
//! and times of day they suit. [`CuratedGenerator`] draws from it with its own
//! seeded stream and stands in for a live generator.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    DEFAULT_SCENE_WEIGHT, FALLBACK_REPAIR_POINTS, FALLBACK_REPAIR_TEXT, LOG_CATALOG_FALLBACK,
};
use crate::error::{GenerateError, SceneError};
use crate::generator::SceneGenerator;
use crate::plan::{DayType, TimeOfDay};
use crate::request::SceneRequest;
use crate::rng::CountingRng;
use crate::scene::{
    GeneratedScene, Outcome, RawRepair, RawScene, SceneOption, coerce_number, ingest_scene,
};

const BUILTIN_CATALOG: &str = include_str!("../data/scenes.json");

/// One curated scene with its selection filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default = "CatalogEntry::default_weight")]
    pub weight: u32,
    /// Empty means every day type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub day_types: Vec<DayType>,
    /// Empty means every time of day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub times_of_day: Vec<TimeOfDay>,
    #[serde(flatten)]
    pub scene: RawScene,
}

impl CatalogEntry {
    const fn default_weight() -> u32 {
        DEFAULT_SCENE_WEIGHT
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.scene.id
    }

    /// Whether this entry may be drawn for the given day and slot.
    #[must_use]
    pub fn matches(&self, day_type: DayType, time_of_day: TimeOfDay) -> bool {
        (self.day_types.is_empty() || self.day_types.contains(&day_type))
            && (self.times_of_day.is_empty() || self.times_of_day.contains(&time_of_day))
    }
}

/// Collection of curated scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneCatalog {
    #[serde(default)]
    pub scenes: Vec<CatalogEntry>,
}

impl SceneCatalog {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any entry fails scene ingestion.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled data is invalid.
    pub fn builtin() -> Result<Self, SceneError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Check that every entry would survive ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::CatalogEntry`] naming the first invalid entry.
    pub fn validate(&self) -> Result<(), SceneError> {
        for entry in &self.scenes {
            ingest_scene(entry.scene.clone(), TimeOfDay::Morning).map_err(|source| {
                SceneError::CatalogEntry {
                    id: entry.id().to_string(),
                    source: Box::new(source),
                }
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Entries eligible for the given day and slot, in catalog order.
    pub fn matching(
        &self,
        day_type: DayType,
        time_of_day: TimeOfDay,
    ) -> impl Iterator<Item = &CatalogEntry> {
        self.scenes
            .iter()
            .filter(move |entry| entry.matches(day_type, time_of_day))
    }
}

#[derive(Debug)]
struct DrawState {
    rng: CountingRng<SmallRng>,
    used: HashSet<String>,
}

/// Scene generator backed by a curated catalog.
#[derive(Debug)]
pub struct CuratedGenerator {
    catalog: SceneCatalog,
    draw: Mutex<DrawState>,
}

impl CuratedGenerator {
    /// Generator drawing from `catalog` with a stream seeded by `seed`.
    #[must_use]
    pub fn new(catalog: SceneCatalog, seed: u64) -> Self {
        Self {
            catalog,
            draw: Mutex::new(DrawState {
                rng: CountingRng::seeded(seed),
                used: HashSet::new(),
            }),
        }
    }

    /// Generator over the bundled catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled data is invalid.
    pub fn builtin(seed: u64) -> Result<Self, SceneError> {
        Ok(Self::new(SceneCatalog::builtin()?, seed))
    }

    #[must_use]
    pub const fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    /// Forget which scenes were used so a new day may repeat them.
    pub fn start_day(&self) {
        let mut draw = self.draw.lock().unwrap_or_else(PoisonError::into_inner);
        draw.used.clear();
    }

    /// Number of random draws made so far.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .draws()
    }

    /// Pick a scene for `request` synchronously.
    #[must_use]
    pub fn pick(&self, request: &SceneRequest) -> RawScene {
        let candidates: Vec<&CatalogEntry> = self
            .catalog
            .matching(request.day_type, request.time_of_day)
            .collect();

        let mut draw = self.draw.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh: Vec<&CatalogEntry> = candidates
            .iter()
            .copied()
            .filter(|entry| !draw.used.contains(entry.id()))
            .collect();
        let pool = if fresh.is_empty() { candidates } else { fresh };

        let mut scene = match choose_weighted(&pool, &mut draw.rng) {
            Some(entry) => {
                draw.used.insert(entry.id().to_string());
                entry.scene.clone()
            }
            None => {
                log::debug!(
                    "{LOG_CATALOG_FALLBACK}: no curated scene for {} {}",
                    request.day_type,
                    request.time_of_day
                );
                mock_scene(request.time_of_day)
            }
        };
        drop(draw);

        scene.time_of_day = Some(request.time_of_day.to_string());
        if request.must_offer_repair {
            offer_repairs(&mut scene);
        }
        scene
    }
}

impl DrawState {
    const fn draws(&self) -> u64 {
        self.rng.draws()
    }
}

#[async_trait::async_trait]
impl SceneGenerator for CuratedGenerator {
    async fn generate(&self, request: &SceneRequest) -> Result<RawScene, GenerateError> {
        Ok(self.pick(request))
    }
}

fn choose_weighted<'a, R: Rng + ?Sized>(
    pool: &[&'a CatalogEntry],
    rng: &mut R,
) -> Option<&'a CatalogEntry> {
    let total_weight: u32 = pool
        .iter()
        .map(|entry| entry.weight.max(1))
        .fold(0, u32::saturating_add);
    if total_weight == 0 {
        return None;
    }
    let roll = rng.gen_range(0..total_weight);
    let mut current = 0u32;
    for entry in pool {
        current = current.saturating_add(entry.weight.max(1));
        if roll < current {
            return Some(entry);
        }
    }
    None
}

/// Make sure every negative outcome carries an available repair.
fn offer_repairs(scene: &mut RawScene) {
    for outcome in scene.consequences.values_mut() {
        let negative = coerce_number(&outcome.points).is_some_and(|points| points < 0);
        if !negative {
            continue;
        }
        if outcome.repair_action.is_none() {
            outcome.repair_action = Some(RawRepair {
                text: FALLBACK_REPAIR_TEXT.to_string(),
                points_recovered: Value::from(FALLBACK_REPAIR_POINTS),
            });
        }
        outcome.repair_available = Some(true);
    }
}

/// The stand-in scene served when no curated content fits.
#[must_use]
pub fn mock_scene(time_of_day: TimeOfDay) -> RawScene {
    let scenario = if time_of_day == TimeOfDay::Morning {
        "Your little brother borrowed your pencil and didn't return it before school."
    } else {
        "Your friend wants to skip cleanup after a board game at their house."
    };
    let mut consequences = BTreeMap::new();
    consequences.insert(
        "A".to_string(),
        Outcome::new(
            "That worked",
            "They hand it back and thank you for the spare. You both get to class on time.",
            2,
        )
        .with_learning_note("Polite, specific asks work better than blame."),
    );
    consequences.insert(
        "B".to_string(),
        Outcome::new(
            "Tension rises",
            "Voices rise, you're both late, and no one feels good.",
            -2,
        )
        .with_repair(
            "Take a breath, apologize for shouting, and try again calmly.",
            2,
        )
        .with_learning_note("Calm words help people fix small problems faster."),
    );
    RawScene::from(&GeneratedScene {
        id: "mock-1".to_string(),
        time_of_day,
        scenario: scenario.to_string(),
        options: [
            SceneOption::new("A", "Ask kindly for it back and offer a spare."),
            SceneOption::new("B", "Complain loudly that they always lose your stuff."),
        ],
        consequences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(day_type: DayType, time_of_day: TimeOfDay) -> SceneRequest {
        SceneRequest {
            day_type,
            time_of_day,
            previous: None,
            negative_streak: 0,
            total_score: 0,
            must_offer_repair: false,
        }
    }

    #[test]
    fn builtin_catalog_covers_every_slot() {
        let catalog = SceneCatalog::builtin().unwrap();
        assert!(!catalog.is_empty());
        for day_type in DayType::ALL {
            for time_of_day in TimeOfDay::ALL {
                assert!(
                    catalog.matching(day_type, time_of_day).count() >= 2,
                    "{day_type} {time_of_day} needs curated content"
                );
            }
        }
    }

    #[test]
    fn invalid_entry_is_named() {
        let json = r#"{"scenes": [{"id": "broken", "scenario": "x", "options": [{"id": "A", "text": "a"}]}]}"#;
        let err = SceneCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, SceneError::CatalogEntry { ref id, .. } if id == "broken"));
    }

    #[test]
    fn draws_avoid_repeats_within_a_day() {
        let generator = CuratedGenerator::builtin(11).unwrap();
        let slot = request(DayType::SchoolDay, TimeOfDay::Morning);
        let available = generator
            .catalog()
            .matching(slot.day_type, slot.time_of_day)
            .count();
        let ids: HashSet<String> = (0..available)
            .map(|_| generator.pick(&slot).id)
            .collect();
        assert_eq!(ids.len(), available);

        generator.start_day();
        let again = generator.pick(&slot);
        assert!(ids.contains(&again.id));
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = CuratedGenerator::builtin(99).unwrap();
        let b = CuratedGenerator::builtin(99).unwrap();
        for time_of_day in TimeOfDay::ALL {
            let slot = request(DayType::Weekend, time_of_day);
            assert_eq!(a.pick(&slot), b.pick(&slot));
        }
        assert_eq!(a.draws(), b.draws());
    }

    #[test]
    fn picked_scene_uses_requested_slot_and_ingests() {
        let generator = CuratedGenerator::builtin(3).unwrap();
        let slot = request(DayType::Weekend, TimeOfDay::AfternoonNight);
        let raw = generator.pick(&slot);
        assert_eq!(raw.time_of_day.as_deref(), Some("Afternoon/Night"));
        let entry = generator
            .catalog()
            .scenes
            .iter()
            .find(|entry| entry.id() == raw.id)
            .unwrap();
        assert!(entry.matches(DayType::Weekend, TimeOfDay::AfternoonNight));
        assert!(ingest_scene(raw, slot.time_of_day).is_ok());
    }

    #[test]
    fn repair_is_attached_when_requested() {
        let json = r#"{"scenes": [{
            "id": "no-repair",
            "scenario": "A friend drops their tray.",
            "options": [{"id": "A", "text": "Help"}, {"id": "B", "text": "Laugh"}],
            "consequences": {
                "A": {"title": "Kind", "description": "They smile.", "points": 2},
                "B": {"title": "Mean", "description": "They are hurt.", "points": -3}
            }
        }]}"#;
        let generator = CuratedGenerator::new(SceneCatalog::from_json(json).unwrap(), 1);
        let mut slot = request(DayType::SchoolDay, TimeOfDay::Day);

        let plain = ingest_scene(generator.pick(&slot), slot.time_of_day).unwrap();
        assert!(plain.consequence("B").unwrap().repair_offer().is_none());

        slot.must_offer_repair = true;
        let scene = ingest_scene(generator.pick(&slot), slot.time_of_day).unwrap();
        let offer = scene.consequence("B").unwrap().repair_offer().unwrap();
        assert_eq!(offer.points_recovered, FALLBACK_REPAIR_POINTS);
        assert!(scene.consequence("A").unwrap().repair_offer().is_none());
    }

    #[test]
    fn empty_catalog_falls_back_to_mock() {
        let generator = CuratedGenerator::new(SceneCatalog::empty(), 5);
        let morning = generator.pick(&request(DayType::SchoolDay, TimeOfDay::Morning));
        assert_eq!(morning.id, "mock-1");
        assert!(morning.scenario.contains("pencil"));
        let evening = generator.pick(&request(DayType::Weekend, TimeOfDay::AfternoonNight));
        assert!(evening.scenario.contains("board game"));
        assert_eq!(generator.draws(), 0);

        let scene = ingest_scene(morning, TimeOfDay::Morning).unwrap();
        assert_eq!(scene.consequence("B").unwrap().repair_offer().unwrap().points_recovered, 2);
    }

    #[test]
    fn weighted_pick_always_lands_on_an_entry() {
        let entry = |weight| CatalogEntry {
            weight,
            day_types: Vec::new(),
            times_of_day: Vec::new(),
            scene: mock_scene(TimeOfDay::Morning),
        };
        let (light, zero, heavy) = (entry(1), entry(0), entry(5));
        let pool = [&light, &zero, &heavy];
        let mut rng = CountingRng::seeded(11);
        for _ in 0..200 {
            assert!(choose_weighted(&pool, &mut rng).is_some());
        }
        assert!(choose_weighted(&[], &mut rng).is_none());
    }

    #[tokio::test]
    async fn generates_through_the_trait() {
        let generator = CuratedGenerator::builtin(8).unwrap();
        let slot = request(DayType::SchoolDay, TimeOfDay::Day);
        let dynamic: &dyn SceneGenerator = &generator;
        let raw = dynamic.generate(&slot).await.unwrap();
        assert_eq!(raw.options.len(), 2);
    }
}
