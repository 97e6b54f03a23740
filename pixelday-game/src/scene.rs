//! Generated scenes, their options and scored outcomes.
//!
//! Generator output is untrusted. [`RawScene`] mirrors the wire payload loosely;
//! [`ingest_scene`] turns it into a [`GeneratedScene`] exactly once, clamping
//! points, re-deriving polarity and re-keying consequences onto option ids.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{LOG_POINTS_CLAMPED, LOG_SCENE_REKEYED, OPTIONS_PER_SCENE};
use crate::error::SceneError;
use crate::numbers::{clamp_points, clamp_recovered, round_f64_to_i32};
use crate::plan::TimeOfDay;

/// One of the two choices offered by a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOption {
    pub id: String,
    pub text: String,
}

impl SceneOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Sign of an outcome's point delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    /// Polarity implied by a point delta.
    #[must_use]
    pub const fn from_points(points: i32) -> Self {
        if points > 0 {
            Self::Positive
        } else if points < 0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Corrective action offered alongside a negative outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAction {
    pub text: String,
    pub points_recovered: i32,
}

/// Scored result of choosing an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub polarity: Polarity,
    #[serde(default)]
    pub repair_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_action: Option<RepairAction>,
    #[serde(default)]
    pub learning_note: String,
}

impl Outcome {
    /// Build an outcome whose polarity agrees with its clamped points.
    pub fn new(title: impl Into<String>, description: impl Into<String>, points: i32) -> Self {
        let points = clamp_points(points);
        Self {
            card_id: None,
            title: title.into(),
            description: description.into(),
            points,
            polarity: Polarity::from_points(points),
            repair_available: false,
            repair_action: None,
            learning_note: String::new(),
        }
    }

    /// Attach a repair action and mark it available.
    #[must_use]
    pub fn with_repair(mut self, text: impl Into<String>, points_recovered: i32) -> Self {
        self.repair_available = true;
        self.repair_action = Some(RepairAction {
            text: text.into(),
            points_recovered: clamp_recovered(points_recovered),
        });
        self
    }

    #[must_use]
    pub fn with_learning_note(mut self, note: impl Into<String>) -> Self {
        self.learning_note = note.into();
        self
    }

    /// The repair action, only when it is both flagged available and present.
    #[must_use]
    pub fn repair_offer(&self) -> Option<&RepairAction> {
        if self.repair_available {
            self.repair_action.as_ref()
        } else {
            None
        }
    }
}

/// A validated dilemma with exactly two options and an outcome for each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScene {
    pub id: String,
    pub time_of_day: TimeOfDay,
    pub scenario: String,
    pub options: [SceneOption; OPTIONS_PER_SCENE],
    pub consequences: BTreeMap<String, Outcome>,
}

impl GeneratedScene {
    /// Option with exactly this id.
    #[must_use]
    pub fn option(&self, choice_id: &str) -> Option<&SceneOption> {
        self.options.iter().find(|option| option.id == choice_id)
    }

    /// Outcome keyed by exactly this id.
    #[must_use]
    pub fn consequence(&self, choice_id: &str) -> Option<&Outcome> {
        self.consequences.get(choice_id)
    }

    /// Options paired with their outcomes, in display order.
    pub fn choices(&self) -> impl Iterator<Item = (&SceneOption, Option<&Outcome>)> {
        self.options
            .iter()
            .map(|option| (option, self.consequences.get(&option.id)))
    }
}

/// Loosely-typed option as produced by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawOption {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// Loosely-typed repair action as produced by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawRepair {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub points_recovered: Value,
}

/// Loosely-typed outcome as produced by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_action: Option<RawRepair>,
    #[serde(default)]
    pub learning_note: String,
}

/// Scene payload exactly as a generator returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawScene {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(default)]
    pub consequences: BTreeMap<String, RawOutcome>,
}

impl RawScene {
    /// Parse a generator payload, tolerating Markdown code fences around the JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Parse`] if the remaining text is not a scene object.
    pub fn from_payload(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(strip_code_fences(text))?)
    }
}

impl From<&GeneratedScene> for RawScene {
    fn from(scene: &GeneratedScene) -> Self {
        Self {
            id: scene.id.clone(),
            time_of_day: Some(scene.time_of_day.to_string()),
            scenario: scene.scenario.clone(),
            options: scene
                .options
                .iter()
                .map(|option| RawOption {
                    id: option.id.clone(),
                    text: option.text.clone(),
                })
                .collect(),
            consequences: scene
                .consequences
                .iter()
                .map(|(key, outcome)| (key.clone(), RawOutcome::from(outcome)))
                .collect(),
        }
    }
}

impl From<&Outcome> for RawOutcome {
    fn from(outcome: &Outcome) -> Self {
        Self {
            card_id: outcome.card_id.clone(),
            title: outcome.title.clone(),
            description: outcome.description.clone(),
            points: Value::from(outcome.points),
            polarity: serde_json::to_value(outcome.polarity)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string)),
            repair_available: Some(outcome.repair_available),
            repair_action: outcome.repair_action.as_ref().map(|repair| RawRepair {
                text: repair.text.clone(),
                points_recovered: Value::from(repair.points_recovered),
            }),
            learning_note: outcome.learning_note.clone(),
        }
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").ok())
        .as_ref()
}

/// Remove a surrounding Markdown code fence, if any.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    fence_pattern()
        .and_then(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map_or_else(|| text.trim(), |inner| inner.as_str())
}

/// Parse a generator payload straight into a validated scene.
///
/// # Errors
///
/// Returns an error if the payload cannot be parsed or fails ingestion.
pub fn parse_scene_payload(text: &str, time_of_day: TimeOfDay) -> Result<GeneratedScene, SceneError> {
    ingest_scene(RawScene::from_payload(text)?, time_of_day)
}

/// Validate and normalize a generator scene for the slot it will fill.
///
/// The planned `time_of_day` always wins over whatever the generator claimed.
///
/// # Errors
///
/// Returns an error when the scene does not carry exactly two uniquely-named
/// options, each matching one consequence key (ignoring case).
pub fn ingest_scene(raw: RawScene, time_of_day: TimeOfDay) -> Result<GeneratedScene, SceneError> {
    let RawScene {
        id,
        scenario,
        options,
        mut consequences,
        ..
    } = raw;

    if options.len() != OPTIONS_PER_SCENE {
        return Err(SceneError::OptionCount {
            found: options.len(),
        });
    }

    let mut normalized: Vec<SceneOption> = Vec::with_capacity(OPTIONS_PER_SCENE);
    for option in options {
        let option_id = option.id.trim().to_string();
        if option_id.is_empty() {
            return Err(SceneError::EmptyOptionId);
        }
        if normalized
            .iter()
            .any(|seen| seen.id.eq_ignore_ascii_case(&option_id))
        {
            return Err(SceneError::DuplicateOption { id: option_id });
        }
        normalized.push(SceneOption::new(option_id, option.text.trim()));
    }

    let mut outcomes = BTreeMap::new();
    for option in &normalized {
        let key = match_consequence_key(&consequences, &option.id)?;
        if key != option.id {
            log::debug!("{LOG_SCENE_REKEYED}: `{key}` -> `{}`", option.id);
        }
        if let Some(raw_outcome) = consequences.remove(&key) {
            outcomes.insert(option.id.clone(), sanitize_outcome(raw_outcome));
        }
    }
    if !consequences.is_empty() {
        log::debug!(
            "{LOG_SCENE_REKEYED}: dropping unmatched consequence keys {:?}",
            consequences.keys().collect::<Vec<_>>()
        );
    }

    let [first, second]: [SceneOption; OPTIONS_PER_SCENE] =
        normalized
            .try_into()
            .map_err(|rest: Vec<SceneOption>| SceneError::OptionCount { found: rest.len() })?;

    Ok(GeneratedScene {
        id: id.trim().to_string(),
        time_of_day,
        scenario: scenario.trim().to_string(),
        options: [first, second],
        consequences: outcomes,
    })
}

fn match_consequence_key(
    consequences: &BTreeMap<String, RawOutcome>,
    option_id: &str,
) -> Result<String, SceneError> {
    if let Some((key, _)) = consequences
        .iter()
        .find(|(key, _)| key.trim() == option_id)
    {
        return Ok(key.clone());
    }
    let mut folded = consequences
        .keys()
        .filter(|key| key.trim().eq_ignore_ascii_case(option_id));
    match (folded.next(), folded.next()) {
        (Some(key), None) => Ok(key.clone()),
        (Some(_), Some(_)) => Err(SceneError::AmbiguousConsequence {
            id: option_id.to_string(),
        }),
        (None, _) => Err(SceneError::MissingConsequence {
            id: option_id.to_string(),
        }),
    }
}

/// JSON number or numeric string, rounded to the nearest integer.
pub(crate) fn coerce_number(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_f64().map(round_f64_to_i32),
        Value::String(text) => text.trim().parse::<f64>().ok().map(round_f64_to_i32),
        _ => None,
    }
}

fn sanitize_outcome(raw: RawOutcome) -> Outcome {
    let requested = coerce_number(&raw.points).unwrap_or(0);
    let points = clamp_points(requested);
    if points != requested {
        log::warn!("{LOG_POINTS_CLAMPED}: outcome points {requested} -> {points}");
    }
    let polarity = Polarity::from_points(points);
    if let Some(claimed) = raw.polarity.as_deref()
        && serde_json::from_value::<Polarity>(Value::from(claimed)).ok() != Some(polarity)
    {
        log::debug!("{LOG_POINTS_CLAMPED}: polarity `{claimed}` re-derived as {polarity:?}");
    }
    let repair_action = raw.repair_action.map(|repair| {
        let requested = coerce_number(&repair.points_recovered).unwrap_or(0);
        RepairAction {
            text: repair.text.trim().to_string(),
            points_recovered: clamp_recovered(requested),
        }
    });
    Outcome {
        card_id: raw.card_id,
        title: raw.title.trim().to_string(),
        description: raw.description.trim().to_string(),
        points,
        polarity,
        repair_available: raw.repair_available.unwrap_or(false),
        repair_action,
        learning_note: raw.learning_note.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_payload() -> Value {
        json!({
            "id": "mock-1",
            "timeOfDay": "Morning",
            "scenario": "Your little brother borrowed your pencil and didn't return it before school.",
            "options": [
                { "id": "A", "text": "Ask kindly for it back and offer a spare." },
                { "id": "B", "text": "Complain loudly that they always lose your stuff." }
            ],
            "consequences": {
                "A": {
                    "title": "That worked",
                    "description": "They hand it back and thank you for the spare.",
                    "points": 2,
                    "polarity": "positive",
                    "learning_note": "Polite, specific asks work better than blame."
                },
                "B": {
                    "title": "Tension rises",
                    "description": "Voices rise, you're both late, and no one feels good.",
                    "points": -2,
                    "polarity": "negative",
                    "repair_available": true,
                    "repair_action": {
                        "text": "Take a breath, apologize for shouting, and try again calmly.",
                        "points_recovered": 2
                    },
                    "learning_note": "Calm words help people fix small problems faster."
                }
            }
        })
    }

    #[test]
    fn ingests_well_formed_scene() {
        let raw: RawScene = serde_json::from_value(mock_payload()).unwrap();
        let scene = ingest_scene(raw, TimeOfDay::Day).unwrap();
        assert_eq!(scene.time_of_day, TimeOfDay::Day, "planned slot wins");
        assert_eq!(scene.options[0].id, "A");
        let b = scene.consequence("B").unwrap();
        assert_eq!(b.points, -2);
        assert_eq!(b.polarity, Polarity::Negative);
        assert_eq!(b.repair_offer().unwrap().points_recovered, 2);
        assert!(scene.consequence("A").unwrap().repair_offer().is_none());
    }

    #[test]
    fn clamps_points_and_rederives_polarity() {
        let mut payload = mock_payload();
        payload["consequences"]["A"]["points"] = json!(9.4);
        payload["consequences"]["A"]["polarity"] = json!("negative");
        payload["consequences"]["B"]["points"] = json!("-12");
        payload["consequences"]["B"]["repair_action"]["points_recovered"] = json!(7);
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        let scene = ingest_scene(raw, TimeOfDay::Morning).unwrap();

        let a = scene.consequence("A").unwrap();
        assert_eq!(a.points, 5);
        assert_eq!(a.polarity, Polarity::Positive);
        let b = scene.consequence("B").unwrap();
        assert_eq!(b.points, -5);
        assert_eq!(b.repair_action.as_ref().unwrap().points_recovered, 3);
    }

    #[test]
    fn missing_points_are_neutral() {
        let mut payload = mock_payload();
        payload["consequences"]["A"]
            .as_object_mut()
            .unwrap()
            .remove("points");
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        let scene = ingest_scene(raw, TimeOfDay::Morning).unwrap();
        let a = scene.consequence("A").unwrap();
        assert_eq!(a.points, 0);
        assert_eq!(a.polarity, Polarity::Neutral);
    }

    #[test]
    fn rekeys_consequences_case_insensitively() {
        let mut payload = mock_payload();
        let consequences = payload["consequences"].as_object_mut().unwrap();
        let a = consequences.remove("A").unwrap();
        let b = consequences.remove("B").unwrap();
        consequences.insert("a".to_string(), a);
        consequences.insert(" b ".to_string(), b);
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        let scene = ingest_scene(raw, TimeOfDay::Morning).unwrap();
        assert!(scene.consequence("A").is_some());
        assert!(scene.consequence("B").is_some());
        assert_eq!(scene.consequences.len(), 2);
    }

    #[test]
    fn rejects_structural_problems() {
        let mut payload = mock_payload();
        payload["options"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": "C", "text": "Walk away"}));
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        assert!(matches!(
            ingest_scene(raw, TimeOfDay::Morning),
            Err(SceneError::OptionCount { found: 3 })
        ));

        let mut payload = mock_payload();
        payload["consequences"]
            .as_object_mut()
            .unwrap()
            .remove("B");
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        assert!(matches!(
            ingest_scene(raw, TimeOfDay::Morning),
            Err(SceneError::MissingConsequence { id }) if id == "B"
        ));

        let mut payload = mock_payload();
        payload["options"][1]["id"] = json!("a");
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        assert!(matches!(
            ingest_scene(raw, TimeOfDay::Morning),
            Err(SceneError::DuplicateOption { .. })
        ));

        let mut payload = mock_payload();
        let consequences = payload["consequences"].as_object_mut().unwrap();
        let b = consequences.remove("B").unwrap();
        consequences.insert("b".to_string(), b.clone());
        consequences.insert(" b ".to_string(), b);
        let raw: RawScene = serde_json::from_value(payload).unwrap();
        assert!(matches!(
            ingest_scene(raw, TimeOfDay::Morning),
            Err(SceneError::AmbiguousConsequence { .. })
        ));
    }

    #[test]
    fn payload_parsing_strips_fences() {
        let body = serde_json::to_string(&mock_payload()).unwrap();
        let fenced = format!("```json\n{body}\n```");
        let scene = parse_scene_payload(&fenced, TimeOfDay::AfternoonNight).unwrap();
        assert_eq!(scene.id, "mock-1");
        assert_eq!(strip_code_fences("  {}  "), "{}");
        assert!(matches!(
            parse_scene_payload("not json", TimeOfDay::Morning),
            Err(SceneError::Parse(_))
        ));
    }

    #[test]
    fn outcome_builder_keeps_invariants() {
        let outcome = Outcome::new("Oops", "Spilled juice", -8).with_repair("Clean it up", 9);
        assert_eq!(outcome.points, -5);
        assert_eq!(outcome.polarity, Polarity::Negative);
        assert_eq!(outcome.repair_offer().unwrap().points_recovered, 3);

        let scene_json = json!({"repair_available": false});
        let raw: RawOutcome = serde_json::from_value(scene_json).unwrap();
        assert_eq!(sanitize_outcome(raw).repair_offer(), None);
    }
}
