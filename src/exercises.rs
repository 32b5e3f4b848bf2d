//! Exercise reference data - muscle group catalogue

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ExerciseTemplate;

/// Muscle groups for tracking training balance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Shoulders,
    Triceps,
    Back,
    Biceps,
    Forearms,
    Core,
    Glutes,
    Quads,
    Hamstrings,
    Calves,
    FullBody,   // Olympic lifts, burpees, carries
    Unclassified,
}

impl MuscleGroup {
    pub fn name(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Back => "back",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Forearms => "forearms",
            MuscleGroup::Core => "core",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Quads => "quads",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Calves => "calves",
            MuscleGroup::FullBody => "full body",
            MuscleGroup::Unclassified => "unclassified",
        }
    }

    /// Parse a tag from reference data ("quads", "Full Body", "full_body")
    pub fn parse(tag: &str) -> Option<MuscleGroup> {
        let tag = tag.trim().to_lowercase().replace(['_', '-'], " ");
        let group = match tag.as_str() {
            "chest" | "pecs" => MuscleGroup::Chest,
            "shoulders" | "delts" => MuscleGroup::Shoulders,
            "triceps" => MuscleGroup::Triceps,
            "back" | "lats" | "upper back" | "lower back" | "traps" => MuscleGroup::Back,
            "biceps" => MuscleGroup::Biceps,
            "forearms" => MuscleGroup::Forearms,
            "core" | "abs" | "abdominals" | "obliques" => MuscleGroup::Core,
            "glutes" | "abductors" => MuscleGroup::Glutes,
            "quads" | "quadriceps" | "adductors" => MuscleGroup::Quads,
            "hamstrings" => MuscleGroup::Hamstrings,
            "calves" => MuscleGroup::Calves,
            "full body" | "fullbody" => MuscleGroup::FullBody,
            _ => return None,
        };
        Some(group)
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalise an exercise name for matching: lowercase, trimmed, single spaces
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip a trailing equipment qualifier: "bench press (barbell)" -> "bench press"
fn base_name(normalized: &str) -> &str {
    match normalized.find(" (") {
        Some(idx) if normalized.ends_with(')') => &normalized[..idx],
        _ => normalized,
    }
}

/// Built-in catalogue, keyed by base name (equipment qualifier stripped)
const CATALOGUE: &[(&str, &[MuscleGroup])] = &[
    // Push
    ("bench press", &[MuscleGroup::Chest, MuscleGroup::Triceps, MuscleGroup::Shoulders]),
    ("incline bench press", &[MuscleGroup::Chest, MuscleGroup::Shoulders, MuscleGroup::Triceps]),
    ("decline bench press", &[MuscleGroup::Chest, MuscleGroup::Triceps]),
    ("chest fly", &[MuscleGroup::Chest]),
    ("chest dip", &[MuscleGroup::Chest, MuscleGroup::Triceps]),
    ("push up", &[MuscleGroup::Chest, MuscleGroup::Triceps, MuscleGroup::Shoulders, MuscleGroup::Core]),
    ("overhead press", &[MuscleGroup::Shoulders, MuscleGroup::Triceps]),
    ("shoulder press", &[MuscleGroup::Shoulders, MuscleGroup::Triceps]),
    ("lateral raise", &[MuscleGroup::Shoulders]),
    ("front raise", &[MuscleGroup::Shoulders]),
    ("triceps pushdown", &[MuscleGroup::Triceps]),
    ("triceps extension", &[MuscleGroup::Triceps]),
    ("skullcrusher", &[MuscleGroup::Triceps]),
    ("triceps dip", &[MuscleGroup::Triceps, MuscleGroup::Chest]),
    // Pull
    ("pull up", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("chin up", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("lat pulldown", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("bent over row", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("seated cable row", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("t bar row", &[MuscleGroup::Back, MuscleGroup::Biceps]),
    ("face pull", &[MuscleGroup::Shoulders, MuscleGroup::Back]),
    ("rear delt reverse fly", &[MuscleGroup::Shoulders, MuscleGroup::Back]),
    ("shrug", &[MuscleGroup::Back]),
    ("bicep curl", &[MuscleGroup::Biceps]),
    ("hammer curl", &[MuscleGroup::Biceps, MuscleGroup::Forearms]),
    ("preacher curl", &[MuscleGroup::Biceps]),
    ("wrist curl", &[MuscleGroup::Forearms]),
    // Legs
    ("squat", &[MuscleGroup::Quads, MuscleGroup::Glutes, MuscleGroup::Core]),
    ("front squat", &[MuscleGroup::Quads, MuscleGroup::Glutes, MuscleGroup::Core]),
    ("goblet squat", &[MuscleGroup::Quads, MuscleGroup::Glutes]),
    ("leg press", &[MuscleGroup::Quads, MuscleGroup::Glutes]),
    ("lunge", &[MuscleGroup::Quads, MuscleGroup::Glutes]),
    ("bulgarian split squat", &[MuscleGroup::Quads, MuscleGroup::Glutes]),
    ("leg extension", &[MuscleGroup::Quads]),
    ("deadlift", &[MuscleGroup::Hamstrings, MuscleGroup::Glutes, MuscleGroup::Back]),
    ("romanian deadlift", &[MuscleGroup::Hamstrings, MuscleGroup::Glutes]),
    ("lying leg curl", &[MuscleGroup::Hamstrings]),
    ("seated leg curl", &[MuscleGroup::Hamstrings]),
    ("hip thrust", &[MuscleGroup::Glutes, MuscleGroup::Hamstrings]),
    ("glute bridge", &[MuscleGroup::Glutes]),
    ("standing calf raise", &[MuscleGroup::Calves]),
    ("seated calf raise", &[MuscleGroup::Calves]),
    ("calf raise", &[MuscleGroup::Calves]),
    // Core
    ("plank", &[MuscleGroup::Core]),
    ("crunch", &[MuscleGroup::Core]),
    ("hanging leg raise", &[MuscleGroup::Core]),
    ("russian twist", &[MuscleGroup::Core]),
    ("ab wheel", &[MuscleGroup::Core]),
    ("cable crunch", &[MuscleGroup::Core]),
    // Full body
    ("clean and jerk", &[MuscleGroup::FullBody]),
    ("power clean", &[MuscleGroup::FullBody]),
    ("snatch", &[MuscleGroup::FullBody]),
    ("burpee", &[MuscleGroup::FullBody]),
    ("farmers walk", &[MuscleGroup::FullBody, MuscleGroup::Forearms]),
    ("kettlebell swing", &[MuscleGroup::Glutes, MuscleGroup::Hamstrings, MuscleGroup::Core]),
];

/// Exercise -> muscle group tags lookup, by name and by Hevy template id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuscleGroupMap {
    entries: BTreeMap<String, Vec<MuscleGroup>>,
    templates: BTreeMap<String, Vec<MuscleGroup>>,
}

/// Drop `Unclassified` and repeats, keeping the first-seen order
fn dedup_groups(groups: impl IntoIterator<Item = MuscleGroup>) -> Vec<MuscleGroup> {
    let mut deduped: Vec<MuscleGroup> = Vec::new();
    for g in groups {
        if g != MuscleGroup::Unclassified && !deduped.contains(&g) {
            deduped.push(g);
        }
    }
    deduped
}

impl MuscleGroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map preloaded with the built-in catalogue
    pub fn builtin() -> Self {
        let mut map = Self::new();
        for (name, groups) in CATALOGUE {
            map.insert(name, groups.to_vec());
        }
        map
    }

    /// Load reference data from JSON: `{"exercise name": ["chest", "triceps"]}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(json).context("muscle group map is not a JSON object of string arrays")?;

        let mut map = Self::new();
        for (name, tags) in raw {
            let mut groups = Vec::with_capacity(tags.len());
            for tag in &tags {
                match MuscleGroup::parse(tag) {
                    Some(group) => groups.push(group),
                    None => bail!("unknown muscle group '{}' for exercise '{}'", tag, name),
                }
            }
            map.insert(&name, groups);
        }
        Ok(map)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read muscle group map {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Build from Hevy exercise templates: primary group first, then
    /// secondaries, keyed by template id and by title. Tags with no
    /// matching group (cardio, other, neck) are ignored.
    pub fn from_templates(templates: &[ExerciseTemplate]) -> Self {
        let mut map = Self::new();
        for template in templates {
            let tags = template
                .primary_muscle_group
                .iter()
                .chain(template.secondary_muscle_groups.iter());
            let groups = dedup_groups(tags.filter_map(|tag| {
                let group = MuscleGroup::parse(tag);
                if group.is_none() {
                    debug!("No muscle group for tag '{}' on {}", tag, template.title);
                }
                group
            }));
            if groups.is_empty() {
                continue;
            }
            if !template.id.is_empty() {
                map.templates.insert(template.id.clone(), groups.clone());
            }
            if !template.title.trim().is_empty() {
                map.insert(&template.title, groups);
            }
        }
        map
    }

    /// Add everything from `other` that this map has no entry for
    pub fn extend_missing(&mut self, other: &MuscleGroupMap) {
        for (name, groups) in &other.entries {
            self.entries.entry(name.clone()).or_insert_with(|| groups.clone());
        }
        for (id, groups) in &other.templates {
            self.templates.entry(id.clone()).or_insert_with(|| groups.clone());
        }
    }

    pub fn insert(&mut self, name: &str, groups: Vec<MuscleGroup>) {
        let deduped = dedup_groups(groups);
        if !deduped.is_empty() {
            self.entries.insert(normalize_name(name), deduped);
        }
    }

    /// Muscle groups for an exercise name; exact match first, then without
    /// the equipment qualifier
    pub fn lookup(&self, name: &str) -> Option<&[MuscleGroup]> {
        let normalized = normalize_name(name);
        self.entries
            .get(&normalized)
            .or_else(|| self.entries.get(base_name(&normalized)))
            .map(|g| g.as_slice())
    }

    /// Name lookup, falling back to the template id
    pub fn resolve(&self, name: &str, template_id: Option<&str>) -> Option<&[MuscleGroup]> {
        self.lookup(name).or_else(|| {
            template_id
                .and_then(|id| self.templates.get(id))
                .map(|g| g.as_slice())
        })
    }

    /// Tags for an exercise; unmapped exercises get `[Unclassified]`
    pub fn classify(&self, name: &str, template_id: Option<&str>) -> &[MuscleGroup] {
        self.resolve(name, template_id).unwrap_or(&[MuscleGroup::Unclassified])
    }

    /// Distinct groups the map can assign
    pub fn groups(&self) -> BTreeSet<MuscleGroup> {
        self.entries
            .values()
            .chain(self.templates.values())
            .flatten()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Bench   Press (Barbell) "), "bench press (barbell)");
    }

    #[test]
    fn test_lookup_strips_equipment() {
        let map = MuscleGroupMap::builtin();
        let groups = map.lookup("Bench Press (Barbell)").unwrap();
        assert_eq!(groups[0], MuscleGroup::Chest);
    }

    #[test]
    fn test_exact_match_wins_over_base_name() {
        let mut map = MuscleGroupMap::new();
        map.insert("squat", vec![MuscleGroup::Quads]);
        map.insert("squat (smith machine)", vec![MuscleGroup::Glutes]);
        assert_eq!(map.lookup("Squat (Smith Machine)"), Some(&[MuscleGroup::Glutes][..]));
        assert_eq!(map.lookup("Squat (Barbell)"), Some(&[MuscleGroup::Quads][..]));
    }

    #[test]
    fn test_classify_unknown() {
        let map = MuscleGroupMap::builtin();
        assert_eq!(map.classify("Underwater basket weaving", None), &[MuscleGroup::Unclassified]);
    }

    #[test]
    fn test_from_json() {
        let map = MuscleGroupMap::from_json_str(r#"{"Zercher Squat": ["quads", "Core", "upper_back"]}"#).unwrap();
        assert_eq!(
            map.lookup("zercher squat").unwrap(),
            &[MuscleGroup::Quads, MuscleGroup::Core, MuscleGroup::Back]
        );
    }

    #[test]
    fn test_from_json_unknown_tag() {
        let err = MuscleGroupMap::from_json_str(r#"{"squat": ["legs-ish"]}"#).unwrap_err();
        assert!(err.to_string().contains("legs-ish"));
    }

    #[test]
    fn test_insert_dedupes_and_drops_unclassified() {
        let mut map = MuscleGroupMap::new();
        map.insert("row", vec![MuscleGroup::Back, MuscleGroup::Back, MuscleGroup::Unclassified]);
        assert_eq!(map.lookup("row").unwrap(), &[MuscleGroup::Back]);

        map.insert("mystery", vec![MuscleGroup::Unclassified]);
        assert!(map.lookup("mystery").is_none());
    }

    #[test]
    fn test_groups() {
        let mut map = MuscleGroupMap::new();
        map.insert("curl", vec![MuscleGroup::Biceps]);
        map.insert("row", vec![MuscleGroup::Back, MuscleGroup::Biceps]);
        let groups: Vec<_> = map.groups().into_iter().collect();
        assert_eq!(groups, vec![MuscleGroup::Back, MuscleGroup::Biceps]);
    }

    fn create_template(id: &str, title: &str, primary: &str, secondary: &[&str]) -> ExerciseTemplate {
        ExerciseTemplate {
            id: id.to_string(),
            title: title.to_string(),
            primary_muscle_group: Some(primary.to_string()),
            secondary_muscle_groups: secondary.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_templates() {
        let map = MuscleGroupMap::from_templates(&[
            create_template("A1B2C3D4", "Sissy Squat (Weighted)", "quadriceps", &["glutes", "abdominals"]),
            create_template("E5F6", "Rowing Machine", "cardio", &[]),
            create_template("0A0B", "Neck Curl", "neck", &["traps"]),
        ]);

        let expected = &[MuscleGroup::Quads, MuscleGroup::Glutes, MuscleGroup::Core][..];
        assert_eq!(map.lookup("sissy squat (weighted)"), Some(expected));
        assert_eq!(map.resolve("Renamed In App", Some("A1B2C3D4")), Some(expected));
        // cardio has no group, so the template is left out entirely
        assert_eq!(map.resolve("Rowing Machine", Some("E5F6")), None);
        assert_eq!(map.lookup("neck curl"), Some(&[MuscleGroup::Back][..]));
    }

    #[test]
    fn test_classify_falls_back_to_template_id() {
        let mut map = MuscleGroupMap::builtin();
        map.extend_missing(&MuscleGroupMap::from_templates(&[create_template(
            "D04AC939",
            "Pendulum Squat (Machine)",
            "quadriceps",
            &[],
        )]));

        assert_eq!(map.classify("My Pendulum", Some("D04AC939")), &[MuscleGroup::Quads]);
        assert_eq!(map.classify("My Pendulum", None), &[MuscleGroup::Unclassified]);
    }

    #[test]
    fn test_extend_missing_keeps_existing_entries() {
        let mut map = MuscleGroupMap::builtin();
        let before = map.lookup("bench press").map(|g| g.to_vec());
        map.extend_missing(&MuscleGroupMap::from_templates(&[create_template(
            "X1",
            "Bench Press",
            "triceps",
            &[],
        )]));
        assert_eq!(map.lookup("bench press").map(|g| g.to_vec()), before);
        assert_eq!(map.resolve("anything", Some("X1")), Some(&[MuscleGroup::Triceps][..]));
    }
}
