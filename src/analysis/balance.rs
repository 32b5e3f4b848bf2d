//! Muscle group volume balance for the analysis window

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AnalysisWindow;
use super::aggregator::Aggregation;
use crate::config::AnalysisConfig;
use crate::exercises::{MuscleGroup, MuscleGroupMap};

/// Set volume of one muscle group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVolume {
    pub group: MuscleGroup,
    pub sets: usize,
    /// Fraction of classified volume, 0.0-1.0
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Imbalance {
    /// No sets at all in the window
    Untrained,
    UnderTrained,
    OverTrained,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceFinding {
    pub group: MuscleGroup,
    pub kind: Imbalance,
    pub share: f64,
    /// Mean share of the groups trained in the window
    pub mean_share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Every counted set in the window, classified or not
    pub total_sets: usize,
    pub unclassified_sets: usize,
    /// Sorted by volume, highest first
    pub groups: Vec<GroupVolume>,
    pub findings: Vec<ImbalanceFinding>,
}

/// Groups that take part in ratios: everything the map can assign except
/// whole-body work
fn ratio_groups(map: &MuscleGroupMap) -> Vec<MuscleGroup> {
    map.groups()
        .into_iter()
        .filter(|g| *g != MuscleGroup::FullBody && *g != MuscleGroup::Unclassified)
        .collect()
}

/// Distribute window volume over muscle groups and flag outliers.
///
/// Shares are measured against the mean of the groups trained in the
/// window; groups the map knows but that got no sets are reported as
/// untrained. A multi-group exercise credits its full set count to every
/// group it targets.
pub fn analyze_balance(
    aggregation: &Aggregation,
    map: &MuscleGroupMap,
    window: Option<&AnalysisWindow>,
    config: &AnalysisConfig,
) -> BalanceReport {
    let Some(window) = window else {
        return BalanceReport::default();
    };

    let mut volume: BTreeMap<MuscleGroup, usize> = ratio_groups(map).into_iter().map(|g| (g, 0)).collect();
    let mut total_sets = 0;
    let mut unclassified_sets = 0;

    for history in aggregation.exercises.values() {
        let sets_in_window = history
            .sets
            .iter()
            .filter(|s| window.contains(s.started_at))
            .count();
        if sets_in_window == 0 {
            continue;
        }
        total_sets += sets_in_window;

        let Some(tags) = map.resolve(&history.name, history.template_id.as_deref()) else {
            unclassified_sets += sets_in_window;
            continue;
        };
        for tag in tags {
            if let Some(v) = volume.get_mut(tag) {
                *v += sets_in_window;
            }
        }
    }

    let classified: usize = volume.values().sum();
    if total_sets == 0 {
        return BalanceReport::default();
    }
    if classified == 0 {
        return BalanceReport {
            total_sets,
            unclassified_sets,
            groups: Vec::new(),
            findings: Vec::new(),
        };
    }

    let mut group_volumes: Vec<GroupVolume> = volume
        .into_iter()
        .map(|(group, sets)| GroupVolume {
            group,
            sets,
            share: sets as f64 / classified as f64,
        })
        .collect();
    group_volumes.sort_by(|a, b| b.sets.cmp(&a.sets));

    let trained = group_volumes.iter().filter(|g| g.sets > 0).count();
    let mean_share = 1.0 / trained as f64;
    let under = config.under_ratio * mean_share;
    let over = config.over_ratio * mean_share;

    let findings = group_volumes
        .iter()
        .filter_map(|gv| {
            let kind = if gv.sets == 0 {
                Imbalance::Untrained
            } else if gv.share < under {
                Imbalance::UnderTrained
            } else if gv.share > over {
                Imbalance::OverTrained
            } else {
                return None;
            };
            Some(ImbalanceFinding {
                group: gv.group,
                kind,
                share: gv.share,
                mean_share,
            })
        })
        .collect();

    BalanceReport {
        total_sets,
        unclassified_sets,
        groups: group_volumes,
        findings,
    }
}
