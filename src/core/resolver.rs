/// Ending resolution — maps an ending snapshot to a visual prompt and three
/// narrative sentences.
///
/// Three independent layers, each picking one fragment:
///
/// 1. Tone, from total public opinion.
/// 2. Dominance, from the strongest of Order, Love and Peace.
/// 3. Conflict, from the first pair of rivals far enough apart, in a
///    fixed priority order.
///
/// Resolution is deterministic: the same snapshot always yields the same
/// ending.
use serde::{Deserialize, Serialize};

use crate::core::templates::{EndingTemplates, Fragment};
use crate::schema::faction::Faction;
use crate::schema::record::EndingSnapshot;

/// Score gap beyond which one rival crushes another.
pub const CONFLICT_THRESHOLD: i32 = 4;

/// Rival pairs checked for extreme conflict, `(dominant, suppressed)`.
/// The first satisfied pair wins even when several hold.
pub const CONFLICT_PRIORITY: [(Faction, Faction); 6] = [
    (Faction::Peace, Faction::Order),
    (Faction::Order, Faction::Peace),
    (Faction::Peace, Faction::Love),
    (Faction::Love, Faction::Peace),
    (Faction::Love, Faction::Order),
    (Faction::Order, Faction::Love),
];

/// Tie-break order when several rivals share the top score.
const DOMINANCE_ORDER: [Faction; 3] = [Faction::Peace, Faction::Order, Faction::Love];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Stable,
    Struggling,
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dominance {
    Balanced,
    Ascendant(Faction),
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    Extreme { dominant: Faction, suppressed: Faction },
    Fog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEnding {
    pub tone: Tone,
    pub dominance: Dominance,
    pub conflict: Conflict,
    /// Base style, then tone, dominance and conflict visuals.
    pub visual_fragments: Vec<String>,
    /// Tone, dominance and conflict sentences.
    pub narrative: [String; 3],
}

impl ResolvedEnding {
    /// The full prompt for the image generator.
    pub fn visual_prompt(&self) -> String {
        self.visual_fragments.concat()
    }
}

pub fn tone_for(opinion: i32) -> Tone {
    if opinion > -2 {
        Tone::Stable
    } else if opinion == -2 {
        Tone::Struggling
    } else {
        Tone::Collapse
    }
}

pub fn dominance_for(snapshot: &EndingSnapshot) -> Dominance {
    let max = Faction::RIVALS
        .into_iter()
        .map(|f| snapshot.score(f))
        .max()
        .unwrap_or(0);

    if snapshot.total_opinion >= -1 && max < 2 {
        Dominance::Balanced
    } else if max >= 3 {
        DOMINANCE_ORDER
            .into_iter()
            .find(|f| snapshot.score(*f) == max)
            .map(Dominance::Ascendant)
            .unwrap_or(Dominance::Uncertain)
    } else {
        Dominance::Uncertain
    }
}

pub fn conflict_for(snapshot: &EndingSnapshot) -> Conflict {
    CONFLICT_PRIORITY
        .into_iter()
        .find(|(dominant, suppressed)| {
            let suppressed_score = snapshot.score(*suppressed);
            // Scores span the whole i32 range, so the gap needs a wider type.
            let gap = i64::from(snapshot.score(*dominant)) - i64::from(suppressed_score);
            gap > i64::from(CONFLICT_THRESHOLD) && suppressed_score < 0
        })
        .map(|(dominant, suppressed)| Conflict::Extreme {
            dominant,
            suppressed,
        })
        .unwrap_or(Conflict::Fog)
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeTemplateResolver {
    templates: EndingTemplates,
}

impl NarrativeTemplateResolver {
    pub fn new(templates: EndingTemplates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &EndingTemplates {
        &self.templates
    }

    pub fn resolve(&self, snapshot: &EndingSnapshot) -> ResolvedEnding {
        let tone = tone_for(snapshot.total_opinion);
        let dominance = dominance_for(snapshot);
        let conflict = conflict_for(snapshot);

        let layers = [
            self.tone_fragment(tone),
            self.dominance_fragment(dominance),
            self.conflict_fragment(conflict),
        ];

        let mut visual_fragments = Vec::with_capacity(4);
        visual_fragments.push(self.templates.base_style.clone());
        visual_fragments.extend(layers.iter().map(|f| f.visual.clone()));

        ResolvedEnding {
            tone,
            dominance,
            conflict,
            visual_fragments,
            narrative: layers.map(|f| f.narrative.clone()),
        }
    }

    fn tone_fragment(&self, tone: Tone) -> &Fragment {
        let t = &self.templates.tone;
        match tone {
            Tone::Stable => &t.stable,
            Tone::Struggling => &t.struggling,
            Tone::Collapse => &t.collapse,
        }
    }

    fn dominance_fragment(&self, dominance: Dominance) -> &Fragment {
        let d = &self.templates.dominance;
        match dominance {
            Dominance::Balanced => &d.balanced,
            Dominance::Uncertain => &d.uncertain,
            Dominance::Ascendant(Faction::Order) => &d.order,
            Dominance::Ascendant(Faction::Love) => &d.love,
            Dominance::Ascendant(Faction::Peace) => &d.peace,
            // Truth never competes for dominance.
            Dominance::Ascendant(Faction::Truth) => &d.uncertain,
        }
    }

    fn conflict_fragment(&self, conflict: Conflict) -> &Fragment {
        use Faction::{Love, Order, Peace};
        let c = &self.templates.conflict;
        match conflict {
            Conflict::Extreme { dominant, suppressed } => match (dominant, suppressed) {
                (Peace, Order) => &c.peace_over_order,
                (Order, Peace) => &c.order_over_peace,
                (Peace, Love) => &c.peace_over_love,
                (Love, Peace) => &c.love_over_peace,
                (Love, Order) => &c.love_over_order,
                (Order, Love) => &c.order_over_love,
                _ => &c.fog,
            },
            Conflict::Fog => &c.fog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::faction::FactionScores;

    fn snapshot(opinion: i32, order: i32, love: i32, peace: i32) -> EndingSnapshot {
        EndingSnapshot {
            total_opinion: opinion,
            faction_scores: FactionScores::new()
                .with(Faction::Order, order)
                .with(Faction::Love, love)
                .with(Faction::Peace, peace),
            case_records: Vec::new(),
        }
    }

    #[test]
    fn tone_thresholds() {
        assert_eq!(tone_for(5), Tone::Stable);
        assert_eq!(tone_for(-1), Tone::Stable);
        assert_eq!(tone_for(-2), Tone::Struggling);
        assert_eq!(tone_for(-3), Tone::Collapse);
        assert_eq!(tone_for(-40), Tone::Collapse);
    }

    #[test]
    fn balanced_needs_calm_opinion_and_low_scores() {
        assert_eq!(dominance_for(&snapshot(-1, 1, 1, 1)), Dominance::Balanced);
        // Low scores but poor opinion.
        assert_eq!(dominance_for(&snapshot(-2, 1, 1, 1)), Dominance::Uncertain);
        // A score of exactly two is neither balanced nor ascendant.
        assert_eq!(dominance_for(&snapshot(0, 2, 0, 0)), Dominance::Uncertain);
    }

    #[test]
    fn ascendant_faction_ties_break_peace_order_love() {
        assert_eq!(
            dominance_for(&snapshot(0, 3, 3, 3)),
            Dominance::Ascendant(Faction::Peace)
        );
        assert_eq!(
            dominance_for(&snapshot(0, 4, 4, 0)),
            Dominance::Ascendant(Faction::Order)
        );
        assert_eq!(
            dominance_for(&snapshot(0, 0, 3, 1)),
            Dominance::Ascendant(Faction::Love)
        );
    }

    #[test]
    fn truth_score_is_ignored_for_dominance() {
        let mut snap = snapshot(0, 0, 0, 0);
        snap.faction_scores.set(Faction::Truth, 10);
        assert_eq!(dominance_for(&snap), Dominance::Balanced);
    }

    #[test]
    fn conflict_needs_gap_and_negative_suppressed_score() {
        // Gap of exactly four is not enough.
        assert_eq!(conflict_for(&snapshot(0, -1, 0, 3)), Conflict::Fog);
        // Gap of six but suppressed faction not negative.
        assert_eq!(conflict_for(&snapshot(0, 0, 0, 6)), Conflict::Fog);
        assert_eq!(
            conflict_for(&snapshot(0, 5, -1, 0)),
            Conflict::Extreme {
                dominant: Faction::Order,
                suppressed: Faction::Love,
            }
        );
    }

    #[test]
    fn conflict_gap_holds_at_score_extremes() {
        assert_eq!(
            conflict_for(&snapshot(0, -1, 0, i32::MAX)),
            Conflict::Extreme {
                dominant: Faction::Peace,
                suppressed: Faction::Order,
            }
        );
        assert_eq!(
            conflict_for(&snapshot(0, i32::MAX, i32::MIN, i32::MIN)),
            Conflict::Extreme {
                dominant: Faction::Order,
                suppressed: Faction::Peace,
            }
        );
        // Both ends negative: the gap is still measured exactly.
        assert_eq!(conflict_for(&snapshot(0, i32::MIN, i32::MIN, -1)), Conflict::Extreme {
            dominant: Faction::Peace,
            suppressed: Faction::Order,
        });
        assert_eq!(conflict_for(&snapshot(0, i32::MIN, i32::MIN, i32::MIN)), Conflict::Fog);

        let ending = NarrativeTemplateResolver::default()
            .resolve(&snapshot(i32::MIN, i32::MIN, 0, i32::MAX));
        assert_eq!(ending.tone, Tone::Collapse);
        assert_eq!(ending.dominance, Dominance::Ascendant(Faction::Peace));
    }

    #[test]
    fn conflict_priority_picks_first_match() {
        // Peace−Order and Peace−Love both hold; Peace−Order comes first.
        let snap = snapshot(0, -1, -1, 5);
        assert_eq!(
            conflict_for(&snap),
            Conflict::Extreme {
                dominant: Faction::Peace,
                suppressed: Faction::Order,
            }
        );

        // Love−Peace (4th) beats Love−Order (5th).
        let snap = snapshot(0, -1, 5, -1);
        assert_eq!(
            conflict_for(&snap),
            Conflict::Extreme {
                dominant: Faction::Love,
                suppressed: Faction::Peace,
            }
        );
    }

    #[test]
    fn every_conflict_pair_has_its_own_fragment() {
        let resolver = NarrativeTemplateResolver::default();
        let mut seen = Vec::new();
        for (dominant, suppressed) in CONFLICT_PRIORITY {
            let fragment = resolver.conflict_fragment(Conflict::Extreme {
                dominant,
                suppressed,
            });
            assert_ne!(fragment, &resolver.templates().conflict.fog);
            assert!(!seen.contains(&fragment.narrative));
            seen.push(fragment.narrative.clone());
        }
    }

    #[test]
    fn collapse_with_military_crushing_order() {
        let resolver = NarrativeTemplateResolver::default();
        let ending = resolver.resolve(&snapshot(-3, -1, 0, 5));
        assert_eq!(ending.tone, Tone::Collapse);
        assert_eq!(ending.dominance, Dominance::Ascendant(Faction::Peace));
        assert_eq!(
            ending.conflict,
            Conflict::Extreme {
                dominant: Faction::Peace,
                suppressed: Faction::Order,
            }
        );
        assert_eq!(ending.narrative[2], "Truth is forced into silence at gunpoint.");
        assert_eq!(
            ending.narrative[1],
            "However, military power is gradually spiraling out of control..."
        );
    }

    #[test]
    fn calm_city_ends_in_fog() {
        let resolver = NarrativeTemplateResolver::default();
        let ending = resolver.resolve(&snapshot(0, 1, 1, 1));
        assert_eq!(ending.tone, Tone::Stable);
        assert_eq!(ending.dominance, Dominance::Balanced);
        assert_eq!(ending.conflict, Conflict::Fog);
        assert_eq!(
            ending.narrative[0],
            "Through the Truth Ministry's efforts, the balance between factions is maintained."
        );
        assert_eq!(
            ending.narrative[2],
            "The city holds its breath, waiting for what comes next."
        );
    }

    #[test]
    fn visual_prompt_concatenates_base_and_layers() {
        let resolver = NarrativeTemplateResolver::default();
        let ending = resolver.resolve(&snapshot(-2, 0, 0, 0));
        assert_eq!(ending.visual_fragments.len(), 4);
        let templates = resolver.templates();
        assert_eq!(ending.visual_fragments[0], templates.base_style);
        assert_eq!(ending.visual_fragments[1], templates.tone.struggling.visual);
        let prompt = ending.visual_prompt();
        assert!(prompt.starts_with(&templates.base_style));
        assert!(prompt.ends_with(&templates.conflict.fog.visual));
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = NarrativeTemplateResolver::default();
        for opinion in -5..=3 {
            for peace in -3..=7 {
                let snap = snapshot(opinion, -2, 1, peace);
                assert_eq!(resolver.resolve(&snap), resolver.resolve(&snap));
            }
        }
    }
}
