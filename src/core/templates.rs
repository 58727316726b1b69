/// Ending templates — the text fragments the resolver chooses between.
///
/// Defaults are compiled in. A RON file with the same shape replaces them
/// wholesale; every branch must be present.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One narrative sentence and the visual prompt text that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub narrative: String,
    pub visual: String,
}

impl Fragment {
    fn new(narrative: &str, visual: &str) -> Self {
        Self {
            narrative: narrative.to_string(),
            visual: visual.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneTemplates {
    pub stable: Fragment,
    pub struggling: Fragment,
    pub collapse: Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominanceTemplates {
    pub balanced: Fragment,
    pub uncertain: Fragment,
    pub order: Fragment,
    pub love: Fragment,
    pub peace: Fragment,
}

/// `x_over_y`: faction x has crushed faction y.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictTemplates {
    pub peace_over_order: Fragment,
    pub order_over_peace: Fragment,
    pub peace_over_love: Fragment,
    pub love_over_peace: Fragment,
    pub love_over_order: Fragment,
    pub order_over_love: Fragment,
    pub fog: Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingTemplates {
    /// Style preamble prepended to every visual prompt.
    pub base_style: String,
    pub tone: ToneTemplates,
    pub dominance: DominanceTemplates,
    pub conflict: ConflictTemplates,
}

impl EndingTemplates {
    pub fn load_from_ron(path: &Path) -> Result<EndingTemplates, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EndingTemplates, TemplateError> {
        Ok(ron::from_str(input)?)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl Default for EndingTemplates {
    fn default() -> Self {
        Self {
            base_style: "Concept art, 1970s retro-futurism style, cold war aesthetic. \
                A frozen post-apocalyptic city centered around a massive, industrial \
                Fusion Energy Tower. Dystopian style, film grain, low saturation colors. \
                Wide shot, 16:9 composition. "
                .to_string(),
            tone: ToneTemplates {
                stable: Fragment::new(
                    "Through the Truth Ministry's efforts, the balance between factions is maintained.",
                    "A massive fusion tower glowing with stable, warm yellow incandescent light. ",
                ),
                struggling: Fragment::new(
                    "The Truth Ministry struggles to maintain the delicate balance between factions.",
                    "A fusion tower emitting black smoke and sparks, flickering dim light. ",
                ),
                collapse: Fragment::new(
                    "Chaotic judgments by the Truth Ministry have caused the original balance to collapse.",
                    "A dying energy tower glowing ominous emergency red, city streets frozen over, \
                     1970s cars buried in snow, ice icicles hanging from streetlights. ",
                ),
            },
            dominance: DominanceTemplates {
                balanced: Fragment::new(
                    "Civilization has gained a brief respite.",
                    "A balanced city layout, people of different factions mixing in a concrete \
                     plaza under the tower, warm streetlights, steam pipes connecting all districts. ",
                ),
                uncertain: Fragment::new(
                    "However, the future of civilization remains uncertain...",
                    "City divided by barbed wire fences and concrete checkpoints, distinct lighting \
                     colors for different sectors, separated by snow. ",
                ),
                order: Fragment::new(
                    "However, the power of the elite is gradually spiraling out of control...",
                    "Massive brutalist glass-and-concrete bunkers protecting the upper city, \
                     scientists in white coats visible inside, rows of mainframe computers, \
                     clean but cold. ",
                ),
                love: Fragment::new(
                    "However, populist power is gradually spiraling out of control...",
                    "Dense shantytown made of corrugated iron and colorful fabric sheets built \
                     against the generator, bonfires in oil drums, crowded with civilians. ",
                ),
                peace: Fragment::new(
                    "However, military power is gradually spiraling out of control...",
                    "Cold War era tanks and soldiers in heavy trench coats and gas masks \
                     patrolling, martial law, red banners, concrete roadblocks, searchlights. ",
                ),
            },
            conflict: ConflictTemplates {
                peace_over_order: Fragment::new(
                    "Truth is forced into silence at gunpoint.",
                    "Soldiers in trench coats burning piles of paper files and microfilm reels \
                     in oil drums, ruined archive building in background. ",
                ),
                order_over_peace: Fragment::new(
                    "A soldier's honor is worthless before the ledger.",
                    "Industrial style drones patrolling the sky, a military officer in a \
                     tattered greatcoat begging on the roadside. ",
                ),
                peace_over_love: Fragment::new(
                    "Civilians have become lambs to the slaughter in the face of absolute violence.",
                    "Riot police with 70s style helmets and shields using water cannons on \
                     civilians, frozen ice sculptures on the street. ",
                ),
                love_over_peace: Fragment::new(
                    "Anarchic revelry has reached its climax.",
                    "A giant statue of a general being pulled down by cheering civilians, ropes \
                     and graffiti, background burning military checkpoint ruins, smoke and sparks. ",
                ),
                love_over_order: Fragment::new(
                    "Primal fire savagely destroys order.",
                    "A mob with molotov cocktails storming a pristine brutalist government \
                     building, shattered glass, fire contrasting with cold blue office lights. ",
                ),
                order_over_love: Fragment::new(
                    "Luxury reigns atop the high tower, leaving a winter of despair for the ragged below.",
                    "View from a high office window looking down at frozen, snow-covered slums, \
                     silent and dark. ",
                ),
                fog: Fragment::new(
                    "The city holds its breath, waiting for what comes next.",
                    "A wide shot of the city shrouded in thick freezing fog, silhouettes of \
                     people looking up at the tower, atmosphere of mystery. ",
                ),
            },
        }
    }
}
