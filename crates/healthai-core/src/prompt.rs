//! Prompt templates for the planner screens and the free-form coach.
//!
//! Rendering is a pure function of the request: the same request always
//! produces the same bytes. Multi-select fields are `BTreeSet`s so they
//! iterate in declaration order.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A fixed set of form choices with human-readable labels.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
    }
}

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl Choice for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

choice_enum!(DietGoal {
    WeightLoss => "Weight Loss",
    MuscleGain => "Muscle Gain",
    Maintenance => "Maintenance",
    ImproveDigestion => "Improve Digestion",
});

choice_enum!(DietaryRestriction {
    Dairy => "Dairy",
    Gluten => "Gluten",
    Nuts => "Nuts",
    Eggs => "Eggs",
    Vegetarian => "Vegetarian",
    Vegan => "Vegan",
});

choice_enum!(Cuisine {
    Any => "Any",
    Mediterranean => "Mediterranean",
    Asian => "Asian",
    Mexican => "Mexican",
    Continental => "Continental",
});

choice_enum!(
    /// Used for both workout fitness level and yoga experience.
    FitnessLevel {
        Beginner => "Beginner",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
    }
);

choice_enum!(WorkoutType {
    FullBody => "Full Body",
    UpperBody => "Upper Body",
    LowerBody => "Lower Body",
    Cardio => "Cardio",
    Hiit => "HIIT",
});

choice_enum!(Equipment {
    Dumbbells => "Dumbbells",
    ResistanceBands => "Resistance Bands",
    NoEquipment => "None",
    Barbell => "Barbell",
    Kettlebells => "Kettlebells",
});

choice_enum!(YogaFocus {
    StressRelief => "Stress Relief",
    Flexibility => "Flexibility",
    Strength => "Strength",
    Balance => "Balance",
    MorningEnergy => "Morning Energy",
});

choice_enum!(Intensity {
    Gentle => "Gentle",
    Moderate => "Moderate",
    Vigorous => "Vigorous",
});

pub const CALORIE_RANGE: RangeInclusive<u32> = 1200..=3000;
pub const WORKOUT_MINUTES: RangeInclusive<u32> = 15..=120;
pub const YOGA_MINUTES: RangeInclusive<u32> = 10..=90;

const NO_RESTRICTIONS: &str = "no dietary restrictions";
const NO_EQUIPMENT: &str = "no equipment (bodyweight only)";
const STYLE: &str = "using emojis and a clear, attractive format.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietRequest {
    pub goal: DietGoal,
    pub restrictions: BTreeSet<DietaryRestriction>,
    pub calorie_target: u32,
    pub cuisine: Cuisine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRequest {
    pub fitness_level: FitnessLevel,
    pub workout_type: WorkoutType,
    pub equipment: BTreeSet<Equipment>,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YogaRequest {
    pub focus: YogaFocus,
    pub experience_level: FitnessLevel,
    pub duration_minutes: u32,
    pub intensity: Intensity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeformRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptRequest {
    Diet(DietRequest),
    Workout(WorkoutRequest),
    Yoga(YogaRequest),
    Freeform(FreeformRequest),
}

impl PromptRequest {
    pub fn freeform(text: &str) -> Self {
        PromptRequest::Freeform(FreeformRequest {
            text: text.to_string(),
        })
    }

    pub fn is_freeform(&self) -> bool {
        matches!(self, PromptRequest::Freeform(_))
    }

    pub fn render(&self) -> String {
        match self {
            PromptRequest::Diet(r) => format!(
                "Create a {} meal plan for {} calories, considering {} and {} cuisine preference. \
                 Include breakfast, lunch, dinner, and snacks with macros, {}",
                r.goal,
                r.calorie_target,
                restriction_phrase(&r.restrictions),
                r.cuisine,
                STYLE
            ),
            PromptRequest::Workout(r) => format!(
                "Create a {}-minute {} workout for a {} using {}. \
                 Include warm-up, exercises with sets/reps, and cool-down, {}",
                r.duration_minutes,
                r.workout_type,
                r.fitness_level,
                equipment_phrase(&r.equipment),
                STYLE
            ),
            PromptRequest::Yoga(r) => format!(
                "Create a {}-minute {} yoga routine for {} practitioners with {} intensity. \
                 Include warm-up, sequence of poses, and final relaxation, {}",
                r.duration_minutes, r.focus, r.experience_level, r.intensity, STYLE
            ),
            PromptRequest::Freeform(r) => r.text.clone(),
        }
    }
}

fn join_labels<T: Choice>(items: &BTreeSet<T>) -> String {
    items
        .iter()
        .map(|i| i.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn restriction_phrase(restrictions: &BTreeSet<DietaryRestriction>) -> String {
    if restrictions.is_empty() {
        NO_RESTRICTIONS.to_string()
    } else {
        format!("{} restrictions", join_labels(restrictions))
    }
}

fn equipment_phrase(equipment: &BTreeSet<Equipment>) -> String {
    if equipment.is_empty() {
        NO_EQUIPMENT.to_string()
    } else {
        join_labels(equipment)
    }
}
