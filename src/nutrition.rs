use serde::{Deserialize, Serialize};

/// Energy density of one gram of protein, in kcal.
pub const KCAL_PER_G_PROTEIN: i32 = 4;
/// Energy density of one gram of carbohydrate, in kcal.
pub const KCAL_PER_G_CARB: i32 = 4;
/// Energy density of one gram of fat, in kcal.
pub const KCAL_PER_G_FAT: i32 = 9;

/// Largest single macro component, in grams, accepted at the input edges.
/// Components at or under this bound keep [`Macros::calories`] inside `i32`.
pub const MAX_COMPONENT_G: i32 = 100_000;

/// A macronutrient triple in grams. Calories are never stored alongside it;
/// they are derived via [`Macros::calories`] wherever a calorie figure is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub protein_g: i32,
    pub carbohydrate_g: i32,
    pub fat_g: i32,
}

impl Macros {
    pub fn new(protein_g: i32, carbohydrate_g: i32, fat_g: i32) -> Self {
        Self {
            protein_g,
            carbohydrate_g,
            fat_g,
        }
    }

    pub const ZERO: Macros = Macros {
        protein_g: 0,
        carbohydrate_g: 0,
        fat_g: 0,
    };

    /// Derived energy content: 4 kcal per gram of protein and carbohydrate, 9 per gram of fat.
    pub fn calories(&self) -> i32 {
        self.protein_g * KCAL_PER_G_PROTEIN
            + self.carbohydrate_g * KCAL_PER_G_CARB
            + self.fat_g * KCAL_PER_G_FAT
    }

    /// True when all three components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.protein_g == 0 && self.carbohydrate_g == 0 && self.fat_g == 0
    }
}
