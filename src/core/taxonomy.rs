//! Class-code tables per categorical dataset family.
//!
//! Tables are static; reductions build an owned [`CoverageTable`] from them so
//! concurrent points never share mutable class state.
use std::collections::BTreeMap;

use serde::Serialize;

/// One class of a taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassEntry {
    pub code: i64,
    pub name: &'static str,
}

const fn class(code: i64, name: &'static str) -> ClassEntry {
    ClassEntry { code, name }
}

/// Taxonomy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonomyId {
    ModisLandCover,
    FireLandCover,
    BuiltCharacteristics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Taxonomy {
    pub id: TaxonomyId,
    pub classes: &'static [ClassEntry],
    /// Zero is a fill value: coverage is relative to non-zero cells only.
    pub zero_exclusive: bool,
}

/// MODIS MCD12Q1 `LC_Type1` (IGBP) classes.
pub const MODIS_LC_TYPE1: [ClassEntry; 17] = [
    class(1, "evg_conif"),
    class(2, "evg_broad"),
    class(3, "dcd_needle"),
    class(4, "dcd_broad"),
    class(5, "mix_forest"),
    class(6, "cls_shrub"),
    class(7, "open_shrub"),
    class(8, "woody_savanna"),
    class(9, "savanna"),
    class(10, "grassland"),
    class(11, "perm_wetland"),
    class(12, "cropland"),
    class(13, "urban"),
    class(14, "crop_nat_veg"),
    class(15, "perm_snow"),
    class(16, "barren"),
    class(17, "water_bds"),
];

/// FireCCI 5.1 land-cover classes; 160 marks unburnt cells.
pub const FIRE_LC: [ClassEntry; 18] = [
    class(0, "crop_rain"),
    class(20, "crop_irr"),
    class(30, "crop_veg"),
    class(40, "veg_crop"),
    class(50, "broad_ever"),
    class(60, "broad_decid"),
    class(70, "needle_ever"),
    class(80, "needle_decid"),
    class(90, "tree_mixed"),
    class(100, "tree_shrub_herb"),
    class(110, "herb_tree_shrub"),
    class(120, "shrubland"),
    class(130, "grassland"),
    class(140, "lichen_moss"),
    class(150, "sparse_veg"),
    class(160, "unburnt"),
    class(170, "tree_flooded"),
    class(180, "shrub_herb_flood"),
];

/// GHSL built-up characteristics (open spaces 1-5, residential 11-15,
/// non-residential 21-25 by building height).
pub const GHSL_BUILT_CLASS: [ClassEntry; 15] = [
    class(1, "open_low_veg"),
    class(2, "open_med_veg"),
    class(3, "open_high_veg"),
    class(4, "open_water"),
    class(5, "open_road"),
    class(11, "res_lt3m"),
    class(12, "res_3_6m"),
    class(13, "res_6_15m"),
    class(14, "res_15_30m"),
    class(15, "res_gt30m"),
    class(21, "nonres_lt3m"),
    class(22, "nonres_3_6m"),
    class(23, "nonres_6_15m"),
    class(24, "nonres_15_30m"),
    class(25, "nonres_gt30m"),
];

/// Fire class code of unburnt cells.
pub const UNBURNT_CODE: i64 = 160;

/// Built-up class codes counted by `built_percent`.
pub const BUILT_CLASSES: [i64; 10] = [11, 12, 13, 14, 15, 21, 22, 23, 24, 25];

pub const MODIS: Taxonomy = Taxonomy {
    id: TaxonomyId::ModisLandCover,
    classes: &MODIS_LC_TYPE1,
    zero_exclusive: false,
};

pub const FIRE: Taxonomy = Taxonomy {
    id: TaxonomyId::FireLandCover,
    classes: &FIRE_LC,
    zero_exclusive: false,
};

pub const BUILT_UP: Taxonomy = Taxonomy {
    id: TaxonomyId::BuiltCharacteristics,
    classes: &GHSL_BUILT_CLASS,
    zero_exclusive: true,
};

impl Taxonomy {
    pub fn get(id: TaxonomyId) -> &'static Taxonomy {
        match id {
            TaxonomyId::ModisLandCover => &MODIS,
            TaxonomyId::FireLandCover => &FIRE,
            TaxonomyId::BuiltCharacteristics => &BUILT_UP,
        }
    }

    pub fn name_of(&self, code: i64) -> Option<&'static str> {
        self.classes.iter().find(|c| c.code == code).map(|c| c.name)
    }

    /// Fresh working copy with every `pct_cov` at zero.
    pub fn coverage_table(&self) -> CoverageTable {
        CoverageTable {
            entries: self
                .classes
                .iter()
                .map(|c| {
                    (
                        c.code,
                        ClassCoverage {
                            name: c.name,
                            pct_cov: 0.0,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCoverage {
    pub name: &'static str,
    pub pct_cov: f64,
}

/// Percent coverage per class code, owned by a single reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageTable {
    entries: BTreeMap<i64, ClassCoverage>,
}

impl CoverageTable {
    pub fn get(&self, code: i64) -> Option<&ClassCoverage> {
        self.entries.get(&code)
    }

    /// Set the coverage of a class; codes outside the taxonomy are ignored.
    pub(crate) fn set(&mut self, code: i64, pct_cov: f64) -> bool {
        match self.entries.get_mut(&code) {
            Some(entry) => {
                entry.pct_cov = pct_cov;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, code: i64) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending class-code order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &ClassCoverage)> + '_ {
        self.entries.iter().map(|(code, cov)| (*code, cov))
    }
}
