//! Residents as stored in the UnitList sheet
//!
//! UnitList has no reliable header titles, so columns are addressed by
//! position (A to K).

use common::{Cell, Row};
use serde::Serialize;
use std::collections::BTreeSet;

pub const UNIT_LIST_SHEET: &str = "UnitList";

pub const DEFAULT_STAGE: &str = "Stage 1";
pub const DEFAULT_ROLE_TAGS: &str = "Resident";
pub const DEFAULT_ZONE: &str = "Zone 1";

/// Column positions in UnitList
pub mod col {
    pub const UNIT_NUMBER: usize = 0;
    pub const RESIDENT_NAME: usize = 1;
    pub const EMAIL: usize = 2;
    pub const PHONE: usize = 3;
    pub const ZONE: usize = 4;
    pub const DISPLAY_NAME: usize = 5;
    pub const PRIMARY_NAME: usize = 6;
    pub const PRIMARY_EMAIL: usize = 7;
    pub const PRIMARY_PHONE: usize = 8;
    pub const STAGE: usize = 9;
    pub const ROLE_TAGS: usize = 10;

    pub const WIDTH: usize = 11;
}

/// Column names used when reporting row changes
pub const COLUMN_NAMES: [&str; col::WIDTH] = [
    "Unit Number",
    "Resident Name",
    "Email",
    "Phone",
    "Zone",
    "Additional",
    "Unit Primary Name",
    "Unit Primary Email",
    "Unit Primary Phone",
    "Stage",
    "Role Tags",
];

/// One UnitList row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub unit_number: String,
    pub resident_name: String,
    pub email: String,
    pub phone: String,
    pub zone: String,
    pub unit_display_name: String,
    pub unit_primary_name: String,
    pub unit_primary_email: String,
    pub unit_primary_phone: String,
    pub stage: String,
    pub role_tags: String,
}

impl Resident {
    pub fn from_row(row: &[Cell]) -> Self {
        let text = |idx: usize| row.get(idx).map(Cell::text).unwrap_or_default();
        Self {
            unit_number: text(col::UNIT_NUMBER),
            resident_name: text(col::RESIDENT_NAME),
            email: text(col::EMAIL),
            phone: text(col::PHONE),
            zone: text(col::ZONE),
            unit_display_name: text(col::DISPLAY_NAME),
            unit_primary_name: text(col::PRIMARY_NAME),
            unit_primary_email: text(col::PRIMARY_EMAIL),
            unit_primary_phone: text(col::PRIMARY_PHONE),
            stage: text(col::STAGE),
            role_tags: text(col::ROLE_TAGS),
        }
    }

    pub fn to_row(&self) -> Row {
        [
            &self.unit_number,
            &self.resident_name,
            &self.email,
            &self.phone,
            &self.zone,
            &self.unit_display_name,
            &self.unit_primary_name,
            &self.unit_primary_email,
            &self.unit_primary_phone,
            &self.stage,
            &self.role_tags,
        ]
        .into_iter()
        .map(Cell::from)
        .collect()
    }

    /// A row counts as a resident when it has a unit or a name
    pub fn is_listed(&self) -> bool {
        !self.unit_number.is_empty() || !self.resident_name.is_empty()
    }

    /// Stage with the `Stage 1` default applied
    pub fn stage_or_default(&self) -> &str {
        if self.stage.is_empty() {
            DEFAULT_STAGE
        } else {
            &self.stage
        }
    }

    pub fn role_tags_or_default(&self) -> &str {
        if self.role_tags.is_empty() {
            DEFAULT_ROLE_TAGS
        } else {
            &self.role_tags
        }
    }

    /// Zone representative slots (1 to 5) named by `ZoneRep-N` role tags
    pub fn zone_rep_zones(&self) -> Vec<u8> {
        self.role_tags
            .split(',')
            .filter_map(|tag| tag.trim().strip_prefix("ZoneRep-"))
            .filter_map(|n| {
                let digits: String = n.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u8>().ok()
            })
            .filter(|n| (1..=5).contains(n))
            .collect()
    }
}

/// Numeric value of the digits in a unit label, `Unit 12A` giving 12
pub fn unit_digits(unit: &str) -> Option<u32> {
    let digits: String = unit.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Postal address of a unit
pub fn unit_address(unit: &str, stage: &str) -> String {
    let Some(number) = unit_digits(unit) else {
        return String::new();
    };

    let street = if stage.to_lowercase().contains("stage 2") {
        (1..=32).contains(&number).then_some("59-73 Gladesville Boulevard")
    } else {
        (1..=44).contains(&number).then_some("75-93 Gladesville Boulevard")
    }
    .unwrap_or("Lake Illawong Retirement Village");

    format!("Unit {}, {}, Patterson Lakes, Melbourne 3197", number, street)
}

/// Display name of a unit: `12 - ( Ann Lee & Bo Lee )`.
///
/// Names come from every row with the same unit and zone; a blank zone
/// gives a blank display name.
pub fn display_name(unit: &str, zone: &str, residents: &[Resident]) -> String {
    if zone.is_empty() {
        return String::new();
    }

    let mut seen = BTreeSet::new();
    let names: Vec<&str> = residents
        .iter()
        .filter(|r| r.unit_number == unit && r.zone == zone && !r.resident_name.is_empty())
        .map(|r| r.resident_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect();

    format!("{} - ( {} )", unit.replace("Unit ", ""), names.join(" & "))
}

/// Recompute the display-name column of every data row
pub fn refresh_display_names(rows: &mut [Row]) {
    let residents: Vec<Resident> = rows.iter().skip(1).map(|r| Resident::from_row(r)).collect();
    for (row, resident) in rows.iter_mut().skip(1).zip(&residents) {
        if !resident.is_listed() {
            continue;
        }
        if row.len() < col::WIDTH {
            row.resize(col::WIDTH, Cell::Empty);
        }
        row[col::DISPLAY_NAME] =
            display_name(&resident.unit_number, &resident.zone, &residents).into();
    }
}

/// Row index at which a new resident is inserted.
///
/// Rows are grouped by stage and ordered by unit digits inside a stage. A
/// stage with no rows yet goes right after the Stage 1 block.
pub fn insertion_index(rows: &[Row], stage: &str, unit: &str) -> usize {
    let target_stage = if stage.is_empty() { DEFAULT_STAGE } else { stage };
    let target_unit = unit_digits(unit).filter(|n| *n > 0).unwrap_or(999);
    let stage_of = |row: &Row| {
        let resident = Resident::from_row(row);
        resident.stage_or_default().to_string()
    };

    let mut last_stage_row = 0;
    for (i, row) in rows.iter().enumerate().skip(1) {
        let row_stage = stage_of(row);
        let row_unit = unit_digits(&row.first().map(Cell::text).unwrap_or_default()).unwrap_or(0);

        if row_stage == target_stage {
            last_stage_row = i;
            if target_unit < row_unit {
                return i;
            }
        } else if last_stage_row > 0 {
            return i;
        }
    }

    if last_stage_row > 0 {
        return last_stage_row + 1;
    }

    if target_stage == DEFAULT_STAGE {
        return 1;
    }

    rows.iter()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| stage_of(row) == DEFAULT_STAGE)
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0)
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(unit: &str, name: &str, zone: &str, stage: &str) -> Row {
        Resident {
            unit_number: unit.into(),
            resident_name: name.into(),
            zone: zone.into(),
            stage: stage.into(),
            ..Default::default()
        }
        .to_row()
    }

    fn sheet() -> Vec<Row> {
        vec![
            COLUMN_NAMES.iter().map(|c| Cell::from(*c)).collect(),
            row("Unit 2", "Ann Lee", "Zone 1", "Stage 1"),
            row("Unit 9", "Bo Chan", "Zone 2", ""),
            row("Unit 3", "Cy Dunn", "Zone 3", "Stage 2"),
            row("Unit 30", "Di Ames", "Zone 3", "Stage 2"),
        ]
    }

    #[test]
    fn addresses_follow_stage_and_unit_ranges() {
        assert_eq!(
            unit_address("Unit 12", "Stage 2"),
            "Unit 12, 59-73 Gladesville Boulevard, Patterson Lakes, Melbourne 3197"
        );
        assert_eq!(
            unit_address("Unit 40", "Stage 2"),
            "Unit 40, Lake Illawong Retirement Village, Patterson Lakes, Melbourne 3197"
        );
        assert_eq!(
            unit_address("12", "Stage 1"),
            "Unit 12, 75-93 Gladesville Boulevard, Patterson Lakes, Melbourne 3197"
        );
        assert_eq!(
            unit_address("Unit 77", ""),
            "Unit 77, Lake Illawong Retirement Village, Patterson Lakes, Melbourne 3197"
        );
        assert_eq!(unit_address("Office", "Stage 1"), "");
    }

    #[test]
    fn display_name_joins_unique_names_of_unit_and_zone() {
        let residents = vec![
            Resident::from_row(&row("Unit 5", "Ann Lee", "Zone 1", "")),
            Resident::from_row(&row("Unit 5", "Bo Lee", "Zone 1", "")),
            Resident::from_row(&row("Unit 5", "Ann Lee", "Zone 1", "")),
            Resident::from_row(&row("Unit 5", "Cy Other", "Zone 2", "")),
        ];
        assert_eq!(
            display_name("Unit 5", "Zone 1", &residents),
            "5 - ( Ann Lee & Bo Lee )"
        );
        assert_eq!(display_name("Unit 5", "", &residents), "");
    }

    #[test]
    fn insertion_orders_units_inside_a_stage() {
        let rows = sheet();
        assert_eq!(insertion_index(&rows, "Stage 1", "Unit 5"), 2);
        assert_eq!(insertion_index(&rows, "Stage 1", "Unit 1"), 1);
        assert_eq!(insertion_index(&rows, "Stage 2", "Unit 10"), 4);
        assert_eq!(insertion_index(&rows, "Stage 2", "Unit 31"), 5);
    }

    #[test]
    fn new_stage_goes_after_stage_one_block() {
        let rows = sheet();
        assert_eq!(insertion_index(&rows, "Stage 3", "Unit 1"), 3);

        let header_only = vec![sheet().remove(0)];
        assert_eq!(insertion_index(&header_only, "Stage 1", "Unit 4"), 1);
        assert_eq!(insertion_index(&header_only, "Stage 2", "Unit 4"), 1);
    }

    #[test]
    fn zone_rep_tags_are_parsed() {
        let resident = Resident {
            role_tags: "Resident, ZoneRep-2,ZoneRep-7, ZoneRep-x".into(),
            ..Default::default()
        };
        assert_eq!(resident.zone_rep_zones(), vec![2]);
    }
}
