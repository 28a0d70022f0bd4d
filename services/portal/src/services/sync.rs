//! Derived lists kept in step with the resident directory
//!
//! The "Reported By" dropdown lists Stage 1 residents, and the zone rep
//! email list holds two slots per zone filled from `ZoneRep-N` role tags.

use common::Cell;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::error::PortalResult;
use crate::models::resident::{DEFAULT_STAGE, Resident};
use crate::repositories::dropdowns::kinds;
use crate::repositories::named_ranges::ZONE_REP_RANGE;
use crate::repositories::{DropdownRepository, NamedRangeRepository, ResidentRepository};
use crate::services::clock::Clock;

const ZONES: u8 = 5;
const SLOTS_PER_ZONE: usize = 2;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_count: Option<usize>,
    pub synced_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRep {
    pub name: String,
    pub email: String,
    pub zone: u8,
}

/// Names offered in the "Reported By" dropdown: Stage 1 rows tagged as
/// residents, unique and sorted
pub fn reporter_names(residents: &[Resident]) -> Vec<String> {
    residents
        .iter()
        .filter(|r| r.stage == DEFAULT_STAGE)
        .filter(|r| r.role_tags.to_lowercase().contains("resident"))
        .map(|r| r.resident_name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Representatives per zone (1 to 5), in directory order
pub fn zone_reps(residents: &[Resident]) -> BTreeMap<u8, Vec<ZoneRep>> {
    let mut reps: BTreeMap<u8, Vec<ZoneRep>> = (1..=ZONES).map(|z| (z, Vec::new())).collect();
    for resident in residents {
        let name = resident.resident_name.trim();
        let email = resident.email.trim();
        if name.is_empty() || email.is_empty() {
            continue;
        }
        for zone in resident.zone_rep_zones() {
            reps.entry(zone).or_default().push(ZoneRep {
                name: name.to_string(),
                email: email.to_string(),
                zone,
            });
        }
    }
    reps
}

/// Rows of the zone rep email list: two `[Zone N, name, email]` slots per
/// zone, blank when the zone has fewer reps
pub fn zone_rep_rows(reps: &BTreeMap<u8, Vec<ZoneRep>>) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(ZONES as usize * SLOTS_PER_ZONE);
    for zone in 1..=ZONES {
        let listed = reps.get(&zone).map(Vec::as_slice).unwrap_or_default();
        for slot in 0..SLOTS_PER_ZONE {
            let (name, email) = listed
                .get(slot)
                .map(|rep| (rep.name.as_str(), rep.email.as_str()))
                .unwrap_or(("", ""));
            rows.push(vec![
                Cell::from(format!("Zone {}", zone)),
                Cell::from(name),
                Cell::from(email),
            ]);
        }
    }
    rows
}

/// Keeps dropdowns and the zone rep list in step with UnitList
#[derive(Clone)]
pub struct DirectorySync {
    residents: ResidentRepository,
    dropdowns: DropdownRepository,
    ranges: NamedRangeRepository,
    clock: Clock,
}

impl DirectorySync {
    pub fn new(
        residents: ResidentRepository,
        dropdowns: DropdownRepository,
        ranges: NamedRangeRepository,
        clock: Clock,
    ) -> Self {
        Self {
            residents,
            dropdowns,
            ranges,
            clock,
        }
    }

    async fn all_residents(&self) -> PortalResult<Vec<Resident>> {
        Ok(self
            .residents
            .list()
            .await?
            .into_iter()
            .map(|(_, r)| r)
            .collect())
    }

    /// Rewrite the "Reported By" dropdown from the directory
    pub async fn sync_reporters(&self) -> PortalResult<SyncReport> {
        let names = reporter_names(&self.all_residents().await?);
        self.dropdowns.replace_kind(kinds::REPORTED_BY, &names).await?;

        info!("Reported By dropdown synchronized with {} residents", names.len());
        Ok(SyncReport {
            message: format!("DDM synchronized: {} Stage 1 Residents", names.len()),
            resident_count: Some(names.len()),
            synced_at: self.clock.iso_now(),
        })
    }

    /// Rewrite the zone rep email list from the directory
    pub async fn sync_zone_reps(&self) -> PortalResult<SyncReport> {
        let reps = zone_reps(&self.all_residents().await?);
        self.ranges
            .replace_rows(ZONE_REP_RANGE, zone_rep_rows(&reps))
            .await?;

        info!("{} synchronized", ZONE_REP_RANGE);
        Ok(SyncReport {
            message: format!("Zone Rep list synchronized in {}", ZONE_REP_RANGE),
            resident_count: None,
            synced_at: self.clock.iso_now(),
        })
    }

    /// Run a sync and report only whether it worked
    pub async fn try_sync(&self, reporters: bool, zone_reps: bool) -> (bool, bool) {
        let reporters_ok = if reporters {
            match self.sync_reporters().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Reported By sync failed: {}", e);
                    false
                }
            }
        } else {
            false
        };

        let zone_reps_ok = if zone_reps {
            match self.sync_zone_reps().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Zone rep sync failed: {}", e);
                    false
                }
            }
        } else {
            false
        };

        (reporters_ok, zone_reps_ok)
    }

    pub async fn zone_reps(&self) -> PortalResult<BTreeMap<u8, Vec<ZoneRep>>> {
        Ok(zone_reps(&self.all_residents().await?))
    }
}
