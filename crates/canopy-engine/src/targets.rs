//! Target resolver — effective weekly environmental targets.
//!
//! Bounds are averaged arithmetically across the applicable strains'
//! rows, min and max independently. A strain without a row for the
//! exact `(phase, week)` contributes nothing — it is excluded from the
//! average, not treated as zero. Zero applicable rows is an error:
//! callers must be able to distinguish "no data" from "target is 0".

use canopy_core::error::CanopyResult;
use canopy_core::models::cycle::Phase;
use canopy_core::models::target::{Bounds, TargetBounds, WeeklyTarget};
use canopy_core::repository::{PlantRepository, WeeklyTargetRepository};
use uuid::Uuid;

use crate::error::LifecycleError;

pub struct TargetResolver<W, P>
where
    W: WeeklyTargetRepository,
    P: PlantRepository,
{
    target_repo: W,
    plant_repo: P,
}

impl<W, P> TargetResolver<W, P>
where
    W: WeeklyTargetRepository,
    P: PlantRepository,
{
    pub fn new(target_repo: W, plant_repo: P) -> Self {
        Self {
            target_repo,
            plant_repo,
        }
    }

    /// Resolve the effective targets for `(phase, week)`.
    ///
    /// An empty `strain_ids` falls back to the strains of `tent_id`'s
    /// active plants.
    pub async fn resolve(
        &self,
        strain_ids: &[Uuid],
        tent_id: Uuid,
        phase: Phase,
        week: u32,
    ) -> CanopyResult<TargetBounds> {
        let effective = if strain_ids.is_empty() {
            self.strains_in_tent(tent_id).await?
        } else {
            strain_ids.to_vec()
        };

        let rows = self.target_repo.get_for_week(&effective, phase, week).await?;
        if rows.is_empty() {
            return Err(LifecycleError::NoTargetData { phase, week }.into());
        }

        Ok(average(&rows))
    }

    /// Distinct strains of the tent's active plants, in first-seen order.
    async fn strains_in_tent(&self, tent_id: Uuid) -> CanopyResult<Vec<Uuid>> {
        let plants = self.plant_repo.list_active_by_tent(tent_id).await?;
        let mut strains = Vec::new();
        for plant in plants {
            if !strains.contains(&plant.strain_id) {
                strains.push(plant.strain_id);
            }
        }
        Ok(strains)
    }
}

fn average(rows: &[WeeklyTarget]) -> TargetBounds {
    let mean = |pick: fn(&WeeklyTarget) -> Bounds| {
        let n = rows.len() as f64;
        let (min_sum, max_sum) = rows.iter().fold((0.0, 0.0), |(lo, hi), row| {
            let b = pick(row);
            (lo + b.min, hi + b.max)
        });
        Bounds::new(min_sum / n, max_sum / n)
    };

    TargetBounds {
        ppfd: mean(|r| r.ppfd),
        photoperiod_hours: mean(|r| r.photoperiod_hours),
        temperature_c: mean(|r| r.temperature_c),
        humidity_pct: mean(|r| r.humidity_pct),
        ph: mean(|r| r.ph),
        ec_ms_cm: mean(|r| r.ec_ms_cm),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(temp: (f64, f64)) -> WeeklyTarget {
        WeeklyTarget {
            id: Uuid::new_v4(),
            strain_id: Uuid::new_v4(),
            phase: Phase::Vega,
            week_number: 2,
            ppfd: Bounds::new(400.0, 600.0),
            photoperiod_hours: Bounds::new(18.0, 18.0),
            temperature_c: Bounds::new(temp.0, temp.1),
            humidity_pct: Bounds::new(55.0, 70.0),
            ph: Bounds::new(5.8, 6.2),
            ec_ms_cm: Bounds::new(1.0, 1.6),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn averages_min_and_max_independently() {
        let rows = [row((20.0, 24.0)), row((24.0, 28.0))];
        let bounds = average(&rows);
        assert_eq!(bounds.temperature_c, Bounds::new(22.0, 26.0));
        assert_eq!(bounds.ppfd, Bounds::new(400.0, 600.0));
    }

    #[test]
    fn single_row_average_is_identity() {
        let rows = [row((18.5, 23.5))];
        let bounds = average(&rows);
        assert_eq!(bounds.temperature_c, Bounds::new(18.5, 23.5));
    }
}
