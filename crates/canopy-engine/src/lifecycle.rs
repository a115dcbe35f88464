//! Lifecycle state machine — guarded phase transitions for cycles.
//!
//! Every transition that allocates a tent hands the occupancy check
//! and its writes to the repository as one [`TransitionPlan`], applied
//! in a single database transaction. The service validates the current
//! derived phase, builds the plan, and emits a notification after the
//! commit.

use std::sync::Arc;

use canopy_core::clock::Clock;
use canopy_core::error::{CanopyError, CanopyResult};
use canopy_core::models::cycle::{CreateCycle, Cycle, CycleStatus, Phase, UpdateCycle};
use canopy_core::models::margin::AlertMargins;
use canopy_core::models::plant::Plant;
use canopy_core::models::strain::Strain;
use canopy_core::models::target::TargetBounds;
use canopy_core::phase::{PhaseContext, PhasePosition, back_date, derive_phase};
use canopy_core::repository::{
    AlertMarginRepository, CloneBatch, CycleRepository, PlantPlan, PlantRepository,
    StrainRepository, TentRepository, TransitionPlan, WeeklyTargetRepository,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::LifecycleError;
use crate::margins::MarginResolver;
use crate::notify::{NotificationSink, TransitionEvent};
use crate::targets::TargetResolver;

/// Input for starting a new cultivation run on a tent.
#[derive(Debug, Clone)]
pub struct InitiateCycle {
    pub tent_id: Uuid,
    pub strain_id: Option<Uuid>,
    /// Anchor date: the reference date is back-dated from here so that
    /// derivation reports the requested `(phase, week)`.
    pub start_date: DateTime<Utc>,
    pub phase: Phase,
    pub week: u32,
    /// Required when `phase` is `Cloning`.
    pub mother_plant_id: Option<Uuid>,
}

/// Administrative override of a cycle's derived position.
#[derive(Debug, Clone)]
pub struct EditCycle {
    pub cycle_id: Uuid,
    pub phase: Phase,
    pub week: u32,
    pub start_date: DateTime<Utc>,
    pub strain_id: Option<Uuid>,
    pub mother_plant_id: Option<Uuid>,
    pub clones_produced: Option<u32>,
}

/// Where a promoted cycle's plants end up.
#[derive(Debug, Clone, Copy)]
pub enum PromoteDestination {
    /// Advance the phase in place.
    Stay,
    /// Relocate to an (unoccupied) tent, finishing the current cycle
    /// and starting a successor there.
    MoveTo(Uuid),
}

/// Result of [`LifecycleService::finish_cloning`].
#[derive(Debug, Clone)]
pub struct CloningOutcome {
    /// Source cycle, back in maintenance.
    pub source_cycle: Cycle,
    /// The new vegetative cycle on the target tent.
    pub new_cycle: Cycle,
    /// Freshly potted clones, all pointing at the mother plant.
    pub clones: Vec<Plant>,
}

/// Result of [`LifecycleService::promote_phase`].
#[derive(Debug, Clone)]
pub struct PromoteOutcome {
    pub cycle: Cycle,
    /// Present when the promotion moved to another tent.
    pub new_cycle: Option<Cycle>,
}

/// Result of [`LifecycleService::transition_to_drying`].
#[derive(Debug, Clone)]
pub struct DryingOutcome {
    pub cycle: Cycle,
    pub new_cycle: Option<Cycle>,
    pub archived_plants: u64,
}

/// Read-path summary: derived position plus effective targets and
/// margins.
#[derive(Debug, Clone)]
pub struct CycleOverview {
    pub cycle: Cycle,
    pub position: PhasePosition,
    /// `None` when no strain has target data for the current week.
    pub targets: Option<TargetBounds>,
    pub margins: AlertMargins,
}

/// The cultivation lifecycle engine.
///
/// Generic over repository implementations so that the engine has no
/// dependency on the database crate.
pub struct LifecycleService<C, P, T, S, W, M>
where
    C: CycleRepository,
    P: PlantRepository,
    T: TentRepository,
    S: StrainRepository,
    W: WeeklyTargetRepository,
    M: AlertMarginRepository,
{
    cycle_repo: C,
    plant_repo: P,
    tent_repo: T,
    strain_repo: S,
    targets: TargetResolver<W, P>,
    margins: MarginResolver<M>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    sink: Arc<dyn NotificationSink>,
}

impl<C, P, T, S, W, M> LifecycleService<C, P, T, S, W, M>
where
    C: CycleRepository,
    P: PlantRepository + Clone,
    T: TentRepository,
    S: StrainRepository,
    W: WeeklyTargetRepository,
    M: AlertMarginRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cycle_repo: C,
        plant_repo: P,
        tent_repo: T,
        strain_repo: S,
        target_repo: W,
        margin_repo: M,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let targets = TargetResolver::new(target_repo, plant_repo.clone());
        let margins = MarginResolver::new(margin_repo, config.default_margins);
        Self {
            cycle_repo,
            plant_repo,
            tent_repo,
            strain_repo,
            targets,
            margins,
            clock,
            config,
            sink,
        }
    }

    /// The target resolver, for read paths outside a full overview.
    pub fn targets(&self) -> &TargetResolver<W, P> {
        &self.targets
    }

    /// The margin resolver.
    pub fn margins(&self) -> &MarginResolver<M> {
        &self.margins
    }

    // -------------------------------------------------------------------
    // Derivation helpers
    // -------------------------------------------------------------------

    /// Strain applying to a cycle: the cycle's own strain, or the
    /// single distinct strain among the tent's active plants.
    async fn resolve_strain(&self, cycle: &Cycle) -> CanopyResult<Option<Strain>> {
        if let Some(strain_id) = cycle.strain_id {
            return Ok(Some(self.strain_repo.get_by_id(strain_id).await?));
        }

        let plants = self.plant_repo.list_active_by_tent(cycle.tent_id).await?;
        let mut strain_ids: Vec<Uuid> = Vec::new();
        for plant in plants {
            if !strain_ids.contains(&plant.strain_id) {
                strain_ids.push(plant.strain_id);
            }
        }
        match strain_ids[..] {
            [only] => Ok(Some(self.strain_repo.get_by_id(only).await?)),
            _ => Ok(None),
        }
    }

    async fn phase_context(&self, cycle: &Cycle) -> CanopyResult<PhaseContext> {
        let tent = self.tent_repo.get_by_id(cycle.tent_id).await?;
        let strain = self.resolve_strain(cycle).await?;
        Ok(PhaseContext {
            tent_category: tent.category,
            vega_weeks: Some(
                strain
                    .as_ref()
                    .map_or(self.config.default_vega_weeks, |s| s.vega_weeks),
            ),
            flora_weeks: Some(
                strain
                    .as_ref()
                    .map_or(self.config.default_flora_weeks, |s| s.flora_weeks),
            ),
        })
    }

    async fn derived(&self, cycle: &Cycle) -> CanopyResult<PhasePosition> {
        let ctx = self.phase_context(cycle).await?;
        Ok(derive_phase(cycle, &ctx, self.clock.now()))
    }

    /// Current derived position of a cycle.
    pub async fn position(&self, cycle_id: Uuid) -> CanopyResult<PhasePosition> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        self.derived(&cycle).await
    }

    async fn active_cycle(&self, cycle_id: Uuid) -> CanopyResult<Cycle> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        if cycle.status != CycleStatus::Active {
            return Err(LifecycleError::CycleFinished { cycle_id }.into());
        }
        Ok(cycle)
    }

    async fn active_plant_ids(&self, tent_id: Uuid) -> CanopyResult<Vec<Uuid>> {
        let plants = self.plant_repo.list_active_by_tent(tent_id).await?;
        Ok(plants.into_iter().map(|p| p.id).collect())
    }

    // -------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------

    /// Start a new cultivation run. The tent-occupancy check happens
    /// atomically with the insert.
    pub async fn initiate(&self, input: InitiateCycle) -> CanopyResult<Cycle> {
        self.tent_repo.get_by_id(input.tent_id).await?;

        if input.phase == Phase::Cloning && input.mother_plant_id.is_none() {
            return Err(LifecycleError::MissingMotherPlant.into());
        }

        // Back-date the reference date so derivation lands on the
        // requested (phase, week).
        let reference = back_date(input.start_date, input.week.max(1));
        let mut create = CreateCycle {
            tent_id: input.tent_id,
            strain_id: input.strain_id,
            start_date: reference,
            cloning_start_date: None,
            flora_start_date: None,
            drying_start_date: None,
            mother_plant_id: input.mother_plant_id,
        };
        match input.phase {
            Phase::Cloning => create.cloning_start_date = Some(reference),
            Phase::Flora => create.flora_start_date = Some(reference),
            Phase::Drying => create.drying_start_date = Some(reference),
            Phase::Vega | Phase::Maintenance => {}
        }

        let cycle = self.cycle_repo.create(create).await?;

        info!(
            cycle_id = %cycle.id,
            tent_id = %cycle.tent_id,
            phase = %input.phase,
            week = input.week,
            "Initiated cycle"
        );
        self.sink.notify(TransitionEvent::CycleInitiated {
            cycle_id: cycle.id,
            tent_id: cycle.tent_id,
            phase: input.phase,
            week: input.week,
        });

        Ok(cycle)
    }

    /// Open a cloning episode on an active cycle.
    pub async fn transition_to_cloning(
        &self,
        cycle_id: Uuid,
        date: DateTime<Utc>,
    ) -> CanopyResult<Cycle> {
        let cycle = self.active_cycle(cycle_id).await?;
        if cycle.cloning_start_date.is_some() {
            return Err(LifecycleError::CloningAlreadyStarted { cycle_id }.into());
        }

        let cycle = self
            .cycle_repo
            .update(
                cycle_id,
                UpdateCycle {
                    cloning_start_date: Some(Some(date)),
                    ..Default::default()
                },
            )
            .await?;

        self.sink
            .notify(TransitionEvent::CloningStarted { cycle_id, date });

        Ok(cycle)
    }

    /// Close the cloning episode and return to maintenance.
    ///
    /// `clones_produced` overwrites the stored count only when
    /// supplied; a previously stored count is never silently zeroed.
    pub async fn transition_to_maintenance(
        &self,
        cycle_id: Uuid,
        clones_produced: Option<u32>,
    ) -> CanopyResult<Cycle> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        if cycle.cloning_start_date.is_none() {
            return Err(LifecycleError::CloningNotStarted { cycle_id }.into());
        }

        let cycle = self
            .cycle_repo
            .update(
                cycle_id,
                UpdateCycle {
                    cloning_start_date: Some(None),
                    clones_produced,
                    ..Default::default()
                },
            )
            .await?;

        self.sink.notify(TransitionEvent::ReturnedToMaintenance {
            cycle_id,
            clones_produced: cycle.clones_produced,
        });

        Ok(cycle)
    }

    /// Pot up a batch of clones: create the seedlings on the target
    /// tent, start a vegetative cycle there, and return the source
    /// cycle to maintenance — one transaction.
    pub async fn finish_cloning(
        &self,
        cycle_id: Uuid,
        target_tent_id: Uuid,
        seedling_count: u32,
    ) -> CanopyResult<CloningOutcome> {
        if seedling_count == 0 {
            return Err(LifecycleError::EmptyCloneBatch.into());
        }

        let cycle = self.active_cycle(cycle_id).await?;
        let position = self.derived(&cycle).await?;
        if position.phase != Phase::Cloning {
            return Err(LifecycleError::InvalidTransition {
                from: position.phase,
                requested: Phase::Maintenance,
            }
            .into());
        }

        let mother_id = cycle
            .mother_plant_id
            .ok_or(LifecycleError::MissingMotherPlant)?;
        let mother = self.plant_repo.get_by_id(mother_id).await?;
        self.tent_repo.get_by_id(target_tent_id).await?;

        let now = self.clock.now();
        let plan = TransitionPlan {
            cycle_id,
            update: UpdateCycle {
                cloning_start_date: Some(None),
                clones_produced: Some(seedling_count),
                ..Default::default()
            },
            finish_source: false,
            retarget_tent_id: None,
            new_cycle: Some(CreateCycle {
                tent_id: target_tent_id,
                strain_id: Some(mother.strain_id),
                start_date: now,
                cloning_start_date: None,
                flora_start_date: None,
                drying_start_date: None,
                mother_plant_id: None,
            }),
            plants: PlantPlan::Keep,
            clones: Some(CloneBatch {
                tent_id: target_tent_id,
                strain_id: mother.strain_id,
                mother_plant_id: mother_id,
                count: seedling_count,
            }),
        };

        let outcome = self.cycle_repo.apply_transition(plan).await?;
        let new_cycle = outcome.new_cycle.ok_or_else(|| {
            CanopyError::Internal("transition plan produced no successor cycle".into())
        })?;

        info!(
            cycle_id = %cycle_id,
            target_tent_id = %target_tent_id,
            seedlings = seedling_count,
            new_cycle_id = %new_cycle.id,
            "Finished cloning"
        );
        self.sink.notify(TransitionEvent::CloningFinished {
            source_cycle_id: cycle_id,
            new_cycle_id: new_cycle.id,
            target_tent_id,
            seedlings: seedling_count,
        });

        Ok(CloningOutcome {
            source_cycle: outcome.cycle,
            new_cycle,
            clones: outcome.clones,
        })
    }

    /// Start flowering. With a target tent, the cycle and all of its
    /// plants move there atomically.
    pub async fn transition_to_flora(
        &self,
        cycle_id: Uuid,
        flora_start_date: DateTime<Utc>,
        target_tent_id: Option<Uuid>,
    ) -> CanopyResult<Cycle> {
        let cycle = self.active_cycle(cycle_id).await?;
        let position = self.derived(&cycle).await?;
        if position.phase != Phase::Vega {
            return Err(LifecycleError::InvalidTransition {
                from: position.phase,
                requested: Phase::Flora,
            }
            .into());
        }

        let mut plan = TransitionPlan::patch(
            cycle_id,
            UpdateCycle {
                flora_start_date: Some(Some(flora_start_date)),
                ..Default::default()
            },
        );

        if let Some(target) = target_tent_id
            && target != cycle.tent_id
        {
            self.tent_repo.get_by_id(target).await?;
            plan.retarget_tent_id = Some(target);
            plan.plants = PlantPlan::Relocate {
                plant_ids: self.active_plant_ids(cycle.tent_id).await?,
                from_tent_id: cycle.tent_id,
                to_tent_id: target,
                reason: "moved for flowering".into(),
            };
        }

        let outcome = self.cycle_repo.apply_transition(plan).await?;

        self.sink.notify(TransitionEvent::FloraStarted {
            cycle_id,
            tent_id: outcome.cycle.tent_id,
            relocated_plants: outcome.plants_moved,
        });

        Ok(outcome.cycle)
    }

    /// Promote a cycle one phase forward (`Vega → Flora` or
    /// `Flora → Drying`), either in place or onto another tent.
    pub async fn promote_phase(
        &self,
        cycle_id: Uuid,
        target_phase: Phase,
        destination: PromoteDestination,
    ) -> CanopyResult<PromoteOutcome> {
        let cycle = self.active_cycle(cycle_id).await?;
        let position = self.derived(&cycle).await?;

        let pairing_ok = matches!(
            (position.phase, target_phase),
            (Phase::Vega, Phase::Flora) | (Phase::Flora, Phase::Drying)
        );
        if !pairing_ok {
            return Err(LifecycleError::InvalidTransition {
                from: position.phase,
                requested: target_phase,
            }
            .into());
        }

        let now = self.clock.now();
        let date_patch = match target_phase {
            Phase::Flora => UpdateCycle {
                flora_start_date: Some(Some(now)),
                ..Default::default()
            },
            _ => UpdateCycle {
                drying_start_date: Some(Some(now)),
                ..Default::default()
            },
        };

        let outcome = match destination {
            PromoteDestination::Stay => {
                let plan = TransitionPlan::patch(cycle_id, date_patch);
                self.cycle_repo.apply_transition(plan).await?
            }
            PromoteDestination::MoveTo(target) => {
                self.tent_repo.get_by_id(target).await?;

                let mut new_cycle = CreateCycle {
                    tent_id: target,
                    strain_id: cycle.strain_id,
                    start_date: now,
                    cloning_start_date: None,
                    flora_start_date: None,
                    drying_start_date: None,
                    mother_plant_id: None,
                };
                match target_phase {
                    Phase::Flora => new_cycle.flora_start_date = Some(now),
                    _ => new_cycle.drying_start_date = Some(now),
                }

                let plan = TransitionPlan {
                    cycle_id,
                    update: UpdateCycle::default(),
                    finish_source: true,
                    retarget_tent_id: None,
                    new_cycle: Some(new_cycle),
                    plants: PlantPlan::Relocate {
                        plant_ids: self.active_plant_ids(cycle.tent_id).await?,
                        from_tent_id: cycle.tent_id,
                        to_tent_id: target,
                        reason: format!("promoted to {target_phase}"),
                    },
                    clones: None,
                };
                self.cycle_repo.apply_transition(plan).await?
            }
        };

        self.sink.notify(TransitionEvent::PhasePromoted {
            cycle_id,
            new_cycle_id: outcome.new_cycle.as_ref().map(|c| c.id),
            phase: target_phase,
        });

        Ok(PromoteOutcome {
            cycle: outcome.cycle,
            new_cycle: outcome.new_cycle,
        })
    }

    /// Harvest: archive the plants and dry in place, or move
    /// everything to a drying tent and finish the flowering cycle.
    pub async fn transition_to_drying(
        &self,
        cycle_id: Uuid,
        drying_start_date: DateTime<Utc>,
        target_tent_id: Option<Uuid>,
        harvest_notes: Option<String>,
    ) -> CanopyResult<DryingOutcome> {
        let cycle = self.active_cycle(cycle_id).await?;
        let position = self.derived(&cycle).await?;
        if position.phase != Phase::Flora {
            return Err(LifecycleError::InvalidTransition {
                from: position.phase,
                requested: Phase::Drying,
            }
            .into());
        }

        let plant_ids = self.active_plant_ids(cycle.tent_id).await?;

        let mut update = UpdateCycle {
            harvest_notes: harvest_notes.map(Some),
            ..Default::default()
        };

        let plan = match target_tent_id {
            None => {
                update.drying_start_date = Some(Some(drying_start_date));
                TransitionPlan {
                    cycle_id,
                    update,
                    finish_source: false,
                    retarget_tent_id: None,
                    new_cycle: None,
                    plants: PlantPlan::Archive { plant_ids },
                    clones: None,
                }
            }
            Some(target) => {
                if target == cycle.tent_id {
                    return Err(CanopyError::Validation {
                        message: "drying destination equals the current tent".into(),
                    });
                }
                self.tent_repo.get_by_id(target).await?;

                TransitionPlan {
                    cycle_id,
                    update,
                    finish_source: true,
                    retarget_tent_id: None,
                    new_cycle: Some(CreateCycle {
                        tent_id: target,
                        strain_id: cycle.strain_id,
                        start_date: drying_start_date,
                        cloning_start_date: None,
                        flora_start_date: None,
                        drying_start_date: Some(drying_start_date),
                        mother_plant_id: None,
                    }),
                    plants: PlantPlan::Relocate {
                        plant_ids,
                        from_tent_id: cycle.tent_id,
                        to_tent_id: target,
                        reason: "moved for drying".into(),
                    },
                    clones: None,
                }
            }
        };

        let outcome = self.cycle_repo.apply_transition(plan).await?;

        info!(
            cycle_id = %cycle_id,
            archived = outcome.plants_archived,
            moved = outcome.plants_moved,
            "Started drying"
        );
        self.sink.notify(TransitionEvent::DryingStarted {
            cycle_id,
            new_cycle_id: outcome.new_cycle.as_ref().map(|c| c.id),
            archived_plants: outcome.plants_archived,
        });

        Ok(DryingOutcome {
            cycle: outcome.cycle,
            new_cycle: outcome.new_cycle,
            archived_plants: outcome.plants_archived,
        })
    }

    /// Administrative override: force derivation to report the given
    /// `(phase, week)` by rewriting the reference dates.
    pub async fn edit_cycle(&self, input: EditCycle) -> CanopyResult<Cycle> {
        let cycle = self.cycle_repo.get_by_id(input.cycle_id).await?;

        if input.phase == Phase::Cloning
            && input.mother_plant_id.or(cycle.mother_plant_id).is_none()
        {
            return Err(LifecycleError::MissingMotherPlant.into());
        }

        let reference = back_date(input.start_date, input.week.max(1));
        let mut update = UpdateCycle {
            start_date: Some(reference),
            strain_id: input.strain_id.map(Some),
            mother_plant_id: input.mother_plant_id.map(Some),
            clones_produced: input.clones_produced,
            ..Default::default()
        };

        // Clear any later-phase dates that would shadow the requested
        // phase under the latest-started-wins priority.
        match input.phase {
            Phase::Maintenance | Phase::Vega => {
                update.cloning_start_date = Some(None);
                update.flora_start_date = Some(None);
                update.drying_start_date = Some(None);
            }
            Phase::Cloning => {
                update.cloning_start_date = Some(Some(reference));
                update.flora_start_date = Some(None);
                update.drying_start_date = Some(None);
            }
            Phase::Flora => {
                update.flora_start_date = Some(Some(reference));
                update.drying_start_date = Some(None);
            }
            Phase::Drying => {
                update.drying_start_date = Some(Some(reference));
            }
        }

        let cycle = self.cycle_repo.update(input.cycle_id, update).await?;

        self.sink.notify(TransitionEvent::CycleEdited {
            cycle_id: input.cycle_id,
            phase: input.phase,
            week: input.week,
        });

        Ok(cycle)
    }

    // -------------------------------------------------------------------
    // Read path
    // -------------------------------------------------------------------

    /// Derived position, effective targets, and alert margins in one
    /// call.
    pub async fn cycle_overview(&self, cycle_id: Uuid) -> CanopyResult<CycleOverview> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        let position = self.derived(&cycle).await?;

        let strain_ids: Vec<Uuid> = cycle.strain_id.into_iter().collect();
        let targets = match self
            .targets
            .resolve(&strain_ids, cycle.tent_id, position.phase, position.week)
            .await
        {
            Ok(bounds) => Some(bounds),
            Err(CanopyError::NoTargetData { .. }) => None,
            Err(other) => return Err(other),
        };

        let margins = self.margins.resolve(position.phase).await?;

        Ok(CycleOverview {
            cycle,
            position,
            targets,
            margins,
        })
    }
}
