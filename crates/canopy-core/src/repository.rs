//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations must make each
//! method atomic: in particular [`CycleRepository::create`] and
//! [`CycleRepository::apply_transition`] perform their tent-occupancy
//! check and their writes as one transaction, and
//! [`PlantRepository::relocate`] moves a batch all-or-nothing.

use uuid::Uuid;

use crate::error::CanopyResult;
use crate::models::{
    cycle::{CreateCycle, Cycle, Phase, UpdateCycle},
    history::PlantTentHistory,
    margin::{PhaseAlertMargin, UpsertPhaseAlertMargin},
    plant::{CreatePlant, Plant, RelocatePlants},
    strain::{CreateStrain, Strain},
    target::{CreateWeeklyTarget, WeeklyTarget},
    tent::{CreateTent, Tent, UpdateTent},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Composite transitions
// ---------------------------------------------------------------------------

/// What happens to the plants of the source cycle's tent during a
/// transition. The "move or archive" branching shared by several
/// transitions is expressed once, here.
#[derive(Debug, Clone)]
pub enum PlantPlan {
    /// Plants stay where they are.
    Keep,
    /// Relocate the listed plants to `to_tent_id`, appending one
    /// history record per plant. Duplicate ids collapse to one move.
    Relocate {
        plant_ids: Vec<Uuid>,
        from_tent_id: Uuid,
        to_tent_id: Uuid,
        reason: String,
    },
    /// Archive the listed plants (harvest/discard).
    Archive { plant_ids: Vec<Uuid> },
}

/// A batch of clones to create from a mother plant.
#[derive(Debug, Clone)]
pub struct CloneBatch {
    pub tent_id: Uuid,
    pub strain_id: Uuid,
    pub mother_plant_id: Uuid,
    pub count: u32,
}

/// One lifecycle transition as a single transactional unit.
///
/// Every part is applied in one database transaction; if the plan
/// allocates a tent (`new_cycle` or `retarget_tent_id`), the occupancy
/// check happens inside that same transaction and a conflict rolls the
/// whole plan back.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub cycle_id: Uuid,
    /// Patch applied to the source cycle (reference dates, counters).
    pub update: UpdateCycle,
    /// Mark the source cycle `Finished`.
    pub finish_source: bool,
    /// Move the source cycle itself to another tent (occupancy-guarded).
    pub retarget_tent_id: Option<Uuid>,
    /// Create a successor cycle (occupancy-guarded on its tent).
    pub new_cycle: Option<CreateCycle>,
    pub plants: PlantPlan,
    pub clones: Option<CloneBatch>,
}

impl TransitionPlan {
    /// A plan that only patches the source cycle.
    pub fn patch(cycle_id: Uuid, update: UpdateCycle) -> Self {
        Self {
            cycle_id,
            update,
            finish_source: false,
            retarget_tent_id: None,
            new_cycle: None,
            plants: PlantPlan::Keep,
            clones: None,
        }
    }
}

/// Result of a committed [`TransitionPlan`].
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The source cycle after the plan was applied.
    pub cycle: Cycle,
    /// The successor cycle, when the plan created one.
    pub new_cycle: Option<Cycle>,
    pub plants_moved: u64,
    pub plants_archived: u64,
    /// Clones created by the plan, in creation order.
    pub clones: Vec<Plant>,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

pub trait TentRepository: Send + Sync {
    fn create(&self, input: CreateTent) -> impl Future<Output = CanopyResult<Tent>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CanopyResult<Tent>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTent,
    ) -> impl Future<Output = CanopyResult<Tent>> + Send;
    /// Fails with a validation error while any cycle references the tent.
    fn delete(&self, id: Uuid) -> impl Future<Output = CanopyResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CanopyResult<PaginatedResult<Tent>>> + Send;
}

pub trait StrainRepository: Send + Sync {
    fn create(&self, input: CreateStrain) -> impl Future<Output = CanopyResult<Strain>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CanopyResult<Strain>> + Send;
    /// Fetch several strains at once; unknown ids are skipped.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = CanopyResult<Vec<Strain>>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CanopyResult<PaginatedResult<Strain>>> + Send;
}

pub trait CycleRepository: Send + Sync {
    /// Create a new `Active` cycle. The tent-occupancy check and the
    /// insert are one atomic unit; fails with `TentOccupied` naming the
    /// conflicting cycle.
    fn create(&self, input: CreateCycle) -> impl Future<Output = CanopyResult<Cycle>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CanopyResult<Cycle>> + Send;
    /// Current occupant of a tent, if any.
    fn get_active_by_tent(
        &self,
        tent_id: Uuid,
    ) -> impl Future<Output = CanopyResult<Option<Cycle>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateCycle,
    ) -> impl Future<Output = CanopyResult<Cycle>> + Send;
    /// Release the tent: set the cycle's status to `Finished`.
    fn finish(&self, id: Uuid) -> impl Future<Output = CanopyResult<Cycle>> + Send;
    /// Apply a whole transition plan in one transaction.
    fn apply_transition(
        &self,
        plan: TransitionPlan,
    ) -> impl Future<Output = CanopyResult<TransitionOutcome>> + Send;
    fn list_by_tent(
        &self,
        tent_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CanopyResult<PaginatedResult<Cycle>>> + Send;
}

pub trait PlantRepository: Send + Sync {
    fn create(&self, input: CreatePlant) -> impl Future<Output = CanopyResult<Plant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CanopyResult<Plant>> + Send;
    fn list_active_by_tent(
        &self,
        tent_id: Uuid,
    ) -> impl Future<Output = CanopyResult<Vec<Plant>>> + Send;
    /// Archive the given plants; returns how many rows changed.
    fn archive(&self, ids: &[Uuid]) -> impl Future<Output = CanopyResult<u64>> + Send;
    /// Move a batch of plants between tents, all-or-nothing, recording
    /// one history row per plant. Duplicate ids collapse to one move.
    fn relocate(&self, input: RelocatePlants) -> impl Future<Output = CanopyResult<u64>> + Send;
}

pub trait WeeklyTargetRepository: Send + Sync {
    fn create(
        &self,
        input: CreateWeeklyTarget,
    ) -> impl Future<Output = CanopyResult<WeeklyTarget>> + Send;
    /// All rows matching `(strain, phase, week)` for the given strains.
    /// Strains without a row for that exact week simply yield nothing.
    fn get_for_week(
        &self,
        strain_ids: &[Uuid],
        phase: Phase,
        week: u32,
    ) -> impl Future<Output = CanopyResult<Vec<WeeklyTarget>>> + Send;
    fn list_by_strain(
        &self,
        strain_id: Uuid,
    ) -> impl Future<Output = CanopyResult<Vec<WeeklyTarget>>> + Send;
}

pub trait AlertMarginRepository: Send + Sync {
    fn upsert(
        &self,
        input: UpsertPhaseAlertMargin,
    ) -> impl Future<Output = CanopyResult<PhaseAlertMargin>> + Send;
    /// Exact-match lookup; `None` when no row exists for the phase.
    fn get_by_phase(
        &self,
        phase: Phase,
    ) -> impl Future<Output = CanopyResult<Option<PhaseAlertMargin>>> + Send;
    fn list(&self) -> impl Future<Output = CanopyResult<Vec<PhaseAlertMargin>>> + Send;
}

pub trait PlantHistoryRepository: Send + Sync {
    /// Relocation history for one plant, oldest first. History rows are
    /// written by [`PlantRepository::relocate`] and by transition plans;
    /// there is no direct append.
    fn list_by_plant(
        &self,
        plant_id: Uuid,
    ) -> impl Future<Output = CanopyResult<Vec<PlantTentHistory>>> + Send;
}
