//! Integration tests for the lifecycle state machine, run against
//! in-memory SurrealDB with a fixed clock.

use std::sync::Arc;

use canopy_core::clock::Clock;
use canopy_core::error::CanopyError;
use canopy_core::models::cycle::{CycleStatus, Phase};
use canopy_core::models::plant::{CreatePlant, Plant, PlantStatus};
use canopy_core::models::strain::{CreateStrain, Strain};
use canopy_core::models::tent::{CreateTent, Tent, TentCategory};
use canopy_core::repository::{
    CycleRepository, PlantHistoryRepository, PlantRepository, StrainRepository, TentRepository,
};
use canopy_db::repository::{
    SurrealAlertMarginRepository, SurrealCycleRepository, SurrealPlantHistoryRepository,
    SurrealPlantRepository, SurrealStrainRepository, SurrealTentRepository,
    SurrealWeeklyTargetRepository,
};
use canopy_engine::{
    EngineConfig, InitiateCycle, LifecycleService, NoopSink, PromoteDestination,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

type Service = LifecycleService<
    SurrealCycleRepository<Db>,
    SurrealPlantRepository<Db>,
    SurrealTentRepository<Db>,
    SurrealStrainRepository<Db>,
    SurrealWeeklyTargetRepository<Db>,
    SurrealAlertMarginRepository<Db>,
>;

async fn setup() -> (Service, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    canopy_db::run_migrations(&db).await.unwrap();

    let service = LifecycleService::new(
        SurrealCycleRepository::new(db.clone()),
        SurrealPlantRepository::new(db.clone()),
        SurrealTentRepository::new(db.clone()),
        SurrealStrainRepository::new(db.clone()),
        SurrealWeeklyTargetRepository::new(db.clone()),
        SurrealAlertMarginRepository::new(db.clone()),
        Arc::new(FixedClock(now())),
        EngineConfig::default(),
        Arc::new(NoopSink),
    );

    (service, db)
}

async fn make_tent(db: &Surreal<Db>, name: &str, category: TentCategory) -> Tent {
    SurrealTentRepository::new(db.clone())
        .create(CreateTent {
            name: name.into(),
            category,
            width_cm: 100.0,
            depth_cm: 100.0,
            height_cm: 180.0,
        })
        .await
        .unwrap()
}

async fn make_strain(db: &Surreal<Db>, name: &str, vega: u32, flora: u32) -> Strain {
    SurrealStrainRepository::new(db.clone())
        .create(CreateStrain {
            name: name.into(),
            vega_weeks: vega,
            flora_weeks: flora,
        })
        .await
        .unwrap()
}

async fn make_plant(db: &Surreal<Db>, strain_id: Uuid, tent_id: Uuid) -> Plant {
    SurrealPlantRepository::new(db.clone())
        .create(CreatePlant {
            strain_id,
            tent_id,
            mother_plant_id: None,
            label: None,
        })
        .await
        .unwrap()
}

fn vega_start(tent_id: Uuid) -> InitiateCycle {
    InitiateCycle {
        tent_id,
        strain_id: None,
        start_date: now(),
        phase: Phase::Vega,
        week: 1,
        mother_plant_id: None,
    }
}

// -----------------------------------------------------------------------
// Initiate
// -----------------------------------------------------------------------

#[tokio::test]
async fn initiate_backdates_to_requested_week() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Vega,
            week: 3,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    assert_eq!(cycle.start_date, now() - Duration::weeks(2));

    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Vega);
    assert_eq!(position.week, 3);
}

#[tokio::test]
async fn initiate_rejects_occupied_tent() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let first = service.initiate(vega_start(tent.id)).await.unwrap();

    let err = service.initiate(vega_start(tent.id)).await.unwrap_err();
    match err {
        CanopyError::TentOccupied { tent_id, cycle_id } => {
            assert_eq!(tent_id, tent.id);
            assert_eq!(cycle_id, first.id);
        }
        other => panic!("expected TentOccupied, got {other:?}"),
    }
}

#[tokio::test]
async fn initiate_into_cloning_requires_mother_plant() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;

    let err = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Cloning,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CanopyError::MissingMotherPlant));
}

#[tokio::test]
async fn concurrent_initiates_have_one_winner() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Contested", TentCategory::Vega).await;

    let (a, b) = tokio::join!(
        service.initiate(vega_start(tent.id)),
        service.initiate(vega_start(tent.id)),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one initiate may win: {a:?} / {b:?}");

    let cycle_repo = SurrealCycleRepository::new(db);
    let active = cycle_repo.get_active_by_tent(tent.id).await.unwrap();
    assert!(active.is_some());
}

// -----------------------------------------------------------------------
// Derivation through the service
// -----------------------------------------------------------------------

#[tokio::test]
async fn twenty_two_days_in_is_vega_week_four() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: Some(strain.id),
            start_date: now() - Duration::days(22),
            phase: Phase::Vega,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Vega);
    assert_eq!(position.week, 4);
}

#[tokio::test]
async fn maintenance_tent_without_dates_derives_maintenance() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Maintenance);
}

// -----------------------------------------------------------------------
// Cloning episode round-trip
// -----------------------------------------------------------------------

#[tokio::test]
async fn clones_produced_round_trip() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    // First episode records a count.
    service.transition_to_cloning(cycle.id, now()).await.unwrap();
    let cycle_after = service
        .transition_to_maintenance(cycle.id, Some(12))
        .await
        .unwrap();
    assert_eq!(cycle_after.clones_produced, Some(12));
    assert_eq!(cycle_after.cloning_start_date, None);

    // Second episode omits the count: the stored value survives.
    service.transition_to_cloning(cycle.id, now()).await.unwrap();
    let cycle_after = service
        .transition_to_maintenance(cycle.id, None)
        .await
        .unwrap();
    assert_eq!(cycle_after.clones_produced, Some(12));

    // Third episode supplies a new count: it overwrites.
    service.transition_to_cloning(cycle.id, now()).await.unwrap();
    let cycle_after = service
        .transition_to_maintenance(cycle.id, Some(30))
        .await
        .unwrap();
    assert_eq!(cycle_after.clones_produced, Some(30));
}

#[tokio::test]
async fn cloning_twice_without_closing_fails() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    service.transition_to_cloning(cycle.id, now()).await.unwrap();
    let err = service
        .transition_to_cloning(cycle.id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::Validation { .. }));

    // And closing twice fails as well.
    service.transition_to_maintenance(cycle.id, None).await.unwrap();
    let err = service
        .transition_to_maintenance(cycle.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::Validation { .. }));
}

// -----------------------------------------------------------------------
// Finish cloning
// -----------------------------------------------------------------------

#[tokio::test]
async fn finish_cloning_pots_up_a_new_vega_cycle() {
    let (service, db) = setup().await;
    let mother_tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;
    let veg_tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;
    let mother = make_plant(&db, strain.id, mother_tent.id).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: mother_tent.id,
            strain_id: Some(strain.id),
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: Some(mother.id),
        })
        .await
        .unwrap();

    service.transition_to_cloning(cycle.id, now()).await.unwrap();

    let outcome = service
        .finish_cloning(cycle.id, veg_tent.id, 10)
        .await
        .unwrap();

    // Exactly 10 clones, all tracing back to the mother.
    assert_eq!(outcome.clones.len(), 10);
    for clone in &outcome.clones {
        assert_eq!(clone.mother_plant_id, Some(mother.id));
        assert_eq!(clone.strain_id, strain.id);
        assert_eq!(clone.tent_id, veg_tent.id);
        assert_eq!(clone.status, PlantStatus::Active);
    }

    // Source cycle is back in maintenance with the count recorded.
    assert_eq!(outcome.source_cycle.cloning_start_date, None);
    assert_eq!(outcome.source_cycle.clones_produced, Some(10));
    assert_eq!(outcome.source_cycle.status, CycleStatus::Active);
    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Maintenance);

    // The target tent has exactly one active cycle, in Vega week 1.
    let cycle_repo = SurrealCycleRepository::new(db);
    let active = cycle_repo
        .get_active_by_tent(veg_tent.id)
        .await
        .unwrap()
        .expect("target tent should be occupied");
    assert_eq!(active.id, outcome.new_cycle.id);
    assert_eq!(active.strain_id, Some(strain.id));
    let position = service.position(active.id).await.unwrap();
    assert_eq!(position.phase, Phase::Vega);
    assert_eq!(position.week, 1);
}

#[tokio::test]
async fn finish_cloning_without_mother_fails() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;
    let veg_tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();
    service.transition_to_cloning(cycle.id, now()).await.unwrap();

    let err = service
        .finish_cloning(cycle.id, veg_tent.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::MissingMotherPlant));
}

#[tokio::test]
async fn finish_cloning_outside_cloning_phase_fails() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let other = make_tent(&db, "Other", TentCategory::Vega).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();

    let err = service
        .finish_cloning(cycle.id, other.id, 5)
        .await
        .unwrap_err();
    match err {
        CanopyError::InvalidPhaseTransition { from, .. } => assert_eq!(from, Phase::Vega),
        other => panic!("expected InvalidPhaseTransition, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Flora
// -----------------------------------------------------------------------

#[tokio::test]
async fn flora_in_place_sets_reference_date() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();
    let cycle = service
        .transition_to_flora(cycle.id, now(), None)
        .await
        .unwrap();

    assert_eq!(cycle.flora_start_date, Some(now()));
    assert_eq!(cycle.tent_id, tent.id);

    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Flora);
    assert_eq!(position.week, 1);

    // A second flora transition no longer matches the derived phase.
    let err = service
        .transition_to_flora(cycle.id, now(), None)
        .await
        .unwrap_err();
    match err {
        CanopyError::InvalidPhaseTransition { from, requested } => {
            assert_eq!(from, Phase::Flora);
            assert_eq!(requested, Phase::Flora);
        }
        other => panic!("expected InvalidPhaseTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn flora_with_move_retargets_cycle_and_plants() {
    let (service, db) = setup().await;
    let veg_tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let flora_tent = make_tent(&db, "Flora", TentCategory::Flora).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service.initiate(vega_start(veg_tent.id)).await.unwrap();
    let a = make_plant(&db, strain.id, veg_tent.id).await;
    let b = make_plant(&db, strain.id, veg_tent.id).await;

    let cycle = service
        .transition_to_flora(cycle.id, now(), Some(flora_tent.id))
        .await
        .unwrap();

    // The cycle itself moved; no successor cycle is created.
    assert_eq!(cycle.tent_id, flora_tent.id);
    assert_eq!(cycle.status, CycleStatus::Active);

    let plant_repo = SurrealPlantRepository::new(db.clone());
    let moved = plant_repo.list_active_by_tent(flora_tent.id).await.unwrap();
    assert_eq!(moved.len(), 2);
    assert!(plant_repo.list_active_by_tent(veg_tent.id).await.unwrap().is_empty());

    // The move left a history trail.
    let history_repo = SurrealPlantHistoryRepository::new(db);
    for plant_id in [a.id, b.id] {
        let history = history_repo.list_by_plant(plant_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_tent_id, veg_tent.id);
        assert_eq!(history[0].to_tent_id, flora_tent.id);
    }
}

// -----------------------------------------------------------------------
// Promote
// -----------------------------------------------------------------------

#[tokio::test]
async fn promote_in_place_advances_the_phase() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();
    let outcome = service
        .promote_phase(cycle.id, Phase::Flora, PromoteDestination::Stay)
        .await
        .unwrap();

    assert!(outcome.new_cycle.is_none());
    let position = service.position(outcome.cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Flora);
}

#[tokio::test]
async fn promote_rejects_mismatched_pairing() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();

    // Vega can only promote to Flora.
    let err = service
        .promote_phase(cycle.id, Phase::Drying, PromoteDestination::Stay)
        .await
        .unwrap_err();
    match err {
        CanopyError::InvalidPhaseTransition { from, requested } => {
            assert_eq!(from, Phase::Vega);
            assert_eq!(requested, Phase::Drying);
        }
        other => panic!("expected InvalidPhaseTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn promote_to_occupied_tent_rolls_back_everything() {
    let (service, db) = setup().await;
    let flora_tent = make_tent(&db, "Flora", TentCategory::Flora).await;
    let drying_tent = make_tent(&db, "Drying", TentCategory::Drying).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    // Flora cycle with plants.
    let cycle = service.initiate(vega_start(flora_tent.id)).await.unwrap();
    let plant = make_plant(&db, strain.id, flora_tent.id).await;
    service
        .transition_to_flora(cycle.id, now(), None)
        .await
        .unwrap();

    // Occupy the drying tent.
    service.initiate(vega_start(drying_tent.id)).await.unwrap();

    let err = service
        .promote_phase(
            cycle.id,
            Phase::Drying,
            PromoteDestination::MoveTo(drying_tent.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::TentOccupied { .. }));

    // Source cycle unchanged: still active, still Flora, still on its
    // tent.
    let cycle_repo = SurrealCycleRepository::new(db.clone());
    let source = cycle_repo.get_by_id(cycle.id).await.unwrap();
    assert_eq!(source.status, CycleStatus::Active);
    assert_eq!(source.tent_id, flora_tent.id);
    assert_eq!(source.drying_start_date, None);
    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Flora);

    // Plants unchanged.
    let plant_repo = SurrealPlantRepository::new(db);
    let plant_after = plant_repo.get_by_id(plant.id).await.unwrap();
    assert_eq!(plant_after.tent_id, flora_tent.id);
    assert_eq!(plant_after.status, PlantStatus::Active);
}

#[tokio::test]
async fn promote_with_move_finishes_source_and_starts_successor() {
    let (service, db) = setup().await;
    let veg_tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let flora_tent = make_tent(&db, "Flora", TentCategory::Flora).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service.initiate(vega_start(veg_tent.id)).await.unwrap();
    make_plant(&db, strain.id, veg_tent.id).await;

    let outcome = service
        .promote_phase(
            cycle.id,
            Phase::Flora,
            PromoteDestination::MoveTo(flora_tent.id),
        )
        .await
        .unwrap();

    assert_eq!(outcome.cycle.status, CycleStatus::Finished);
    let new_cycle = outcome.new_cycle.expect("promotion should create a successor");
    assert_eq!(new_cycle.tent_id, flora_tent.id);

    let position = service.position(new_cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Flora);
    assert_eq!(position.week, 1);

    // The vacated tent is free for a new run.
    assert!(service.initiate(vega_start(veg_tent.id)).await.is_ok());
}

// -----------------------------------------------------------------------
// Drying
// -----------------------------------------------------------------------

#[tokio::test]
async fn drying_in_place_archives_the_harvest() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Flora", TentCategory::Flora).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();
    make_plant(&db, strain.id, tent.id).await;
    make_plant(&db, strain.id, tent.id).await;
    service
        .transition_to_flora(cycle.id, now(), None)
        .await
        .unwrap();

    let outcome = service
        .transition_to_drying(cycle.id, now(), None, Some("dense colas".into()))
        .await
        .unwrap();

    assert_eq!(outcome.archived_plants, 2);
    assert!(outcome.new_cycle.is_none());
    assert_eq!(outcome.cycle.harvest_notes.as_deref(), Some("dense colas"));
    assert_eq!(outcome.cycle.status, CycleStatus::Active);

    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Drying);
    assert_eq!(position.week, 1);

    let plant_repo = SurrealPlantRepository::new(db);
    assert!(plant_repo.list_active_by_tent(tent.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn drying_with_move_hands_over_to_a_drying_cycle() {
    let (service, db) = setup().await;
    let flora_tent = make_tent(&db, "Flora", TentCategory::Flora).await;
    let drying_tent = make_tent(&db, "Drying", TentCategory::Drying).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service.initiate(vega_start(flora_tent.id)).await.unwrap();
    make_plant(&db, strain.id, flora_tent.id).await;
    service
        .transition_to_flora(cycle.id, now(), None)
        .await
        .unwrap();

    let outcome = service
        .transition_to_drying(cycle.id, now(), Some(drying_tent.id), None)
        .await
        .unwrap();

    // Flora cycle finished, successor dries on the new tent.
    assert_eq!(outcome.cycle.status, CycleStatus::Finished);
    assert_eq!(outcome.archived_plants, 0);
    let new_cycle = outcome.new_cycle.expect("handover should create a cycle");
    assert_eq!(new_cycle.tent_id, drying_tent.id);

    let position = service.position(new_cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Drying);
    assert_eq!(position.week, 1);

    let plant_repo = SurrealPlantRepository::new(db);
    let moved = plant_repo.list_active_by_tent(drying_tent.id).await.unwrap();
    assert_eq!(moved.len(), 1);
}

// -----------------------------------------------------------------------
// Standalone relocation
// -----------------------------------------------------------------------

#[tokio::test]
async fn relocation_service_moves_an_administrative_batch() {
    let (_service, db) = setup().await;
    let from = make_tent(&db, "From", TentCategory::Vega).await;
    let to = make_tent(&db, "To", TentCategory::Vega).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;
    let plant = make_plant(&db, strain.id, from.id).await;

    let relocation =
        canopy_engine::RelocationService::new(SurrealPlantRepository::new(db.clone()));

    // Same-tent moves are rejected before touching the store.
    let err = relocation
        .relocate(canopy_core::models::plant::RelocatePlants {
            plant_ids: vec![plant.id],
            from_tent_id: from.id,
            to_tent_id: from.id,
            reason: "nowhere".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::Validation { .. }));

    let moved = relocation
        .relocate(canopy_core::models::plant::RelocatePlants {
            plant_ids: vec![plant.id, plant.id],
            from_tent_id: from.id,
            to_tent_id: to.id,
            reason: "rebalancing".into(),
        })
        .await
        .unwrap();
    assert_eq!(moved, 1);

    let plant_repo = SurrealPlantRepository::new(db);
    let plant_after = plant_repo.get_by_id(plant.id).await.unwrap();
    assert_eq!(plant_after.tent_id, to.id);
}

// -----------------------------------------------------------------------
// Edit
// -----------------------------------------------------------------------

#[tokio::test]
async fn edit_cycle_forces_phase_and_week() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service.initiate(vega_start(tent.id)).await.unwrap();

    let cycle = service
        .edit_cycle(canopy_engine::EditCycle {
            cycle_id: cycle.id,
            phase: Phase::Flora,
            week: 3,
            start_date: now(),
            strain_id: None,
            mother_plant_id: None,
            clones_produced: None,
        })
        .await
        .unwrap();

    assert_eq!(cycle.flora_start_date, Some(now() - Duration::weeks(2)));
    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Flora);
    assert_eq!(position.week, 3);

    // Editing back to Vega clears the shadowing flora date.
    let cycle = service
        .edit_cycle(canopy_engine::EditCycle {
            cycle_id: cycle.id,
            phase: Phase::Vega,
            week: 2,
            start_date: now(),
            strain_id: None,
            mother_plant_id: None,
            clones_produced: None,
        })
        .await
        .unwrap();

    assert_eq!(cycle.flora_start_date, None);
    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Vega);
    assert_eq!(position.week, 2);
}

#[tokio::test]
async fn edit_to_cloning_requires_a_lineage_source() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Mother", TentCategory::Maintenance).await;
    let strain = make_strain(&db, "Haze", 6, 8).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Maintenance,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    let err = service
        .edit_cycle(canopy_engine::EditCycle {
            cycle_id: cycle.id,
            phase: Phase::Cloning,
            week: 1,
            start_date: now(),
            strain_id: None,
            mother_plant_id: None,
            clones_produced: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::MissingMotherPlant));

    // Supplying the mother makes the same edit valid.
    let mother = make_plant(&db, strain.id, tent.id).await;
    let cycle = service
        .edit_cycle(canopy_engine::EditCycle {
            cycle_id: cycle.id,
            phase: Phase::Cloning,
            week: 1,
            start_date: now(),
            strain_id: None,
            mother_plant_id: Some(mother.id),
            clones_produced: None,
        })
        .await
        .unwrap();

    assert_eq!(cycle.mother_plant_id, Some(mother.id));
    let position = service.position(cycle.id).await.unwrap();
    assert_eq!(position.phase, Phase::Cloning);
}
