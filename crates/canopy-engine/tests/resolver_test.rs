//! Integration tests for the target and margin resolvers and the
//! combined cycle overview, run against in-memory SurrealDB.

use std::sync::Arc;

use canopy_core::clock::Clock;
use canopy_core::error::CanopyError;
use canopy_core::models::cycle::Phase;
use canopy_core::models::margin::UpsertPhaseAlertMargin;
use canopy_core::models::plant::CreatePlant;
use canopy_core::models::strain::{CreateStrain, Strain};
use canopy_core::models::target::{Bounds, CreateWeeklyTarget};
use canopy_core::models::tent::{CreateTent, Tent, TentCategory};
use canopy_core::repository::{
    AlertMarginRepository, PlantRepository, StrainRepository, TentRepository,
    WeeklyTargetRepository,
};
use canopy_db::repository::{
    SurrealAlertMarginRepository, SurrealCycleRepository, SurrealPlantRepository,
    SurrealStrainRepository, SurrealTentRepository, SurrealWeeklyTargetRepository,
};
use canopy_engine::{EngineConfig, InitiateCycle, LifecycleService, NoopSink};
use chrono::{DateTime, TimeZone, Utc};
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

async fn make_strain(db: &Surreal<Db>, name: &str) -> Strain {
    SurrealStrainRepository::new(db.clone())
        .create(CreateStrain {
            name: name.into(),
            vega_weeks: 6,
            flora_weeks: 8,
        })
        .await
        .unwrap()
}

async fn make_plant(db: &Surreal<Db>, strain_id: Uuid, tent_id: Uuid) {
    SurrealPlantRepository::new(db.clone())
        .create(CreatePlant {
            strain_id,
            tent_id,
            mother_plant_id: None,
            label: None,
        })
        .await
        .unwrap();
}

async fn make_target(db: &Surreal<Db>, strain_id: Uuid, phase: Phase, week: u32, temp: (f64, f64)) {
    SurrealWeeklyTargetRepository::new(db.clone())
        .create(CreateWeeklyTarget {
            strain_id,
            phase,
            week_number: week,
            ppfd: Bounds::new(400.0, 600.0),
            photoperiod_hours: Bounds::new(18.0, 18.0),
            temperature_c: Bounds::new(temp.0, temp.1),
            humidity_pct: Bounds::new(55.0, 70.0),
            ph: Bounds::new(5.8, 6.2),
            ec_ms_cm: Bounds::new(1.0, 1.6),
        })
        .await
        .unwrap();
}

// -----------------------------------------------------------------------
// Target resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn averages_across_the_tent_plants_strains() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let a = make_strain(&db, "A").await;
    let b = make_strain(&db, "B").await;

    // Both strains are present as plants; the cycle has no strain of
    // its own, so resolution falls back to the plants.
    make_plant(&db, a.id, tent.id).await;
    make_plant(&db, b.id, tent.id).await;
    make_target(&db, a.id, Phase::Vega, 2, (20.0, 24.0)).await;
    make_target(&db, b.id, Phase::Vega, 2, (24.0, 28.0)).await;

    let bounds = service
        .targets()
        .resolve(&[], tent.id, Phase::Vega, 2)
        .await
        .unwrap();

    // Mean of mins and mean of maxes, independently.
    assert_eq!(bounds.temperature_c, Bounds::new(22.0, 26.0));
    assert_eq!(bounds.ppfd, Bounds::new(400.0, 600.0));
}

#[tokio::test]
async fn strain_without_a_row_is_excluded_not_zeroed() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let a = make_strain(&db, "A").await;
    let b = make_strain(&db, "B").await;

    // Only A has data for this week; B must not drag the average down.
    make_target(&db, a.id, Phase::Vega, 2, (20.0, 24.0)).await;

    let bounds = service
        .targets()
        .resolve(&[a.id, b.id], tent.id, Phase::Vega, 2)
        .await
        .unwrap();

    assert_eq!(bounds.temperature_c, Bounds::new(20.0, 24.0));
}

#[tokio::test]
async fn no_rows_is_an_error_not_zero_bounds() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let a = make_strain(&db, "A").await;

    let err = service
        .targets()
        .resolve(&[a.id], tent.id, Phase::Vega, 5)
        .await
        .unwrap_err();

    match err {
        CanopyError::NoTargetData { phase, week } => {
            assert_eq!(phase, Phase::Vega);
            assert_eq!(week, 5);
        }
        other => panic!("expected NoTargetData, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_strain_set_wins_over_tent_plants() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let a = make_strain(&db, "A").await;
    let b = make_strain(&db, "B").await;

    make_plant(&db, b.id, tent.id).await;
    make_target(&db, a.id, Phase::Vega, 1, (18.0, 22.0)).await;
    make_target(&db, b.id, Phase::Vega, 1, (26.0, 30.0)).await;

    let bounds = service
        .targets()
        .resolve(&[a.id], tent.id, Phase::Vega, 1)
        .await
        .unwrap();

    assert_eq!(bounds.temperature_c, Bounds::new(18.0, 22.0));
}

// -----------------------------------------------------------------------
// Margin resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn absent_margin_row_falls_back_to_defaults() {
    let (service, _db) = setup().await;

    let margins = service.margins().resolve(Phase::Vega).await.unwrap();

    assert_eq!(margins.temperature_c, 2.0);
    assert_eq!(margins.humidity_pct, 5.0);
    assert_eq!(margins.ppfd, 50.0);
    assert_eq!(margins.ph, Some(0.2));
}

#[tokio::test]
async fn stored_row_with_null_ph_disables_ph_alerting() {
    let (service, db) = setup().await;

    SurrealAlertMarginRepository::new(db)
        .upsert(UpsertPhaseAlertMargin {
            phase: Phase::Drying,
            temperature_c: 3.0,
            humidity_pct: 10.0,
            ppfd: 150.0,
            ph: None,
        })
        .await
        .unwrap();

    let margins = service.margins().resolve(Phase::Drying).await.unwrap();

    assert_eq!(margins.temperature_c, 3.0);
    // Stored null is honored, not replaced by the default 0.2.
    assert_eq!(margins.ph, None);
}

// -----------------------------------------------------------------------
// Cycle overview
// -----------------------------------------------------------------------

#[tokio::test]
async fn overview_combines_position_targets_and_margins() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;
    let strain = make_strain(&db, "A").await;
    make_target(&db, strain.id, Phase::Vega, 2, (20.0, 24.0)).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: Some(strain.id),
            start_date: now(),
            phase: Phase::Vega,
            week: 2,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    let overview = service.cycle_overview(cycle.id).await.unwrap();

    assert_eq!(overview.position.phase, Phase::Vega);
    assert_eq!(overview.position.week, 2);
    let targets = overview.targets.expect("targets should resolve");
    assert_eq!(targets.temperature_c, Bounds::new(20.0, 24.0));
    assert_eq!(overview.margins.temperature_c, 2.0);
}

#[tokio::test]
async fn overview_reports_missing_targets_as_none() {
    let (service, db) = setup().await;
    let tent = make_tent(&db, "Veg", TentCategory::Vega).await;

    let cycle = service
        .initiate(InitiateCycle {
            tent_id: tent.id,
            strain_id: None,
            start_date: now(),
            phase: Phase::Vega,
            week: 1,
            mother_plant_id: None,
        })
        .await
        .unwrap();

    let overview = service.cycle_overview(cycle.id).await.unwrap();

    // No strains, no plants, no data: distinguishable from zeros.
    assert!(overview.targets.is_none());
}
