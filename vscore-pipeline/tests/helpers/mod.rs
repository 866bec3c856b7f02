//! Shared fixtures for vscore-pipeline integration tests

#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;
use vscore_common::db::init_database;

/// Fresh database in a temp dir; keep the `TempDir` alive for the test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vscore.db")).await.unwrap();
    (dir, pool)
}

/// Upstream household with its history rows
#[derive(Debug, Clone, Default)]
pub struct HouseholdSeed {
    pub household_id: String,
    pub region_id: Option<i64>,
    pub head_name: Option<String>,
    pub deciles: Vec<i64>,
    pub national_rank: Option<i64>,
    pub members: usize,
    /// (asset_type_id, amount)
    pub assets: Vec<(i64, f64)>,
    /// Oldest first; the last one is the latest
    pub bpnt_periods: Vec<String>,
    pub pkh_periods: Vec<String>,
    pub inactive: Option<i64>,
}

impl HouseholdSeed {
    pub fn new(id: &str) -> Self {
        Self {
            household_id: id.to_string(),
            head_name: Some(format!("Head of {}", id)),
            ..Default::default()
        }
    }
}

pub async fn seed_region(pool: &SqlitePool, region_id: i64, name: &str) {
    sqlx::query("INSERT INTO regions (region_id, name) VALUES (?, ?)")
        .bind(region_id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_household(pool: &SqlitePool, seed: &HouseholdSeed) {
    sqlx::query(
        "INSERT INTO households (household_id, family_card_no, head_name, address, region_id, national_rank, inactive)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&seed.household_id)
    .bind(format!("KK-{}", seed.household_id))
    .bind(&seed.head_name)
    .bind("Jl. Test")
    .bind(seed.region_id)
    .bind(seed.national_rank)
    .bind(seed.inactive)
    .execute(pool)
    .await
    .unwrap();

    for decile in &seed.deciles {
        sqlx::query("INSERT INTO decile_history (household_id, decile) VALUES (?, ?)")
            .bind(&seed.household_id)
            .bind(decile)
            .execute(pool)
            .await
            .unwrap();
    }

    for i in 0..seed.members {
        sqlx::query("INSERT INTO household_members (household_id, name) VALUES (?, ?)")
            .bind(&seed.household_id)
            .bind(format!("member {}", i))
            .execute(pool)
            .await
            .unwrap();
    }

    for (asset_type_id, amount) in &seed.assets {
        sqlx::query("INSERT INTO household_assets (household_id, asset_type_id, amount) VALUES (?, ?, ?)")
            .bind(&seed.household_id)
            .bind(asset_type_id)
            .bind(amount)
            .execute(pool)
            .await
            .unwrap();
    }

    for label in &seed.bpnt_periods {
        sqlx::query("INSERT INTO bpnt_history (household_id, period_label) VALUES (?, ?)")
            .bind(&seed.household_id)
            .bind(label)
            .execute(pool)
            .await
            .unwrap();
    }

    for label in &seed.pkh_periods {
        sqlx::query("INSERT INTO pkh_history (household_id, period_label) VALUES (?, ?)")
            .bind(&seed.household_id)
            .bind(label)
            .execute(pool)
            .await
            .unwrap();
    }
}

/// Nine eligible households in three well-separated groups, plus one
/// inactive and one with no decile history.
///
/// - `P1..P3`: decile 1, many dependents, small low-tier assets (region 1)
/// - `M1..M3`: decile 5, medium-tier assets (region 2)
/// - `R1..R3`: decile 9, few dependents, large high-tier assets (region 2)
///
/// `P1` carries the "BPNT JAN 2024" / "PKH MEI 2020" history.
pub async fn seed_population(pool: &SqlitePool) {
    seed_region(pool, 1, "Sukamaju").await;
    seed_region(pool, 2, "Mekarsari").await;

    for i in 1..=3 {
        let mut poor = HouseholdSeed::new(&format!("P{}", i));
        poor.region_id = Some(1);
        poor.deciles = vec![1, 1];
        poor.national_rank = Some(4 + i);
        poor.members = 6;
        poor.assets = vec![(1, 500_000.0)];
        if i == 1 {
            poor.bpnt_periods = vec!["BPNT OKT 2022".to_string(), "BPNT JAN 2024".to_string()];
            poor.pkh_periods = vec!["PKH MEI 2020".to_string()];
        }
        seed_household(pool, &poor).await;

        let mut middle = HouseholdSeed::new(&format!("M{}", i));
        middle.region_id = Some(2);
        middle.deciles = vec![5];
        middle.national_rank = Some(48 + i);
        middle.members = 3;
        middle.assets = vec![(2, 20_000_000.0), (4, 5_000_000.0)];
        seed_household(pool, &middle).await;

        let mut rich = HouseholdSeed::new(&format!("R{}", i));
        rich.region_id = Some(2);
        rich.deciles = vec![9, 10, 8];
        rich.national_rank = Some(90 + i);
        rich.members = 1;
        rich.assets = vec![(3, 400_000_000.0), (7, 150_000_000.0)];
        seed_household(pool, &rich).await;
    }

    let mut inactive = HouseholdSeed::new("X1");
    inactive.deciles = vec![2];
    inactive.national_rank = Some(10);
    inactive.inactive = Some(1);
    seed_household(pool, &inactive).await;

    let mut no_decile = HouseholdSeed::new("X2");
    no_decile.national_rank = Some(30);
    no_decile.inactive = Some(0);
    seed_household(pool, &no_decile).await;
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await
            .unwrap();
    count > 0
}
