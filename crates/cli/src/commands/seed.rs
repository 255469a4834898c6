use till_db::{DemoCatalog, SeedResult, VerificationResult};

use crate::commands::{open_migrated_pool, prepare, CommandResult, Failure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let outcome = async {
            let loaded = DemoCatalog::load(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = DemoCatalog::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
            check_verification(&verification)?;
            Ok::<SeedResult, Failure>(loaded)
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(loaded) => CommandResult::success("seed", summary(&loaded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn check_verification(verification: &VerificationResult) -> Result<(), Failure> {
    if verification.all_present {
        return Ok(());
    }

    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
        .collect::<Vec<_>>();
    let message = if failed_checks.is_empty() {
        "demo catalog failed to load".to_string()
    } else {
        format!("demo catalog verification failed for checks: {}", failed_checks.join(", "))
    };
    Err(("seed_verification", message, 6))
}

fn summary(loaded: &SeedResult) -> String {
    let products = DemoCatalog::titles()
        .map(|(id, title)| format!("  - {id}: {title}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "demo catalog ready with {} products ({} newly inserted):\n{products}",
        loaded.total, loaded.inserted
    )
}

#[cfg(test)]
mod tests {
    use till_db::{SeedResult, VerificationResult};

    use super::{check_verification, summary};

    #[test]
    fn verification_error_names_failed_checks() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![
                ("product-1".to_string(), true),
                ("product-4".to_string(), false),
                ("product-6".to_string(), false),
            ],
        };

        let (error_class, message, exit_code) =
            check_verification(&verification).expect_err("verification should fail");

        assert_eq!(error_class, "seed_verification");
        assert_eq!(exit_code, 6);
        assert_eq!(message, "demo catalog verification failed for checks: product-4, product-6");
    }

    #[test]
    fn verification_error_falls_back_when_no_labels() {
        let verification = VerificationResult { all_present: false, checks: Vec::new() };

        let (_, message, _) = check_verification(&verification).expect_err("should fail");

        assert_eq!(message, "demo catalog failed to load");
    }

    #[test]
    fn summary_reports_inserted_rows_and_lists_catalog() {
        let first = summary(&SeedResult { inserted: 6, total: 6 });
        let rerun = summary(&SeedResult { inserted: 0, total: 6 });

        assert!(first.starts_with("demo catalog ready with 6 products (6 newly inserted):"));
        assert!(rerun.starts_with("demo catalog ready with 6 products (0 newly inserted):"));
        assert!(rerun.contains("  - 1: Widget"));
    }
}
