use crate::commands::{open_migrated_pool, prepare, CommandResult, Failure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let applied = till_db::migrations::MIGRATOR.iter().count();
        pool.close().await;
        Ok::<usize, Failure>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success(
            "migrate",
            format!("schema up to date ({applied} migrations known) for `{}`", config.database.url),
        ),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
