use std::process::ExitCode;

use comments::{
    comment::builder::TreeBuilder,
    config::{self, ServerConfig},
    store::{CommentRepository, PgCommentStore},
    telemetry, CommentFilter, Error,
};
use eyre::eyre;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Rebuilds every stored comment tree in strict mode and reports the ones
/// that no longer form a tree. Orphans always count as broken here, whatever
/// `COMMENT_SKIP_ORPHANS` tells the readers to do.
#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    dotenv::dotenv().ok();

    telemetry::init(config::json_logs_from_env());
    let config = ServerConfig::new_from_env().map_err(|e| eyre!(e))?;
    tracing::info!(env = ?config.env, "Checking comment trees");

    let store = PgCommentStore::connect(&config.database_url, config.pool_size)?;
    if config.run_migrations {
        store.migrate().await?;
    }

    let roots = store.find_roots(&CommentFilter::default()).await?;
    let trees = roots.len();
    let builder = TreeBuilder::new();

    let mut comments = 0;
    let mut broken = 0;
    for root in roots {
        let root_id = root.id;
        let built = match store.find_descendants(&root.path).await {
            Ok(descendants) => builder.build(root, descendants),
            Err(e) => Err(e),
        };

        match built {
            Ok(tree) => comments += tree.count(),
            Err(e @ (Error::Inconsistency(_) | Error::Validation(_))) => {
                broken += 1;
                tracing::error!(root = %root_id, error = %e, "Inconsistent comment tree");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(trees, comments, broken, "Comment tree check finished");

    Ok(if broken == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
