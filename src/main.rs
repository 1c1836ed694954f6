use std::{process, sync::Arc};

use plume::{
    application::{
        comments::SaveComment,
        context::RequestContext,
        engine::ContentEngine,
        error::{AppError, ContentError},
        pagination::{PageDefaults, PageRequest},
        posts::EditPost,
    },
    config::{self, Command, CommentsCommand, PageArgs, PostsCommand},
    domain::entities::PostId,
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
};
use serde::Serialize;
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;

    if let Command::Migrate = cli_args.command {
        return run_migrate(&repositories).await;
    }

    let engine = ContentEngine::new(Arc::new(repositories), settings.engine_options());
    let ctx = RequestContext::new();
    spawn_interrupt_handler(ctx.clone());

    match cli_args.command {
        Command::Migrate => Ok(()),
        Command::Retag => {
            let changed = engine.store.retag_all(&ctx).await?;
            print_json(&json!({ "changed": changed }))
        }
        Command::Posts(args) => run_posts(&engine, &ctx, args.command).await,
        Command::Comments(args) => run_comments(&engine, &ctx, args.command).await,
    }
}

async fn init_repositories(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url is required (set PLUME__DATABASE__URL or --database-url)")
    })?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    Ok(PostgresRepositories::new(pool))
}

async fn run_migrate(repositories: &PostgresRepositories) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;
    repositories
        .health_check()
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!("Migrations applied");
    Ok(())
}

fn spawn_interrupt_handler(ctx: RequestContext) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling");
                ctx.cancel();
            }
            Err(err) => warn!(error = %err, "Failed to listen for interrupts"),
        }
    });
}

async fn run_posts(
    engine: &ContentEngine,
    ctx: &RequestContext,
    command: PostsCommand,
) -> Result<(), AppError> {
    match command {
        PostsCommand::Get(arg) => {
            let post = engine.store.require(ctx, &arg.id).await?;
            print_json(&engine.renderer.view(&post))
        }
        PostsCommand::List(args) => {
            let page = page_request(&args.page, PageDefaults::LISTING)?;
            let posts = engine.store.list_window(ctx, args.window.into(), page).await?;
            print_json(&posts)
        }
        PostsCommand::Tag(arg) => print_json(&engine.store.list_by_tag(ctx, &arg.tag).await?),
        PostsCommand::Tags => print_json(&engine.store.all_tags(ctx).await?),
        PostsCommand::Search(args) => {
            let page = page_request(&args.page, PageDefaults::LISTING)?;
            print_json(&engine.search.search(ctx, &args.query, page).await?)
        }
        PostsCommand::Related(args) => {
            let page = page_request(&args.page, PageDefaults::RELATED)?;
            let post = engine.store.require(ctx, &args.id).await?;
            print_json(&engine.related.find_related(ctx, &post, page).await?)
        }
        PostsCommand::Next(arg) => {
            let post = engine.store.require(ctx, &arg.id).await?;
            print_json(&engine.navigator.next(ctx, &post).await?)
        }
        PostsCommand::Prev(arg) => {
            let post = engine.store.require(ctx, &arg.id).await?;
            print_json(&engine.navigator.prev(ctx, &post).await?)
        }
        PostsCommand::Save(args) => {
            let content = match args.content_file.as_ref() {
                Some(path) => Some(
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(InfraError::from)?,
                ),
                None => None,
            };
            let datetime = args
                .datetime
                .as_deref()
                .map(parse_datetime)
                .transpose()?;

            let edit = EditPost {
                id: args.id,
                title: args.title,
                content,
                datetime,
                draft: args.draft,
            };
            print_json(&engine.store.edit(ctx, edit).await?)
        }
    }
}

async fn run_comments(
    engine: &ContentEngine,
    ctx: &RequestContext,
    command: CommentsCommand,
) -> Result<(), AppError> {
    match command {
        CommentsCommand::List(args) => {
            let page = page_request(&args.page, PageDefaults::COMMENTS)?;
            let post_id: PostId = args.post_id.parse()?;
            print_json(&engine.comments.list_for_post(ctx, post_id, page).await?)
        }
        CommentsCommand::Add(args) => {
            let comment = SaveComment {
                id: None,
                post_id: Some(args.post_id),
                author_id: Some(args.author),
                content: args.content,
            };
            print_json(&engine.comments.save(ctx, comment).await?)
        }
    }
}

fn page_request(args: &PageArgs, defaults: PageDefaults) -> Result<PageRequest, AppError> {
    PageRequest::from_input(args.limit, args.offset, defaults)
        .map_err(|err| AppError::from(ContentError::from(err)))
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| {
        ContentError::validation(format!("`{raw}` is not an RFC 3339 timestamp: {err}")).into()
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
