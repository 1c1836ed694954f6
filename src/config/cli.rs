use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::posts::PostWindow;

/// Command-line arguments for the Plume binary.
#[derive(Debug, Parser)]
#[command(name = "plume", version, about = "Plume post content engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PLUME_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Recompute tags for every stored post with the configured rules.
    Retag,
    /// Read and write posts.
    Posts(PostsArgs),
    /// Read and write comments.
    Comments(CommentsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub command: PostsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum PostsCommand {
    /// Show a single post with its rendered view.
    Get(PostIdArg),
    /// List posts in a time window.
    List(ListArgs),
    /// List published posts carrying a tag.
    Tag(TagArg),
    /// List every tag, most used first.
    Tags,
    /// Full-text search over published posts.
    Search(SearchArgs),
    /// Posts related to the given post.
    Related(RelatedArgs),
    /// The post published after the given one.
    Next(PostIdArg),
    /// The post published before the given one.
    Prev(PostIdArg),
    /// Create or update a post.
    Save(SaveArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PostIdArg {
    /// Post id.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct TagArg {
    #[arg(value_name = "TAG")]
    pub tag: String,
}

#[derive(Debug, Args, Clone, Default)]
pub struct PageArgs {
    /// Maximum number of results.
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Number of results to skip.
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    pub offset: Option<i64>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = WindowArg::Published)]
    pub window: WindowArg,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    Published,
    Future,
    Drafts,
}

impl From<WindowArg> for PostWindow {
    fn from(value: WindowArg) -> Self {
        match value {
            WindowArg::Published => PostWindow::Published,
            WindowArg::Future => PostWindow::Future,
            WindowArg::Drafts => PostWindow::Drafts,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RelatedArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SaveArgs {
    /// Update this post instead of creating one.
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Markdown file holding the post body.
    #[arg(long = "content-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub content_file: Option<PathBuf>,

    /// Publish time (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    pub datetime: Option<String>,

    /// Save as draft; omitted means draft.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub draft: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct CommentsArgs {
    #[command(subcommand)]
    pub command: CommentsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommentsCommand {
    /// List comments on a post, oldest first.
    List(CommentListArgs),
    /// Add a comment to a post.
    Add(CommentAddArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CommentListArgs {
    #[arg(value_name = "POST_ID")]
    pub post_id: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CommentAddArgs {
    #[arg(value_name = "POST_ID")]
    pub post_id: String,

    #[arg(long, value_name = "AUTHOR")]
    pub author: String,

    #[arg(long, value_name = "TEXT")]
    pub content: String,
}
