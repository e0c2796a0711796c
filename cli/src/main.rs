//! `jiuwen`: command-line client for the openJiuwen site API.
//!
//! The bearer token is kept in a file between runs, so `jiuwen login` once
//! and later commands act as that account until `jiuwen logout`.


use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use jiuwen_session::{
    AuthApi, FileTokenStore, HttpAuthApi, Platform, SessionConfig, SessionError, SessionStore, SiteClient, TokenStore,
};
use schema::{DiscussionCategory, DiscussionQuery, DiscussionStatus, NewUser, NewsDraft, Role, UserUpdate};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("not signed in; run `jiuwen login` first")]
    NotSignedIn,
    #[error("nothing to update; pass at least one of --email, --role, --password, --active")]
    EmptyUpdate,
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "jiuwen", about = "openJiuwen site API CLI")]
struct Cli {
    #[arg(long, env = "JIUWEN_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "JIUWEN_TOKEN_FILE", help = "Where the bearer token is kept between runs")]
    token_file: Option<PathBuf>,

    #[arg(short, long, help = "Log requests and session changes to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "JIUWEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in as it.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "JIUWEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the token.
    Logout,
    /// Show the signed-in account.
    Whoami,
    Config(ConfigCommand),
    News(NewsCommand),
    Users(UsersCommand),
    Blogs(BlogsCommand),
    Discussions(DiscussionsCommand),
}

#[derive(Args, Debug)]
struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommand {
    List,
    Set { key: String, value: String },
}

#[derive(Args, Debug)]
struct NewsCommand {
    #[command(subcommand)]
    command: NewsSubcommand,
}

#[derive(Subcommand, Debug)]
enum NewsSubcommand {
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, help = "Defaults to the signed-in username")]
        author: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_parser = parse_role, default_value = "developer")]
        role: Role,
    },
    Update {
        id: i64,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
        #[arg(long, help = "New password; empty keeps the current one")]
        password: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct BlogsCommand {
    #[command(subcommand)]
    command: BlogsSubcommand,
}

#[derive(Subcommand, Debug)]
enum BlogsSubcommand {
    List,
    Read { id: i64 },
}

#[derive(Args, Debug)]
struct DiscussionsCommand {
    #[command(subcommand)]
    command: DiscussionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum DiscussionsSubcommand {
    List {
        #[arg(long, default_value_t = schema::DEFAULT_DISCUSSION_LIMIT)]
        limit: u32,
        #[arg(long, value_parser = parse_category)]
        category: Option<DiscussionCategory>,
        #[arg(long, value_parser = parse_status)]
        status: Option<DiscussionStatus>,
    },
    Read {
        id: i64,
    },
    Replies {
        id: i64,
    },
}

struct CliContext {
    store: SessionStore,
    site: SiteClient,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let mut config = SessionConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url);
    }
    let token_path = cli
        .token_file
        .unwrap_or_else(|| default_token_path(std::env::var_os("HOME").map(PathBuf::from).as_deref()));
    let ctx = build_context(&config, &token_path)?;

    match cli.command {
        Command::Login { username, password } => {
            let user = ctx.store.login(&username, &password).await?;
            eprintln!("signed in as {} ({})", user.username, user.role.label());
            Ok(())
        }
        Command::Register { username, email, password } => {
            let user = ctx.store.register(&username, &email, &password).await?;
            eprintln!("registered and signed in as {}", user.username);
            Ok(())
        }
        Command::Logout => {
            ctx.store.logout().await?;
            eprintln!("signed out");
            Ok(())
        }
        Command::Whoami => run_whoami(&ctx).await,
        Command::Config(config) => run_config(&ctx, config).await,
        Command::News(news) => run_news(&ctx, news).await,
        Command::Users(users) => run_users(&ctx, users).await,
        Command::Blogs(blogs) => run_blogs(&ctx, blogs).await,
        Command::Discussions(discussions) => run_discussions(&ctx, discussions).await,
    }
}

fn build_context(config: &SessionConfig, token_path: &Path) -> Result<CliContext, CliError> {
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.token_key, token_path));
    let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(config)?);
    let store = SessionStore::new(Platform::browser(api, Arc::clone(&tokens)));
    let site = SiteClient::new(config, tokens)?;
    Ok(CliContext { store, site })
}

/// Signed-in user, resolving the persisted token first.
async fn require_user(ctx: &CliContext) -> Result<schema::User, CliError> {
    ctx.store.initialize().await;
    ctx.store.session().user.ok_or(CliError::NotSignedIn)
}

async fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let user = require_user(ctx).await?;
    print_json(&user)
}

async fn run_config(ctx: &CliContext, config: ConfigCommand) -> Result<(), CliError> {
    match config.command {
        ConfigSubcommand::List => print_json(&ctx.site.list_configs().await?),
        ConfigSubcommand::Set { key, value } => print_json(&ctx.site.update_config(&key, &value).await?),
    }
}

async fn run_news(ctx: &CliContext, news: NewsCommand) -> Result<(), CliError> {
    match news.command {
        NewsSubcommand::List => print_json(&ctx.site.list_news().await?),
        NewsSubcommand::Create { title, content, author } => {
            let author = match author {
                Some(author) => author,
                None => require_user(ctx).await?.username,
            };
            let draft = NewsDraft { title, content, author };
            print_json(&ctx.site.create_news(&draft).await?)
        }
        NewsSubcommand::Delete { id } => {
            ctx.site.delete_news(id).await?;
            eprintln!("deleted news {id}");
            Ok(())
        }
    }
}

async fn run_users(ctx: &CliContext, users: UsersCommand) -> Result<(), CliError> {
    match users.command {
        UsersSubcommand::List => print_json(&ctx.site.list_users().await?),
        UsersSubcommand::Create { username, email, password, role } => {
            let user = NewUser { username, email, password, role };
            print_json(&ctx.site.create_user(&user).await?)
        }
        UsersSubcommand::Update { id, email, role, password, active } => {
            let update = build_update(email, role, password.as_deref(), active)?;
            print_json(&ctx.site.update_user(id, &update).await?)
        }
        UsersSubcommand::Delete { id } => {
            ctx.site.delete_user(id).await?;
            eprintln!("deleted user {id}");
            Ok(())
        }
    }
}

async fn run_blogs(ctx: &CliContext, blogs: BlogsCommand) -> Result<(), CliError> {
    match blogs.command {
        BlogsSubcommand::List => print_json(&ctx.site.list_blogs().await?),
        BlogsSubcommand::Read { id } => print_json(&ctx.site.get_blog(id).await?),
    }
}

async fn run_discussions(ctx: &CliContext, discussions: DiscussionsCommand) -> Result<(), CliError> {
    match discussions.command {
        DiscussionsSubcommand::List { limit, category, status } => {
            let query = DiscussionQuery { limit: Some(limit), category, status };
            print_json(&ctx.site.list_discussions(&query).await?)
        }
        DiscussionsSubcommand::Read { id } => print_json(&ctx.site.get_discussion(id).await?),
        DiscussionsSubcommand::Replies { id } => print_json(&ctx.site.list_replies(id).await?),
    }
}

fn default_token_path(home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) => home.join(".jiuwen").join("auth_token"),
        None => PathBuf::from(".jiuwen_token"),
    }
}

fn build_update(
    email: Option<String>,
    role: Option<Role>,
    password: Option<&str>,
    active: Option<bool>,
) -> Result<UserUpdate, CliError> {
    let update = UserUpdate { email, role, password: None, is_active: active }.with_password(password.unwrap_or(""));
    if update.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    Ok(update)
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).ok_or_else(|| format!("unknown role `{value}`; expected developer, admin, or root"))
}

fn parse_category(value: &str) -> Result<DiscussionCategory, String> {
    [DiscussionCategory::Usage, DiscussionCategory::Bug, DiscussionCategory::Feature, DiscussionCategory::Other]
        .into_iter()
        .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown category `{value}`; expected usage, bug, feature, or other"))
}

fn parse_status(value: &str) -> Result<DiscussionStatus, String> {
    [DiscussionStatus::Open, DiscussionStatus::Solved, DiscussionStatus::Closed]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown status `{value}`; expected open, solved, or closed"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
