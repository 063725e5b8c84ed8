//! wblog CLI
//!
//! Command-line client for the wblog blogging platform.
//!
//! ## Usage
//!
//! ```bash
//! wblog login ann@example.com
//! wblog posts --category 2
//! wblog show 14
//! wblog like 14
//! wblog comment add 14 "Nice read"
//! ```

mod render;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wblog_api::{BlogApi, PostForm, SignupForm, Upload};
use wblog_config::ClientConfig;
use wblog_core::{CategoryId, CommentId, ErrorKind, PostId, UserId};
use wblog_interact::{
    compose_post, notices, CommentThread, Notices, Outcome, PostPage, PostView, ProfilePage,
    ViewScope,
};

#[derive(Parser)]
#[command(name = "wblog")]
#[command(about = "wblog - read, write and discuss posts from the terminal")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/wblog/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        email: String,

        /// Password (prompted when omitted; also read from WBLOG_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        email: String,
        username: String,

        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        /// Avatar image
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List posts
    Posts {
        /// Only posts in this category
        #[arg(short, long)]
        category: Option<String>,

        /// List categories instead
        #[arg(long)]
        categories: bool,

        /// Only posts by this user
        #[arg(long)]
        author: Option<String>,
    },

    /// Show a post with its comments
    Show { post: String },

    /// Toggle your like on a post
    Like { post: String },

    /// Toggle a bookmark on a post
    Bookmark { post: String },

    /// Toggle following a user
    Follow { user: String },

    /// Show a profile (yours when no user is given)
    Profile { user: Option<String> },

    /// Comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Posts you wrote
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comment on a post
    Add { post: String, text: String },

    /// Edit your comment
    Edit {
        post: String,
        comment: String,
        text: String,
    },

    /// Delete your comment
    Delete { post: String, comment: String },
}

#[derive(Subcommand)]
enum PostCommands {
    /// Publish a new post
    Create {
        title: String,
        content: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Cover image
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Edit one of your posts
    Edit {
        post: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Delete one of your posts
    Delete { post: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let api = BlogApi::new(wblog_session::connect(&config)?);
    let (tx, mut rx) = notices();

    let result = run(cli.command, &api, &tx).await;

    drop(tx);
    while let Ok(notice) = rx.try_recv() {
        render::notice(&notice);
    }

    if let Err(e) = &result {
        let expired = e
            .downcast_ref::<wblog_core::Error>()
            .is_some_and(|e| e.kind() == ErrorKind::SessionExpired);
        if expired {
            println!("\n  Your session has ended. Run 'wblog login <email>' to sign in again.");
        }
    }
    result
}

async fn run(command: Commands, api: &BlogApi, notices: &Notices) -> Result<()> {
    match command {
        Commands::Login { email, password } => cmd_login(api, email, password).await,
        Commands::Signup { email, username, password, gender, avatar } => {
            cmd_signup(api, email, username, password, gender, avatar).await
        }
        Commands::Logout => cmd_logout(api),
        Commands::Whoami => cmd_whoami(api).await,
        Commands::Posts { category, categories, author } => {
            cmd_posts(api, category, categories, author).await
        }
        Commands::Show { post } => cmd_show(api, post, notices).await,
        Commands::Like { post } => cmd_like(api, post, notices).await,
        Commands::Bookmark { post } => cmd_bookmark(api, post, notices).await,
        Commands::Follow { user } => cmd_follow(api, user, notices).await,
        Commands::Profile { user } => cmd_profile(api, user, notices).await,
        Commands::Comment { command } => cmd_comment(api, command, notices).await,
        Commands::Post { command } => cmd_post(api, command, notices).await,
    }
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given.or_else(|| std::env::var("WBLOG_PASSWORD").ok()) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Upload::from_path_bytes(name, bytes))
}

async fn cmd_login(api: &BlogApi, email: String, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    match api.login(&email, &password).await {
        Ok(session) => {
            println!("  Logged in as {}", session.user.display_name());
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message("Login failed"))),
    }
}

async fn cmd_signup(
    api: &BlogApi,
    email: String,
    username: String,
    password: Option<String>,
    gender: Option<String>,
    avatar: Option<PathBuf>,
) -> Result<()> {
    let form = SignupForm {
        email,
        password: read_password(password)?,
        username,
        gender,
        avatar: avatar.as_deref().map(read_upload).transpose()?,
    };

    match api.signup(&form).await {
        Ok(session) => {
            println!("  Welcome, {}", session.user.display_name());
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message("Signup failed"))),
    }
}

fn cmd_logout(api: &BlogApi) -> Result<()> {
    api.logout()?;
    println!("  Logged out");
    Ok(())
}

async fn cmd_whoami(api: &BlogApi) -> Result<()> {
    if api.viewer().is_none() {
        println!("  Not logged in");
        return Ok(());
    }
    let user = api.me().await?;
    render::heading("WHO AM I");
    render::user(&user);
    Ok(())
}

async fn cmd_posts(
    api: &BlogApi,
    category: Option<String>,
    categories: bool,
    author: Option<String>,
) -> Result<()> {
    if categories {
        render::heading("CATEGORIES");
        render::categories(&api.categories().await?);
        return Ok(());
    }

    let posts = match author {
        Some(author) => api.posts_by(&UserId::new(author)).await?,
        None => api.posts(category.map(CategoryId::new).as_ref()).await?,
    };
    render::heading("THE DAILY FEED");
    render::post_list(&posts);
    Ok(())
}

async fn open_post(api: &BlogApi, post: String, notices: &Notices) -> Result<PostPage> {
    Ok(PostPage::open(api, &PostId::new(post), ViewScope::new(), notices.clone()).await?)
}

async fn cmd_show(api: &BlogApi, post: String, notices: &Notices) -> Result<()> {
    let page = open_post(api, post, notices).await?;
    if let Some(post) = page.view.post() {
        render::post(&post, page.like.state(), page.bookmark.is_bookmarked());
    }
    render::comments(&page.comments.comments());
    Ok(())
}

async fn cmd_like(api: &BlogApi, post: String, notices: &Notices) -> Result<()> {
    let page = open_post(api, post, notices).await?;
    if let Outcome::Applied(liked) = page.like.toggle().await? {
        let state = page.like.state();
        println!("  {} ({} like(s))", if liked { "Liked" } else { "Unliked" }, state.count);
    }
    Ok(())
}

async fn cmd_bookmark(api: &BlogApi, post: String, notices: &Notices) -> Result<()> {
    let page = open_post(api, post, notices).await?;
    page.bookmark.toggle().await?;
    Ok(())
}

async fn cmd_follow(api: &BlogApi, user: String, notices: &Notices) -> Result<()> {
    let id = UserId::new(user);
    let page = ProfilePage::open(api, Some(&id), ViewScope::new(), notices.clone()).await?;
    if let Outcome::Applied(following) = page.follow.toggle().await? {
        println!(
            "  {} {}",
            if following { "Following" } else { "Unfollowed" },
            page.user.display_name()
        );
        render::follow(&page.follow.state(), false);
    }
    Ok(())
}

async fn cmd_profile(api: &BlogApi, user: Option<String>, notices: &Notices) -> Result<()> {
    let id = user.map(UserId::new);
    let page = ProfilePage::open(api, id.as_ref(), ViewScope::new(), notices.clone()).await?;

    render::heading(&page.user.display_name().to_uppercase());
    render::user(&page.user);
    render::follow(&page.follow.state(), page.own);

    println!("\n  Posts");
    render::post_list(&page.posts);
    if page.own {
        println!("\n  Bookmarks");
        for bookmark in &page.bookmarks {
            render::post_line(&bookmark.post);
        }
    }
    Ok(())
}

async fn open_thread(api: &BlogApi, post: String, notices: &Notices) -> Result<CommentThread> {
    let post = PostId::new(post);
    let comments = api.comments(&post).await?;
    Ok(CommentThread::new(api.clone(), post, comments, ViewScope::new(), notices.clone()))
}

async fn cmd_comment(api: &BlogApi, command: CommentCommands, notices: &Notices) -> Result<()> {
    match command {
        CommentCommands::Add { post, text } => {
            let thread = open_thread(api, post, notices).await?;
            thread.add(&text).await?;
            render::comments(&thread.comments());
        }
        CommentCommands::Edit { post, comment, text } => {
            let thread = open_thread(api, post, notices).await?;
            thread.edit(&CommentId::server(comment), &text).await?;
        }
        CommentCommands::Delete { post, comment } => {
            let thread = open_thread(api, post, notices).await?;
            thread.delete(&CommentId::server(comment)).await?;
        }
    }
    Ok(())
}

async fn cmd_post(api: &BlogApi, command: PostCommands, notices: &Notices) -> Result<()> {
    match command {
        PostCommands::Create { title, content, category, image } => {
            let mut form = PostForm::new(title, content);
            form.category_id = category.map(CategoryId::new);
            form.image = image.as_deref().map(read_upload).transpose()?;

            if let Some(post) = compose_post(api, &form, notices).await? {
                render::post_line(&post);
            }
        }
        PostCommands::Edit { post, title, content, category, image } => {
            let form = PostForm {
                title,
                content,
                category_id: category.map(CategoryId::new),
                image: image.as_deref().map(read_upload).transpose()?,
            };
            let id = PostId::new(post);
            let view = PostView::load(api.clone(), &id, ViewScope::new(), notices.clone()).await?;
            if let Outcome::Applied(updated) = view.edit(&form).await? {
                render::post_line(&updated);
            }
        }
        PostCommands::Delete { post } => {
            let id = PostId::new(post);
            let view = PostView::load(api.clone(), &id, ViewScope::new(), notices.clone()).await?;
            view.delete().await?;
        }
    }
    Ok(())
}
