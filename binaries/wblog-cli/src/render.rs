//! Terminal output

use wblog_core::{Category, Comment, Post, User};
use wblog_interact::{FollowState, LikeState, Notice, NoticeLevel};

pub fn heading(title: &str) {
    println!("\n  {}", title);
    println!("  {}\n", "=".repeat(title.chars().count()));
}

pub fn notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("  [ok] {}", notice.message),
        NoticeLevel::Error => println!("  [!!] {}", notice.message),
    }
}

fn date(post: &Post) -> String {
    post.created_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn excerpt(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

pub fn post_line(post: &Post) {
    println!(
        "  #{:<6} {:<40} {:<16} {}",
        post.id.as_str(),
        excerpt(&post.title, 40),
        post.author_name(),
        date(post)
    );
}

pub fn post_list(posts: &[Post]) {
    if posts.is_empty() {
        println!("  (no posts)");
        return;
    }
    for post in posts {
        post_line(post);
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        println!("  {:<6} {}", category.id.as_str(), category.name);
    }
}

pub fn post(post: &Post, likes: LikeState, bookmarked: bool) {
    heading(&post.title);
    println!("  by {}  {}", post.author_name(), date(post));
    if let Some(image) = &post.image_url {
        println!("  cover: {}", image);
    }
    println!();
    for line in post.content.lines() {
        println!("  {}", line);
    }
    println!();
    println!(
        "  {} {} like(s){}",
        if likes.liked { "[liked]" } else { "[ ]" },
        likes.count,
        if bookmarked { "  [bookmarked]" } else { "" }
    );
}

pub fn comments(comments: &[Comment]) {
    println!("\n  Comments ({})", comments.len());
    for comment in comments {
        let author = comment
            .author
            .as_ref()
            .and_then(|p| p.username.as_deref())
            .unwrap_or("Unknown");
        println!("    [{}] {}: {}", comment.id, author, comment.content);
    }
}

pub fn user(user: &User) {
    println!("  id:       {}", user.id);
    println!("  username: {}", user.display_name());
    if let Some(email) = &user.email {
        println!("  email:    {}", email);
    }
    if let Some(bio) = &user.bio {
        println!("  bio:      {}", bio);
    }
}

pub fn follow(state: &FollowState, own: bool) {
    println!(
        "  followers: {}  following: {}{}",
        state.follower_count,
        state.following_count,
        if !own && state.following { "  [following]" } else { "" }
    );
}
