//! HTML pages
//!
//! Pages are assembled with `format!` around a shared layout. Everything
//! user-supplied goes through `html_escape` on the way in.

use axum::http::StatusCode;
use axum::response::Html;
use chrono::{DateTime, Utc};

use super::{group_url, post_url, profile_url};
use crate::data::{CommentView, FollowSummary, Group, GroupView, Page, PostView, User};
use crate::forms::{FieldErrors, LoginForm, SignupForm};
use crate::storage::MediaStorage;

fn text(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_text(value)
}

fn attr(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

/// Wrap a page body in the site layout
fn layout(title: &str, user: Option<&User>, body: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<a href="/new/">New post</a>
    <a href="/follow/">Following</a>
    <a href="/groups/follow/">My groups</a>
    <a href="/liked/">Liked</a>
    <a href="{}">{}</a>
    <a href="/auth/logout/">Log out</a>"#,
            attr(&profile_url(&user.username)),
            text(&user.username),
        ),
        None => r#"<a href="/auth/login/">Log in</a>
    <a href="/auth/signup/">Sign up</a>"#
            .to_string(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{} | Postwall</title>
</head>
<body>
  <nav>
    <a href="/">Postwall</a>
    <a href="/groups/">Groups</a>
    {}
  </nav>
  <main>
{}
  </main>
</body>
</html>"#,
        text(title),
        nav,
        body
    ))
}

// =============================================================================
// Fragments
// =============================================================================

/// Humanised "last seen": "Never", "Just now", or the largest whole unit.
pub fn time_ago(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(value) = value else {
        return "Never".to_string();
    };
    let delta = now - value;

    let ago = |count: i64, unit: &str| {
        if count == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{count} {unit}s ago")
        }
    };

    if delta.num_days() > 0 {
        ago(delta.num_days(), "day")
    } else if delta.num_hours() > 0 {
        ago(delta.num_hours(), "hour")
    } else if delta.num_minutes() > 0 {
        ago(delta.num_minutes(), "minute")
    } else {
        "Just now".to_string()
    }
}

fn field_errors(errors: &FieldErrors, field: &str) -> String {
    let messages = errors.get(field);
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|message| format!("<li>{}</li>", text(message)))
        .collect();
    format!(r#"<ul class="errorlist">{}</ul>"#, items)
}

fn pagination<T>(page: &Page<T>) -> String {
    if page.num_pages <= 1 {
        return String::new();
    }
    let mut html = String::from(r#"<nav class="pagination">"#);
    if page.has_previous() {
        html.push_str(r#"<a href="?page=1">&laquo; first</a> "#);
        html.push_str(&format!(r#"<a href="?page={}">previous</a> "#, page.number - 1));
    }
    html.push_str(&format!(
        r#"<span class="current">Page {} of {}</span>"#,
        page.number, page.num_pages
    ));
    if page.has_next() {
        html.push_str(&format!(r#" <a href="?page={}">next</a>"#, page.number + 1));
        html.push_str(&format!(r#" <a href="?page={}">last &raquo;</a>"#, page.num_pages));
    }
    html.push_str("</nav>");
    html
}

fn post_card(post: &PostView, viewer: Option<&User>, media: &MediaStorage) -> String {
    let profile = profile_url(&post.author_username);
    let detail = post_url(&post.author_username, post.id);
    let group = match (&post.group_title, &post.group_slug) {
        (Some(title), Some(slug)) => format!(
            r#"<a class="post-group" href="{}">{}</a>"#,
            attr(&group_url(slug)),
            text(title)
        ),
        _ => String::new(),
    };
    let image = post
        .image
        .as_deref()
        .map(|key| format!(r#"<img class="post-image" src="{}" alt="" />"#, attr(&media.get_public_url(key))))
        .unwrap_or_default();
    let like_path = if post.is_liked { "removelike" } else { "like" };
    let num_likes = if post.num_likes > 0 {
        post.num_likes.to_string()
    } else {
        String::new()
    };
    let edit = match viewer {
        Some(user) if user.id == post.author_id => format!(
            r#" <a href="{}edit/">Edit</a>"#,
            attr(&detail)
        ),
        _ => String::new(),
    };

    format!(
        r#"<article class="post" id="post-{id}">
  <header><a class="post-author" href="{profile}">{author_text}</a> {group}
    <time datetime="{date}">{date_short}</time></header>
  {image}
  <p class="post-text">{body}</p>
  <footer>
    <a class="like" data-liked="{is_liked}" href="/{like_path}/?post_id={id}&amp;num_likes={likes_raw}">&#9829; <span class="num-likes">{num_likes}</span></a>
    <a href="{detail}">Comments: {num_comments}</a>{edit}
  </footer>
</article>"#,
        id = post.id,
        profile = attr(&profile),
        detail = attr(&detail),
        author_text = text(&post.author_username),
        group = group,
        date = post.pub_date.to_rfc3339(),
        date_short = post.pub_date.format("%d %b %Y %H:%M"),
        image = image,
        body = text(&post.text),
        is_liked = if post.is_liked { "True" } else { "False" },
        like_path = like_path,
        likes_raw = post.num_likes,
        num_likes = num_likes,
        num_comments = post.num_comments,
        edit = edit,
    )
}

fn post_list(page: &Page<PostView>, viewer: Option<&User>, media: &MediaStorage) -> String {
    if page.items.is_empty() {
        return r#"<p class="empty">No posts yet.</p>"#.to_string();
    }
    let mut html: String = page
        .items
        .iter()
        .map(|post| post_card(post, viewer, media))
        .collect::<Vec<_>>()
        .join("\n");
    html.push_str(&pagination(page));
    html
}

fn author_card(
    author: &User,
    follow: FollowSummary,
    last_seen: Option<DateTime<Utc>>,
    viewer: Option<&User>,
) -> String {
    let profile = attr(&profile_url(&author.username)).into_owned();
    let toggle = match viewer {
        Some(user) if user.id == author.id => String::new(),
        Some(_) if follow.follows => format!(
            r#"<a class="unfollow" href="{}unfollow/">Unfollow</a>"#,
            profile
        ),
        Some(_) => format!(r#"<a class="follow" href="{}follow/">Follow</a>"#, profile),
        None => String::new(),
    };

    format!(
        r#"<aside class="author">
  <h2>{name}</h2>
  <p>@{handle}</p>
  <p>Last seen: {seen}</p>
  <ul>
    <li>Followers: <span class="follower-count">{followers}</span></li>
    <li>Following: <span class="following-count">{following}</span></li>
    <li>Groups: <span class="group-count">{groups}</span></li>
  </ul>
  {toggle}
</aside>"#,
        name = text(&author.display_name()),
        handle = text(&author.username),
        seen = time_ago(last_seen, Utc::now()),
        followers = follow.follower_count,
        following = follow.following_count,
        groups = follow.follower_group_count,
        toggle = toggle,
    )
}

// =============================================================================
// Listings
// =============================================================================

/// Index, follow feeds and liked posts share this layout
pub fn feed_page(
    heading: &str,
    page: &Page<PostView>,
    viewer: Option<&User>,
    media: &MediaStorage,
) -> Html<String> {
    let body = format!(
        "<h1>{}</h1>\n{}",
        text(heading),
        post_list(page, viewer, media)
    );
    layout(heading, viewer, &body)
}

pub fn group_page(
    group: &Group,
    is_followed: bool,
    page: &Page<PostView>,
    viewer: Option<&User>,
    media: &MediaStorage,
) -> Html<String> {
    let toggle = match viewer {
        Some(_) if is_followed => format!(
            r#"<a class="unfollow" href="{}unfollow/">Leave group</a>"#,
            attr(&group_url(&group.slug))
        ),
        Some(_) => format!(
            r#"<a class="follow" href="{}follow/">Join group</a>"#,
            attr(&group_url(&group.slug))
        ),
        None => String::new(),
    };
    let body = format!(
        r#"<h1>{}</h1>
<p class="group-description">{}</p>
{}
{}"#,
        text(&group.title),
        text(&group.description),
        toggle,
        post_list(page, viewer, media)
    );
    layout(&group.title, viewer, &body)
}

pub fn groups_overview_page(groups: &[GroupView], viewer: Option<&User>) -> Html<String> {
    let items: String = groups
        .iter()
        .map(|group| {
            let url = attr(&group_url(&group.slug)).into_owned();
            let toggle = match viewer {
                Some(_) if group.is_followed => format!(
                    r#" <a class="unfollow" href="{}unfollow/?overview=1">Leave</a>"#,
                    url
                ),
                Some(_) => format!(
                    r#" <a class="follow" href="{}follow/?overview=1">Join</a>"#,
                    url
                ),
                None => String::new(),
            };
            format!(
                r#"<li><a href="{}">{}</a> <span>{}</span>{}</li>"#,
                url,
                text(&group.title),
                text(&group.description),
                toggle
            )
        })
        .collect();
    let create = if viewer.is_some() {
        r#"<p><a href="/groups/new/">Create a group</a></p>"#
    } else {
        ""
    };
    let body = format!("<h1>Groups</h1>\n{}\n<ul class=\"groups\">{}</ul>", create, items);
    layout("Groups", viewer, &body)
}

pub fn profile_page(
    author: &User,
    follow: FollowSummary,
    last_seen: Option<DateTime<Utc>>,
    page: &Page<PostView>,
    viewer: Option<&User>,
    media: &MediaStorage,
) -> Html<String> {
    let body = format!(
        "{}\n<p>Posts: {}</p>\n{}",
        author_card(author, follow, last_seen, viewer),
        page.count,
        post_list(page, viewer, media)
    );
    layout(&author.display_name(), viewer, &body)
}

// =============================================================================
// Single post
// =============================================================================

pub struct PostPage<'a> {
    pub post: &'a PostView,
    pub author: &'a User,
    pub comments: &'a [CommentView],
    pub follow: FollowSummary,
    pub last_seen: Option<DateTime<Utc>>,
}

pub fn post_page(view: PostPage<'_>, viewer: Option<&User>, media: &MediaStorage) -> Html<String> {
    let post = view.post;
    let detail = attr(&post_url(&post.author_username, post.id)).into_owned();

    let comments: String = view
        .comments
        .iter()
        .map(|comment| {
            let delete = match viewer {
                Some(user) if user.id == comment.author_id => format!(
                    r#" <a class="remove-comment" href="{}remove-comment/{}">Delete</a>"#,
                    detail, comment.id
                ),
                _ => String::new(),
            };
            format!(
                r#"<li class="comment" id="comment-{}"><a href="{}">{}</a> <time>{}</time>
  <p>{}</p>{}</li>"#,
                comment.id,
                attr(&profile_url(&comment.author_username)),
                text(&comment.author_username),
                comment.created.format("%d %b %Y %H:%M"),
                text(&comment.text),
                delete
            )
        })
        .collect();

    let form = match viewer {
        Some(_) => format!(
            r#"<form method="post" action="{}comment">
  <label for="id_text">Add a comment</label>
  <textarea name="text" id="id_text" required></textarea>
  <button type="submit">Send</button>
</form>"#,
            detail
        ),
        None => String::new(),
    };

    let body = format!(
        r#"{}
{}
<section class="comments">
  <h2>Comments ({})</h2>
  {}
  <ul>{}</ul>
</section>"#,
        author_card(view.author, view.follow, view.last_seen, viewer),
        post_card(post, viewer, media),
        post.num_comments,
        form,
        comments
    );
    layout("Post", viewer, &body)
}

// =============================================================================
// Forms
// =============================================================================

/// Values to put back into the post form
pub struct PostFormValues<'a> {
    pub text: &'a str,
    pub group: Option<&'a str>,
    /// `Some((username, id))` when editing an existing post
    pub editing: Option<(&'a str, i64)>,
}

pub fn post_form_page(
    values: PostFormValues<'_>,
    groups: &[Group],
    errors: &FieldErrors,
    viewer: Option<&User>,
) -> Html<String> {
    let (heading, action, button) = match values.editing {
        Some((username, id)) => (
            "Edit post",
            format!("{}edit/", attr(&post_url(username, id))),
            "Save",
        ),
        None => ("New post", "/new/".to_string(), "Publish"),
    };

    let selected = values.group.unwrap_or("");
    let mut options = format!(
        r#"<option value=""{}>---------</option>"#,
        if selected.is_empty() { " selected" } else { "" }
    );
    for group in groups {
        let id = group.id.to_string();
        options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            id,
            if id == selected { " selected" } else { "" },
            text(&group.title)
        ));
    }

    let body = format!(
        r#"<h1>{heading}</h1>
{all}
<form method="post" action="{action}" enctype="multipart/form-data">
  <label for="id_text">Text</label>
  <textarea name="text" id="id_text" required>{text_value}</textarea>
  {text_errors}
  <label for="id_group">Group</label>
  <select name="group" id="id_group">{options}</select>
  {group_errors}
  <label for="id_image">Image</label>
  <input type="file" name="image" id="id_image" accept="image/*" />
  {image_errors}
  <input type="hidden" name="crop_data" id="id_crop_data" value="" />
  {crop_errors}
  <button type="submit">{button}</button>
</form>"#,
        heading = heading,
        all = field_errors(errors, FieldErrors::NON_FIELD),
        action = action,
        text_value = text(values.text),
        text_errors = field_errors(errors, "text"),
        options = options,
        group_errors = field_errors(errors, "group"),
        image_errors = field_errors(errors, "image"),
        crop_errors = field_errors(errors, "crop_data"),
        button = button,
    );
    layout(heading, viewer, &body)
}

pub fn group_form_page(
    title: &str,
    description: &str,
    errors: &FieldErrors,
    viewer: Option<&User>,
) -> Html<String> {
    let body = format!(
        r#"<h1>New group</h1>
<form method="post" action="/groups/new/">
  <label for="id_title">Title</label>
  <input type="text" name="title" id="id_title" maxlength="{}" value="{}" required />
  {}
  <label for="id_description">Description</label>
  <textarea name="description" id="id_description" maxlength="{}" required>{}</textarea>
  {}
  <button type="submit">Create</button>
</form>"#,
        crate::forms::TITLE_MAX_LENGTH,
        attr(title),
        field_errors(errors, "title"),
        crate::forms::DESCR_MAX_LENGTH,
        text(description),
        field_errors(errors, "description"),
    );
    layout("New group", viewer, &body)
}

pub fn login_page(form: &LoginForm, errors: &FieldErrors) -> Html<String> {
    let next = form
        .next
        .as_deref()
        .map(|next| format!(r#"<input type="hidden" name="next" value="{}" />"#, attr(next)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Log in</h1>
{}
<form method="post" action="/auth/login/">
  <label for="id_username">Username</label>
  <input type="text" name="username" id="id_username" value="{}" required />
  {}
  <label for="id_password">Password</label>
  <input type="password" name="password" id="id_password" required />
  {}
  {}
  <button type="submit">Log in</button>
</form>
<p>No account? <a href="/auth/signup/">Sign up</a></p>"#,
        field_errors(errors, FieldErrors::NON_FIELD),
        attr(&form.username),
        field_errors(errors, "username"),
        field_errors(errors, "password"),
        next,
    );
    layout("Log in", None, &body)
}

pub fn signup_page(form: &SignupForm, errors: &FieldErrors) -> Html<String> {
    let input = |name: &str, label: &str, kind: &str, value: &str| {
        format!(
            r#"<label for="id_{name}">{label}</label>
  <input type="{kind}" name="{name}" id="id_{name}" value="{value}" />
  {errors}"#,
            name = name,
            label = label,
            kind = kind,
            value = attr(value),
            errors = field_errors(errors, name),
        )
    };

    let body = format!(
        r#"<h1>Sign up</h1>
{}
<form method="post" action="/auth/signup/">
  {}
  {}
  {}
  {}
  {}
  {}
  <button type="submit">Sign up</button>
</form>"#,
        field_errors(errors, FieldErrors::NON_FIELD),
        input("first_name", "First name", "text", &form.first_name),
        input("last_name", "Last name", "text", &form.last_name),
        input("username", "Username", "text", &form.username),
        input("email", "Email", "email", &form.email),
        input("password1", "Password", "password", ""),
        input("password2", "Password confirmation", "password", ""),
    );
    layout("Sign up", None, &body)
}

// =============================================================================
// Errors
// =============================================================================

pub fn not_found_page(path: Option<&str>) -> Html<String> {
    let detail = path
        .map(|path| format!("<p>The page <code>{}</code> does not exist.</p>", text(path)))
        .unwrap_or_else(|| "<p>The page you requested does not exist.</p>".to_string());
    layout("Page not found", None, &format!("<h1>Page not found</h1>\n{}", detail))
}

pub fn server_error_page() -> Html<String> {
    layout(
        "Server error",
        None,
        "<h1>Server error</h1>\n<p>Something went wrong. Please try again later.</p>",
    )
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        None,
        &format!("<h1>{}</h1>\n<p>{}</p>", text(title), text(message)),
    )
}
