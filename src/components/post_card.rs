use chrono::{DateTime, Utc};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::components::posts_feed::AppFeedService;
use crate::components::user_avatar::{AvatarSize, UserAvatar};
use crate::models::{Comment, MediaKind, Post};

/// "1 day ago", "3 days ago", "2 weeks ago", "4 months ago".
pub fn format_time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds().unsigned_abs();
    let days = seconds.div_ceil(24 * 60 * 60);

    if days == 1 {
        "1 day ago".to_string()
    } else if days < 7 {
        format!("{} days ago", days)
    } else if days < 30 {
        format!("{} weeks ago", days.div_ceil(7))
    } else {
        format!("{} months ago", days.div_ceil(30))
    }
}

/// Relative media paths are served by the API host.
pub fn media_src(api_base_url: &str, media_url: &str) -> String {
    if media_url.starts_with("http://") || media_url.starts_with("https://") {
        media_url.to_string()
    } else {
        format!(
            "{}/{}",
            api_base_url.trim_end_matches('/'),
            media_url.trim_start_matches('/')
        )
    }
}

#[component]
pub fn PostCard(post: Post, service: AppFeedService) -> impl IntoView {
    let (liked, set_liked) = signal(false);
    let (likes, set_likes) = signal(post.counters.likes);
    let (comments, set_comments) = signal(post.counters.comments);
    let (liking, set_liking) = signal(false);

    let (show_comments, set_show_comments) = signal(false);
    let (comment_draft, set_comment_draft) = signal(String::new());
    let (commenting, set_commenting) = signal(false);
    let (comment_error, set_comment_error) = signal(Option::<String>::None);
    let (new_comments, set_new_comments) = signal(Vec::<Comment>::new());

    // false when no live cached copy is left to read from
    let sync_counters = {
        let cache = service.cache().clone();
        let post_id = post.id.clone();
        move || {
            cache
                .with(|cache| cache.counters_of(&post_id))
                .map(|counters| {
                    set_likes.set(counters.likes);
                    set_comments.set(counters.comments);
                })
                .is_some()
        }
    };

    let on_comment = {
        let service = service.clone();
        let post_id = post.id.clone();
        let sync_counters = sync_counters.clone();
        move |ev: leptos::ev::SubmitEvent| {
            ev.prevent_default();
            let content = comment_draft.get_untracked().trim().to_string();
            if content.is_empty() || commenting.get_untracked() {
                return;
            }
            let service = service.clone();
            let post_id = post_id.clone();
            let sync_counters = sync_counters.clone();
            set_commenting.set(true);
            spawn_local(async move {
                match service.add_comment(&post_id, &content).await {
                    Ok(comment) => {
                        set_new_comments.update(|comments| comments.push(comment));
                        set_comment_draft.set(String::new());
                        set_comment_error.set(None);
                        if !sync_counters() {
                            set_comments.update(|n| *n = n.saturating_add(1));
                        }
                    }
                    Err(e) => set_comment_error.set(Some(format!("Failed to add comment: {}", e))),
                }
                set_commenting.set(false);
            });
        }
    };

    let on_like = {
        let service = service.clone();
        let post_id = post.id.clone();
        move |_: leptos::ev::MouseEvent| {
            if liking.get_untracked() {
                return;
            }
            let was_liked = liked.get_untracked();
            let previous_likes = likes.get_untracked();

            // flip right away, the service reconciles the cache behind us
            set_liking.set(true);
            set_liked.set(!was_liked);
            set_likes.set(if was_liked {
                previous_likes.saturating_sub(1)
            } else {
                previous_likes.saturating_add(1)
            });

            let service = service.clone();
            let post_id = post_id.clone();
            let sync_counters = sync_counters.clone();
            spawn_local(async move {
                match service.toggle_like(&post_id, was_liked).await {
                    Ok(now_liked) => set_liked.set(now_liked),
                    Err(_) => {
                        set_liked.set(was_liked);
                        set_likes.set(previous_likes);
                    }
                }
                sync_counters();
                set_liking.set(false);
            });
        }
    };

    let media = match (post.media_url.as_deref(), post.media_type) {
        (Some(url), Some(kind)) => {
            let src = media_src(service.backend().base_url(), url);
            Some(match kind {
                MediaKind::Image => view! {
                    <img src=src alt="Post media" class="w-full rounded-lg mt-2"/>
                }
                .into_any(),
                MediaKind::Video => view! {
                    <video src=src controls=true class="w-full rounded-lg mt-2"></video>
                }
                .into_any(),
                MediaKind::Audio => view! {
                    <audio src=src controls=true class="w-full mt-2"></audio>
                }
                .into_any(),
            })
        }
        _ => None,
    };

    let profile_href = format!("/users/{}", urlencoding::encode(&post.author.id));
    let display_name = post.author.display_name();
    let time_ago = format_time_ago(post.created_at, Utc::now());

    view! {
        <article class="mb-6 p-4 rounded-lg bg-gray-100 dark:bg-teal-800 text-gray-800 dark:text-gray-200">
            <header class="flex items-center gap-2">
                <UserAvatar author=post.author.clone()/>
                <a href=profile_href class="font-medium hover:underline">{display_name}</a>
                <span class="text-sm text-gray-500">{time_ago}</span>
            </header>
            <p class="mt-2 whitespace-pre-wrap">{post.content.clone()}</p>
            {media}
            <footer class="flex items-center gap-4 mt-3 text-sm">
                <button
                    on:click=on_like
                    disabled=move || liking.get()
                    class=move || {
                        if liked.get() { "text-pink-500" } else { "text-gray-500 hover:text-pink-500" }
                    }
                >
                    {move || format!("♥ {}", likes.get())}
                </button>
                <button
                    on:click=move |_| set_show_comments.update(|open| *open = !*open)
                    class="text-gray-500 hover:text-teal-600"
                >
                    {move || format!("{} comments", comments.get())}
                </button>
            </footer>
            {move || show_comments.get().then(|| view! {
                <div class="mt-3 space-y-2">
                    {move || new_comments.get().into_iter().map(|comment| view! {
                        <CommentRow comment=comment/>
                    }).collect_view()}
                    <form on:submit=on_comment.clone() class="flex gap-2">
                        <input
                            type="text"
                            placeholder="Add a comment..."
                            prop:value=comment_draft
                            on:input=move |ev| set_comment_draft.set(event_target_value(&ev))
                            class="flex-1 px-3 py-1 border border-gray-300 dark:border-teal-600 rounded-md
                            bg-white dark:bg-teal-700 text-gray-800 dark:text-gray-200"
                        />
                        <button
                            type="submit"
                            disabled=move || commenting.get()
                            class="px-3 py-1 rounded-md bg-teal-600 text-white disabled:bg-gray-400"
                        >
                            {move || if commenting.get() { "Posting..." } else { "Post" }}
                        </button>
                    </form>
                    {move || comment_error.get().map(|message| view! {
                        <p class="text-red-600">{message}</p>
                    })}
                </div>
            })}
        </article>
    }
}

#[component]
fn CommentRow(comment: Comment) -> impl IntoView {
    let author = comment.author.map(|author| {
        let name = author.display_name();
        view! {
            <UserAvatar author=author size=AvatarSize::Small/>
            <span class="font-medium">{name}</span>
        }
    });

    view! {
        <div class="flex items-start gap-2">
            {author}
            <p class="whitespace-pre-wrap">{comment.content}</p>
        </div>
    }
}
