use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::HttpPostsApi;
use crate::components::post_card::PostCard;
use crate::components::post_composer::PostComposer;
use crate::config::FeedConfig;
use crate::error::ApiError;
use crate::feed_cache::{use_feed_cache, FeedScope};
use crate::feed_service::{FeedPage, FeedService};
use crate::models::{PageNumber, Post};

pub type AppFeedService = FeedService<HttpPostsApi>;

pub const ACCESS_TOKEN_KEY: &str = "access_token";

#[cfg(feature = "hydrate")]
fn stored_access_token() -> Option<String> {
    web_sys::window()
        .and_then(|window| window.local_storage().ok().flatten())
        .and_then(|storage| storage.get_item(ACCESS_TOKEN_KEY).ok().flatten())
}

#[cfg(not(feature = "hydrate"))]
fn stored_access_token() -> Option<String> {
    None
}

/// Feed service over the session cache provided by the root component.
pub fn use_feed_service() -> AppFeedService {
    let config = use_context::<FeedConfig>().unwrap_or_default();
    let api = HttpPostsApi::from_config(&config).with_token(stored_access_token());
    FeedService::new(api, use_feed_cache(), config.page_size)
}

#[component]
pub fn PostsFeed(
    /// Global feed or one author's posts
    scope: FeedScope,
) -> impl IntoView {
    let service = use_feed_service();

    let (posts, set_posts) = signal(Vec::<Post>::new());
    let (page, set_page) = signal(PageNumber::FIRST);
    let (has_more, set_has_more) = signal(false);
    let (loading, set_loading) = signal(true);
    let (loading_more, set_loading_more) = signal(false);
    let (error, set_error) = signal(Option::<String>::None);

    let show = move |result: Result<FeedPage, ApiError>| match result {
        Ok(feed) => {
            log::debug!(
                "showing {} posts of {} (page {}, cached: {})",
                feed.posts.len(),
                feed.scope,
                feed.page,
                feed.from_cache
            );
            set_page.set(feed.page);
            set_has_more.set(feed.has_more);
            set_posts.update(|shown| feed.merge_into(shown));
            set_error.set(None);
        }
        Err(e) => set_error.set(Some(format!("Failed to load posts: {}", e))),
    };

    Effect::new({
        let service = service.clone();
        let scope = scope.clone();
        move |_| {
            let service = service.clone();
            let scope = scope.clone();
            spawn_local(async move {
                set_loading.set(true);
                show(service.load_page(&scope, PageNumber::FIRST, false).await);
                set_loading.set(false);
            });
        }
    });

    let on_load_more = {
        let service = service.clone();
        let scope = scope.clone();
        move |_: leptos::ev::MouseEvent| {
            if loading_more.get_untracked() || !has_more.get_untracked() {
                return;
            }
            let service = service.clone();
            let scope = scope.clone();
            let current = page.get_untracked();
            set_loading_more.set(true);
            spawn_local(async move {
                show(service.load_more(&scope, current).await);
                set_loading_more.set(false);
            });
        }
    };

    let on_refresh = {
        let service = service.clone();
        let scope = scope.clone();
        move |_: leptos::ev::MouseEvent| {
            let service = service.clone();
            let scope = scope.clone();
            set_loading.set(true);
            spawn_local(async move {
                show(service.refresh(&scope).await);
                set_loading.set(false);
            });
        }
    };

    // new posts belong here only if this feed would list them
    let on_published = {
        let scope = scope.clone();
        Callback::new(move |post: Post| {
            if scope.is_global() || scope.author_id() == Some(post.author.id.as_str()) {
                set_posts.update(|shown| {
                    if !shown.iter().any(|p| p.id == post.id) {
                        shown.insert(0, post);
                    }
                });
            }
        })
    };

    let cards = {
        let service = service.clone();
        move || {
            posts
                .get()
                .into_iter()
                .map(|post| view! { <PostCard post=post service=service.clone()/> })
                .collect_view()
        }
    };

    view! {
        <section class="pt-4 space-y-4">
            <PostComposer service=service.clone() on_published=on_published/>
            <div class="flex justify-end pr-4">
                <button
                    on:click=on_refresh
                    class="text-sm text-teal-600 dark:text-seafoam-400 hover:underline"
                >
                    "Refresh"
                </button>
            </div>
            {move || error.get().map(|message| view! {
                <div class="mx-4 p-3 rounded-md bg-red-100 text-red-700">{message}</div>
            })}
            {move || {
                if loading.get() {
                    view! { <div class="pl-4 py-12 text-pink-600">"Loading posts..."</div> }
                        .into_any()
                } else if posts.with(|posts| posts.is_empty()) {
                    view! { <div class="pl-4 py-12 text-gray-500">"No posts yet."</div> }
                        .into_any()
                } else {
                    view! { <div>{cards.clone()}</div> }.into_any()
                }
            }}
            {move || has_more.get().then(|| view! {
                <div class="flex justify-center pb-6">
                    <button
                        on:click=on_load_more.clone()
                        disabled=move || loading_more.get()
                        class="px-4 py-2 rounded-md border border-teal-500 dark:border-seafoam-500"
                    >
                        {move || if loading_more.get() { "Loading..." } else { "Load more" }}
                    </button>
                </div>
            })}
        </section>
    }
}
