use leptos::prelude::*;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::use_params_map,
    ParamSegment, StaticSegment,
};

use crate::components::posts_feed::PostsFeed;
use crate::config::FeedConfig;
use crate::feed_cache::{provide_feed_cache, FeedCache, FeedScope, SharedFeedCache};

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    // one cache per session, dropped with the app
    let config = use_context::<FeedConfig>().unwrap_or_else(FeedConfig::from_env);
    provide_feed_cache(SharedFeedCache::new(FeedCache::from_config(&config)));
    provide_context(config);

    view! {
        <Stylesheet id="leptos" href="/pkg/nest.css"/>

        <Title text="nest"/>

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=StaticSegment("") view=HomePage/>
                    <Route path=(StaticSegment("users"), ParamSegment("id")) view=ProfilePage/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn HomePage() -> impl IntoView {
    view! {
        <div class="w-full max-w-2xl mx-auto pl-2">
            <h1 class="text-3xl text-left text-pink-600 pl-4 p-4 font-bold">"nest"</h1>
            <PostsFeed scope=FeedScope::Global/>
        </div>
    }
}

#[component]
fn ProfilePage() -> impl IntoView {
    let params = use_params_map();
    let user_id = move || params.with(|params| params.get("id")).unwrap_or_default();

    view! {
        <div class="w-full max-w-2xl mx-auto pl-2">
            <a href="/" class="inline-block pl-4 pt-4 text-teal-600 hover:underline">"back to feed"</a>
            {move || view! { <PostsFeed scope=FeedScope::author(user_id())/> }}
        </div>
    }
}
