use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "ssr")] {
        use axum::Router;
        use dotenv::dotenv;
        use env_logger::Env;
        use leptos::prelude::*;
        use leptos_axum::{generate_route_list, LeptosRoutes};
        use nest::app::*;
        use nest::config::FeedConfig;
        use nest::state::AppState;

        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            dotenv().ok();
            env_logger::init_from_env(Env::default().default_filter_or("info"));

            let conf = get_configuration(None)?;
            let leptos_options = conf.leptos_options;
            let addr = leptos_options.site_addr;
            let routes = generate_route_list(App);

            let feed_config = FeedConfig::from_env();
            log::info!(
                "posts API at {}, {} posts per page, cache TTL {}s",
                feed_config.api_base_url,
                feed_config.page_size,
                feed_config.cache_ttl_secs
            );

            let app_state = AppState {
                leptos_options: leptos_options.clone(),
                feed_config: feed_config.clone(),
            };

            let app = Router::new()
                .leptos_routes_with_context(
                    &app_state,
                    routes,
                    move || provide_context(feed_config.clone()),
                    {
                        let leptos_options = leptos_options.clone();
                        move || shell(leptos_options.clone())
                    },
                )
                .fallback(leptos_axum::file_and_error_handler::<AppState, _>(shell))
                .with_state(app_state);

            log::info!("Starting server at {}", addr);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            log::info!("listening on http://{}", &addr);
            axum::serve(listener, app.into_make_service()).await?;
            Ok(())
        }
    } else {
        pub fn main() {
            // no client-side main function
            // see lib.rs for hydration function instead
        }
    }
}
