use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::components::posts_feed::AppFeedService;
use crate::models::{MediaKind, NewPost, Post};

fn parse_media_kind(raw: &str) -> Option<MediaKind> {
    match raw {
        "image" => Some(MediaKind::Image),
        "video" => Some(MediaKind::Video),
        "audio" => Some(MediaKind::Audio),
        _ => None,
    }
}

/// Builds the create-post payload from the form fields. Blank content gives
/// `None`; media is only attached when both a URL and a kind are given.
pub fn draft_from_form(content: &str, media_url: &str, media_kind: &str) -> Option<NewPost> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    let media_url = media_url.trim();
    let media = parse_media_kind(media_kind).filter(|_| !media_url.is_empty());

    Some(NewPost {
        content: content.to_string(),
        media_url: media.map(|_| media_url.to_string()),
        media_type: media,
    })
}

#[component]
pub fn PostComposer(
    service: AppFeedService,
    #[prop(into)] on_published: Callback<Post>,
) -> impl IntoView {
    let (open, set_open) = signal(false);
    let (content, set_content) = signal(String::new());
    let (media_url, set_media_url) = signal(String::new());
    let (media_kind, set_media_kind) = signal("image".to_string());
    let (publishing, set_publishing) = signal(false);
    let (error, set_error) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if publishing.get_untracked() {
            return;
        }
        let Some(draft) = draft_from_form(
            &content.get_untracked(),
            &media_url.get_untracked(),
            &media_kind.get_untracked(),
        ) else {
            set_error.set(Some("Write something first".to_string()));
            return;
        };

        let service = service.clone();
        set_publishing.set(true);
        spawn_local(async move {
            match service.publish_post(&draft).await {
                Ok(post) => {
                    on_published.run(post);
                    set_content.set(String::new());
                    set_media_url.set(String::new());
                    set_error.set(None);
                    set_open.set(false);
                }
                Err(e) => set_error.set(Some(format!("Failed to create post: {}", e))),
            }
            set_publishing.set(false);
        });
    };

    view! {
        <div class="mx-4">
            <button
                on:click=move |_| set_open.update(|open| *open = !*open)
                class="text-sm text-teal-600 dark:text-seafoam-400 hover:underline"
            >
                {move || if open.get() { "Cancel" } else { "New post" }}
            </button>
            <form
                on:submit=on_submit
                class=move || if open.get() { "mt-2 space-y-2" } else { "hidden" }
            >
                <textarea
                    rows="3"
                    placeholder="What's new?"
                    prop:value=content
                    on:input=move |ev| set_content.set(event_target_value(&ev))
                    class="w-full p-3 border border-gray-300 dark:border-teal-600 rounded-lg
                    bg-white dark:bg-teal-700 text-gray-800 dark:text-gray-200
                    focus:outline-none focus:ring-2 focus:ring-seafoam-500 resize-none"
                ></textarea>
                <div class="flex gap-2">
                    <input
                        type="text"
                        placeholder="Media URL (optional)"
                        prop:value=media_url
                        on:input=move |ev| set_media_url.set(event_target_value(&ev))
                        class="flex-1 px-3 py-2 border border-gray-300 dark:border-teal-600 rounded-md
                        bg-white dark:bg-teal-700 text-gray-800 dark:text-gray-200"
                    />
                    <select
                        on:change=move |ev| set_media_kind.set(event_target_value(&ev))
                        class="px-3 py-2 border border-gray-300 dark:border-teal-600 rounded-md
                        bg-white dark:bg-teal-700 text-gray-800 dark:text-gray-200"
                    >
                        <option value="image">"Image"</option>
                        <option value="video">"Video"</option>
                        <option value="audio">"Audio"</option>
                    </select>
                </div>
                {move || error.get().map(|message| view! {
                    <p class="text-sm text-red-600">{message}</p>
                })}
                <button
                    type="submit"
                    disabled=move || publishing.get()
                    class="px-4 py-2 rounded-md bg-pink-500 text-white disabled:bg-gray-400"
                >
                    {move || if publishing.get() { "Posting..." } else { "Post" }}
                </button>
            </form>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_drafts_are_rejected() {
        assert_eq!(draft_from_form("   ", "", "image"), None);
    }

    #[test]
    fn media_needs_url_and_kind() {
        let draft = draft_from_form(" teaser ", " /uploads/t.mp4 ", "video").unwrap();
        assert_eq!(draft.content, "teaser");
        assert_eq!(draft.media_url.as_deref(), Some("/uploads/t.mp4"));
        assert_eq!(draft.media_type, Some(MediaKind::Video));

        let text_only = draft_from_form("hello", "", "image").unwrap();
        assert_eq!(text_only.media_url, None);
        assert_eq!(text_only.media_type, None);

        let unknown_kind = draft_from_form("hello", "/x.gif", "gif").unwrap();
        assert_eq!(unknown_kind.media_url, None);
    }
}
