use leptos::prelude::*;

use crate::models::Author;

#[derive(Clone, Copy, Debug, Default)]
pub enum AvatarSize {
    Small,
    #[default]
    Medium,
}

impl AvatarSize {
    pub fn classes(&self) -> &'static str {
        match self {
            AvatarSize::Small => "w-6 h-6 text-xs",
            AvatarSize::Medium => "w-8 h-8 text-sm",
        }
    }
}

/// Up to two uppercase initials, falling back to the username.
pub fn initials(author: &Author) -> String {
    let from_names: String = [&author.first_name, &author.last_name]
        .into_iter()
        .flatten()
        .filter_map(|name| name.chars().next())
        .collect();

    let initials = if from_names.is_empty() {
        author.username.chars().next().map(String::from).unwrap_or_else(|| "?".to_string())
    } else {
        from_names
    };
    initials.to_uppercase()
}

#[component]
pub fn UserAvatar(
    /// Post author whose initials are shown
    author: Author,
    #[prop(default = AvatarSize::Medium)]
    size: AvatarSize,
) -> impl IntoView {
    view! {
        <div class=format!(
            "{} rounded-full flex items-center justify-center bg-pink-500 text-white font-medium",
            size.classes(),
        )>{initials(&author)}</div>
    }
}
