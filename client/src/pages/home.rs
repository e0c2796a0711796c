//! Landing page.

use leptos::prelude::*;

use crate::state::session::use_session;

#[component]
pub fn HomePage() -> impl IntoView {
    let auth = use_session().auth;

    view! {
        <div class="home-page">
            <h1>"openJiuwen"</h1>
            <p class="home-page__greeting">
                {move || match auth.get().display_name() {
                    Some(name) => format!("Welcome back, {name}."),
                    None => "Sign in to join the discussion.".to_owned(),
                }}
            </p>
        </div>
    }
}
