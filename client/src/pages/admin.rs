//! Admin console: site configuration and news.
//!
//! SYSTEM CONTEXT
//! ==============
//! Guarded by `Requirement::Admin`. While the session is loading or a
//! persisted token is being verified the page shows a placeholder; visitors
//! without the role are sent home. Data goes through the page's `SiteClient`,
//! which reads the same persisted token as the session store.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use jiuwen_session::Requirement;
use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use schema::{News, NewsDraft, SiteConfig};

use crate::state::session::use_session;
use crate::util::auth::{install_access_guard, pending_message};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminTab {
    Config,
    News,
}

impl AdminTab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Config => "Site configuration",
            Self::News => "News",
        }
    }
}

/// Build a news draft, trimming the title and requiring some content.
pub fn validate_news_draft(title: &str, content: &str, author: &str) -> Result<NewsDraft, &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Enter a title.");
    }
    if content.trim().is_empty() {
        return Err("Enter the news content.");
    }
    Ok(NewsDraft { title: title.to_owned(), content: content.to_owned(), author: author.to_owned() })
}

pub fn config_display_value(config: &SiteConfig) -> &str {
    config.value.as_deref().filter(|value| !value.is_empty()).unwrap_or("(unset)")
}

/// Signals shared by the console's tabs.
#[derive(Clone, Copy)]
struct ConsoleState {
    configs: RwSignal<Vec<SiteConfig>>,
    news: RwSignal<Vec<News>>,
    error: RwSignal<Option<String>>,
    loading: RwSignal<bool>,
}

impl ConsoleState {
    fn new() -> Self {
        Self {
            configs: RwSignal::new(Vec::new()),
            news: RwSignal::new(Vec::new()),
            error: RwSignal::new(None),
            loading: RwSignal::new(false),
        }
    }
}

#[component]
pub fn AdminPage() -> impl IntoView {
    let session = use_session();
    let decision = install_access_guard(&session, Requirement::Admin, use_navigate());

    view! {
        <div class="admin-page">
            {move || match pending_message(&decision.get()) {
                Some(message) => view! { <div class="admin-page__loading">{message}</div> }.into_any(),
                None => view! { <AdminConsole/> }.into_any(),
            }}
        </div>
    }
}

#[component]
fn AdminConsole() -> impl IntoView {
    let session = use_session();
    let site = session.site.clone();
    let auth = session.auth;
    let state = ConsoleState::new();
    let tab = RwSignal::new(AdminTab::Config);

    let loader = site.clone();
    Effect::new(move || {
        let active = tab.get();
        if let Some(site) = loader.clone() {
            reload(site, active, state);
        } else {
            state.error.set(Some("Site API unavailable.".to_owned()));
        }
    });

    let tab_button = move |target: AdminTab| {
        view! {
            <button
                class="admin-tab"
                class:admin-tab--active=move || tab.get() == target
                on:click=move |_| tab.set(target)
            >
                {target.label()}
            </button>
        }
    };

    let author = move || auth.get().display_name().unwrap_or_default().to_owned();

    view! {
        <div class="admin-console">
            <header class="admin-console__header">
                <h1>"Admin console"</h1>
                <a href="/admin/users" class="admin-console__link" hidden=move || !auth.get().is_root>
                    "Manage users"
                </a>
            </header>
            <Show when=move || state.error.get().is_some()>
                <div class="admin-console__error">{move || state.error.get().unwrap_or_default()}</div>
            </Show>
            <nav class="admin-tabs">{tab_button(AdminTab::Config)} {tab_button(AdminTab::News)}</nav>
            {move || {
                if state.loading.get() {
                    return view! { <div class="admin-page__loading">"Loading..."</div> }.into_any();
                }
                match tab.get() {
                    AdminTab::Config => view! { <ConfigPanel site=site.clone() state=state/> }.into_any(),
                    AdminTab::News => view! { <NewsPanel site=site.clone() state=state author=author()/> }.into_any(),
                }
            }}
        </div>
    }
}

fn reload(site: jiuwen_session::SiteClient, tab: AdminTab, state: ConsoleState) {
    #[cfg(feature = "hydrate")]
    leptos::task::spawn_local(async move {
        state.loading.set(true);
        state.error.set(None);
        let result = match tab {
            AdminTab::Config => site.list_configs().await.map(|configs| state.configs.set(configs)),
            AdminTab::News => site.list_news().await.map(|news| state.news.set(news)),
        };
        if let Err(err) = result {
            log::warn!("admin {:?} load failed: {err}", tab);
            state.error.set(Some(err.user_message()));
        }
        state.loading.set(false);
    });
    #[cfg(not(feature = "hydrate"))]
    let _ = (site, tab, state);
}

#[component]
fn ConfigPanel(site: Option<jiuwen_session::SiteClient>, state: ConsoleState) -> impl IntoView {
    let editing = RwSignal::new(None::<String>);
    let draft = RwSignal::new(String::new());

    let save = move |key: String| {
        let Some(site) = site.clone() else {
            return;
        };
        let value = draft.get();
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            match site.update_config(&key, &value).await {
                Ok(_) => {
                    editing.set(None);
                    reload(site, AdminTab::Config, state);
                }
                Err(err) => state.error.set(Some(err.user_message())),
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (site, key, value);
    };

    view! {
        <div class="config-list">
            {move || {
                state
                    .configs
                    .get()
                    .into_iter()
                    .map(|config| {
                        let key = config.key.clone();
                        let shown = config_display_value(&config).to_owned();
                        let current = config.value.clone().unwrap_or_default();
                        let save = save.clone();
                        let is_editing = editing.get().as_deref() == Some(key.as_str());
                        let body = if is_editing {
                            let save_key = key.clone();
                            view! {
                                <textarea
                                    rows="5"
                                    prop:value=move || draft.get()
                                    on:input=move |ev| draft.set(event_target_value(&ev))
                                ></textarea>
                                <button on:click=move |_| save(save_key.clone())>"Save"</button>
                                <button on:click=move |_| editing.set(None)>"Cancel"</button>
                            }
                                .into_any()
                        } else {
                            let edit_key = key.clone();
                            view! {
                                <pre class="config-item__value">{shown}</pre>
                                <button on:click=move |_| {
                                    draft.set(current.clone());
                                    editing.set(Some(edit_key.clone()));
                                }>"Edit"</button>
                            }
                                .into_any()
                        };
                        view! {
                            <div class="config-item">
                                <h3>{key}</h3>
                                {config.description.map(|desc| view! { <p class="config-item__desc">{desc}</p> })}
                                {body}
                            </div>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}

#[component]
fn NewsPanel(site: Option<jiuwen_session::SiteClient>, state: ConsoleState, author: String) -> impl IntoView {
    let title = RwSignal::new(String::new());
    let content = RwSignal::new(String::new());

    let create_site = site.clone();
    let on_create = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let draft = match validate_news_draft(&title.get(), &content.get(), &author) {
            Ok(draft) => draft,
            Err(message) => {
                state.error.set(Some(message.to_owned()));
                return;
            }
        };
        let Some(site) = create_site.clone() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            match site.create_news(&draft).await {
                Ok(_) => {
                    title.set(String::new());
                    content.set(String::new());
                    reload(site, AdminTab::News, state);
                }
                Err(err) => state.error.set(Some(err.user_message())),
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (site, draft);
    };

    let delete = move |id: i64| {
        let Some(site) = site.clone() else {
            return;
        };
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            match site.delete_news(id).await {
                Ok(()) => state.news.update(|news| news.retain(|item| item.id != id)),
                Err(err) => state.error.set(Some(err.user_message())),
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (site, id);
    };

    view! {
        <form class="news-form" on:submit=on_create>
            <input
                type="text"
                placeholder="Title"
                prop:value=move || title.get()
                on:input=move |ev| title.set(event_target_value(&ev))
            />
            <textarea
                rows="6"
                placeholder="Content"
                prop:value=move || content.get()
                on:input=move |ev| content.set(event_target_value(&ev))
            ></textarea>
            <button type="submit">"Publish"</button>
        </form>
        <ul class="news-list">
            {move || {
                state
                    .news
                    .get()
                    .into_iter()
                    .map(|item| {
                        let delete = delete.clone();
                        let id = item.id;
                        view! {
                            <li class="news-item">
                                <h3>{item.title}</h3>
                                <span class="news-item__meta">
                                    {item.author.unwrap_or_default()} " " {item.created_at.unwrap_or_default()}
                                </span>
                                <button on:click=move |_| delete(id)>"Delete"</button>
                            </li>
                        }
                    })
                    .collect_view()
            }}
        </ul>
    }
}
