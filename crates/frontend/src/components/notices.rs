use dioxus::prelude::*;
use nearby_discovery::Notice;

/// A notice on screen, tagged with an id that survives dismissal of others.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub notice: Notice,
}

/// Appends `fresh` notices, numbering them from `next_id`.
pub fn push_toasts(toasts: &mut Vec<Toast>, next_id: &mut u64, fresh: Vec<Notice>) {
    for notice in fresh {
        toasts.push(Toast {
            id: *next_id,
            notice,
        });
        *next_id += 1;
    }
}

fn message(notice: &Notice) -> String {
    match notice {
        Notice::LocationUnavailable => {
            "Could not get your location. Showing helpers around Paris instead.".to_string()
        }
        Notice::QueryFailed(reason) => format!("Could not load nearby helpers ({reason})."),
        Notice::MapUnavailable => "The map is unavailable right now.".to_string(),
    }
}

/// Dismissible toasts for non-fatal problems.
#[component]
pub fn Notices(toasts: Signal<Vec<Toast>>) -> Element {
    let items: Vec<(u64, String)> = toasts
        .read()
        .iter()
        .map(|toast| (toast.id, message(&toast.notice)))
        .collect();
    let mut toasts = toasts;

    rsx! {
        div { class: "notices",
            for (id, text) in items {
                div { class: "notice", key: "{id}",
                    span { "{text}" }
                    button {
                        class: "secondary",
                        "aria-label": "Dismiss",
                        onclick: move |_| toasts.write().retain(|toast| toast.id != id),
                        "×"
                    }
                }
            }
        }
    }
}
