use dioxus::prelude::*;
use nearby_discovery::{chat_link, visible_categories};
use nearby_shared::HelperRecord;

use crate::categories;

/// Categories shown per row before collapsing into "+N".
const MAX_ROW_CATEGORIES: usize = 4;

fn heading(count: usize) -> String {
    match count {
        1 => "1 helper found".to_string(),
        n => format!("{n} helpers found"),
    }
}

#[component]
pub fn HelperList(
    helpers: Vec<HelperRecord>,
    selected: Option<String>,
    fetching: bool,
    empty: bool,
    on_select: EventHandler<String>,
) -> Element {
    let title = if fetching {
        "Searching...".to_string()
    } else {
        heading(helpers.len())
    };

    rsx! {
        div { class: "helper-list",
            h2 { "{title}" }
            if empty && !fetching {
                div { class: "panel empty-state",
                    p { "No helpers found in this area" }
                    p { class: "hint", "Try increasing the search radius" }
                }
            }
            for helper in helpers {
                HelperRow {
                    key: "{helper.id}",
                    is_selected: selected.as_deref() == Some(helper.id.as_str()),
                    helper: helper.clone(),
                    on_select: on_select,
                }
            }
        }
    }
}

#[component]
fn HelperRow(helper: HelperRecord, is_selected: bool, on_select: EventHandler<String>) -> Element {
    let (shown, overflow) = visible_categories(&helper, MAX_ROW_CATEGORIES);
    let initial = helper.name.chars().next().unwrap_or('?');
    let id = helper.id.clone();
    let role = categories::role_label(helper.role);
    let chips: Vec<(&str, String)> = shown
        .iter()
        .map(|c| (categories::label(*c), format!("{} {}", categories::icon(*c), categories::label(*c))))
        .collect();

    rsx! {
        div {
            class: if is_selected { "helper-row selected" } else { "helper-row" },
            onclick: move |_| on_select.call(id.clone()),
            div { class: "avatar", "{initial}" }
            div { class: "helper-body",
                div { class: "helper-title",
                    strong { "{helper.name}" }
                    span { class: "distance", "{helper.distance_km} km" }
                }
                p { class: "role", "{role}" }
                div { class: "chips",
                    for (label, text) in chips {
                        span { class: "chip", title: "{label}", "{text}" }
                    }
                    if overflow > 0 {
                        span { class: "chip", "+{overflow}" }
                    }
                }
                if is_selected {
                    div {
                        class: "helper-actions",
                        // The row itself selects on click; keep that out of navigation.
                        onclick: move |evt: MouseEvent| evt.stop_propagation(),
                        Link { class: "button", to: chat_link(&helper.id), "Chat" }
                    }
                }
            }
        }
    }
}
