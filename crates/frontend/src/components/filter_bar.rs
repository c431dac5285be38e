use dioxus::prelude::*;
use nearby_shared::{Category, FilterState, RadiusKm};

use crate::categories;

#[component]
pub fn FilterBar(
    filter: FilterState,
    locating: bool,
    on_category: EventHandler<Category>,
    on_radius: EventHandler<RadiusKm>,
    on_refresh: EventHandler<()>,
) -> Element {
    let current_category = filter.category();
    let current_radius = filter.radius().km();
    let category_options: Vec<(Category, String)> = Category::ALL
        .into_iter()
        .map(|c| (c, format!("{} {}", categories::icon(c), categories::label(c))))
        .collect();

    rsx! {
        div { class: "filters",
            select {
                "aria-label": "Help category",
                value: "{current_category}",
                onchange: move |evt: Event<FormData>| {
                    if let Ok(category) = evt.value().parse::<Category>() {
                        on_category.call(category);
                    }
                },
                for (category, text) in category_options {
                    option {
                        value: "{category}",
                        selected: category == current_category,
                        "{text}"
                    }
                }
            }
            label { class: "radius",
                "Radius:"
                select {
                    "aria-label": "Search radius",
                    value: "{current_radius}",
                    onchange: move |evt: Event<FormData>| {
                        let radius = evt
                            .value()
                            .parse::<u32>()
                            .ok()
                            .and_then(|km| RadiusKm::try_from(km).ok());
                        if let Some(radius) = radius {
                            on_radius.call(radius);
                        }
                    },
                    for radius in RadiusKm::ALL.map(RadiusKm::km) {
                        option {
                            value: "{radius}",
                            selected: radius == current_radius,
                            "{radius} km"
                        }
                    }
                }
            }
            button {
                class: "secondary",
                disabled: locating,
                onclick: move |_| on_refresh.call(()),
                "Refresh"
            }
        }
    }
}
