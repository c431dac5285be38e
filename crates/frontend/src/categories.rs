//! Display metadata for help categories and the marker popup markup.

use nearby_discovery::{MarkerMeta, PopupRenderer};
use nearby_shared::{Category, HelperRole};

pub fn label(category: Category) -> &'static str {
    match category {
        Category::All => "All categories",
        Category::Food => "Food",
        Category::Legal => "Legal",
        Category::Health => "Health",
        Category::Housing => "Housing",
        Category::Work => "Work",
        Category::Education => "Education",
        Category::Social => "Social support",
        Category::Clothes => "Clothes",
        Category::Furniture => "Furniture",
        Category::Transport => "Transport",
    }
}

pub fn icon(category: Category) -> &'static str {
    match category {
        Category::All => "🌐",
        Category::Food => "🍽️",
        Category::Legal => "⚖️",
        Category::Health => "🏥",
        Category::Housing => "🏠",
        Category::Work => "💼",
        Category::Education => "📚",
        Category::Social => "🤝",
        Category::Clothes => "👕",
        Category::Furniture => "🪑",
        Category::Transport => "🚗",
    }
}

pub fn role_label(role: HelperRole) -> &'static str {
    match role {
        HelperRole::Volunteer => "Professional volunteer",
        HelperRole::Helper => "Helper",
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Popup markup for a marker. Helper names come from the backend and are
/// escaped.
pub fn popup_html(meta: &MarkerMeta) -> String {
    match meta {
        MarkerMeta::SelfLocation(_) => "<strong>You are here</strong>".to_string(),
        MarkerMeta::Helper(helper) => {
            let icons: Vec<&str> = helper.categories.iter().map(|c| icon(*c)).collect();
            format!(
                "<div class=\"nearby-popup\">\
                 <strong>{}</strong><br/>\
                 <span class=\"nearby-popup__role\">{}</span><br/>\
                 <span class=\"nearby-popup__icons\">{}</span><br/>\
                 <span class=\"nearby-popup__distance\">{} km</span>\
                 </div>",
                escape_html(&helper.name),
                role_label(helper.role),
                icons.join(" "),
                helper.distance_km,
            )
        }
    }
}

pub fn popup_renderer() -> PopupRenderer {
    Box::new(popup_html)
}
