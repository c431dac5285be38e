mod categories;
mod components;
mod geolocation;
mod host;
mod leaflet;
mod pages;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/nearby-helpers")]
    NearbyHelpers {},
    #[route("/direct-chat/:id")]
    DirectChat { id: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::nearby::Nearby {}
    }
}

#[component]
fn NearbyHelpers() -> Element {
    rsx! {
        pages::nearby::Nearby {}
    }
}

/// Landing spot for chat deep links; the chat itself lives elsewhere.
#[component]
fn DirectChat(id: String) -> Element {
    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "Direct chat" }
            }
            div { class: "panel",
                p { "Conversation with helper {id}" }
                Link { to: Route::NearbyHelpers {}, "Back to nearby helpers" }
            }
        }
    }
}

const CSS: Asset = asset!("/assets/main.css");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
