use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dioxus::prelude::*;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use nearby_discovery::{
    FetchTicket, HelperQueryService, LibraryLoader, LocationAcquirer, MapPhase,
    MapViewController, QueryError, ScreenController,
};
use nearby_shared::{Category, RadiusKm, ResultSet};
use tracing::{debug, info};

use crate::categories;
use crate::components::filter_bar::FilterBar;
use crate::components::helper_list::HelperList;
use crate::components::notices::{push_toasts, Notices, Toast};
use crate::geolocation::BrowserGeolocator;
use crate::host::{self, DomInjector};
use crate::leaflet::LeafletBackend;

const MAP_CONTAINER_ID: &str = "nearby-map";

/// Extra wait past the geolocation timeout before falling back ourselves.
const DEADLINE_SLACK: Duration = Duration::from_millis(500);

type Screen = Rc<RefCell<ScreenController<LeafletBackend>>>;

async fn run_fetch(
    service: HelperQueryService,
    ticket: FetchTicket,
) -> (u64, Result<ResultSet, QueryError>) {
    (ticket.seq, service.fetch_nearby(&ticket.query).await)
}

/// Toasts on screen plus the id the next one will get.
#[derive(Clone, Copy)]
struct ToastFeed {
    toasts: Signal<Vec<Toast>>,
    next_id: Signal<u64>,
}

fn drain_notices(screen: &Screen, mut feed: ToastFeed) {
    let fresh = screen.borrow_mut().take_notices();
    if !fresh.is_empty() {
        push_toasts(&mut feed.toasts.write(), &mut feed.next_id.write(), fresh);
    }
}

/// Moves queued notices into view and schedules a re-render.
fn publish(screen: &Screen, mut revision: Signal<u64>, notices: ToastFeed) {
    drain_notices(screen, notices);
    *revision.write() += 1;
}

fn map_status(phase: &MapPhase, locating: bool) -> Option<&'static str> {
    if locating {
        return Some("Getting your location...");
    }
    match phase {
        MapPhase::LibraryLoading { degraded: true } => Some("Map unavailable"),
        MapPhase::Uninitialized | MapPhase::LibraryLoading { .. } => Some("Loading map..."),
        MapPhase::Ready | MapPhase::Active { .. } | MapPhase::Disposed => None,
    }
}

#[component]
pub fn Nearby() -> Element {
    let config = use_hook(|| Rc::new(host::browser_config()));
    let service = use_hook(|| HelperQueryService::new(&config));
    let screen: Screen = use_hook(|| {
        let map = MapViewController::new(
            LeafletBackend::new(MAP_CONTAINER_ID),
            &config,
            categories::popup_renderer(),
        );
        Rc::new(RefCell::new(ScreenController::new(map)))
    });

    // Bumped after every controller mutation; the view re-reads the controller.
    let revision = use_signal(|| 0u64);
    let notices = ToastFeed {
        toasts: use_signal(Vec::<Toast>::new),
        next_id: use_signal(|| 0u64),
    };

    // Every issued query runs here; completions race and the controller
    // discards the stale ones.
    let fetches = use_coroutine({
        let screen = screen.clone();
        let service = service.clone();
        move |mut tickets: UnboundedReceiver<FetchTicket>| {
            let screen = screen.clone();
            let service = service.clone();
            async move {
                let mut in_flight = FuturesUnordered::new();
                loop {
                    futures::select! {
                        ticket = tickets.next() => match ticket {
                            Some(ticket) => in_flight.push(run_fetch(service.clone(), ticket)),
                            None => break,
                        },
                        (seq, outcome) = in_flight.select_next_some() => {
                            let settled = screen.borrow_mut().fetch_completed(seq, outcome);
                            debug!(seq, ?settled, "nearby query settled");
                            publish(&screen, revision, notices);
                        }
                    }
                }
            }
        }
    });

    use_future({
        let screen = screen.clone();
        let config = config.clone();
        move || {
            let screen = screen.clone();
            let config = config.clone();
            async move {
                let mut acquirer = LocationAcquirer::new(BrowserGeolocator, &config);
                let deadline = gloo_timers::future::sleep(acquirer.options().timeout + DEADLINE_SLACK);
                let located = acquirer.acquire(deadline).await;
                let ticket = screen.borrow_mut().location_acquired(located);
                if let Some(ticket) = ticket {
                    fetches.send(ticket);
                }
                publish(&screen, revision, notices);
            }
        }
    });

    use_future({
        let screen = screen.clone();
        let config = config.clone();
        move || {
            let screen = screen.clone();
            let config = config.clone();
            async move {
                let should_load = screen.borrow_mut().activate_map();
                if !should_load {
                    return;
                }
                let loader = LibraryLoader::shared();
                let result = loader.ensure_loaded(&DomInjector, &config.library).await;
                screen.borrow_mut().library_loaded(result);
                publish(&screen, revision, notices);
            }
        }
    });

    // Marker clicks select the helper in the list.
    use_future({
        let screen = screen.clone();
        move || {
            let screen = screen.clone();
            async move {
                let events = screen.borrow_mut().map_mut().selection_events();
                let Some(mut events) = events else {
                    return;
                };
                while let Some(id) = events.next().await {
                    let changed = screen.borrow_mut().select(Some(&id));
                    if changed {
                        publish(&screen, revision, notices);
                    }
                }
            }
        }
    });

    // The map container exists once rendered; rebuilds happen here.
    use_effect({
        let screen = screen.clone();
        move || {
            let _ = revision.read();
            screen.borrow_mut().flush_map();
            drain_notices(&screen, notices);
        }
    });

    use_drop({
        let screen = screen.clone();
        move || {
            screen.borrow_mut().teardown();
            info!("nearby helpers screen closed");
        }
    });

    let on_category = {
        let screen = screen.clone();
        move |category: Category| {
            let ticket = screen.borrow_mut().set_category(category);
            if let Some(ticket) = ticket {
                fetches.send(ticket);
            }
            publish(&screen, revision, notices);
        }
    };
    let on_radius = {
        let screen = screen.clone();
        move |radius: RadiusKm| {
            let ticket = screen.borrow_mut().set_radius(radius);
            if let Some(ticket) = ticket {
                fetches.send(ticket);
            }
            publish(&screen, revision, notices);
        }
    };
    let on_refresh = {
        let screen = screen.clone();
        move |()| {
            let ticket = screen.borrow_mut().refresh();
            if let Some(ticket) = ticket {
                fetches.send(ticket);
            }
            publish(&screen, revision, notices);
        }
    };
    let on_select = {
        let screen = screen.clone();
        move |id: String| {
            let changed = screen.borrow_mut().select(Some(&id));
            if changed {
                publish(&screen, revision, notices);
            }
        }
    };

    let _ = revision.read();
    let (filter, helpers, selected, locating, fetching, empty, status) = {
        let s = screen.borrow();
        (
            s.filter(),
            s.results().to_vec(),
            s.selected().map(str::to_string),
            s.is_locating(),
            s.is_fetching(),
            s.is_empty(),
            map_status(s.map().phase(), s.is_locating()),
        )
    };

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "Nearby helpers" }
                p { class: "subtitle", "Find people near you who can help" }
            }

            FilterBar {
                filter: filter,
                locating: locating,
                on_category: on_category,
                on_radius: on_radius,
                on_refresh: on_refresh,
            }

            Notices { toasts: notices.toasts }

            div { class: "content",
                div { class: "map-panel",
                    div { id: MAP_CONTAINER_ID, class: "map" }
                    if let Some(status) = status {
                        div { class: "map-overlay", "{status}" }
                    }
                }
                HelperList {
                    helpers: helpers,
                    selected: selected,
                    fetching: fetching,
                    empty: empty,
                    on_select: on_select,
                }
            }
        }
    }
}
