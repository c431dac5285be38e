//! One-time loading of the external mapping library.
//!
//! The stylesheet and script are injected into the page at most once per
//! process. Activations that arrive while the injection is in flight wait
//! on the same load instead of starting another one. A failed load is
//! remembered and never retried automatically.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use tracing::{debug, error, info};

use crate::config::LibraryResources;
use crate::error::LibraryLoadError;

type LoadResult = Result<(), LibraryLoadError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    Ready,
    Failed(LibraryLoadError),
}

/// Puts the library's resources into the page and resolves once the script
/// has run.
pub trait ResourceInjector {
    fn inject(&self, resources: &LibraryResources) -> impl Future<Output = LoadResult>;
}

enum Entry {
    Done(LoadResult),
    Wait(oneshot::Receiver<LoadResult>),
    Lead,
}

pub struct LibraryLoader {
    state: RefCell<LoadState>,
    waiters: RefCell<Vec<oneshot::Sender<LoadResult>>>,
}

thread_local! {
    static SHARED: Rc<LibraryLoader> = Rc::new(LibraryLoader::new());
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(LoadState::NotStarted),
            waiters: RefCell::new(Vec::new()),
        }
    }

    /// The process-wide loader. Outlives every screen.
    pub fn shared() -> Rc<Self> {
        SHARED.with(Rc::clone)
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub async fn ensure_loaded<I>(&self, injector: &I, resources: &LibraryResources) -> LoadResult
    where
        I: ResourceInjector,
    {
        loop {
            match self.enter() {
                Entry::Done(result) => return result,
                Entry::Wait(rx) => match rx.await {
                    Ok(result) => return result,
                    // The task driving the load was dropped; take over.
                    Err(oneshot::Canceled) => continue,
                },
                Entry::Lead => {
                    let guard = LeadGuard {
                        loader: self,
                        settled: false,
                    };
                    info!(script = %resources.script_url, "loading mapping library");
                    let result = injector.inject(resources).await;
                    guard.settle(&result);
                    return result;
                }
            }
        }
    }

    fn enter(&self) -> Entry {
        let current = self.state.borrow().clone();
        match current {
            LoadState::Ready => Entry::Done(Ok(())),
            LoadState::Failed(err) => Entry::Done(Err(err)),
            LoadState::Loading => {
                let (tx, rx) = oneshot::channel();
                self.waiters.borrow_mut().push(tx);
                debug!("mapping library already loading; waiting");
                Entry::Wait(rx)
            }
            LoadState::NotStarted => {
                *self.state.borrow_mut() = LoadState::Loading;
                Entry::Lead
            }
        }
    }
}

struct LeadGuard<'a> {
    loader: &'a LibraryLoader,
    settled: bool,
}

impl LeadGuard<'_> {
    fn settle(mut self, result: &LoadResult) {
        self.settled = true;
        *self.loader.state.borrow_mut() = match result {
            Ok(()) => LoadState::Ready,
            Err(err) => {
                error!(error = %err, "mapping library failed to load");
                LoadState::Failed(err.clone())
            }
        };
        let waiters = std::mem::take(&mut *self.loader.waiters.borrow_mut());
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for LeadGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.loader.state.borrow_mut() = LoadState::NotStarted;
            self.loader.waiters.borrow_mut().clear();
        }
    }
}
