//! Redirects requested by store actions

use strum::{Display, IntoStaticStr};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Pages an action can redirect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Route {
    /// The pin feed
    #[strum(serialize = "/")]
    Home,
    /// The login form
    #[strum(serialize = "/login")]
    Login,
}

impl Route {
    /// Path of the route
    #[must_use]
    pub fn path(self) -> &'static str {
        self.into()
    }
}

/// Whatever owns the UI's current page
pub trait Navigator: Send + Sync {
    /// Switches to `route`
    fn navigate(&self, route: Route);
}

/// Forwards routes to the task that drives the UI
pub struct ChannelNavigator {
    sender: UnboundedSender<Route>,
}

impl ChannelNavigator {
    /// Creates a navigator and the receiving end the UI listens on
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<Route>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        debug!("Navigating to {route}");
        if self.sender.send(route).is_err() {
            warn!("Navigation to {route} dropped: no UI listening");
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Navigator that only records
    use std::sync::Mutex;

    use super::{Navigator, Route};

    /// Records every redirect it is asked for
    #[derive(Default)]
    pub struct RecordingNavigator {
        routes: Mutex<Vec<Route>>,
    }

    impl RecordingNavigator {
        /// Routes requested so far, oldest first
        #[must_use]
        pub fn routes(&self) -> Vec<Route> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }
}
