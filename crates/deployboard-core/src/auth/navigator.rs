use parking_lot::Mutex;
use url::Url;

/// Where the user is sent next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The application root (job list or login view).
    Root,
    /// A page outside the application, e.g. the identity provider.
    External(Url),
}

/// Moves the user between the application and the identity provider.
///
/// Navigation leaves the current view; callers must finish any state changes
/// before calling `navigate`.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: Location);
}

/// Navigator that only records where it was asked to go.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Location>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<Location> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: Location) {
        self.visits.lock().push(location);
    }
}
