pub mod documents;
pub mod notify;
pub mod session;

pub use documents::{DocumentAccess, view_data_url};
pub use notify::{EventHub, NotificationReconciler};
pub use session::{ClientContext, SessionManager, TrustingValidator};
