//! User accounts and bearer-token sessions.

mod store;

pub use store::{AuthError, AuthSession, AuthStore, UserSummary};
