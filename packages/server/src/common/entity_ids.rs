//! Typed ID wrappers for store-assigned keys.
//!
//! Both `users` and `jobs` use BIGSERIAL primary keys assigned by Postgres,
//! so ids are never minted in the application. The newtypes exist purely for
//! compile-time safety: a `UserId` cannot be passed where a `JobId` is
//! expected.
//!
//! ```rust
//! use server_core::common::{JobId, UserId};
//!
//! let owner = UserId::from(1);
//! let job = JobId::from(1);
//! // let wrong: JobId = owner; // compile error
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Raw key value, for query binding and logging.
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id! {
    /// Typed ID for User records.
    UserId
}

entity_id! {
    /// Typed ID for Job records.
    JobId
}
