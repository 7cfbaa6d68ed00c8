pub mod assets;
pub mod dates;
pub mod response;
pub mod sentry;
