pub mod access_control;
pub mod request_id;

pub use access_control::{AccessContext, get_current_user, require_auth};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
